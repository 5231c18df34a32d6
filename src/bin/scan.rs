// 该文件是 Chufang （厨房） 项目的一部分。
// src/bin/scan.rs - 多图食材扫描
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use chufang::{
  FromUrl,
  aggregator::IngredientAggregator,
  model::{LabelTable, OnnxModelBuilder},
  output::{OutputWrapper, draw::Draw},
  processor::FrameProcessor,
  recipe::{GeminiServiceBuilder, RecipePipeline},
  task::{ConcurrentScan, SequentialScan, Task},
};

/// 扫描多张图片中的食材，可选地请求菜谱
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型地址，例如 onnx:///models/yolov8n.onnx?layout=nhwc
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图像，支持 image://、file://、data: 与 http(s)://
  #[arg(long, value_name = "SOURCE", num_args = 1.., required = true)]
  pub input: Vec<Url>,
  /// 输出路径，例如 folder:///tmp/chufang?original
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
  /// 标签表 TOML 文件，缺省使用内置 COCO 标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
  /// 标注用字体文件
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub confidence: f32,
  /// 并发处理数，1 表示逐张处理
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub concurrency: usize,
  /// 扫描后请求菜谱
  #[arg(long)]
  pub recipes: bool,
  /// 文本生成服务
  #[arg(long, default_value = "gemini://gemini-1.5-flash-001", value_name = "SERVICE")]
  pub generator: Url,
  #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
  pub api_key: Option<String>,
  /// 菜系
  #[arg(long, default_value = "Thai")]
  pub cuisine: String,
  /// 菜谱数量
  #[arg(long, default_value = "3")]
  pub count: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
  chufang::init_tracing("info");

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入图像: {} 张", args.input.len());

  // 缺少凭据只影响菜谱请求，提前发现
  let pipeline = if args.recipes {
    let service = GeminiServiceBuilder::from_url(&args.generator)?
      .api_key(args.api_key.clone())
      .build()?;
    Some(
      RecipePipeline::new(service)
        .cuisine(args.cuisine.clone())
        .count(args.count),
    )
  } else {
    None
  };

  let labels = match &args.labels {
    Some(path) => LabelTable::from_path(path)?,
    None => LabelTable::coco()?,
  };
  let draw = match &args.font {
    Some(path) => Draw::default().load_font(path)?,
    None => {
      warn!("未指定字体，标注中不绘制文字");
      Draw::default()
    }
  };

  let model = OnnxModelBuilder::from_url(&args.model)?.build()?;
  let processor = FrameProcessor::new(model, labels)
    .confidence_threshold(args.confidence)
    .draw(draw);
  processor.warm_up().await?;

  let output = match &args.output {
    Some(url) => Some(Arc::new(OutputWrapper::from_url(url)?)),
    None => None,
  };

  let aggregator = Arc::new(IngredientAggregator::new());
  let summary = if args.concurrency <= 1 {
    SequentialScan
      .run_task(args.input, processor, aggregator.clone(), output)
      .await?
  } else {
    ConcurrentScan::default()
      .with_limit(args.concurrency)
      .run_task(args.input, processor, aggregator.clone(), output)
      .await?
  };

  for image in &summary.processed {
    println!("{}\t{}\tfound {} items", image.id, image.source, image.label_count);
  }
  for failure in &summary.failures {
    warn!("{} 处理失败: {}", failure.source, failure.error);
  }

  let universe = aggregator.global_labels();
  println!(
    "ingredients: {}",
    universe.iter().cloned().collect::<Vec<_>>().join(", ")
  );

  if let Some(pipeline) = pipeline {
    if universe.is_empty() {
      warn!("没有识别到食材，跳过菜谱请求");
    } else {
      let recipes = pipeline.request_recipes(&universe).await;
      println!("{}", serde_json::to_string_pretty(&recipes)?);
    }
  }

  Ok(())
}
