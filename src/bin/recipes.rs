// 该文件是 Chufang （厨房） 项目的一部分。
// src/bin/recipes.rs - 按食材请求菜谱
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

use std::collections::BTreeSet;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::info;
use url::Url;

use chufang::{
  FromUrl,
  recipe::{GeminiServiceBuilder, RecipePipeline},
};

/// 根据给定的食材清单请求菜谱
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 食材，可重复或以逗号分隔
  #[arg(value_name = "INGREDIENT", value_delimiter = ',', required = true)]
  pub ingredients: Vec<String>,
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

  let labels: BTreeSet<String> = args
    .ingredients
    .iter()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect();
  if labels.is_empty() {
    bail!("食材清单为空");
  }
  info!("食材: {:?}", labels);

  let service = GeminiServiceBuilder::from_url(&args.generator)?
    .api_key(args.api_key)
    .build()?;
  let pipeline = RecipePipeline::new(service)
    .cuisine(args.cuisine)
    .count(args.count);

  let recipes = pipeline.request_recipes(&labels).await;
  println!("{}", serde_json::to_string_pretty(&recipes)?);

  Ok(())
}
