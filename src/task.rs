// 该文件是 Chufang （厨房） 项目的一部分。
// src/task.rs - 扫描任务
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

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use tracing::{error, info, warn};
use url::Url;

use crate::{
  aggregator::IngredientAggregator,
  model::Model,
  output::Render,
  processor::{FrameProcessor, ProcessedImage},
};

/// 一次扫描中成功的图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImage {
  pub id: String,
  pub source: Url,
  pub label_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
  pub source: Url,
  pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
  pub processed: Vec<ScannedImage>,
  pub failures: Vec<ScanFailure>,
}

impl ScanSummary {
  pub fn is_complete(&self) -> bool {
    self.failures.is_empty()
  }

  fn push(&mut self, outcome: Result<ScannedImage, ScanFailure>) {
    match outcome {
      Ok(image) => self.processed.push(image),
      Err(failure) => self.failures.push(failure),
    }
  }
}

pub trait Task<M, O>: Sized {
  type Error;
  fn run_task(
    self,
    inputs: Vec<Url>,
    processor: FrameProcessor<M>,
    aggregator: Arc<IngredientAggregator>,
    output: Option<Arc<O>>,
  ) -> impl Future<Output = Result<ScanSummary, Self::Error>> + Send;
}

async fn scan_one<M, O>(
  source: Url,
  processor: &FrameProcessor<M>,
  aggregator: &IngredientAggregator,
  output: Option<Arc<O>>,
) -> Result<ScannedImage, ScanFailure>
where
  M: Model + 'static,
  O: Render + 'static,
{
  let now = std::time::Instant::now();
  let image = match processor.process(&source).await {
    Ok(image) => image,
    Err(e) => {
      error!("处理 {} 失败: {}", source, e);
      return Err(ScanFailure {
        source,
        error: e.to_string(),
      });
    }
  };
  info!(
    "{} 处理完成，发现 {} 种食材，耗时: {:.2?}",
    source,
    image.labels.len(),
    now.elapsed()
  );

  if let Some(output) = output {
    render(output, image.clone()).await;
  }

  let scanned = ScannedImage {
    id: image.id.clone(),
    source,
    label_count: image.labels.len(),
  };
  aggregator.add(image);
  Ok(scanned)
}

// 输出失败不影响汇总
async fn render<O: Render + 'static>(output: Arc<O>, image: ProcessedImage) {
  let id = image.id.clone();
  match tokio::task::spawn_blocking(move || output.render(&image)).await {
    Ok(Ok(())) => {}
    Ok(Err(e)) => warn!("图像 {} 输出失败: {}", id, e),
    Err(e) => warn!("图像 {} 输出任务异常: {}", id, e),
  }
}

/// 逐张处理
#[derive(Debug, Default)]
pub struct SequentialScan;

impl<M, O> Task<M, O> for SequentialScan
where
  M: Model + 'static,
  O: Render + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(
    self,
    inputs: Vec<Url>,
    processor: FrameProcessor<M>,
    aggregator: Arc<IngredientAggregator>,
    output: Option<Arc<O>>,
  ) -> Result<ScanSummary, Self::Error> {
    if inputs.is_empty() {
      return Err(anyhow::anyhow!("没有输入图像"));
    }
    info!("开始顺序扫描 {} 张图像...", inputs.len());

    let mut summary = ScanSummary::default();
    for source in inputs {
      let outcome = scan_one(source, &processor, &aggregator, output.clone()).await;
      summary.push(outcome);
    }

    info!(
      "扫描完成: 成功 {}, 失败 {}",
      summary.processed.len(),
      summary.failures.len()
    );
    Ok(summary)
  }
}

/// 限定并发数处理，结果按完成顺序加入
#[derive(Debug)]
pub struct ConcurrentScan {
  limit: usize,
}

impl Default for ConcurrentScan {
  fn default() -> Self {
    Self { limit: 4 }
  }
}

impl ConcurrentScan {
  pub fn with_limit(mut self, limit: usize) -> Self {
    self.limit = limit.max(1);
    self
  }
}

impl<M, O> Task<M, O> for ConcurrentScan
where
  M: Model + 'static,
  O: Render + 'static,
{
  type Error = anyhow::Error;

  async fn run_task(
    self,
    inputs: Vec<Url>,
    processor: FrameProcessor<M>,
    aggregator: Arc<IngredientAggregator>,
    output: Option<Arc<O>>,
  ) -> Result<ScanSummary, Self::Error> {
    if inputs.is_empty() {
      return Err(anyhow::anyhow!("没有输入图像"));
    }
    info!("开始并发扫描 {} 张图像，并发数 {}...", inputs.len(), self.limit);

    let outcomes: Vec<_> = stream::iter(inputs)
      .map(|source| {
        let processor = processor.clone();
        let aggregator = aggregator.clone();
        let output = output.clone();
        async move { scan_one(source, &processor, &aggregator, output).await }
      })
      .buffer_unordered(self.limit)
      .collect()
      .await;

    let mut summary = ScanSummary::default();
    for outcome in outcomes {
      summary.push(outcome);
    }

    info!(
      "扫描完成: 成功 {}, 失败 {}",
      summary.processed.len(),
      summary.failures.len()
    );
    Ok(summary)
  }
}
