// 该文件是 Chufang （厨房） 项目的一部分。
// src/processor.rs - 单张图像处理
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
use std::sync::Arc;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::FromUrl;
use crate::frame::InputTensor;
use crate::input::{ImageSource, ImageSourceError};
use crate::model::{DecodeError, Detection, DetectionDecoder, LabelTable, Model};
use crate::output::draw::Draw;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum ProcessError {
  #[error("图像来源错误: {0}")]
  SourceError(#[from] ImageSourceError),
  #[error("推理错误: {0}")]
  InferenceError(#[source] BoxedError),
  #[error("解码错误: {0}")]
  DecodeError(#[from] DecodeError),
  #[error("后台任务错误: {0}")]
  JoinError(#[from] tokio::task::JoinError),
}

/// 一张处理完成的图像
#[derive(Debug, Clone)]
pub struct ProcessedImage {
  pub id: String,
  pub original: Arc<RgbImage>,
  pub annotated: Arc<RgbImage>,
  /// 本图中去重后的标签
  pub labels: BTreeSet<String>,
}

/// 图像到标签集的完整处理流程
pub struct FrameProcessor<M> {
  model: Arc<M>,
  labels: Arc<LabelTable>,
  decoder: DetectionDecoder,
  draw: Arc<Draw>,
}

impl<M> Clone for FrameProcessor<M> {
  fn clone(&self) -> Self {
    Self {
      model: self.model.clone(),
      labels: self.labels.clone(),
      decoder: self.decoder,
      draw: self.draw.clone(),
    }
  }
}

impl<M: Model + 'static> FrameProcessor<M> {
  /// 只能围绕已加载的模型构建
  pub fn new(model: M, labels: LabelTable) -> Self {
    let spec = model.input_spec();
    Self {
      model: Arc::new(model),
      labels: Arc::new(labels),
      decoder: DetectionDecoder::default().input_size(spec.width, spec.height),
      draw: Arc::new(Draw::default()),
    }
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.decoder = self.decoder.confidence_threshold(threshold);
    self
  }

  pub fn draw(mut self, draw: Draw) -> Self {
    self.draw = Arc::new(draw);
    self
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn decoder(&self) -> &DetectionDecoder {
    &self.decoder
  }

  /// 用全零输入执行一次推理
  pub async fn warm_up(&self) -> Result<(), ProcessError> {
    info!("模型预热");
    let model = self.model.clone();
    tokio::task::spawn_blocking(move || {
      let input = InputTensor::zeros(&model.input_spec());
      model.infer(&input).map(|_| ())
    })
    .await?
    .map_err(|e| ProcessError::InferenceError(Box::new(e)))?;
    info!("模型预热完成");
    Ok(())
  }

  pub async fn process(&self, url: &Url) -> Result<ProcessedImage, ProcessError> {
    debug!("处理图像: {}", url);
    let image = ImageSource::from_url(url)?.load().await?;
    self.process_image(image).await
  }

  pub async fn process_image(&self, image: RgbImage) -> Result<ProcessedImage, ProcessError> {
    let (width, height) = image.dimensions();
    let model = self.model.clone();
    let image = Arc::new(image);

    let raw = {
      let image = image.clone();
      tokio::task::spawn_blocking(move || {
        let input = InputTensor::from_rgb_image(&image, &model.input_spec());
        model.infer(&input)
      })
      .await?
      .map_err(|e| ProcessError::InferenceError(Box::new(e)))?
    };

    let num_classes = DetectionDecoder::num_classes(&raw.view())?;
    if num_classes != self.labels.len() {
      warn!(
        "模型类别数 {} 与标签表长度 {} 不一致",
        num_classes,
        self.labels.len()
      );
    }

    let detections = self.decoder.decode(raw.view(), width, height)?;
    drop(raw);

    let labels = self.collect_labels(&detections);
    let annotated = self.draw.draw_detections(&image, &detections, &self.labels);
    let id = uuid::Uuid::new_v4().to_string();
    info!("图像 {} 检测到 {} 个物体: {:?}", id, detections.len(), labels);

    Ok(ProcessedImage {
      id,
      original: image,
      annotated: Arc::new(annotated),
      labels,
    })
  }

  fn collect_labels(&self, detections: &[Detection]) -> BTreeSet<String> {
    let mut labels = BTreeSet::new();
    for detection in detections {
      match self.labels.get(detection.class_index) {
        Some(name) => {
          labels.insert(name.to_string());
        }
        None => warn!("类别索引 {} 超出标签表范围，已跳过", detection.class_index),
      }
    }
    labels
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::frame::InputSpec;
  use crate::model::RawOutput;
  use image::Rgb;
  use ndarray::Array3;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Error, Debug)]
  #[error("模拟推理失败")]
  pub struct MockError;

  /// 返回固定输出的模型
  pub struct MockModel {
    rows: Vec<Vec<f32>>,
    pub calls: AtomicUsize,
    fail: bool,
  }

  impl MockModel {
    pub fn new(rows: Vec<Vec<f32>>) -> Self {
      Self {
        rows,
        calls: AtomicUsize::new(0),
        fail: false,
      }
    }

    pub fn failing() -> Self {
      Self {
        rows: vec![],
        calls: AtomicUsize::new(0),
        fail: true,
      }
    }
  }

  impl Model for MockModel {
    type Error = MockError;

    fn input_spec(&self) -> InputSpec {
      InputSpec {
        width: 640,
        height: 640,
        ..InputSpec::default()
      }
    }

    fn infer(&self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      assert_eq!(input.view().shape(), &[1, 640, 640, 3]);
      if self.fail {
        return Err(MockError);
      }
      let channels = self.rows.first().map_or(6, Vec::len);
      let mut raw = Array3::<f32>::zeros((1, channels, self.rows.len()));
      for (n, row) in self.rows.iter().enumerate() {
        for (c, v) in row.iter().enumerate() {
          raw[[0, c, n]] = *v;
        }
      }
      Ok(raw)
    }
  }

  fn labels() -> LabelTable {
    LabelTable::new(["egg", "tomato"]).unwrap()
  }

  #[tokio::test]
  async fn test_labels_deduplicated() {
    let model = MockModel::new(vec![
      vec![100.0, 100.0, 20.0, 20.0, 0.9, 0.1],
      vec![200.0, 200.0, 20.0, 20.0, 0.8, 0.1],
      vec![300.0, 300.0, 20.0, 20.0, 0.1, 0.7],
      vec![400.0, 400.0, 20.0, 20.0, 0.3, 0.2],
    ]);
    let processor = FrameProcessor::new(model, labels());
    let image = RgbImage::from_pixel(640, 480, Rgb([255, 255, 255]));

    let processed = processor.process_image(image).await.unwrap();
    let labels: Vec<_> = processed.labels.iter().cloned().collect();
    assert_eq!(labels, vec!["egg", "tomato"]);
    assert_eq!(processed.original.dimensions(), (640, 480));
    assert_eq!(processed.annotated.dimensions(), (640, 480));
    assert_ne!(processed.original, processed.annotated);
    assert_eq!(processed.id.len(), 36);
  }

  #[tokio::test]
  async fn test_out_of_range_class_skipped() {
    let model = MockModel::new(vec![
      vec![100.0, 100.0, 20.0, 20.0, 0.1, 0.1, 0.9],
      vec![200.0, 200.0, 20.0, 20.0, 0.1, 0.8, 0.1],
    ]);
    let processor = FrameProcessor::new(model, labels());
    let processed = processor
      .process_image(RgbImage::new(64, 64))
      .await
      .unwrap();
    assert_eq!(processed.labels, BTreeSet::from(["tomato".to_string()]));
  }

  #[tokio::test]
  async fn test_threshold_configurable() {
    let model = MockModel::new(vec![vec![100.0, 100.0, 20.0, 20.0, 0.6, 0.1]]);
    let processor = FrameProcessor::new(model, labels()).confidence_threshold(0.7);
    let processed = processor
      .process_image(RgbImage::new(64, 64))
      .await
      .unwrap();
    assert!(processed.labels.is_empty());
    assert_eq!(processed.original, processed.annotated);
  }

  #[tokio::test]
  async fn test_inference_failure() {
    let processor = FrameProcessor::new(MockModel::failing(), labels());
    let result = processor.process_image(RgbImage::new(8, 8)).await;
    assert!(matches!(result, Err(ProcessError::InferenceError(_))));
  }

  #[tokio::test]
  async fn test_bad_output_shape() {
    let model = MockModel::new(vec![vec![1.0, 2.0, 3.0, 4.0]]);
    let processor = FrameProcessor::new(model, labels());
    let result = processor.process_image(RgbImage::new(8, 8)).await;
    assert!(matches!(
      result,
      Err(ProcessError::DecodeError(DecodeError::ShapeMismatch(_)))
    ));
  }

  #[tokio::test]
  async fn test_warm_up_runs_once() {
    let processor = FrameProcessor::new(MockModel::new(vec![]), labels());
    processor.warm_up().await.unwrap();
    assert_eq!(processor.model.calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_process_bad_scheme() {
    let processor = FrameProcessor::new(MockModel::new(vec![]), labels());
    let url = Url::parse("ftp://example.com/a.png").unwrap();
    assert!(matches!(
      processor.process(&url).await,
      Err(ProcessError::SourceError(ImageSourceError::SchemeMismatch(_)))
    ));
  }
}
