// 该文件是 Chufang （厨房） 项目的一部分。
// src/model/decode.rs - 检测结果解码
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

use ndarray::{ArrayView1, ArrayView3, Axis};
use thiserror::Error;
use tracing::debug;

use crate::frame::MODEL_INPUT_SIZE;
use crate::model::Detection;

/// 前四个通道为 cx, cy, w, h
const BOX_CHANNELS: usize = 4;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.4;

#[derive(Error, Debug, PartialEq)]
pub enum DecodeError {
  #[error("输出张量形状错误: 期望 [1, >=5, N]，实际为 {0:?}")]
  ShapeMismatch(Vec<usize>),
  #[error("尺寸不能为零: {width}x{height}")]
  ZeroDimension { width: u32, height: u32 },
}

/// 单阈值检测解码器，不做非极大值抑制
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionDecoder {
  pub input_width: u32,
  pub input_height: u32,
  pub confidence_threshold: f32,
}

impl Default for DetectionDecoder {
  fn default() -> Self {
    Self {
      input_width: MODEL_INPUT_SIZE,
      input_height: MODEL_INPUT_SIZE,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
    }
  }
}

impl DetectionDecoder {
  pub fn input_size(mut self, width: u32, height: u32) -> Self {
    self.input_width = width;
    self.input_height = height;
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  /// 类别数，形状不合法时返回错误
  pub fn num_classes(raw: &ArrayView3<'_, f32>) -> Result<usize, DecodeError> {
    let shape = raw.shape();
    if shape[0] != 1 || shape[1] <= BOX_CHANNELS {
      return Err(DecodeError::ShapeMismatch(shape.to_vec()));
    }
    Ok(shape[1] - BOX_CHANNELS)
  }

  /// 将 `[1, 4 + C, N]` 的原始输出解码为原图坐标系下的检测框
  pub fn decode(
    &self,
    raw: ArrayView3<'_, f32>,
    image_width: u32,
    image_height: u32,
  ) -> Result<Vec<Detection>, DecodeError> {
    let num_classes = Self::num_classes(&raw)?;
    if image_width == 0 || image_height == 0 {
      return Err(DecodeError::ZeroDimension {
        width: image_width,
        height: image_height,
      });
    }
    if self.input_width == 0 || self.input_height == 0 {
      return Err(DecodeError::ZeroDimension {
        width: self.input_width,
        height: self.input_height,
      });
    }

    let scale_x = image_width as f32 / self.input_width as f32;
    let scale_y = image_height as f32 / self.input_height as f32;

    // [1, 4 + C, N] -> [1, N, 4 + C]
    let rows = raw.permuted_axes([0, 2, 1]);
    let rows = rows.index_axis(Axis(0), 0);
    debug!("解码 {} 个候选框，{} 个类别", rows.nrows(), num_classes);

    let mut detections = Vec::new();
    for row in rows.outer_iter() {
      let Some((class_index, score)) = argmax(row.slice(ndarray::s![BOX_CHANNELS..])) else {
        continue;
      };
      if !(score > self.confidence_threshold) {
        continue;
      }

      let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
      let x = (cx - w / 2.0) * scale_x;
      let y = (cy - h / 2.0) * scale_y;
      detections.push(Detection {
        bbox: [x, y, w * scale_x, h * scale_y],
        score,
        class_index,
      });
    }

    debug!("保留 {} 个检测结果", detections.len());
    Ok(detections)
  }
}

/// 取第一个最大值的位置
fn argmax(scores: ArrayView1<'_, f32>) -> Option<(usize, f32)> {
  let mut iter = scores.iter().copied().enumerate();
  let first = iter.next()?;
  Some(iter.fold(first, |best, (i, v)| if v > best.1 { (i, v) } else { best }))
}

/// 使用默认 640x640 输入尺寸解码
pub fn decode(
  raw: ArrayView3<'_, f32>,
  image_width: u32,
  image_height: u32,
  confidence_threshold: f32,
) -> Result<Vec<Detection>, DecodeError> {
  DetectionDecoder::default()
    .confidence_threshold(confidence_threshold)
    .decode(raw, image_width, image_height)
}
