// 该文件是 Chufang （厨房） 项目的一部分。
// src/model.rs - 模型
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

use ndarray::Array3;

use crate::frame::{InputSpec, InputTensor};

/// 模型原生输出，形状为 `[1, 4 + 类别数, 候选框数]`
pub type RawOutput = Array3<f32>;

/// 推理引擎
///
/// 模型的加载与执行都在实现方内部完成，这里只关心一次输入对应一次原始输出。
pub trait Model: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型期望的输入分辨率与布局
  fn input_spec(&self) -> InputSpec {
    InputSpec::default()
  }

  fn infer(&self, input: &InputTensor) -> Result<RawOutput, Self::Error>;
}

/// 单个检测结果，坐标为原图像素空间
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: [f32; 4], // [x, y, width, height]，左上角为原点
  pub score: f32,
  pub class_index: usize,
}

impl Detection {
  pub fn x(&self) -> f32 {
    self.bbox[0]
  }

  pub fn y(&self) -> f32 {
    self.bbox[1]
  }

  pub fn width(&self) -> f32 {
    self.bbox[2]
  }

  pub fn height(&self) -> f32 {
    self.bbox[3]
  }
}

pub mod decode;
mod label;
#[cfg(feature = "onnx")]
mod onnx;

pub use self::decode::{DecodeError, DetectionDecoder, decode};
pub use self::label::{LabelTable, LabelTableError, UNKNOWN_LABEL};
#[cfg(feature = "onnx")]
pub use self::onnx::{OnnxModel, OnnxModelBuilder, OnnxModelError};
