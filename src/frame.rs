// 该文件是 Chufang （厨房） 项目的一部分。
// src/frame.rs - 模型输入张量定义
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

use image::{
  RgbImage,
  imageops::{self, FilterType},
};
use ndarray::{Array4, ArrayView4};

const RGB_CHANNELS: usize = 3;

/// 参考部署中模型的固定输入分辨率
pub const MODEL_INPUT_SIZE: u32 = 640;

/// 输入张量的内存布局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TensorLayout {
  /// `[1, H, W, 3]`
  #[default]
  Nhwc,
  /// `[1, 3, H, W]`
  Nchw,
}

impl TensorLayout {
  pub fn from_name(name: &str) -> Option<Self> {
    match name.to_ascii_lowercase().as_str() {
      "nhwc" => Some(TensorLayout::Nhwc),
      "nchw" => Some(TensorLayout::Nchw),
      _ => None,
    }
  }
}

/// 模型对输入的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
  pub width: u32,
  pub height: u32,
  pub layout: TensorLayout,
}

impl Default for InputSpec {
  fn default() -> Self {
    Self {
      width: MODEL_INPUT_SIZE,
      height: MODEL_INPUT_SIZE,
      layout: TensorLayout::Nhwc,
    }
  }
}

impl InputSpec {
  pub fn shape(&self) -> [usize; 4] {
    let (w, h) = (self.width as usize, self.height as usize);
    match self.layout {
      TensorLayout::Nhwc => [1, h, w, RGB_CHANNELS],
      TensorLayout::Nchw => [1, RGB_CHANNELS, h, w],
    }
  }
}

/// 归一化到 [0, 1] 的浮点输入张量
///
/// 张量只属于一次推理调用，调用结束即释放。
#[derive(Debug, Clone)]
pub struct InputTensor {
  spec: InputSpec,
  data: Array4<f32>,
}

impl InputTensor {
  /// 全零输入，用于模型预热
  pub fn zeros(spec: &InputSpec) -> Self {
    Self {
      spec: *spec,
      data: Array4::zeros(spec.shape()),
    }
  }

  /// 双线性缩放到模型分辨率并归一化
  pub fn from_rgb_image(image: &RgbImage, spec: &InputSpec) -> Self {
    let resized = imageops::resize(image, spec.width, spec.height, FilterType::Triangle);
    let mut data = Array4::<f32>::zeros(spec.shape());

    for (x, y, pixel) in resized.enumerate_pixels() {
      let (x, y) = (x as usize, y as usize);
      for c in 0..RGB_CHANNELS {
        let value = pixel[c] as f32 / 255.0;
        match spec.layout {
          TensorLayout::Nhwc => data[[0, y, x, c]] = value,
          TensorLayout::Nchw => data[[0, c, y, x]] = value,
        }
      }
    }

    Self { spec: *spec, data }
  }

  pub fn spec(&self) -> &InputSpec {
    &self.spec
  }

  pub fn layout(&self) -> TensorLayout {
    self.spec.layout
  }

  pub fn width(&self) -> usize {
    self.spec.width as usize
  }

  pub fn height(&self) -> usize {
    self.spec.height as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn view(&self) -> ArrayView4<'_, f32> {
    self.data.view()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn test_layout_from_name() {
    assert_eq!(TensorLayout::from_name("NHWC"), Some(TensorLayout::Nhwc));
    assert_eq!(TensorLayout::from_name("nchw"), Some(TensorLayout::Nchw));
    assert_eq!(TensorLayout::from_name("hwc"), None);
  }

  #[test]
  fn test_default_spec_shape() {
    let spec = InputSpec::default();
    assert_eq!(spec.shape(), [1, 640, 640, 3]);
  }

  #[test]
  fn test_nhwc_normalized_values() {
    let image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 51]));
    let spec = InputSpec {
      width: 4,
      height: 4,
      layout: TensorLayout::Nhwc,
    };
    let tensor = InputTensor::from_rgb_image(&image, &spec);
    let view = tensor.view();

    assert_eq!(view.shape(), &[1, 4, 4, 3]);
    assert!((view[[0, 2, 1, 0]] - 1.0).abs() < 1e-6);
    assert!(view[[0, 2, 1, 1]].abs() < 1e-6);
    assert!((view[[0, 2, 1, 2]] - 0.2).abs() < 1e-6);
  }

  #[test]
  fn test_nchw_resizes_to_input_size() {
    let image = RgbImage::from_pixel(10, 6, Rgb([0, 255, 0]));
    let spec = InputSpec {
      width: 8,
      height: 8,
      layout: TensorLayout::Nchw,
    };
    let tensor = InputTensor::from_rgb_image(&image, &spec);
    let view = tensor.view();

    assert_eq!(view.shape(), &[1, 3, 8, 8]);
    assert!((view[[0, 1, 7, 7]] - 1.0).abs() < 1e-6);
    assert!(view[[0, 0, 7, 7]].abs() < 1e-6);
  }

  #[test]
  fn test_zeros() {
    let tensor = InputTensor::zeros(&InputSpec::default());
    assert_eq!(tensor.view().sum(), 0.0);
    assert_eq!(tensor.width(), 640);
    assert_eq!(tensor.channels(), 3);
  }
}
