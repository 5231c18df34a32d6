// 该文件是 Chufang （厨房） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{Detection, LabelTable};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TAG_HEIGHT: i32 = 30;
const LABEL_TAG_PADDING: i32 = 10;
const LABEL_TEXT_OFFSET_X: i32 = 5;
const LABEL_TEXT_OFFSET_Y: i32 = 28; // 文本顶部距框上沿
const LABEL_CHAR_WIDTH: f32 = 11.0; // 无字体时每字符平均宽度（粗略估计）
const BOX_THICKNESS: i32 = 4;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // #00FF00
const TEXT_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 在原图副本上绘制检测框与 `"<label> <pct>%"` 标签
///
/// 没有字体时只绘制框和标签底色，底色宽度按字符数估计。
#[derive(Clone)]
pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  box_color: Rgb<u8>,
  text_color: Rgb<u8>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      font_size: LABEL_FONT_SIZE,
      box_color: Rgb(BOX_COLOR),
      text_color: Rgb(TEXT_COLOR),
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn load_font<P: AsRef<Path>>(self, path: P) -> Result<Self, DrawError> {
    let path = path.as_ref();
    info!("加载字体文件: {}", path.display());
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    Ok(self.with_font(font))
  }

  pub fn font_size(mut self, size: f32) -> Self {
    self.font_size = size;
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  /// 返回绘制后的新图像，原图不变
  pub fn draw_detections(
    &self,
    image: &RgbImage,
    detections: &[Detection],
    labels: &LabelTable,
  ) -> RgbImage {
    let mut canvas = image.clone();
    for detection in detections {
      self.draw_detection(&mut canvas, detection, labels.display_name(detection.class_index));
    }
    canvas
  }

  fn draw_detection(&self, image: &mut RgbImage, detection: &Detection, label: &str) {
    if !detection.bbox.iter().all(|v| v.is_finite()) {
      debug!("跳过坐标无效的检测框: {:?}", detection.bbox);
      return;
    }

    // 限制在图像尺寸的数倍以内，之后的整数运算不会溢出
    let (image_width, image_height) = image.dimensions();
    let x = clamp_coordinate(detection.x(), image_width);
    let y = clamp_coordinate(detection.y(), image_height);
    let width = clamp_extent(detection.width(), image_width);
    let height = clamp_extent(detection.height(), image_height);

    // 线宽以边为中心
    let half = BOX_THICKNESS / 2;
    for t in 0..BOX_THICKNESS {
      let offset = t - half;
      let w = width - 2 * offset;
      let h = height - 2 * offset;
      if w < 1 || h < 1 {
        continue;
      }
      let rect = Rect::at(x + offset, y + offset).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, self.box_color);
    }

    let text = format!("{} {}%", label, (detection.score * 100.0).round() as i32);
    let scale = PxScale::from(self.font_size);
    let text_width = match &self.font {
      Some(font) => text_size(scale, font, &text).0 as i32,
      None => (text.chars().count() as f32 * LABEL_CHAR_WIDTH) as i32,
    };

    // 标签位于框上方，不裁剪到图像内
    let tag_width = (text_width + LABEL_TAG_PADDING).max(1) as u32;
    let tag = Rect::at(x, y - LABEL_TAG_HEIGHT).of_size(tag_width, LABEL_TAG_HEIGHT as u32);
    draw_filled_rect_mut(image, tag, self.box_color);

    if let Some(font) = &self.font {
      draw_text_mut(
        image,
        self.text_color,
        x + LABEL_TEXT_OFFSET_X,
        y - LABEL_TEXT_OFFSET_Y,
        scale,
        font,
        &text,
      );
    }
  }
}

fn clamp_coordinate(value: f32, dim: u32) -> i32 {
  let limit = 2.0 * dim as f32 + LABEL_TAG_HEIGHT as f32;
  value.round().clamp(-limit, limit) as i32
}

fn clamp_extent(value: f32, dim: u32) -> i32 {
  let limit = 4.0 * dim as f32 + BOX_THICKNESS as f32;
  value.round().clamp(-limit, limit) as i32
}
