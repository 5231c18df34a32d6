// 该文件是 Chufang （厨房） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};

use chrono::{Datelike, Utc};
use thiserror::Error;
use tracing::debug;

use crate::{FromUrl, FromUrlWithScheme, output::Render, processor::ProcessedImage};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("无效的输出目录: {0}")]
  InvalidPath(String),
}

/// 按日期分目录保存标注图与标签清单
///
/// `folder:///dir` 写入 `dir/YYYY/MM/DD/<id>.png` 与 `<id>.txt`，
/// 带 `?original` 时另存 `<id>-original.png`。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  save_original: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let save_original = uri.query_pairs().any(|(k, _)| k == "original");

    let directory = crate::url_file_path(uri)
      .ok_or_else(|| DirectoryRecordOutputError::InvalidPath(uri.to_string()))?;

    Ok(DirectoryRecordOutput {
      directory,
      save_original,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn new<P: AsRef<Path>>(directory: P) -> Self {
    Self {
      directory: directory.as_ref().to_path_buf(),
      save_original: false,
    }
  }

  pub fn save_original(mut self, save_original: bool) -> Self {
    self.save_original = save_original;
    self
  }

  fn day_directory(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;
    Ok(directory)
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render(&self, image: &ProcessedImage) -> Result<(), Self::Error> {
    let directory = self.day_directory()?;
    let path = directory.join(format!("{}.png", image.id));
    debug!("保存标注图像: {}", path.display());
    image.annotated.save(&path)?;

    let mut listing = image.labels.iter().cloned().collect::<Vec<_>>().join("\n");
    if !listing.is_empty() {
      listing.push('\n');
    }
    std::fs::write(path.with_extension("txt"), listing)?;

    if self.save_original {
      image
        .original
        .save(directory.join(format!("{}-original.png", image.id)))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};
  use std::collections::BTreeSet;
  use std::sync::Arc;

  fn processed(labels: &[&str]) -> ProcessedImage {
    ProcessedImage {
      id: "abc".to_string(),
      original: Arc::new(RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]))),
      annotated: Arc::new(RgbImage::from_pixel(4, 4, Rgb([0, 255, 0]))),
      labels: labels.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
    }
  }

  fn find(dir: &Path, name: &str) -> Option<PathBuf> {
    for entry in std::fs::read_dir(dir).ok()? {
      let path = entry.ok()?.path();
      if path.is_dir() {
        if let Some(found) = find(&path, name) {
          return Some(found);
        }
      } else if path.file_name().is_some_and(|n| n == name) {
        return Some(path);
      }
    }
    None
  }

  #[test]
  fn test_from_url() {
    let url = url::Url::parse("folder:///var/chufang?original").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.directory, PathBuf::from("/var/chufang"));
    assert!(output.save_original);

    let url = url::Url::parse("file:///var/chufang").unwrap();
    assert!(matches!(
      DirectoryRecordOutput::from_url(&url),
      Err(DirectoryRecordOutputError::SchemeMismatch)
    ));
  }

  #[test]
  fn test_from_url_decodes_directory() {
    let url = url::Url::parse("folder:///var/%E0%B8%84%E0%B8%A3%E0%B8%B1%E0%B8%A7%20out").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.directory, PathBuf::from("/var/ครัว out"));
  }

  #[test]
  fn test_render_writes_image_and_labels() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path());
    output.render(&processed(&["tomato", "egg"])).unwrap();

    let png = find(dir.path(), "abc.png").unwrap();
    let saved = image::open(&png).unwrap().to_rgb8();
    assert_eq!(saved.get_pixel(0, 0), &Rgb([0, 255, 0]));

    let txt = std::fs::read_to_string(png.with_extension("txt")).unwrap();
    assert_eq!(txt, "egg\ntomato\n");
    assert!(find(dir.path(), "abc-original.png").is_none());
  }

  #[test]
  fn test_render_saves_original() {
    let dir = tempfile::tempdir().unwrap();
    let output = DirectoryRecordOutput::new(dir.path()).save_original(true);
    output.render(&processed(&[])).unwrap();

    let original = find(dir.path(), "abc-original.png").unwrap();
    let saved = image::open(&original).unwrap().to_rgb8();
    assert_eq!(saved.get_pixel(3, 3), &Rgb([9, 9, 9]));
  }
}
