// 该文件是 Chufang （厨房） 项目的一部分。
// src/model/label.rs - 类别标签表
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// 类别索引越界时绘制使用的占位名称
pub const UNKNOWN_LABEL: &str = "Unknown";

const COCO_LABELS_TOML: &str = include_str!("../../labels/coco.toml");

#[derive(Error, Debug)]
pub enum LabelTableError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("标签文件解析错误: {0}")]
  ParseError(#[from] toml::de::Error),
  #[error("标签表为空")]
  Empty,
}

#[derive(Deserialize)]
struct LabelFile {
  labels: Vec<String>,
}

/// 按类别索引排列的标签名称
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  labels: Box<[String]>,
}

impl LabelTable {
  pub fn new<I, S>(labels: I) -> Result<Self, LabelTableError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let labels: Box<[String]> = labels.into_iter().map(Into::into).collect();
    if labels.is_empty() {
      return Err(LabelTableError::Empty);
    }
    Ok(Self { labels })
  }

  /// 解析 `labels = ["...", ...]` 形式的 TOML
  pub fn from_toml_str(content: &str) -> Result<Self, LabelTableError> {
    let file: LabelFile = toml::from_str(content)?;
    Self::new(file.labels)
  }

  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LabelTableError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_toml_str(&content)
  }

  /// 内置的 COCO 80 类标签
  pub fn coco() -> Result<Self, LabelTableError> {
    Self::from_toml_str(COCO_LABELS_TOML)
  }

  pub fn get(&self, class_index: usize) -> Option<&str> {
    self.labels.get(class_index).map(String::as_str)
  }

  /// 绘制用名称，越界时返回 [`UNKNOWN_LABEL`]
  pub fn display_name(&self, class_index: usize) -> &str {
    self.get(class_index).unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}
