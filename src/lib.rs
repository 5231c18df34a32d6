// 该文件是 Chufang （厨房） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod aggregator;
pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod processor;
pub mod recipe;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 把 `file://` 或自定义方案的 URL 路径还原为本地路径，百分号编码会被解码
///
/// `file://` 交给 [`url::Url::to_file_path`]，其它方案按 UTF-8 解码 `path()`。
pub(crate) fn url_file_path(url: &url::Url) -> Option<std::path::PathBuf> {
  if url.scheme() == "file" {
    return url.to_file_path().ok();
  }
  let path = urlencoding::decode(url.path()).ok()?;
  if path.is_empty() {
    return None;
  }
  Some(std::path::PathBuf::from(path.into_owned()))
}

/// 初始化日志输出，`RUST_LOG` 未设置时使用 `default_level`
pub fn init_tracing(default_level: &str) {
  use tracing_subscriber::EnvFilter;

  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(true)
    .try_init();
}
