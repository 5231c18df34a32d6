// 该文件是 Chufang （厨房） 项目的一部分。
// src/input.rs - 图像输入
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::FromUrl;

mod data_url;
mod read_image_file;

pub use self::data_url::parse_data_url;

#[derive(Error, Debug)]
pub enum ImageSourceError {
  #[error("不支持的 URI 方案: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("无效的文件路径: {0}")]
  InvalidPath(String),
  #[error("无效的 data URL: {0}")]
  InvalidDataUrl(String),
  #[error("Base64 解码错误: {0}")]
  Base64Error(#[from] base64::DecodeError),
  #[cfg(feature = "http_input")]
  #[error("HTTP 请求错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("后台任务错误: {0}")]
  JoinError(#[from] tokio::task::JoinError),
}

/// 单张图像的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
  /// `image:///path` 或 `file:///path`
  File(PathBuf),
  /// `data:image/jpeg;base64,...`，已解出的编码字节
  Data(Vec<u8>),
  #[cfg(feature = "http_input")]
  Http(Url),
}

impl FromUrl for ImageSource {
  type Error = ImageSourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "image" | "file" => crate::url_file_path(url)
        .map(ImageSource::File)
        .ok_or_else(|| {
          error!("无法从 {} 得到本地路径", url);
          ImageSourceError::InvalidPath(url.to_string())
        }),
      "data" => Ok(ImageSource::Data(parse_data_url(url.as_str())?)),
      #[cfg(feature = "http_input")]
      "http" | "https" => Ok(ImageSource::Http(url.clone())),
      scheme => {
        error!("不支持的图像来源: {}", url);
        Err(ImageSourceError::SchemeMismatch(scheme.to_string()))
      }
    }
  }
}

impl ImageSource {
  /// 读取并解码为 RGB 图像，解码在阻塞线程池中进行
  pub async fn load(self) -> Result<RgbImage, ImageSourceError> {
    let bytes = match self {
      ImageSource::File(path) => return read_image_file::read_image_file(path).await,
      ImageSource::Data(bytes) => bytes,
      #[cfg(feature = "http_input")]
      ImageSource::Http(url) => {
        debug!("下载图像: {}", url);
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
      }
    };
    decode_image_bytes(bytes).await
  }
}

pub(crate) async fn decode_image_bytes(bytes: Vec<u8>) -> Result<RgbImage, ImageSourceError> {
  debug!("解码图像数据: {} 字节", bytes.len());
  let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes)).await??;
  Ok(image.to_rgb8())
}
