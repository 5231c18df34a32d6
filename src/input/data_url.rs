// 该文件是 Chufang （厨房） 项目的一部分。
// src/input/data_url.rs - data URL 解析
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

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::ImageSourceError;

/// 取出 `data:[<mediatype>][;base64],<data>` 中的负载字节
pub fn parse_data_url(url: &str) -> Result<Vec<u8>, ImageSourceError> {
  let rest = url
    .strip_prefix("data:")
    .ok_or_else(|| ImageSourceError::InvalidDataUrl("缺少 data: 前缀".to_string()))?;
  let (header, payload) = rest
    .split_once(',')
    .ok_or_else(|| ImageSourceError::InvalidDataUrl("缺少逗号分隔符".to_string()))?;

  if header.ends_with(";base64") {
    // 浏览器产生的负载中可能含有百分号转义或换行
    let payload = urlencoding::decode(payload)
      .map_err(|e| ImageSourceError::InvalidDataUrl(e.to_string()))?;
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    Ok(STANDARD.decode(cleaned)?)
  } else {
    Ok(urlencoding::decode_binary(payload.as_bytes()).into_owned())
  }
}
