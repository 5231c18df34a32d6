// 该文件是 Chufang （厨房） 项目的一部分。
// src/recipe/gemini.rs - Gemini 文本生成服务
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

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, error, info};
use url::Url;

use crate::recipe::{GenerationError, GenerationService};
use crate::{FromUrl, FromUrlWithScheme};

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash-001";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub struct GeminiServiceBuilder {
  model: String,
  timeout: Duration,
  api_key: Option<String>,
}

impl FromUrlWithScheme for GeminiServiceBuilder {
  const SCHEME: &'static str = "gemini";
}

impl FromUrl for GeminiServiceBuilder {
  type Error = GenerationError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GenerationError::ConfigError(format!(
        "生成服务必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let model = url
      .host_str()
      .filter(|host| !host.is_empty())
      .unwrap_or(DEFAULT_MODEL)
      .to_string();

    let mut timeout = Duration::from_secs(DEFAULT_TIMEOUT_SECS);
    for (key, value) in url.query_pairs() {
      if key == "timeout" {
        let secs: u64 = value
          .parse()
          .map_err(|_| GenerationError::ConfigError(format!("无效的超时时间: {}", value)))?;
        timeout = Duration::from_secs(secs);
      }
    }

    Ok(GeminiServiceBuilder {
      model,
      timeout,
      api_key: None,
    })
  }
}

impl Default for GeminiServiceBuilder {
  fn default() -> Self {
    Self {
      model: DEFAULT_MODEL.to_string(),
      timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
      api_key: None,
    }
  }
}

impl GeminiServiceBuilder {
  pub fn api_key(mut self, api_key: Option<String>) -> Self {
    self.api_key = api_key;
    self
  }

  /// 未显式给出 API Key 时读取 `GEMINI_API_KEY`
  pub fn build(self) -> Result<GeminiService, GenerationError> {
    let api_key = match self.api_key {
      Some(key) => key,
      None => std::env::var(GEMINI_API_KEY_ENV).unwrap_or_default(),
    };
    if api_key.trim().is_empty() {
      error!("未找到 {}", GEMINI_API_KEY_ENV);
      return Err(GenerationError::MissingApiKey(GEMINI_API_KEY_ENV.to_string()));
    }

    let client = Client::builder().timeout(self.timeout).build()?;
    info!("使用 Gemini 模型: {}, 超时: {:?}", self.model, self.timeout);

    Ok(GeminiService {
      client,
      api_key,
      model: self.model,
      base_url: GEMINI_BASE_URL.to_string(),
    })
  }
}

/// Google Gemini `generateContent` 客户端
pub struct GeminiService {
  client: Client,
  api_key: String,
  model: String,
  base_url: String,
}

impl GeminiService {
  pub fn model(&self) -> &str {
    &self.model
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/models/{}:generateContent?key={}",
      self.base_url,
      urlencoding::encode(&self.model),
      urlencoding::encode(&self.api_key)
    )
  }
}

#[async_trait]
impl GenerationService for GeminiService {
  async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
    let body = json!({
      "contents": [{
        "role": "user",
        "parts": [{"text": prompt}]
      }]
    });

    debug!("请求 Gemini 模型 {}", self.model);
    let response = self.client.post(self.endpoint()).json(&body).send().await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      return Err(GenerationError::Status { status, body });
    }

    let json: serde_json::Value = response.json().await?;
    extract_text(&json)
  }
}

/// 拼接 `candidates[0].content.parts[*].text`
pub fn extract_text(response: &serde_json::Value) -> Result<String, GenerationError> {
  let parts = response["candidates"][0]["content"]["parts"]
    .as_array()
    .ok_or_else(|| GenerationError::InvalidResponse("响应中没有候选内容".to_string()))?;

  let text: String = parts.iter().filter_map(|part| part["text"].as_str()).collect();
  if text.is_empty() {
    return Err(GenerationError::InvalidResponse("候选内容为空".to_string()));
  }
  Ok(text)
}
