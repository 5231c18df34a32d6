// 该文件是 Chufang （厨房） 项目的一部分。
// src/recipe.rs - 菜谱生成请求
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

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[cfg(feature = "gemini")]
mod gemini;
#[cfg(feature = "gemini")]
pub use self::gemini::{GEMINI_API_KEY_ENV, GeminiService, GeminiServiceBuilder, extract_text};

const DEFAULT_CUISINE: &str = "Thai";
const DEFAULT_RECIPE_COUNT: usize = 3;
const CODE_FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
  pub name: String,
  pub ingredients: Vec<String>,
  pub instructions: Vec<String>,
  pub calories: String,
  pub tags: Vec<String>,
}

#[derive(Error, Debug)]
pub enum GenerationError {
  #[error("未设置 API Key: {0}")]
  MissingApiKey(String),
  #[cfg(feature = "gemini")]
  #[error("HTTP 请求错误: {0}")]
  HttpError(#[from] reqwest::Error),
  #[error("服务返回错误状态 {status}: {body}")]
  Status { status: u16, body: String },
  #[error("无效的服务响应: {0}")]
  InvalidResponse(String),
  #[error("配置错误: {0}")]
  ConfigError(String),
}

#[derive(Error, Debug)]
pub enum RecipeError {
  #[error("文本生成错误: {0}")]
  GenerationError(#[from] GenerationError),
  #[error("菜谱 JSON 解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 文本生成服务
#[async_trait]
pub trait GenerationService: Send + Sync {
  async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

#[async_trait]
impl<S: GenerationService + ?Sized> GenerationService for std::sync::Arc<S> {
  async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
    (**self).complete(prompt).await
  }
}

/// 构造请求菜谱的提示词，标签按字典序以逗号连接
pub fn build_prompt(labels: &BTreeSet<String>, cuisine: &str, count: usize) -> String {
  let ingredients = labels.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
  format!(
    r#"You are a professional chef. I have these ingredients: {ingredients}

Suggest exactly {count} {cuisine} dishes that use these ingredients as their main components (basic seasonings may be added).
Answer with a JSON array only, in this format:
[
  {{
    "name": "dish name",
    "ingredients": ["ingredient with quantity"],
    "instructions": ["step 1", "step 2"],
    "calories": "about xxx kcal",
    "tags": ["spicy", "easy", "high protein"]
  }}
]
No introduction, no prose, no Markdown code fences. Raw JSON only."#
  )
}

/// 去掉首尾的 ``` 代码块标记（开头可带语言标识）
pub fn strip_code_fences(text: &str) -> &str {
  let mut text = text.trim();
  if let Some(rest) = text.strip_prefix(CODE_FENCE) {
    text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  }
  if let Some(rest) = text.trim_end().strip_suffix(CODE_FENCE) {
    text = rest;
  }
  text.trim()
}

pub fn parse_recipes(text: &str) -> Result<Vec<Recipe>, RecipeError> {
  Ok(serde_json::from_str(strip_code_fences(text))?)
}

/// 由食材集合请求菜谱
pub struct RecipePipeline<S> {
  service: S,
  cuisine: String,
  count: usize,
}

impl<S: GenerationService> RecipePipeline<S> {
  pub fn new(service: S) -> Self {
    Self {
      service,
      cuisine: DEFAULT_CUISINE.to_string(),
      count: DEFAULT_RECIPE_COUNT,
    }
  }

  pub fn cuisine(mut self, cuisine: impl Into<String>) -> Self {
    self.cuisine = cuisine.into();
    self
  }

  pub fn count(mut self, count: usize) -> Self {
    self.count = count;
    self
  }

  pub fn prompt(&self, labels: &BTreeSet<String>) -> String {
    build_prompt(labels, &self.cuisine, self.count)
  }

  /// 请求并解析菜谱，错误原样返回
  pub async fn try_request_recipes(
    &self,
    labels: &BTreeSet<String>,
  ) -> Result<Vec<Recipe>, RecipeError> {
    let prompt = self.prompt(labels);
    debug!("菜谱提示词: {}", prompt);
    let text = self.service.complete(&prompt).await?;
    debug!("生成服务返回 {} 字节", text.len());
    parse_recipes(&text)
  }

  /// 失败时返回空列表，调用方永远拿到一个合法列表
  pub async fn request_recipes(&self, labels: &BTreeSet<String>) -> Vec<Recipe> {
    if labels.is_empty() {
      warn!("食材为空，不请求菜谱");
      return Vec::new();
    }

    info!("请求 {} 道{}菜谱，食材: {:?}", self.count, self.cuisine, labels);
    match self.try_request_recipes(labels).await {
      Ok(recipes) => {
        info!("获得 {} 道菜谱", recipes.len());
        recipes
      }
      // 生成或解析失败有意吞掉，只记录日志
      Err(e) => {
        error!("菜谱请求失败: {}", e);
        Vec::new()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;

  /// 返回固定文本并记录提示词
  struct MockService {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
  }

  impl MockService {
    fn replying(text: &str) -> Self {
      Self {
        reply: Ok(text.to_string()),
        prompts: Mutex::new(Vec::new()),
      }
    }

    fn failing(message: &str) -> Self {
      Self {
        reply: Err(message.to_string()),
        prompts: Mutex::new(Vec::new()),
      }
    }
  }

  #[async_trait]
  impl GenerationService for MockService {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
      self.prompts.lock().push(prompt.to_string());
      self
        .reply
        .clone()
        .map_err(GenerationError::InvalidResponse)
    }
  }

  const ONE_RECIPE: &str = r#"[{"name":"A","ingredients":["egg"],"instructions":["fry"],"calories":"about 200 kcal","tags":["easy"]}]"#;

  fn labels(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_prompt_contains_labels() {
    let prompt = build_prompt(&labels(&["tomato", "egg"]), "Thai", 3);
    assert!(prompt.contains("egg, tomato"));
    assert!(prompt.contains("exactly 3 Thai dishes"));
    assert!(prompt.contains("\"calories\""));
  }

  #[test]
  fn test_strip_code_fences() {
    assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
    assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
    assert_eq!(strip_code_fences("  [1]  "), "[1]");
    assert_eq!(strip_code_fences("```json[1]```"), "[1]");
  }

  #[test]
  fn test_parse_rejects_wrong_shape() {
    assert!(parse_recipes(r#"{"name":"A"}"#).is_err());
    assert!(parse_recipes(r#"[{"name":"A"}]"#).is_err());
  }

  #[tokio::test]
  async fn test_fenced_json_yields_one_recipe() {
    let reply = format!("```json\n{}\n```", ONE_RECIPE);
    let pipeline = RecipePipeline::new(MockService::replying(&reply));

    let recipes = pipeline.request_recipes(&labels(&["egg"])).await;
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].name, "A");
    assert_eq!(recipes[0].ingredients, vec!["egg"]);
  }

  #[tokio::test]
  async fn test_not_json_yields_empty() {
    let pipeline = RecipePipeline::new(MockService::replying("not json at all"));
    assert!(pipeline.request_recipes(&labels(&["egg"])).await.is_empty());
  }

  #[tokio::test]
  async fn test_service_failure_yields_empty() {
    let pipeline = RecipePipeline::new(MockService::failing("unreachable"));
    assert!(pipeline.request_recipes(&labels(&["egg"])).await.is_empty());
    assert!(matches!(
      pipeline.try_request_recipes(&labels(&["egg"])).await,
      Err(RecipeError::GenerationError(_))
    ));
  }

  #[tokio::test]
  async fn test_prompt_reaches_service() {
    let service = std::sync::Arc::new(MockService::replying(ONE_RECIPE));
    let pipeline = RecipePipeline::new(service.clone()).cuisine("Italian").count(2);

    pipeline.request_recipes(&labels(&["egg", "tomato"])).await;
    let prompts = service.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("egg"));
    assert!(prompts[0].contains("tomato"));
    assert!(prompts[0].contains("exactly 2 Italian dishes"));
  }

  #[tokio::test]
  async fn test_empty_labels_never_reach_service() {
    let service = std::sync::Arc::new(MockService::replying(ONE_RECIPE));
    let pipeline = RecipePipeline::new(service.clone());

    assert!(pipeline.request_recipes(&BTreeSet::new()).await.is_empty());
    assert!(service.prompts.lock().is_empty());
  }

  #[test]
  fn test_recipe_serializes() {
    let recipes = parse_recipes(ONE_RECIPE).unwrap();
    let json = serde_json::to_string(&recipes).unwrap();
    assert_eq!(json, ONE_RECIPE);
  }
}
