// 该文件是 Chufang （厨房） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 推理后端
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

use ndarray::Ix3;
use ort::session::Session;
use ort::value::TensorRef;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::frame::{InputSpec, InputTensor, TensorLayout};
use crate::model::{Model, RawOutput};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum OnnxModelError {
  #[error("ONNX Runtime 错误: {0}")]
  OrtError(#[from] ort::Error),
  #[error("输出张量形状错误: {0}")]
  ShapeError(#[from] ndarray::ShapeError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("未知的张量布局: {0}")]
  UnknownLayout(String),
  #[error("模型没有输出")]
  NoOutput,
}

pub struct OnnxModelBuilder {
  model_path: PathBuf,
  spec: InputSpec,
}

impl FromUrl for OnnxModelBuilder {
  type Error = OnnxModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OnnxModelError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut spec = InputSpec::default();
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "layout" => {
          spec.layout = TensorLayout::from_name(&value)
            .ok_or_else(|| OnnxModelError::UnknownLayout(value.to_string()))?;
        }
        "width" => {
          spec.width = value
            .parse()
            .map_err(|_| OnnxModelError::ModelPathError(format!("无效的宽度: {}", value)))?;
        }
        "height" => {
          spec.height = value
            .parse()
            .map_err(|_| OnnxModelError::ModelPathError(format!("无效的高度: {}", value)))?;
        }
        _ => {}
      }
    }

    let model_path = crate::url_file_path(url)
      .ok_or_else(|| OnnxModelError::ModelPathError(format!("无效的模型路径: {}", url)))?;

    Ok(OnnxModelBuilder {
      model_path,
      spec,
    })
  }
}

impl FromUrlWithScheme for OnnxModelBuilder {
  const SCHEME: &'static str = "onnx";
}

impl OnnxModelBuilder {
  pub fn layout(mut self, layout: TensorLayout) -> Self {
    self.spec.layout = layout;
    self
  }

  pub fn build(self) -> Result<OnnxModel, OnnxModelError> {
    info!("加载模型文件: {}", self.model_path.display());
    let session = Session::builder()?.commit_from_file(&self.model_path)?;
    debug!(
      "模型输入数量: {}, 输出数量: {}",
      session.inputs.len(),
      session.outputs.len()
    );
    info!("模型加载完成, 输入规格: {:?}", self.spec);

    Ok(OnnxModel {
      session: Mutex::new(session),
      spec: self.spec,
    })
  }
}

/// 单输入单输出的 ONNX 检测模型
pub struct OnnxModel {
  // 执行需要可变借用
  session: Mutex<Session>,
  spec: InputSpec,
}

impl Model for OnnxModel {
  type Error = OnnxModelError;

  fn input_spec(&self) -> InputSpec {
    self.spec
  }

  fn infer(&self, input: &InputTensor) -> Result<RawOutput, Self::Error> {
    debug!("执行模型推理, 输入形状: {:?}", input.view().shape());
    let mut session = self.session.lock();
    let outputs = session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
    if outputs.len() == 0 {
      return Err(OnnxModelError::NoOutput);
    }

    let output = outputs[0]
      .try_extract_array::<f32>()?
      .into_dimensionality::<Ix3>()?
      .to_owned();
    debug!("模型输出形状: {:?}", output.shape());
    Ok(output)
  }
}
