// 该文件是 Chufang （厨房） 项目的一部分。
// src/aggregator.rs - 多图食材汇总
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

use parking_lot::Mutex;
use tracing::debug;

use crate::processor::ProcessedImage;

/// 已处理图像的有序集合
///
/// 全局标签集每次调用时重新计算，始终等于当前所有图像标签的并集。
#[derive(Default)]
pub struct IngredientAggregator {
  images: Mutex<Vec<ProcessedImage>>,
}

impl IngredientAggregator {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&self, image: ProcessedImage) {
    debug!("加入图像 {}，标签: {:?}", image.id, image.labels);
    self.images.lock().push(image);
  }

  pub fn remove(&self, id: &str) -> Option<ProcessedImage> {
    let mut images = self.images.lock();
    let index = images.iter().position(|image| image.id == id)?;
    debug!("移除图像 {}", id);
    Some(images.remove(index))
  }

  pub fn clear(&self) {
    self.images.lock().clear();
  }

  pub fn global_labels(&self) -> BTreeSet<String> {
    self
      .images
      .lock()
      .iter()
      .flat_map(|image| image.labels.iter().cloned())
      .collect()
  }

  pub fn len(&self) -> usize {
    self.images.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.images.lock().is_empty()
  }

  pub fn get(&self, id: &str) -> Option<ProcessedImage> {
    self.images.lock().iter().find(|image| image.id == id).cloned()
  }

  /// 按加入顺序的快照
  pub fn snapshot(&self) -> Vec<ProcessedImage> {
    self.images.lock().clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;
  use proptest::prelude::*;
  use std::sync::Arc;

  fn image(id: &str, labels: &[&str]) -> ProcessedImage {
    let pixels = Arc::new(RgbImage::new(1, 1));
    ProcessedImage {
      id: id.to_string(),
      original: pixels.clone(),
      annotated: pixels,
      labels: labels.iter().map(|s| s.to_string()).collect(),
    }
  }

  fn set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn test_union_sorted_and_deduplicated() {
    let aggregator = IngredientAggregator::new();
    aggregator.add(image("a", &["tomato", "egg"]));
    aggregator.add(image("b", &["egg", "basil"]));

    let labels: Vec<_> = aggregator.global_labels().into_iter().collect();
    assert_eq!(labels, vec!["basil", "egg", "tomato"]);
    assert_eq!(aggregator.len(), 2);
  }

  #[test]
  fn test_shared_label_survives_removal() {
    let aggregator = IngredientAggregator::new();
    aggregator.add(image("a", &["egg", "tomato"]));
    aggregator.add(image("b", &["egg"]));

    let removed = aggregator.remove("b").unwrap();
    assert_eq!(removed.id, "b");
    assert_eq!(aggregator.global_labels(), set(&["egg", "tomato"]));

    aggregator.remove("a");
    assert!(aggregator.global_labels().is_empty());
    assert!(aggregator.is_empty());
  }

  #[test]
  fn test_remove_unknown_id() {
    let aggregator = IngredientAggregator::new();
    aggregator.add(image("a", &["egg"]));
    assert!(aggregator.remove("zzz").is_none());
    assert_eq!(aggregator.len(), 1);
  }

  #[test]
  fn test_get_snapshot_clear() {
    let aggregator = IngredientAggregator::new();
    aggregator.add(image("a", &["egg"]));
    aggregator.add(image("b", &["rice"]));

    assert_eq!(aggregator.get("b").unwrap().labels, set(&["rice"]));
    let ids: Vec<_> = aggregator.snapshot().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["a", "b"]);

    aggregator.clear();
    assert!(aggregator.is_empty());
    assert!(aggregator.global_labels().is_empty());
    assert!(aggregator.get("a").is_none());
  }

  #[derive(Debug, Clone)]
  enum Op {
    Add(Vec<u8>),
    Remove(usize),
    Clear,
  }

  fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
      4 => prop::collection::vec(0u8..6, 0..4).prop_map(Op::Add),
      2 => (0usize..8).prop_map(Op::Remove),
      1 => Just(Op::Clear),
    ]
  }

  proptest! {
    #[test]
    fn prop_global_labels_is_union_of_live(ops in prop::collection::vec(op(), 0..40)) {
      let aggregator = IngredientAggregator::new();
      let mut model: Vec<(String, BTreeSet<String>)> = Vec::new();
      let mut next_id = 0usize;

      for op in ops {
        match op {
          Op::Add(labels) => {
            let id = next_id.to_string();
            next_id += 1;
            let labels: BTreeSet<String> = labels.iter().map(|l| format!("item{}", l)).collect();
            let names: Vec<&str> = labels.iter().map(String::as_str).collect();
            aggregator.add(image(&id, &names));
            model.push((id, labels));
          }
          Op::Remove(i) => {
            if model.is_empty() {
              prop_assert!(aggregator.remove("missing").is_none());
            } else {
              let (id, _) = model.remove(i % model.len());
              prop_assert!(aggregator.remove(&id).is_some());
            }
          }
          Op::Clear => {
            aggregator.clear();
            model.clear();
          }
        }

        let expected: BTreeSet<String> =
          model.iter().flat_map(|(_, labels)| labels.iter().cloned()).collect();
        prop_assert_eq!(aggregator.global_labels(), expected);
        prop_assert_eq!(aggregator.len(), model.len());
      }
    }
  }
}
