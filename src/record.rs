// 该文件是 ds-yolo 项目的一部分。
// src/record.rs - 单帧检测结果记录
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

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

use crate::{geometry::BoundingBox, label::ClassNames};

/// 一帧的检测结果，输出为
/// `{"frame_N": {"scores": [..], "labels": [..], "boxes": [[x1, y1, x2, y2], ..]}}`
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
  frame_num: u64,
  scores: Vec<f32>,
  labels: Vec<String>,
  boxes: Vec<[i32; 4]>,
  recorded_at: Option<DateTime<Utc>>,
}

impl FrameRecord {
  pub fn new<N>(frame_num: u64, detections: &[BoundingBox], names: &N) -> Self
  where
    N: ClassNames + ?Sized,
  {
    FrameRecord {
      frame_num,
      scores: detections.iter().map(BoundingBox::confidence).collect(),
      labels: detections
        .iter()
        .map(|bbox| names.label_of(bbox.class_id()))
        .collect(),
      boxes: detections.iter().map(BoundingBox::pixel_corners).collect(),
      recorded_at: None,
    }
  }

  pub fn with_timestamp(mut self, recorded_at: DateTime<Utc>) -> Self {
    self.recorded_at = Some(recorded_at);
    self
  }

  pub fn frame_num(&self) -> u64 {
    self.frame_num
  }

  pub fn len(&self) -> usize {
    self.scores.len()
  }

  pub fn is_empty(&self) -> bool {
    self.scores.is_empty()
  }

  pub fn to_json(&self) -> Value {
    let mut entry = Map::new();
    entry.insert("scores".to_string(), json!(self.scores));
    entry.insert("labels".to_string(), json!(self.labels));
    entry.insert("boxes".to_string(), json!(self.boxes));
    if let Some(recorded_at) = self.recorded_at {
      entry.insert(
        "time".to_string(),
        json!(recorded_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
      );
    }

    let mut record = Map::new();
    record.insert(format!("frame_{}", self.frame_num), Value::Object(entry));
    Value::Object(record)
  }
}

impl fmt::Display for FrameRecord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.to_json())
  }
}
