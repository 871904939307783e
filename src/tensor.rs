// 该文件是 ds-yolo 项目的一部分。
// src/tensor.rs - 检测张量解码
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

use tracing::{debug, error};

use crate::postprocess::PostprocessError;

/// 每条检测记录包含的浮点数个数: (cx, cy, w, h, conf, class_id)
pub const RECORD_WIDTH: usize = 6;

/// 解码后的单个检测，坐标位于网络输入空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
  pub center_x: f32,
  pub center_y: f32,
  pub width: f32,
  pub height: f32,
  pub confidence: f32,
  pub class_id: u32,
}

impl Detection {
  fn from_record(record: &[f32]) -> Self {
    Detection {
      center_x: record[0],
      center_y: record[1],
      width: record[2],
      height: record[3],
      confidence: record[4],
      // 类别以浮点数存储，向零截断
      class_id: record[5] as u32,
    }
  }
}

/// 推理引擎输出的扁平检测张量
///
/// 第 0 个元素为检测数量，其后是 `num_detections` 条定长记录。
/// 构造时即校验长度，之后的读取不会越界。
#[derive(Debug, Clone, Copy)]
pub struct RawDetectionBuffer<'a> {
  data: &'a [f32],
  num_detections: usize,
}

impl<'a> RawDetectionBuffer<'a> {
  pub fn new(data: &'a [f32]) -> Result<Self, PostprocessError> {
    let count = *data.first().ok_or(PostprocessError::MissingCount)?;
    let count = count.trunc();
    if !count.is_finite() || count < 0.0 {
      error!("检测数量无效: {}", count);
      return Err(PostprocessError::InvalidCount(count));
    }

    let num_detections = count as usize;
    let required = num_detections
      .checked_mul(RECORD_WIDTH)
      .and_then(|n| n.checked_add(1))
      .unwrap_or(usize::MAX);

    if data.len() < required {
      error!(
        "检测张量长度不足: 声明 {} 个检测，需要 {} 个元素，实际 {} 个",
        num_detections,
        required,
        data.len()
      );
      return Err(PostprocessError::MalformedBuffer {
        declared: num_detections,
        required,
        actual: data.len(),
      });
    }

    Ok(RawDetectionBuffer {
      data,
      num_detections,
    })
  }

  pub fn num_detections(&self) -> usize {
    self.num_detections
  }

  pub fn is_empty(&self) -> bool {
    self.num_detections == 0
  }

  /// 按张量中的顺序遍历检测记录，声明数量之后的元素被忽略
  pub fn records(&self) -> impl ExactSizeIterator<Item = Detection> + use<'a> {
    let end = 1 + self.num_detections * RECORD_WIDTH;
    self.data[1..end]
      .chunks_exact(RECORD_WIDTH)
      .map(Detection::from_record)
  }
}

/// 将扁平张量解码为检测列表
pub fn decode(data: &[f32]) -> Result<Vec<Detection>, PostprocessError> {
  let buffer = RawDetectionBuffer::new(data)?;
  if buffer.is_empty() {
    return Ok(Vec::new());
  }

  let detections: Vec<Detection> = buffer.records().collect();
  debug!("解码得到 {} 个检测", detections.len());
  Ok(detections)
}
