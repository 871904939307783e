// 该文件是 ds-yolo 项目的一部分。
// src/postprocess.rs - 检测张量后处理
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

use thiserror::Error;
use tracing::debug;

use crate::{
  config::PostprocessConfig,
  geometry::{BoundingBox, OutputResolution, normalize},
  suppress::suppress,
  tensor::RawDetectionBuffer,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PostprocessError {
  #[error("检测张量为空，缺少检测数量")]
  MissingCount,
  #[error("检测数量无效: {0}")]
  InvalidCount(f32),
  #[error("检测张量长度不足: 声明 {declared} 个检测，需要 {required} 个元素，实际 {actual} 个")]
  MalformedBuffer {
    declared: usize,
    required: usize,
    actual: usize,
  },
  #[error("配置无效: {0}")]
  InvalidConfiguration(String),
}

/// 解码 → 按类别 NMS → 坐标变换
///
/// 不持有跨帧状态，可在多个线程中对不同的张量同时调用。
#[derive(Debug, Clone)]
pub struct Postprocessor {
  config: PostprocessConfig,
}

impl Postprocessor {
  pub fn new(config: PostprocessConfig) -> Result<Self, PostprocessError> {
    config.validate()?;
    Ok(Postprocessor { config })
  }

  pub fn config(&self) -> &PostprocessConfig {
    &self.config
  }

  pub fn postprocess(
    &self,
    buffer: &[f32],
    output: &OutputResolution,
  ) -> Result<Vec<BoundingBox>, PostprocessError> {
    output.validate()?;

    debug!("后处理检测张量");
    let buffer = RawDetectionBuffer::new(buffer)?;
    if buffer.is_empty() {
      debug!("检测数量为 0");
      return Ok(Vec::new());
    }

    let survivors = suppress(
      buffer.records(),
      self.config.conf_threshold,
      self.config.nms_threshold,
    );
    debug!(
      "{} 个检测中 {} 个在 NMS 后保留",
      buffer.num_detections(),
      survivors.len()
    );

    let boxes = normalize(&survivors, &self.config.network, output);
    debug!("检测到 {} 个物体", boxes.len());
    Ok(boxes)
  }
}
