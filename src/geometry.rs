// 该文件是 ds-yolo 项目的一部分。
// src/geometry.rs - 检测框坐标变换
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

use tracing::debug;

use crate::{postprocess::PostprocessError, tensor::Detection};

const DEFAULT_NETWORK_WIDTH: u32 = 640;
const DEFAULT_NETWORK_HEIGHT: u32 = 640;

/// 模型的固定输入分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkResolution {
  pub width: u32,
  pub height: u32,
}

impl Default for NetworkResolution {
  fn default() -> Self {
    NetworkResolution {
      width: DEFAULT_NETWORK_WIDTH,
      height: DEFAULT_NETWORK_HEIGHT,
    }
  }
}

impl NetworkResolution {
  pub fn new(width: u32, height: u32) -> Self {
    NetworkResolution { width, height }
  }

  pub fn validate(&self) -> Result<(), PostprocessError> {
    if self.width == 0 || self.height == 0 {
      return Err(PostprocessError::InvalidConfiguration(format!(
        "网络输入分辨率必须为正数: {}x{}",
        self.width, self.height
      )));
    }
    Ok(())
  }
}

/// 输出（显示）分辨率，每帧随调用传入
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputResolution {
  pub width: u32,
  pub height: u32,
}

impl OutputResolution {
  pub fn new(width: u32, height: u32) -> Self {
    OutputResolution { width, height }
  }

  pub fn validate(&self) -> Result<(), PostprocessError> {
    if self.width == 0 || self.height == 0 {
      return Err(PostprocessError::InvalidConfiguration(format!(
        "输出分辨率必须为正数: {}x{}",
        self.width, self.height
      )));
    }
    Ok(())
  }
}

/// 输出分辨率下的检测框
///
/// 同时保存绝对像素坐标与按输出分辨率归一化的坐标，
/// 构造后保证 `x1 < x2` 且 `y1 < y2`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  class_id: u32,
  confidence: f32,
  x1: f32,
  y1: f32,
  x2: f32,
  y2: f32,
  u1: f32,
  v1: f32,
  u2: f32,
  v2: f32,
}

impl BoundingBox {
  /// 由输出像素空间的角点构造，面积为零、角点颠倒或含 NaN 时返回 `None`
  pub fn new(
    class_id: u32,
    confidence: f32,
    [x1, y1, x2, y2]: [f32; 4],
    output: &OutputResolution,
  ) -> Option<Self> {
    if !(x1 < x2 && y1 < y2) {
      return None;
    }
    if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
      return None;
    }

    let (width, height) = (output.width as f32, output.height as f32);
    Some(BoundingBox {
      class_id,
      confidence,
      x1,
      y1,
      x2,
      y2,
      u1: x1 / width,
      v1: y1 / height,
      u2: x2 / width,
      v2: y2 / height,
    })
  }

  pub fn class_id(&self) -> u32 {
    self.class_id
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  /// `[x1, y1, x2, y2]`，输出像素坐标
  pub fn corners(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }

  /// `[u1, v1, u2, v2]`，归一化坐标
  pub fn normalized(&self) -> [f32; 4] {
    [self.u1, self.v1, self.u2, self.v2]
  }

  /// 角点向零截断为整数像素
  pub fn pixel_corners(&self) -> [i32; 4] {
    [
      self.x1 as i32,
      self.y1 as i32,
      self.x2 as i32,
      self.y2 as i32,
    ]
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn center_absolute(&self) -> (f32, f32) {
    (0.5 * (self.x1 + self.x2), 0.5 * (self.y1 + self.y2))
  }

  pub fn center_normalized(&self) -> (f32, f32) {
    (0.5 * (self.u1 + self.u2), 0.5 * (self.v1 + self.v2))
  }

  pub fn size_absolute(&self) -> (f32, f32) {
    (self.width(), self.height())
  }

  pub fn size_normalized(&self) -> (f32, f32) {
    (self.u2 - self.u1, self.v2 - self.v1)
  }
}

/// 将网络空间的检测（中心点 + 宽高）映射到输出分辨率
///
/// 右下角先裁剪到网络输入边界再缩放；缩放后宽或高为零的框被丢弃。
pub fn normalize(
  detections: &[Detection],
  network: &NetworkResolution,
  output: &OutputResolution,
) -> Vec<BoundingBox> {
  let (net_w, net_h) = (network.width as f32, network.height as f32);
  let scale_x = output.width as f32 / net_w;
  let scale_y = output.height as f32 / net_h;

  detections
    .iter()
    .filter_map(|det| {
      let half_w = det.width / 2.0;
      let half_h = det.height / 2.0;

      let x1 = (det.center_x - half_w) * scale_x;
      let y1 = (det.center_y - half_h) * scale_y;
      let x2 = (det.center_x + half_w).min(net_w) * scale_x;
      let y2 = (det.center_y + half_h).min(net_h) * scale_y;

      if x1 == x2 || y1 == y2 {
        debug!("丢弃退化检测框: [{}, {}, {}, {}]", x1, y1, x2, y2);
        return None;
      }

      let bbox = BoundingBox::new(det.class_id, det.confidence, [x1, y1, x2, y2], output);
      if bbox.is_none() {
        debug!("丢弃无效检测框: [{}, {}, {}, {}]", x1, y1, x2, y2);
      }
      bbox
    })
    .collect()
}
