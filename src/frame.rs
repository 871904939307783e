// 该文件是 ds-yolo 项目的一部分。
// src/frame.rs - 帧计数与 FPS 统计
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

use std::time::{Duration, Instant};

use tracing::info;

pub const DEFAULT_FPS_WINDOW: Duration = Duration::from_secs(5);

/// 已处理帧计数，由调用方持有
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter {
  count: u64,
}

impl FrameCounter {
  pub fn record(&mut self) -> u64 {
    self.count += 1;
    self.count
  }

  pub fn count(&self) -> u64 {
    self.count
  }
}

/// 单路流的 FPS 统计
///
/// 首帧开启统计窗口；窗口结束后的那一帧输出 `帧数 / 窗口秒数` 并重新开窗，
/// 该帧本身不计入新窗口。
#[derive(Debug, Clone)]
pub struct FpsCounter {
  stream_id: usize,
  window: Duration,
  start: Option<Instant>,
  frames: u64,
}

impl FpsCounter {
  pub fn new(stream_id: usize) -> Self {
    FpsCounter {
      stream_id,
      window: DEFAULT_FPS_WINDOW,
      start: None,
      frames: 0,
    }
  }

  pub fn with_window(mut self, window: Duration) -> Self {
    self.window = window;
    self
  }

  pub fn stream_id(&self) -> usize {
    self.stream_id
  }

  pub fn tick_at(&mut self, now: Instant) -> Option<f64> {
    let start = *self.start.get_or_insert(now);

    if now.duration_since(start) > self.window {
      let fps = self.frames as f64 / self.window.as_secs_f64();
      self.frames = 0;
      self.start = Some(now);
      Some(fps)
    } else {
      self.frames += 1;
      None
    }
  }

  pub fn tick(&mut self) -> Option<f64> {
    let fps = self.tick_at(Instant::now());
    if let Some(fps) = fps {
      info!("流 {} 的 FPS: {:.2}", self.stream_id, fps);
    }
    fps
  }
}
