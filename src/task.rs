// 该文件是 ds-yolo 项目的一部分。
// src/task.rs - 逐帧后处理任务
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

use std::{thread, time::Duration};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use crate::{
  frame::{FpsCounter, FrameCounter},
  geometry::OutputResolution,
  label::ClassNames,
  postprocess::{PostprocessError, Postprocessor},
  record::FrameRecord,
  source::{TensorFrame, TensorSourceError},
};

/// 单帧处理所需的全部依赖
pub struct Pipeline<'a, N: ?Sized> {
  postprocessor: &'a Postprocessor,
  output: OutputResolution,
  names: &'a N,
}

impl<'a, N: ClassNames + ?Sized> Pipeline<'a, N> {
  pub fn new(postprocessor: &'a Postprocessor, output: OutputResolution, names: &'a N) -> Self {
    Pipeline {
      postprocessor,
      output,
      names,
    }
  }

  pub fn process(&self, frame: &TensorFrame) -> Result<FrameRecord, PostprocessError> {
    let boxes = self.postprocessor.postprocess(&frame.data, &self.output)?;
    Ok(FrameRecord::new(frame.frame_num, &boxes, self.names).with_timestamp(Utc::now()))
  }
}

pub trait Task<I>: Sized {
  type Error;
  fn run_task<N: ClassNames + ?Sized>(
    self,
    input: I,
    pipeline: &Pipeline<'_, N>,
  ) -> Result<FrameCounter, Self::Error>;
}

/// 逐帧处理直到输入结束、达到指定帧数或收到中断信号
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  stream_id: usize,
  interrupt_handler: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_stream_id(mut self, stream_id: usize) -> Self {
    self.stream_id = stream_id;
    self
  }

  /// 安装 Ctrl-C 处理器，每个进程只能安装一次
  pub fn with_interrupt_handler(mut self, enabled: bool) -> Self {
    self.interrupt_handler = enabled;
    self
  }
}

impl<I> Task<I> for ContinuousTask
where
  I: Iterator<Item = Result<TensorFrame, TensorSourceError>>,
{
  type Error = anyhow::Error;

  fn run_task<N: ClassNames + ?Sized>(
    self,
    input: I,
    pipeline: &Pipeline<'_, N>,
  ) -> Result<FrameCounter, Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    if self.interrupt_handler {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })
      .context("无法设置 Ctrl-C 处理器")?;
    }

    let mut counter = FrameCounter::default();
    let mut fps = FpsCounter::new(self.stream_id);
    let mut seen = 0usize;

    for frame in input {
      seen += 1;
      match frame {
        Ok(frame) => {
          let now = std::time::Instant::now();
          match pipeline.process(&frame) {
            Ok(record) => {
              info!("--> 检测结果: {}", record);
              counter.record();
              fps.tick();
            }
            // 张量损坏只影响当前帧
            Err(e) => warn!("第 {} 帧后处理失败，跳过: {}", frame.frame_num, e),
          }
          info!("后处理完成，耗时: {:.2?}", now.elapsed());
        }
        Err(e) => warn!("读取输入帧失败，跳过: {}", e),
      }

      if self.frame_number.map(|n| seen >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", seen);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", counter.count());
    Ok(counter)
  }
}

/// 对第一帧重复后处理，统计平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    RepeatShotTask { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }
}

impl<I> Task<I> for RepeatShotTask
where
  I: Iterator<Item = Result<TensorFrame, TensorSourceError>>,
{
  type Error = anyhow::Error;

  fn run_task<N: ClassNames + ?Sized>(
    self,
    mut input: I,
    pipeline: &Pipeline<'_, N>,
  ) -> Result<FrameCounter, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始后处理...");

    let mut counter = FrameCounter::default();
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let now = std::time::Instant::now();
      let record = pipeline.process(&frame)?;
      let elapsed = now.elapsed();
      info!("({})后处理完成，耗时: {:.2?}, 检测数 {}", i, elapsed, record.len());
      counter.record();
      times.push(elapsed);
    }

    // 前两次作为预热不计入平均
    let warmup = if times.len() > 2 { 2 } else { 0 };
    let measured = &times[warmup..];
    if !measured.is_empty() {
      warn!(
        "平均后处理时间: {:.2?}",
        measured.iter().sum::<Duration>() / measured.len() as u32
      );
    }

    Ok(counter)
  }
}
