// 该文件是 ds-yolo 项目的一部分。
// src/main.rs - 项目主程序
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ds_yolo::{
  FromUrl, Postprocessor,
  args::Args,
  source::TensorFileSource,
  task::{ContinuousTask, Pipeline, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let init = std::time::Instant::now();
  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("置信度阈值: {}", args.conf);
  info!("NMS 阈值: {}", args.iou);
  info!("输出分辨率: {}x{}", args.outvid_width, args.outvid_height);

  let postprocessor = Postprocessor::new(args.postprocess_config())?;
  let labels = args.label_table()?;
  let input = TensorFileSource::from_url(&args.input)?;
  let pipeline = Pipeline::new(&postprocessor, args.output_resolution(), &labels);
  info!("初始化耗时: {:.2?}", init.elapsed());

  let start = std::time::Instant::now();
  let counter = ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .with_interrupt_handler(true)
    .run_task(input.into_frames(), &pipeline)?;

  info!("后处理总耗时: {:.2?}", start.elapsed());
  info!("已处理帧数: {}", counter.count());

  Ok(())
}
