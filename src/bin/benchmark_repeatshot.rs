// 该文件是 ds-yolo 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 后处理重复测速
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
  task::{Pipeline, RepeatShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);

  let postprocessor = Postprocessor::new(args.postprocess_config())?;
  let labels = args.label_table()?;
  let input = TensorFileSource::from_url(&args.input)?;
  let pipeline = Pipeline::new(&postprocessor, args.output_resolution(), &labels);

  let counter = RepeatShotTask::default().run_task(input.into_frames(), &pipeline)?;
  info!("重复次数: {}", counter.count());

  Ok(())
}
