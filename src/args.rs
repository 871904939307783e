// 该文件是 ds-yolo 项目的一部分。
// src/args.rs - 命令行参数配置
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

use clap::Parser;
use url::Url;

use crate::{
  config::PostprocessConfig,
  geometry::{NetworkResolution, OutputResolution},
  label::{LabelError, LabelKind, LabelTable},
};

/// ds-yolo 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测张量来源
  /// 支持格式:
  /// - 单个文件: tensor:///path/to/frame.bin
  /// - 目录: folder:///path/to/tensors
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub conf: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub iou: f32,

  /// 输出视频宽度
  #[arg(long, default_value = "1920", value_name = "WIDTH")]
  pub outvid_width: u32,

  /// 输出视频高度
  #[arg(long, default_value = "1080", value_name = "HEIGHT")]
  pub outvid_height: u32,

  /// 模型输入宽度
  #[arg(long, default_value = "640", value_name = "WIDTH")]
  pub net_width: u32,

  /// 模型输入高度
  #[arg(long, default_value = "640", value_name = "HEIGHT")]
  pub net_height: u32,

  /// 标签类型 (flag/nsfw/horror)
  #[arg(long, default_value = "flag", value_name = "TYPE")]
  pub label_type: LabelKind,

  /// 标签文件，每行一个类别，优先于 --label-type
  #[arg(long, value_name = "FILE")]
  pub label_file: Option<PathBuf>,

  /// 最大处理帧数，不指定表示无限制
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

impl Args {
  pub fn postprocess_config(&self) -> PostprocessConfig {
    PostprocessConfig::default()
      .with_conf_threshold(self.conf)
      .with_nms_threshold(self.iou)
      .with_network(NetworkResolution::new(self.net_width, self.net_height))
  }

  pub fn output_resolution(&self) -> OutputResolution {
    OutputResolution::new(self.outvid_width, self.outvid_height)
  }

  pub fn label_table(&self) -> Result<LabelTable, LabelError> {
    match &self.label_file {
      Some(path) => LabelTable::from_file(path),
      None => Ok(LabelTable::from(self.label_type)),
    }
  }
}
