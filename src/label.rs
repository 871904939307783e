// 该文件是 ds-yolo 项目的一部分。
// src/label.rs - 类别标签
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

use std::{borrow::Cow, path::Path, str::FromStr};

use thiserror::Error;
use tracing::info;

const FLAG_LABELS: [&str; 3] = ["co_viet_tan", "co_ba_soc", "co_viet_nam"];
const NSFW_LABELS: [&str; 4] = [
  "EXPOSED_BUTTOCKS",
  "EXPOSED_BREAST_F",
  "EXPOSED_GENITALIA_F",
  "EXPOSED_GENITALIA_M",
];
const HORROR_LABELS: [&str; 2] = ["safe", "horror"];

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("未知的标签类型: {0}")]
  UnknownKind(String),
  #[error("标签文件中没有任何类别")]
  Empty,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 类别编号到名称的映射
pub trait ClassNames {
  fn class_name(&self, class_id: u32) -> Option<Cow<'_, str>>;

  /// 未知类别回退为编号本身
  fn label_of(&self, class_id: u32) -> String {
    self
      .class_name(class_id)
      .map(Cow::into_owned)
      .unwrap_or_else(|| class_id.to_string())
  }
}

/// 以闭包提供类别名称
pub struct LabelFn<F>(pub F);

impl<F> ClassNames for LabelFn<F>
where
  F: Fn(u32) -> Option<String>,
{
  fn class_name(&self, class_id: u32) -> Option<Cow<'_, str>> {
    (self.0)(class_id).map(Cow::Owned)
  }
}

/// 内置的部署场景标签集
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
  Flag,
  Nsfw,
  Horror,
}

impl LabelKind {
  fn names(&self) -> &'static [&'static str] {
    match self {
      LabelKind::Flag => &FLAG_LABELS,
      LabelKind::Nsfw => &NSFW_LABELS,
      LabelKind::Horror => &HORROR_LABELS,
    }
  }
}

impl FromStr for LabelKind {
  type Err = LabelError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "flag" => Ok(LabelKind::Flag),
      "nsfw" => Ok(LabelKind::Nsfw),
      "horror" => Ok(LabelKind::Horror),
      _ => Err(LabelError::UnknownKind(s.to_string())),
    }
  }
}

/// 按类别编号索引的名称表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  names: Vec<String>,
}

impl From<LabelKind> for LabelTable {
  fn from(kind: LabelKind) -> Self {
    LabelTable {
      names: kind.names().iter().map(|name| name.to_string()).collect(),
    }
  }
}

impl FromStr for LabelTable {
  type Err = LabelError;

  /// 每行一个类别名称，空行忽略
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let names: Vec<String> = s
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();

    if names.is_empty() {
      return Err(LabelError::Empty);
    }
    Ok(LabelTable { names })
  }
}

impl LabelTable {
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let table: LabelTable = std::fs::read_to_string(path)?.parse()?;
    info!("标签数量: {}", table.len());
    Ok(table)
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }
}

impl ClassNames for LabelTable {
  fn class_name(&self, class_id: u32) -> Option<Cow<'_, str>> {
    self
      .names
      .get(class_id as usize)
      .map(|name| Cow::Borrowed(name.as_str()))
  }
}
