// 该文件是 ds-yolo 项目的一部分。
// src/source.rs - 检测张量文件输入
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

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::FromUrl;

const F32_SIZE: usize = std::mem::size_of::<f32>();
const TENSOR_EXTENSION: &str = "bin";

#[derive(Error, Debug)]
pub enum TensorSourceError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("路径解码失败: {0}")]
  PathDecodeError(#[from] std::string::FromUtf8Error),
  #[error("张量文件 {path} 长度 {len} 不是 4 字节的整数倍")]
  Truncated { path: PathBuf, len: usize },
  #[error("目录 {0} 中没有张量文件")]
  Empty(PathBuf),
}

/// 一帧推理输出
#[derive(Debug, Clone, PartialEq)]
pub struct TensorFrame {
  pub frame_num: u64,
  pub path: PathBuf,
  pub data: Vec<f32>,
}

/// 以小端 f32 存储的检测张量文件
///
/// - `tensor:///path/to/frame.bin` 单个文件
/// - `folder:///path/to/dir` 目录下所有 `*.bin` 文件，按文件名排序
#[derive(Debug, Clone)]
pub struct TensorFileSource {
  paths: Vec<PathBuf>,
}

impl TensorFileSource {
  pub const FILE_SCHEME: &'static str = "tensor";
  pub const FOLDER_SCHEME: &'static str = "folder";

  pub fn from_file<P: Into<PathBuf>>(path: P) -> Self {
    TensorFileSource {
      paths: vec![path.into()],
    }
  }

  pub fn from_directory<P: AsRef<Path>>(directory: P) -> Result<Self, TensorSourceError> {
    let directory = directory.as_ref();
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(directory)? {
      let path = entry?.path();
      if path.is_file() && path.extension().is_some_and(|ext| ext == TENSOR_EXTENSION) {
        paths.push(path);
      }
    }

    if paths.is_empty() {
      return Err(TensorSourceError::Empty(directory.to_path_buf()));
    }
    paths.sort();
    info!("目录 {} 中找到 {} 个张量文件", directory.display(), paths.len());

    Ok(TensorFileSource { paths })
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn into_frames(self) -> TensorFrames {
    TensorFrames {
      paths: self.paths.into_iter(),
      frame_num: 0,
    }
  }
}

impl FromUrl for TensorFileSource {
  type Error = TensorSourceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let path = PathBuf::from(urlencoding::decode(url.path())?.into_owned());
    match url.scheme() {
      Self::FILE_SCHEME => Ok(TensorFileSource::from_file(path)),
      Self::FOLDER_SCHEME => TensorFileSource::from_directory(path),
      _ => Err(TensorSourceError::SchemeMismatch),
    }
  }
}

pub struct TensorFrames {
  paths: std::vec::IntoIter<PathBuf>,
  frame_num: u64,
}

impl Iterator for TensorFrames {
  type Item = Result<TensorFrame, TensorSourceError>;

  fn next(&mut self) -> Option<Self::Item> {
    let path = self.paths.next()?;
    let frame_num = self.frame_num;
    self.frame_num += 1;

    Some(read_tensor_file(&path).map(|data| TensorFrame {
      frame_num,
      path,
      data,
    }))
  }
}

/// 读取小端 f32 张量文件
pub fn read_tensor_file<P: AsRef<Path>>(path: P) -> Result<Vec<f32>, TensorSourceError> {
  let path = path.as_ref();
  let bytes = std::fs::read(path)?;
  if bytes.len() % F32_SIZE != 0 {
    return Err(TensorSourceError::Truncated {
      path: path.to_path_buf(),
      len: bytes.len(),
    });
  }

  let data: Vec<f32> = bytes
    .chunks_exact(F32_SIZE)
    .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    .collect();
  debug!("读取张量文件 {}: {} 个元素", path.display(), data.len());
  Ok(data)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ds-yolo-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
  }

  fn write_tensor(path: &Path, data: &[f32]) {
    let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(path, bytes).unwrap();
  }

  #[test]
  fn test_read_tensor_file() {
    let dir = scratch_dir("read");
    let path = dir.join("frame.bin");
    write_tensor(&path, &[1.0, 320.0, 320.0, 64.0, 64.0, 0.9, 2.0]);

    let data = read_tensor_file(&path).unwrap();
    assert_eq!(data, vec![1.0, 320.0, 320.0, 64.0, 64.0, 0.9, 2.0]);
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_truncated_file() {
    let dir = scratch_dir("truncated");
    let path = dir.join("frame.bin");
    std::fs::write(&path, [0u8; 7]).unwrap();

    assert!(matches!(
      read_tensor_file(&path),
      Err(TensorSourceError::Truncated { len: 7, .. })
    ));
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_folder_source_yields_frames_in_name_order() {
    let dir = scratch_dir("folder");
    write_tensor(&dir.join("0002.bin"), &[0.0]);
    write_tensor(&dir.join("0001.bin"), &[1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 0.0]);
    std::fs::write(dir.join("notes.txt"), "not a tensor").unwrap();

    let url = Url::from_directory_path(&dir).unwrap();
    let url = Url::parse(&url.as_str().replacen("file:", "folder:", 1)).unwrap();
    let source = TensorFileSource::from_url(&url).unwrap();
    assert_eq!(source.len(), 2);

    let frames: Vec<TensorFrame> = source.into_frames().map(Result::unwrap).collect();
    assert_eq!(frames[0].frame_num, 0);
    assert_eq!(frames[0].data.len(), 7);
    assert_eq!(frames[1].frame_num, 1);
    assert_eq!(frames[1].data, vec![0.0]);
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_file_url_is_percent_decoded() {
    let dir = scratch_dir("decode");
    let path = dir.join("frame one.bin");
    write_tensor(&path, &[0.0]);

    let url = Url::parse(&format!("tensor://{}", path.display()).replace(' ', "%20")).unwrap();
    let frames: Vec<TensorFrame> = TensorFileSource::from_url(&url)
      .unwrap()
      .into_frames()
      .map(Result::unwrap)
      .collect();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].path, path);
    std::fs::remove_dir_all(&dir).unwrap();
  }

  #[test]
  fn test_empty_folder_and_scheme_mismatch() {
    let dir = scratch_dir("empty");
    assert!(matches!(
      TensorFileSource::from_directory(&dir),
      Err(TensorSourceError::Empty(_))
    ));
    std::fs::remove_dir_all(&dir).unwrap();

    let url = Url::parse("rtsp://camera/stream").unwrap();
    assert!(matches!(
      TensorFileSource::from_url(&url),
      Err(TensorSourceError::SchemeMismatch)
    ));
  }
}
