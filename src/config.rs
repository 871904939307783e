// 该文件是 ds-yolo 项目的一部分。
// src/config.rs - 后处理配置
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

use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, geometry::NetworkResolution, postprocess::PostprocessError,
};

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("未知的配置项: {0}")]
  UnknownKey(String),
  #[error("配置项 {key} 的值无效: {value}")]
  InvalidValue { key: String, value: String },
  #[error("后处理配置错误: {0}")]
  Postprocess(#[from] PostprocessError),
}

/// 后处理参数
///
/// 阈值超出 `[0, 1]` 不视为错误，只会保留全部或不保留任何检测。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessConfig {
  pub conf_threshold: f32,
  pub nms_threshold: f32,
  pub network: NetworkResolution,
}

impl Default for PostprocessConfig {
  fn default() -> Self {
    PostprocessConfig {
      conf_threshold: DEFAULT_CONF_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
      network: NetworkResolution::default(),
    }
  }
}

impl PostprocessConfig {
  pub fn with_conf_threshold(mut self, conf_threshold: f32) -> Self {
    self.conf_threshold = conf_threshold;
    self
  }

  pub fn with_nms_threshold(mut self, nms_threshold: f32) -> Self {
    self.nms_threshold = nms_threshold;
    self
  }

  pub fn with_network(mut self, network: NetworkResolution) -> Self {
    self.network = network;
    self
  }

  pub fn validate(&self) -> Result<(), PostprocessError> {
    if !self.conf_threshold.is_finite() {
      return Err(PostprocessError::InvalidConfiguration(format!(
        "置信度阈值无效: {}",
        self.conf_threshold
      )));
    }
    if !self.nms_threshold.is_finite() {
      return Err(PostprocessError::InvalidConfiguration(format!(
        "NMS 阈值无效: {}",
        self.nms_threshold
      )));
    }
    self.network.validate()
  }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidValue {
    key: key.to_string(),
    value: value.to_string(),
  })
}

impl FromUrlWithScheme for PostprocessConfig {
  const SCHEME: &'static str = "yolo";
}

impl FromUrl for PostprocessConfig {
  type Error = ConfigError;

  /// `yolo:///?conf=0.5&iou=0.45&net_width=640&net_height=640`，未给出的项取默认值
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ConfigError::SchemeMismatch);
    }

    let mut config = PostprocessConfig::default();
    for (key, value) in url.query_pairs() {
      match &*key {
        "conf" => config.conf_threshold = parse_value(&key, &value)?,
        "iou" => config.nms_threshold = parse_value(&key, &value)?,
        "net_width" => config.network.width = parse_value(&key, &value)?,
        "net_height" => config.network.height = parse_value(&key, &value)?,
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
      }
    }

    config.validate()?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = PostprocessConfig::default();
    assert_eq!(config.conf_threshold, 0.5);
    assert_eq!(config.nms_threshold, 0.45);
    assert_eq!(config.network, NetworkResolution::new(640, 640));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_from_url() {
    let url = Url::parse("yolo:///?conf=0.25&iou=0.6&net_width=1280&net_height=736").unwrap();
    let config = PostprocessConfig::from_url(&url).unwrap();
    assert_eq!(config.conf_threshold, 0.25);
    assert_eq!(config.nms_threshold, 0.6);
    assert_eq!(config.network, NetworkResolution::new(1280, 736));
  }

  #[test]
  fn test_from_url_partial_uses_defaults() {
    let url = Url::parse("yolo:///?iou=0.3").unwrap();
    let config = PostprocessConfig::from_url(&url).unwrap();
    assert_eq!(config.conf_threshold, DEFAULT_CONF_THRESHOLD);
    assert_eq!(config.nms_threshold, 0.3);
  }

  #[test]
  fn test_from_url_errors() {
    let url = Url::parse("file:///tmp/model").unwrap();
    assert!(matches!(
      PostprocessConfig::from_url(&url),
      Err(ConfigError::SchemeMismatch)
    ));

    let url = Url::parse("yolo:///?conf=high").unwrap();
    assert!(matches!(
      PostprocessConfig::from_url(&url),
      Err(ConfigError::InvalidValue { .. })
    ));

    let url = Url::parse("yolo:///?batch=4").unwrap();
    assert!(matches!(
      PostprocessConfig::from_url(&url),
      Err(ConfigError::UnknownKey(_))
    ));

    let url = Url::parse("yolo:///?net_width=0").unwrap();
    assert!(matches!(
      PostprocessConfig::from_url(&url),
      Err(ConfigError::Postprocess(
        PostprocessError::InvalidConfiguration(_)
      ))
    ));
  }

  #[test]
  fn test_out_of_range_thresholds_are_accepted() {
    let config = PostprocessConfig::default()
      .with_conf_threshold(1.5)
      .with_nms_threshold(-0.2);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn test_non_finite_thresholds_are_rejected() {
    assert!(
      PostprocessConfig::default()
        .with_nms_threshold(f32::INFINITY)
        .validate()
        .is_err()
    );
  }
}
