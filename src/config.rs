// 该文件是 Yanxing （颜形） 项目的一部分。
// src/config.rs - 流水线参数配置
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

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("读取配置文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("配置文件格式错误: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("配置无效: {0}")]
  Invalid(String),
}

/// 深度预处理参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DepthConfig {
  /// 双边滤波窗口半径（像素）
  pub bilateral_radius: u8,
  /// 双边滤波的灰度差 sigma
  pub sigma_color: f32,
  /// 双边滤波的空间 sigma
  pub sigma_space: f32,
  /// 开/闭运算结构元素半径，1 即 3x3
  pub morphology_radius: u8,
}

impl Default for DepthConfig {
  fn default() -> Self {
    Self {
      bilateral_radius: 4,
      sigma_color: 75.0,
      sigma_space: 75.0,
      morphology_radius: 1,
    }
  }
}

/// 边缘融合参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
  pub color_low: f32,
  pub color_high: f32,
  pub depth_low: f32,
  pub depth_high: f32,
  /// 膨胀/腐蚀半径，1 即 3x3
  pub closing_radius: u8,
}

impl Default for EdgeConfig {
  fn default() -> Self {
    Self {
      color_low: 50.0,
      color_high: 150.0,
      depth_low: 25.0,
      depth_high: 75.0,
      closing_radius: 1,
    }
  }
}

/// 区域提取参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
  /// 轮廓最小面积（像素²）
  pub min_area: f64,
  /// 包围框四周的扩展像素
  pub padding: u32,
  /// 扩展并裁剪后包围框的最小边长
  pub min_side: u32,
}

impl Default for RegionConfig {
  fn default() -> Self {
    Self {
      min_area: 300.0,
      padding: 5,
      min_side: 10,
    }
  }
}

/// 颜色聚类参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
  pub min_samples: usize,
  pub clusters: usize,
  pub restarts: usize,
  pub max_iterations: usize,
  /// 固定随机种子，便于复现；为空时每帧使用系统熵
  pub seed: Option<u64>,
}

impl Default for ColorConfig {
  fn default() -> Self {
    Self {
      min_samples: 50,
      clusters: 1,
      restarts: 3,
      max_iterations: 20,
      seed: None,
    }
  }
}

/// 形状分类参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
  pub min_depth_samples: usize,
  /// 多边形拟合容差，占轮廓周长的比例
  pub polygon_tolerance: f64,
}

impl Default for ShapeConfig {
  fn default() -> Self {
    Self {
      min_depth_samples: 50,
      polygon_tolerance: 0.02,
    }
  }
}

/// 叠加图绘制参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
  pub edge_alpha: f32,
  /// TTF 字体路径，未配置时不绘制文字
  pub font: Option<PathBuf>,
}

impl Default for OverlayConfig {
  fn default() -> Self {
    Self {
      edge_alpha: 0.2,
      font: None,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub depth: DepthConfig,
  pub edge: EdgeConfig,
  pub region: RegionConfig,
  pub color: ColorConfig,
  pub shape: ShapeConfig,
  pub overlay: OverlayConfig,
}

impl PipelineConfig {
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("加载配置文件: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    Self::from_toml(&text)
  }

  pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
    let config: PipelineConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

    if self.edge.color_low >= self.edge.color_high {
      return invalid("edge.color_low 必须小于 edge.color_high");
    }
    if self.edge.depth_low >= self.edge.depth_high {
      return invalid("edge.depth_low 必须小于 edge.depth_high");
    }
    if self.depth.sigma_color <= 0.0 || self.depth.sigma_space <= 0.0 {
      return invalid("双边滤波 sigma 必须为正数");
    }
    if self.color.clusters == 0 || self.color.restarts == 0 || self.color.max_iterations == 0 {
      return invalid("color.clusters / restarts / max_iterations 不能为 0");
    }
    if !(0.0..=1.0).contains(&self.overlay.edge_alpha) {
      return invalid("overlay.edge_alpha 必须位于 [0, 1]");
    }
    if self.shape.polygon_tolerance <= 0.0 {
      return invalid("shape.polygon_tolerance 必须为正数");
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_reference_thresholds() {
    let config = PipelineConfig::default();
    assert_eq!(config.region.min_area, 300.0);
    assert_eq!(config.region.padding, 5);
    assert_eq!(config.color.min_samples, 50);
    assert_eq!(config.color.restarts, 3);
    assert_eq!(config.edge.depth_high, 75.0);
    assert!(config.validate().is_ok());
  }

  #[test]
  fn partial_toml_keeps_other_defaults() {
    let config = PipelineConfig::from_toml(
      r#"
        [region]
        min_area = 500.0

        [color]
        seed = 7
      "#,
    )
    .unwrap();
    assert_eq!(config.region.min_area, 500.0);
    assert_eq!(config.region.min_side, 10);
    assert_eq!(config.color.seed, Some(7));
    assert_eq!(config.edge.color_low, 50.0);
  }

  #[test]
  fn rejects_inverted_thresholds() {
    let err = PipelineConfig::from_toml(
      r#"
        [edge]
        color_low = 200.0
        color_high = 100.0
      "#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
  }

  #[test]
  fn loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("yanxing.toml");
    std::fs::write(&path, "[overlay]\nedge_alpha = 0.5\n").unwrap();
    let config = PipelineConfig::from_file(&path).unwrap();
    assert_eq!(config.overlay.edge_alpha, 0.5);
  }
}
