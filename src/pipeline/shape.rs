// 该文件是 Yanxing （颜形） 项目的一部分。
// src/pipeline/shape.rs - 基于轮廓与深度统计的三维形状分类
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

use std::{f64::consts::PI, fmt};

use imageproc::{geometry::approximate_polygon_dp, point::Point};
use serde::{Serialize, Serializer};

use crate::{config::ShapeConfig, frame::DepthImage, pipeline::region::Region};

const EPS: f64 = 1e-5;

/// 圆度高于该值视为圆形族
pub const ROUND_CIRCULARITY: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeLabel {
  Sphere,
  Cylinder,
  Pyramid,
  Triangle,
  Cube,
  Square,
  Rectangle,
  Prism,
  /// 5 到 8 条边的平面多边形
  Polygon(usize),
  Complex,
}

impl fmt::Display for ShapeLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ShapeLabel::Sphere => f.write_str("sphere"),
      ShapeLabel::Cylinder => f.write_str("cylinder"),
      ShapeLabel::Pyramid => f.write_str("pyramid"),
      ShapeLabel::Triangle => f.write_str("triangle"),
      ShapeLabel::Cube => f.write_str("cube"),
      ShapeLabel::Square => f.write_str("square"),
      ShapeLabel::Rectangle => f.write_str("rectangle"),
      ShapeLabel::Prism => f.write_str("prism"),
      ShapeLabel::Polygon(n) => write!(f, "{}-sided polygon", n),
      ShapeLabel::Complex => f.write_str("complex shape"),
    }
  }
}

impl Serialize for ShapeLabel {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// 分类所需的几何与深度特征
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFeatures {
  pub vertices: usize,
  pub circularity: f64,
  pub aspect_ratio: f64,
  pub depth_mean: f64,
  pub depth_std: f64,
}

/// 规则适用的轮廓族
#[derive(Debug, Clone, Copy)]
pub enum Family {
  Round,
  Sides(usize, usize),
}

#[derive(Debug, Clone, Copy)]
pub enum ShapeName {
  Fixed(ShapeLabel),
  /// 按顶点数命名
  SidedPolygon,
}

/// 一条形状规则，所有给出的条件同时满足时命中
#[derive(Debug, Clone, Copy)]
pub struct ShapeRule {
  pub family: Family,
  pub depth_std_above: Option<f64>,
  /// 开区间
  pub aspect_within: Option<(f64, f64)>,
  pub name: ShapeName,
}

impl ShapeRule {
  pub fn matches(&self, f: &ShapeFeatures) -> bool {
    let family = match self.family {
      Family::Round => f.circularity > ROUND_CIRCULARITY,
      Family::Sides(lo, hi) => (lo..=hi).contains(&f.vertices),
    };
    family
      && self.depth_std_above.is_none_or(|t| f.depth_std > t)
      && self
        .aspect_within
        .is_none_or(|(lo, hi)| lo < f.aspect_ratio && f.aspect_ratio < hi)
  }

  fn label(&self, f: &ShapeFeatures) -> ShapeLabel {
    match self.name {
      ShapeName::Fixed(label) => label,
      ShapeName::SidedPolygon => ShapeLabel::Polygon(f.vertices),
    }
  }
}

const fn rule(family: Family, depth_std_above: Option<f64>, name: ShapeName) -> ShapeRule {
  ShapeRule {
    family,
    depth_std_above,
    aspect_within: None,
    name,
  }
}

/// 按优先级排列的形状规则表，圆度优先于顶点数
///
/// 同一族内深度标准差大说明轮廓跨越多个深度（立体），小则为近似正对的平面。
pub const SHAPE_RULES: &[ShapeRule] = &[
  rule(Family::Round, Some(1500.0), ShapeName::Fixed(ShapeLabel::Sphere)),
  rule(Family::Round, None, ShapeName::Fixed(ShapeLabel::Cylinder)),
  rule(Family::Sides(3, 3), Some(1000.0), ShapeName::Fixed(ShapeLabel::Pyramid)),
  rule(Family::Sides(3, 3), None, ShapeName::Fixed(ShapeLabel::Triangle)),
  rule(Family::Sides(4, 4), Some(2000.0), ShapeName::Fixed(ShapeLabel::Cube)),
  ShapeRule {
    family: Family::Sides(4, 4),
    depth_std_above: None,
    aspect_within: Some((0.9, 1.1)),
    name: ShapeName::Fixed(ShapeLabel::Square),
  },
  rule(Family::Sides(4, 4), None, ShapeName::Fixed(ShapeLabel::Rectangle)),
  rule(Family::Sides(5, 8), Some(1800.0), ShapeName::Fixed(ShapeLabel::Prism)),
  rule(Family::Sides(5, 8), None, ShapeName::SidedPolygon),
];

pub fn classify_features(features: &ShapeFeatures) -> ShapeLabel {
  SHAPE_RULES
    .iter()
    .find(|r| r.matches(features))
    .map(|r| r.label(features))
    .unwrap_or(ShapeLabel::Complex)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeResult {
  /// 有效深度样本不足
  Unclassified,
  Classified {
    label: ShapeLabel,
    depth_mean: f64,
    depth_std: f64,
    vertices: usize,
  },
}

impl ShapeResult {
  pub fn label(&self) -> Option<ShapeLabel> {
    match self {
      ShapeResult::Unclassified => None,
      ShapeResult::Classified { label, .. } => Some(*label),
    }
  }

  pub fn depth_mean(&self) -> f64 {
    match self {
      ShapeResult::Unclassified => 0.0,
      ShapeResult::Classified { depth_mean, .. } => *depth_mean,
    }
  }

  pub fn depth_std(&self) -> f64 {
    match self {
      ShapeResult::Unclassified => 0.0,
      ShapeResult::Classified { depth_std, .. } => *depth_std,
    }
  }

  pub fn vertices(&self) -> usize {
    match self {
      ShapeResult::Unclassified => 0,
      ShapeResult::Classified { vertices, .. } => *vertices,
    }
  }
}

/// 闭合轮廓的多边形近似
///
/// 以起点和离起点最远的点为锚点，将轮廓拆成两段开放折线分别简化。
pub fn approximate_closed(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
  if contour.len() < 3 || epsilon <= 0.0 {
    return contour.to_vec();
  }
  let start = contour[0];
  let distance2 = |p: &Point<i32>| {
    let (dx, dy) = ((p.x - start.x) as i64, (p.y - start.y) as i64);
    dx * dx + dy * dy
  };
  let Some(far) = (1..contour.len()).max_by_key(|&i| distance2(&contour[i])) else {
    return contour.to_vec();
  };
  if distance2(&contour[far]) == 0 {
    return vec![start];
  }

  let mut ring = contour[far..].to_vec();
  ring.push(start);

  let mut first = approximate_polygon_dp(&contour[..=far], epsilon, false);
  let mut second = approximate_polygon_dp(&ring, epsilon, false);
  // 两段在最远点相接，第二段末尾回到起点
  first.pop();
  second.pop();
  first.extend(second);
  first
}

/// 提取区域的形状特征；有效深度样本不足时返回 `None`
pub fn shape_features(region: &Region, depth: &DepthImage, config: &ShapeConfig) -> Option<ShapeFeatures> {
  let samples: Vec<f64> = region
    .inside_pixels()
    .map(|(x, y)| depth.get_pixel(x, y).0[0])
    .filter(|&d| d > 0)
    .map(f64::from)
    .collect();
  if samples.len() < config.min_depth_samples || samples.is_empty() {
    return None;
  }

  let n = samples.len() as f64;
  let depth_mean = samples.iter().sum::<f64>() / n;
  let depth_std = (samples.iter().map(|d| (d - depth_mean).powi(2)).sum::<f64>() / n).sqrt();

  let perimeter = region.perimeter();
  let vertices = approximate_closed(region.contour(), config.polygon_tolerance * perimeter).len();
  let circularity = 4.0 * PI * region.area() / (perimeter * perimeter + EPS);
  let bbox = region.contour_bbox();
  let aspect_ratio = bbox.width() as f64 / (bbox.height() as f64 + EPS);

  Some(ShapeFeatures {
    vertices,
    circularity,
    aspect_ratio,
    depth_mean,
    depth_std,
  })
}

/// 区域三维形状分类
pub fn classify_shape(region: &Region, depth: &DepthImage, config: &ShapeConfig) -> ShapeResult {
  match shape_features(region, depth, config) {
    Some(features) => ShapeResult::Classified {
      label: classify_features(&features),
      depth_mean: features.depth_mean,
      depth_std: features.depth_std,
      vertices: features.vertices,
    },
    None => ShapeResult::Unclassified,
  }
}
