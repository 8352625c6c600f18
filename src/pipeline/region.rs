// 该文件是 Yanxing （颜形） 项目的一部分。
// src/pipeline/region.rs - 候选区域提取
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

use image::{GrayImage, Luma};
use imageproc::{
  contours::{BorderType, find_contours},
  drawing::draw_polygon_mut,
  geometry::{arc_length, oriented_contour_area},
  point::Point,
  rect::Rect,
};
use tracing::debug;

use crate::config::RegionConfig;

/// 区域掩码中“内部”像素的取值
pub const INSIDE: u8 = 255;

/// 多边形面积矩（零阶与一阶）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
  pub m00: f64,
  pub m10: f64,
  pub m01: f64,
}

impl Moments {
  /// 按闭合多边形计算，方向无关
  pub fn of_polygon(points: &[Point<i32>]) -> Self {
    let area = oriented_contour_area(points);
    if area == 0.0 {
      return Self { m00: 0.0, m10: 0.0, m01: 0.0 };
    }
    let sign = area.signum();

    let n = points.len();
    let (mut mx, mut my) = (0.0, 0.0);
    for (i, p) in points.iter().enumerate() {
      let q = points[(i + 1) % n];
      let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
      let cross = x0 * y1 - x1 * y0;
      mx += (x0 + x1) * cross;
      my += (y0 + y1) * cross;
    }
    Self {
      m00: area.abs(),
      m10: sign * mx / 6.0,
      m01: sign * my / 6.0,
    }
  }

  /// 质心，面积为零时返回 `None`
  pub fn centroid(&self) -> Option<(i32, i32)> {
    if self.m00.abs() < f64::EPSILON {
      return None;
    }
    Some(((self.m10 / self.m00) as i32, (self.m01 / self.m00) as i32))
  }
}

/// 从边缘图中提取出的一个闭合候选区域
#[derive(Debug, Clone)]
pub struct Region {
  contour: Vec<Point<i32>>,
  contour_bbox: Rect,
  bbox: Rect,
  mask: GrayImage,
  moments: Moments,
  perimeter: f64,
}

impl Region {
  /// 由轮廓构造区域；面积过小或扩展后包围框过小时返回 `None`
  pub fn from_contour(
    contour: Vec<Point<i32>>,
    frame_size: (u32, u32),
    config: &RegionConfig,
  ) -> Option<Self> {
    if contour.is_empty() {
      return None;
    }
    let moments = Moments::of_polygon(&contour);
    if moments.m00 < config.min_area {
      return None;
    }

    let contour_bbox = bounding_rect(&contour);
    let bbox = pad_and_clamp(contour_bbox, config.padding, frame_size)?;
    if bbox.width() < config.min_side || bbox.height() < config.min_side {
      return None;
    }

    let mask = interior_mask(&contour, bbox);
    let perimeter = arc_length(&contour, true);

    Some(Self {
      contour,
      contour_bbox,
      bbox,
      mask,
      moments,
      perimeter,
    })
  }

  pub fn contour(&self) -> &[Point<i32>] {
    &self.contour
  }

  /// 扩展并裁剪到画面内的包围框
  pub fn bbox(&self) -> Rect {
    self.bbox
  }

  /// 轮廓本身的紧包围框
  pub fn contour_bbox(&self) -> Rect {
    self.contour_bbox
  }

  /// 与 `bbox` 同尺寸的内部掩码
  pub fn mask(&self) -> &GrayImage {
    &self.mask
  }

  pub fn moments(&self) -> Moments {
    self.moments
  }

  pub fn area(&self) -> f64 {
    self.moments.m00
  }

  pub fn perimeter(&self) -> f64 {
    self.perimeter
  }

  pub fn centroid(&self) -> Option<(i32, i32)> {
    self.moments.centroid()
  }

  /// 遍历区域内部像素的整帧坐标
  pub fn inside_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
    let (left, top) = (self.bbox.left() as u32, self.bbox.top() as u32);
    self
      .mask
      .enumerate_pixels()
      .filter(|(_, _, p)| p.0[0] == INSIDE)
      .map(move |(x, y, _)| (left + x, top + y))
  }
}

fn bounding_rect(points: &[Point<i32>]) -> Rect {
  let (mut x0, mut y0, mut x1, mut y1) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
  for p in points {
    x0 = x0.min(p.x);
    y0 = y0.min(p.y);
    x1 = x1.max(p.x);
    y1 = y1.max(p.y);
  }
  Rect::at(x0, y0).of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32)
}

fn pad_and_clamp(rect: Rect, padding: u32, (width, height): (u32, u32)) -> Option<Rect> {
  let pad = padding as i32;
  let left = (rect.left() - pad).max(0);
  let top = (rect.top() - pad).max(0);
  let right = (rect.right() + 1 + pad).min(width as i32);
  let bottom = (rect.bottom() + 1 + pad).min(height as i32);
  if right <= left || bottom <= top {
    return None;
  }
  Some(Rect::at(left, top).of_size((right - left) as u32, (bottom - top) as u32))
}

fn interior_mask(contour: &[Point<i32>], bbox: Rect) -> GrayImage {
  let mut mask = GrayImage::new(bbox.width(), bbox.height());

  let mut local: Vec<Point<i32>> = contour
    .iter()
    .map(|p| Point::new(p.x - bbox.left(), p.y - bbox.top()))
    .collect();
  local.dedup();
  while local.len() > 1 && local.first() == local.last() {
    local.pop();
  }

  if local.len() >= 3 {
    draw_polygon_mut(&mut mask, &local, Luma([INSIDE]));
  }
  // 轮廓点本身总属于区域
  for p in &local {
    if p.x >= 0 && p.y >= 0 && (p.x as u32) < mask.width() && (p.y as u32) < mask.height() {
      mask.put_pixel(p.x as u32, p.y as u32, Luma([INSIDE]));
    }
  }
  mask
}

/// 从边缘掩码中提取最外层闭合轮廓并过滤
pub fn extract_regions(edges: &GrayImage, config: &RegionConfig) -> Vec<Region> {
  let contours = find_contours::<i32>(edges);
  let total = contours.len();

  let regions: Vec<Region> = contours
    .into_iter()
    .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
    .filter_map(|c| Region::from_contour(c.points, edges.dimensions(), config))
    .collect();

  debug!("轮廓 {} 个，保留区域 {} 个", total, regions.len());
  regions
}
