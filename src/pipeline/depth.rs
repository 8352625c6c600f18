// 该文件是 Yanxing （颜形） 项目的一部分。
// src/pipeline/depth.rs - 深度图预处理
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

use image::{GrayImage, ImageBuffer, Luma, Primitive};
use imageproc::{
  filter::bilateral::{GaussianEuclideanColorDistance, bilateral_filter},
  morphology::{Mask, grayscale_close, grayscale_open},
};

use crate::{config::DepthConfig, frame::DepthImage};

/// 按当前帧的最小/最大值线性拉伸到 0-255
///
/// 全帧取值相同时输出全 0。
pub fn normalize<S>(image: &ImageBuffer<Luma<S>, Vec<S>>) -> GrayImage
where
  S: Primitive + Into<f32>,
{
  let (min, max) = image
    .pixels()
    .map(|p| p.0[0].into())
    .fold((f32::MAX, f32::MIN), |(lo, hi), v: f32| (lo.min(v), hi.max(v)));

  let range = max - min;
  let scale = if range > f32::EPSILON { 255.0 / range } else { 0.0 };

  ImageBuffer::from_fn(image.width(), image.height(), |x, y| {
    let v: f32 = image.get_pixel(x, y).0[0].into();
    Luma([((v - min) * scale).round().clamp(0.0, 255.0) as u8])
  })
}

/// 保边平滑，窗口越界处按边缘复制
pub fn smooth(image: &GrayImage, config: &DepthConfig) -> GrayImage {
  bilateral_filter(
    image,
    config.bilateral_radius,
    config.sigma_space,
    GaussianEuclideanColorDistance::new(config.sigma_color),
  )
}

/// 深度图预处理：拉伸、双边滤波、开运算后闭运算
pub fn condition(depth: &DepthImage, config: &DepthConfig) -> GrayImage {
  let normalized = normalize(depth);
  if normalized.width() == 0 || normalized.height() == 0 {
    return normalized;
  }
  let smoothed = smooth(&normalized, config);

  if config.morphology_radius == 0 {
    return smoothed;
  }
  let mask = Mask::square(config.morphology_radius);
  let opened = grayscale_open(&smoothed, &mask);
  grayscale_close(&opened, &mask)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ramp(width: u32, height: u32) -> DepthImage {
    ImageBuffer::from_fn(width, height, |x, y| Luma([(x * 37 + y * 1013) as u16 % 9000]))
  }

  #[test]
  fn output_keeps_dimensions() {
    let depth = ramp(37, 23);
    let conditioned = condition(&depth, &DepthConfig::default());
    assert_eq!(conditioned.dimensions(), depth.dimensions());

    let empty = condition(&DepthImage::new(0, 0), &DepthConfig::default());
    assert_eq!(empty.dimensions(), (0, 0));
  }

  #[test]
  fn normalize_spans_full_range() {
    let depth = ramp(40, 30);
    let normalized = normalize(&depth);
    let min = normalized.pixels().map(|p| p.0[0]).min().unwrap();
    let max = normalized.pixels().map(|p| p.0[0]).max().unwrap();
    assert_eq!((min, max), (0, 255));
  }

  #[test]
  fn flat_depth_maps_to_zero() {
    let depth = DepthImage::from_pixel(16, 16, Luma([1234]));
    let conditioned = condition(&depth, &DepthConfig::default());
    assert!(conditioned.pixels().all(|p| p.0[0] == 0));
  }

  #[test]
  fn removes_isolated_speckle() {
    let mut depth = DepthImage::from_pixel(20, 20, Luma([1000]));
    depth.put_pixel(0, 0, Luma([0]));
    depth.put_pixel(10, 10, Luma([5000]));
    let conditioned = condition(&depth, &DepthConfig::default());
    let center = conditioned.get_pixel(10, 10).0[0];
    let neighbour = conditioned.get_pixel(12, 12).0[0];
    assert!(center.abs_diff(neighbour) <= 1, "{} vs {}", center, neighbour);
  }

  #[test]
  fn bilateral_preserves_step_edge() {
    let step = GrayImage::from_fn(20, 10, |x, _| Luma([if x < 10 { 0 } else { 255 }]));
    let filtered = smooth(&step, &DepthConfig::default());
    assert!(filtered.get_pixel(9, 5).0[0] < 10);
    assert!(filtered.get_pixel(10, 5).0[0] > 245);
  }
}
