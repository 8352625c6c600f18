// 该文件是 Yanxing （颜形） 项目的一部分。
// src/pipeline/edge.rs - 彩色/深度边缘融合
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

use image::{GrayImage, ImageBuffer, Luma, RgbImage, imageops};
use imageproc::{
  distance_transform::Norm,
  edges::canny,
  morphology::{dilate, erode},
};

use crate::{config::EdgeConfig, pipeline::depth::normalize};

/// 边缘像素值
pub const EDGE: u8 = 255;

/// 融合彩色图与预处理后深度图的边缘
///
/// 彩色边缘抓住同深度但颜色不同的边界，深度边缘抓住同色但距离不同的边界，
/// 两者取并集后先膨胀再腐蚀，弥合细小断口。
pub fn fuse_edges(color: &RgbImage, depth: &GrayImage, config: &EdgeConfig) -> GrayImage {
  let gray = imageops::grayscale(color);
  let color_edges = canny(&gray, config.color_low, config.color_high);

  let depth_norm = normalize(depth);
  let depth_edges = canny(&depth_norm, config.depth_low, config.depth_high);

  let combined: GrayImage = ImageBuffer::from_fn(color.width(), color.height(), |x, y| {
    let on = color_edges.get_pixel(x, y).0[0] > 0 || depth_edges.get_pixel(x, y).0[0] > 0;
    Luma([if on { EDGE } else { 0 }])
  });

  if config.closing_radius == 0 {
    return combined;
  }
  let dilated = dilate(&combined, Norm::LInf, config.closing_radius);
  erode(&dilated, Norm::LInf, config.closing_radius)
}
