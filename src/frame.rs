// 该文件是 Yanxing （颜形） 项目的一部分。
// src/frame.rs - 彩色/深度帧对定义
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

use image::{ImageBuffer, Luma, RgbImage};
use thiserror::Error;

/// 原始深度图，每像素一个传感器单位的距离值
pub type DepthImage = ImageBuffer<Luma<u16>, Vec<u16>>;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("帧尺寸不匹配: 彩色 {color:?}, 深度 {depth:?}")]
  DimensionMismatch {
    color: (u32, u32),
    depth: (u32, u32),
  },
  #[error("空帧")]
  Empty,
}

/// 同一时刻采集、逐像素对齐的彩色图与深度图
#[derive(Debug, Clone)]
pub struct FramePair {
  color: RgbImage,
  depth: DepthImage,
}

impl FramePair {
  pub fn new(color: RgbImage, depth: DepthImage) -> Result<Self, FrameError> {
    if color.dimensions() != depth.dimensions() {
      return Err(FrameError::DimensionMismatch {
        color: color.dimensions(),
        depth: depth.dimensions(),
      });
    }
    if color.width() == 0 || color.height() == 0 {
      return Err(FrameError::Empty);
    }
    Ok(Self { color, depth })
  }

  pub fn color(&self) -> &RgbImage {
    &self.color
  }

  pub fn depth(&self) -> &DepthImage {
    &self.depth
  }

  pub fn width(&self) -> u32 {
    self.color.width()
  }

  pub fn height(&self) -> u32 {
    self.color.height()
  }

  pub fn into_parts(self) -> (RgbImage, DepthImage) {
    (self.color, self.depth)
  }
}
