// 该文件是 Yanxing （颜形） 项目的一部分。
// src/input.rs - 彩色/深度帧对输入
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

use std::path::Path;

use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl,
  frame::{DepthImage, FrameError, FramePair},
};

/// 默认深度比例：每个传感器单位 1 毫米
pub const DEFAULT_DEPTH_SCALE: f32 = 0.001;

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::ImagePairInput;

#[cfg(feature = "directory_sequence")]
mod directory_sequence;
#[cfg(feature = "directory_sequence")]
pub use self::directory_sequence::DirectorySequenceInput;

#[derive(Error, Debug)]
pub enum InputError {
  /// 本次迭代缺少彩色或深度帧，可跳过
  #[error("帧不可用: {0}")]
  FrameUnavailable(String),
  #[error("设备故障: {0}")]
  DeviceFailure(String),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("图像解码错误: {0}")]
  Image(#[from] image::ImageError),
  #[error("帧错误: {0}")]
  Frame(#[from] FrameError),
  #[error("参数错误: {0}")]
  InvalidArgument(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

impl InputError {
  /// 可跳过本帧继续处理的错误
  pub fn is_transient(&self) -> bool {
    matches!(self, InputError::FrameUnavailable(_))
  }
}

/// 帧对来源（相机或录制数据）
pub trait FrameSource {
  /// 阻塞等待下一帧对，`Ok(None)` 表示数据流结束
  fn next_frame_pair(&mut self) -> Result<Option<FramePair>, InputError>;

  /// 传感器单位到米的换算系数，会话期间不变
  fn depth_scale(&self) -> f32;

  /// 释放底层资源，可重复调用
  fn close(&mut self) {}
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
  fn next_frame_pair(&mut self) -> Result<Option<FramePair>, InputError> {
    (**self).next_frame_pair()
  }

  fn depth_scale(&self) -> f32 {
    (**self).depth_scale()
  }

  fn close(&mut self) {
    (**self).close()
  }
}

pub(crate) fn read_color(path: &Path) -> Result<RgbImage, InputError> {
  Ok(image::open(path)?.into_rgb8())
}

pub(crate) fn read_depth(path: &Path) -> Result<DepthImage, InputError> {
  Ok(image::open(path)?.into_luma16())
}

pub(crate) fn depth_scale_from_url(url: &Url) -> Result<f32, InputError> {
  match crate::query_value(url, "scale") {
    Some(v) => {
      let scale: f32 = v
        .parse()
        .map_err(|_| InputError::InvalidArgument(format!("无效的深度比例: {}", v)))?;
      if scale <= 0.0 {
        return Err(InputError::InvalidArgument(format!("深度比例必须为正数: {}", scale)));
      }
      Ok(scale)
    }
    None => Ok(DEFAULT_DEPTH_SCALE),
  }
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImagePairInput),
  #[cfg(feature = "directory_sequence")]
  DirectorySequence(DirectorySequenceInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImagePairInput::SCHEME {
        return Ok(InputWrapper::ReadImageFile(ImagePairInput::from_url(url)?));
      }
    }
    #[cfg(feature = "directory_sequence")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == DirectorySequenceInput::SCHEME {
        return Ok(InputWrapper::DirectorySequence(DirectorySequenceInput::from_url(url)?));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl FrameSource for InputWrapper {
  fn next_frame_pair(&mut self) -> Result<Option<FramePair>, InputError> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next_frame_pair(),
      #[cfg(feature = "directory_sequence")]
      InputWrapper::DirectorySequence(input) => input.next_frame_pair(),
    }
  }

  fn depth_scale(&self) -> f32 {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.depth_scale(),
      #[cfg(feature = "directory_sequence")]
      InputWrapper::DirectorySequence(input) => input.depth_scale(),
    }
  }

  fn close(&mut self) {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.close(),
      #[cfg(feature = "directory_sequence")]
      InputWrapper::DirectorySequence(input) => input.close(),
    }
  }
}

/// 显式持有的相机会话
///
/// 深度比例在打开时读取一次；离开作用域时（包括出错和 panic）自动释放来源。
pub struct Session<S: FrameSource> {
  source: S,
  depth_scale: f32,
  closed: bool,
}

impl Session<InputWrapper> {
  pub fn open(url: &Url) -> Result<Self, InputError> {
    info!("打开输入源: {}", url);
    Ok(Self::new(InputWrapper::from_url(url)?))
  }
}

impl<S: FrameSource> Session<S> {
  pub fn new(source: S) -> Self {
    let depth_scale = source.depth_scale();
    info!("深度比例: {} 米/单位", depth_scale);
    Self {
      source,
      depth_scale,
      closed: false,
    }
  }

  pub fn depth_scale(&self) -> f32 {
    self.depth_scale
  }

  pub fn next(&mut self) -> Result<Option<FramePair>, InputError> {
    if self.closed {
      return Ok(None);
    }
    self.source.next_frame_pair()
  }

  pub fn close(mut self) {
    self.release();
  }

  fn release(&mut self) {
    if !self.closed {
      self.closed = true;
      self.source.close();
      info!("输入源已释放");
    }
  }
}

impl<S: FrameSource> Drop for Session<S> {
  fn drop(&mut self) {
    if !self.closed {
      warn!("会话未显式关闭，自动释放输入源");
      self.release();
    }
  }
}
