// 该文件是 Yanxing （颜形） 项目的一部分。
// src/output.rs - 结果展示输出
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

use image::DynamicImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, pipeline::FrameOutput};

/// 叠加图通道
pub const OVERLAY_CHANNEL: &str = "overlay";
/// 伪彩色深度图通道
pub const DEPTH_CHANNEL: &str = "depth";
/// 边缘掩码通道
pub const EDGES_CHANNEL: &str = "edges";

pub trait Render {
  type Error;

  /// 在指定通道下展示一张图像
  fn show(&self, name: &str, image: &DynamicImage) -> Result<(), Self::Error>;

  /// 展示一帧的三路诊断图像
  fn render_result(&self, output: &FrameOutput) -> Result<(), Self::Error> {
    self.show(OVERLAY_CHANNEL, &DynamicImage::ImageRgb8(output.overlay.clone()))?;
    self.show(DEPTH_CHANNEL, &DynamicImage::ImageRgb8(output.depth_map.clone()))?;
    self.show(EDGES_CHANNEL, &DynamicImage::ImageLuma8(output.edges.clone()))
  }
}

impl<R: Render + ?Sized> Render for &R {
  type Error = R::Error;

  fn show(&self, name: &str, image: &DynamicImage) -> Result<(), Self::Error> {
    (**self).show(name, image)
  }

  fn render_result(&self, output: &FrameOutput) -> Result<(), Self::Error> {
    (**self).render_result(output)
  }
}

pub mod draw;

mod log_output;
pub use self::log_output::LogOutput;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput)),
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render for OutputWrapper {
  type Error = OutputError;

  fn show(&self, name: &str, image: &DynamicImage) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => match output.show(name, image) {
        Ok(()) => Ok(()),
        Err(never) => match never {},
      },
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => {
        output.show(name, image).map_err(OutputError::from)
      }
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => {
        output.show(name, image).map_err(OutputError::from)
      }
    }
  }

  fn render_result(&self, result: &FrameOutput) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => match output.render_result(result) {
        Ok(()) => Ok(()),
        Err(never) => match never {},
      },
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => {
        output.render_result(result).map_err(OutputError::from)
      }
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => {
        output.render_result(result).map_err(OutputError::from)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn schemes_pick_the_matching_sink() {
    let url = Url::parse("log:").unwrap();
    assert!(matches!(OutputWrapper::from_url(&url), Ok(OutputWrapper::Log(_))));

    let url = Url::parse("rtsp://0.0.0.0:8554/live").unwrap();
    assert!(matches!(OutputWrapper::from_url(&url), Err(OutputError::SchemeMismatch)));
  }
}
