// 该文件是 Yanxing （颜形） 项目的一部分。
// src/input/read_image_file.rs - 单张彩色/深度图像文件输入
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

use std::path::PathBuf;

use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::FramePair,
  input::{FrameSource, InputError, depth_scale_from_url, read_color, read_depth},
  query_value,
};

/// `image:///color.png?depth=/depth.png&scale=0.001&repeat=1`
pub struct ImagePairInput {
  frame: Option<FramePair>,
  remaining: usize,
  depth_scale: f32,
}

impl FromUrlWithScheme for ImagePairInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImagePairInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(InputError::SchemeMismatch);
    }

    let color_path = PathBuf::from(url.path());
    let depth_path = query_value(url, "depth")
      .map(PathBuf::from)
      .ok_or_else(|| InputError::InvalidArgument("缺少 depth 参数".to_string()))?;
    let remaining = match query_value(url, "repeat") {
      Some(v) => v
        .parse()
        .map_err(|_| InputError::InvalidArgument(format!("无效的 repeat: {}", v)))?,
      None => 1,
    };

    info!(
      "读取图像对: {} / {}",
      color_path.display(),
      depth_path.display()
    );
    let frame = FramePair::new(read_color(&color_path)?, read_depth(&depth_path)?)?;

    Ok(Self {
      frame: Some(frame),
      remaining,
      depth_scale: depth_scale_from_url(url)?,
    })
  }
}

impl FrameSource for ImagePairInput {
  fn next_frame_pair(&mut self) -> Result<Option<FramePair>, InputError> {
    if self.remaining == 0 {
      return Ok(None);
    }
    self.remaining -= 1;
    if self.remaining == 0 {
      return Ok(self.frame.take());
    }
    Ok(self.frame.clone())
  }

  fn depth_scale(&self) -> f32 {
    self.depth_scale
  }

  fn close(&mut self) {
    self.frame = None;
    self.remaining = 0;
  }
}
