// 该文件是 Yanxing （颜形） 项目的一部分。
// src/input/directory_sequence.rs - 录制目录序列输入
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

use std::{collections::VecDeque, path::PathBuf};

use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::FramePair,
  input::{FrameSource, InputError, depth_scale_from_url, read_color, read_depth},
};

const COLOR_SUFFIX: &str = "-color.png";
const DEPTH_SUFFIX: &str = "-depth.png";

/// `folder:///dir?scale=0.001`
///
/// 目录中按文件名排序的 `<stem>-color.png` / `<stem>-depth.png` 帧对。
pub struct DirectorySequenceInput {
  directory: PathBuf,
  stems: VecDeque<String>,
  depth_scale: f32,
}

impl FromUrlWithScheme for DirectorySequenceInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectorySequenceInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(InputError::SchemeMismatch);
    }

    let directory = PathBuf::from(url.path());
    let mut stems = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let name = entry?.file_name().to_string_lossy().into_owned();
      if let Some(stem) = name.strip_suffix(COLOR_SUFFIX) {
        stems.push(stem.to_string());
      }
    }
    stems.sort();
    info!("目录 {} 中共 {} 帧", directory.display(), stems.len());

    Ok(Self {
      directory,
      stems: stems.into(),
      depth_scale: depth_scale_from_url(url)?,
    })
  }
}

impl FrameSource for DirectorySequenceInput {
  fn next_frame_pair(&mut self) -> Result<Option<FramePair>, InputError> {
    let Some(stem) = self.stems.pop_front() else {
      return Ok(None);
    };
    if !self.directory.is_dir() {
      return Err(InputError::DeviceFailure(format!(
        "录制目录已不可用: {}",
        self.directory.display()
      )));
    }

    let color_path = self.directory.join(format!("{}{}", stem, COLOR_SUFFIX));
    let depth_path = self.directory.join(format!("{}{}", stem, DEPTH_SUFFIX));
    if !depth_path.exists() {
      return Err(InputError::FrameUnavailable(format!("{} 缺少深度帧", stem)));
    }

    debug!("读取帧 {}", stem);
    let frame = FramePair::new(read_color(&color_path)?, read_depth(&depth_path)?)?;
    Ok(Some(frame))
  }

  fn depth_scale(&self) -> f32 {
    self.depth_scale
  }

  fn close(&mut self) {
    self.stems.clear();
  }
}
