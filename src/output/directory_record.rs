// 该文件是 Yanxing （颜形） 项目的一部分。
// src/output/directory_record.rs - 按日期分目录的检测记录输出
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

use std::{
  path::{Path, PathBuf},
  sync::{
    Mutex, PoisonError,
    atomic::{AtomicU16, Ordering},
  },
};

use chrono::{Datelike, Utc};
use image::DynamicImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{DEPTH_CHANNEL, EDGES_CHANNEL, OVERLAY_CHANNEL, Render},
  pipeline::{DetectionRecord, FrameOutput},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// `folder:///dir?always`
///
/// 每帧在 `dir/YYYY/MM/DD/` 下写入 `HH-MM-SS-XXXX-<通道>.png` 与同名 `.json` 检测记录。
/// 未检测到目标的帧默认跳过，带 `always` 参数时照常写入。
/// 单独调用 `show` 时，同一帧的各通道共用一个前缀，通道重复出现即视为新的一帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  frame_counter: AtomicU16,
  always: bool,
  shown: Mutex<ShownFrame>,
}

/// `show` 当前所在帧的前缀及已写入的通道
#[derive(Default)]
struct ShownFrame {
  base: Option<PathBuf>,
  channels: Vec<String>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      frame_counter: AtomicU16::new(0),
      always,
      shown: Mutex::new(ShownFrame::default()),
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  /// 本帧文件名前缀（不含通道与扩展名）
  fn frame_base(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn channel_path(base: &Path, name: &str) -> PathBuf {
    let mut file = base.as_os_str().to_owned();
    file.push(format!("-{}.png", name));
    PathBuf::from(file)
  }

  fn write_record(base: &Path, output: &FrameOutput) -> Result<(), DirectoryRecordOutputError> {
    let records: Vec<DetectionRecord> = output.detections.iter().map(|d| d.record()).collect();
    let path = base.with_extension("json");
    std::fs::write(&path, serde_json::to_string_pretty(&records)?)?;
    debug!("写入检测记录: {}", path.display());
    Ok(())
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn show(&self, name: &str, image: &DynamicImage) -> Result<(), Self::Error> {
    let mut shown = self.shown.lock().unwrap_or_else(PoisonError::into_inner);
    let repeated = shown.channels.iter().any(|c| c == name);
    let base = match &shown.base {
      Some(base) if !repeated => base.clone(),
      _ => {
        let base = self.frame_base()?;
        shown.base = Some(base.clone());
        shown.channels.clear();
        base
      }
    };
    shown.channels.push(name.to_string());

    image.save(Self::channel_path(&base, name))?;
    Ok(())
  }

  fn render_result(&self, output: &FrameOutput) -> Result<(), Self::Error> {
    if !self.always && output.detections.is_empty() {
      debug!("本帧无检测结果，跳过记录");
      return Ok(());
    }

    let base = self.frame_base()?;
    output
      .overlay
      .save(Self::channel_path(&base, OVERLAY_CHANNEL))?;
    output
      .depth_map
      .save(Self::channel_path(&base, DEPTH_CHANNEL))?;
    output.edges.save(Self::channel_path(&base, EDGES_CHANNEL))?;
    Self::write_record(&base, output)?;

    info!("记录帧: {}", base.display());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use image::{GrayImage, RgbImage};

  use super::*;

  fn empty_output() -> FrameOutput {
    FrameOutput {
      detections: Vec::new(),
      overlay: RgbImage::new(4, 4),
      depth_map: RgbImage::new(4, 4),
      edges: GrayImage::new(4, 4),
    }
  }

  fn count_files(dir: &std::path::Path, extension: &str) -> usize {
    let mut count = 0;
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        count += count_files(&path, extension);
      } else if path.extension().is_some_and(|e| e == extension) {
        count += 1;
      }
    }
    count
  }

  #[test]
  fn empty_frames_are_skipped_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&empty_output()).unwrap();
    assert_eq!(count_files(dir.path(), "png"), 0);
  }

  #[test]
  fn always_records_every_channel() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&empty_output()).unwrap();
    output.render_result(&empty_output()).unwrap();
    assert_eq!(count_files(dir.path(), "png"), 6);
    assert_eq!(count_files(dir.path(), "json"), 2);
  }

  fn png_names(dir: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          pending.push(path);
        } else if path.extension().is_some_and(|e| e == "png") {
          names.push(path.file_name().unwrap().to_string_lossy().into_owned());
        }
      }
    }
    names.sort();
    names
  }

  #[test]
  fn shown_channels_share_one_frame_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let image = DynamicImage::ImageLuma8(GrayImage::new(4, 4));

    for name in [OVERLAY_CHANNEL, DEPTH_CHANNEL, EDGES_CHANNEL] {
      output.show(name, &image).unwrap();
    }
    let names = png_names(dir.path());
    assert_eq!(names.len(), 3);
    assert!(names.iter().all(|n| n.contains("-0001-")), "{:?}", names);

    // 通道重复出现时开始新的一帧
    output.show(OVERLAY_CHANNEL, &image).unwrap();
    let names = png_names(dir.path());
    assert_eq!(names.len(), 4);
    assert_eq!(names.iter().filter(|n| n.contains("-0002-")).count(), 1);
  }

  #[test]
  fn frame_ids_increase() {
    let url = url::Url::parse("folder:///tmp/unused").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.frame_id(), 1);
    assert_eq!(output.frame_id(), 2);
  }
}
