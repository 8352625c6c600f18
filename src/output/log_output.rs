// 该文件是 Yanxing （颜形） 项目的一部分。
// src/output/log_output.rs - 仅记录日志的输出
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

use std::convert::Infallible;

use image::DynamicImage;
use tracing::{debug, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::Render, pipeline::FrameOutput};

/// `log:`，不展示图像，逐条记录检测结果
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = Infallible;

  fn from_url(_url: &Url) -> Result<Self, Self::Error> {
    Ok(LogOutput)
  }
}

impl Render for LogOutput {
  type Error = Infallible;

  fn show(&self, name: &str, image: &DynamicImage) -> Result<(), Self::Error> {
    debug!("通道 {}: {}x{}", name, image.width(), image.height());
    Ok(())
  }

  fn render_result(&self, output: &FrameOutput) -> Result<(), Self::Error> {
    info!("本帧检测到 {} 个目标", output.detections.len());
    for detection in &output.detections {
      let record = detection.record();
      info!(
        "{} | {} | 质心 {:?} | 深度 {:?}mm | bbox {:?}",
        record.shape, record.color, record.centroid, record.depth_mm, record.bbox
      );
    }
    Ok(())
  }
}
