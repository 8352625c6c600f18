// 该文件是 Yanxing （颜形） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::sync::atomic::{AtomicBool, Ordering};

use ab_glyph::{FontArc, InvalidFont, PxScale};
use image::{GrayImage, ImageBuffer, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_text_mut};
use thiserror::Error;
use tracing::{info, warn};

use crate::{
  config::OverlayConfig,
  pipeline::{Detection, depth::normalize},
};

// 文本渲染常量
const CAPTION_FONT_SIZE: f32 = 18.0;
const POSITION_FONT_SIZE: f32 = 14.0;
const CAPTION_TEXT_HEIGHT: i32 = 20;
const CENTROID_RADIUS: i32 = 5;
const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]); // 红色
const EDGE_COLOR: [f32; 3] = [255.0, 0.0, 0.0];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("读取字体文件失败: {0}")]
  Io(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] InvalidFont),
}

pub struct Draw {
  font: Option<FontArc>,
  edge_alpha: f32,
  text_skipped: AtomicBool,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font: None,
      edge_alpha: OverlayConfig::default().edge_alpha,
      text_skipped: AtomicBool::new(false),
    }
  }
}

impl Draw {
  pub fn new(config: &OverlayConfig) -> Result<Self, DrawError> {
    let font = match &config.font {
      Some(path) => {
        info!("加载字体文件: {}", path.display());
        Some(FontArc::try_from_vec(std::fs::read(path)?)?)
      }
      None => None,
    };
    Ok(Self {
      font,
      edge_alpha: config.edge_alpha,
      text_skipped: AtomicBool::new(false),
    })
  }

  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  /// 是否有文字因未配置字体而被跳过
  pub fn text_skipped(&self) -> bool {
    self.text_skipped.load(Ordering::Relaxed)
  }

  fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, text: &str) {
    match &self.font {
      Some(font) => draw_text_mut(image, color, x, y, PxScale::from(size), font, text),
      None => {
        if !self.text_skipped.swap(true, Ordering::Relaxed) {
          warn!("未配置字体（overlay.font），叠加图中省略位置与标签文字");
        }
      }
    }
  }

  // 轮廓描边，加粗为 2 像素
  fn draw_outline(&self, image: &mut RgbImage, detection: &Detection, color: Rgb<u8>) {
    let contour = detection.region.contour();
    let n = contour.len();
    if n < 2 {
      return;
    }
    for offset in [0.0f32, 1.0] {
      for i in 0..n {
        let a = contour[i];
        let b = contour[(i + 1) % n];
        draw_line_segment_mut(
          image,
          (a.x as f32 + offset, a.y as f32 + offset),
          (b.x as f32 + offset, b.y as f32 + offset),
          color,
        );
      }
    }
  }

  /// 在彩色图副本上绘制检测结果，并以低不透明度叠加边缘掩码
  pub fn annotate(&self, color: &RgbImage, edges: &GrayImage, detections: &[Detection]) -> RgbImage {
    let mut image = color.clone();

    for detection in detections {
      let outline = detection.color.label.outline();
      self.draw_outline(&mut image, detection, outline);

      if let (Some((cx, cy)), Some(depth_mm)) = (detection.centroid, detection.depth_mm) {
        draw_filled_circle_mut(&mut image, (cx, cy), CENTROID_RADIUS, MARKER_COLOR);
        let position = format!("({}, {}, {:.1}mm)", cx, cy, depth_mm);
        self.draw_text(
          &mut image,
          MARKER_COLOR,
          cx + 10,
          cy - POSITION_FONT_SIZE as i32 / 2,
          POSITION_FONT_SIZE,
          &position,
        );
      }

      let bbox = detection.region.bbox();
      let caption = format!(
        "{} | {} | {:.1}mm",
        detection.shape_label(),
        detection.color.label,
        detection.shape.depth_mean()
      );
      self.draw_text(
        &mut image,
        outline,
        bbox.left(),
        (bbox.top() - CAPTION_TEXT_HEIGHT).max(0),
        CAPTION_FONT_SIZE,
        &caption,
      );
    }

    blend_edges(&mut image, edges, self.edge_alpha);
    image
  }
}

/// `(1 - alpha) * image + alpha * edge_overlay`，边缘处叠加红色
pub fn blend_edges(image: &mut RgbImage, edges: &GrayImage, alpha: f32) {
  for (x, y, pixel) in image.enumerate_pixels_mut() {
    let on = edges.get_pixel(x, y).0[0] > 0;
    for c in 0..3 {
      let overlay = if on { EDGE_COLOR[c] } else { 0.0 };
      let v = (1.0 - alpha) * pixel.0[c] as f32 + alpha * overlay;
      pixel.0[c] = v.round().clamp(0.0, 255.0) as u8;
    }
  }
}

/// JET 伪彩色深度图
pub fn colorize_depth(depth: &GrayImage) -> RgbImage {
  let normalized = normalize(depth);
  ImageBuffer::from_fn(depth.width(), depth.height(), |x, y| {
    let t = normalized.get_pixel(x, y).0[0] as f32 / 255.0;
    let channel = |shift: f32| ((1.5 - (4.0 * t - shift).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([channel(3.0), channel(2.0), channel(1.0)])
  })
}

#[cfg(test)]
mod tests {
  use image::Luma;
  use imageproc::point::Point;

  use super::*;
  use crate::{
    config::RegionConfig,
    pipeline::{
      color::{ColorLabel, ColorResult},
      region::Region,
      shape::ShapeResult,
    },
  };

  #[test]
  fn jet_runs_blue_to_red() {
    let depth = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
    let jet = colorize_depth(&depth);
    assert_eq!(jet.get_pixel(0, 0), &Rgb([0, 0, 128]));
    assert_eq!(jet.get_pixel(1, 0), &Rgb([128, 0, 0]));
  }

  #[test]
  fn blend_tints_edges_only_red() {
    let mut image = RgbImage::from_pixel(2, 1, Rgb([100, 100, 100]));
    let edges = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 255 } else { 0 }]));
    blend_edges(&mut image, &edges, 0.2);
    assert_eq!(image.get_pixel(0, 0), &Rgb([131, 80, 80]));
    assert_eq!(image.get_pixel(1, 0), &Rgb([80, 80, 80]));
  }

  fn square_detection() -> Detection {
    let contour = vec![Point::new(10, 10), Point::new(40, 10), Point::new(40, 40), Point::new(10, 40)];
    let config = RegionConfig {
      min_area: 0.0,
      ..Default::default()
    };
    Detection {
      region: Region::from_contour(contour, (60, 60), &config).unwrap(),
      color: ColorResult {
        label: ColorLabel::Green,
        hsv: None,
        display: Rgb([0, 0, 0]),
      },
      shape: ShapeResult::Unclassified,
      centroid: Some((25, 25)),
      depth_mm: Some(800.0),
      model_label: None,
    }
  }

  #[test]
  fn annotate_without_font_still_draws_geometry() {
    let image = RgbImage::new(60, 60);
    let edges = GrayImage::new(60, 60);
    let draw = Draw::default();
    assert!(!draw.text_skipped());

    let out = draw.annotate(&image, &edges, &[square_detection()]);
    assert!(draw.text_skipped());
    assert!(out.get_pixel(25, 10).0[1] > 150, "outline missing");
    assert!(out.get_pixel(25, 25).0[0] > 150, "centroid marker missing");
    assert_eq!(out.get_pixel(2, 2), &Rgb([0, 0, 0]));
  }

  #[test]
  fn annotate_without_detections_only_blends() {
    let image = RgbImage::from_pixel(4, 4, Rgb([50, 50, 50]));
    let edges = GrayImage::new(4, 4);
    let out = Draw::default().annotate(&image, &edges, &[]);
    assert!(out.pixels().all(|p| *p == Rgb([40, 40, 40])));
  }
}
