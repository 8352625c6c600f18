// 该文件是 Yanxing （颜形） 项目的一部分。
// src/pipeline.rs - 单帧分类流水线
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

pub mod color;
pub mod depth;
pub mod edge;
pub mod region;
pub mod shape;

use image::{GrayImage, RgbImage};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;
use tracing::debug;

use crate::{
  config::PipelineConfig,
  frame::FramePair,
  model::{Model, NoModel},
  output::draw::{Draw, DrawError, colorize_depth},
};

use self::{
  color::{ColorLabel, ColorResult, Hsv, classify_color},
  region::{Region, extract_regions},
  shape::{ShapeResult, classify_shape},
};

/// 一个被接受的检测结果，构造后不再修改
#[derive(Debug, Clone)]
pub struct Detection {
  pub region: Region,
  pub color: ColorResult,
  pub shape: ShapeResult,
  /// 区域面积为零时为 `None`
  pub centroid: Option<(i32, i32)>,
  /// 质心处的深度（毫米）
  pub depth_mm: Option<f32>,
  pub model_label: Option<String>,
}

impl Detection {
  pub fn shape_label(&self) -> String {
    self
      .shape
      .label()
      .map(|l| l.to_string())
      .unwrap_or_else(|| "unknown".to_string())
  }

  pub fn record(&self) -> DetectionRecord {
    let bbox = self.region.bbox();
    DetectionRecord {
      color: self.color.label,
      hsv: self.color.hsv,
      shape: self.shape_label(),
      mean_depth: self.shape.depth_mean(),
      depth_std: self.shape.depth_std(),
      vertices: self.shape.vertices(),
      bbox: [bbox.left(), bbox.top(), bbox.width() as i32, bbox.height() as i32],
      centroid: self.centroid.map(|(x, y)| [x, y]),
      depth_mm: self.depth_mm,
      model_label: self.model_label.clone(),
    }
  }
}

/// 可序列化的检测记录
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRecord {
  pub color: ColorLabel,
  pub hsv: Option<Hsv>,
  pub shape: String,
  pub mean_depth: f64,
  pub depth_std: f64,
  pub vertices: usize,
  pub bbox: [i32; 4],
  pub centroid: Option<[i32; 2]>,
  pub depth_mm: Option<f32>,
  pub model_label: Option<String>,
}

/// 单帧分析的中间结果
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
  pub detections: Vec<Detection>,
  pub conditioned_depth: GrayImage,
  pub edges: GrayImage,
}

/// 单帧输出：检测列表与三路诊断图像
#[derive(Debug, Clone)]
pub struct FrameOutput {
  pub detections: Vec<Detection>,
  pub overlay: RgbImage,
  pub depth_map: RgbImage,
  pub edges: GrayImage,
}

pub struct Pipeline<M = NoModel> {
  config: PipelineConfig,
  draw: Draw,
  model: M,
}

impl Pipeline<NoModel> {
  pub fn new(config: PipelineConfig) -> Result<Self, DrawError> {
    let draw = Draw::new(&config.overlay)?;
    Ok(Self {
      config,
      draw,
      model: NoModel,
    })
  }
}

impl<M: Model> Pipeline<M> {
  pub fn with_model<N: Model>(self, model: N) -> Pipeline<N> {
    Pipeline {
      config: self.config,
      draw: self.draw,
      model,
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  fn rng(&self) -> StdRng {
    match self.config.color.seed {
      Some(seed) => StdRng::seed_from_u64(seed),
      None => StdRng::from_entropy(),
    }
  }

  /// 运行深度预处理、边缘融合、区域提取与分类，不绘制叠加图
  pub fn analyze(&self, frame: &FramePair, depth_scale: f32) -> Result<FrameAnalysis, M::Error> {
    let conditioned_depth = depth::condition(frame.depth(), &self.config.depth);
    let edges = edge::fuse_edges(frame.color(), &conditioned_depth, &self.config.edge);
    let regions = extract_regions(&edges, &self.config.region);

    let mut rng = self.rng();
    let mut detections = Vec::new();
    for region in regions {
      let color = classify_color(frame.color(), &region, &self.config.color, &mut rng);
      if !color.label.is_accepted() {
        debug!("区域 {:?} 颜色 {}，跳过", region.bbox(), color.label);
        continue;
      }

      let shape = classify_shape(&region, frame.depth(), &self.config.shape);
      if shape.label().is_none() {
        debug!("区域 {:?} 深度样本不足，跳过", region.bbox());
        continue;
      }

      let centroid = region.centroid();
      let depth_mm = centroid.and_then(|(cx, cy)| {
        if cx < 0 || cy < 0 || cx as u32 >= frame.width() || cy as u32 >= frame.height() {
          return None;
        }
        let raw = frame.depth().get_pixel(cx as u32, cy as u32).0[0];
        Some(raw as f32 * depth_scale * 1000.0)
      });
      let model_label = self.model.classify(frame, &region)?;

      detections.push(Detection {
        region,
        color,
        shape,
        centroid,
        depth_mm,
        model_label,
      });
    }

    Ok(FrameAnalysis {
      detections,
      conditioned_depth,
      edges,
    })
  }

  /// 处理一帧，返回检测列表与叠加图
  pub fn process(&self, frame: &FramePair, depth_scale: f32) -> Result<FrameOutput, M::Error> {
    let analysis = self.analyze(frame, depth_scale)?;
    let overlay = self
      .draw
      .annotate(frame.color(), &analysis.edges, &analysis.detections);
    let depth_map = colorize_depth(&analysis.conditioned_depth);

    Ok(FrameOutput {
      detections: analysis.detections,
      overlay,
      depth_map,
      edges: analysis.edges,
    })
  }
}
