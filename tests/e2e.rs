mod common;

use std::{convert::Infallible, sync::atomic::AtomicBool};

use common::synthetic_frame::{SPHERE, SQUARE, scene, write_scene};
use image::{DynamicImage, Luma};
use url::Url;
use yanxing::{
  FromUrl,
  config::PipelineConfig,
  frame::{DepthImage, FramePair},
  input::{DirectorySequenceInput, Session},
  model::Model,
  output::DirectoryRecordOutput,
  pipeline::{
    Pipeline, depth,
    edge::fuse_edges,
    region::{Region, extract_regions},
  },
  task::ContinuousTask,
};

fn seeded_config() -> PipelineConfig {
  let mut config = PipelineConfig::default();
  config.color.seed = Some(7);
  config
}

#[test]
fn green_square_and_blue_sphere_are_detected() {
  let frame = scene();
  let pipeline = Pipeline::new(seeded_config()).unwrap();
  let output = pipeline.process(&frame, 0.001).unwrap();

  let labels: Vec<(String, String)> = output
    .detections
    .iter()
    .map(|d| (d.shape_label(), d.color.label.to_string()))
    .collect();
  assert_eq!(output.detections.len(), 2, "detections: {:?}", labels);

  let square = output
    .detections
    .iter()
    .find(|d| d.shape_label() == "square")
    .unwrap_or_else(|| panic!("no square in {:?}", labels));
  assert_eq!(square.color.label.to_string(), "green");

  let sphere = output
    .detections
    .iter()
    .find(|d| d.shape_label() == "sphere")
    .unwrap_or_else(|| panic!("no sphere in {:?}", labels));
  assert_eq!(sphere.color.label.to_string(), "blue");

  for detection in &output.detections {
    let depth_mm = detection.depth_mm.expect("centroid depth");
    assert!(
      (500.0..=9000.0).contains(&depth_mm),
      "depth {} mm out of range",
      depth_mm
    );
  }

  // 质心应落在目标中心附近
  let (sx, sy, side) = SQUARE;
  let (cx, cy) = square.centroid.unwrap();
  assert!((cx - (sx + side / 2) as i32).abs() <= 3);
  assert!((cy - (sy + side / 2) as i32).abs() <= 3);
  let (px, py, _) = SPHERE;
  let (cx, cy) = sphere.centroid.unwrap();
  assert!((cx - px as i32).abs() <= 3);
  assert!((cy - py as i32).abs() <= 3);

  assert_eq!(output.overlay.dimensions(), frame.color().dimensions());
  assert_eq!(output.depth_map.dimensions(), frame.color().dimensions());
  assert_eq!(output.edges.dimensions(), frame.color().dimensions());
}

fn regions_of(conditioned: &image::GrayImage, config: &PipelineConfig) -> Vec<Region> {
  let frame = scene();
  let edges = fuse_edges(frame.color(), conditioned, &config.edge);
  extract_regions(&edges, &config.region)
}

fn assert_regions_close(first: &[Region], second: &[Region], what: &str) {
  assert_eq!(first.len(), second.len(), "{}", what);
  for a in first {
    let matched = second.iter().any(|b| {
      let (ra, rb) = (a.contour_bbox(), b.contour_bbox());
      (ra.left() - rb.left()).abs() <= 3
        && (ra.top() - rb.top()).abs() <= 3
        && (ra.width() as i32 - rb.width() as i32).abs() <= 3
        && (ra.height() as i32 - rb.height() as i32).abs() <= 3
    });
    assert!(matched, "region {:?} moved after {}", a.contour_bbox(), what);
  }
}

#[test]
fn refiltering_keeps_regions_stable() {
  let config = PipelineConfig::default();
  let frame = scene();

  let once = depth::condition(frame.depth(), &config.depth);
  let as_depth = DepthImage::from_fn(once.width(), once.height(), |x, y| {
    Luma([once.get_pixel(x, y).0[0] as u16])
  });
  let twice = depth::condition(&as_depth, &config.depth);

  let first = regions_of(&once, &config);
  let second = regions_of(&twice, &config);
  assert!(!first.is_empty());
  assert_regions_close(&first, &second, "re-conditioning depth");
}

#[test]
fn refusing_edges_keeps_regions_stable() {
  let config = PipelineConfig::default();
  let frame = scene();

  let conditioned = depth::condition(frame.depth(), &config.depth);
  let fused = fuse_edges(frame.color(), &conditioned, &config.edge);
  // 已融合的掩码同时作为颜色与深度输入再融合一次
  let as_color = DynamicImage::ImageLuma8(fused.clone()).to_rgb8();
  let refused = fuse_edges(&as_color, &fused, &config.edge);

  let first = extract_regions(&fused, &config.region);
  let second = extract_regions(&refused, &config.region);
  assert!(!first.is_empty());
  assert_regions_close(&first, &second, "re-fusing edges");
}

#[test]
fn recorded_sequence_produces_json_records() {
  let input_dir = tempfile::tempdir().unwrap();
  write_scene(input_dir.path(), "0000");
  write_scene(input_dir.path(), "0001");

  let output_dir = tempfile::tempdir().unwrap();
  let input = DirectorySequenceInput::from_url(
    &Url::parse(&format!("folder://{}", input_dir.path().display())).unwrap(),
  )
  .unwrap();
  let output = DirectoryRecordOutput::from_url(
    &Url::parse(&format!("folder://{}", output_dir.path().display())).unwrap(),
  )
  .unwrap();

  let pipeline = Pipeline::new(seeded_config()).unwrap();
  let stop = AtomicBool::new(false);
  let processed = ContinuousTask::default()
    .run_with_signal(Session::new(input), &pipeline, &output, &stop)
    .unwrap();
  assert_eq!(processed, 2);

  let mut records = Vec::new();
  let mut pending = vec![output_dir.path().to_path_buf()];
  while let Some(dir) = pending.pop() {
    for entry in std::fs::read_dir(dir).unwrap() {
      let path = entry.unwrap().path();
      if path.is_dir() {
        pending.push(path);
      } else if path.extension().is_some_and(|e| e == "json") {
        records.push(path);
      }
    }
  }
  assert_eq!(records.len(), 2);

  let text = std::fs::read_to_string(&records[0]).unwrap();
  let value: serde_json::Value = serde_json::from_str(&text).unwrap();
  let detections = value.as_array().unwrap();
  assert_eq!(detections.len(), 2);
  for detection in detections {
    assert!(detection["color"].is_string());
    assert!(detection["shape"].is_string());
    assert_eq!(detection["bbox"].as_array().unwrap().len(), 4);
    assert!(detection["depth_mm"].is_number());
  }
}

struct SizeModel;

impl Model for SizeModel {
  type Error = Infallible;

  fn classify(&self, _frame: &FramePair, region: &Region) -> Result<Option<String>, Self::Error> {
    let label = if region.area() > 7000.0 { "large" } else { "small" };
    Ok(Some(label.to_string()))
  }
}

struct BrokenModel;

impl Model for BrokenModel {
  type Error = std::io::Error;

  fn classify(&self, _frame: &FramePair, _region: &Region) -> Result<Option<String>, Self::Error> {
    Err(std::io::Error::other("加速器不可用"))
  }
}

#[test]
fn model_labels_are_attached_without_changing_geometry() {
  let frame = scene();
  let plain = Pipeline::new(seeded_config()).unwrap();
  let labelled = Pipeline::new(seeded_config()).unwrap().with_model(SizeModel);

  let a = plain.analyze(&frame, 0.001).unwrap();
  let b = labelled.analyze(&frame, 0.001).unwrap();
  assert_eq!(a.detections.len(), b.detections.len());
  for (x, y) in a.detections.iter().zip(&b.detections) {
    assert_eq!(x.shape_label(), y.shape_label());
    assert_eq!(x.color.label, y.color.label);
    assert!(x.model_label.is_none());
    assert!(y.model_label.is_some());
  }
}

#[test]
fn model_errors_abort_the_frame() {
  let pipeline = Pipeline::new(seeded_config()).unwrap().with_model(BrokenModel);
  assert!(pipeline.process(&scene(), 0.001).is_err());
}
