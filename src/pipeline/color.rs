// 该文件是 Yanxing （颜形） 项目的一部分。
// src/pipeline/color.rs - 区域主色分类
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

use std::fmt;

use image::{Rgb, RgbImage};
use rand::{Rng, seq::index::sample};
use serde::Serialize;

use crate::{config::ColorConfig, pipeline::region::Region};

/// HSV 颜色，H 取 0-180（半圆周定点表示），S、V 取 0-255
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hsv {
  pub h: f32,
  pub s: f32,
  pub v: f32,
}

impl Hsv {
  pub const fn new(h: f32, s: f32, v: f32) -> Self {
    Self { h, s, v }
  }

  pub fn from_rgb(Rgb([r, g, b]): Rgb<u8>) -> Self {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max > 0.0 { 255.0 * diff / max } else { 0.0 };
    let h_deg = if diff <= 0.0 {
      0.0
    } else if max == r {
      60.0 * (g - b) / diff
    } else if max == g {
      120.0 + 60.0 * (b - r) / diff
    } else {
      240.0 + 60.0 * (r - g) / diff
    };
    // 半度色相取整后回绕到 [0, 180)，359.5° 以上归为 0
    let mut h = (h_deg / 2.0).round();
    if h < 0.0 {
      h += 180.0;
    }
    if h >= 180.0 {
      h -= 180.0;
    }

    Self::new(h.abs(), s.round(), max)
  }

  pub fn to_rgb(self) -> Rgb<u8> {
    let h = (self.h * 2.0) % 360.0;
    let s = self.s / 255.0;
    let v = self.v / 255.0;

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
      (c, x, 0.0)
    } else if h < 120.0 {
      (x, c, 0.0)
    } else if h < 180.0 {
      (0.0, c, x)
    } else if h < 240.0 {
      (0.0, x, c)
    } else if h < 300.0 {
      (x, 0.0, c)
    } else {
      (c, 0.0, x)
    };

    Rgb([
      ((r + m) * 255.0).round() as u8,
      ((g + m) * 255.0).round() as u8,
      ((b + m) * 255.0).round() as u8,
    ])
  }

  fn as_array(self) -> [f32; 3] {
    [self.h, self.s, self.v]
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorLabel {
  DeepRed,
  Red,
  Orange,
  Yellow,
  Green,
  Blue,
  Purple,
  Other,
  Unknown,
}

impl ColorLabel {
  /// 能进入最终检测结果的颜色
  pub fn is_accepted(self) -> bool {
    matches!(
      self,
      ColorLabel::Blue
        | ColorLabel::Green
        | ColorLabel::Yellow
        | ColorLabel::Orange
        | ColorLabel::DeepRed
    )
  }

  /// 叠加图中的轮廓颜色（RGB）
  pub fn outline(self) -> Rgb<u8> {
    match self {
      ColorLabel::Blue => Rgb([0, 0, 255]),
      ColorLabel::Green => Rgb([0, 255, 0]),
      ColorLabel::Yellow => Rgb([255, 255, 0]),
      ColorLabel::Orange => Rgb([255, 165, 0]),
      ColorLabel::DeepRed => Rgb([197, 44, 46]),
      _ => Rgb([0, 255, 0]),
    }
  }
}

impl fmt::Display for ColorLabel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ColorLabel::DeepRed => "deep-red",
      ColorLabel::Red => "red",
      ColorLabel::Orange => "orange",
      ColorLabel::Yellow => "yellow",
      ColorLabel::Green => "green",
      ColorLabel::Blue => "blue",
      ColorLabel::Purple => "purple",
      ColorLabel::Other => "other",
      ColorLabel::Unknown => "unknown",
    };
    f.write_str(name)
  }
}

/// 一条颜色规则：色相落在任一区间内，且饱和度、亮度严格大于下限
#[derive(Debug, Clone, Copy)]
pub struct ColorRule {
  pub label: ColorLabel,
  pub hue: &'static [(f32, f32)],
  pub saturation_above: f32,
  pub value_above: f32,
}

impl ColorRule {
  pub fn matches(&self, hsv: Hsv) -> bool {
    self.hue.iter().any(|&(lo, hi)| lo <= hsv.h && hsv.h <= hi)
      && hsv.s > self.saturation_above
      && hsv.v > self.value_above
  }
}

/// 饱和度或亮度低于该值时色相不可靠
pub const LOW_CHROMA_FLOOR: f32 = 50.0;

/// 按优先级排列的颜色规则表
pub const COLOR_RULES: &[ColorRule] = &[
  ColorRule {
    label: ColorLabel::DeepRed,
    hue: &[(0.0, 10.0)],
    saturation_above: 150.0,
    value_above: 100.0,
  },
  ColorRule {
    label: ColorLabel::Red,
    hue: &[(0.0, 10.0), (170.0, 180.0)],
    saturation_above: 100.0,
    value_above: 0.0,
  },
  ColorRule {
    label: ColorLabel::Orange,
    hue: &[(11.0, 20.0)],
    saturation_above: 100.0,
    value_above: 0.0,
  },
  ColorRule {
    label: ColorLabel::Yellow,
    hue: &[(21.0, 35.0)],
    saturation_above: 50.0,
    value_above: 0.0,
  },
  ColorRule {
    label: ColorLabel::Green,
    hue: &[(36.0, 85.0)],
    saturation_above: 50.0,
    value_above: 0.0,
  },
  ColorRule {
    label: ColorLabel::Blue,
    hue: &[(86.0, 125.0)],
    saturation_above: 50.0,
    value_above: 0.0,
  },
  ColorRule {
    label: ColorLabel::Purple,
    hue: &[(126.0, 140.0)],
    saturation_above: 50.0,
    value_above: 0.0,
  },
];

/// 按规则表为代表色定类
pub fn classify_hsv(hsv: Hsv) -> ColorLabel {
  if hsv.s < LOW_CHROMA_FLOOR || hsv.v < LOW_CHROMA_FLOOR {
    return ColorLabel::Other;
  }
  COLOR_RULES
    .iter()
    .find(|rule| rule.matches(hsv))
    .map(|rule| rule.label)
    .unwrap_or(ColorLabel::Other)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorResult {
  pub label: ColorLabel,
  /// 代表色，样本不足时为 `None`
  pub hsv: Option<Hsv>,
  /// 用于显示的 RGB 代表色，样本不足时为黑色
  #[serde(skip)]
  pub display: Rgb<u8>,
}

impl ColorResult {
  pub fn unknown() -> Self {
    Self {
      label: ColorLabel::Unknown,
      hsv: None,
      display: Rgb([0, 0, 0]),
    }
  }
}

fn distance2(a: &[f32; 3], b: &[f32; 3]) -> f32 {
  a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// 一次 Lloyd 迭代聚类的结果
struct Clustering {
  centers: Vec<[f32; 3]>,
  sizes: Vec<usize>,
  inertia: f32,
}

fn lloyd<R: Rng>(samples: &[[f32; 3]], k: usize, max_iterations: usize, rng: &mut R) -> Clustering {
  let mut centers: Vec<[f32; 3]> = sample(rng, samples.len(), k)
    .into_iter()
    .map(|i| samples[i])
    .collect();
  let mut assignment = vec![usize::MAX; samples.len()];

  for _ in 0..max_iterations {
    let mut changed = false;
    for (slot, s) in assignment.iter_mut().zip(samples) {
      let nearest = (0..k)
        .min_by(|&a, &b| distance2(s, &centers[a]).total_cmp(&distance2(s, &centers[b])))
        .unwrap_or(0);
      if *slot != nearest {
        *slot = nearest;
        changed = true;
      }
    }
    if !changed {
      break;
    }

    let mut sums = vec![[0.0f64; 3]; k];
    let mut counts = vec![0usize; k];
    for (&c, s) in assignment.iter().zip(samples) {
      for d in 0..3 {
        sums[c][d] += s[d] as f64;
      }
      counts[c] += 1;
    }
    for c in 0..k {
      // 空簇保留原中心
      if counts[c] > 0 {
        let n = counts[c] as f64;
        centers[c] = [
          (sums[c][0] / n) as f32,
          (sums[c][1] / n) as f32,
          (sums[c][2] / n) as f32,
        ];
      }
    }
  }

  let mut sizes = vec![0usize; k];
  let mut inertia = 0.0;
  for (&c, s) in assignment.iter().zip(samples) {
    sizes[c] += 1;
    inertia += distance2(s, &centers[c]);
  }
  Clustering {
    centers,
    sizes,
    inertia,
  }
}

/// 多次随机重启的 k 均值聚类，返回最大簇的中心
///
/// 样本数少于 `config.min_samples` 时返回 `None`。
pub fn dominant_color<R: Rng>(samples: &[Hsv], config: &ColorConfig, rng: &mut R) -> Option<Hsv> {
  if samples.len() < config.min_samples || samples.is_empty() {
    return None;
  }
  let points: Vec<[f32; 3]> = samples.iter().map(|s| s.as_array()).collect();
  let k = config.clusters.clamp(1, points.len());

  let best = (0..config.restarts.max(1))
    .map(|_| lloyd(&points, k, config.max_iterations, rng))
    .min_by(|a, b| a.inertia.total_cmp(&b.inertia))?;

  let largest = (0..k).max_by_key(|&c| best.sizes[c])?;
  let [h, s, v] = best.centers[largest];
  // 与 8 位定点表示一致，截断为整数
  Some(Hsv::new(h.trunc(), s.trunc(), v.trunc()))
}

/// 区域主色分类
pub fn classify_color<R: Rng>(
  color: &RgbImage,
  region: &Region,
  config: &ColorConfig,
  rng: &mut R,
) -> ColorResult {
  let samples: Vec<Hsv> = region
    .inside_pixels()
    .map(|(x, y)| Hsv::from_rgb(*color.get_pixel(x, y)))
    .collect();

  match dominant_color(&samples, config, rng) {
    Some(hsv) => ColorResult {
      label: classify_hsv(hsv),
      hsv: Some(hsv),
      display: hsv.to_rgb(),
    },
    None => ColorResult::unknown(),
  }
}
