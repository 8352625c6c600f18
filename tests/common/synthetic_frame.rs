use image::{Luma, Rgb, RgbImage};
use yanxing::frame::{DepthImage, FramePair};

pub const WIDTH: u32 = 640;
pub const HEIGHT: u32 = 480;

pub const BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

/// 平面绿色正方形：左上角坐标与边长（像素）
pub const SQUARE: (u32, u32, u32) = (100, 150, 80);
pub const SQUARE_DEPTH: u16 = 2000;

/// 蓝色球体：圆心与半径（像素）
pub const SPHERE: (u32, u32, u32) = (420, 240, 50);
/// 球体最近点与边缘处的深度
pub const SPHERE_NEAR: f64 = 1000.0;
pub const SPHERE_RIM: f64 = 9000.0;

fn in_square(x: u32, y: u32) -> bool {
  let (sx, sy, side) = SQUARE;
  x >= sx && x < sx + side && y >= sy && y < sy + side
}

/// 到球心的归一化距离，圆盘外为 `None`
fn sphere_rho(x: u32, y: u32) -> Option<f64> {
  let (cx, cy, r) = SPHERE;
  let dx = x as f64 - cx as f64;
  let dy = y as f64 - cy as f64;
  let rho = (dx * dx + dy * dy).sqrt() / r as f64;
  (rho <= 1.0).then_some(rho)
}

/// 黑色背景上的绿色正方形与蓝色圆盘
pub fn scene_color() -> RgbImage {
  RgbImage::from_fn(WIDTH, HEIGHT, |x, y| {
    if in_square(x, y) {
      GREEN
    } else if sphere_rho(x, y).is_some() {
      BLUE
    } else {
      BACKGROUND
    }
  })
}

/// 深度图：正方形为平面，圆盘按半球向相机凸起，背景无有效深度
pub fn scene_depth() -> DepthImage {
  DepthImage::from_fn(WIDTH, HEIGHT, |x, y| {
    if in_square(x, y) {
      Luma([SQUARE_DEPTH])
    } else if let Some(rho) = sphere_rho(x, y) {
      let bulge = (1.0 - rho * rho).sqrt();
      Luma([(SPHERE_RIM - (SPHERE_RIM - SPHERE_NEAR) * bulge).round() as u16])
    } else {
      Luma([0])
    }
  })
}

pub fn scene() -> FramePair {
  FramePair::new(scene_color(), scene_depth()).expect("scene channels are aligned")
}

/// 以 `<stem>-color.png` / `<stem>-depth.png` 写入目录
pub fn write_scene(dir: &std::path::Path, stem: &str) {
  scene_color()
    .save(dir.join(format!("{stem}-color.png")))
    .expect("write colour frame");
  scene_depth()
    .save(dir.join(format!("{stem}-depth.png")))
    .expect("write depth frame");
}
