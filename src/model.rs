// 该文件是 Yanxing （颜形） 项目的一部分。
// src/model.rs - 可插拔的区域识别模型
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

use crate::{frame::FramePair, pipeline::region::Region};

/// 对候选区域给出额外标签的模型
///
/// 几何/颜色分类始终执行；模型的输出只附加在检测结果上，
/// 便于之后接入学习型检测器而不改动流水线结构。
pub trait Model {
  type Error;

  fn classify(&self, frame: &FramePair, region: &Region) -> Result<Option<String>, Self::Error>;
}

/// 不做任何识别的空模型
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModel;

impl Model for NoModel {
  type Error = Infallible;

  fn classify(&self, _frame: &FramePair, _region: &Region) -> Result<Option<String>, Self::Error> {
    Ok(None)
  }
}

impl<M: Model + ?Sized> Model for Box<M> {
  type Error = M::Error;

  fn classify(&self, frame: &FramePair, region: &Region) -> Result<Option<String>, Self::Error> {
    (**self).classify(frame, region)
  }
}
