// 该文件是 Yanxing （颜形） 项目的一部分。
// src/task.rs - 帧循环任务
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
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{Receiver, channel},
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{error, info, warn};

use crate::{
  frame::FramePair,
  input::{FrameSource, Session},
  model::Model,
  output::Render,
  pipeline::Pipeline,
};

/// 中断后强制退出前的等待时间
const FORCE_EXIT_AFTER: Duration = Duration::from_secs(30);

/// 每次迭代查询一次的停止信号
pub trait StopSignal {
  fn should_stop(&self) -> bool;
}

impl StopSignal for AtomicBool {
  fn should_stop(&self) -> bool {
    self.load(Ordering::SeqCst)
  }
}

impl<S: StopSignal + ?Sized> StopSignal for Arc<S> {
  fn should_stop(&self) -> bool {
    (**self).should_stop()
  }
}

/// Ctrl-C 停止信号；收到中断后若 30 秒内未退出则强制结束进程
pub struct CtrlCSignal {
  rx: Receiver<()>,
  stopped: AtomicBool,
}

impl CtrlCSignal {
  pub fn install() -> Result<Self, ctrlc::Error> {
    let (tx, rx) = channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_AFTER);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    Ok(Self {
      rx,
      stopped: AtomicBool::new(false),
    })
  }
}

impl StopSignal for CtrlCSignal {
  fn should_stop(&self) -> bool {
    if self.rx.try_recv().is_ok() {
      self.stopped.store(true, Ordering::SeqCst);
    }
    self.stopped.load(Ordering::SeqCst)
  }
}

pub trait Task<S: FrameSource, M, O>: Sized {
  type Error;
  fn run_task(self, input: Session<S>, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error>;
}

/// 处理一帧并交给输出，返回检测数量
fn process_frame<M, O>(
  pipeline: &Pipeline<M>,
  output: &O,
  frame: &FramePair,
  depth_scale: f32,
) -> anyhow::Result<usize>
where
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  let now = Instant::now();
  let result = pipeline.process(frame, depth_scale)?;
  let elapsed_a = now.elapsed();
  output.render_result(&result)?;
  let elapsed_b = now.elapsed();
  info!(
    "检测到 {} 个目标，耗时: {:.2?} / {:.2?}",
    result.detections.len(),
    elapsed_a,
    elapsed_b
  );
  Ok(result.detections.len())
}

/// 处理第一帧可用的帧对后退出
pub struct OneShotTask;

impl<S, M, O> Task<S, M, O> for OneShotTask
where
  S: FrameSource,
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: Session<S>, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = loop {
      match input.next() {
        Ok(Some(frame)) => break frame,
        Ok(None) => anyhow::bail!("没有输入帧"),
        Err(e) if e.is_transient() => warn!("跳过本帧: {}", e),
        Err(e) => {
          error!("输入源故障: {}", e);
          input.close();
          return Err(e.into());
        }
      }
    };
    info!("输入帧获取成功，开始处理...");
    let depth_scale = input.depth_scale();
    let result = process_frame(&pipeline, &output, &frame, depth_scale);
    input.close();
    result.map(|_| ())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 在给定停止信号下运行帧循环
  ///
  /// 循环在数据流结束、达到帧数上限或收到停止信号时正常返回；
  /// 输入源故障时返回错误。任何情况下会话都会被释放。
  pub fn run_with_signal<S, M, O>(
    &self,
    mut input: Session<S>,
    pipeline: &Pipeline<M>,
    output: &O,
    stop: &dyn StopSignal,
  ) -> anyhow::Result<usize>
  where
    S: FrameSource,
    M: Model,
    M::Error: std::error::Error + Send + Sync + 'static,
    O: Render,
    O::Error: std::error::Error + Send + Sync + 'static,
  {
    info!("开始任务...");
    let depth_scale = input.depth_scale();
    let mut frame_index = 0;

    loop {
      if stop.should_stop() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      let frame = match input.next() {
        Ok(Some(frame)) => frame,
        Ok(None) => {
          info!("输入结束");
          break;
        }
        Err(e) if e.is_transient() => {
          warn!("跳过本帧: {}", e);
          continue;
        }
        Err(e) => {
          error!("输入源故障: {}", e);
          input.close();
          return Err(e.into());
        }
      };

      frame_index += 1;
      info!("处理第 {} 帧图像", frame_index);
      process_frame(pipeline, output, &frame, depth_scale)?;

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
    }

    input.close();
    info!("任务完成，退出");
    Ok(frame_index)
  }
}

impl<S, M, O> Task<S, M, O> for ContinuousTask
where
  S: FrameSource,
  M: Model,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: Session<S>, pipeline: Pipeline<M>, output: O) -> Result<(), Self::Error> {
    let stop = CtrlCSignal::install()?;
    self.run_with_signal(input, &pipeline, &output, &stop)?;
    Ok(())
  }
}
