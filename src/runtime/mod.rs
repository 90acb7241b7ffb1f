//! 后台任务运行时
//!
//! 提供可取消后台循环的统一启动方式，见 [`task`]。

pub mod task;

pub use task::{CancelHandle, ExecutionMode, LoopResult, spawn_cancellable};
