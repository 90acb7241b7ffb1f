//! 后台任务定义
//!
//! 配置监听和心跳都是"启动后一直运行、直到被取消"的后台循环。循环体只写一次，
//! 由 [`ExecutionMode`] 决定它跑在哪里：
//! - [`ExecutionMode::Task`]：当前 tokio 运行时上的一个任务
//! - [`ExecutionMode::Thread`]：独立 OS 线程，线程内自带 current-thread 运行时
//!
//! 两种模式共用同一个 [`CancellationToken`]，循环在每轮开始时检查取消，
//! 并在阻塞调用（长轮询、心跳、sleep）上与取消信号竞争。

use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::{NacosError, Result};

/// 后台循环的最终结果
pub type LoopResult = Result<()>;

/// 后台循环的执行方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// 在当前 tokio 运行时上 spawn 一个任务（默认）
    #[default]
    Task,
    /// 每个后台循环独占一个线程
    Thread,
}

/// 可取消的后台循环句柄
///
/// `cancel()` 幂等且立即返回，只发出终止请求，不等待循环退出；
/// 需要等待退出或获取循环的错误时使用 [`CancelHandle::join`]。
/// 丢弃句柄不会停止循环。
#[derive(Debug)]
pub struct CancelHandle {
    name: String,
    token: CancellationToken,
    done_rx: Mutex<Option<oneshot::Receiver<LoopResult>>>,
}

impl CancelHandle {
    /// 任务名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 请求终止后台循环
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(task = %self.name, "Cancellation requested");
        }
        self.token.cancel();
    }

    /// 是否已请求终止
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 取消令牌的克隆，可用于联动其它任务
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 等待后台循环结束并取回其结果
    ///
    /// 只有第一次调用能拿到结果，之后的调用直接返回 `Ok(())`。
    pub async fn join(&self) -> LoopResult {
        let rx = self.done_rx.lock().take();
        match rx {
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(NacosError::Runtime(format!(
                    "background task '{}' aborted",
                    self.name
                )))
            }),
            None => Ok(()),
        }
    }
}

/// 启动一个可取消的后台循环
///
/// `body` 接收取消令牌并返回循环的 future；循环结束时结果会送给 [`CancelHandle::join`]。
pub fn spawn_cancellable<F, Fut>(
    name: impl Into<String>,
    mode: ExecutionMode,
    body: F,
) -> Result<CancelHandle>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = LoopResult> + Send + 'static,
{
    let name = name.into();
    let token = CancellationToken::new();
    let (done_tx, done_rx) = oneshot::channel();
    let loop_token = token.clone();
    let task_name = name.clone();

    match mode {
        ExecutionMode::Task => {
            let handle = tokio::runtime::Handle::try_current().map_err(|e| {
                NacosError::Runtime(format!("task mode requires a tokio runtime: {}", e))
            })?;
            handle.spawn(async move {
                let result = body(loop_token).await;
                report(&task_name, &result);
                let _ = done_tx.send(result);
            });
        }
        ExecutionMode::Thread => {
            std::thread::Builder::new()
                .name(name.clone())
                .spawn(move || {
                    let result = match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(rt) => rt.block_on(body(loop_token)),
                        Err(e) => Err(NacosError::Runtime(format!(
                            "failed to build thread runtime: {}",
                            e
                        ))),
                    };
                    report(&task_name, &result);
                    let _ = done_tx.send(result);
                })
                .map_err(|e| NacosError::Runtime(format!("failed to spawn thread: {}", e)))?;
        }
    }

    Ok(CancelHandle {
        name,
        token,
        done_rx: Mutex::new(Some(done_rx)),
    })
}

fn report(name: &str, result: &LoopResult) {
    match result {
        Ok(()) => debug!(task = %name, "Background task finished"),
        Err(e) => error!(task = %name, error = %e, "Background task terminated with error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn wait_for_cancel(token: CancellationToken) -> LoopResult {
        token.cancelled().await;
        Ok(())
    }

    #[tokio::test]
    async fn cancel_is_idempotent_in_task_mode() {
        let handle = spawn_cancellable("idle", ExecutionMode::Task, wait_for_cancel).unwrap();
        assert!(!handle.is_cancelled());

        handle.cancel();
        handle.cancel();

        assert!(handle.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("task did not stop")
            .unwrap();
        // 第二次 join 不再有结果
        handle.join().await.unwrap();
    }

    #[tokio::test]
    async fn thread_mode_reports_loop_error() {
        let handle = spawn_cancellable("failing", ExecutionMode::Thread, |_token| async {
            Err(NacosError::rejected(500, "boom"))
        })
        .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("thread did not finish");
        assert_eq!(result, Err(NacosError::rejected(500, "boom")));
    }

    #[test]
    fn task_mode_outside_runtime_is_an_error() {
        let result = spawn_cancellable("orphan", ExecutionMode::Task, wait_for_cancel);
        assert!(matches!(result, Err(NacosError::Runtime(_))));
    }
}
