//! 实例心跳
//!
//! 每个注册实例一个后台循环：先 sleep 一个间隔，再发送一次心跳。
//! 失败只记录日志并等待下一拍；`skip_errors = false` 时循环以该错误结束，
//! 可通过 [`CancelHandle::join`] 取回。

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::NamingService;
use super::instance::InstanceSpec;
use crate::error::Result;
use crate::runtime::{CancelHandle, ExecutionMode, LoopResult, spawn_cancellable};

/// 默认心跳间隔
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1_000);

/// 心跳选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatOptions {
    pub interval: Duration,
    /// 心跳失败后是否继续
    pub skip_errors: bool,
    pub mode: ExecutionMode,
}

impl Default for HeartbeatOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            skip_errors: true,
            mode: ExecutionMode::Task,
        }
    }
}

impl HeartbeatOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_skip_errors(mut self, skip_errors: bool) -> Self {
        self.skip_errors = skip_errors;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

impl NamingService {
    /// 使用客户端默认间隔启动心跳
    pub fn heartbeat(&self, instance: InstanceSpec) -> Result<CancelHandle> {
        let options = HeartbeatOptions::default().with_interval(self.heartbeat_interval);
        self.heartbeat_with_options(instance, options)
    }

    /// 启动心跳循环
    pub fn heartbeat_with_options(
        &self,
        instance: InstanceSpec,
        options: HeartbeatOptions,
    ) -> Result<CancelHandle> {
        let naming = self.clone();
        let name = format!("nacos-beat-{}-{}:{}", instance.service_name, instance.ip, instance.port);
        info!(
            service = %instance.service_name,
            address = %format!("{}:{}", instance.ip, instance.port),
            interval_ms = options.interval.as_millis() as u64,
            "Starting heartbeat"
        );
        spawn_cancellable(name, options.mode, move |token| {
            heartbeat_loop(naming, instance, options, token)
        })
    }
}

async fn heartbeat_loop(
    naming: NamingService,
    instance: InstanceSpec,
    options: HeartbeatOptions,
    token: CancellationToken,
) -> LoopResult {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(options.interval) => {}
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = naming.beat(&instance) => result,
        };

        match result {
            Ok(resp) => {
                debug!(
                    service = %instance.service_name,
                    ip = %instance.ip,
                    port = instance.port,
                    code = ?resp.code,
                    "Heartbeat sent"
                );
            }
            Err(e) => {
                error!(
                    service = %instance.service_name,
                    ip = %instance.ip,
                    port = instance.port,
                    category = %e.code().category(),
                    error = %e,
                    "Heartbeat failed"
                );
                if !options.skip_errors {
                    return Err(e);
                }
            }
        }
    }

    info!(
        service = %instance.service_name,
        ip = %instance.ip,
        port = instance.port,
        "Heartbeat stopped"
    );
    Ok(())
}
