//! 配置监听
//!
//! 每个订阅一个后台循环，状态流转：
//!
//! ```text
//! Idle -> Polling -> { Unchanged | Changed | Failed } -> Polling -> ... -> Cancelled
//! ```
//!
//! - Polling：携带当前指纹发起长轮询，服务端最多挂起 `poll_timeout`
//! - Unchanged：响应为空，立即重新轮询
//! - Changed：重新拉取内容、更新指纹、写缓存、派发回调
//! - Failed：记录日志，退避 1 秒后重试；循环不会因为错误自行退出
//! - Cancelled：每轮开始时检查，并与长轮询、拉取、退避竞争；退出前等待尚未完成的异步回调

use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ConfigService;
use super::key::{ConfigSnapshot, SubscriptionKey, fingerprint};
use crate::error::Result;
use crate::runtime::{CancelHandle, ExecutionMode, LoopResult, spawn_cancellable};

/// 默认长轮询超时
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(30_000);

/// 失败后的固定退避时间
pub const FAILURE_BACKOFF: Duration = Duration::from_secs(1);

type SyncFn = dyn Fn(String) + Send + Sync;
type AsyncFn = dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync;

/// 配置变更回调
///
/// 异步回调会被 spawn 到循环所在的运行时上，循环不等待它完成就继续轮询。
/// 循环结束时会等待已派发的异步回调全部完成，`join` 返回后不再有回调在执行；
/// `ExecutionMode::Thread` 下回调运行在监听线程自己的运行时上，同样如此。
#[derive(Clone)]
pub enum ConfigCallback {
    Sync(Arc<SyncFn>),
    Async(Arc<AsyncFn>),
}

impl ConfigCallback {
    /// 同步回调，在监听循环内直接执行
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        ConfigCallback::Sync(Arc::new(f))
    }

    /// 异步回调
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        ConfigCallback::Async(Arc::new(move |content| Box::pin(f(content))))
    }

    fn dispatch(&self, content: String, pending: &mut JoinSet<()>) {
        match self {
            ConfigCallback::Sync(f) => f(content),
            ConfigCallback::Async(f) => {
                pending.spawn(f(content));
            }
        }
    }
}

impl std::fmt::Debug for ConfigCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigCallback::Sync(_) => f.write_str("ConfigCallback::Sync"),
            ConfigCallback::Async(_) => f.write_str("ConfigCallback::Async"),
        }
    }
}

/// 订阅选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// 服务端挂起长轮询的最长时间
    pub poll_timeout: Duration,
    pub mode: ExecutionMode,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            mode: ExecutionMode::Task,
        }
    }
}

impl SubscribeOptions {
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

impl ConfigService {
    /// 使用客户端默认长轮询超时订阅配置
    pub fn subscribe(
        &self,
        key: SubscriptionKey,
        callback: Option<ConfigCallback>,
    ) -> Result<CancelHandle> {
        let options = SubscribeOptions::default().with_poll_timeout(self.poll_timeout);
        self.subscribe_with_options(key, options, callback)
    }

    /// 订阅配置变更
    ///
    /// 初始指纹取自缓存中的内容；若希望只收到订阅之后的变更，
    /// 先用同一缓存调用一次 [`ConfigService::get`]。
    pub fn subscribe_with_options(
        &self,
        key: SubscriptionKey,
        options: SubscribeOptions,
        callback: Option<ConfigCallback>,
    ) -> Result<CancelHandle> {
        let service = self.clone();
        let name = format!("nacos-watch-{}", key);
        info!(
            data_id = %key.data_id,
            group = %key.group,
            tenant = %key.tenant,
            poll_timeout_ms = options.poll_timeout.as_millis() as u64,
            "Subscribing to config"
        );
        spawn_cancellable(name, options.mode, move |token| {
            watch_loop(service, key, options.poll_timeout, callback, token)
        })
    }
}

async fn watch_loop(
    service: ConfigService,
    key: SubscriptionKey,
    poll_timeout: Duration,
    callback: Option<ConfigCallback>,
    token: CancellationToken,
) -> LoopResult {
    let cache_key = key.cache_key();
    let mut last_md5 = match service.cache.get(&cache_key) {
        Ok(cached) => fingerprint(cached.as_deref().unwrap_or_default()),
        Err(e) => {
            warn!(key = %cache_key, error = %e, "Failed to read cached config");
            String::new()
        }
    };
    let mut pending = JoinSet::new();

    while !token.is_cancelled() {
        while pending.try_join_next().is_some() {}

        let polled = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = service.listen(&key, &last_md5, poll_timeout) => result,
        };

        let failure = match polled {
            Ok(false) => continue,
            Ok(true) => {
                info!(data_id = %key.data_id, group = %key.group, "Configuration update detected");
                let fetched = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = service.fetch(&key) => result,
                };
                match fetched {
                    Ok(content) => {
                        let snapshot = ConfigSnapshot::new(key.clone(), content);
                        last_md5 = snapshot.content_hash.clone();
                        if let Err(e) = service.cache.set(&cache_key, &snapshot.content) {
                            warn!(key = %cache_key, error = %e, "Failed to cache config");
                        }
                        if token.is_cancelled() {
                            break;
                        }
                        if let Some(callback) = &callback {
                            callback.dispatch(snapshot.content, &mut pending);
                        }
                        continue;
                    }
                    Err(e) if e.is_not_found() => {
                        // 配置被删除：从空指纹开始等待重新发布
                        warn!(data_id = %key.data_id, group = %key.group, "Config was deleted");
                        last_md5.clear();
                        continue;
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        error!(
            data_id = %key.data_id,
            group = %key.group,
            category = %failure.code().category(),
            error = %failure,
            "Config watch cycle failed"
        );
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(FAILURE_BACKOFF) => {}
        }
    }

    while let Some(joined) = pending.join_next().await {
        if let Err(e) = joined {
            warn!(data_id = %key.data_id, group = %key.group, error = %e, "Config callback failed");
        }
    }
    debug!(data_id = %key.data_id, group = %key.group, "Config watch stopped");
    Ok(())
}
