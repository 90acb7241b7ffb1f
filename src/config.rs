use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{ConfigCache, FileCache, MemoryCache};
use crate::error::{NacosError, Result};
use crate::logging::LoggingConfig;
use crate::retry::{ExponentialBackoffPolicy, FixedRetryPolicy, RetryPolicy};

pub const DEFAULT_SERVER_ADDR: &str = "http://localhost:8848/";

/// 指数退避的单次等待上限
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// 客户端配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_addr: String,
    /// 空字符串表示默认命名空间
    pub namespace_id: String,
    pub request_timeout_ms: u64,
    /// 连接失败时的重试次数
    pub http_retries: usize,
    pub retry: RetryStrategy,
    /// 固定策略的间隔，指数策略的初始间隔
    pub retry_delay_ms: u64,
    pub poll_timeout_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            namespace_id: String::new(),
            request_timeout_ms: 60_000,
            http_retries: 3,
            retry: RetryStrategy::default(),
            retry_delay_ms: 100,
            poll_timeout_ms: 30_000,
            heartbeat_interval_ms: 1_000,
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// 连接失败的重试方式
///
/// TOML 中写作 `retry = "fixed"` 或 `retry = "exponential"`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    #[default]
    Fixed,
    Exponential,
}

/// 配置缓存后端
///
/// TOML 中写作 `cache = "memory"` 或 `cache = { file = "/path/cache.json" }`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheConfig {
    #[default]
    Memory,
    File(PathBuf),
}

impl CacheConfig {
    pub fn build(&self) -> Result<Arc<dyn ConfigCache>> {
        let cache: Arc<dyn ConfigCache> = match self {
            CacheConfig::Memory => Arc::new(MemoryCache::new()),
            CacheConfig::File(path) => Arc::new(FileCache::new(path)?),
        };
        Ok(cache)
    }
}

impl ClientConfig {
    pub fn new(server_addr: impl Into<String>) -> Self {
        Self {
            server_addr: server_addr.into(),
            ..Self::default()
        }
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            NacosError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NacosError::Config(format!("invalid config: {}", e)))
    }

    /// 默认值叠加环境变量
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// 用 `lookup` 提供的 `NACOS_*` 变量覆盖当前配置
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("NACOS_SERVER_ADDR") {
            self.server_addr = addr;
        }
        if let Some(namespace) = lookup("NACOS_NAMESPACE") {
            self.namespace_id = namespace;
        }
        if let Some(timeout) = lookup("NACOS_POLL_TIMEOUT_MS") {
            self.poll_timeout_ms = timeout.parse().map_err(|_| {
                NacosError::Config(format!("NACOS_POLL_TIMEOUT_MS is not a number: {}", timeout))
            })?;
        }
        if let Some(path) = lookup("NACOS_CACHE_FILE") {
            self.cache = CacheConfig::File(PathBuf::from(path));
        }
        if let Some(level) = lookup("NACOS_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(NacosError::Config("server_addr must not be empty".into()));
        }
        if self.poll_timeout_ms == 0 {
            return Err(NacosError::Config("poll_timeout_ms must be positive".into()));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(NacosError::Config("heartbeat_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// 传输层使用的重试策略
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        let delay = Duration::from_millis(self.retry_delay_ms);
        match self.retry {
            RetryStrategy::Fixed => Arc::new(FixedRetryPolicy::new(self.http_retries, delay)),
            RetryStrategy::Exponential => Arc::new(ExponentialBackoffPolicy::new(
                self.http_retries,
                delay,
                MAX_RETRY_DELAY.max(delay),
            )),
        }
    }
}
