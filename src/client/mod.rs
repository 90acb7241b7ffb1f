//! 客户端模块
//!
//! 提供客户端构建器，以及组合配置服务与实例服务的 [`NacosClient`]。

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::ConfigCache;
use crate::config::{CacheConfig, ClientConfig, RetryStrategy};
use crate::configs::{ConfigService, SubscriptionKey};
use crate::error::Result;
use crate::naming::NamingService;
use crate::transport::{HttpInvoker, Invoker};

/// 客户端构建器
pub struct ClientBuilder {
    config: ClientConfig,
    invoker: Option<Arc<dyn Invoker>>,
    cache: Option<Arc<dyn ConfigCache>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::from_config(ClientConfig::default())
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            invoker: None,
            cache: None,
        }
    }

    pub fn server_addr(mut self, server_addr: impl Into<String>) -> Self {
        self.config.server_addr = server_addr.into();
        self
    }

    pub fn namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.config.namespace_id = namespace_id.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.config.poll_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn retry(mut self, strategy: RetryStrategy) -> Self {
        self.config.retry = strategy;
        self
    }

    pub fn cache_config(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    /// 使用已构建好的缓存，忽略 `cache_config`
    pub fn cache(mut self, cache: Arc<dyn ConfigCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 替换 HTTP 传输层
    pub fn invoker(mut self, invoker: Arc<dyn Invoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn build(self) -> Result<NacosClient> {
        self.config.validate()?;
        let invoker: Arc<dyn Invoker> = match self.invoker {
            Some(invoker) => invoker,
            None => Arc::new(HttpInvoker::with_retry_policy(
                self.config.server_addr.clone(),
                self.config.request_timeout(),
                self.config.retry_policy(),
            )?),
        };
        let cache = match self.cache {
            Some(cache) => cache,
            None => self.config.cache.build()?,
        };

        let configs = ConfigService::new(invoker.clone(), cache)
            .with_poll_timeout(self.config.poll_timeout());
        let naming = NamingService::new(invoker)
            .with_default_namespace(self.config.namespace_id.clone())
            .with_heartbeat_interval(self.config.heartbeat_interval());

        info!(
            server_addr = %self.config.server_addr,
            namespace = %self.config.namespace_id,
            "Nacos client created"
        );
        Ok(NacosClient {
            config: self.config,
            configs,
            naming,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Nacos 客户端
#[derive(Debug, Clone)]
pub struct NacosClient {
    config: ClientConfig,
    configs: ConfigService,
    naming: NamingService,
}

impl NacosClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        ClientBuilder::from_config(config).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn configs(&self) -> &ConfigService {
        &self.configs
    }

    pub fn naming(&self) -> &NamingService {
        &self.naming
    }

    /// 以客户端命名空间作为 tenant 的订阅键
    pub fn key(&self, data_id: impl Into<String>, group: impl Into<String>) -> SubscriptionKey {
        SubscriptionKey::new(data_id, group).with_tenant(self.config.namespace_id.clone())
    }
}
