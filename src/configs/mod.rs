//! 配置中心模块
//!
//! 显式的配置操作集合：读取（带缓存回退）、发布、删除、长轮询与订阅。

pub mod format;
pub mod key;
pub mod watcher;

pub use format::ContentFormat;
pub use key::{ConfigSnapshot, DEFAULT_GROUP, SubscriptionKey, config_key, fingerprint};
pub use watcher::{ConfigCallback, DEFAULT_POLL_TIMEOUT, SubscribeOptions};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::cache::ConfigCache;
use crate::error::Result;
use crate::transport::{Invoker, RemoteRequest};

const CONFIG_PATH: &str = "/nacos/v1/cs/configs";
const LISTENER_PATH: &str = "/nacos/v1/cs/configs/listener";

/// 长轮询在服务端超时之外额外等待的时间
const POLL_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

const FIELD_SEPARATOR: char = '\u{2}';
const LINE_SEPARATOR: char = '\u{1}';

/// 拼接 `Listening-Configs` 参数：`dataId ^B group ^B md5 ^B tenant ^A`
pub fn listening_configs(key: &SubscriptionKey, md5: &str) -> String {
    format!(
        "{}{sep}{}{sep}{}{sep}{}{LINE_SEPARATOR}",
        key.data_id,
        key.group,
        md5,
        key.tenant,
        sep = FIELD_SEPARATOR,
    )
}

/// 配置服务
#[derive(Clone)]
pub struct ConfigService {
    invoker: Arc<dyn Invoker>,
    pub(crate) cache: Arc<dyn ConfigCache>,
    pub(crate) poll_timeout: Duration,
}

impl ConfigService {
    pub fn new(invoker: Arc<dyn Invoker>, cache: Arc<dyn ConfigCache>) -> Self {
        Self {
            invoker,
            cache,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// 换用另一个缓存，其余设置不变
    pub fn with_cache(&self, cache: Arc<dyn ConfigCache>) -> Self {
        Self {
            cache,
            ..self.clone()
        }
    }

    /// 当前使用的缓存
    pub fn cache(&self) -> &Arc<dyn ConfigCache> {
        &self.cache
    }

    /// 读取配置
    ///
    /// 回退顺序：
    /// 1. 远程获取成功：写缓存并返回
    /// 2. 远程调用失败（网络、超时）：返回缓存值，可能为 `None`
    /// 3. 服务端 404：有 `default` 时返回它，否则返回错误
    /// 4. 其它服务端错误原样返回
    pub async fn get(&self, key: &SubscriptionKey, default: Option<&str>) -> Result<Option<String>> {
        let cache_key = key.cache_key();
        match self.fetch(key).await {
            Ok(content) => {
                if let Err(e) = self.cache.set(&cache_key, &content) {
                    warn!(key = %cache_key, error = %e, "Failed to cache config");
                }
                Ok(Some(content))
            }
            Err(e) if e.is_transient() => {
                error!(
                    key = %cache_key,
                    category = %e.code().category(),
                    error = %e,
                    "Failed to get config from server, falling back to cache"
                );
                self.cache.get(&cache_key)
            }
            Err(e) => {
                debug!(key = %cache_key, error = %e, "Failed to get config from server");
                match default {
                    Some(default) if e.is_not_found() => Ok(Some(default.to_string())),
                    _ => Err(e),
                }
            }
        }
    }

    /// 读取配置并按格式解析
    pub async fn get_parsed(
        &self,
        key: &SubscriptionKey,
        format: ContentFormat,
        default: Option<&str>,
    ) -> Result<Option<serde_json::Value>> {
        self.get(key, default)
            .await?
            .map(|content| format.parse(&content))
            .transpose()
    }

    /// 直接从服务端获取配置内容，不读写缓存
    pub async fn fetch(&self, key: &SubscriptionKey) -> Result<String> {
        let request = RemoteRequest::get(CONFIG_PATH)
            .query("dataId", &key.data_id)
            .query("group", &key.group)
            .query("tenant", &key.tenant);
        Ok(self.invoker.invoke(request).await?.body)
    }

    /// 发布配置
    pub async fn publish(
        &self,
        key: &SubscriptionKey,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<bool> {
        let mut request = RemoteRequest::post(CONFIG_PATH)
            .form("dataId", &key.data_id)
            .form("group", &key.group)
            .form("tenant", &key.tenant)
            .form("content", content);
        if let Some(content_type) = content_type {
            request = request.form("type", content_type);
        }
        Ok(self.invoker.invoke(request).await?.is_true())
    }

    /// 删除配置
    pub async fn delete(&self, key: &SubscriptionKey) -> Result<bool> {
        let request = RemoteRequest::delete(CONFIG_PATH)
            .query("dataId", &key.data_id)
            .query("group", &key.group)
            .query("tenant", &key.tenant);
        Ok(self.invoker.invoke(request).await?.is_true())
    }

    /// 发起一次长轮询，返回配置是否已变更
    ///
    /// `md5` 为客户端已知内容的指纹；服务端最多挂起 `poll_timeout`，
    /// 期间内容未变则返回空响应。
    pub async fn listen(&self, key: &SubscriptionKey, md5: &str, poll_timeout: Duration) -> Result<bool> {
        let request = RemoteRequest::post(LISTENER_PATH)
            .form("Listening-Configs", listening_configs(key, md5))
            .header("Long-Pulling-Timeout", poll_timeout.as_millis())
            .timeout(poll_timeout + POLL_TIMEOUT_MARGIN);
        let resp = self.invoker.invoke(request).await?;
        Ok(!resp.body.trim().is_empty())
    }
}

impl std::fmt::Debug for ConfigService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigService")
            .field("poll_timeout", &self.poll_timeout)
            .finish_non_exhaustive()
    }
}
