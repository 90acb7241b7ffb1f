//! 配置键与内容指纹

use md5::{Digest, Md5};
use std::fmt;

/// 缓存键分隔符，不允许出现在 dataId / group / tenant 中
pub const KEY_SEPARATOR: char = '#';

/// 默认分组
pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";

/// 配置订阅键 `(dataId, group, tenant)`
///
/// tenant 为空字符串表示默认命名空间。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub data_id: String,
    pub group: String,
    pub tenant: String,
}

impl SubscriptionKey {
    pub fn new(data_id: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            data_id: data_id.into(),
            group: group.into(),
            tenant: String::new(),
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// 缓存键 `dataId#group#tenant`
    pub fn cache_key(&self) -> String {
        config_key(&self.data_id, &self.group, &self.tenant)
    }

    /// 从缓存键解析；段数不是 3 时返回 `None`
    pub fn parse(cache_key: &str) -> Option<Self> {
        let mut parts = cache_key.split(KEY_SEPARATOR);
        let key = Self {
            data_id: parts.next()?.to_string(),
            group: parts.next()?.to_string(),
            tenant: parts.next()?.to_string(),
        };
        parts.next().is_none().then_some(key)
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// 拼接缓存键
pub fn config_key(data_id: &str, group: &str, tenant: &str) -> String {
    format!("{data_id}{KEY_SEPARATOR}{group}{KEY_SEPARATOR}{tenant}")
}

/// 内容指纹：UTF-8 内容的 MD5 十六进制摘要，空内容为空字符串
pub fn fingerprint(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    hex::encode(Md5::digest(content.as_bytes()))
}

/// 某一时刻的配置内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSnapshot {
    pub key: SubscriptionKey,
    pub content: String,
    pub content_hash: String,
}

impl ConfigSnapshot {
    pub fn new(key: SubscriptionKey, content: String) -> Self {
        let content_hash = fingerprint(&content);
        Self {
            key,
            content,
            content_hash,
        }
    }
}
