//! 配置缓存
//!
//! 记住每个配置键最后一次成功获取的内容，远程不可用时作为回退。
//! 键格式为 `dataId#group#tenant`，见 [`SubscriptionKey::cache_key`](crate::configs::SubscriptionKey::cache_key)。

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use crate::error::Result;

/// 可插拔的键值缓存
///
/// 实现必须允许多个后台循环与前台调用并发读写；语义为后写覆盖先写。
pub trait ConfigCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
