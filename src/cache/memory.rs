//! 内存缓存

use parking_lot::RwLock;
use std::collections::HashMap;

use super::ConfigCache;
use crate::error::Result;

/// 进程内缓存
#[derive(Debug, Default)]
pub struct MemoryCache {
    storage: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.storage.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.read().is_empty()
    }
}

impl ConfigCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.storage.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.storage.read().contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn last_write_wins() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k#g#").unwrap(), None);
        assert!(!cache.exists("k#g#").unwrap());

        cache.set("k#g#", "v1").unwrap();
        cache.set("k#g#", "v2").unwrap();

        assert_eq!(cache.get("k#g#").unwrap().as_deref(), Some("v2"));
        assert!(cache.exists("k#g#").unwrap());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_writers_do_not_lose_keys() {
        let cache = Arc::new(MemoryCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        cache.set(&format!("k{i}-{j}#g#"), "v").unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cache.len(), 400);
    }
}
