//! 文件缓存
//!
//! 以单个 JSON 对象保存所有键，每次 `set` 都做一次完整的读-改-写。

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::ConfigCache;
use crate::error::{NacosError, Result};

/// 默认缓存文件名
pub const DEFAULT_CACHE_FILE: &str = "_nacos_config_cache.json";

/// 文件缓存
///
/// 同一实例内的读-改-写由互斥锁串行化；写入先落到临时文件再 rename，
/// 读者不会看到写了一半的文件。跨进程共享同一文件不受保护。
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCache {
    /// 打开缓存文件，不存在时创建为空对象
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| cache_io(&path, e))?;
            }
            std::fs::write(&path, "{}").map_err(|e| cache_io(&path, e))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| cache_io(&self.path, e))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            NacosError::Cache(format!("corrupted cache file {}: {}", self.path.display(), e))
        })
    }

    fn write_file(&self, data: &BTreeMap<String, String>) -> Result<()> {
        let content = serde_json::to_string(data)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| cache_io(&tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| cache_io(&self.path, e))
    }
}

fn cache_io(path: &Path, err: std::io::Error) -> NacosError {
    NacosError::Cache(format!("{}: {}", path.display(), err))
}

impl ConfigCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_file()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut data = self.read_file()?;
        data.insert(key.to_string(), value.to_string());
        self.write_file(&data)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock();
        Ok(self.read_file()?.contains_key(key))
    }
}
