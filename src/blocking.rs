//! 阻塞式客户端
//!
//! 给没有异步运行时的调用方使用。内部持有一个只有一个工作线程的运行时执行一次性请求；
//! 订阅与心跳循环运行在各自的专用线程上，与调用方线程互不阻塞。
//!
//! 一次性请求建立的连接会放回连接池并被后台循环复用，连接的驱动任务留在内部运行时上，
//! 所以内部运行时在 `block_on` 之外也必须持续运行。
//!
//! 不要在异步上下文中调用这里的方法。

use std::time::Duration;
use tokio::runtime::{Builder, Runtime};

use crate::client::NacosClient;
use crate::config::ClientConfig;
use crate::configs::{ConfigCallback, ContentFormat, SubscribeOptions, SubscriptionKey};
use crate::error::{NacosError, Result};
use crate::naming::{
    HeartbeatOptions, Instance, InstanceList, InstanceQuery, InstanceSpec, MetadataBatch,
    MetadataBatchResponse,
};
use crate::runtime::{CancelHandle, ExecutionMode, LoopResult};

/// 阻塞式 Nacos 客户端
pub struct BlockingNacosClient {
    inner: NacosClient,
    runtime: Runtime,
}

impl BlockingNacosClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::from_client(NacosClient::new(config)?)
    }

    pub fn from_client(inner: NacosClient) -> Result<Self> {
        // 工作线程常驻，池化连接在两次调用之间也有人驱动
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("nacos-blocking")
            .enable_all()
            .build()
            .map_err(|e| NacosError::Runtime(format!("failed to build runtime: {}", e)))?;
        Ok(Self { inner, runtime })
    }

    /// 底层异步客户端
    pub fn client(&self) -> &NacosClient {
        &self.inner
    }

    pub fn get_config(&self, key: &SubscriptionKey, default: Option<&str>) -> Result<Option<String>> {
        self.runtime.block_on(self.inner.configs().get(key, default))
    }

    pub fn get_parsed(
        &self,
        key: &SubscriptionKey,
        format: ContentFormat,
        default: Option<&str>,
    ) -> Result<Option<serde_json::Value>> {
        self.runtime
            .block_on(self.inner.configs().get_parsed(key, format, default))
    }

    pub fn publish_config(
        &self,
        key: &SubscriptionKey,
        content: &str,
        content_type: Option<&str>,
    ) -> Result<bool> {
        self.runtime
            .block_on(self.inner.configs().publish(key, content, content_type))
    }

    pub fn delete_config(&self, key: &SubscriptionKey) -> Result<bool> {
        self.runtime.block_on(self.inner.configs().delete(key))
    }

    /// 在专用线程上订阅配置
    pub fn subscribe(
        &self,
        key: SubscriptionKey,
        callback: Option<ConfigCallback>,
    ) -> Result<CancelHandle> {
        let options = SubscribeOptions::default()
            .with_poll_timeout(self.inner.config().poll_timeout())
            .with_mode(ExecutionMode::Thread);
        self.inner
            .configs()
            .subscribe_with_options(key, options, callback)
    }

    pub fn register_instance(&self, instance: &InstanceSpec) -> Result<bool> {
        self.runtime.block_on(self.inner.naming().register(instance))
    }

    pub fn deregister_instance(&self, instance: &InstanceSpec) -> Result<bool> {
        self.runtime.block_on(self.inner.naming().deregister(instance))
    }

    pub fn update_instance(&self, instance: &InstanceSpec) -> Result<bool> {
        self.runtime.block_on(self.inner.naming().update(instance))
    }

    pub fn batch_update_metadata(&self, batch: &MetadataBatch) -> Result<MetadataBatchResponse> {
        self.runtime
            .block_on(self.inner.naming().batch_update_metadata(batch))
    }

    pub fn batch_delete_metadata(&self, batch: &MetadataBatch) -> Result<MetadataBatchResponse> {
        self.runtime
            .block_on(self.inner.naming().batch_delete_metadata(batch))
    }

    pub fn list_instances(&self, service_name: &str, query: &InstanceQuery) -> Result<InstanceList> {
        self.runtime
            .block_on(self.inner.naming().list(service_name, query))
    }

    pub fn select_one_healthy(&self, service_name: &str, query: &InstanceQuery) -> Result<Instance> {
        self.runtime
            .block_on(self.inner.naming().select_one_healthy(service_name, query))
    }

    /// 在专用线程上发送心跳
    pub fn heartbeat(&self, instance: InstanceSpec) -> Result<CancelHandle> {
        let options = HeartbeatOptions::default()
            .with_interval(self.inner.config().heartbeat_interval())
            .with_mode(ExecutionMode::Thread);
        self.inner.naming().heartbeat_with_options(instance, options)
    }

    /// 等待后台循环结束
    pub fn join(&self, handle: &CancelHandle) -> LoopResult {
        self.runtime.block_on(handle.join())
    }

    /// 取消并在 `timeout` 内等待后台循环结束
    pub fn stop(&self, handle: &CancelHandle, timeout: Duration) -> LoopResult {
        handle.cancel();
        self.runtime.block_on(async {
            tokio::time::timeout(timeout, handle.join())
                .await
                .map_err(|_| {
                    NacosError::Runtime(format!("{} did not stop within {:?}", handle.name(), timeout))
                })?
        })
    }
}
