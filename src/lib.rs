//! Nacos Client Core Library
//!
//! Provides the client side of a Nacos-style registry and config center: config reads with
//! local cache fallback, long-poll config watching, instance heartbeats, and weighted selection
//! of healthy instances.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod retry;
pub mod transport;

// 配置中心与服务实例
pub mod configs;
pub mod naming;

// 客户端
pub mod blocking;
pub mod client;

// 后台循环运行时
pub mod runtime;

// Re-exports
pub use blocking::BlockingNacosClient;
pub use cache::{ConfigCache, FileCache, MemoryCache};
pub use client::{ClientBuilder, NacosClient};
pub use config::{CacheConfig, ClientConfig, RetryStrategy};
pub use configs::{
    ConfigCallback, ConfigService, ConfigSnapshot, ContentFormat, DEFAULT_GROUP, SubscribeOptions,
    SubscriptionKey,
};
pub use error::{ErrorCategory, ErrorCode, NacosError, Result};
pub use logging::{LoggingConfig, init_tracing};
pub use naming::{
    ConsistencyType, Distribution, HeartbeatOptions, Instance, InstanceList, InstanceQuery,
    InstanceSpec, MetadataBatch, MetadataBatchResponse, NamingService, ProxyTarget,
};
pub use retry::{ExponentialBackoffPolicy, FixedRetryPolicy, RetryPolicy};
pub use runtime::{CancelHandle, ExecutionMode};
pub use transport::{HttpInvoker, Invoker, RemoteRequest, RemoteResponse};
