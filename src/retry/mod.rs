//! 重试策略模块
//!
//! 只用于传输层：连接类失败按策略重试，服务端拒绝不重试。

pub mod exponential;
pub mod fixed;

pub use exponential::ExponentialBackoffPolicy;
pub use fixed::FixedRetryPolicy;

use crate::error::NacosError;
use std::time::Duration;

/// 重试策略 trait
pub trait RetryPolicy: Send + Sync {
    fn should_retry(&self, attempt: usize, error: &NacosError) -> bool;
    fn backoff_duration(&self, attempt: usize) -> Duration;
    fn max_attempts(&self) -> usize;
}
