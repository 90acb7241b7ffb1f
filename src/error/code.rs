//! 错误代码和错误类别定义
//!
//! 错误代码按类别分组，每个类别占用 1000 个代码范围：
//! - 1000-1999: 远程调用（网络、超时）
//! - 2000-2999: 服务端拒绝
//! - 3000-3999: 实例选择
//! - 4000-4999: 本地缓存
//! - 5000-5999: 序列化
//! - 6000-6999: 客户端配置与运行时
//! - 9000-9999: 内部错误

use serde::{Deserialize, Serialize};
use std::fmt;

/// 错误代码枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum ErrorCode {
    // ============================================================
    // 远程调用 (1000-1999)
    // ============================================================
    RemoteCallFailed = 1000,

    // ============================================================
    // 服务端拒绝 (2000-2999)
    // ============================================================
    ServerRejected = 2000,
    ResourceNotFound = 2004,
    ServerUnavailable = 2003,

    // ============================================================
    // 实例选择 (3000-3999)
    // ============================================================
    EmptyCandidateSet = 3000,

    // ============================================================
    // 本地缓存 (4000-4999)
    // ============================================================
    CacheError = 4000,

    // ============================================================
    // 序列化 (5000-5999)
    // ============================================================
    SerializationError = 5000,

    // ============================================================
    // 配置与运行时 (6000-6999)
    // ============================================================
    ConfigurationError = 6000,
    RuntimeError = 6001,

    // ============================================================
    // 内部错误 (9000-9999)
    // ============================================================
    DegenerateDistribution = 9000,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ErrorCode {
    /// 获取错误代码的数字值
    #[inline]
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// 获取错误代码的英文标识符
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RemoteCallFailed => "REMOTE_CALL_FAILED",
            ErrorCode::ServerRejected => "SERVER_REJECTED",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::ServerUnavailable => "SERVER_UNAVAILABLE",
            ErrorCode::EmptyCandidateSet => "EMPTY_CANDIDATE_SET",
            ErrorCode::CacheError => "CACHE_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
            ErrorCode::ConfigurationError => "CONFIGURATION_ERROR",
            ErrorCode::RuntimeError => "RUNTIME_ERROR",
            ErrorCode::DegenerateDistribution => "DEGENERATE_DISTRIBUTION",
        }
    }

    /// 获取错误代码的类别
    pub fn category(&self) -> ErrorCategory {
        match self.as_u32() {
            1000..=1999 => ErrorCategory::Remote,
            2000..=2999 => ErrorCategory::Server,
            3000..=3999 => ErrorCategory::Selection,
            4000..=4999 => ErrorCategory::Cache,
            5000..=5999 => ErrorCategory::Serialization,
            6000..=6999 => ErrorCategory::Client,
            _ => ErrorCategory::Internal,
        }
    }

    /// 判断是否为瞬时错误
    ///
    /// 只有远程调用失败（网络、超时）属于瞬时错误：读配置时回退到缓存，
    /// 后台循环记录日志后继续。服务端返回的错误码一律不视为瞬时错误。
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::RemoteCallFailed)
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    Remote,
    Server,
    Selection,
    Cache,
    Serialization,
    Client,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Remote => write!(f, "REMOTE"),
            ErrorCategory::Server => write!(f, "SERVER"),
            ErrorCategory::Selection => write!(f, "SELECTION"),
            ErrorCategory::Cache => write!(f, "CACHE"),
            ErrorCategory::Serialization => write!(f, "SERIALIZATION"),
            ErrorCategory::Client => write!(f, "CLIENT"),
            ErrorCategory::Internal => write!(f, "INTERNAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_code_ranges() {
        assert_eq!(ErrorCode::RemoteCallFailed.category(), ErrorCategory::Remote);
        assert_eq!(ErrorCode::ResourceNotFound.category(), ErrorCategory::Server);
        assert_eq!(ErrorCode::EmptyCandidateSet.category(), ErrorCategory::Selection);
        assert_eq!(ErrorCode::DegenerateDistribution.category(), ErrorCategory::Internal);
    }

    #[test]
    fn only_remote_failures_are_retryable() {
        assert!(ErrorCode::RemoteCallFailed.is_retryable());
        assert!(!ErrorCode::ServerUnavailable.is_retryable());
        assert!(!ErrorCode::EmptyCandidateSet.is_retryable());
    }
}
