//! Nacos 客户端错误处理模块
//!
//! 错误分为四个主要类别：
//! - `RemoteCallFailure`：网络或超时，视为瞬时错误
//! - `ServerRejection`：服务端返回非 2xx 状态码
//! - `EmptyCandidateSet`：没有可选的健康实例
//! - `DegenerateDistribution`：权重归一化的内部不变量被破坏

pub mod code;

pub use code::{ErrorCategory, ErrorCode};

use thiserror::Error;

/// Nacos 客户端统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NacosError {
    /// 远程调用失败（连接失败、超时、IO 中断）
    #[error("remote call failed: {0}")]
    RemoteCallFailure(String),

    /// 服务端拒绝请求（非 2xx）
    #[error("server rejected request with status {status}: {body}")]
    ServerRejection { status: u16, body: String },

    /// 没有可选的候选实例
    #[error("no eligible candidate: {0}")]
    EmptyCandidateSet(String),

    /// 累计权重没有归一到 1.0
    #[error("cumulative weight ended at {total}, expected 1.0")]
    DegenerateDistribution { total: f64 },

    /// 本地缓存读写失败
    #[error("cache error: {0}")]
    Cache(String),

    /// 序列化 / 反序列化失败
    #[error("serialization error: {0}")]
    Serialization(String),

    /// 客户端配置错误
    #[error("configuration error: {0}")]
    Config(String),

    /// 后台任务运行时错误
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl NacosError {
    /// 创建远程调用失败错误
    pub fn remote(msg: impl std::fmt::Display) -> Self {
        NacosError::RemoteCallFailure(msg.to_string())
    }

    /// 创建服务端拒绝错误
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        NacosError::ServerRejection {
            status,
            body: body.into(),
        }
    }

    /// 创建无候选实例错误
    pub fn empty_candidates(msg: impl Into<String>) -> Self {
        NacosError::EmptyCandidateSet(msg.into())
    }

    /// 获取错误代码
    pub fn code(&self) -> ErrorCode {
        match self {
            NacosError::RemoteCallFailure(_) => ErrorCode::RemoteCallFailed,
            NacosError::ServerRejection { status: 404, .. } => ErrorCode::ResourceNotFound,
            NacosError::ServerRejection { status: 503, .. } => ErrorCode::ServerUnavailable,
            NacosError::ServerRejection { .. } => ErrorCode::ServerRejected,
            NacosError::EmptyCandidateSet(_) => ErrorCode::EmptyCandidateSet,
            NacosError::DegenerateDistribution { .. } => ErrorCode::DegenerateDistribution,
            NacosError::Cache(_) => ErrorCode::CacheError,
            NacosError::Serialization(_) => ErrorCode::SerializationError,
            NacosError::Config(_) => ErrorCode::ConfigurationError,
            NacosError::Runtime(_) => ErrorCode::RuntimeError,
        }
    }

    /// 服务端返回的状态码（仅 `ServerRejection`）
    pub fn status(&self) -> Option<u16> {
        match self {
            NacosError::ServerRejection { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 是否为服务端 "not found"
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// 是否为瞬时错误（触发缓存回退、后台循环继续）
    pub fn is_transient(&self) -> bool {
        self.code().is_retryable()
    }
}

impl From<serde_json::Error> for NacosError {
    fn from(err: serde_json::Error) -> Self {
        NacosError::Serialization(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, NacosError>;
