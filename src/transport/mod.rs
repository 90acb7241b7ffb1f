//! 远程调用抽象
//!
//! 所有对 Nacos 服务端的访问都经过 [`Invoker`]：配置、实例、心跳的具体请求只负责
//! 拼出 [`RemoteRequest`]，由实现方完成 HTTP 传输。测试中可以替换为进程内的假实现。

pub mod http;

pub use self::http::HttpInvoker;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use ::http::Method;

/// 一次远程调用
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    /// 表单编码的请求体
    pub body: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    /// 覆盖默认的请求超时
    pub timeout: Option<Duration>,
}

impl RemoteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Vec::new(),
            headers: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// 添加查询参数
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// 添加可选查询参数（`None` 时跳过）
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// 添加表单字段
    pub fn form(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.body.push((key.into(), value.to_string()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.headers.push((key.into(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 查找查询参数
    pub fn query_param(&self, key: &str) -> Option<&str> {
        find(&self.query, key)
    }

    /// 查找表单字段
    pub fn form_param(&self, key: &str) -> Option<&str> {
        find(&self.body, key)
    }

    /// 查找请求头（大小写不敏感）
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

fn find<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// 远程调用响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub body: String,
}

impl RemoteResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 服务端写操作返回 `true` 表示成功
    pub fn is_true(&self) -> bool {
        self.body.trim().eq_ignore_ascii_case("true") || self.body.trim() == "ok"
    }

    /// 将响应体解析为 JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// 远程调用能力
///
/// 约定：
/// - 网络或超时失败返回 [`NacosError::RemoteCallFailure`](crate::NacosError::RemoteCallFailure)
/// - 非 2xx 响应返回 [`NacosError::ServerRejection`](crate::NacosError::ServerRejection)
/// - 只有 2xx 响应以 `Ok` 返回
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse>;
}
