//! 基于 reqwest 的远程调用实现

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{Invoker, RemoteRequest, RemoteResponse};
use crate::error::{NacosError, Result};
use crate::retry::{FixedRetryPolicy, RetryPolicy};

/// 默认请求超时
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("nacos-client-core/", env!("CARGO_PKG_VERSION"));

/// HTTP 远程调用器
///
/// 连接失败按 [`RetryPolicy`] 重试（默认固定 3 次）；超时与服务端拒绝不重试，
/// 避免长轮询请求被重复发送。
#[derive(Clone)]
pub struct HttpInvoker {
    http_client: HttpClient,
    server_addr: String,
    retry: Arc<dyn RetryPolicy>,
}

impl HttpInvoker {
    /// 创建新的 HTTP 调用器
    ///
    /// # 参数
    /// * `server_addr` - 服务端地址，如 `http://localhost:8848/`
    /// * `request_timeout` - 默认请求超时
    /// * `http_retries` - 连接失败的重试次数
    pub fn new(
        server_addr: impl Into<String>,
        request_timeout: Duration,
        http_retries: usize,
    ) -> Result<Self> {
        let retry = FixedRetryPolicy::new(http_retries, Duration::from_millis(100));
        Self::with_retry_policy(server_addr, request_timeout, Arc::new(retry))
    }

    /// 使用自定义重试策略创建
    pub fn with_retry_policy(
        server_addr: impl Into<String>,
        request_timeout: Duration,
        retry: Arc<dyn RetryPolicy>,
    ) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NacosError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            http_client,
            server_addr: server_addr.into(),
            retry,
        })
    }

    /// 服务端地址
    pub fn server_addr(&self) -> &str {
        &self.server_addr
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.server_addr.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn send_once(&self, request: &RemoteRequest) -> std::result::Result<RemoteResponse, reqwest::Error> {
        let mut builder = self
            .http_client
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.body.is_empty() {
            builder = builder.form(&request.body);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(RemoteResponse { status, body })
    }
}

#[async_trait]
impl Invoker for HttpInvoker {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        let mut attempt = 0;
        loop {
            match self.send_once(&request).await {
                Ok(resp) if resp.is_success() => return Ok(resp),
                Ok(resp) => {
                    debug!(
                        method = %request.method,
                        path = %request.path,
                        status = resp.status,
                        "Request rejected by server"
                    );
                    return Err(NacosError::rejected(resp.status, resp.body));
                }
                Err(e) => {
                    let err = NacosError::remote(&e);
                    if e.is_connect() && self.retry.should_retry(attempt, &err) {
                        let delay = self.retry.backoff_duration(attempt);
                        warn!(
                            path = %request.path,
                            attempt = attempt + 1,
                            error = %e,
                            "Connect failed, retrying"
                        );
                        attempt += 1;
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let invoker =
            HttpInvoker::new("http://localhost:8848/", DEFAULT_REQUEST_TIMEOUT, 0).unwrap();
        assert_eq!(
            invoker.url("/nacos/v1/cs/configs"),
            "http://localhost:8848/nacos/v1/cs/configs"
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_remote_failure() {
        // 端口 1 上通常没有监听者，连接会被立即拒绝
        let invoker =
            HttpInvoker::new("http://127.0.0.1:1/", Duration::from_secs(2), 1).unwrap();
        let err = invoker
            .invoke(RemoteRequest::get("/nacos/v1/cs/configs"))
            .await
            .unwrap_err();
        assert!(err.is_transient(), "unexpected error: {err:?}");
    }
}
