//! 进程内的 Nacos 服务端替身
//!
//! 实现 [`Invoker`]，按路径模拟配置与实例接口，支持注入故障并记录调用。

#![allow(dead_code)]

use async_trait::async_trait;
use nacos_client_core::configs::{config_key, fingerprint};
use nacos_client_core::transport::{Invoker, Method, RemoteRequest, RemoteResponse};
use nacos_client_core::{Instance, InstanceList, NacosError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// 注入的故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// 连接失败
    Network,
    /// 服务端返回指定状态码
    Status(u16),
}

#[derive(Default)]
struct State {
    configs: HashMap<String, String>,
    hosts: Vec<Instance>,
    fault: Option<Fault>,
    calls: Vec<String>,
    last_request: Option<RemoteRequest>,
}

#[derive(Default)]
pub struct FakeNacos {
    state: Mutex<State>,
    changed: Notify,
    beats: AtomicUsize,
    polls: AtomicUsize,
}

impl FakeNacos {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 服务端直接写入配置，相当于控制台发布
    pub fn put_config(&self, data_id: &str, group: &str, tenant: &str, content: &str) {
        self.state
            .lock()
            .configs
            .insert(config_key(data_id, group, tenant), content.to_string());
        self.changed.notify_waiters();
    }

    pub fn config(&self, data_id: &str, group: &str, tenant: &str) -> Option<String> {
        self.state
            .lock()
            .configs
            .get(&config_key(data_id, group, tenant))
            .cloned()
    }

    pub fn add_host(&self, instance: Instance) {
        self.state.lock().hosts.push(instance);
    }

    pub fn hosts(&self) -> Vec<Instance> {
        self.state.lock().hosts.clone()
    }

    pub fn set_fault(&self, fault: Option<Fault>) {
        self.state.lock().fault = fault;
    }

    pub fn beats(&self) -> usize {
        self.beats.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    pub fn last_request(&self) -> Option<RemoteRequest> {
        self.state.lock().last_request.clone()
    }

    fn key_of(request: &RemoteRequest, from_form: bool) -> String {
        let param = |name: &str| {
            let value = if from_form {
                request.form_param(name)
            } else {
                request.query_param(name)
            };
            value.unwrap_or_default().to_string()
        };
        config_key(&param("dataId"), &param("group"), &param("tenant"))
    }

    async fn listen(&self, request: &RemoteRequest) -> Result<RemoteResponse> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let listening = request.form_param("Listening-Configs").unwrap_or_default();
        let line = listening.trim_end_matches('\u{1}');
        let fields: Vec<&str> = line.split('\u{2}').collect();
        if fields.len() != 4 {
            return Err(NacosError::rejected(400, "invalid Listening-Configs"));
        }
        let (data_id, group, md5, tenant) = (fields[0], fields[1], fields[2], fields[3]);
        let timeout_ms: u64 = request
            .header_value("Long-Pulling-Timeout")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let current = self.config(data_id, group, tenant).unwrap_or_default();
            if fingerprint(&current) != md5 {
                return Ok(RemoteResponse::ok(format!(
                    "{}%02{}%02{}%01\n",
                    data_id, group, tenant
                )));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(RemoteResponse::ok(""));
            }
        }
    }
}

#[async_trait]
impl Invoker for FakeNacos {
    async fn invoke(&self, request: RemoteRequest) -> Result<RemoteResponse> {
        let fault = {
            let mut state = self.state.lock();
            state.calls.push(format!("{} {}", request.method, request.path));
            state.last_request = Some(request.clone());
            state.fault
        };
        match fault {
            Some(Fault::Network) => return Err(NacosError::remote("connection refused")),
            Some(Fault::Status(status)) => {
                return Err(NacosError::rejected(status, "injected failure"));
            }
            None => {}
        }

        let method = request.method.clone();
        match (method, request.path.as_str()) {
            (Method::GET, "/nacos/v1/cs/configs") => {
                let key = Self::key_of(&request, false);
                let content = self.state.lock().configs.get(&key).cloned();
                match content {
                    Some(content) => Ok(RemoteResponse::ok(content)),
                    None => Err(NacosError::rejected(404, "config data not exist")),
                }
            }
            (Method::POST, "/nacos/v1/cs/configs") => {
                let key = Self::key_of(&request, true);
                let content = request.form_param("content").unwrap_or_default().to_string();
                self.state.lock().configs.insert(key, content);
                self.changed.notify_waiters();
                Ok(RemoteResponse::ok("true"))
            }
            (Method::DELETE, "/nacos/v1/cs/configs") => {
                let key = Self::key_of(&request, false);
                self.state.lock().configs.remove(&key);
                self.changed.notify_waiters();
                Ok(RemoteResponse::ok("true"))
            }
            (Method::POST, "/nacos/v1/cs/configs/listener") => self.listen(&request).await,
            (Method::GET, "/nacos/v1/ns/instance/list") => {
                let healthy_only = request.query_param("healthyOnly") == Some("true");
                let hosts = self
                    .hosts()
                    .into_iter()
                    .filter(|h| !healthy_only || h.healthy)
                    .collect();
                let list = InstanceList {
                    name: request.query_param("serviceName").map(str::to_string),
                    hosts,
                    ..InstanceList::default()
                };
                Ok(RemoteResponse::ok(serde_json::to_string(&list)?))
            }
            (Method::PUT, "/nacos/v1/ns/instance/beat") => {
                self.beats.fetch_add(1, Ordering::SeqCst);
                Ok(RemoteResponse::ok(
                    r#"{"clientBeatInterval":5000,"code":10200,"lightBeatEnabled":false}"#,
                ))
            }
            (Method::POST, "/nacos/v1/ns/instance") => {
                let ip = request.query_param("ip").unwrap_or_default().to_string();
                let port = request
                    .query_param("port")
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_default();
                let weight = request
                    .query_param("weight")
                    .and_then(|w| w.parse().ok())
                    .unwrap_or(1.0);
                self.add_host(Instance::new(ip, port).with_weight(weight));
                Ok(RemoteResponse::ok("ok"))
            }
            (Method::DELETE, "/nacos/v1/ns/instance") => {
                let ip = request.query_param("ip").unwrap_or_default().to_string();
                self.state.lock().hosts.retain(|h| h.ip != ip);
                Ok(RemoteResponse::ok("ok"))
            }
            (method @ (Method::PUT | Method::DELETE), "/nacos/v1/ns/instance/metadata/batch") => {
                let metadata: HashMap<String, String> =
                    serde_json::from_str(request.query_param("metadata").unwrap_or("{}"))?;
                let targets: Vec<serde_json::Value> = match request.query_param("instances") {
                    Some(instances) => serde_json::from_str(instances)?,
                    None => Vec::new(),
                };
                let selected = |host: &Instance| {
                    targets.is_empty()
                        || targets.iter().any(|t| {
                            t["ip"].as_str() == Some(host.ip.as_str())
                                && t["port"].as_u64() == Some(u64::from(host.port))
                        })
                };

                let mut updated = Vec::new();
                for host in self.state.lock().hosts.iter_mut().filter(|h| selected(&**h)) {
                    for (key, value) in &metadata {
                        if method == Method::PUT {
                            host.metadata.insert(key.clone(), value.clone());
                        } else {
                            host.metadata.remove(key);
                        }
                    }
                    updated.push(format!("{}:{}", host.ip, host.port));
                }
                Ok(RemoteResponse::ok(serde_json::json!({ "updated": updated }).to_string()))
            }
            (_, path) => Err(NacosError::rejected(404, format!("no route for {}", path))),
        }
    }
}

/// 轮询等待条件成立
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
