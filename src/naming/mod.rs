//! 服务实例模块
//!
//! 显式列出全部实例操作（注册、注销、更新、查询、列表、心跳、健康上报、批量元数据），
//! 并在列表之上提供加权随机的健康实例选择与请求代理。

pub mod chooser;
pub mod heartbeat;
pub mod instance;

pub use chooser::Distribution;
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, HeartbeatOptions};
pub use instance::{
    BeatResponse, ConsistencyType, Instance, InstanceList, InstanceSpec, MetadataBatch,
    MetadataBatchResponse, MetadataTarget,
};

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{NacosError, Result};
use crate::transport::{Invoker, Method, RemoteRequest, RemoteResponse};

const INSTANCE_PATH: &str = "/nacos/v1/ns/instance";
const INSTANCE_LIST_PATH: &str = "/nacos/v1/ns/instance/list";
const INSTANCE_BEAT_PATH: &str = "/nacos/v1/ns/instance/beat";
const HEALTH_PATH: &str = "/nacos/v1/ns/health/instance";
const METADATA_BATCH_PATH: &str = "/nacos/v1/ns/instance/metadata/batch";

/// 实例查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceQuery {
    pub namespace_id: Option<String>,
    pub group_name: Option<String>,
    /// 逗号分隔的集群名
    pub clusters: Option<String>,
    pub healthy_only: bool,
}

impl InstanceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.namespace_id = Some(namespace_id.into());
        self
    }

    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn clusters(mut self, clusters: impl Into<String>) -> Self {
        self.clusters = Some(clusters.into());
        self
    }

    pub fn healthy_only(mut self, healthy_only: bool) -> Self {
        self.healthy_only = healthy_only;
        self
    }
}

/// 代理请求的目标
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyTarget {
    /// 直接使用给定实例
    Instance(Instance),
    /// 每次调用时解析一个健康实例
    Service(String),
}

/// 实例服务
#[derive(Clone)]
pub struct NamingService {
    invoker: Arc<dyn Invoker>,
    default_namespace: Option<String>,
    pub(crate) heartbeat_interval: Duration,
    proxy_client: reqwest::Client,
}

impl NamingService {
    pub fn new(invoker: Arc<dyn Invoker>) -> Self {
        Self {
            invoker,
            default_namespace: None,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            proxy_client: reqwest::Client::new(),
        }
    }

    /// 未显式指定命名空间时使用的命名空间
    pub fn with_default_namespace(mut self, namespace_id: impl Into<String>) -> Self {
        let namespace_id = namespace_id.into();
        self.default_namespace = (!namespace_id.is_empty()).then_some(namespace_id);
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    fn namespace<'a>(&'a self, explicit: &'a Option<String>) -> Option<&'a str> {
        explicit.as_deref().or(self.default_namespace.as_deref())
    }

    fn instance_request(&self, method: Method, path: &str, instance: &InstanceSpec) -> RemoteRequest {
        RemoteRequest::new(method, path)
            .query("serviceName", &instance.service_name)
            .query("ip", &instance.ip)
            .query("port", instance.port)
            .query_opt("namespaceId", self.namespace(&instance.namespace_id))
            .query_opt("groupName", instance.group_name.as_deref())
            .query_opt("clusterName", instance.cluster_name.as_deref())
            .query("ephemeral", instance.ephemeral)
    }

    fn with_attributes(request: RemoteRequest, instance: &InstanceSpec) -> Result<RemoteRequest> {
        let request = request
            .query("weight", instance.weight)
            .query("enabled", instance.enabled)
            .query("healthy", instance.healthy);
        if instance.metadata.is_empty() {
            return Ok(request);
        }
        Ok(request.query("metadata", serde_json::to_string(&instance.metadata)?))
    }

    /// 注册实例
    pub async fn register(&self, instance: &InstanceSpec) -> Result<bool> {
        let request = Self::with_attributes(
            self.instance_request(Method::POST, INSTANCE_PATH, instance),
            instance,
        )?;
        Ok(self.invoker.invoke(request).await?.is_true())
    }

    /// 注销实例
    pub async fn deregister(&self, instance: &InstanceSpec) -> Result<bool> {
        let request = self.instance_request(Method::DELETE, INSTANCE_PATH, instance);
        Ok(self.invoker.invoke(request).await?.is_true())
    }

    /// 更新实例属性
    pub async fn update(&self, instance: &InstanceSpec) -> Result<bool> {
        let request = Self::with_attributes(
            self.instance_request(Method::PUT, INSTANCE_PATH, instance),
            instance,
        )?;
        Ok(self.invoker.invoke(request).await?.is_true())
    }

    /// 查询单个实例详情
    pub async fn get(
        &self,
        service_name: &str,
        ip: &str,
        port: u16,
        query: &InstanceQuery,
    ) -> Result<Instance> {
        let request = RemoteRequest::get(INSTANCE_PATH)
            .query("serviceName", service_name)
            .query("ip", ip)
            .query("port", port)
            .query_opt("namespaceId", self.namespace(&query.namespace_id))
            .query_opt("groupName", query.group_name.as_deref())
            .query_opt("cluster", query.clusters.as_deref())
            .query("healthyOnly", query.healthy_only);
        self.invoker.invoke(request).await?.json()
    }

    /// 列出服务实例
    pub async fn list(&self, service_name: &str, query: &InstanceQuery) -> Result<InstanceList> {
        let request = RemoteRequest::get(INSTANCE_LIST_PATH)
            .query("serviceName", service_name)
            .query_opt("namespaceId", self.namespace(&query.namespace_id))
            .query_opt("groupName", query.group_name.as_deref())
            .query_opt("clusters", query.clusters.as_deref())
            .query("healthyOnly", query.healthy_only);
        self.invoker.invoke(request).await?.json()
    }

    /// 发送一次心跳
    pub async fn beat(&self, instance: &InstanceSpec) -> Result<BeatResponse> {
        let grouped = instance.grouped_service_name();
        let request = RemoteRequest::put(INSTANCE_BEAT_PATH)
            .query("serviceName", &grouped)
            .query("beat", instance.beat_payload())
            .query_opt("namespaceId", self.namespace(&instance.namespace_id))
            .query_opt("groupName", instance.group_name.as_deref());
        let resp = self.invoker.invoke(request).await?;
        // 旧版本服务端返回纯文本 "ok"
        Ok(resp.json().unwrap_or_default())
    }

    /// 上报实例健康状态（仅对持久实例生效）
    pub async fn update_health(&self, instance: &InstanceSpec, healthy: bool) -> Result<bool> {
        let request = RemoteRequest::put(HEALTH_PATH)
            .query("serviceName", &instance.service_name)
            .query("ip", &instance.ip)
            .query("port", instance.port)
            .query("healthy", healthy)
            .query_opt("namespaceId", self.namespace(&instance.namespace_id))
            .query_opt("groupName", instance.group_name.as_deref())
            .query_opt("clusterName", instance.cluster_name.as_deref());
        Ok(self.invoker.invoke(request).await?.is_true())
    }

    /// 批量写入实例元数据
    pub async fn batch_update_metadata(&self, batch: &MetadataBatch) -> Result<MetadataBatchResponse> {
        self.metadata_batch(Method::PUT, batch).await
    }

    /// 批量删除实例元数据中的指定键
    pub async fn batch_delete_metadata(&self, batch: &MetadataBatch) -> Result<MetadataBatchResponse> {
        self.metadata_batch(Method::DELETE, batch).await
    }

    async fn metadata_batch(&self, method: Method, batch: &MetadataBatch) -> Result<MetadataBatchResponse> {
        let mut request = RemoteRequest::new(method, METADATA_BATCH_PATH)
            .query("serviceName", &batch.service_name)
            .query_opt("namespaceId", self.namespace(&batch.namespace_id))
            .query_opt("groupName", batch.group_name.as_deref())
            .query_opt("consistencyType", batch.consistency_type.map(|c| c.as_str()))
            .query("metadata", serde_json::to_string(&batch.metadata)?);
        if !batch.instances.is_empty() {
            request = request.query("instances", serde_json::to_string(&batch.instances)?);
        }
        let resp: MetadataBatchResponse = self.invoker.invoke(request).await?.json()?;
        debug!(
            service = %batch.service_name,
            updated = resp.updated.len(),
            "Instance metadata batch applied"
        );
        Ok(resp)
    }

    /// 选出一个健康实例
    ///
    /// 每次调用都重新拉取健康实例列表并重建权重分布，不缓存结果。
    pub async fn select_one_healthy(
        &self,
        service_name: &str,
        query: &InstanceQuery,
    ) -> Result<Instance> {
        let query = query.clone().healthy_only(true);
        let list = self.list(service_name, &query).await?;
        debug!(
            service = %service_name,
            candidates = list.hosts.len(),
            "Selecting healthy instance"
        );
        choose_one_healthy(service_name, list.hosts)
    }

    /// 向实例发起 HTTP 请求
    ///
    /// 返回实例的原始响应，非 2xx 不会转换为错误。
    pub async fn request(
        &self,
        target: ProxyTarget,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<RemoteResponse> {
        let instance = match target {
            ProxyTarget::Instance(instance) => instance,
            ProxyTarget::Service(service_name) => {
                self.select_one_healthy(&service_name, &InstanceQuery::default())
                    .await?
            }
        };

        let mut builder = self.proxy_client.request(method, instance.to_http_url(path));
        if let Some(body) = body {
            builder = builder.body(body);
        }
        let resp = builder.send().await.map_err(NacosError::remote)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(NacosError::remote)?;
        Ok(RemoteResponse { status, body })
    }
}

impl std::fmt::Debug for NamingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingService")
            .field("default_namespace", &self.default_namespace)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish_non_exhaustive()
    }
}

/// 按权重从实例列表中选出一个可用实例
pub fn choose_one_healthy(service_name: &str, hosts: Vec<Instance>) -> Result<Instance> {
    let weighted = hosts
        .into_iter()
        .filter(Instance::is_available)
        .map(|instance| {
            let weight = instance.weight;
            (instance, weight)
        });
    let distribution = Distribution::build(weighted)?;
    if distribution.is_empty() {
        return Err(NacosError::empty_candidates(format!(
            "no healthy instance found for service '{}'",
            service_name
        )));
    }
    distribution.sample().cloned()
}
