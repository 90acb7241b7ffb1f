//! 服务实例定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 服务端返回的实例
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(default)]
    pub instance_id: Option<String>,

    pub ip: String,

    pub port: u16,

    /// 权重（用于加权随机选择）
    #[serde(default = "default_weight")]
    pub weight: f64,

    #[serde(default = "default_true")]
    pub healthy: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub ephemeral: bool,

    #[serde(default)]
    pub cluster_name: Option<String>,

    /// 形如 `DEFAULT_GROUP@@orders`
    #[serde(default)]
    pub service_name: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_weight() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Instance {
    /// 创建新的实例
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            instance_id: None,
            ip: ip.into(),
            port,
            weight: default_weight(),
            healthy: true,
            enabled: true,
            ephemeral: true,
            cluster_name: None,
            service_name: None,
            metadata: HashMap::new(),
        }
    }

    /// 设置权重
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// 设置健康状态
    pub fn with_health(mut self, healthy: bool) -> Self {
        self.healthy = healthy;
        self
    }

    /// `ip:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// 转换为 HTTP URL，`path` 以 `/` 开头
    pub fn to_http_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("http://{}{}", self.address(), path)
        } else {
            format!("http://{}/{}", self.address(), path)
        }
    }

    /// 是否可以接收流量
    pub fn is_available(&self) -> bool {
        self.healthy && self.enabled
    }
}

/// `GET /nacos/v1/ns/instance/list` 的响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstanceList {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub group_name: Option<String>,

    #[serde(default)]
    pub clusters: Option<String>,

    #[serde(default)]
    pub cache_millis: Option<u64>,

    #[serde(default)]
    pub hosts: Vec<Instance>,

    #[serde(default)]
    pub last_ref_time: Option<u64>,
}

/// 心跳响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BeatResponse {
    #[serde(default)]
    pub client_beat_interval: Option<u64>,

    #[serde(default)]
    pub code: Option<i32>,

    #[serde(default)]
    pub light_beat_enabled: bool,
}

/// 客户端描述的实例，用于注册、注销、更新和心跳
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceSpec {
    pub service_name: String,
    pub ip: String,
    pub port: u16,
    pub weight: f64,
    pub enabled: bool,
    pub healthy: bool,
    pub ephemeral: bool,
    pub namespace_id: Option<String>,
    pub group_name: Option<String>,
    pub cluster_name: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl InstanceSpec {
    /// 创建新的实例描述（权重 1.0，临时实例）
    pub fn new(service_name: impl Into<String>, ip: impl Into<String>, port: u16) -> Self {
        Self {
            service_name: service_name.into(),
            ip: ip.into(),
            port,
            weight: 1.0,
            enabled: true,
            healthy: true,
            ephemeral: true,
            namespace_id: None,
            group_name: None,
            cluster_name: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.namespace_id = Some(namespace_id.into());
        self
    }

    pub fn with_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn with_cluster(mut self, cluster_name: impl Into<String>) -> Self {
        self.cluster_name = Some(cluster_name.into());
        self
    }

    pub fn with_ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// 添加元数据
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// 心跳使用的服务名：有分组时为 `group@@service`
    pub fn grouped_service_name(&self) -> String {
        match &self.group_name {
            Some(group) => format!("{}@@{}", group, self.service_name),
            None => self.service_name.clone(),
        }
    }

    /// 心跳请求中 `beat` 参数的 JSON 内容
    pub fn beat_payload(&self) -> serde_json::Value {
        let mut beat = serde_json::json!({
            "serviceName": self.grouped_service_name(),
            "ip": self.ip,
            "port": self.port,
            "weight": self.weight,
            "ephemeral": self.ephemeral,
        });
        if let Some(cluster) = &self.cluster_name {
            beat["cluster"] = serde_json::json!(cluster);
        }
        if !self.metadata.is_empty() {
            beat["metadata"] = serde_json::json!(self.metadata);
        }
        beat
    }
}

/// 元数据批量操作的一致性类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyType {
    Ephemeral,
    Persist,
}

impl ConsistencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyType::Ephemeral => "ephemeral",
            ConsistencyType::Persist => "persist",
        }
    }
}

/// 批量元数据操作作用的实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataTarget {
    pub ip: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
    pub ephemeral: bool,
}

impl From<&InstanceSpec> for MetadataTarget {
    fn from(spec: &InstanceSpec) -> Self {
        Self {
            ip: spec.ip.clone(),
            port: spec.port,
            cluster_name: spec.cluster_name.clone(),
            ephemeral: spec.ephemeral,
        }
    }
}

/// 批量更新或删除实例元数据
///
/// `instances` 为空时作用于服务下的全部实例。删除时只使用 `metadata` 的键。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataBatch {
    pub service_name: String,
    pub namespace_id: Option<String>,
    pub group_name: Option<String>,
    pub consistency_type: Option<ConsistencyType>,
    pub instances: Vec<MetadataTarget>,
    pub metadata: HashMap<String, String>,
}

impl MetadataBatch {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace_id: impl Into<String>) -> Self {
        self.namespace_id = Some(namespace_id.into());
        self
    }

    pub fn with_group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn with_consistency(mut self, consistency_type: ConsistencyType) -> Self {
        self.consistency_type = Some(consistency_type);
        self
    }

    pub fn with_instance(mut self, instance: &InstanceSpec) -> Self {
        self.instances.push(MetadataTarget::from(instance));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// 批量元数据操作的响应，`updated` 为受影响的实例标识
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataBatchResponse {
    #[serde(default)]
    pub updated: Vec<String>,
}
