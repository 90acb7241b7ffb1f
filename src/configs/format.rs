//! 配置内容解析
//!
//! 服务端只存文本；需要结构化值时按格式解析成 `serde_json::Value`。

use serde_json::Value;

use crate::error::{NacosError, Result};

/// 配置内容格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContentFormat {
    /// 原样返回字符串
    #[default]
    Text,
    Json,
    Toml,
    Yaml,
    /// 依次尝试 JSON、TOML、YAML，都失败时按文本返回
    Auto,
}

impl ContentFormat {
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self {
            ContentFormat::Text => Ok(Value::String(content.to_string())),
            ContentFormat::Json => serde_json::from_str(content).map_err(|e| {
                NacosError::Serialization(format!("cannot parse content as json: {}", e))
            }),
            ContentFormat::Toml => toml::from_str(content).map_err(|e| {
                NacosError::Serialization(format!("cannot parse content as toml: {}", e))
            }),
            ContentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| {
                NacosError::Serialization(format!("cannot parse content as yaml: {}", e))
            }),
            ContentFormat::Auto => ContentFormat::Json
                .parse(content)
                .or_else(|_| ContentFormat::Toml.parse(content))
                .or_else(|_| ContentFormat::Yaml.parse(content))
                .or_else(|_| ContentFormat::Text.parse(content)),
        }
    }
}

impl std::str::FromStr for ContentFormat {
    type Err = NacosError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "html" | "xml" | "properties" => Ok(ContentFormat::Text),
            "json" => Ok(ContentFormat::Json),
            "toml" => Ok(ContentFormat::Toml),
            "yaml" | "yml" => Ok(ContentFormat::Yaml),
            "auto" => Ok(ContentFormat::Auto),
            _ => Err(NacosError::Config(format!("unknown content format: {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auto_prefers_json_then_toml_then_yaml_then_text() {
        assert_eq!(ContentFormat::Auto.parse(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
        assert_eq!(
            ContentFormat::Auto.parse("a = 1\n[foo]\nb = 2").unwrap(),
            json!({"a": 1, "foo": {"b": 2}})
        );
        assert_eq!(ContentFormat::Auto.parse("a: 1").unwrap(), json!({"a": 1}));
        assert_eq!(
            ContentFormat::Auto.parse("a: 1\nfoo:\n  b: 2").unwrap(),
            json!({"a": 1, "foo": {"b": 2}})
        );
        assert_eq!(ContentFormat::Auto.parse("1234").unwrap(), json!(1234));
        assert_eq!(
            ContentFormat::Auto.parse("<p>hello nacos</p>").unwrap(),
            json!("<p>hello nacos</p>")
        );
    }

    #[test]
    fn yaml_documents() {
        assert_eq!(
            ContentFormat::Yaml.parse("a: 1\nfoo:\n  b: 2").unwrap(),
            json!({"a": 1, "foo": {"b": 2}})
        );
        assert!(matches!(
            ContentFormat::Yaml.parse("a: [1, 2"),
            Err(NacosError::Serialization(_))
        ));
    }

    #[test]
    fn strict_formats_reject_garbage() {
        assert!(matches!(
            ContentFormat::Json.parse("a = 1"),
            Err(NacosError::Serialization(_))
        ));
        assert!(matches!(
            ContentFormat::Toml.parse("{not toml"),
            Err(NacosError::Serialization(_))
        ));
    }

    #[test]
    fn format_names() {
        assert_eq!("JSON".parse::<ContentFormat>().unwrap(), ContentFormat::Json);
        assert_eq!("html".parse::<ContentFormat>().unwrap(), ContentFormat::Text);
        assert_eq!("yml".parse::<ContentFormat>().unwrap(), ContentFormat::Yaml);
        assert_eq!("YAML".parse::<ContentFormat>().unwrap(), ContentFormat::Yaml);
        assert!("ini".parse::<ContentFormat>().is_err());
    }
}
