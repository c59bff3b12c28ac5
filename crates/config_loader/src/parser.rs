//! Config parsing
//!
//! TOML (primary) and JSON (optional).

use contracts::{ContractError, RelayConfig};

/// Config file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML config
pub fn parse_toml(content: &str) -> Result<RelayConfig, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON config
pub fn parse_json(content: &str) -> Result<RelayConfig, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::StorageKind;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[producer]
receiver_addr = "10.0.0.2:50051"
sensor_type = "Humidity"
interval_ms = 250

[receiver]
worker_count = 4

[receiver.storage]
kind = "memory"
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.producer.receiver_addr, "10.0.0.2:50051");
        assert_eq!(config.producer.sensor_type, "Humidity");
        assert_eq!(config.producer.interval_ms, 250);
        // untouched fields keep their defaults
        assert_eq!(config.producer.id1, "A");
        assert_eq!(config.receiver.worker_count, 4);
        assert_eq!(config.receiver.inbound_capacity, 1000);
        assert_eq!(config.receiver.storage.kind, StorageKind::Memory);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "producer": { "id1": "B", "id2": "7" },
            "shutdown": { "timeout_ms": 8000 },
            "receiver": { "storage": { "kind": "json_lines", "path": "/tmp/out.jsonl" } }
        }"#;
        let config = parse_json(content).unwrap();
        assert_eq!(config.producer.id1, "B");
        assert_eq!(config.producer.id2, "7");
        assert_eq!(config.shutdown.timeout_ms, 8000);
        assert_eq!(config.receiver.storage.kind, StorageKind::JsonLines);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_unknown_storage_kind() {
        let content = r#"
[receiver.storage]
kind = "postgres"
"#;
        assert!(parse_toml(content).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
