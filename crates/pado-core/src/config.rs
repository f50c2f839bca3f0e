//! Client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{EncryptionSchema, PaymentSymbol, StorageType};

/// Schema version for ledger records and tasks
pub const SCHEMA_VERSION: u32 = 1;

/// Configuration for talking to the gateway and paying for tasks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Gateway exposing the ledger, task, price, transfer and storage routes
    pub gateway_url: String,
    /// Local sidecar performing encryption and reconstruction
    pub cipher_url: String,
    /// Storage backend new data is uploaded to
    #[serde(default = "default_storage_type")]
    pub storage_type: StorageType,
    /// Process that receives task fees
    pub tasks_process_id: String,
    /// Token process fees are paid from, per symbol
    pub aocred_process_id: String,
    pub war_process_id: String,
    /// Resource limits attached to every submitted task
    #[serde(default = "default_compute_limit")]
    pub compute_limit: String,
    #[serde(default = "default_memory_limit")]
    pub memory_limit: String,
    /// Completion poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Default completion timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Threshold schema used when registering data
    #[serde(default)]
    pub encryption_schema: EncryptionSchema,
    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_storage_type() -> StorageType {
    StorageType::Arweave
}

fn default_compute_limit() -> String {
    crate::constants::COMPUTE_LIMIT.to_string()
}

fn default_memory_limit() -> String {
    crate::constants::MEMORY_LIMIT.to_string()
}

fn default_poll_interval_ms() -> u64 {
    crate::constants::POLL_INTERVAL_MS
}

fn default_timeout_ms() -> u64 {
    crate::constants::DEFAULT_TIMEOUT_MS
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl ClientConfig {
    /// Configuration for a local devnet gateway on `gateway_url`
    pub fn devnet(gateway_url: impl Into<String>) -> Self {
        Self {
            gateway_url: gateway_url.into().trim_end_matches('/').to_string(),
            cipher_url: "http://127.0.0.1:8090".into(),
            storage_type: StorageType::Devnet,
            tasks_process_id: crate::constants::DEVNET_TASKS_PROCESS.into(),
            aocred_process_id: crate::constants::DEVNET_AOCRED_PROCESS.into(),
            war_process_id: crate::constants::DEVNET_WAR_PROCESS.into(),
            compute_limit: default_compute_limit(),
            memory_limit: default_memory_limit(),
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
            encryption_schema: EncryptionSchema::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn with_cipher_url(mut self, url: impl Into<String>) -> Self {
        self.cipher_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_schema(mut self, schema: EncryptionSchema) -> Self {
        self.encryption_schema = schema;
        self
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        for (name, url) in [("gateway_url", &self.gateway_url), ("cipher_url", &self.cipher_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(crate::Error::Config(format!("{} must be an http(s) URL, got {:?}", name, url)));
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(crate::Error::Config("poll_interval_ms must be positive".into()));
        }
        if self.tasks_process_id.is_empty() {
            return Err(crate::Error::Config("tasks_process_id is required".into()));
        }
        self.encryption_schema.validate()
    }

    /// Token process a fee in `symbol` is transferred from
    pub fn token_process(&self, symbol: PaymentSymbol) -> &str {
        match symbol {
            PaymentSymbol::Aocred => &self.aocred_process_id,
            PaymentSymbol::War => &self.war_process_id,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::devnet("http://127.0.0.1:3000")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.encryption_schema, EncryptionSchema { t: 2, n: 3 });
    }

    #[test]
    fn test_devnet_trims_trailing_slash() {
        let config = ClientConfig::devnet("http://localhost:3000/");
        assert_eq!(config.gateway_url, "http://localhost:3000");
    }

    #[test]
    fn test_token_process_per_symbol() {
        let config = ClientConfig::default();
        assert_eq!(config.token_process(PaymentSymbol::Aocred), config.aocred_process_id);
        assert_eq!(config.token_process(PaymentSymbol::War), config.war_process_id);
        assert_ne!(config.aocred_process_id, config.war_process_id);
    }

    #[test]
    fn test_load_fills_defaults() {
        let json = r#"{
            "gateway_url": "http://gw",
            "cipher_url": "http://cipher",
            "tasks_process_id": "tasks",
            "aocred_process_id": "aocred",
            "war_process_id": "war"
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, json).unwrap();

        let config = ClientConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.storage_type, StorageType::Arweave);
        assert_eq!(config.compute_limit, crate::constants::COMPUTE_LIMIT);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = ClientConfig::default().with_timeout(Duration::from_secs(3));
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded.timeout_ms, 3000);
        assert_eq!(loaded.gateway_url, config.gateway_url);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = ClientConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }
}
