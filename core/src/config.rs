// Gate configuration — request field names and publish-path limits

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default content-type prefix marking a transport-encrypted body
pub const DEFAULT_ENCRYPTED_MARKER: &str = "application/x-chsec-json";

/// Default maximum request body: 1 MiB
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Header checked first for the token
    pub token_header: String,

    /// Query parameter checked second for the token
    pub token_query: String,

    /// Header carrying a user-key signature over the raw body
    pub user_signature_header: String,

    /// Header carrying a device-key signature over the raw body
    pub device_signature_header: String,

    /// Content-type prefix for transport-encrypted bodies
    pub encrypted_marker: String,

    /// Bodies above this size are rejected before decryption
    pub max_body_size: usize,

    /// Reject publish requests without a valid signature
    pub require_signature: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            token_header: "token".to_string(),
            token_query: "token".to_string(),
            user_signature_header: "CHUserSign".to_string(),
            device_signature_header: "CHDevSign".to_string(),
            encrypted_marker: DEFAULT_ENCRYPTED_MARKER.to_string(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            require_signature: false,
        }
    }
}

impl GateConfig {
    /// Load config from a JSON file. Missing fields take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: GateConfig =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the publish path cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.encrypted_marker.trim().is_empty() {
            // An empty prefix would route every body to the decryptor
            anyhow::bail!("encrypted_marker must not be empty");
        }
        if self.token_header.is_empty() || self.token_query.is_empty() {
            anyhow::bail!("token_header and token_query must not be empty");
        }
        Ok(())
    }

    /// Save config to a JSON file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Set a config value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "token_header" | "token_query" if value.is_empty() => {
                anyhow::bail!("{} must not be empty", key)
            }
            "token_header" => self.token_header = value.to_string(),
            "token_query" => self.token_query = value.to_string(),
            "user_signature_header" => self.user_signature_header = value.to_string(),
            "device_signature_header" => self.device_signature_header = value.to_string(),
            "encrypted_marker" => {
                if value.trim().is_empty() {
                    anyhow::bail!("encrypted_marker must not be empty");
                }
                self.encrypted_marker = value.to_string();
            }
            "max_body_size" => {
                self.max_body_size = value.parse().context("Invalid body size")?;
            }
            "require_signature" => {
                self.require_signature = value.parse().context("Invalid boolean value")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    /// Get a config value by key
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "token_header" => Some(self.token_header.clone()),
            "token_query" => Some(self.token_query.clone()),
            "user_signature_header" => Some(self.user_signature_header.clone()),
            "device_signature_header" => Some(self.device_signature_header.clone()),
            "encrypted_marker" => Some(self.encrypted_marker.clone()),
            "max_body_size" => Some(self.max_body_size.to_string()),
            "require_signature" => Some(self.require_signature.to_string()),
            _ => None,
        }
    }

    /// All (key, value) pairs, in display order
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        [
            "token_header",
            "token_query",
            "user_signature_header",
            "device_signature_header",
            "encrypted_marker",
            "max_body_size",
            "require_signature",
        ]
        .into_iter()
        .filter_map(|key| self.get(key).map(|value| (key, value)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.token_header, "token");
        assert_eq!(config.user_signature_header, "CHUserSign");
        assert_eq!(config.device_signature_header, "CHDevSign");
        assert_eq!(config.encrypted_marker, "application/x-chsec-json");
        assert!(!config.require_signature);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");

        let mut config = GateConfig::default();
        config.set("require_signature", "true").unwrap();
        config.set("max_body_size", "2048").unwrap();
        config.save_to(&path).unwrap();

        let loaded = GateConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.max_body_size, 2048);
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"token_header":"X-Token"}"#).unwrap();

        let loaded = GateConfig::load_from(&path).unwrap();
        assert_eq!(loaded.token_header, "X-Token");
        assert_eq!(loaded.token_query, "token");
    }

    #[test]
    fn test_set_rejects_unknown_and_invalid() {
        let mut config = GateConfig::default();
        assert!(config.set("nope", "1").is_err());
        assert!(config.set("max_body_size", "lots").is_err());
        assert!(config.set("require_signature", "maybe").is_err());
    }

    #[test]
    fn test_empty_marker_rejected() {
        let mut config = GateConfig::default();
        assert!(config.set("encrypted_marker", "").is_err());
        assert!(config.set("encrypted_marker", "   ").is_err());
        assert_eq!(config.encrypted_marker, DEFAULT_ENCRYPTED_MARKER);
        assert!(config.set("token_header", "").is_err());

        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"encrypted_marker":""}"#).unwrap();
        assert!(GateConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_entries_cover_every_key() {
        let config = GateConfig::default();
        let entries = config.entries();
        assert_eq!(entries.len(), 7);
        assert!(entries.iter().all(|(key, _)| config.get(key).is_some()));
    }
}
