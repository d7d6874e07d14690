use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blueprint::Blueprint;
use crate::chain::BlockfrostBackend;
use crate::error::{Error, Result};
use crate::governance::KoiosClient;
use crate::network::Network;
use crate::sdk::ScriptTemplates;

pub const DEFAULT_KEY_POLICY_TITLE: &str = "key.key.mint";
pub const DEFAULT_TREASURY_TITLE: &str = "dry.dry.spend";
pub const DEFAULT_BLUEPRINT_PATH: &str = "plutus.json";
/// Slot name the key token is stored under.
pub const DEFAULT_KEY_SLOT: &str = "KEY";

/// Where the recorded key token lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KeyStoreConfig {
    /// Forgotten when the process exits.
    Session,
    /// SQLite file that survives restarts.
    Durable {
        path: PathBuf,
        #[serde(default = "default_slot")]
        slot: String,
    },
}

fn default_slot() -> String {
    DEFAULT_KEY_SLOT.to_string()
}

/// Deployment configuration, read from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeygateConfig {
    pub network: Network,
    /// Defaults to the network's public Blockfrost endpoint.
    pub blockfrost_url: Option<String>,
    pub blockfrost_project_id: String,
    /// Defaults to the network's public Koios endpoint.
    pub koios_url: Option<String>,
    pub blueprint_path: PathBuf,
    pub key_policy_title: String,
    pub treasury_title: String,
    pub key_store: KeyStoreConfig,
    /// Per-request HTTP timeout. `None` leaves requests unbounded.
    pub request_timeout_secs: Option<u64>,
}

impl Default for KeygateConfig {
    fn default() -> Self {
        Self {
            network: Network::Preprod,
            blockfrost_url: None,
            blockfrost_project_id: String::new(),
            koios_url: None,
            blueprint_path: PathBuf::from(DEFAULT_BLUEPRINT_PATH),
            key_policy_title: DEFAULT_KEY_POLICY_TITLE.to_string(),
            treasury_title: DEFAULT_TREASURY_TITLE.to_string(),
            key_store: KeyStoreConfig::Session,
            request_timeout_secs: None,
        }
    }
}

impl KeygateConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key_policy_title.is_empty() || self.treasury_title.is_empty() {
            return Err(Error::Config("validator titles must not be empty".into()));
        }
        if self.key_policy_title == self.treasury_title {
            return Err(Error::Config(
                "key policy and treasury must be different validators".into(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(Error::Config("request_timeout_secs must be positive".into()));
        }
        if let KeyStoreConfig::Durable { path, slot } = &self.key_store
            && (path.as_os_str().is_empty() || slot.is_empty())
        {
            return Err(Error::Config("durable key store needs a path and slot".into()));
        }
        Ok(())
    }

    pub fn blockfrost_url(&self) -> &str {
        self.blockfrost_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_blockfrost_url())
    }

    pub fn koios_url(&self) -> &str {
        self.koios_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_koios_url())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn blockfrost(&self) -> BlockfrostBackend {
        BlockfrostBackend::new(self.blockfrost_url(), &self.blockfrost_project_id)
            .with_timeout(self.request_timeout())
    }

    pub fn koios(&self) -> KoiosClient {
        KoiosClient::new(self.koios_url()).with_timeout(self.request_timeout())
    }

    /// Load both validator templates from the configured blueprint.
    pub fn load_templates(&self) -> Result<ScriptTemplates> {
        let blueprint = Blueprint::from_file(&self.blueprint_path)?;
        Ok(ScriptTemplates {
            key_policy: blueprint.template(&self.key_policy_title)?,
            treasury: blueprint.template(&self.treasury_title)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = KeygateConfig::from_json("{}").unwrap();
        assert_eq!(config, KeygateConfig::default());
        assert_eq!(config.network, Network::Preprod);
        assert_eq!(config.key_store, KeyStoreConfig::Session);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.blockfrost_url(), Network::Preprod.default_blockfrost_url());
    }

    #[test]
    fn parses_durable_store_with_default_slot() {
        let config = KeygateConfig::from_json(
            r#"{
                "network": "mainnet",
                "blockfrost_project_id": "mainnetXYZ",
                "key_store": { "kind": "durable", "path": "keys.sqlite3" },
                "request_timeout_secs": 20
            }"#,
        )
        .unwrap();
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(
            config.key_store,
            KeyStoreConfig::Durable {
                path: PathBuf::from("keys.sqlite3"),
                slot: "KEY".into(),
            }
        );
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(config.koios_url(), "https://api.koios.rest/api/v1");
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(KeygateConfig::from_json(r#"{ "network": "devnet" }"#).is_err());
        assert!(KeygateConfig::from_json(r#"{ "request_timeout_secs": 0 }"#).is_err());
        assert!(
            KeygateConfig::from_json(r#"{ "key_policy_title": "x", "treasury_title": "x" }"#)
                .is_err()
        );
    }

    #[test]
    fn loads_templates_from_blueprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plutus.json");
        std::fs::write(
            &path,
            r#"{ "preamble": { "title": "t", "plutusVersion": "v3" },
                 "validators": [
                   { "title": "key.key.mint", "compiledCode": "01" },
                   { "title": "dry.dry.spend", "compiledCode": "02" } ] }"#,
        )
        .unwrap();
        let config = KeygateConfig {
            blueprint_path: path,
            ..KeygateConfig::default()
        };
        let templates = config.load_templates().unwrap();
        assert_eq!(templates.key_policy.title(), "key.key.mint");
        assert_eq!(templates.treasury.title(), "dry.dry.spend");
    }
}
