//! Governance delegates (DReps) and their lookup through Koios.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::Credential;
use crate::error::{Error, Result};
use crate::ledger::Hash28;

/// Where a stake credential's voting power goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DRep {
    AlwaysAbstain,
    AlwaysNoConfidence,
    Credential(Credential),
}

impl std::fmt::Display for DRep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DRep::AlwaysAbstain => write!(f, "abstain"),
            DRep::AlwaysNoConfidence => write!(f, "no-confidence"),
            DRep::Credential(Credential::Key(h)) => write!(f, "key:{h}"),
            DRep::Credential(Credential::Script(h)) => write!(f, "script:{h}"),
        }
    }
}

impl std::str::FromStr for DRep {
    type Err = Error;

    /// Accepts `abstain`, `no-confidence`, `key:<hex>` and `script:<hex>`.
    /// Bech32 `drep1…` ids need a [`KoiosClient`] lookup.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abstain" | "always-abstain" => return Ok(DRep::AlwaysAbstain),
            "no-confidence" | "always-no-confidence" => return Ok(DRep::AlwaysNoConfidence),
            _ => {}
        }
        let (kind, hash) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| Error::Governance(format!("unrecognised drep {s}")))?;
        let hash: Hash28 = hash
            .parse()
            .map_err(|e| Error::Governance(format!("drep {s}: {e}")))?;
        match kind {
            "key" => Ok(DRep::Credential(Credential::Key(hash))),
            "script" => Ok(DRep::Credential(Credential::Script(hash))),
            other => Err(Error::Governance(format!("unknown drep kind {other}"))),
        }
    }
}

#[derive(Debug, Serialize)]
struct DRepInfoRequest<'a> {
    #[serde(rename = "_drep_ids")]
    drep_ids: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct DRepInfo {
    hex: String,
    has_script: bool,
}

impl DRepInfo {
    fn credential(&self) -> Result<Credential> {
        let hash: Hash28 = self
            .hex
            .parse()
            .map_err(|e| Error::Governance(format!("drep hex {}: {e}", self.hex)))?;
        Ok(if self.has_script {
            Credential::Script(hash)
        } else {
            Credential::Key(hash)
        })
    }
}

/// Koios REST client for DRep lookups.
#[derive(Debug, Clone)]
pub struct KoiosClient {
    base_url: String,
    timeout: Option<Duration>,
}

impl KoiosClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a `drep1…` id to its credential.
    pub fn drep_credential(&self, drep_id: &str) -> Result<Credential> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Governance(e.to_string()))?;
        let url = format!("{}/drep_info", self.base_url);
        let infos: Vec<DRepInfo> = client
            .post(&url)
            .json(&DRepInfoRequest {
                drep_ids: [drep_id],
            })
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Governance(format!("POST {url}: {e}")))?
            .json()
            .map_err(|e| Error::Governance(format!("POST {url}: bad response body: {e}")))?;
        let info = infos
            .first()
            .ok_or_else(|| Error::Governance(format!("drep {drep_id} not found")))?;
        info.credential()
    }

    /// Like [`DRep::from_str`](std::str::FromStr), but also resolves `drep1…` ids.
    pub fn resolve_drep(&self, input: &str) -> Result<DRep> {
        if input.trim().starts_with("drep1") {
            return Ok(DRep::Credential(self.drep_credential(input.trim())?));
        }
        input.parse()
    }
}
