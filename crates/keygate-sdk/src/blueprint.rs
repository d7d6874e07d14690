//! CIP-57 blueprint (`plutus.json`) loading.

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::script::{PlutusVersion, ScriptTemplate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preamble {
    pub title: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub plutus_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintValidator {
    pub title: String,
    pub compiled_code: String,
    #[serde(default)]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Blueprint {
    pub preamble: Preamble,
    pub validators: Vec<BlueprintValidator>,
}

impl Blueprint {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Blueprint(format!("invalid blueprint: {e}")))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Blueprint(format!("{}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn plutus_version(&self) -> Result<PlutusVersion> {
        match self.preamble.plutus_version.as_deref() {
            None | Some("v3") => Ok(PlutusVersion::V3),
            Some("v2") => Ok(PlutusVersion::V2),
            Some("v1") => Ok(PlutusVersion::V1),
            Some(other) => Err(Error::Blueprint(format!(
                "unsupported plutus version {other}"
            ))),
        }
    }

    /// The unapplied template for the validator named `title`.
    pub fn template(&self, title: &str) -> Result<ScriptTemplate> {
        let validator = self
            .validators
            .iter()
            .find(|v| v.title == title)
            .ok_or_else(|| {
                Error::Blueprint(format!(
                    "validator {title} not found in blueprint {}",
                    self.preamble.title
                ))
            })?;
        ScriptTemplate::from_hex(title, self.plutus_version()?, &validator.compiled_code)
    }
}
