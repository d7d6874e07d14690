use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::address::Address;
use crate::error::{Error, Result};
use crate::ledger::{AssetUnit, OutputRef, TxHash, Utxo, Value};

/// Blockfrost returns at most this many items per page.
const PAGE_SIZE: usize = 100;

/// Point-in-time ledger lookups. Nothing here caches.
pub trait ChainBackend: Send + Sync {
    /// All unspent outputs at `address`.
    fn utxos_at(&self, address: &Address) -> Result<Vec<Utxo>>;

    /// Unspent outputs at `address` that hold at least one `unit`.
    fn utxos_at_with_unit(&self, address: &Address, unit: &AssetUnit) -> Result<Vec<Utxo>>;
}

/// Blockfrost-based chain backend.
///
/// A fresh blocking HTTP client is created per call.
#[derive(Debug, Clone)]
pub struct BlockfrostBackend {
    base_url: String,
    project_id: String,
    timeout: Option<Duration>,
}

impl BlockfrostBackend {
    pub fn new(base_url: &str, project_id: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id: project_id.to_string(),
            timeout: None,
        }
    }

    /// Bound every request by `timeout`. Without one a stalled request blocks
    /// its action indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path`, returning `None` on 404.
    pub(crate) fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<Option<T>, String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| e.to_string())?;
        let url = format!("{}{path}", self.base_url);
        let resp = client
            .get(&url)
            .header("project_id", &self.project_id)
            .send()
            .map_err(|e| format!("GET {url}: {e}"))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| format!("GET {url}: {e}"))?;
        resp.json::<T>()
            .map(Some)
            .map_err(|e| format!("GET {url}: bad response body: {e}"))
    }

    fn paged_utxos(&self, path: &str) -> Result<Vec<Utxo>> {
        let mut utxos = Vec::new();
        for page in 1.. {
            let entries: Vec<BlockfrostUtxo> = self
                .get_json(&format!("{path}?page={page}&count={PAGE_SIZE}"))
                .map_err(Error::Query)?
                .unwrap_or_default();
            let last = entries.len() < PAGE_SIZE;
            for entry in entries {
                if let Some(utxo) = entry.into_utxo() {
                    utxos.push(utxo);
                }
            }
            if last {
                break;
            }
        }
        log::debug!("blockfrost {path}: {} utxos", utxos.len());
        Ok(utxos)
    }
}

impl ChainBackend for BlockfrostBackend {
    fn utxos_at(&self, address: &Address) -> Result<Vec<Utxo>> {
        self.paged_utxos(&format!("/addresses/{address}/utxos"))
    }

    fn utxos_at_with_unit(&self, address: &Address, unit: &AssetUnit) -> Result<Vec<Utxo>> {
        self.paged_utxos(&format!("/addresses/{address}/utxos/{unit}"))
    }
}

// ── Blockfrost wire format ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BlockfrostAmount {
    unit: String,
    quantity: String,
}

#[derive(Debug, Deserialize)]
struct BlockfrostUtxo {
    address: String,
    tx_hash: String,
    output_index: u32,
    amount: Vec<BlockfrostAmount>,
}

impl BlockfrostUtxo {
    /// Skips (with a warning) entries whose hash or amounts do not parse.
    fn into_utxo(self) -> Option<Utxo> {
        let tx_hash: TxHash = match self.tx_hash.parse() {
            Ok(h) => h,
            Err(e) => {
                log::warn!("skipping utxo with bad tx_hash {}: {e}", self.tx_hash);
                return None;
            }
        };
        let output_ref = OutputRef::new(tx_hash, self.output_index);
        let value = match parse_amounts(&self.amount) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("skipping utxo {output_ref}: {e}");
                return None;
            }
        };
        Some(Utxo {
            output_ref,
            address: Address::from_raw(self.address),
            value,
        })
    }
}

fn parse_amounts(amounts: &[BlockfrostAmount]) -> Result<Value> {
    let mut value = Value::default();
    for amount in amounts {
        let quantity: u64 = amount
            .quantity
            .parse()
            .map_err(|e| Error::Query(format!("quantity {}: {e}", amount.quantity)))?;
        if amount.unit == "lovelace" {
            value.lovelace = value
                .lovelace
                .checked_add(quantity)
                .ok_or(Error::ValueOverflow)?;
        } else {
            let unit: AssetUnit = amount
                .unit
                .parse()
                .map_err(|e| Error::Query(format!("unit {}: {e}", amount.unit)))?;
            value = value.with_asset(unit, quantity)?;
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AssetName, PolicyId};

    fn utxo_json(tx_hash: &str, quantity: &str) -> String {
        format!(
            r#"{{
                "address": "addr_test1qz",
                "tx_hash": "{tx_hash}",
                "output_index": 1,
                "amount": [
                    {{ "unit": "lovelace", "quantity": "{quantity}" }},
                    {{ "unit": "{}414c504841", "quantity": "1" }}
                ],
                "block": "abc",
                "data_hash": null
            }}"#,
            "ab".repeat(28)
        )
    }

    #[test]
    fn parses_blockfrost_utxo() {
        let json = utxo_json(&"11".repeat(32), "5000000");
        let entry: BlockfrostUtxo = serde_json::from_str(&json).unwrap();
        let utxo = entry.into_utxo().unwrap();
        assert_eq!(utxo.output_ref.index, 1);
        assert_eq!(utxo.value.lovelace, 5_000_000);
        let unit = AssetUnit::new(PolicyId([0xab; 28]), AssetName::from_label("ALPHA").unwrap());
        assert!(utxo.holds(&unit));
    }

    #[test]
    fn skips_malformed_entries() {
        let bad_amount: BlockfrostUtxo =
            serde_json::from_str(&utxo_json(&"11".repeat(32), "lots")).unwrap();
        assert!(bad_amount.into_utxo().is_none());
        let bad_hash: BlockfrostUtxo = serde_json::from_str(&utxo_json("zz", "1")).unwrap();
        assert!(bad_hash.into_utxo().is_none());
    }

    #[test]
    fn overflowing_asset_quantities_are_skipped() {
        let unit = format!("{}414c504841", "ab".repeat(28));
        let json = format!(
            r#"{{
                "address": "addr_test1qz",
                "tx_hash": "{}",
                "output_index": 0,
                "amount": [
                    {{ "unit": "{unit}", "quantity": "{}" }},
                    {{ "unit": "{unit}", "quantity": "1" }}
                ]
            }}"#,
            "11".repeat(32),
            u64::MAX
        );
        let entry: BlockfrostUtxo = serde_json::from_str(&json).unwrap();
        assert!(entry.into_utxo().is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = BlockfrostBackend::new("https://example.invalid/api/v0/", "pid");
        assert_eq!(backend.base_url(), "https://example.invalid/api/v0");
    }
}
