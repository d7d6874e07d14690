//! Ledger vocabulary shared by every module: hashes, output references,
//! multi-asset values and UTXOs.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::address::Address;
use crate::error::{Error, Result};

/// Lovelace per ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Maximum length of an asset name in bytes.
pub const MAX_ASSET_NAME_LEN: usize = 32;

macro_rules! hex_hash {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                let arr: [u8; $len] = bytes.try_into().map_err(|_| {
                    Error::Address(format!(
                        "{} must be {} bytes, got {}",
                        stringify!($name),
                        $len,
                        bytes.len()
                    ))
                })?;
                Ok(Self(arr))
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                for byte in &self.0 {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                let bytes = hex::decode(s).map_err(|e| {
                    Error::Address(format!("bad {} hex: {e}", stringify!($name)))
                })?;
                Self::from_slice(&bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_hash!(
    /// Transaction id (blake2b-256 of the transaction body).
    TxHash,
    32
);

hex_hash!(
    /// Minting policy id: the hash of the policy script.
    PolicyId,
    28
);

hex_hash!(
    /// 28-byte hash backing a payment or stake credential.
    Hash28,
    28
);

/// Reference to a transaction output: `(tx_hash, index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutputRef {
    pub tx_hash: TxHash,
    pub index: u32,
}

impl OutputRef {
    pub fn new(tx_hash: TxHash, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

/// Native asset name, at most 32 raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetName(Vec<u8>);

impl AssetName {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() > MAX_ASSET_NAME_LEN {
            return Err(Error::Script(format!(
                "asset name is {} bytes, max {MAX_ASSET_NAME_LEN}",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Asset name from a human label, taking its UTF-8 bytes.
    pub fn from_label(label: &str) -> Result<Self> {
        Self::new(label.as_bytes().to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// The label if the name is valid UTF-8.
    pub fn label(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl std::fmt::Display for AssetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for AssetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        AssetName::new(bytes).map_err(serde::de::Error::custom)
    }
}

/// A native asset unit: policy id followed by asset name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetUnit {
    pub policy_id: PolicyId,
    pub asset_name: AssetName,
}

impl AssetUnit {
    pub fn new(policy_id: PolicyId, asset_name: AssetName) -> Self {
        Self {
            policy_id,
            asset_name,
        }
    }
}

impl std::fmt::Display for AssetUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.policy_id, self.asset_name)
    }
}

impl std::str::FromStr for AssetUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::Script(format!("bad unit hex: {e}")))?;
        if bytes.len() < PolicyId::LEN {
            return Err(Error::Script(format!("unit too short: {s}")));
        }
        let (policy, name) = bytes.split_at(PolicyId::LEN);
        Ok(Self {
            policy_id: PolicyId::from_slice(policy)?,
            asset_name: AssetName::new(name.to_vec())?,
        })
    }
}

impl Serialize for AssetUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Lovelace plus native assets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub lovelace: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub assets: BTreeMap<AssetUnit, u64>,
}

impl Value {
    pub fn lovelace(lovelace: u64) -> Self {
        Self {
            lovelace,
            assets: BTreeMap::new(),
        }
    }

    /// Add `quantity` of `unit`, failing with `ValueOverflow` past `u64::MAX`.
    pub fn with_asset(mut self, unit: AssetUnit, quantity: u64) -> Result<Self> {
        if quantity > 0 {
            let slot = self.assets.entry(unit).or_insert(0);
            *slot = slot.checked_add(quantity).ok_or(Error::ValueOverflow)?;
        }
        Ok(self)
    }

    pub fn quantity_of(&self, unit: &AssetUnit) -> u64 {
        self.assets.get(unit).copied().unwrap_or(0)
    }

    /// `true` if any asset under `policy_id` is present.
    pub fn holds_policy(&self, policy_id: &PolicyId) -> bool {
        self.assets
            .iter()
            .any(|(unit, qty)| unit.policy_id == *policy_id && *qty > 0)
    }

    pub fn is_zero(&self) -> bool {
        self.lovelace == 0 && self.assets.values().all(|q| *q == 0)
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        out.lovelace = out.lovelace.checked_add(other.lovelace)?;
        for (unit, qty) in &other.assets {
            let slot = out.assets.entry(unit.clone()).or_insert(0);
            *slot = slot.checked_add(*qty)?;
        }
        Some(out)
    }

    /// Subtract `other`, failing if any component would go negative.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        out.lovelace = out.lovelace.checked_sub(other.lovelace)?;
        for (unit, qty) in &other.assets {
            let have = out.assets.get(unit).copied().unwrap_or(0);
            let left = have.checked_sub(*qty)?;
            if left == 0 {
                out.assets.remove(unit);
            } else {
                out.assets.insert(unit.clone(), left);
            }
        }
        Some(out)
    }

    /// Sum a sequence of values.
    pub fn sum<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<Value> {
        values
            .into_iter()
            .try_fold(Value::default(), |acc, v| acc.checked_add(v))
            .ok_or(Error::ValueOverflow)
    }
}

/// An unspent transaction output as reported by a ledger query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub output_ref: OutputRef,
    pub address: Address,
    pub value: Value,
}

impl Utxo {
    pub fn holds(&self, unit: &AssetUnit) -> bool {
        self.value.quantity_of(unit) > 0
    }
}

/// Parse a decimal ADA amount (e.g. `"5.25"`) into lovelace without floats.
pub fn parse_ada(input: &str) -> Result<u64> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::InvalidAmount("empty amount".into()));
    }
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if frac.len() > 6 {
        return Err(Error::InvalidAmount(format!(
            "{input}: more than 6 decimal places"
        )));
    }
    let is_digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(frac) || (whole.is_empty() && frac.is_empty()) {
        return Err(Error::InvalidAmount(format!("{input}: not a decimal number")));
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole
            .parse()
            .map_err(|e| Error::InvalidAmount(format!("{input}: {e}")))?
    };
    let frac_lovelace: u64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{frac:0<6}");
        padded
            .parse()
            .map_err(|e| Error::InvalidAmount(format!("{input}: {e}")))?
    };

    whole
        .checked_mul(LOVELACE_PER_ADA)
        .and_then(|v| v.checked_add(frac_lovelace))
        .ok_or_else(|| Error::InvalidAmount(format!("{input}: overflow")))
}
