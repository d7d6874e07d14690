//! Shelley address encoding (CIP-19): base, enterprise and reward addresses,
//! plus bech32 pool ids.

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::Hash28;
use crate::network::Network;

/// Header type nibble: reward address with a key stake credential.
const HEADER_REWARD_KEY: u8 = 0b1110;
/// Header type nibble: reward address with a script stake credential.
const HEADER_REWARD_SCRIPT: u8 = 0b1111;

pub const POOL_HRP: &str = "pool";

/// Payment or stake credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "hash")]
pub enum Credential {
    Key(Hash28),
    Script(Hash28),
}

impl Credential {
    pub fn hash(&self) -> &Hash28 {
        match self {
            Credential::Key(h) | Credential::Script(h) => h,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }
}

fn encode(hrp: &str, payload: &[u8]) -> Result<String> {
    bech32::encode(hrp, payload.to_base32(), Variant::Bech32)
        .map_err(|e| Error::Address(format!("bech32 encode: {e}")))
}

fn decode(s: &str) -> Result<(String, Vec<u8>)> {
    let (hrp, data, variant) =
        bech32::decode(s).map_err(|e| Error::Address(format!("bech32 decode: {e}")))?;
    if variant != Variant::Bech32 {
        return Err(Error::Address(format!("{s}: expected bech32, got bech32m")));
    }
    let bytes = Vec::<u8>::from_base32(&data)
        .map_err(|e| Error::Address(format!("bech32 payload: {e}")))?;
    Ok((hrp, bytes))
}

/// A bech32 Shelley payment address (`addr…` / `addr_test…`).
///
/// Addresses handed over by collaborators are carried verbatim; use
/// [`str::parse`] to validate one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap an address string received from a wallet or ledger query.
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Base address. The header type is `0b00sp`: `s` set for a script stake
    /// credential, `p` set for a script payment credential.
    pub fn base(network: Network, payment: Credential, stake: Credential) -> Result<Self> {
        let kind = (u8::from(stake.is_script()) << 1) | u8::from(payment.is_script());
        let mut payload = Vec::with_capacity(57);
        payload.push((kind << 4) | network.network_id());
        payload.extend_from_slice(payment.hash().as_bytes());
        payload.extend_from_slice(stake.hash().as_bytes());
        Ok(Self(encode(network.address_hrp(), &payload)?))
    }

    /// Base address whose payment and stake credentials are both scripts.
    pub fn script_base(network: Network, payment: Hash28, stake: Hash28) -> Result<Self> {
        Self::base(network, Credential::Script(payment), Credential::Script(stake))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payment credential from the address header.
    pub fn payment_credential(&self) -> Result<Credential> {
        let (_hrp, bytes) = decode(&self.0)?;
        let header = *bytes
            .first()
            .ok_or_else(|| Error::Address("empty address payload".into()))?;
        let kind = header >> 4;
        if kind > 0b0111 {
            return Err(Error::Address(format!("{}: not a payment address", self.0)));
        }
        let hash = Hash28::from_slice(
            bytes
                .get(1..29)
                .ok_or_else(|| Error::Address("address payload too short".into()))?,
        )?;
        Ok(if kind & 1 == 1 {
            Credential::Script(hash)
        } else {
            Credential::Key(hash)
        })
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hrp, bytes) = decode(s)?;
        if hrp != "addr" && hrp != "addr_test" {
            return Err(Error::Address(format!("{s}: unexpected prefix {hrp}")));
        }
        if bytes.len() < 29 {
            return Err(Error::Address(format!("{s}: payload too short")));
        }
        Ok(Self(s.to_string()))
    }
}

/// A bech32 reward (stake) address (`stake…` / `stake_test…`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardAddress(String);

impl RewardAddress {
    pub fn from_credential(network: Network, credential: Credential) -> Result<Self> {
        let kind = match credential {
            Credential::Key(_) => HEADER_REWARD_KEY,
            Credential::Script(_) => HEADER_REWARD_SCRIPT,
        };
        let mut payload = Vec::with_capacity(29);
        payload.push((kind << 4) | network.network_id());
        payload.extend_from_slice(credential.hash().as_bytes());
        Ok(Self(encode(network.reward_hrp(), &payload)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn credential(&self) -> Result<Credential> {
        let (_hrp, bytes) = decode(&self.0)?;
        if bytes.len() != 29 {
            return Err(Error::Address(format!("{}: bad reward payload", self.0)));
        }
        let hash = Hash28::from_slice(&bytes[1..])?;
        match bytes[0] >> 4 {
            HEADER_REWARD_KEY => Ok(Credential::Key(hash)),
            HEADER_REWARD_SCRIPT => Ok(Credential::Script(hash)),
            other => Err(Error::Address(format!(
                "{}: header type {other:#06b} is not a reward address",
                self.0
            ))),
        }
    }
}

impl std::fmt::Display for RewardAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RewardAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let addr = Self(s.to_string());
        addr.credential()?;
        Ok(addr)
    }
}

/// Stake pool id (hash of the pool operator key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(pub Hash28);

impl PoolId {
    pub fn from_bytes(bytes: [u8; 28]) -> Self {
        Self(Hash28(bytes))
    }

    pub fn to_bech32(&self) -> String {
        // 28 bytes under a fixed valid hrp cannot fail to encode.
        encode(POOL_HRP, self.0.as_bytes()).unwrap_or_else(|_| self.0.to_hex())
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

impl std::str::FromStr for PoolId {
    type Err = Error;

    /// Accepts `pool1…` bech32 or 56 hex characters.
    fn from_str(s: &str) -> Result<Self> {
        if s.len() == Hash28::LEN * 2 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Ok(Self(s.parse()?));
        }
        let (hrp, bytes) = decode(s)?;
        if hrp != POOL_HRP {
            return Err(Error::Address(format!("{s}: expected pool id")));
        }
        Ok(Self(Hash28::from_slice(&bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_base_address_shape() {
        let h = Hash28([0x11; 28]);
        let addr = Address::script_base(Network::Preprod, h, h).unwrap();
        assert!(addr.as_str().starts_with("addr_test1"));
        assert_eq!(addr.payment_credential().unwrap(), Credential::Script(h));
        let parsed: Address = addr.as_str().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn key_base_address_has_key_payment() {
        let addr = Address::base(
            Network::Preprod,
            Credential::Key(Hash28([0x01; 28])),
            Credential::Key(Hash28([0x02; 28])),
        )
        .unwrap();
        assert_eq!(
            addr.payment_credential().unwrap(),
            Credential::Key(Hash28([0x01; 28]))
        );
    }

    #[test]
    fn mainnet_uses_addr_prefix() {
        let h = Hash28([0x22; 28]);
        let addr = Address::script_base(Network::Mainnet, h, h).unwrap();
        assert!(addr.as_str().starts_with("addr1"));
    }

    #[test]
    fn reward_address_roundtrips_credential() {
        let cred = Credential::Script(Hash28([0x33; 28]));
        let ra = RewardAddress::from_credential(Network::Preview, cred).unwrap();
        assert!(ra.as_str().starts_with("stake_test1"));
        assert_eq!(ra.credential().unwrap(), cred);

        let key = Credential::Key(Hash28([0x33; 28]));
        let rk = RewardAddress::from_credential(Network::Preview, key).unwrap();
        assert_ne!(ra, rk);
        assert_eq!(rk.credential().unwrap(), key);
    }

    #[test]
    fn reward_address_is_not_a_payment_address() {
        let ra =
            RewardAddress::from_credential(Network::Preprod, Credential::Script(Hash28([1; 28])))
                .unwrap();
        assert!(ra.as_str().parse::<Address>().is_err());
    }

    #[test]
    fn pool_id_accepts_hex_and_bech32() {
        let pool = PoolId::from_bytes([0x42; 28]);
        let bech = pool.to_bech32();
        assert!(bech.starts_with("pool1"));
        assert_eq!(bech.parse::<PoolId>().unwrap(), pool);
        assert_eq!("42".repeat(28).parse::<PoolId>().unwrap(), pool);
        assert!("stake1xyz".parse::<PoolId>().is_err());
    }
}
