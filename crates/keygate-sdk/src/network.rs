use serde::{Deserialize, Serialize};

/// Cardano networks the SDK can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Preprod,
    Preview,
}

impl Network {
    pub fn is_mainnet(self) -> bool {
        matches!(self, Network::Mainnet)
    }

    /// Network id carried in the low nibble of every Shelley address header.
    pub fn network_id(self) -> u8 {
        match self {
            Network::Mainnet => 1,
            Network::Preprod | Network::Preview => 0,
        }
    }

    pub fn address_hrp(self) -> &'static str {
        if self.is_mainnet() { "addr" } else { "addr_test" }
    }

    pub fn reward_hrp(self) -> &'static str {
        if self.is_mainnet() { "stake" } else { "stake_test" }
    }

    pub fn default_blockfrost_url(self) -> &'static str {
        match self {
            Network::Mainnet => "https://cardano-mainnet.blockfrost.io/api/v0",
            Network::Preprod => "https://cardano-preprod.blockfrost.io/api/v0",
            Network::Preview => "https://cardano-preview.blockfrost.io/api/v0",
        }
    }

    pub fn default_koios_url(self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.koios.rest/api/v1",
            Network::Preprod => "https://preprod.koios.rest/api/v1",
            Network::Preview => "https://preview.koios.rest/api/v1",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Preprod => "preprod",
            Network::Preview => "preview",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mainnet" | "cardano" | "cardano-mainnet" => Ok(Network::Mainnet),
            "preprod" | "cardano-preprod" => Ok(Network::Preprod),
            "preview" | "cardano-preview" => Ok(Network::Preview),
            _ => Err(format!("invalid network: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnets_share_network_id() {
        assert_eq!(Network::Preprod.network_id(), Network::Preview.network_id());
        assert_ne!(Network::Mainnet.network_id(), Network::Preprod.network_id());
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("Preprod".parse::<Network>().unwrap(), Network::Preprod);
        assert_eq!("cardano".parse::<Network>().unwrap(), Network::Mainnet);
        assert!("liquid".parse::<Network>().is_err());
    }

    #[test]
    fn hrps_follow_network() {
        assert_eq!(Network::Mainnet.reward_hrp(), "stake");
        assert_eq!(Network::Preview.address_hrp(), "addr_test");
    }
}
