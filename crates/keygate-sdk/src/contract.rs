use serde::{Deserialize, Serialize};

use crate::address::{Address, Credential, RewardAddress};
use crate::error::Result;
use crate::ledger::{AssetName, AssetUnit, Hash28, OutputRef, PolicyId};
use crate::network::Network;
use crate::params::{KeyPolicyParams, TreasuryParams};
use crate::script::{PlutusScript, ScriptTemplate};

/// The treasury's spending address and reward address.
///
/// Both are backed by the same script hash; one uses it as the payment
/// credential, the other as the stake credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptAddresses {
    pub spending_address: Address,
    pub reward_address: RewardAddress,
}

/// A one-shot key minting policy, bound to its nonce output.
#[derive(Debug, Clone)]
pub struct CompiledKeyPolicy {
    script: PlutusScript,
    policy_id: PolicyId,
    params: KeyPolicyParams,
}

impl CompiledKeyPolicy {
    /// Apply `nonce` to the key policy template.
    ///
    /// Distinct nonces yield distinct policy ids, and a nonce can be consumed
    /// only once, so every policy built here mints at most one key.
    pub fn new(template: &ScriptTemplate, nonce: OutputRef) -> Result<Self> {
        let params = KeyPolicyParams { nonce };
        let script = template.apply(&params.build_arguments())?;
        let policy_id = script.policy_id();
        Ok(Self {
            script,
            policy_id,
            params,
        })
    }

    pub fn policy_id(&self) -> PolicyId {
        self.policy_id
    }

    pub fn script(&self) -> &PlutusScript {
        &self.script
    }

    pub fn params(&self) -> &KeyPolicyParams {
        &self.params
    }

    pub fn unit(&self, asset_name: AssetName) -> AssetUnit {
        AssetUnit::new(self.policy_id, asset_name)
    }
}

/// The treasury validator for one key.
///
/// It guards spending from the treasury address and every certificate and
/// reward withdrawal on the treasury's stake credential.
#[derive(Debug, Clone)]
pub struct CompiledTreasury {
    script: PlutusScript,
    script_hash: Hash28,
    params: TreasuryParams,
}

impl CompiledTreasury {
    pub fn new(template: &ScriptTemplate, key_policy_id: PolicyId) -> Result<Self> {
        let params = TreasuryParams { key_policy_id };
        let script = template.apply(&params.build_arguments())?;
        let script_hash = script.hash();
        Ok(Self {
            script,
            script_hash,
            params,
        })
    }

    pub fn script(&self) -> &PlutusScript {
        &self.script
    }

    pub fn script_hash(&self) -> Hash28 {
        self.script_hash
    }

    pub fn params(&self) -> &TreasuryParams {
        &self.params
    }

    pub fn credential(&self) -> Credential {
        Credential::Script(self.script_hash)
    }

    pub fn spending_address(&self, network: Network) -> Result<Address> {
        Address::script_base(network, self.script_hash, self.script_hash)
    }

    pub fn reward_address(&self, network: Network) -> Result<RewardAddress> {
        RewardAddress::from_credential(network, self.credential())
    }

    pub fn addresses(&self, network: Network) -> Result<ScriptAddresses> {
        Ok(ScriptAddresses {
            spending_address: self.spending_address(network)?,
            reward_address: self.reward_address(network)?,
        })
    }
}

/// Derive the treasury addresses for the key issued under `key_policy_id`.
///
/// Pure: the result depends only on the template, the policy id and the network.
pub fn derive_addresses(
    template: &ScriptTemplate,
    key_policy_id: PolicyId,
    network: Network,
) -> Result<ScriptAddresses> {
    CompiledTreasury::new(template, key_policy_id)?.addresses(network)
}
