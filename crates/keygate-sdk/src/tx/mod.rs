//! Declarative transaction descriptions handed to the external builder, and
//! one pure description builder per key-gated action.

pub mod claim_rewards;
pub mod delegate;
pub mod deposit;
pub mod deregister;
pub mod mint;
pub mod redelegate;
pub mod withdraw;

use serde::{Deserialize, Serialize};

use crate::address::{Address, Credential, PoolId, RewardAddress};
use crate::contract::CompiledTreasury;
use crate::error::{Error, Result};
use crate::governance::DRep;
use crate::key::KeyLocation;
use crate::ledger::{AssetName, OutputRef, PolicyId, TxHash, Utxo, Value};
use crate::plutus::PlutusData;
use crate::script::PlutusScript;

/// A consumed output. Script-locked inputs carry the redeemer their validator runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub utxo: Utxo,
    pub redeemer: Option<PlutusData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInstruction {
    pub policy_id: PolicyId,
    pub assets: Vec<(AssetName, i64)>,
    pub redeemer: PlutusData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Certificate {
    /// Register the stake credential and delegate both stake and vote in one certificate.
    RegisterAndDelegate {
        stake: Credential,
        pool: PoolId,
        drep: DRep,
    },
    /// Move an already registered credential to another pool; vote delegation is kept.
    DelegateToPool { stake: Credential, pool: PoolId },
    Unregister { stake: Credential },
}

impl Certificate {
    pub fn stake_credential(&self) -> &Credential {
        match self {
            Certificate::RegisterAndDelegate { stake, .. }
            | Certificate::DelegateToPool { stake, .. }
            | Certificate::Unregister { stake } => stake,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateAction {
    pub certificate: Certificate,
    pub redeemer: PlutusData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub reward_address: RewardAddress,
    pub amount: u64,
    pub redeemer: PlutusData,
}

/// What an attached script is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScriptPurpose {
    Mint,
    Spend,
    Publish,
    Withdraw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedScript {
    pub purpose: ScriptPurpose,
    pub script: PlutusScript,
}

/// Everything the builder needs to assemble, balance and cost a transaction.
///
/// The builder adds wallet inputs to cover fees and deposits and returns all
/// leftover value, key token included, to `change_address`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxDescription {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub mint: Option<MintInstruction>,
    pub certificates: Vec<CertificateAction>,
    pub withdrawals: Vec<Withdrawal>,
    pub attached_scripts: Vec<AttachedScript>,
    pub change_address: Address,
}

impl TxDescription {
    pub fn new(change_address: Address) -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            mint: None,
            certificates: Vec::new(),
            withdrawals: Vec::new(),
            attached_scripts: Vec::new(),
            change_address,
        }
    }

    /// Spend a wallet-owned output.
    pub fn spend(&mut self, utxo: &Utxo) -> &mut Self {
        self.inputs.push(TxInput {
            utxo: utxo.clone(),
            redeemer: None,
        });
        self
    }

    /// Spend a script-locked output with `redeemer`.
    pub fn spend_script(&mut self, utxo: &Utxo, redeemer: PlutusData) -> &mut Self {
        self.inputs.push(TxInput {
            utxo: utxo.clone(),
            redeemer: Some(redeemer),
        });
        self
    }

    pub fn pay(&mut self, address: &Address, value: Value) -> &mut Self {
        self.outputs.push(TxOutput {
            address: address.clone(),
            value,
        });
        self
    }

    pub fn certify(&mut self, certificate: Certificate, redeemer: PlutusData) -> &mut Self {
        self.certificates.push(CertificateAction {
            certificate,
            redeemer,
        });
        self
    }

    pub fn withdraw(
        &mut self,
        reward_address: &RewardAddress,
        amount: u64,
        redeemer: PlutusData,
    ) -> &mut Self {
        self.withdrawals.push(Withdrawal {
            reward_address: reward_address.clone(),
            amount,
            redeemer,
        });
        self
    }

    pub fn attach(&mut self, purpose: ScriptPurpose, script: &PlutusScript) -> &mut Self {
        self.attached_scripts.push(AttachedScript {
            purpose,
            script: script.clone(),
        });
        self
    }

    /// References of every explicit input.
    pub fn consumed(&self) -> Vec<OutputRef> {
        self.inputs.iter().map(|i| i.utxo.output_ref).collect()
    }

    pub fn scripts_for(&self, purpose: ScriptPurpose) -> impl Iterator<Item = &PlutusScript> {
        self.attached_scripts
            .iter()
            .filter(move |a| a.purpose == purpose)
            .map(|a| &a.script)
    }

    /// CBOR encoding of the description itself.
    pub fn to_cbor(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| Error::Build(format!("encode description: {e}")))?;
        Ok(buf)
    }
}

/// Spend the key output after checking it belongs to `treasury`'s key.
pub(crate) fn spend_key(
    desc: &mut TxDescription,
    treasury: &CompiledTreasury,
    key: &KeyLocation,
) -> Result<()> {
    if key.token.policy_id != treasury.params().key_policy_id {
        return Err(Error::Build(format!(
            "key {} does not unlock treasury {}",
            key.token.unit(),
            treasury.script_hash()
        )));
    }
    if !key.utxo.holds(&key.token.unit()) {
        return Err(Error::Build(format!(
            "output {} does not hold key {}",
            key.output_ref(),
            key.token.unit()
        )));
    }
    desc.spend(&key.utxo);
    Ok(())
}

/// A balanced transaction awaiting signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    /// Body hash. Signing adds witnesses only, so this is also the final tx id.
    pub tx_hash: TxHash,
    pub cbor: Vec<u8>,
    /// The balanced description the body was built from.
    pub description: TxDescription,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub tx_hash: TxHash,
    pub cbor: Vec<u8>,
    pub description: TxDescription,
}

/// External transaction builder: balancing, fee computation and script
/// evaluation all happen behind this trait.
pub trait TxBuilder: Send + Sync {
    /// Errors are reported as [`Error::Build`].
    fn build(&self, description: &TxDescription) -> Result<UnsignedTx>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::contract::CompiledKeyPolicy;
    use crate::key::KeyToken;
    use crate::ledger::Hash28;
    use crate::network::Network;
    use crate::script::{PlutusVersion, ScriptTemplate};

    pub fn wallet() -> Address {
        Address::base(
            Network::Preprod,
            Credential::Key(Hash28([0x77; 28])),
            Credential::Key(Hash28([0x78; 28])),
        )
        .unwrap()
    }

    pub fn nonce() -> Utxo {
        Utxo {
            output_ref: OutputRef::new(TxHash([0x0a; 32]), 0),
            address: wallet(),
            value: Value::lovelace(10_000_000),
        }
    }

    pub fn key_policy() -> CompiledKeyPolicy {
        let template = ScriptTemplate::new("key.key.mint", PlutusVersion::V3, vec![1, 2, 3]);
        CompiledKeyPolicy::new(&template, nonce().output_ref).unwrap()
    }

    pub fn key_token() -> KeyToken {
        KeyToken::new(key_policy().policy_id(), AssetName::from_label("ALPHA").unwrap())
    }

    pub fn treasury() -> CompiledTreasury {
        let template = ScriptTemplate::new("dry.dry.spend", PlutusVersion::V3, vec![4, 5, 6]);
        CompiledTreasury::new(&template, key_policy().policy_id()).unwrap()
    }

    pub fn key_location() -> KeyLocation {
        KeyLocation {
            token: key_token(),
            utxo: Utxo {
                output_ref: OutputRef::new(TxHash([0x0b; 32]), 1),
                address: wallet(),
                value: Value::lovelace(3_000_000)
                    .with_asset(key_token().unit(), 1)
                    .unwrap(),
            },
        }
    }

    pub fn treasury_utxo(index: u32, lovelace: u64) -> Utxo {
        Utxo {
            output_ref: OutputRef::new(TxHash([0x0c; 32]), index),
            address: treasury().spending_address(Network::Preprod).unwrap(),
            value: Value::lovelace(lovelace),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::PlutusVersion;

    fn utxo(index: u32) -> Utxo {
        Utxo {
            output_ref: OutputRef::new(TxHash([1; 32]), index),
            address: Address::from_raw("addr_test1w"),
            value: Value::lovelace(1_000_000),
        }
    }

    #[test]
    fn builder_methods_accumulate() {
        let script = PlutusScript::new(PlutusVersion::V3, vec![1]);
        let mut desc = TxDescription::new(Address::from_raw("addr_test1change"));
        desc.spend(&utxo(0))
            .spend_script(&utxo(1), PlutusData::void())
            .attach(ScriptPurpose::Spend, &script);
        assert_eq!(desc.consumed().len(), 2);
        assert!(desc.inputs[0].redeemer.is_none());
        assert_eq!(desc.inputs[1].redeemer, Some(PlutusData::void()));
        assert_eq!(desc.scripts_for(ScriptPurpose::Spend).count(), 1);
        assert_eq!(desc.scripts_for(ScriptPurpose::Mint).count(), 0);
    }

    #[test]
    fn description_encodes_to_cbor() {
        let desc = TxDescription::new(Address::from_raw("addr_test1change"));
        let bytes = desc.to_cbor().unwrap();
        let back: TxDescription = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(back, desc);
    }
}
