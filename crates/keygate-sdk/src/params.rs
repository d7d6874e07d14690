use serde::{Deserialize, Serialize};

use crate::ledger::{OutputRef, PolicyId};
use crate::plutus::PlutusData;

/// Compile-time parameters of the one-shot key minting policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPolicyParams {
    /// Wallet output the mint consumes. No second mint can spend it, so the
    /// resulting policy can only ever mint once.
    pub nonce: OutputRef,
}

impl KeyPolicyParams {
    pub(crate) fn build_arguments(&self) -> Vec<PlutusData> {
        vec![PlutusData::from(self.nonce)]
    }
}

/// Compile-time parameters of the treasury validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryParams {
    /// Policy id of the key token; its only parameter.
    pub key_policy_id: PolicyId,
}

impl TreasuryParams {
    pub(crate) fn build_arguments(&self) -> Vec<PlutusData> {
        vec![PlutusData::bytes(self.key_policy_id.as_bytes())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TxHash;

    #[test]
    fn key_policy_argument_is_output_reference() {
        let nonce = OutputRef::new(TxHash([0x10; 32]), 2);
        let args = KeyPolicyParams { nonce }.build_arguments();
        assert_eq!(args, vec![PlutusData::from(nonce)]);
    }

    #[test]
    fn treasury_argument_is_policy_bytes() {
        let args = TreasuryParams {
            key_policy_id: PolicyId([0x20; 28]),
        }
        .build_arguments();
        assert_eq!(args, vec![PlutusData::Bytes(vec![0x20; 28])]);
    }
}
