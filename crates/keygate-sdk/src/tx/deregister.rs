use crate::address::Address;
use crate::contract::CompiledTreasury;
use crate::error::Result;
use crate::key::KeyLocation;
use crate::plutus::PlutusData;

use super::{Certificate, ScriptPurpose, TxDescription, spend_key};

pub struct DeregisterParams {
    pub key: KeyLocation,
    pub change_address: Address,
}

/// Build the stake deregistration.
///
/// Input 0: key output (wallet)
///
/// Certificate: unregister the treasury stake credential (void redeemer; the
/// deposit refund returns as change)
pub fn build_deregister_tx(
    treasury: &CompiledTreasury,
    params: &DeregisterParams,
) -> Result<TxDescription> {
    let mut desc = TxDescription::new(params.change_address.clone());
    spend_key(&mut desc, treasury, &params.key)?;
    desc.certify(
        Certificate::Unregister {
            stake: treasury.credential(),
        },
        PlutusData::void(),
    );
    desc.attach(ScriptPurpose::Publish, treasury.script());
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::fixtures;

    #[test]
    fn unregisters_treasury_credential() {
        let treasury = fixtures::treasury();
        let desc = build_deregister_tx(
            &treasury,
            &DeregisterParams {
                key: fixtures::key_location(),
                change_address: fixtures::wallet(),
            },
        )
        .unwrap();
        assert_eq!(
            desc.certificates[0].certificate,
            Certificate::Unregister {
                stake: treasury.credential()
            }
        );
        assert_eq!(desc.certificates[0].redeemer, PlutusData::void());
    }

    #[test]
    fn key_of_another_treasury_is_refused() {
        let mut key = fixtures::key_location();
        key.token.policy_id = crate::ledger::PolicyId([0xee; 28]);
        let params = DeregisterParams {
            key,
            change_address: fixtures::wallet(),
        };
        assert!(build_deregister_tx(&fixtures::treasury(), &params).is_err());
    }
}
