use crate::address::{Address, PoolId};
use crate::contract::CompiledTreasury;
use crate::error::Result;
use crate::governance::DRep;
use crate::key::KeyLocation;
use crate::plutus::PlutusData;

use super::{Certificate, ScriptPurpose, TxDescription, spend_key};

/// Parameters for registering the treasury stake credential and delegating it.
pub struct DelegateParams {
    pub key: KeyLocation,
    pub pool: PoolId,
    pub drep: DRep,
    pub change_address: Address,
}

/// Build the register-and-delegate certificate transaction.
///
/// Input 0: key output (wallet)
///
/// Certificate: register + delegate stake to `pool` + delegate vote to `drep`
/// (void redeemer; the builder funds the registration deposit)
pub fn build_delegate_tx(treasury: &CompiledTreasury, params: &DelegateParams) -> Result<TxDescription> {
    let mut desc = TxDescription::new(params.change_address.clone());
    spend_key(&mut desc, treasury, &params.key)?;
    desc.certify(
        Certificate::RegisterAndDelegate {
            stake: treasury.credential(),
            pool: params.pool,
            drep: params.drep,
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
    fn registers_and_delegates_with_key_as_only_input() {
        let treasury = fixtures::treasury();
        let pool = PoolId::from_bytes([0x01; 28]);
        let desc = build_delegate_tx(
            &treasury,
            &DelegateParams {
                key: fixtures::key_location(),
                pool,
                drep: DRep::AlwaysAbstain,
                change_address: fixtures::wallet(),
            },
        )
        .unwrap();

        assert_eq!(desc.consumed(), vec![fixtures::key_location().output_ref()]);
        assert_eq!(desc.certificates.len(), 1);
        assert_eq!(
            desc.certificates[0].certificate,
            Certificate::RegisterAndDelegate {
                stake: treasury.credential(),
                pool,
                drep: DRep::AlwaysAbstain,
            }
        );
        assert_eq!(desc.scripts_for(ScriptPurpose::Publish).count(), 1);
    }
}
