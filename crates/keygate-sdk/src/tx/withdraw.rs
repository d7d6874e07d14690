use crate::address::Address;
use crate::contract::CompiledTreasury;
use crate::error::{Error, Result};
use crate::key::KeyLocation;
use crate::ledger::Utxo;
use crate::plutus::PlutusData;

use super::{ScriptPurpose, TxDescription, spend_key};

/// Parameters for draining the treasury back to the wallet.
pub struct WithdrawParams {
    pub key: KeyLocation,
    /// Every output currently at the treasury spending address.
    pub treasury_utxos: Vec<Utxo>,
    pub change_address: Address,
}

/// Build the treasury withdrawal.
///
/// Input 0: key output (wallet)
/// Inputs 1..n: all treasury outputs (script, void redeemer)
///
/// Outputs: none; treasury funds and the key return to the wallet as change
pub fn build_withdraw_tx(treasury: &CompiledTreasury, params: &WithdrawParams) -> Result<TxDescription> {
    if params.treasury_utxos.is_empty() {
        return Err(Error::Build("treasury holds no outputs to withdraw".into()));
    }
    for utxo in &params.treasury_utxos {
        if utxo.address.payment_credential()? != treasury.credential() {
            return Err(Error::Build(format!(
                "output {} is not locked by the treasury script",
                utxo.output_ref
            )));
        }
    }

    let mut desc = TxDescription::new(params.change_address.clone());
    spend_key(&mut desc, treasury, &params.key)?;
    for utxo in &params.treasury_utxos {
        desc.spend_script(utxo, PlutusData::void());
    }
    desc.attach(ScriptPurpose::Spend, treasury.script());
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::fixtures;

    #[test]
    fn spends_key_and_every_treasury_output() {
        let treasury = fixtures::treasury();
        let params = WithdrawParams {
            key: fixtures::key_location(),
            treasury_utxos: vec![
                fixtures::treasury_utxo(0, 5_000_000),
                fixtures::treasury_utxo(1, 2_000_000),
            ],
            change_address: fixtures::wallet(),
        };
        let desc = build_withdraw_tx(&treasury, &params).unwrap();

        assert_eq!(desc.inputs.len(), 3);
        assert_eq!(desc.inputs[0].utxo, fixtures::key_location().utxo);
        assert!(desc.inputs[0].redeemer.is_none());
        assert!(
            desc.inputs[1..]
                .iter()
                .all(|i| i.redeemer == Some(PlutusData::void()))
        );
        assert_eq!(desc.scripts_for(ScriptPurpose::Spend).count(), 1);
        assert!(desc.outputs.is_empty());
    }

    #[test]
    fn empty_treasury_is_a_build_error() {
        let params = WithdrawParams {
            key: fixtures::key_location(),
            treasury_utxos: vec![],
            change_address: fixtures::wallet(),
        };
        let err = build_withdraw_tx(&fixtures::treasury(), &params).unwrap_err();
        assert!(matches!(err, Error::Build(_)));
    }

    #[test]
    fn foreign_outputs_are_refused() {
        let mut stray = fixtures::treasury_utxo(0, 1_000_000);
        stray.address = fixtures::wallet();
        let params = WithdrawParams {
            key: fixtures::key_location(),
            treasury_utxos: vec![stray],
            change_address: fixtures::wallet(),
        };
        assert!(build_withdraw_tx(&fixtures::treasury(), &params).is_err());
    }

    #[test]
    fn key_output_without_key_is_refused() {
        let mut key = fixtures::key_location();
        key.utxo.value.assets.clear();
        let params = WithdrawParams {
            key,
            treasury_utxos: vec![fixtures::treasury_utxo(0, 1_000_000)],
            change_address: fixtures::wallet(),
        };
        assert!(matches!(
            build_withdraw_tx(&fixtures::treasury(), &params),
            Err(Error::Build(_))
        ));
    }
}
