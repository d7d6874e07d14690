use crate::address::Address;
use crate::contract::CompiledTreasury;
use crate::error::{Error, Result};
use crate::ledger::Value;
use crate::network::Network;

use super::TxDescription;

/// Parameters for a treasury deposit. The key is not spent.
pub struct DepositParams {
    pub lovelace: u64,
    pub network: Network,
    pub change_address: Address,
}

/// Build a deposit into the treasury.
///
/// Inputs: selected by the builder from the wallet
///
/// Output 0: `lovelace` → treasury spending address
pub fn build_deposit_tx(treasury: &CompiledTreasury, params: &DepositParams) -> Result<TxDescription> {
    if params.lovelace == 0 {
        return Err(Error::InvalidAmount("deposit must be positive".into()));
    }
    let treasury_address = treasury.spending_address(params.network)?;

    let mut desc = TxDescription::new(params.change_address.clone());
    desc.pay(&treasury_address, Value::lovelace(params.lovelace));
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::fixtures;

    #[test]
    fn pays_treasury_address() {
        let treasury = fixtures::treasury();
        let desc = build_deposit_tx(
            &treasury,
            &DepositParams {
                lovelace: 5_000_000,
                network: Network::Preprod,
                change_address: fixtures::wallet(),
            },
        )
        .unwrap();

        assert!(desc.inputs.is_empty());
        assert!(desc.attached_scripts.is_empty());
        assert_eq!(desc.outputs.len(), 1);
        assert_eq!(
            desc.outputs[0].address,
            treasury.spending_address(Network::Preprod).unwrap()
        );
        assert_eq!(desc.outputs[0].value, Value::lovelace(5_000_000));
    }

    #[test]
    fn zero_deposit_is_rejected() {
        let err = build_deposit_tx(
            &fixtures::treasury(),
            &DepositParams {
                lovelace: 0,
                network: Network::Preprod,
                change_address: fixtures::wallet(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidAmount(_)));
    }
}
