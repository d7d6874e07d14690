use crate::address::{Address, PoolId};
use crate::contract::CompiledTreasury;
use crate::error::Result;
use crate::key::KeyLocation;
use crate::plutus::PlutusData;

use super::{Certificate, ScriptPurpose, TxDescription, spend_key};

pub struct RedelegateParams {
    pub key: KeyLocation,
    pub pool: PoolId,
    pub change_address: Address,
}

/// Build a pool-only redelegation.
///
/// Input 0: key output (wallet)
///
/// Certificate: stake delegation to `pool`. Registration and vote delegation
/// are left as they are.
pub fn build_redelegate_tx(
    treasury: &CompiledTreasury,
    params: &RedelegateParams,
) -> Result<TxDescription> {
    let mut desc = TxDescription::new(params.change_address.clone());
    spend_key(&mut desc, treasury, &params.key)?;
    desc.certify(
        Certificate::DelegateToPool {
            stake: treasury.credential(),
            pool: params.pool,
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
    fn carries_only_a_pool_certificate() {
        let treasury = fixtures::treasury();
        let pool = PoolId::from_bytes([0x02; 28]);
        let desc = build_redelegate_tx(
            &treasury,
            &RedelegateParams {
                key: fixtures::key_location(),
                pool,
                change_address: fixtures::wallet(),
            },
        )
        .unwrap();

        assert_eq!(
            desc.certificates
                .iter()
                .map(|c| c.certificate.clone())
                .collect::<Vec<_>>(),
            vec![Certificate::DelegateToPool {
                stake: treasury.credential(),
                pool,
            }]
        );
        assert!(desc.withdrawals.is_empty());
    }
}
