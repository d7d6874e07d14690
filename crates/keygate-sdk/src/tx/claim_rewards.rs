use crate::address::{Address, RewardAddress};
use crate::contract::CompiledTreasury;
use crate::error::{Error, Result};
use crate::key::KeyLocation;
use crate::plutus::PlutusData;

use super::{ScriptPurpose, TxDescription, spend_key};

/// Parameters for withdrawing accrued staking rewards.
pub struct ClaimRewardsParams {
    pub key: KeyLocation,
    pub reward_address: RewardAddress,
    /// Must equal the account's full withdrawable balance.
    pub amount: u64,
    pub change_address: Address,
}

/// Build the reward withdrawal.
///
/// Input 0: key output (wallet)
///
/// Withdrawal: `amount` from the treasury reward address (void redeemer)
///
/// Outputs: none; the rewards and the key return to the wallet as change
pub fn build_claim_rewards_tx(
    treasury: &CompiledTreasury,
    params: &ClaimRewardsParams,
) -> Result<TxDescription> {
    if params.amount == 0 {
        return Err(Error::NoRewards(params.reward_address.to_string()));
    }
    if params.reward_address.credential()? != treasury.credential() {
        return Err(Error::Build(format!(
            "{} is not the treasury reward address",
            params.reward_address
        )));
    }

    let mut desc = TxDescription::new(params.change_address.clone());
    spend_key(&mut desc, treasury, &params.key)?;
    desc.withdraw(&params.reward_address, params.amount, PlutusData::void());
    desc.attach(ScriptPurpose::Withdraw, treasury.script());
    Ok(desc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Credential;
    use crate::ledger::Hash28;
    use crate::network::Network;
    use crate::tx::fixtures;

    fn params(amount: u64) -> ClaimRewardsParams {
        ClaimRewardsParams {
            key: fixtures::key_location(),
            reward_address: fixtures::treasury().reward_address(Network::Preprod).unwrap(),
            amount,
            change_address: fixtures::wallet(),
        }
    }

    #[test]
    fn withdraws_exact_amount() {
        let desc = build_claim_rewards_tx(&fixtures::treasury(), &params(1_234_567)).unwrap();
        assert_eq!(desc.withdrawals.len(), 1);
        assert_eq!(desc.withdrawals[0].amount, 1_234_567);
        assert_eq!(desc.scripts_for(ScriptPurpose::Withdraw).count(), 1);
        assert_eq!(desc.consumed(), vec![fixtures::key_location().output_ref()]);
    }

    #[test]
    fn zero_rewards_fail_with_no_rewards() {
        let err = build_claim_rewards_tx(&fixtures::treasury(), &params(0)).unwrap_err();
        assert!(matches!(err, Error::NoRewards(_)));
    }

    #[test]
    fn foreign_reward_address_is_refused() {
        let mut p = params(10);
        p.reward_address =
            RewardAddress::from_credential(Network::Preprod, Credential::Script(Hash28([9; 28])))
                .unwrap();
        assert!(matches!(
            build_claim_rewards_tx(&fixtures::treasury(), &p),
            Err(Error::Build(_))
        ));
    }
}
