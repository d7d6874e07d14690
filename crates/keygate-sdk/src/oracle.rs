use serde::Deserialize;

use crate::address::RewardAddress;
use crate::chain::BlockfrostBackend;
use crate::error::{Error, Result};

/// Off-chain source of a reward account's withdrawable balance.
pub trait RewardOracle: Send + Sync {
    /// Withdrawable lovelace; `0` when nothing has accrued or the account is unknown.
    fn withdrawable_rewards(&self, reward_address: &RewardAddress) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    withdrawable_amount: String,
}

impl RewardOracle for BlockfrostBackend {
    fn withdrawable_rewards(&self, reward_address: &RewardAddress) -> Result<u64> {
        let account: Option<AccountInfo> = self
            .get_json(&format!("/accounts/{reward_address}"))
            .map_err(Error::Oracle)?;
        let Some(account) = account else {
            log::debug!("reward account {reward_address} unknown to blockfrost");
            return Ok(0);
        };
        parse_withdrawable(&account.withdrawable_amount)
    }
}

fn parse_withdrawable(amount: &str) -> Result<u64> {
    amount
        .parse()
        .map_err(|e| Error::Oracle(format!("withdrawable_amount {amount:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_account_payload() {
        let json = r#"{
            "stake_address": "stake_test1u",
            "active": true,
            "controlled_amount": "100",
            "withdrawable_amount": "4200000",
            "pool_id": null
        }"#;
        let info: AccountInfo = serde_json::from_str(json).unwrap();
        assert_eq!(parse_withdrawable(&info.withdrawable_amount).unwrap(), 4_200_000);
    }

    #[test]
    fn rejects_non_numeric_amount() {
        assert!(matches!(parse_withdrawable("4.2"), Err(Error::Oracle(_))));
    }
}
