use serde::{Deserialize, Serialize};

use crate::address::PoolId;
use crate::governance::DRep;
use crate::key::KeyToken;
use crate::ledger::TxHash;
use crate::tx::UnsignedTx;

/// Every operation the orchestrator can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum KeyAction {
    Mint { label: String },
    Deposit { lovelace: u64 },
    Withdraw,
    DelegateStake { pool: PoolId, drep: DRep },
    RedelegateStake { pool: PoolId },
    WithdrawStake,
    UnregisterStake,
}

impl KeyAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            KeyAction::Mint { .. } => ActionKind::Mint,
            KeyAction::Deposit { .. } => ActionKind::Deposit,
            KeyAction::Withdraw => ActionKind::Withdraw,
            KeyAction::DelegateStake { .. } => ActionKind::DelegateStake,
            KeyAction::RedelegateStake { .. } => ActionKind::RedelegateStake,
            KeyAction::WithdrawStake => ActionKind::WithdrawStake,
            KeyAction::UnregisterStake => ActionKind::UnregisterStake,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Mint,
    Deposit,
    Withdraw,
    DelegateStake,
    RedelegateStake,
    WithdrawStake,
    UnregisterStake,
}

impl ActionKind {
    /// `true` for every action that spends the key output.
    pub fn spends_key(self) -> bool {
        !matches!(self, ActionKind::Mint | ActionKind::Deposit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Mint => "mint",
            ActionKind::Deposit => "deposit",
            ActionKind::Withdraw => "withdraw",
            ActionKind::DelegateStake => "delegate_stake",
            ActionKind::RedelegateStake => "redelegate_stake",
            ActionKind::WithdrawStake => "withdraw_stake",
            ActionKind::UnregisterStake => "unregister_stake",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a settled action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReceipt {
    Minted { tx_hash: TxHash, key: KeyToken },
    Deposited { tx_hash: TxHash, lovelace: u64 },
    Withdrawn { tx_hash: TxHash, lovelace: u64 },
    Delegated { tx_hash: TxHash, pool: PoolId, drep: DRep },
    Redelegated { tx_hash: TxHash, pool: PoolId },
    RewardsWithdrawn { tx_hash: TxHash, lovelace: u64 },
    Unregistered { tx_hash: TxHash },
}

impl ActionReceipt {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            ActionReceipt::Minted { tx_hash, .. }
            | ActionReceipt::Deposited { tx_hash, .. }
            | ActionReceipt::Withdrawn { tx_hash, .. }
            | ActionReceipt::Delegated { tx_hash, .. }
            | ActionReceipt::Redelegated { tx_hash, .. }
            | ActionReceipt::RewardsWithdrawn { tx_hash, .. }
            | ActionReceipt::Unregistered { tx_hash } => *tx_hash,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionReceipt::Minted { .. } => ActionKind::Mint,
            ActionReceipt::Deposited { .. } => ActionKind::Deposit,
            ActionReceipt::Withdrawn { .. } => ActionKind::Withdraw,
            ActionReceipt::Delegated { .. } => ActionKind::DelegateStake,
            ActionReceipt::Redelegated { .. } => ActionKind::RedelegateStake,
            ActionReceipt::RewardsWithdrawn { .. } => ActionKind::WithdrawStake,
            ActionReceipt::Unregistered { .. } => ActionKind::UnregisterStake,
        }
    }

    pub(crate) fn with_tx_hash(mut self, hash: TxHash) -> Self {
        match &mut self {
            ActionReceipt::Minted { tx_hash, .. }
            | ActionReceipt::Deposited { tx_hash, .. }
            | ActionReceipt::Withdrawn { tx_hash, .. }
            | ActionReceipt::Delegated { tx_hash, .. }
            | ActionReceipt::Redelegated { tx_hash, .. }
            | ActionReceipt::RewardsWithdrawn { tx_hash, .. }
            | ActionReceipt::Unregistered { tx_hash } => *tx_hash = hash,
        }
        self
    }

    /// The newly minted key, for mint receipts.
    pub fn minted_key(&self) -> Option<&KeyToken> {
        match self {
            ActionReceipt::Minted { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// An action whose inputs have been gathered and whose transaction has been
/// built, but which has not been signed or broadcast.
///
/// Its inputs were live when it was prepared. Once another transaction spends
/// them, submitting it fails at broadcast.
#[derive(Debug, Clone)]
pub struct PreparedAction {
    pub(crate) unsigned: UnsignedTx,
    pub(crate) receipt: ActionReceipt,
}

impl PreparedAction {
    pub fn kind(&self) -> ActionKind {
        self.receipt.kind()
    }

    pub fn unsigned(&self) -> &UnsignedTx {
        &self.unsigned
    }

    pub fn tx_hash(&self) -> TxHash {
        self.unsigned.tx_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_actions() {
        let pool = PoolId::from_bytes([1; 28]);
        let actions = [
            (KeyAction::Mint { label: "ALPHA".into() }, ActionKind::Mint),
            (KeyAction::Deposit { lovelace: 1 }, ActionKind::Deposit),
            (KeyAction::Withdraw, ActionKind::Withdraw),
            (
                KeyAction::DelegateStake {
                    pool,
                    drep: DRep::AlwaysAbstain,
                },
                ActionKind::DelegateStake,
            ),
            (KeyAction::RedelegateStake { pool }, ActionKind::RedelegateStake),
            (KeyAction::WithdrawStake, ActionKind::WithdrawStake),
            (KeyAction::UnregisterStake, ActionKind::UnregisterStake),
        ];
        for (action, kind) in actions {
            assert_eq!(action.kind(), kind);
        }
    }

    #[test]
    fn only_mint_and_deposit_leave_the_key_in_place() {
        assert!(!ActionKind::Mint.spends_key());
        assert!(!ActionKind::Deposit.spends_key());
        assert!(ActionKind::Withdraw.spends_key());
        assert!(ActionKind::UnregisterStake.spends_key());
    }

    #[test]
    fn action_json_is_tagged() {
        let json = serde_json::to_value(KeyAction::Deposit { lovelace: 5 }).unwrap();
        assert_eq!(json, serde_json::json!({ "action": "deposit", "lovelace": 5 }));
        let back: KeyAction = serde_json::from_value(json).unwrap();
        assert_eq!(back, KeyAction::Deposit { lovelace: 5 });
    }

    #[test]
    fn receipt_hash_is_replaced() {
        let receipt = ActionReceipt::Unregistered {
            tx_hash: TxHash([0; 32]),
        }
        .with_tx_hash(TxHash([7; 32]));
        assert_eq!(receipt.tx_hash(), TxHash([7; 32]));
        assert_eq!(receipt.kind(), ActionKind::UnregisterStake);
    }
}
