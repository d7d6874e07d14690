use std::sync::Arc;

use crate::error::{Error, Result, SubmissionStage};
use crate::ledger::TxHash;
use crate::tx::{SignedTx, UnsignedTx};
use crate::wallet::WalletProvider;

/// Sign with the active wallet, then broadcast.
///
/// Not idempotent: resubmitting the same logical action needs freshly
/// gathered inputs.
#[derive(Clone)]
pub struct SubmissionPipeline {
    wallet: Arc<dyn WalletProvider>,
}

impl SubmissionPipeline {
    pub fn new(wallet: Arc<dyn WalletProvider>) -> Self {
        Self { wallet }
    }

    pub fn sign(&self, tx: &UnsignedTx) -> Result<SignedTx> {
        self.wallet
            .sign(tx)
            .map_err(|e| at_stage(SubmissionStage::Sign, e))
    }

    pub fn broadcast(&self, tx: &SignedTx) -> Result<TxHash> {
        self.wallet
            .submit(tx)
            .map_err(|e| at_stage(SubmissionStage::Broadcast, e))
    }

    pub fn submit(&self, tx: &UnsignedTx) -> Result<TxHash> {
        let signed = self.sign(tx)?;
        let tx_hash = self.broadcast(&signed)?;
        if tx_hash != tx.tx_hash {
            log::warn!(
                "wallet reported tx id {tx_hash}, built body hashes to {}",
                tx.tx_hash
            );
        }
        Ok(tx_hash)
    }
}

fn at_stage(stage: SubmissionStage, err: Error) -> Error {
    match err {
        Error::Submission(..) => err,
        other => Error::Submission(stage, other.to_string()),
    }
}
