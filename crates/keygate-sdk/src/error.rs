use thiserror::Error;

use crate::key::KeyToken;
use crate::ledger::{AssetUnit, TxHash};

/// Why a key-gated action could not find its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoKeyReason {
    /// No key token has been recorded in this store.
    NeverMinted,
    /// A key was recorded but no wallet output currently carries its unit.
    NotInWallet(AssetUnit),
}

impl std::fmt::Display for NoKeyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NoKeyReason::NeverMinted => write!(f, "no key recorded, mint a key NFT first"),
            NoKeyReason::NotInWallet(unit) => {
                write!(f, "key {unit} is not held by the connected wallet")
            }
        }
    }
}

/// Which half of the submission pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Sign,
    Broadcast,
}

impl std::fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStage::Sign => write!(f, "sign"),
            SubmissionStage::Broadcast => write!(f, "broadcast"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("wallet holds no UTXOs to use as a mint nonce")]
    EmptyWallet,

    #[error("no key session: {0}")]
    NoKeySession(NoKeyReason),

    #[error("no stake rewards to withdraw for {0}")]
    NoRewards(String),

    #[error("transaction build error: {0}")]
    Build(String),

    #[error("submission failed at {0}: {1}")]
    Submission(SubmissionStage, String),

    #[error("ledger query error: {0}")]
    Query(String),

    #[error("reward oracle error: {0}")]
    Oracle(String),

    #[error("governance lookup error: {0}")]
    Governance(String),

    #[error("key store error: {0}")]
    KeyStore(String),

    /// The mint is on chain but the key store refused the new token. The
    /// caller must record `key` itself or the key session is lost.
    #[error("minted key {} in {tx_hash} but could not record it: {reason}", key.unit())]
    KeyNotRecorded {
        key: KeyToken,
        tx_hash: TxHash,
        reason: String,
    },

    #[error("blueprint error: {0}")]
    Blueprint(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("address error: {0}")]
    Address(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("value overflow")]
    ValueOverflow,
}

impl Error {
    /// `true` for failures raised before any transaction was built.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::EmptyWallet | Error::NoKeySession(_) | Error::NoRewards(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by [`KeygateNode`](crate::node::KeygateNode) async operations.
#[derive(Debug)]
pub enum NodeError {
    /// An SDK operation failed.
    Sdk(Error),
    /// A `spawn_blocking` task failed to join.
    Task(String),
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeError::Sdk(e) => write!(f, "sdk error: {e}"),
            NodeError::Task(e) => write!(f, "task join error: {e}"),
        }
    }
}

impl std::error::Error for NodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodeError::Sdk(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Error> for NodeError {
    fn from(e: Error) -> Self {
        NodeError::Sdk(e)
    }
}
