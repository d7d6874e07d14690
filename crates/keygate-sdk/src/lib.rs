pub mod action;
pub mod address;
pub mod blueprint;
pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod governance;
pub mod key;
pub mod ledger;
pub mod network;
pub mod node;
pub mod oracle;
pub mod params;
pub mod plutus;
pub mod script;
pub mod sdk;
pub mod submit;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tx;
pub mod wallet;

// Core types
pub use action::{ActionKind, ActionReceipt, KeyAction, PreparedAction};
pub use address::{Address, Credential, PoolId, RewardAddress};
pub use error::{Error, NoKeyReason, NodeError, Result, SubmissionStage};
pub use ledger::{
    AssetName, AssetUnit, Hash28, LOVELACE_PER_ADA, OutputRef, PolicyId, TxHash, Utxo, Value,
    parse_ada,
};
pub use network::Network;
pub use node::{ActionEvent, KeygateNode};
pub use sdk::{Collaborators, KeygateSdk, ScriptTemplates};

// Configuration and blueprints
pub use blueprint::Blueprint;
pub use config::{KeyStoreConfig, KeygateConfig};

// Scripts and contracts
pub use contract::{CompiledKeyPolicy, CompiledTreasury, ScriptAddresses, derive_addresses};
pub use params::{KeyPolicyParams, TreasuryParams};
pub use plutus::PlutusData;
pub use script::{PlutusScript, PlutusVersion, ScriptTemplate};

// Key registry
pub use key::{KeyLocation, KeyRegistry, KeyStore, KeyToken, SessionKeyStore};

// Collaborators
pub use chain::{BlockfrostBackend, ChainBackend};
pub use governance::{DRep, KoiosClient};
pub use oracle::RewardOracle;
pub use submit::SubmissionPipeline;
pub use wallet::WalletProvider;

// Transaction descriptions and builders
pub use tx::claim_rewards::{ClaimRewardsParams, build_claim_rewards_tx};
pub use tx::delegate::{DelegateParams, build_delegate_tx};
pub use tx::deposit::{DepositParams, build_deposit_tx};
pub use tx::deregister::{DeregisterParams, build_deregister_tx};
pub use tx::mint::{MintParams, build_mint_tx};
pub use tx::redelegate::{RedelegateParams, build_redelegate_tx};
pub use tx::withdraw::{WithdrawParams, build_withdraw_tx};
pub use tx::{
    Certificate, ScriptPurpose, SignedTx, TxBuilder, TxDescription, TxInput, TxOutput, UnsignedTx,
};
