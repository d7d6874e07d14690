use std::sync::Arc;

use crate::action::{ActionReceipt, KeyAction, PreparedAction};
use crate::address::{Address, PoolId};
use crate::chain::ChainBackend;
use crate::config::KeygateConfig;
use crate::contract::{CompiledKeyPolicy, CompiledTreasury, ScriptAddresses};
use crate::error::{Error, Result, SubmissionStage};
use crate::governance::DRep;
use crate::key::{KeyLocation, KeyRegistry, KeyStore, KeyToken};
use crate::ledger::{AssetName, Utxo, Value, parse_ada};
use crate::network::Network;
use crate::oracle::RewardOracle;
use crate::script::ScriptTemplate;
use crate::submit::SubmissionPipeline;
use crate::tx::claim_rewards::{ClaimRewardsParams, build_claim_rewards_tx};
use crate::tx::delegate::{DelegateParams, build_delegate_tx};
use crate::tx::deposit::{DepositParams, build_deposit_tx};
use crate::tx::deregister::{DeregisterParams, build_deregister_tx};
use crate::tx::mint::{MintParams, build_mint_tx};
use crate::tx::redelegate::{RedelegateParams, build_redelegate_tx};
use crate::tx::withdraw::{WithdrawParams, build_withdraw_tx};
use crate::tx::{TxBuilder, TxDescription, UnsignedTx};
use crate::wallet::WalletProvider;

/// The two unapplied validators every key session is built from.
#[derive(Debug, Clone)]
pub struct ScriptTemplates {
    /// One-shot minting policy, parameterized by the nonce output.
    pub key_policy: ScriptTemplate,
    /// Spending and staking validator, parameterized by the key policy id.
    pub treasury: ScriptTemplate,
}

/// External services the orchestrator depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub chain: Arc<dyn ChainBackend>,
    pub wallet: Arc<dyn WalletProvider>,
    pub builder: Arc<dyn TxBuilder>,
    pub oracle: Arc<dyn RewardOracle>,
}

/// Inputs shared by every action that spends the key.
struct KeyContext {
    holder: Address,
    location: KeyLocation,
    treasury: CompiledTreasury,
}

/// Key-gated treasury and staking orchestrator.
///
/// Every action re-resolves the key output and re-derives the script
/// addresses; nothing is cached between actions. Actions are not serialized
/// against each other: two actions spending the same key output race, and
/// the loser fails at broadcast.
pub struct KeygateSdk {
    network: Network,
    templates: ScriptTemplates,
    chain: Arc<dyn ChainBackend>,
    wallet: Arc<dyn WalletProvider>,
    builder: Arc<dyn TxBuilder>,
    oracle: Arc<dyn RewardOracle>,
    keys: KeyRegistry,
    pipeline: SubmissionPipeline,
}

impl KeygateSdk {
    pub fn new(
        network: Network,
        templates: ScriptTemplates,
        collaborators: Collaborators,
        keys: KeyRegistry,
    ) -> Self {
        let Collaborators {
            chain,
            wallet,
            builder,
            oracle,
        } = collaborators;
        Self {
            network,
            templates,
            chain,
            pipeline: SubmissionPipeline::new(wallet.clone()),
            wallet,
            builder,
            oracle,
            keys,
        }
    }

    /// Wire up Blockfrost (ledger queries and rewards) and the blueprint
    /// templates from `config`.
    pub fn from_config(
        config: &KeygateConfig,
        wallet: Arc<dyn WalletProvider>,
        builder: Arc<dyn TxBuilder>,
        key_store: Box<dyn KeyStore>,
    ) -> Result<Self> {
        config.validate()?;
        let templates = config.load_templates()?;
        let blockfrost = Arc::new(config.blockfrost());
        Ok(Self::new(
            config.network,
            templates,
            Collaborators {
                chain: blockfrost.clone(),
                wallet,
                builder,
                oracle: blockfrost,
            },
            KeyRegistry::new(key_store),
        ))
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn templates(&self) -> &ScriptTemplates {
        &self.templates
    }

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    // ── Key queries ─────────────────────────────────────────────────────

    /// The recorded key token.
    pub fn key_token(&self) -> Result<KeyToken> {
        self.keys.recorded()
    }

    /// Where the key token is right now.
    pub fn key_location(&self) -> Result<KeyLocation> {
        let holder = self.wallet.address()?;
        self.keys.resolve(self.chain.as_ref(), &holder)
    }

    /// Treasury addresses for the recorded key.
    pub fn script_addresses(&self) -> Result<ScriptAddresses> {
        let token = self.keys.recorded()?;
        CompiledTreasury::new(&self.templates.treasury, token.policy_id)?.addresses(self.network)
    }

    /// Current treasury balance, summed over every output at the spending address.
    pub fn treasury_balance(&self) -> Result<Value> {
        let addresses = self.script_addresses()?;
        let utxos = self.chain.utxos_at(&addresses.spending_address)?;
        Value::sum(utxos.iter().map(|u| &u.value))
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Gather inputs and build the unsigned transaction for `action`.
    ///
    /// Every precondition failure (`EmptyWallet`, `NoKeySession`, `NoRewards`)
    /// is raised here, before the builder is called.
    pub fn prepare(&self, action: &KeyAction) -> Result<PreparedAction> {
        let kind = action.kind();
        log::debug!("preparing {kind}");
        let prepared = match action {
            KeyAction::Mint { label } => self.prepare_mint(label),
            KeyAction::Deposit { lovelace } => self.prepare_deposit(*lovelace),
            KeyAction::Withdraw => self.prepare_withdraw(),
            KeyAction::DelegateStake { pool, drep } => self.prepare_delegate(*pool, *drep),
            KeyAction::RedelegateStake { pool } => self.prepare_redelegate(*pool),
            KeyAction::WithdrawStake => self.prepare_withdraw_stake(),
            KeyAction::UnregisterStake => self.prepare_unregister(),
        }?;
        log::debug!(
            "{kind} built as {} ({} inputs)",
            prepared.unsigned.tx_hash,
            prepared.unsigned.description.inputs.len()
        );
        Ok(prepared)
    }

    /// Sign and broadcast a prepared action. A mint records its key only once
    /// the broadcast has been accepted.
    pub fn submit(&self, prepared: PreparedAction) -> Result<ActionReceipt> {
        let kind = prepared.kind();
        let tx_hash = self.pipeline.submit(&prepared.unsigned).inspect_err(|e| {
            if kind.spends_key() && matches!(e, Error::Submission(SubmissionStage::Broadcast, _)) {
                log::warn!("{kind} rejected at broadcast; the key output may already be spent");
            }
        })?;
        log::info!("{kind} submitted: {tx_hash}");
        if let Some(key) = prepared.receipt.minted_key()
            && let Err(e) = self.keys.record(key)
        {
            log::error!("{} minted in {tx_hash} but not recorded: {e}", key.unit());
            let reason = match e {
                Error::KeyStore(msg) => msg,
                other => other.to_string(),
            };
            return Err(Error::KeyNotRecorded {
                key: key.clone(),
                tx_hash,
                reason,
            });
        }
        Ok(prepared.receipt.with_tx_hash(tx_hash))
    }

    pub fn execute(&self, action: &KeyAction) -> Result<ActionReceipt> {
        let prepared = self.prepare(action)?;
        self.submit(prepared)
    }

    pub fn mint_key(&self, label: &str) -> Result<ActionReceipt> {
        self.execute(&KeyAction::Mint {
            label: label.to_string(),
        })
    }

    pub fn deposit(&self, lovelace: u64) -> Result<ActionReceipt> {
        self.execute(&KeyAction::Deposit { lovelace })
    }

    /// Deposit a decimal ADA amount such as `"2.5"`.
    pub fn deposit_ada(&self, ada: &str) -> Result<ActionReceipt> {
        self.deposit(parse_ada(ada)?)
    }

    pub fn withdraw(&self) -> Result<ActionReceipt> {
        self.execute(&KeyAction::Withdraw)
    }

    pub fn delegate_stake(&self, pool: PoolId, drep: DRep) -> Result<ActionReceipt> {
        self.execute(&KeyAction::DelegateStake { pool, drep })
    }

    pub fn redelegate_stake(&self, pool: PoolId) -> Result<ActionReceipt> {
        self.execute(&KeyAction::RedelegateStake { pool })
    }

    pub fn withdraw_stake(&self) -> Result<ActionReceipt> {
        self.execute(&KeyAction::WithdrawStake)
    }

    pub fn unregister_stake(&self) -> Result<ActionReceipt> {
        self.execute(&KeyAction::UnregisterStake)
    }

    // ── Internal: per-action preparation ────────────────────────────────

    fn prepare_mint(&self, label: &str) -> Result<PreparedAction> {
        let asset_name = AssetName::from_label(label)?;
        let holder = self.wallet.address()?;
        let nonce = self
            .wallet
            .utxos()?
            .into_iter()
            .next()
            .ok_or(Error::EmptyWallet)?;
        if let Ok(existing) = self.keys.recorded() {
            log::warn!("minting a new key; {} will be forgotten", existing.unit());
        }

        let policy = CompiledKeyPolicy::new(&self.templates.key_policy, nonce.output_ref)?;
        log::debug!("mint nonce {} -> policy {}", nonce.output_ref, policy.policy_id());
        let key = KeyToken::new(policy.policy_id(), asset_name.clone());
        let desc = build_mint_tx(
            &policy,
            &MintParams {
                nonce,
                asset_name,
                change_address: holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::Minted {
                tx_hash: unsigned.tx_hash,
                key,
            },
            unsigned,
        })
    }

    fn prepare_deposit(&self, lovelace: u64) -> Result<PreparedAction> {
        // The key is not spent, but it must still be resolvable.
        let ctx = self.key_context()?;
        let desc = build_deposit_tx(
            &ctx.treasury,
            &DepositParams {
                lovelace,
                network: self.network,
                change_address: ctx.holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::Deposited {
                tx_hash: unsigned.tx_hash,
                lovelace,
            },
            unsigned,
        })
    }

    fn prepare_withdraw(&self) -> Result<PreparedAction> {
        let ctx = self.key_context()?;
        let spending_address = ctx.treasury.spending_address(self.network)?;
        let treasury_utxos = self.chain.utxos_at(&spending_address)?;
        let lovelace = total_lovelace(&treasury_utxos)?;
        log::debug!(
            "withdrawing {} treasury outputs ({lovelace} lovelace)",
            treasury_utxos.len()
        );
        let desc = build_withdraw_tx(
            &ctx.treasury,
            &WithdrawParams {
                key: ctx.location,
                treasury_utxos,
                change_address: ctx.holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::Withdrawn {
                tx_hash: unsigned.tx_hash,
                lovelace,
            },
            unsigned,
        })
    }

    fn prepare_delegate(&self, pool: PoolId, drep: DRep) -> Result<PreparedAction> {
        let ctx = self.key_context()?;
        let desc = build_delegate_tx(
            &ctx.treasury,
            &DelegateParams {
                key: ctx.location,
                pool,
                drep,
                change_address: ctx.holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::Delegated {
                tx_hash: unsigned.tx_hash,
                pool,
                drep,
            },
            unsigned,
        })
    }

    fn prepare_redelegate(&self, pool: PoolId) -> Result<PreparedAction> {
        let ctx = self.key_context()?;
        let desc = build_redelegate_tx(
            &ctx.treasury,
            &RedelegateParams {
                key: ctx.location,
                pool,
                change_address: ctx.holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::Redelegated {
                tx_hash: unsigned.tx_hash,
                pool,
            },
            unsigned,
        })
    }

    fn prepare_withdraw_stake(&self) -> Result<PreparedAction> {
        let ctx = self.key_context()?;
        let reward_address = ctx.treasury.reward_address(self.network)?;
        let amount = self.oracle.withdrawable_rewards(&reward_address)?;
        log::debug!("{reward_address} has {amount} lovelace withdrawable");
        if amount == 0 {
            return Err(Error::NoRewards(reward_address.to_string()));
        }
        let desc = build_claim_rewards_tx(
            &ctx.treasury,
            &ClaimRewardsParams {
                key: ctx.location,
                reward_address,
                amount,
                change_address: ctx.holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::RewardsWithdrawn {
                tx_hash: unsigned.tx_hash,
                lovelace: amount,
            },
            unsigned,
        })
    }

    fn prepare_unregister(&self) -> Result<PreparedAction> {
        let ctx = self.key_context()?;
        let desc = build_deregister_tx(
            &ctx.treasury,
            &DeregisterParams {
                key: ctx.location,
                change_address: ctx.holder,
            },
        )?;
        let unsigned = self.build(&desc)?;
        Ok(PreparedAction {
            receipt: ActionReceipt::Unregistered {
                tx_hash: unsigned.tx_hash,
            },
            unsigned,
        })
    }

    // ── Internal: shared steps ──────────────────────────────────────────

    /// Resolve the key live and compile the treasury it unlocks.
    fn key_context(&self) -> Result<KeyContext> {
        let holder = self.wallet.address()?;
        let location = self.keys.resolve(self.chain.as_ref(), &holder)?;
        let treasury = CompiledTreasury::new(&self.templates.treasury, location.token.policy_id)?;
        Ok(KeyContext {
            holder,
            location,
            treasury,
        })
    }

    fn build(&self, desc: &TxDescription) -> Result<UnsignedTx> {
        self.builder.build(desc)
    }
}

fn total_lovelace(utxos: &[Utxo]) -> Result<u64> {
    utxos
        .iter()
        .try_fold(0u64, |acc, u| acc.checked_add(u.value.lovelace))
        .ok_or(Error::ValueOverflow)
}

impl std::fmt::Debug for KeygateSdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeygateSdk")
            .field("network", &self.network)
            .field("templates", &self.templates)
            .finish_non_exhaustive()
    }
}
