//! `KeygateNode`: async front end for [`KeygateSdk`].
//!
//! Each call runs the blocking SDK on `tokio::task::spawn_blocking` and
//! reports its outcome on a broadcast channel, so UI code can fire actions
//! and react to results without blocking.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::action::{ActionKind, ActionReceipt, KeyAction, PreparedAction};
use crate::address::PoolId;
use crate::contract::ScriptAddresses;
use crate::error::{Error, NodeError};
use crate::governance::DRep;
use crate::key::KeyLocation;
use crate::ledger::parse_ada;
use crate::sdk::KeygateSdk;

const EVENT_CAPACITY: usize = 64;

/// Outcome of one action, as published to subscribers.
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub kind: ActionKind,
    pub outcome: Result<ActionReceipt, String>,
}

// ── Struct ──────────────────────────────────────────────────────────────────

/// Async coordinator around a shared [`KeygateSdk`].
///
/// Calls share the SDK through an `Arc` with no lock around it. Concurrent
/// actions run concurrently, and two that spend the same key output race at
/// broadcast.
pub struct KeygateNode {
    sdk: Arc<KeygateSdk>,
    events: broadcast::Sender<ActionEvent>,
}

// ── Construction ────────────────────────────────────────────────────────────

impl KeygateNode {
    pub fn new(sdk: KeygateSdk) -> (Self, broadcast::Receiver<ActionEvent>) {
        let (events, rx) = broadcast::channel(EVENT_CAPACITY);
        (
            Self {
                sdk: Arc::new(sdk),
                events,
            },
            rx,
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.events.subscribe()
    }

    pub fn sdk(&self) -> &Arc<KeygateSdk> {
        &self.sdk
    }

    // ── Internal: spawn_blocking SDK helper ─────────────────────────────

    async fn with_sdk<F, R>(&self, f: F) -> Result<R, NodeError>
    where
        F: FnOnce(&KeygateSdk) -> Result<R, Error> + Send + 'static,
        R: Send + 'static,
    {
        let sdk = self.sdk.clone();
        tokio::task::spawn_blocking(move || f(&sdk).map_err(NodeError::Sdk))
            .await
            .map_err(|e| NodeError::Task(e.to_string()))?
    }

    fn publish(&self, kind: ActionKind, outcome: &Result<ActionReceipt, NodeError>) {
        let event = ActionEvent {
            kind,
            outcome: match outcome {
                Ok(receipt) => Ok(receipt.clone()),
                Err(e) => Err(e.to_string()),
            },
        };
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub async fn key_location(&self) -> Result<KeyLocation, NodeError> {
        self.with_sdk(|sdk| sdk.key_location()).await
    }

    pub async fn script_addresses(&self) -> Result<ScriptAddresses, NodeError> {
        self.with_sdk(|sdk| sdk.script_addresses()).await
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Gather inputs and build, without submitting.
    pub async fn prepare(&self, action: KeyAction) -> Result<PreparedAction, NodeError> {
        self.with_sdk(move |sdk| sdk.prepare(&action)).await
    }

    pub async fn submit(&self, prepared: PreparedAction) -> Result<ActionReceipt, NodeError> {
        let kind = prepared.kind();
        let outcome = self.with_sdk(move |sdk| sdk.submit(prepared)).await;
        self.publish(kind, &outcome);
        outcome
    }

    pub async fn execute(&self, action: KeyAction) -> Result<ActionReceipt, NodeError> {
        let kind = action.kind();
        let outcome = self.with_sdk(move |sdk| sdk.execute(&action)).await;
        self.publish(kind, &outcome);
        outcome
    }

    pub async fn mint_key(&self, label: impl Into<String>) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::Mint {
            label: label.into(),
        })
        .await
    }

    pub async fn deposit(&self, lovelace: u64) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::Deposit { lovelace }).await
    }

    pub async fn deposit_ada(&self, ada: &str) -> Result<ActionReceipt, NodeError> {
        let lovelace = parse_ada(ada)?;
        self.deposit(lovelace).await
    }

    pub async fn withdraw(&self) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::Withdraw).await
    }

    pub async fn delegate_stake(&self, pool: PoolId, drep: DRep) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::DelegateStake { pool, drep }).await
    }

    pub async fn redelegate_stake(&self, pool: PoolId) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::RedelegateStake { pool }).await
    }

    pub async fn withdraw_stake(&self) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::WithdrawStake).await
    }

    pub async fn unregister_stake(&self) -> Result<ActionReceipt, NodeError> {
        self.execute(KeyAction::UnregisterStake).await
    }
}
