//! Key registry: remembers which key token this session minted and locates
//! it on the ledger on demand.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::ChainBackend;
use crate::error::{Error, NoKeyReason, Result};
use crate::ledger::{AssetName, AssetUnit, OutputRef, PolicyId, Utxo};

/// Identity of the one-shot authorization token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyToken {
    pub policy_id: PolicyId,
    pub asset_name: AssetName,
}

impl KeyToken {
    pub fn new(policy_id: PolicyId, asset_name: AssetName) -> Self {
        Self {
            policy_id,
            asset_name,
        }
    }

    pub fn unit(&self) -> AssetUnit {
        AssetUnit::new(self.policy_id, self.asset_name.clone())
    }

    pub fn label(&self) -> Option<&str> {
        self.asset_name.label()
    }
}

/// The wallet output holding the key token at the moment it was resolved.
///
/// Only valid until the next transaction that spends it; never cache one
/// across actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLocation {
    pub token: KeyToken,
    pub utxo: Utxo,
}

impl KeyLocation {
    pub fn output_ref(&self) -> OutputRef {
        self.utxo.output_ref
    }
}

/// A single-slot store for the recorded key token.
///
/// Whether the slot outlives the process is up to the implementation:
/// [`SessionKeyStore`] forgets on restart, `keygate_store::KeygateStore`
/// does not.
pub trait KeyStore: Send {
    fn get(&mut self) -> std::result::Result<Option<KeyToken>, String>;
    fn set(&mut self, token: &KeyToken) -> std::result::Result<(), String>;
}

/// In-memory key slot, cleared when the process exits.
#[derive(Debug, Default)]
pub struct SessionKeyStore {
    slot: Option<KeyToken>,
}

impl SessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for SessionKeyStore {
    fn get(&mut self) -> std::result::Result<Option<KeyToken>, String> {
        Ok(self.slot.clone())
    }

    fn set(&mut self, token: &KeyToken) -> std::result::Result<(), String> {
        self.slot = Some(token.clone());
        Ok(())
    }
}

/// Process-wide key registry.
///
/// Written only by a successful mint and read by every other action. The
/// mutex only makes the store shareable; it is never held across a ledger
/// query or a submission.
pub struct KeyRegistry {
    store: Mutex<Box<dyn KeyStore>>,
}

impl KeyRegistry {
    pub fn new(store: Box<dyn KeyStore>) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// A registry backed by a fresh [`SessionKeyStore`].
    pub fn session() -> Self {
        Self::new(Box::new(SessionKeyStore::new()))
    }

    pub fn record(&self, token: &KeyToken) -> Result<()> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| Error::KeyStore("key store lock poisoned".into()))?;
        store.set(token).map_err(Error::KeyStore)?;
        log::info!("recorded key {}", token.unit());
        Ok(())
    }

    /// The recorded key token, or `NoKeySession(NeverMinted)`.
    pub fn recorded(&self) -> Result<KeyToken> {
        let token = {
            let mut store = self
                .store
                .lock()
                .map_err(|_| Error::KeyStore("key store lock poisoned".into()))?;
            store.get().map_err(Error::KeyStore)?
        };
        token.ok_or(Error::NoKeySession(NoKeyReason::NeverMinted))
    }

    /// Find the output currently holding the recorded key at `holder`.
    ///
    /// Queries the ledger on every call.
    pub fn resolve(&self, chain: &dyn ChainBackend, holder: &Address) -> Result<KeyLocation> {
        let token = self.recorded()?;
        let unit = token.unit();
        let utxo = chain
            .utxos_at_with_unit(holder, &unit)?
            .into_iter()
            .find(|u| u.holds(&unit))
            .ok_or_else(|| Error::NoKeySession(NoKeyReason::NotInWallet(unit.clone())))?;
        log::debug!("key {unit} located at {}", utxo.output_ref);
        Ok(KeyLocation { token, utxo })
    }
}

impl std::fmt::Debug for KeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRegistry").finish_non_exhaustive()
    }
}
