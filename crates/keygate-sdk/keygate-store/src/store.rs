use std::path::Path;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use keygate_sdk::config::{DEFAULT_KEY_SLOT, KeyStoreConfig};
use keygate_sdk::{AssetName, KeyStore, KeyToken, PolicyId, SessionKeyStore};

use crate::error::StoreError;
use crate::models::{KeySlotRow, NewKeySlotRow};
use crate::schema::key_slots;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// SQLite-backed key slot that survives process restarts.
///
/// A database may hold several named slots; each store instance reads and
/// writes exactly one of them. All methods take `&mut self` because Diesel's
/// `SqliteConnection` requires `&mut` for every operation, reads included.
pub struct KeygateStore {
    conn: SqliteConnection,
    slot: String,
}

impl KeygateStore {
    /// Open (or create) a store at `path` using the default slot. Runs migrations.
    pub fn open(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::open_slot(path, DEFAULT_KEY_SLOT)
    }

    pub fn open_slot(path: impl AsRef<Path>, slot: &str) -> crate::Result<Self> {
        let path = path.as_ref();
        let url = path
            .to_str()
            .ok_or_else(|| StoreError::InvalidData(format!("non UTF-8 path {}", path.display())))?;
        Self::with_connection(SqliteConnection::establish(url)?, slot)
    }

    /// Open an in-memory store for tests.
    pub fn open_in_memory() -> crate::Result<Self> {
        Self::with_connection(SqliteConnection::establish(":memory:")?, DEFAULT_KEY_SLOT)
    }

    fn with_connection(mut conn: SqliteConnection, slot: &str) -> crate::Result<Self> {
        if slot.is_empty() {
            return Err(StoreError::InvalidData("slot name must not be empty".into()));
        }
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(KeygateStore {
            conn,
            slot: slot.to_string(),
        })
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// The key token in this slot, if one was ever written.
    pub fn get_key(&mut self) -> crate::Result<Option<KeyToken>> {
        let row: Option<KeySlotRow> = key_slots::table
            .filter(key_slots::slot_name.eq(&self.slot))
            .select(KeySlotRow::as_select())
            .first(&mut self.conn)
            .optional()?;
        row.map(row_to_token).transpose()
    }

    /// Write `token` to this slot, replacing whatever was there.
    pub fn put_key(&mut self, token: &KeyToken) -> crate::Result<()> {
        let row = NewKeySlotRow {
            slot_name: &self.slot,
            policy_id: token.policy_id.as_bytes().to_vec(),
            asset_name: token.asset_name.as_bytes().to_vec(),
            updated_at: chrono::Utc::now().to_rfc3339(),
        };
        diesel::replace_into(key_slots::table)
            .values(&row)
            .execute(&mut self.conn)?;
        Ok(())
    }

    /// Empty this slot. Returns whether a key was removed.
    pub fn clear_key(&mut self) -> crate::Result<bool> {
        let removed = diesel::delete(key_slots::table.filter(key_slots::slot_name.eq(&self.slot)))
            .execute(&mut self.conn)?;
        Ok(removed > 0)
    }

    /// When this slot was last written (RFC 3339).
    pub fn updated_at(&mut self) -> crate::Result<Option<String>> {
        Ok(key_slots::table
            .filter(key_slots::slot_name.eq(&self.slot))
            .select(key_slots::updated_at)
            .first(&mut self.conn)
            .optional()?)
    }
}

fn row_to_token(row: KeySlotRow) -> crate::Result<KeyToken> {
    let policy_id = PolicyId::from_slice(&row.policy_id).map_err(|e| {
        StoreError::InvalidData(format!("policy id {}: {e}", hex::encode(&row.policy_id)))
    })?;
    let asset_name = AssetName::new(row.asset_name).map_err(|e| {
        StoreError::InvalidData(format!("asset name in slot {}: {e}", row.slot_name))
    })?;
    Ok(KeyToken::new(policy_id, asset_name))
}

impl KeyStore for KeygateStore {
    fn get(&mut self) -> std::result::Result<Option<KeyToken>, String> {
        self.get_key().map_err(|e| e.to_string())
    }

    fn set(&mut self, token: &KeyToken) -> std::result::Result<(), String> {
        self.put_key(token).map_err(|e| e.to_string())
    }
}

/// Build the key store a deployment asked for.
pub fn open_key_store(config: &KeyStoreConfig) -> crate::Result<Box<dyn KeyStore>> {
    let store: Box<dyn KeyStore> = match config {
        KeyStoreConfig::Session => Box::new(SessionKeyStore::new()),
        KeyStoreConfig::Durable { path, slot } => Box::new(KeygateStore::open_slot(path, slot)?),
    };
    Ok(store)
}
