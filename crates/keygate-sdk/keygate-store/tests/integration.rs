use keygate_sdk::config::KeyStoreConfig;
use keygate_sdk::{AssetName, KeyRegistry, KeyToken, NoKeyReason, PolicyId};
use keygate_store::{KeygateStore, open_key_store};

// ==================== Test Helpers ====================

fn alpha() -> KeyToken {
    KeyToken::new(PolicyId([0xa1; 28]), AssetName::from_label("ALPHA").unwrap())
}

fn durable(dir: &tempfile::TempDir, slot: &str) -> KeyStoreConfig {
    KeyStoreConfig::Durable {
        path: dir.path().join("keys.sqlite3"),
        slot: slot.to_string(),
    }
}

// ==================== Persistence ====================

#[test]
fn durable_slot_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.sqlite3");

    {
        let mut store = KeygateStore::open(&path).unwrap();
        store.put_key(&alpha()).unwrap();
    }

    let mut reopened = KeygateStore::open(&path).unwrap();
    assert_eq!(reopened.slot(), "KEY");
    assert_eq!(reopened.get_key().unwrap(), Some(alpha()));
}

#[test]
fn slots_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.sqlite3");

    let mut treasury_a = KeygateStore::open_slot(&path, "A").unwrap();
    let mut treasury_b = KeygateStore::open_slot(&path, "B").unwrap();
    treasury_a.put_key(&alpha()).unwrap();

    assert_eq!(treasury_a.get_key().unwrap(), Some(alpha()));
    assert_eq!(treasury_b.get_key().unwrap(), None);
}

// ==================== Registry wiring ====================

#[test]
fn registry_over_durable_config_remembers_key() {
    let dir = tempfile::tempdir().unwrap();

    let registry = KeyRegistry::new(open_key_store(&durable(&dir, "KEY")).unwrap());
    registry.record(&alpha()).unwrap();
    drop(registry);

    let registry = KeyRegistry::new(open_key_store(&durable(&dir, "KEY")).unwrap());
    assert_eq!(registry.recorded().unwrap(), alpha());
}

#[test]
fn registry_over_session_config_forgets_key() {
    let registry = KeyRegistry::new(open_key_store(&KeyStoreConfig::Session).unwrap());
    registry.record(&alpha()).unwrap();
    assert_eq!(registry.recorded().unwrap(), alpha());

    let registry = KeyRegistry::new(open_key_store(&KeyStoreConfig::Session).unwrap());
    match registry.recorded().unwrap_err() {
        keygate_sdk::Error::NoKeySession(NoKeyReason::NeverMinted) => {}
        other => panic!("expected NeverMinted, got {other:?}"),
    }
}
