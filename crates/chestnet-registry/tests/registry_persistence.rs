//! Registry persistence across reopen

use assert_matches::assert_matches;
use chestnet_core::{
    ChestnetError, ColorTag, ContainerKey, DecodeFailurePolicy, StorageConfig,
};
use chestnet_registry::{Binding, LoadOutcome, NetworkRegistry, RemoteToken};
use chestnet_store::{
    ChunkedStore, FilesystemRecordStore, MemoryRecordStore, RecordStore, StorageError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

fn key(x: i32) -> ContainerKey {
    ContainerKey::new("minecraft:overworld", x, 64, 0)
}

/// Shares a memory store but refuses every write after the first `writes`
struct FailingStore {
    inner: MemoryRecordStore,
    writes_left: AtomicUsize,
}

impl FailingStore {
    fn new(inner: MemoryRecordStore, writes: usize) -> Self {
        Self {
            inner,
            writes_left: AtomicUsize::new(writes),
        }
    }
}

impl RecordStore for FailingStore {
    fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StorageError::WriteFailed(format!("disk full writing {key}")));
        }
        self.writes_left.store(left - 1, Ordering::SeqCst);
        self.inner.store(key, value)
    }

    fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.retrieve(key)
    }

    fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key)
    }

    fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        self.inner.list_keys(prefix)
    }
}

fn populate<S: RecordStore>(registry: &mut NetworkRegistry<S>) {
    let depot = registry
        .create_network("Ore Depot", ColorTag::Red, None)
        .unwrap();
    let vault = registry
        .create_network("Vault | Main", ColorTag::Black, Some("p=|%"))
        .unwrap();
    registry.bind_input(&key(1), &depot.id, None).unwrap();
    registry.bind_output(&key(2), &depot.id, None).unwrap();
    registry.bind_output(&key(2), &vault.id, Some("p=|%")).unwrap();
}

#[test]
fn memory_store_survives_reopen() {
    init_tracing();
    let store = MemoryRecordStore::new();
    let config = StorageConfig::default();

    let (mut registry, outcome) = NetworkRegistry::open(store.clone(), &config).unwrap();
    assert_eq!(outcome, LoadOutcome::Fresh);
    populate(&mut registry);
    let expected = registry.state().clone();
    drop(registry);

    let (reopened, outcome) = NetworkRegistry::open(store, &config).unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Restored {
            networks: 2,
            bindings: 2
        }
    );
    assert_eq!(reopened.state(), &expected);
}

#[test]
fn filesystem_store_survives_reopen() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config = StorageConfig::default();

    let expected = {
        let (mut registry, _) =
            NetworkRegistry::open(FilesystemRecordStore::new(dir.path()), &config).unwrap();
        populate(&mut registry);
        registry.state().clone()
    };

    let (reopened, outcome) =
        NetworkRegistry::open(FilesystemRecordStore::new(dir.path()), &config).unwrap();
    assert_matches!(outcome, LoadOutcome::Restored { networks: 2, .. });
    assert_eq!(reopened.state(), &expected);
}

#[test]
fn deleting_everything_persists_an_empty_registry() {
    init_tracing();
    let store = MemoryRecordStore::new();
    let config = StorageConfig::default();

    let (mut registry, _) = NetworkRegistry::open(store.clone(), &config).unwrap();
    let def = registry.create_network("Farm", ColorTag::Lime, None).unwrap();
    registry.bind_output(&key(5), &def.id, None).unwrap();
    registry.delete_network(&def.id, None).unwrap();
    drop(registry);

    let (reopened, outcome) = NetworkRegistry::open(store, &config).unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Restored {
            networks: 0,
            bindings: 0
        }
    );
    assert!(reopened.bindings().is_empty());
}

#[test]
fn small_records_force_chunking() {
    init_tracing();
    let store = MemoryRecordStore::new();
    let config = StorageConfig {
        max_record_len: 16,
        ..StorageConfig::default()
    };

    let (mut registry, _) = NetworkRegistry::open(store.clone(), &config).unwrap();
    populate(&mut registry);
    for x in 10..40 {
        let id = registry.list_networks()[0].id.clone();
        registry.bind_output(&key(x), &id, None).unwrap();
    }
    let expected = registry.state().clone();
    drop(registry);

    assert!(store.len() > 10);
    assert!(store.largest_record() <= 16);

    let (reopened, _) = NetworkRegistry::open(store, &config).unwrap();
    assert_eq!(reopened.state(), &expected);
}

#[test]
fn failed_save_keeps_last_committed_registry() {
    init_tracing();
    let store = MemoryRecordStore::new();
    let config = StorageConfig {
        max_record_len: 16,
        decode_failure: DecodeFailurePolicy::Fail,
        ..StorageConfig::default()
    };

    let (mut registry, _) = NetworkRegistry::open(store.clone(), &config).unwrap();
    populate(&mut registry);
    registry.create_network("Farm", ColorTag::Lime, None).unwrap();
    let saved = registry.state().clone();
    drop(registry);

    // fail the next save at every possible write until one goes through
    let mut writes = 0;
    loop {
        let (mut registry, _) =
            NetworkRegistry::open(FailingStore::new(store.clone(), writes), &config).unwrap();
        match registry.create_network("Kitchen", ColorTag::Yellow, None) {
            Ok(_) => break,
            Err(err) => {
                assert_matches!(err, ChestnetError::Storage { .. });
                assert_eq!(registry.state(), &saved);
            }
        }

        let (reopened, outcome) = NetworkRegistry::open(store.clone(), &config).unwrap();
        assert_matches!(outcome, LoadOutcome::Restored { networks: 3, .. });
        assert_eq!(reopened.state(), &saved);
        writes += 1;
        assert!(writes < 500, "save never succeeded");
    }
    assert!(writes > 2);

    let (reopened, _) = NetworkRegistry::open(store, &config).unwrap();
    assert_eq!(reopened.network_count(), 4);
}

#[test]
fn corrupt_payload_recovers_or_fails_by_policy() {
    init_tracing();
    let store = MemoryRecordStore::new();
    let chunked = ChunkedStore::new(store.clone(), 64).unwrap();
    chunked
        .write("chestnet:registry", "net:ore-depot.red|Ore Depot|red\nnot a record\n")
        .unwrap();

    let fail = StorageConfig {
        decode_failure: DecodeFailurePolicy::Fail,
        ..StorageConfig::default()
    };
    assert_matches!(
        NetworkRegistry::open(store.clone(), &fail),
        Err(ChestnetError::Decode { message }) if message.starts_with("line 2")
    );

    let (mut registry, outcome) =
        NetworkRegistry::open(store.clone(), &StorageConfig::default()).unwrap();
    assert_matches!(outcome, LoadOutcome::Recovered { .. });
    assert_eq!(registry.network_count(), 0);

    // the first change overwrites the corrupt payload
    registry.create_network("Farm", ColorTag::Lime, None).unwrap();
    let (_, outcome) = NetworkRegistry::open(store, &fail).unwrap();
    assert_matches!(outcome, LoadOutcome::Restored { networks: 1, .. });
}

#[test]
fn token_resolves_against_reopened_registry() {
    init_tracing();
    let store = MemoryRecordStore::new();
    let config = StorageConfig::default();
    let (mut registry, _) = NetworkRegistry::open(store.clone(), &config).unwrap();
    populate(&mut registry);

    let mut token = RemoteToken::new(10);
    token.connect("Smelter", key(1), "barrel").unwrap();
    token.connect("", key(9), "chest").unwrap();
    let lore = token.to_lore();

    registry.unbind_input(&key(1), None).unwrap();
    drop(registry);

    let (mut registry, _) = NetworkRegistry::open(store, &config).unwrap();
    let token = RemoteToken::from_lore(&lore, 10).unwrap();
    let resolved = token.resolve(&registry);
    assert_eq!(resolved.len(), 2);
    assert!(resolved.iter().all(|r| r.binding.is_none()));

    let depot = registry.list_networks()[0].id.clone();
    registry.bind_input(&key(9), &depot, None).unwrap();
    let resolved = token.resolve(&registry);
    assert_eq!(resolved[1].binding, Some(&Binding::Input(depot)));
}
