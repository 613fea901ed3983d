//! Chunked payload persistence
//!
//! Splits a logical payload into ordered fragments no longer than the record
//! limit and reassembles them on read. Each key space `S` has two slots, and
//! only one is live at a time:
//!
//! - `S/head` names the live slot, `0` or `1`
//! - `S/{slot}/0`, `S/{slot}/1`, ... hold the fragments in order
//! - `S/{slot}/count` holds the number of fragments, as decimal text
//!
//! A write fills the idle slot (fragments, then count) and flips `S/head`
//! last. A write that fails part way leaves the head on the previous slot,
//! so readers keep seeing the last complete payload.
//!
//! Key spaces written by earlier versions (`S/count` and `S/{i}` with no head)
//! are still readable and are removed by the next write.

use chestnet_core::{ChestnetError, Result, StorageConfig};

use crate::effects::{RecordStore, StorageError};

const HEAD_SUFFIX: &str = "head";
const COUNT_SUFFIX: &str = "count";
const SLOTS: [&str; 2] = ["0", "1"];

/// Fragmenting adapter over a [`RecordStore`]
#[derive(Debug, Clone)]
pub struct ChunkedStore<S> {
    store: S,
    max_record_len: usize,
}

impl<S: RecordStore> ChunkedStore<S> {
    /// Wrap a record store with the given record limit, in bytes
    pub fn new(store: S, max_record_len: usize) -> Result<Self> {
        if max_record_len < 4 {
            return Err(ChestnetError::invalid(format!(
                "max_record_len must be at least 4 (got {max_record_len})"
            )));
        }
        Ok(Self {
            store,
            max_record_len,
        })
    }

    /// Wrap a record store using the storage configuration
    pub fn from_config(store: S, config: &StorageConfig) -> Result<Self> {
        Self::new(store, config.max_record_len)
    }

    /// Record limit in bytes
    pub fn max_record_len(&self) -> usize {
        self.max_record_len
    }

    /// Underlying record store
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Replace the payload stored under `key_space`
    ///
    /// On error the previously stored payload is still the one read back.
    pub fn write(&self, key_space: &str, payload: &str) -> Result<()> {
        check_key_space(key_space)?;
        let fragments = split_fragments(payload, self.max_record_len);
        let live = match self.live_slot(key_space) {
            // a corrupt head is replaced by this write
            Err(ChestnetError::Decode { .. }) => None,
            other => other?,
        };
        let target = match live {
            Some(slot) if slot == SLOTS[0] => SLOTS[1],
            _ => SLOTS[0],
        };

        // leftovers of an earlier interrupted write
        self.remove_matching(key_space, |rest| in_slot(rest, target))?;
        for (index, fragment) in fragments.iter().enumerate() {
            self.store.store(
                &fragment_key(key_space, target, index),
                fragment.as_bytes().to_vec(),
            )?;
        }
        self.store.store(
            &count_key(key_space, target),
            fragments.len().to_string().into_bytes(),
        )?;
        self.store
            .store(&head_key(key_space), target.as_bytes().to_vec())?;

        // the new payload is live; stale records only cost space
        let retired = self.remove_matching(key_space, |rest| {
            rest != HEAD_SUFFIX && !in_slot(rest, target)
        });
        if let Err(e) = &retired {
            tracing::warn!(key_space, error = %e, "failed to remove retired fragments");
        }

        tracing::trace!(
            key_space,
            slot = target,
            bytes = payload.len(),
            fragments = fragments.len(),
            retired = retired.unwrap_or(0),
            "wrote chunked payload"
        );
        Ok(())
    }

    /// Read the payload stored under `key_space`
    ///
    /// Returns an empty string when nothing was ever written. A missing or
    /// malformed fragment is a decode error.
    pub fn read(&self, key_space: &str) -> Result<String> {
        check_key_space(key_space)?;
        let prefix = match self.live_slot(key_space)? {
            Some(slot) => format!("{key_space}/{slot}"),
            None if self.store.exists(&legacy_count_key(key_space))? => key_space.to_string(),
            None => return Ok(String::new()),
        };

        let raw_count = self
            .store
            .retrieve(&format!("{prefix}/{COUNT_SUFFIX}"))?
            .ok_or_else(|| {
                ChestnetError::decode(format!("fragment count missing under {prefix}"))
            })?;
        let count = std::str::from_utf8(&raw_count)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .ok_or_else(|| {
                ChestnetError::decode(format!("unreadable fragment count under {prefix}"))
            })?;

        let mut payload = String::new();
        for index in 0..count {
            let bytes = self
                .store
                .retrieve(&format!("{prefix}/{index}"))?
                .ok_or_else(|| {
                    ChestnetError::decode(format!(
                        "fragment {index} of {count} missing under {prefix}"
                    ))
                })?;
            let fragment = String::from_utf8(bytes).map_err(|e| {
                ChestnetError::decode(format!("fragment {index} under {prefix} is not utf8: {e}"))
            })?;
            payload.push_str(&fragment);
        }

        tracing::trace!(key_space, bytes = payload.len(), fragments = count, "read chunked payload");
        Ok(payload)
    }

    /// Whether anything was ever written under `key_space`
    pub fn exists(&self, key_space: &str) -> Result<bool> {
        check_key_space(key_space)?;
        Ok(self.store.exists(&head_key(key_space))?
            || self.store.exists(&legacy_count_key(key_space))?)
    }

    /// Remove every record of `key_space`, returning how many went
    pub fn clear(&self, key_space: &str) -> Result<usize> {
        check_key_space(key_space)?;
        self.remove_matching(key_space, |_| true)
    }

    fn live_slot(&self, key_space: &str) -> Result<Option<&'static str>> {
        let Some(raw) = self.store.retrieve(&head_key(key_space))? else {
            return Ok(None);
        };
        SLOTS
            .iter()
            .copied()
            .find(|slot| slot.as_bytes() == raw.as_slice())
            .map(Some)
            .ok_or_else(|| ChestnetError::decode(format!("unreadable head record under {key_space}")))
    }

    /// Remove chunk records of `key_space` whose suffix satisfies `select`
    fn remove_matching(&self, key_space: &str, select: impl Fn(&str) -> bool) -> Result<usize> {
        let prefix = format!("{key_space}/");
        let mut removed = 0;
        for key in self.store.list_keys(Some(&prefix))? {
            let rest = &key[prefix.len()..];
            if is_chunk_record(rest) && select(rest) && self.store.remove(&key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn check_key_space(key_space: &str) -> std::result::Result<(), StorageError> {
    if key_space.is_empty() || key_space.contains('/') {
        return Err(StorageError::InvalidKey {
            reason: format!("key space must be non-empty and free of '/': {key_space:?}"),
        });
    }
    Ok(())
}

/// `head`, `count`, `{i}`, `{slot}/count` or `{slot}/{i}`
fn is_chunk_record(rest: &str) -> bool {
    let leaf = |s: &str| s == COUNT_SUFFIX || s.parse::<usize>().is_ok();
    match rest.split_once('/') {
        Some((slot, tail)) => SLOTS.contains(&slot) && leaf(tail),
        None => rest == HEAD_SUFFIX || leaf(rest),
    }
}

fn in_slot(rest: &str, slot: &str) -> bool {
    rest.split_once('/').is_some_and(|(s, _)| s == slot)
}

fn head_key(key_space: &str) -> String {
    format!("{key_space}/{HEAD_SUFFIX}")
}

fn count_key(key_space: &str, slot: &str) -> String {
    format!("{key_space}/{slot}/{COUNT_SUFFIX}")
}

fn legacy_count_key(key_space: &str) -> String {
    format!("{key_space}/{COUNT_SUFFIX}")
}

fn fragment_key(key_space: &str, slot: &str, index: usize) -> String {
    format!("{key_space}/{slot}/{index}")
}

/// Split on char boundaries into pieces of at most `max_len` bytes
fn split_fragments(payload: &str, max_len: usize) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut start = 0;
    let mut end = 0;
    for (offset, c) in payload.char_indices() {
        let next = offset + c.len_utf8();
        if next - start > max_len {
            fragments.push(&payload[start..end]);
            start = end;
        }
        end = next;
    }
    if start < payload.len() {
        fragments.push(&payload[start..]);
    }
    fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRecordStore;
    use assert_matches::assert_matches;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SPACE: &str = "chestnet:test";

    fn store(max: usize) -> ChunkedStore<MemoryRecordStore> {
        store_on(&MemoryRecordStore::new(), max)
    }

    fn store_on(memory: &MemoryRecordStore, max: usize) -> ChunkedStore<MemoryRecordStore> {
        ChunkedStore::new(memory.clone(), max).unwrap()
    }

    #[test]
    fn test_split_respects_limit_and_boundaries() {
        let fragments = split_fragments("aéé€b", 4);
        assert_eq!(fragments, vec!["aé", "é", "€b"]);
        assert!(fragments.iter().all(|f| f.len() <= 4));
        assert!(split_fragments("", 4).is_empty());
    }

    /// Accepts a fixed number of writes, then fails every later one
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
        fn store(&self, key: &str, value: Vec<u8>) -> std::result::Result<(), StorageError> {
            let left = self.writes_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(StorageError::WriteFailed(format!("refused write of {key}")));
            }
            self.writes_left.store(left - 1, Ordering::SeqCst);
            self.inner.store(key, value)
        }

        fn retrieve(&self, key: &str) -> std::result::Result<Option<Vec<u8>>, StorageError> {
            self.inner.retrieve(key)
        }

        fn remove(&self, key: &str) -> std::result::Result<bool, StorageError> {
            self.inner.remove(key)
        }

        fn list_keys(&self, prefix: Option<&str>) -> std::result::Result<Vec<String>, StorageError> {
            self.inner.list_keys(prefix)
        }
    }

    #[test]
    fn test_exact_multiple_of_limit() {
        let chunked = store(8);
        let payload = "abcdefgh12345678";
        chunked.write(SPACE, payload).unwrap();
        // two fragments, the count and the head
        assert_eq!(chunked.inner().len(), 4);
        assert_eq!(chunked.read(SPACE).unwrap(), payload);
    }

    #[test]
    fn test_read_without_write_is_empty() {
        let chunked = store(16);
        assert_eq!(chunked.read(SPACE).unwrap(), "");
        assert!(!chunked.exists(SPACE).unwrap());
    }

    #[test]
    fn test_empty_payload_roundtrip() {
        let chunked = store(16);
        chunked.write(SPACE, "something").unwrap();
        chunked.write(SPACE, "").unwrap();
        assert_eq!(chunked.read(SPACE).unwrap(), "");
        assert!(chunked.exists(SPACE).unwrap());
        assert_eq!(chunked.inner().len(), 2);
    }

    #[test]
    fn test_shrinking_write_leaves_no_stale_fragments() {
        let chunked = store(4);
        chunked.write(SPACE, &"x".repeat(40)).unwrap();
        assert_eq!(chunked.inner().len(), 12);

        chunked.write(SPACE, "short").unwrap();
        assert_eq!(chunked.inner().len(), 4);
        assert_eq!(chunked.read(SPACE).unwrap(), "short");
    }

    #[test]
    fn test_interrupted_write_keeps_previous_payload() {
        let memory = MemoryRecordStore::new();
        let previous = "the payload that was there before".repeat(3);
        store_on(&memory, 8).write(SPACE, &previous).unwrap();
        let before = memory.len();

        // every cut point short of the head flip
        let needed = "a much longer replacement payload".repeat(4).len().div_ceil(8) + 1;
        for writes in 0..=needed {
            let failing = ChunkedStore::new(FailingStore::new(memory.clone(), writes), 8).unwrap();
            let replacement = "a much longer replacement payload".repeat(4);
            assert_matches!(
                failing.write(SPACE, &replacement),
                Err(ChestnetError::Storage { .. })
            );
            assert_eq!(store_on(&memory, 8).read(SPACE).unwrap(), previous);
        }

        // the next complete write reclaims whatever the failures left behind
        store_on(&memory, 8).write(SPACE, "done").unwrap();
        assert_eq!(store_on(&memory, 8).read(SPACE).unwrap(), "done");
        assert_eq!(memory.len(), 3);
        assert!(before > memory.len());
    }

    #[test]
    fn test_legacy_layout_is_read_then_replaced() {
        let chunked = store(4);
        let legacy = chunked.inner();
        legacy.store(&legacy_count_key(SPACE), b"2".to_vec()).unwrap();
        legacy.store(&format!("{SPACE}/0"), b"old ".to_vec()).unwrap();
        legacy.store(&format!("{SPACE}/1"), b"data".to_vec()).unwrap();

        assert!(chunked.exists(SPACE).unwrap());
        assert_eq!(chunked.read(SPACE).unwrap(), "old data");

        chunked.write(SPACE, "new").unwrap();
        assert_eq!(chunked.read(SPACE).unwrap(), "new");
        assert!(!legacy.exists(&legacy_count_key(SPACE)).unwrap());
        assert_eq!(legacy.len(), 3);
    }

    #[test]
    fn test_missing_fragment_is_decode_error() {
        let chunked = store(4);
        chunked.write(SPACE, "0123456789").unwrap();
        chunked
            .inner()
            .remove(&fragment_key(SPACE, SLOTS[0], 1))
            .unwrap();
        assert_matches!(chunked.read(SPACE), Err(ChestnetError::Decode { .. }));
    }

    #[test]
    fn test_garbled_count_is_decode_error() {
        let chunked = store(4);
        chunked.write(SPACE, "0123456789").unwrap();
        chunked
            .inner()
            .store(&count_key(SPACE, SLOTS[0]), b"lots".to_vec())
            .unwrap();
        assert_matches!(chunked.read(SPACE), Err(ChestnetError::Decode { .. }));

        chunked
            .inner()
            .store(&head_key(SPACE), b"7".to_vec())
            .unwrap();
        assert_matches!(chunked.read(SPACE), Err(ChestnetError::Decode { .. }));
    }

    #[test]
    fn test_write_replaces_corrupt_head() {
        let chunked = store(4);
        chunked.write(SPACE, "first").unwrap();
        chunked
            .inner()
            .store(&head_key(SPACE), b"garbage".to_vec())
            .unwrap();
        assert_matches!(chunked.read(SPACE), Err(ChestnetError::Decode { .. }));

        chunked.write(SPACE, "second").unwrap();
        assert_eq!(chunked.read(SPACE).unwrap(), "second");
    }

    #[test]
    fn test_key_spaces_are_isolated() {
        let chunked = store(4);
        chunked.write("alpha", "first payload").unwrap();
        chunked.write("alphabet", "second").unwrap();
        chunked.write("alpha", "x").unwrap();
        assert_eq!(chunked.read("alphabet").unwrap(), "second");
        assert_eq!(chunked.read("alpha").unwrap(), "x");
    }

    #[test]
    fn test_rejects_bad_key_space_and_limit() {
        assert_matches!(
            ChunkedStore::new(MemoryRecordStore::new(), 3),
            Err(ChestnetError::Invalid { .. })
        );
        assert_matches!(store(8).write("a/b", "x"), Err(ChestnetError::Storage { .. }));
    }

    proptest! {
        #[test]
        fn chunk_roundtrip(payload in "\\PC{0,300}", max in 4usize..64) {
            let chunked = store(max);
            chunked.write(SPACE, &payload).unwrap();
            prop_assert!(chunked.inner().largest_record() <= max);
            prop_assert_eq!(chunked.read(SPACE).unwrap(), payload);
        }
    }
}
