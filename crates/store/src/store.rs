// Path: crates/store/src/store.rs
use crate::key::{EmitterPrefix, VaaId};
use crate::metrics::metrics;
use aegis_types::error::StoreError;
use aegis_vaa::Vaa;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// ---- Table definitions (single DB, fixed-width prefix-encoded keys) ----
const SIGNED_VAAS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("SIGNED_VAAS");

/// Sequence-gap scan result for one emitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGap {
    /// Lowest stored sequence; 0 when the prefix is empty.
    pub first: u64,
    /// Highest stored sequence; 0 when the prefix is empty.
    pub last: u64,
    /// Ascending sequences in `[first, last]` with no stored VAA.
    pub missing: Vec<u64>,
}

/// Outcome of a purge pass over one emitter prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeStats {
    /// Keys deleted (or that would be deleted, under `dry_run`).
    pub deleted: u64,
    /// Keys retained.
    pub kept: u64,
}

/// The thread-safe signed-VAA store. Cloning shares one database handle;
/// concurrent reads and writes from any task are permitted.
#[derive(Clone)]
pub struct VaaStore {
    db: Arc<Database>,
}

impl VaaStore {
    /// Opens (or creates) the store at `path` and ensures the table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let w = db
                .begin_write()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            w.open_table(SIGNED_VAAS)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            w.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(VaaStore { db: Arc::new(db) })
    }

    /// Idempotent put of the marshaled VAA under its `(chain, emitter,
    /// sequence)` key.
    pub fn store_signed_vaa(&self, vaa: &Vaa) -> Result<(), StoreError> {
        let id = VaaId::from_vaa(vaa);
        let key = id.key();
        let value = vaa.encode();

        let w = self
            .db
            .begin_write()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let mut table = w
                .open_table(SIGNED_VAAS)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        w.commit().map_err(|e| StoreError::Backend(e.to_string()))?;

        metrics().inc_vaas_stored();
        debug!(target: "store", id = %id, bytes = value.len(), "stored signed VAA");
        Ok(())
    }

    pub fn has_vaa(&self, id: &VaaId) -> Result<bool, StoreError> {
        Ok(self.get_signed_vaa_bytes(id)?.is_some())
    }

    /// The marshaled VAA under `id`, if present.
    pub fn get_signed_vaa_bytes(&self, id: &VaaId) -> Result<Option<Vec<u8>>, StoreError> {
        let r = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = r
            .open_table(SIGNED_VAAS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let value = table
            .get(id.key().as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(value.map(|guard| guard.value().to_vec()))
    }

    /// The decoded VAA under `id`, if present.
    pub fn get_signed_vaa(&self, id: &VaaId) -> Result<Option<Vaa>, StoreError> {
        match self.get_signed_vaa_bytes(id)? {
            None => Ok(None),
            Some(bytes) => Vaa::decode(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Malformed {
                    key: id.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    /// Scans one emitter and reports the missing sequences between the first
    /// and last stored ones. An empty prefix yields `(0, 0, [])`.
    pub fn find_emitter_sequence_gap(
        &self,
        emitter: &EmitterPrefix,
    ) -> Result<SequenceGap, StoreError> {
        let sequences = self.stored_sequences(emitter)?;

        let (Some(&first), Some(&last)) = (sequences.first(), sequences.last()) else {
            return Ok(SequenceGap {
                first: 0,
                last: 0,
                missing: Vec::new(),
            });
        };

        let mut missing = Vec::new();
        let mut expected = first;
        for &seq in &sequences {
            while expected < seq {
                missing.push(expected);
                expected += 1;
            }
            expected = seq.saturating_add(1);
        }

        Ok(SequenceGap {
            first,
            last,
            missing,
        })
    }

    /// Deletes (or, under `dry_run`, only counts) every VAA in the prefix
    /// whose timestamp is strictly before `older_than`.
    pub fn purge(
        &self,
        emitter: &EmitterPrefix,
        older_than: u32,
        dry_run: bool,
    ) -> Result<PurgeStats, StoreError> {
        let (lo, hi) = emitter.range();
        let mut doomed: Vec<Vec<u8>> = Vec::new();
        let mut kept = 0u64;

        {
            let r = self
                .db
                .begin_read()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let table = r
                .open_table(SIGNED_VAAS)
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            let iter = table
                .range(lo.as_slice()..=hi.as_slice())
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            for entry in iter {
                let (key, value) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
                let id = VaaId::from_key(key.value())?;
                let vaa = Vaa::decode(value.value()).map_err(|e| StoreError::Malformed {
                    key: id.to_string(),
                    reason: e.to_string(),
                })?;
                if vaa.timestamp < older_than {
                    if dry_run {
                        debug!(target: "store", id = %id, timestamp = vaa.timestamp, "would purge");
                    }
                    doomed.push(key.value().to_vec());
                } else {
                    kept += 1;
                }
            }
        }

        let deleted = doomed.len() as u64;
        if !dry_run && !doomed.is_empty() {
            let w = self
                .db
                .begin_write()
                .map_err(|e| StoreError::Backend(e.to_string()))?;
            {
                let mut table = w
                    .open_table(SIGNED_VAAS)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                for key in &doomed {
                    table
                        .remove(key.as_slice())
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                }
            }
            w.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
            metrics().inc_vaas_purged(deleted);
        }

        info!(
            target: "store",
            emitter = %emitter,
            older_than,
            dry_run,
            deleted,
            kept,
            "purge pass complete"
        );
        Ok(PurgeStats { deleted, kept })
    }

    /// Distinct `(chain, emitter)` prefixes in key order.
    pub fn list_emitters(&self) -> Result<Vec<EmitterPrefix>, StoreError> {
        let r = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = r
            .open_table(SIGNED_VAAS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut emitters: Vec<EmitterPrefix> = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        for entry in iter {
            let (key, _) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            let emitter = VaaId::from_key(key.value())?.emitter();
            if emitters.last() != Some(&emitter) {
                emitters.push(emitter);
            }
        }
        Ok(emitters)
    }

    /// Number of stored VAAs under one emitter.
    pub fn count_prefix(&self, emitter: &EmitterPrefix) -> Result<u64, StoreError> {
        Ok(self.stored_sequences(emitter)?.len() as u64)
    }

    fn stored_sequences(&self, emitter: &EmitterPrefix) -> Result<Vec<u64>, StoreError> {
        let (lo, hi) = emitter.range();
        let r = self
            .db
            .begin_read()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = r
            .open_table(SIGNED_VAAS)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let iter = table
            .range(lo.as_slice()..=hi.as_slice())
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut sequences = Vec::new();
        for entry in iter {
            let (key, _) = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            sequences.push(VaaId::from_key(key.value())?.sequence);
        }
        Ok(sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aegis_types::{Address, ChainId};
    use aegis_vaa::vaa::VERSION;

    fn test_store() -> (tempfile::TempDir, VaaStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = VaaStore::open(dir.path().join("vaas.redb")).unwrap();
        (dir, store)
    }

    fn make_vaa(emitter: u8, sequence: u64, timestamp: u32) -> Vaa {
        Vaa {
            version: VERSION,
            guardian_set_index: 0,
            signatures: vec![],
            timestamp,
            nonce: 0,
            emitter_chain: ChainId::ETHEREUM,
            emitter_address: Address::from_short(&[emitter]).unwrap(),
            sequence,
            consistency_level: 1,
            payload: vec![1, 2, 3],
        }
    }

    fn emitter(e: u8) -> EmitterPrefix {
        EmitterPrefix {
            chain: ChainId::ETHEREUM,
            address: Address::from_short(&[e]).unwrap(),
        }
    }

    #[test]
    fn test_store_and_get_round_trip() {
        let (_dir, store) = test_store();
        let vaa = make_vaa(1, 5, 100);
        store.store_signed_vaa(&vaa).unwrap();

        let id = VaaId::from_vaa(&vaa);
        assert!(store.has_vaa(&id).unwrap());
        assert_eq!(store.get_signed_vaa(&id).unwrap().unwrap(), vaa);
        assert_eq!(
            store.get_signed_vaa_bytes(&id).unwrap().unwrap(),
            vaa.encode()
        );

        // Idempotent put.
        store.store_signed_vaa(&vaa).unwrap();
        assert_eq!(store.count_prefix(&emitter(1)).unwrap(), 1);

        assert!(!store
            .has_vaa(&VaaId {
                sequence: 6,
                ..id
            })
            .unwrap());
    }

    #[test]
    fn test_sequence_gap_detection() {
        let (_dir, store) = test_store();
        for seq in [3u64, 4, 7, 10] {
            store.store_signed_vaa(&make_vaa(1, seq, 100)).unwrap();
        }
        // A different emitter must not bleed into the scan.
        store.store_signed_vaa(&make_vaa(2, 5, 100)).unwrap();

        let gap = store.find_emitter_sequence_gap(&emitter(1)).unwrap();
        assert_eq!(gap.first, 3);
        assert_eq!(gap.last, 10);
        assert_eq!(gap.missing, vec![5, 6, 8, 9]);
    }

    #[test]
    fn test_sequence_gap_none_and_empty() {
        let (_dir, store) = test_store();
        assert_eq!(
            store.find_emitter_sequence_gap(&emitter(1)).unwrap(),
            SequenceGap {
                first: 0,
                last: 0,
                missing: vec![]
            }
        );

        for seq in 0..5u64 {
            store.store_signed_vaa(&make_vaa(1, seq, 100)).unwrap();
        }
        let gap = store.find_emitter_sequence_gap(&emitter(1)).unwrap();
        assert_eq!((gap.first, gap.last), (0, 4));
        assert!(gap.missing.is_empty());
    }

    #[test]
    fn test_purge_retains_recent() {
        let (_dir, store) = test_store();
        let cutoff: u32 = 1_000_000;
        for seq in 0..50u64 {
            store
                .store_signed_vaa(&make_vaa(1, seq, cutoff - 1))
                .unwrap();
        }
        for seq in 50..125u64 {
            store
                .store_signed_vaa(&make_vaa(1, seq, cutoff + seq as u32))
                .unwrap();
        }

        // Dry run deletes nothing.
        let stats = store.purge(&emitter(1), cutoff, true).unwrap();
        assert_eq!(stats, PurgeStats {
            deleted: 50,
            kept: 75
        });
        assert_eq!(store.count_prefix(&emitter(1)).unwrap(), 125);

        let stats = store.purge(&emitter(1), cutoff, false).unwrap();
        assert_eq!(stats.deleted, 50);
        assert_eq!(store.count_prefix(&emitter(1)).unwrap(), 75);

        // Boundary: a VAA exactly at the cutoff survives.
        let gap = store.find_emitter_sequence_gap(&emitter(1)).unwrap();
        assert_eq!(gap.first, 50);
    }

    #[test]
    fn test_list_emitters() {
        let (_dir, store) = test_store();
        for e in [1u8, 2, 3] {
            for seq in 0..3u64 {
                store.store_signed_vaa(&make_vaa(e, seq, 100)).unwrap();
            }
        }
        let emitters = store.list_emitters().unwrap();
        assert_eq!(emitters, vec![emitter(1), emitter(2), emitter(3)]);
    }
}
