//! LMDB-backed store (feature `lmdb`)
//!
//! Values are laid out as an 8-byte big-endian deadline followed by the payload.

use crate::{Clock, ExchangeStore, StoreEntry, StoreError, SystemClock};
use heed::types::{Bytes, Str};
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;
use std::sync::Arc;

const DATABASE_NAME: &str = "gift_exchange";
const DEADLINE_LEN: usize = 8;

/// Persistent store over a single LMDB database
pub struct HeedStore {
    env: Env,
    db: Database<Str, Bytes>,
    clock: Arc<dyn Clock>,
}

impl HeedStore {
    /// Open (or create) the environment at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock<P: AsRef<Path>>(
        path: P,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path.as_ref()).map_err(storage)?;

        // SAFETY: the environment is opened once per path by this store and
        // never memory-mapped twice in the same process.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(16 * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(storage)?;

        let mut wtxn = env.write_txn().map_err(storage)?;
        let db: Database<Str, Bytes> = env
            .create_database(&mut wtxn, Some(DATABASE_NAME))
            .map_err(storage)?;
        wtxn.commit().map_err(storage)?;

        Ok(Self { env, db, clock })
    }
}

fn storage(e: impl std::fmt::Display) -> StoreError {
    StoreError::Storage(e.to_string().into())
}

fn encode(value: &[u8], expires_at_millis: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(DEADLINE_LEN + value.len());
    buf.extend_from_slice(&expires_at_millis.to_be_bytes());
    buf.extend_from_slice(value);
    buf
}

fn decode(raw: &[u8]) -> Result<StoreEntry, StoreError> {
    if raw.len() < DEADLINE_LEN {
        return Err(StoreError::Storage("truncated entry".into()));
    }
    let (deadline, value) = raw.split_at(DEADLINE_LEN);
    let mut bytes = [0u8; DEADLINE_LEN];
    bytes.copy_from_slice(deadline);
    Ok(StoreEntry {
        value: value.to_vec(),
        expires_at_millis: u64::from_be_bytes(bytes),
    })
}

impl ExchangeStore for HeedStore {
    fn get(&self, key: &str) -> Result<Option<StoreEntry>, StoreError> {
        let rtxn = self.env.read_txn().map_err(storage)?;
        let Some(raw) = self.db.get(&rtxn, key).map_err(storage)? else {
            return Ok(None);
        };
        let entry = decode(raw)?;
        if entry.expires_at_millis <= self.clock.now_millis() {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    fn put_batch(
        &self,
        entries: &[(&str, Vec<u8>)],
        expires_at_millis: u64,
    ) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(storage)?;
        for (key, value) in entries {
            self.db
                .put(&mut wtxn, *key, encode(value, expires_at_millis).as_slice())
                .map_err(storage)?;
        }
        wtxn.commit().map_err(storage)
    }

    fn remove_batch(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(storage)?;
        for key in keys {
            self.db.delete(&mut wtxn, *key).map_err(storage)?;
        }
        wtxn.commit().map_err(storage)
    }

    fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }
}
