//! Expiring key-value store trait

use crate::{Clock, StoreError, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A stored value with its absolute expiry deadline
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreEntry {
    /// Encoded payload
    pub value: Vec<u8>,
    /// Millis since UNIX epoch after which the entry reads as absent
    pub expires_at_millis: u64,
}

/// Key-value storage with per-entry deadlines
///
/// An entry whose deadline is at or before the store's current time reads
/// as absent.
pub trait ExchangeStore: Send + Sync + 'static {
    /// Live entry for `key`, `None` when missing or expired
    fn get(&self, key: &str) -> Result<Option<StoreEntry>, StoreError>;

    /// Write every entry in one step, all sharing `expires_at_millis`
    fn put_batch(
        &self,
        entries: &[(&str, Vec<u8>)],
        expires_at_millis: u64,
    ) -> Result<(), StoreError>;

    /// Delete every key; missing keys are ignored
    fn remove_batch(&self, keys: &[&str]) -> Result<(), StoreError>;

    /// Current time as seen by the store's expiry check
    fn now_millis(&self) -> u64;
}

/// In-memory store
pub struct InMemoryStore {
    data: RwLock<HashMap<Box<str>, StoreEntry>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryStore {
    /// Store expiring against the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Store expiring against `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of entries held, expired ones included until they are read
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Whether no entries are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExchangeStore for InMemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoreEntry>, StoreError> {
        let now = self.clock.now_millis();
        {
            let data = self.data.read().map_err(|e| StoreError::Storage(e.to_string().into()))?;
            match data.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at_millis > now => return Ok(Some(entry.clone())),
                Some(_) => {}
            }
        }

        // Expired: purge so the map does not keep dead collections around
        let mut data = self.data.write().map_err(|e| StoreError::Storage(e.to_string().into()))?;
        if data.get(key).is_some_and(|entry| entry.expires_at_millis <= now) {
            data.remove(key);
        }
        Ok(None)
    }

    fn put_batch(
        &self,
        entries: &[(&str, Vec<u8>)],
        expires_at_millis: u64,
    ) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::Storage(e.to_string().into()))?;
        for (key, value) in entries {
            data.insert(
                (*key).into(),
                StoreEntry {
                    value: value.clone(),
                    expires_at_millis,
                },
            );
        }
        Ok(())
    }

    fn remove_batch(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut data = self.data.write().map_err(|e| StoreError::Storage(e.to_string().into()))?;
        for key in keys {
            data.remove(*key);
        }
        Ok(())
    }

    fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
