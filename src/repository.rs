//! Typed access to the three stored collections

use crate::{Assignment, ExchangeStore, Participant, StoreError, StoreKeys};
use std::sync::Arc;

/// The participant registry together with the deadline every key shares
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Registry {
    pub participants: Vec<Participant>,
    pub expires_at_millis: u64,
}

pub(crate) struct ExchangeRepository {
    store: Arc<dyn ExchangeStore>,
    keys: StoreKeys,
}

impl ExchangeRepository {
    pub fn new(store: Arc<dyn ExchangeStore>, keys: StoreKeys) -> Self {
        Self { store, keys }
    }

    pub fn now_millis(&self) -> u64 {
        self.store.now_millis()
    }

    pub fn load_registry(&self) -> Result<Option<Registry>, StoreError> {
        let Some(entry) = self.store.get(self.keys.participants())? else {
            return Ok(None);
        };
        Ok(Some(Registry {
            participants: serde_json::from_slice(&entry.value)?,
            expires_at_millis: entry.expires_at_millis,
        }))
    }

    /// Registry records, empty when uninitialized
    pub fn load_participants(&self) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .load_registry()?
            .map(|registry| registry.participants)
            .unwrap_or_default())
    }

    pub fn load_assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        match self.store.get(self.keys.assignments())? {
            Some(entry) => Ok(serde_json::from_slice(&entry.value)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn load_drawn(&self) -> Result<bool, StoreError> {
        match self.store.get(self.keys.drawn())? {
            Some(entry) => Ok(serde_json::from_slice(&entry.value)?),
            None => Ok(false),
        }
    }

    /// Fresh registry plus a cleared flag
    pub fn write_initial(
        &self,
        participants: &[Participant],
        expires_at_millis: u64,
    ) -> Result<(), StoreError> {
        self.store.put_batch(
            &[
                (self.keys.participants(), serde_json::to_vec(participants)?),
                (self.keys.drawn(), serde_json::to_vec(&false)?),
            ],
            expires_at_millis,
        )
    }

    pub fn write_participants(
        &self,
        participants: &[Participant],
        expires_at_millis: u64,
    ) -> Result<(), StoreError> {
        self.store.put_batch(
            &[(self.keys.participants(), serde_json::to_vec(participants)?)],
            expires_at_millis,
        )
    }

    /// Ledger and latched flag in one batch
    pub fn write_draw(
        &self,
        assignments: &[Assignment],
        expires_at_millis: u64,
    ) -> Result<(), StoreError> {
        self.store.put_batch(
            &[
                (self.keys.assignments(), serde_json::to_vec(assignments)?),
                (self.keys.drawn(), serde_json::to_vec(&true)?),
            ],
            expires_at_millis,
        )
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_batch(&self.keys.all())
    }
}
