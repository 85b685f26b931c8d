//! Registry records, ledger entries and the read-side projection shapes

use crate::UserId;
use serde::{Deserialize, Serialize};

/// One registry record per user captured at initialization
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Directory identifier, unique within the registry
    pub user_id: UserId,
    /// Display name copied from the directory when the registry was built
    pub name: String,
    /// Wish text, `None` until the participant opts in
    pub description: Option<String>,
    /// Whether the participant opted into the draw
    pub participating: bool,
}

impl Participant {
    /// A fresh, not-yet-participating record
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            description: None,
            participating: false,
        }
    }

    /// Mark this record as opted in with the given wish, replacing any earlier one
    pub fn opt_in(&mut self, description: impl Into<String>) {
        self.participating = true;
        self.description = Some(description.into());
    }
}

/// One giver -> receiver pair of the draw ledger
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Participant who gives the gift
    pub giver_id: UserId,
    /// Participant who receives it
    pub receiver_id: UserId,
}

/// Lifecycle of the exchange
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangePhase {
    /// No registry in the store (never initialized, reset, or expired)
    NotInitialized,
    /// Registry collected, draw not yet run
    Initialized,
    /// Ledger fixed
    Drawn,
}

/// Aggregate counts over the registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Whether the draw has run
    pub is_drawn: bool,
    /// Registry size, regardless of opt-in
    pub total_participants: usize,
    /// Records that opted in
    pub participating_count: usize,
}

/// What a giver sees once the draw has run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    /// The user asking
    pub giver_id: UserId,
    /// Who they give to
    pub receiver_id: UserId,
    /// Receiver's current directory name, or the unknown-name label
    pub receiver_name: String,
    /// Receiver's wish, or the missing-description label
    pub receiver_description: String,
}

/// A registry record joined with its own assignment, if any
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    /// Registry id
    pub user_id: UserId,
    /// Name captured at initialization
    pub name: String,
    /// Wish text, if opted in
    pub description: Option<String>,
    /// Whether the record opted in
    pub participating: bool,
    /// Assigned receiver once drawn
    pub receiver_id: Option<UserId>,
    /// Receiver's directory name once drawn
    pub receiver_name: Option<String>,
}

/// Denormalized view over all three stored collections
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteCacheData {
    /// Whether the draw has run
    pub is_drawn: bool,
    /// One row per registry record, opted in or not
    pub participants_data: Vec<ParticipantView>,
    /// Records that opted in
    pub total_participating: usize,
}
