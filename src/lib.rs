//! Gift Exchange Coordinator
//!
//! A single-draw gift exchange ("Secret Santa") over an expiring key-value
//! store. Three collections live under one namespace and share one deadline:
//! the participant registry, the draw ledger and the draw flag.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! // 1. Inject a store and the application's user directory
//! let store: Arc<dyn ExchangeStore> = Arc::new(InMemoryStore::new());
//! let directory: Arc<dyn UserDirectory> = Arc::new(my_user_table);
//! let coordinator = ExchangeCoordinator::builder(store, directory).build()?;
//!
//! // 2. Snapshot the directory, then collect opt-ins
//! coordinator.initialize()?;
//! coordinator.register_participation(UserId(1), "wool socks")?;
//! coordinator.register_participation(UserId(2), "a paperback")?;
//!
//! // 3. Draw once
//! match coordinator.run_draw()? {
//!     DrawOutcome::Drawn { assignments } => { /* ... */ }
//!     DrawOutcome::AlreadyDrawn => { /* ... */ }
//!     DrawOutcome::InsufficientParticipants { participating } => { /* ... */ }
//! }
//!
//! // 4. Each giver looks up their receiver
//! let result = coordinator.result_for_user(UserId(1))?;
//! ```

#![warn(missing_docs)]

// === Core Types ===
mod errors;
mod ids;
mod model;

// === Configuration ===
mod config;

// === Storage ===
mod clock;
#[cfg(feature = "lmdb")]
mod heed_store;
mod keys;
mod repository;
mod store;

// === Collaborators ===
mod directory;

// === Draw & Projections ===
mod draw;
mod projection;

// === Coordinator ===
mod coordinator;

// === Observability ===
mod observer;
mod stats;

// === Test Support ===
#[cfg(any(test, feature = "test-harness"))]
pub mod testing;

// === Re-exports ===

// Types
pub use ids::{UserId, UserRecord};
pub use model::{
    Assignment, CompleteCacheData, DrawResult, ExchangePhase, Participant, ParticipantView,
    StatusSummary,
};

// Errors
pub use errors::{ConfigError, DirectoryError, ExchangeError, StoreError};

// Configuration
pub use config::{ExchangeConfig, DEFAULT_TTL_SECS};

// Storage
pub use clock::{Clock, ManualClock, SystemClock};
#[cfg(feature = "lmdb")]
pub use heed_store::HeedStore;
pub use keys::StoreKeys;
pub use store::{ExchangeStore, InMemoryStore, StoreEntry};

// Collaborators
pub use directory::{InMemoryDirectory, UserDirectory};

// Draw
pub use draw::{pair_cyclically, shuffle_and_pair, DrawOutcome, MIN_PARTICIPANTS};

// Coordinator
pub use coordinator::{ExchangeCoordinator, ExchangeCoordinatorBuilder};

// Observability
pub use observer::{ExchangeObserver, NoOpObserver, TracingObserver};
pub use stats::{ExchangeStats, ExchangeStatsSnapshot};
