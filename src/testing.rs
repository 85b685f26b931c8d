//! Test helpers (feature `test-harness`)

use crate::{InMemoryDirectory, UserRecord};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once; later calls are ignored
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Directory holding the given `(id, name)` rows
pub fn directory_of(users: &[(u64, &str)]) -> Arc<InMemoryDirectory> {
    Arc::new(InMemoryDirectory::from_users(
        users.iter().map(|&(id, name)| UserRecord::new(id, name)),
    ))
}
