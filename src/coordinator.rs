//! Exchange coordinator: registry mutation, the draw and read projections

use crate::projection;
use crate::repository::ExchangeRepository;
use crate::{
    draw, Assignment, CompleteCacheData, DrawOutcome, DrawResult, ExchangeConfig, ExchangeError,
    ExchangeObserver, ExchangePhase, ExchangeStats, ExchangeStatsSnapshot, ExchangeStore,
    Participant, StatusSummary, TracingObserver, UserDirectory, UserId,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Coordinates one gift exchange over an expiring store.
///
/// Mutating operations (`initialize`, `register_participation`, `run_draw`,
/// `resync`, `reset`) hold a single write lock for their whole
/// read-modify-write, so concurrent opt-ins are not lost and at most one
/// draw is ever written. Queries read the store without locking.
///
/// The lock is per coordinator: share one coordinator (behind an `Arc`)
/// across request handlers rather than building one per request.
///
/// ```rust,ignore
/// let coordinator = ExchangeCoordinator::builder(store, directory).build()?;
/// coordinator.initialize()?;
/// coordinator.register_participation(UserId(1), "socks")?;
/// coordinator.register_participation(UserId(2), "a book")?;
/// assert!(coordinator.run_draw()?.is_drawn());
/// let result = coordinator.result_for_user(UserId(1))?;
/// ```
pub struct ExchangeCoordinator {
    repo: ExchangeRepository,
    directory: Arc<dyn UserDirectory>,
    config: ExchangeConfig,
    // Serializes mutations; the draw's random source lives behind it
    write_lock: Mutex<Box<dyn RngCore + Send>>,
    observer: Arc<dyn ExchangeObserver>,
    stats: Arc<ExchangeStats>,
}

/// Builder for [`ExchangeCoordinator`]
pub struct ExchangeCoordinatorBuilder {
    store: Arc<dyn ExchangeStore>,
    directory: Arc<dyn UserDirectory>,
    config: ExchangeConfig,
    rng: Option<Box<dyn RngCore + Send>>,
    observer: Arc<dyn ExchangeObserver>,
    stats: Arc<ExchangeStats>,
}

impl ExchangeCoordinatorBuilder {
    /// Replace the default configuration
    pub fn config(mut self, config: ExchangeConfig) -> Self {
        self.config = config;
        self
    }

    /// Random source for the draw shuffle
    pub fn rng<R: RngCore + Send + 'static>(mut self, rng: R) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Deterministic draws from a fixed seed
    pub fn seed(self, seed: u64) -> Self {
        self.rng(StdRng::seed_from_u64(seed))
    }

    /// Hooks fired after each persisted change
    pub fn observer(mut self, observer: Arc<dyn ExchangeObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Share counters with another component
    pub fn stats(mut self, stats: Arc<ExchangeStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Validate the configuration and assemble the coordinator
    pub fn build(self) -> Result<ExchangeCoordinator, ExchangeError> {
        self.config.validate()?;
        let rng = self.rng.unwrap_or_else(|| Box::new(StdRng::from_entropy()));

        Ok(ExchangeCoordinator {
            repo: ExchangeRepository::new(self.store, self.config.keys()),
            directory: self.directory,
            config: self.config,
            write_lock: Mutex::new(rng),
            observer: self.observer,
            stats: self.stats,
        })
    }
}

impl ExchangeCoordinator {
    /// Start a builder over an injected store and directory
    pub fn builder(
        store: Arc<dyn ExchangeStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> ExchangeCoordinatorBuilder {
        ExchangeCoordinatorBuilder {
            store,
            directory,
            config: ExchangeConfig::default(),
            rng: None,
            observer: Arc::new(TracingObserver),
            stats: Arc::new(ExchangeStats::new()),
        }
    }

    /// Coordinator with default configuration and an entropy-seeded shuffle
    pub fn new(
        store: Arc<dyn ExchangeStore>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self, ExchangeError> {
        Self::builder(store, directory).build()
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn stats(&self) -> ExchangeStatsSnapshot {
        self.stats.snapshot()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn RngCore + Send>>, ExchangeError> {
        self.write_lock.lock().map_err(|_| ExchangeError::LockPoisoned)
    }

    fn fresh_deadline(&self) -> u64 {
        let ttl_millis = self.config.ttl_secs.saturating_mul(1_000);
        self.repo.now_millis().saturating_add(ttl_millis)
    }

    // === Participant registry ===

    /// Snapshot the directory into the registry.
    ///
    /// A no-op when a registry already exists; users added to the directory
    /// afterwards only appear through [`resync`](Self::resync).
    pub fn initialize(&self) -> Result<(), ExchangeError> {
        let _guard = self.lock()?;

        if self.repo.load_registry()?.is_some() {
            tracing::debug!("Exchange already initialized");
            return Ok(());
        }

        let mut seen = HashSet::new();
        let participants: Vec<Participant> = self
            .directory
            .all_users()?
            .into_iter()
            .filter(|user| seen.insert(user.id))
            .map(|user| Participant::new(user.id, user.name))
            .collect();

        self.repo.write_initial(&participants, self.fresh_deadline())?;

        ExchangeStats::incr(&self.stats.initializations);
        self.observer.on_initialized(participants.len());
        Ok(())
    }

    /// Opt a user in with their wish, replacing any earlier wish.
    ///
    /// Unknown users and an uninitialized registry are silent no-ops.
    pub fn register_participation(
        &self,
        user_id: UserId,
        description: impl Into<String>,
    ) -> Result<(), ExchangeError> {
        let _guard = self.lock()?;

        let Some(mut registry) = self.repo.load_registry()? else {
            tracing::debug!(user_id = %user_id, "Registration before initialization ignored");
            return Ok(());
        };

        let matched = match registry
            .participants
            .iter_mut()
            .find(|p| p.user_id == user_id)
        {
            Some(participant) => {
                participant.opt_in(description);
                true
            }
            None => false,
        };

        if matched {
            self.repo.write_participants(&registry.participants, registry.expires_at_millis)?;
            ExchangeStats::incr(&self.stats.registrations);
        } else {
            ExchangeStats::incr(&self.stats.unmatched_registrations);
        }
        self.observer.on_participation_registered(user_id, matched);
        Ok(())
    }

    /// Whether the user has opted in; false for unknown users
    pub fn participation_status(&self, user_id: UserId) -> Result<bool, ExchangeError> {
        let participants = self.repo.load_participants()?;
        Ok(projection::find_participant(&participants, user_id)
            .map(|p| p.participating)
            .unwrap_or(false))
    }

    pub fn participant(&self, user_id: UserId) -> Result<Option<Participant>, ExchangeError> {
        let participants = self.repo.load_participants()?;
        Ok(projection::find_participant(&participants, user_id).cloned())
    }

    /// Append directory users missing from the registry, returning how many
    /// were added. Existing records are never touched.
    pub fn resync(&self) -> Result<usize, ExchangeError> {
        let _guard = self.lock()?;

        let Some(mut registry) = self.repo.load_registry()? else {
            tracing::debug!("Resync before initialization ignored");
            return Ok(0);
        };

        // Seeded with registry ids so directory repeats are skipped as well
        let mut seen: HashSet<UserId> = registry.participants.iter().map(|p| p.user_id).collect();
        let missing: Vec<Participant> = self
            .directory
            .all_users()?
            .into_iter()
            .filter(|user| seen.insert(user.id))
            .map(|user| Participant::new(user.id, user.name))
            .collect();

        let added = missing.len();
        if added > 0 {
            registry.participants.extend(missing);
            self.repo.write_participants(&registry.participants, registry.expires_at_millis)?;
        }

        ExchangeStats::incr(&self.stats.resyncs);
        self.observer.on_resynced(added);
        Ok(added)
    }

    // === Draw ===

    /// Run the one permitted draw.
    ///
    /// Rejected without side effects when the flag is already set or fewer
    /// than two participants opted in.
    pub fn run_draw(&self) -> Result<DrawOutcome, ExchangeError> {
        let mut rng = self.lock()?;
        ExchangeStats::incr(&self.stats.draws_attempted);

        if self.repo.load_drawn()? {
            return Ok(self.reject(DrawOutcome::AlreadyDrawn));
        }

        let Some(registry) = self.repo.load_registry()? else {
            return Ok(self.reject(DrawOutcome::InsufficientParticipants { participating: 0 }));
        };

        let Some(assignments) = draw::shuffle_and_pair(&registry.participants, &mut **rng) else {
            let participating = projection::count_participating(&registry.participants);
            return Ok(self.reject(DrawOutcome::InsufficientParticipants { participating }));
        };

        self.repo.write_draw(&assignments, registry.expires_at_millis)?;

        ExchangeStats::incr(&self.stats.draws_completed);
        self.observer.on_draw_completed(&assignments);
        Ok(DrawOutcome::Drawn { assignments })
    }

    fn reject(&self, outcome: DrawOutcome) -> DrawOutcome {
        ExchangeStats::incr(&self.stats.draws_rejected);
        self.observer.on_draw_rejected(&outcome);
        outcome
    }

    pub fn is_drawn(&self) -> Result<bool, ExchangeError> {
        Ok(self.repo.load_drawn()?)
    }

    pub fn phase(&self) -> Result<ExchangePhase, ExchangeError> {
        if self.repo.load_registry()?.is_none() {
            return Ok(ExchangePhase::NotInitialized);
        }
        if self.repo.load_drawn()? {
            Ok(ExchangePhase::Drawn)
        } else {
            Ok(ExchangePhase::Initialized)
        }
    }

    /// The draw ledger; empty until the draw has run
    pub fn assignments(&self) -> Result<Vec<Assignment>, ExchangeError> {
        if !self.repo.load_drawn()? {
            return Ok(Vec::new());
        }
        Ok(self.repo.load_assignments()?)
    }

    /// Clear the registry, the ledger and the flag
    pub fn reset(&self) -> Result<(), ExchangeError> {
        let _guard = self.lock()?;
        self.repo.clear()?;
        ExchangeStats::incr(&self.stats.resets);
        self.observer.on_reset();
        Ok(())
    }

    // === Projections ===

    pub fn status_summary(&self) -> Result<StatusSummary, ExchangeError> {
        let is_drawn = self.repo.load_drawn()?;
        let participants = self.repo.load_participants()?;
        Ok(projection::summarize(is_drawn, &participants))
    }

    /// The user's receiver, or `None` before the draw or for non-givers
    pub fn result_for_user(&self, user_id: UserId) -> Result<Option<DrawResult>, ExchangeError> {
        if !self.repo.load_drawn()? {
            tracing::debug!(user_id = %user_id, "No result before draw");
            return Ok(None);
        }

        let assignments = self.repo.load_assignments()?;
        let Some(assignment) = projection::assignment_for(&assignments, user_id) else {
            tracing::debug!(user_id = %user_id, "User is not a giver in the ledger");
            return Ok(None);
        };

        let receiver_name = self
            .directory
            .find_user(assignment.receiver_id)?
            .map(|user| user.name);
        let participants = self.repo.load_participants()?;

        Ok(Some(projection::compose_result(
            assignment,
            receiver_name,
            &participants,
            &self.config,
        )))
    }

    /// Every registry record joined with its assignment and receiver name
    pub fn complete_cache_data(&self) -> Result<CompleteCacheData, ExchangeError> {
        let is_drawn = self.repo.load_drawn()?;
        let participants = self.repo.load_participants()?;
        let assignments = if is_drawn {
            self.repo.load_assignments()?
        } else {
            Vec::new()
        };
        let names = self.directory.name_map()?;

        Ok(projection::join_complete(
            is_drawn,
            &participants,
            &assignments,
            &names,
            &self.config,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{directory_of, init_tracing};
    use crate::{
        DirectoryError, InMemoryDirectory, InMemoryStore, ManualClock, NoOpObserver, StoreEntry,
        StoreError, UserRecord,
    };
    use std::collections::BTreeSet;
    use std::time::Duration;

    struct Fixture {
        store: Arc<InMemoryStore>,
        directory: Arc<InMemoryDirectory>,
        clock: Arc<ManualClock>,
        coordinator: ExchangeCoordinator,
    }

    fn fixture(users: &[(u64, &str)]) -> Fixture {
        init_tracing();
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let directory = directory_of(users);
        let coordinator = ExchangeCoordinator::builder(store.clone(), directory.clone())
            .seed(42)
            .build()
            .unwrap();
        Fixture {
            store,
            directory,
            clock,
            coordinator,
        }
    }

    fn trio() -> Fixture {
        fixture(&[(1, "Ana"), (2, "Bo"), (3, "Cy")])
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let f = trio();
        assert_eq!(f.coordinator.phase().unwrap(), ExchangePhase::NotInitialized);

        f.coordinator.initialize().unwrap();
        let first = f.coordinator.complete_cache_data().unwrap();
        assert_eq!(first.participants_data.len(), 3);
        assert!(first.participants_data.iter().all(|p| !p.participating));
        assert_eq!(f.coordinator.phase().unwrap(), ExchangePhase::Initialized);

        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.initialize().unwrap();

        // Second initialize kept the opt-in instead of rebuilding
        assert!(f.coordinator.participation_status(UserId(1)).unwrap());
        assert_eq!(f.coordinator.status_summary().unwrap().total_participants, 3);
        assert_eq!(f.coordinator.stats().initializations, 1);
    }

    #[test]
    fn test_registration_overwrites_wish() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        assert!(!f.coordinator.participation_status(UserId(2)).unwrap());

        f.coordinator.register_participation(UserId(2), "book").unwrap();
        f.coordinator.register_participation(UserId(2), "").unwrap();

        let bo = f.coordinator.participant(UserId(2)).unwrap().unwrap();
        assert!(bo.participating);
        assert_eq!(bo.description.as_deref(), Some(""));
        assert!(!f.coordinator.participation_status(UserId(1)).unwrap());
    }

    #[test]
    fn test_unknown_user_registration_is_noop() {
        let f = trio();
        f.coordinator.initialize().unwrap();

        f.coordinator.register_participation(UserId(99), "ghost").unwrap();

        assert!(!f.coordinator.participation_status(UserId(99)).unwrap());
        assert_eq!(f.coordinator.participant(UserId(99)).unwrap(), None);
        assert_eq!(f.coordinator.status_summary().unwrap().total_participants, 3);
        assert_eq!(f.coordinator.stats().unmatched_registrations, 1);
    }

    #[test]
    fn test_registration_before_initialize_writes_nothing() {
        let f = trio();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();

        assert!(f.store.is_empty());
        assert_eq!(f.coordinator.phase().unwrap(), ExchangePhase::NotInitialized);
        assert_eq!(f.coordinator.stats().unmatched_registrations, 0);
    }

    #[test]
    fn test_two_participant_draw_and_latch() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();

        let mut assignments = match f.coordinator.run_draw().unwrap() {
            DrawOutcome::Drawn { assignments } => assignments,
            other => panic!("expected a draw, got {:?}", other),
        };
        assignments.sort_by_key(|a| a.giver_id);
        assert_eq!(
            assignments,
            vec![
                Assignment {
                    giver_id: UserId(1),
                    receiver_id: UserId(2),
                },
                Assignment {
                    giver_id: UserId(2),
                    receiver_id: UserId(1),
                },
            ]
        );
        assert!(f.coordinator.is_drawn().unwrap());
        assert_eq!(f.coordinator.phase().unwrap(), ExchangePhase::Drawn);

        let ledger = f.coordinator.assignments().unwrap();
        assert_eq!(f.coordinator.run_draw().unwrap(), DrawOutcome::AlreadyDrawn);
        assert_eq!(f.coordinator.assignments().unwrap(), ledger);

        assert_eq!(
            f.coordinator.status_summary().unwrap(),
            StatusSummary {
                is_drawn: true,
                total_participants: 3,
                participating_count: 2,
            }
        );

        let stats = f.coordinator.stats();
        assert_eq!(stats.draws_attempted, 2);
        assert_eq!(stats.draws_completed, 1);
        assert_eq!(stats.draws_rejected, 1);
    }

    #[test]
    fn test_single_participant_cannot_draw() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "x").unwrap();

        assert_eq!(
            f.coordinator.run_draw().unwrap(),
            DrawOutcome::InsufficientParticipants { participating: 1 }
        );
        assert!(!f.coordinator.is_drawn().unwrap());
        assert!(f.coordinator.assignments().unwrap().is_empty());
        assert!(f.store.get("gift_exchange:assignments").unwrap().is_none());
    }

    #[test]
    fn test_draw_before_initialize_is_insufficient() {
        let f = trio();
        assert_eq!(
            f.coordinator.run_draw().unwrap(),
            DrawOutcome::InsufficientParticipants { participating: 0 }
        );
        assert!(f.store.is_empty());
    }

    #[test]
    fn test_larger_draw_is_derangement_of_opt_ins() {
        let users: Vec<(u64, String)> = (1..=12).map(|id| (id, format!("user-{}", id))).collect();
        let rows: Vec<(u64, &str)> = users.iter().map(|(id, n)| (*id, n.as_str())).collect();
        let f = fixture(&rows);
        f.coordinator.initialize().unwrap();

        let opted: BTreeSet<UserId> = (1..=12).filter(|id| id % 3 != 0).map(UserId).collect();
        for id in &opted {
            f.coordinator.register_participation(*id, format!("wish-{}", id)).unwrap();
        }

        assert!(f.coordinator.run_draw().unwrap().is_drawn());
        let ledger = f.coordinator.assignments().unwrap();

        let givers: BTreeSet<_> = ledger.iter().map(|a| a.giver_id).collect();
        let receivers: BTreeSet<_> = ledger.iter().map(|a| a.receiver_id).collect();
        assert_eq!(ledger.len(), opted.len());
        assert_eq!(givers, opted);
        assert_eq!(receivers, opted);
        assert!(ledger.iter().all(|a| a.giver_id != a.receiver_id));
    }

    #[test]
    fn test_result_for_user() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();

        assert_eq!(f.coordinator.result_for_user(UserId(1)).unwrap(), None);
        f.coordinator.run_draw().unwrap();

        let result = f.coordinator.result_for_user(UserId(1)).unwrap().unwrap();
        assert_eq!(
            result,
            DrawResult {
                giver_id: UserId(1),
                receiver_id: UserId(2),
                receiver_name: "Bo".to_string(),
                receiver_description: "book".to_string(),
            }
        );

        // Never opted in
        assert_eq!(f.coordinator.result_for_user(UserId(3)).unwrap(), None);
    }

    #[test]
    fn test_result_names_follow_directory_at_query_time() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();
        f.coordinator.run_draw().unwrap();

        f.directory.insert(UserRecord::new(2u64, "Bobby")).unwrap();
        let result = f.coordinator.result_for_user(UserId(1)).unwrap().unwrap();
        assert_eq!(result.receiver_name, "Bobby");

        f.directory.remove(UserId(2)).unwrap();
        let result = f.coordinator.result_for_user(UserId(1)).unwrap().unwrap();
        assert_eq!(result.receiver_name, "Unknown");
        assert_eq!(result.receiver_description, "book");
    }

    #[test]
    fn test_complete_cache_data_joins_all_collections() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();

        let before = f.coordinator.complete_cache_data().unwrap();
        assert!(!before.is_drawn);
        assert_eq!(before.total_participating, 2);
        assert!(before.participants_data.iter().all(|p| p.receiver_id.is_none()));

        f.coordinator.run_draw().unwrap();
        let after = f.coordinator.complete_cache_data().unwrap();
        assert!(after.is_drawn);

        let by_id = |id: u64| {
            after
                .participants_data
                .iter()
                .find(|p| p.user_id == UserId(id))
                .unwrap()
        };
        assert_eq!(by_id(1).receiver_id, Some(UserId(2)));
        assert_eq!(by_id(1).receiver_name.as_deref(), Some("Bo"));
        assert_eq!(by_id(2).receiver_name.as_deref(), Some("Ana"));
        assert_eq!(by_id(2).description.as_deref(), Some("book"));
        assert_eq!(by_id(3).receiver_id, None);
        assert!(!by_id(3).participating);
    }

    #[test]
    fn test_registry_is_a_snapshot_until_resync() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();

        f.directory.insert(UserRecord::new(4u64, "Di")).unwrap();
        f.coordinator.initialize().unwrap();
        assert_eq!(f.coordinator.participant(UserId(4)).unwrap(), None);

        assert_eq!(f.coordinator.resync().unwrap(), 1);
        assert_eq!(f.coordinator.resync().unwrap(), 0);

        let di = f.coordinator.participant(UserId(4)).unwrap().unwrap();
        assert_eq!(di.name, "Di");
        assert!(!di.participating);
        assert!(f.coordinator.participation_status(UserId(1)).unwrap());
        assert_eq!(f.coordinator.status_summary().unwrap().total_participants, 4);
    }

    /// Directory that hands back the same rows on every call, repeats included
    struct RepeatingDirectory(Vec<UserRecord>);

    impl UserDirectory for RepeatingDirectory {
        fn all_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
            Ok(self.0.clone())
        }

        fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
            Ok(self.0.iter().find(|user| user.id == id).cloned())
        }
    }

    #[test]
    fn test_duplicate_directory_ids_collapse_to_one_record() {
        init_tracing();
        let directory = RepeatingDirectory(vec![
            UserRecord::new(1u64, "Ana"),
            UserRecord::new(1u64, "Ana"),
            UserRecord::new(2u64, "Bo"),
        ]);
        let coordinator =
            ExchangeCoordinator::new(Arc::new(InMemoryStore::new()), Arc::new(directory)).unwrap();

        coordinator.initialize().unwrap();
        assert_eq!(coordinator.status_summary().unwrap().total_participants, 2);

        let ids: Vec<UserId> = coordinator
            .complete_cache_data()
            .unwrap()
            .participants_data
            .iter()
            .map(|p| p.user_id)
            .collect();
        assert_eq!(ids, vec![UserId(1), UserId(2)]);

        coordinator.register_participation(UserId(1), "socks").unwrap();
        assert_eq!(coordinator.status_summary().unwrap().participating_count, 1);
        assert_eq!(coordinator.resync().unwrap(), 0);
    }

    #[test]
    fn test_resync_adds_repeated_new_user_once() {
        let f = fixture(&[(1, "Ana")]);
        f.coordinator.initialize().unwrap();

        let directory = RepeatingDirectory(vec![
            UserRecord::new(1u64, "Ana"),
            UserRecord::new(2u64, "Bo"),
            UserRecord::new(2u64, "Bo"),
        ]);
        let coordinator = ExchangeCoordinator::new(f.store.clone(), Arc::new(directory)).unwrap();

        assert_eq!(coordinator.resync().unwrap(), 1);
        let summary = coordinator.status_summary().unwrap();
        assert_eq!(summary.total_participants, 2);
    }

    #[test]
    fn test_resync_before_initialize_is_noop() {
        let f = trio();
        assert_eq!(f.coordinator.resync().unwrap(), 0);
        assert!(f.store.is_empty());
    }

    #[test]
    fn test_all_collections_expire_together() {
        let f = trio();
        f.coordinator.initialize().unwrap();

        f.clock.advance(Duration::from_secs(20 * 24 * 60 * 60));
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();
        assert!(f.coordinator.run_draw().unwrap().is_drawn());

        // Later writes reuse the deadline fixed at initialization
        let deadlines: BTreeSet<u64> = ["participants", "assignments", "drawn"]
            .iter()
            .map(|k| {
                f.store
                    .get(&format!("gift_exchange:{}", k))
                    .unwrap()
                    .unwrap()
                    .expires_at_millis
            })
            .collect();
        assert_eq!(deadlines.len(), 1);

        f.clock.advance(Duration::from_secs(10 * 24 * 60 * 60));
        assert_eq!(f.coordinator.phase().unwrap(), ExchangePhase::NotInitialized);
        assert!(!f.coordinator.is_drawn().unwrap());
        assert_eq!(f.coordinator.result_for_user(UserId(1)).unwrap(), None);
        assert_eq!(f.coordinator.status_summary().unwrap().total_participants, 0);

        // Back to a fresh epoch
        f.coordinator.initialize().unwrap();
        assert!(!f.coordinator.participation_status(UserId(1)).unwrap());
    }

    #[test]
    fn test_reset_returns_to_not_initialized() {
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(3), "tea").unwrap();
        f.coordinator.run_draw().unwrap();

        f.coordinator.reset().unwrap();

        assert_eq!(f.coordinator.phase().unwrap(), ExchangePhase::NotInitialized);
        assert!(f.store.is_empty());

        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();
        assert!(f.coordinator.run_draw().unwrap().is_drawn());
        assert_eq!(f.coordinator.stats().resets, 1);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let f = trio();
        let config = ExchangeConfig {
            namespace: "office_party".to_string(),
            ..ExchangeConfig::default()
        };
        let other = ExchangeCoordinator::builder(f.store.clone(), f.directory.clone())
            .config(config)
            .observer(Arc::new(NoOpObserver))
            .seed(1)
            .build()
            .unwrap();

        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();

        assert_eq!(other.phase().unwrap(), ExchangePhase::NotInitialized);
        other.initialize().unwrap();
        assert!(!other.participation_status(UserId(1)).unwrap());
        assert!(f.coordinator.participation_status(UserId(1)).unwrap());
    }

    #[test]
    fn test_same_seed_reproduces_draw() {
        let ledgers: Vec<Vec<Assignment>> = (0..2)
            .map(|_| {
                let f = fixture(&[(1, "Ana"), (2, "Bo"), (3, "Cy"), (4, "Di"), (5, "Ed")]);
                f.coordinator.initialize().unwrap();
                for id in 1..=5 {
                    f.coordinator.register_participation(UserId(id), "wish").unwrap();
                }
                f.coordinator.run_draw().unwrap();
                f.coordinator.assignments().unwrap()
            })
            .collect();
        assert_eq!(ledgers[0], ledgers[1]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let f = trio();
        let config = ExchangeConfig {
            ttl_secs: 0,
            ..ExchangeConfig::default()
        };
        let built = ExchangeCoordinator::builder(f.store.clone(), f.directory.clone())
            .config(config)
            .build();
        assert!(matches!(built, Err(ExchangeError::Config(_))));
    }

    struct FailingStore;

    impl ExchangeStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<StoreEntry>, StoreError> {
            Err(StoreError::Storage("offline".into()))
        }

        fn put_batch(&self, _entries: &[(&str, Vec<u8>)], _expires: u64) -> Result<(), StoreError> {
            Err(StoreError::Storage("offline".into()))
        }

        fn remove_batch(&self, _keys: &[&str]) -> Result<(), StoreError> {
            Err(StoreError::Storage("offline".into()))
        }

        fn now_millis(&self) -> u64 {
            0
        }
    }

    #[test]
    fn test_store_failures_propagate() {
        let coordinator =
            ExchangeCoordinator::new(Arc::new(FailingStore), directory_of(&[(1, "Ana")])).unwrap();

        assert!(coordinator.initialize().unwrap_err().is_store());
        assert!(coordinator.run_draw().unwrap_err().is_store());
        assert!(coordinator.status_summary().unwrap_err().is_store());
        assert!(coordinator.reset().unwrap_err().is_store());
    }

    struct FailingDirectory;

    impl UserDirectory for FailingDirectory {
        fn all_users(&self) -> Result<Vec<UserRecord>, DirectoryError> {
            Err(DirectoryError::Unavailable("offline".into()))
        }

        fn find_user(&self, _id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
            Err(DirectoryError::Unavailable("offline".into()))
        }
    }

    #[test]
    fn test_directory_failures_propagate() {
        let fresh =
            ExchangeCoordinator::new(Arc::new(InMemoryStore::new()), Arc::new(FailingDirectory))
                .unwrap();
        assert!(fresh.initialize().unwrap_err().is_directory());

        // Drawn exchange in a shared store, then read back through the failing directory
        let f = trio();
        f.coordinator.initialize().unwrap();
        f.coordinator.register_participation(UserId(1), "socks").unwrap();
        f.coordinator.register_participation(UserId(2), "book").unwrap();
        assert!(matches!(f.coordinator.run_draw().unwrap(), DrawOutcome::Drawn { .. }));

        let coordinator =
            ExchangeCoordinator::new(f.store.clone(), Arc::new(FailingDirectory)).unwrap();
        assert!(coordinator.resync().unwrap_err().is_directory());
        assert!(coordinator.result_for_user(UserId(1)).unwrap_err().is_directory());
        assert!(coordinator.complete_cache_data().unwrap_err().is_directory());

        // Reads that never touch the directory still succeed
        assert_eq!(coordinator.status_summary().unwrap().participating_count, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_are_not_lost() {
        let users: Vec<(u64, String)> = (1..=40).map(|id| (id, format!("user-{}", id))).collect();
        let rows: Vec<(u64, &str)> = users.iter().map(|(id, n)| (*id, n.as_str())).collect();
        let f = fixture(&rows);
        f.coordinator.initialize().unwrap();
        let coordinator = Arc::new(f.coordinator);

        let handles: Vec<_> = (1..=40u64)
            .map(|id| {
                let coordinator = coordinator.clone();
                tokio::task::spawn_blocking(move || {
                    coordinator.register_participation(UserId(id), format!("wish-{}", id))
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let summary = coordinator.status_summary().unwrap();
        assert_eq!(summary.participating_count, 40);
        assert_eq!(
            coordinator.participant(UserId(17)).unwrap().unwrap().description.as_deref(),
            Some("wish-17")
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_draws_write_once() {
        let f = fixture(&[(1, "Ana"), (2, "Bo"), (3, "Cy"), (4, "Di")]);
        f.coordinator.initialize().unwrap();
        for id in 1..=4 {
            f.coordinator.register_participation(UserId(id), "wish").unwrap();
        }
        let coordinator = Arc::new(f.coordinator);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = coordinator.clone();
                tokio::task::spawn_blocking(move || coordinator.run_draw())
            })
            .collect();

        let mut drawn = Vec::new();
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            match outcome {
                DrawOutcome::Drawn { assignments } => drawn.push(assignments),
                other => assert_eq!(other, DrawOutcome::AlreadyDrawn),
            }
        }

        assert_eq!(drawn.len(), 1);
        assert_eq!(coordinator.assignments().unwrap(), drawn[0]);
    }
}
