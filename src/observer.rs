//! Exchange observer trait

use crate::{Assignment, DrawOutcome, UserId};

/// Observer hooks fired after each state change is persisted
pub trait ExchangeObserver: Send + Sync + 'static {
    fn on_initialized(&self, participants: usize);
    fn on_participation_registered(&self, user_id: UserId, matched: bool);
    fn on_draw_completed(&self, assignments: &[Assignment]);
    fn on_draw_rejected(&self, outcome: &DrawOutcome);
    fn on_resynced(&self, added: usize);
    fn on_reset(&self);
}

/// No-op observer
pub struct NoOpObserver;

impl ExchangeObserver for NoOpObserver {
    fn on_initialized(&self, _participants: usize) {}
    fn on_participation_registered(&self, _user_id: UserId, _matched: bool) {}
    fn on_draw_completed(&self, _assignments: &[Assignment]) {}
    fn on_draw_rejected(&self, _outcome: &DrawOutcome) {}
    fn on_resynced(&self, _added: usize) {}
    fn on_reset(&self) {}
}

/// Tracing-based observer
pub struct TracingObserver;

impl ExchangeObserver for TracingObserver {
    fn on_initialized(&self, participants: usize) {
        tracing::info!(participants, "Exchange initialized");
    }

    fn on_participation_registered(&self, user_id: UserId, matched: bool) {
        if matched {
            tracing::info!(user_id = %user_id, "Participation registered");
        } else {
            tracing::warn!(user_id = %user_id, "Participation for unknown user ignored");
        }
    }

    fn on_draw_completed(&self, assignments: &[Assignment]) {
        tracing::info!(pairs = assignments.len(), "Draw completed");
        #[cfg(feature = "diagnostics")]
        for assignment in assignments {
            tracing::debug!(
                giver_id = %assignment.giver_id,
                receiver_id = %assignment.receiver_id,
                "Draw pair"
            );
        }
    }

    fn on_draw_rejected(&self, outcome: &DrawOutcome) {
        match outcome {
            DrawOutcome::InsufficientParticipants { participating } => {
                tracing::warn!(participating, reason = outcome.label(), "Draw rejected");
            }
            _ => tracing::warn!(reason = outcome.label(), "Draw rejected"),
        }
    }

    fn on_resynced(&self, added: usize) {
        tracing::info!(added, "Registry resynced with directory");
    }

    fn on_reset(&self) {
        tracing::warn!("Exchange reset");
    }
}
