//! Single-cycle derangement draw

use crate::{Assignment, Participant, UserId};
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Fewest opted-in participants that admit a pairing without self-gifting
pub const MIN_PARTICIPANTS: usize = 2;

/// Outcome of a draw request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawOutcome {
    /// Ledger written and flag latched
    Drawn {
        /// Giver -> receiver pairs, in shuffled cycle order
        assignments: Vec<Assignment>,
    },
    /// The flag was already set; nothing changed
    AlreadyDrawn,
    /// Too few opted-in participants; nothing written
    InsufficientParticipants {
        /// How many had opted in
        participating: usize,
    },
}

impl DrawOutcome {
    /// True only when this call produced the ledger
    pub fn is_drawn(&self) -> bool {
        matches!(self, Self::Drawn { .. })
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Drawn { .. } => "drawn",
            Self::AlreadyDrawn => "already_drawn",
            Self::InsufficientParticipants { .. } => "insufficient_participants",
        }
    }
}

/// Pair position `i` with position `(i + 1) mod n`
///
/// With distinct ids and `n >= 2` the result is one cycle through every id,
/// so nobody receives from themselves. Fewer than two ids yield no pairs.
pub fn pair_cyclically(order: &[UserId]) -> Vec<Assignment> {
    let total = order.len();
    if total < MIN_PARTICIPANTS {
        return Vec::new();
    }
    (0..total)
        .map(|i| Assignment {
            giver_id: order[i],
            receiver_id: order[(i + 1) % total],
        })
        .collect()
}

/// Shuffle the opted-in participants and pair them cyclically
///
/// Returns `None` when fewer than [`MIN_PARTICIPANTS`] have opted in.
pub fn shuffle_and_pair<R>(participants: &[Participant], rng: &mut R) -> Option<Vec<Assignment>>
where
    R: RngCore + ?Sized,
{
    let mut order: Vec<UserId> = participants
        .iter()
        .filter(|p| p.participating)
        .map(|p| p.user_id)
        .collect();
    order.shuffle(rng);

    if order.len() < MIN_PARTICIPANTS {
        return None;
    }
    Some(pair_cyclically(&order))
}
