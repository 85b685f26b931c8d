//! Read-side joins over the registry, the ledger and the directory

use crate::{
    Assignment, CompleteCacheData, DrawResult, ExchangeConfig, Participant, ParticipantView,
    StatusSummary, UserId,
};
use std::collections::HashMap;

pub(crate) fn summarize(is_drawn: bool, participants: &[Participant]) -> StatusSummary {
    StatusSummary {
        is_drawn,
        total_participants: participants.len(),
        participating_count: count_participating(participants),
    }
}

pub(crate) fn count_participating(participants: &[Participant]) -> usize {
    participants.iter().filter(|p| p.participating).count()
}

pub(crate) fn find_participant(
    participants: &[Participant],
    user_id: UserId,
) -> Option<&Participant> {
    participants.iter().find(|p| p.user_id == user_id)
}

pub(crate) fn assignment_for(assignments: &[Assignment], giver_id: UserId) -> Option<Assignment> {
    assignments.iter().find(|a| a.giver_id == giver_id).copied()
}

/// Build a giver's result; `receiver_name` is the directory's current name
pub(crate) fn compose_result(
    assignment: Assignment,
    receiver_name: Option<String>,
    participants: &[Participant],
    config: &ExchangeConfig,
) -> DrawResult {
    let receiver_description = find_participant(participants, assignment.receiver_id)
        .and_then(|p| p.description.clone())
        .unwrap_or_else(|| config.missing_description_label.clone());

    DrawResult {
        giver_id: assignment.giver_id,
        receiver_id: assignment.receiver_id,
        receiver_name: receiver_name.unwrap_or_else(|| config.unknown_name_label.clone()),
        receiver_description,
    }
}

/// Join every registry record with its own assignment
///
/// The ledger is ignored unless `is_drawn`; names come from one directory
/// snapshot instead of a lookup per row.
pub(crate) fn join_complete(
    is_drawn: bool,
    participants: &[Participant],
    assignments: &[Assignment],
    names: &HashMap<UserId, String>,
    config: &ExchangeConfig,
) -> CompleteCacheData {
    let receivers: HashMap<UserId, UserId> = if is_drawn {
        assignments
            .iter()
            .map(|a| (a.giver_id, a.receiver_id))
            .collect()
    } else {
        HashMap::new()
    };

    let participants_data = participants
        .iter()
        .map(|p| {
            let receiver_id = receivers.get(&p.user_id).copied();
            let receiver_name = receiver_id.map(|id| {
                names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| config.unknown_name_label.clone())
            });
            ParticipantView {
                user_id: p.user_id,
                name: p.name.clone(),
                description: p.description.clone(),
                participating: p.participating,
                receiver_id,
                receiver_name,
            }
        })
        .collect();

    CompleteCacheData {
        is_drawn,
        participants_data,
        total_participating: count_participating(participants),
    }
}
