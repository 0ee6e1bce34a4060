//! Turn order for one round
//!
//! Fastest first. Ties go to the player side, then to the lower id, so the
//! order never depends on randomness.

use crate::battle::participant::Participant;
use crate::core::types::{ParticipantId, Stat};

pub fn compute_turn_order(participants: &[Participant]) -> Vec<ParticipantId> {
    let mut active: Vec<&Participant> = participants.iter().filter(|p| p.is_active()).collect();
    active.sort_by(|a, b| {
        b.effective(Stat::Speed)
            .cmp(&a.effective(Stat::Speed))
            .then(a.team.cmp(&b.team))
            .then(a.id.cmp(&b.id))
    });
    active.into_iter().map(|p| p.id).collect()
}
