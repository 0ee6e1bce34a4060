//! AI's view of the battle for one decision

use crate::battle::participant::Participant;
use crate::core::types::{ParticipantId, Round};

/// Snapshot handed to condition evaluation
///
/// `allies` excludes the actor; both lists only contain participants still
/// in the fight.
pub struct DecisionContext<'a> {
    pub actor: &'a Participant,
    pub allies: Vec<&'a Participant>,
    pub enemies: Vec<&'a Participant>,
    pub participants: &'a [Participant],
    pub round: Round,
}

impl<'a> DecisionContext<'a> {
    pub fn new(actor: &'a Participant, participants: &'a [Participant], round: Round) -> Self {
        let allies = participants
            .iter()
            .filter(|p| p.team == actor.team && p.id != actor.id && p.is_active())
            .collect();
        let enemies = participants
            .iter()
            .filter(|p| p.team != actor.team && p.is_active())
            .collect();

        Self {
            actor,
            allies,
            enemies,
            participants,
            round,
        }
    }

    /// Build a context for a participant id
    pub fn for_actor(id: ParticipantId, participants: &'a [Participant], round: Round) -> Option<Self> {
        participants
            .iter()
            .find(|p| p.id == id)
            .map(|actor| Self::new(actor, participants, round))
    }

    pub fn ally_count(&self) -> usize {
        self.allies.len()
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    /// Lowest HP percentage on the actor's side (actor included)
    pub fn weakest_ally_hp_percent(&self) -> f32 {
        self.allies
            .iter()
            .map(|p| p.hp_percent())
            .fold(self.actor.hp_percent(), f32::min)
    }
}
