//! Target-selection strategies for AI rules
//!
//! Candidate lists are always built in participant-id order and ties are
//! broken by id, so a seeded generator reproduces every pick.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::participant::Participant;
use crate::core::types::{BattleRng, ParticipantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStrategy {
    #[default]
    RandomEnemy,
    /// Lowest HP percentage among opponents
    WeakestEnemy,
    /// Highest current HP among opponents
    StrongestEnemy,
    #[serde(rename = "self")]
    Myself,
    RandomAlly,
    /// Lowest HP percentage among the actor's side (actor included)
    WeakestAlly,
    /// A downed teammate, for revival
    DownedAlly,
}

impl TargetStrategy {
    pub fn ally_default() -> Self {
        TargetStrategy::WeakestAlly
    }

    pub fn is_ally_side(self) -> bool {
        matches!(
            self,
            TargetStrategy::Myself
                | TargetStrategy::RandomAlly
                | TargetStrategy::WeakestAlly
                | TargetStrategy::DownedAlly
        )
    }
}

/// Living opponents of `actor`, in id order
pub fn living_opponents<'a>(actor: &Participant, participants: &'a [Participant]) -> Vec<&'a Participant> {
    participants
        .iter()
        .filter(|p| p.team != actor.team && p.is_active())
        .collect()
}

/// Living teammates of `actor` (actor included), in id order
pub fn living_allies<'a>(actor: &Participant, participants: &'a [Participant]) -> Vec<&'a Participant> {
    participants
        .iter()
        .filter(|p| p.team == actor.team && p.is_active())
        .collect()
}

/// Pick a concrete target for a strategy.
///
/// `protect` names an ally the learning AI wants shielded; ally strategies
/// prefer it while it is still standing.
pub fn select_target(
    strategy: TargetStrategy,
    actor: &Participant,
    participants: &[Participant],
    protect: Option<ParticipantId>,
    rng: &mut BattleRng,
) -> Option<ParticipantId> {
    match strategy {
        TargetStrategy::Myself => Some(actor.id),

        TargetStrategy::RandomEnemy => pick_random(&living_opponents(actor, participants), rng),

        TargetStrategy::WeakestEnemy => weakest(&living_opponents(actor, participants)),

        TargetStrategy::StrongestEnemy => living_opponents(actor, participants)
            .into_iter()
            .max_by(|a, b| a.hp().cmp(&b.hp()).then(b.id.cmp(&a.id)))
            .map(|p| p.id),

        TargetStrategy::RandomAlly | TargetStrategy::WeakestAlly => {
            let allies = living_allies(actor, participants);
            if let Some(id) = protect.filter(|id| allies.iter().any(|p| p.id == *id)) {
                return Some(id);
            }
            if strategy == TargetStrategy::RandomAlly {
                pick_random(&allies, rng)
            } else {
                weakest(&allies)
            }
        }

        TargetStrategy::DownedAlly => participants
            .iter()
            .find(|p| p.team == actor.team && p.id != actor.id && p.is_present() && p.is_downed())
            .map(|p| p.id),
    }
}

fn pick_random(candidates: &[&Participant], rng: &mut BattleRng) -> Option<ParticipantId> {
    if candidates.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..candidates.len());
    Some(candidates[index].id)
}

fn weakest(candidates: &[&Participant]) -> Option<ParticipantId> {
    candidates
        .iter()
        .min_by(|a, b| {
            a.hp_percent()
                .total_cmp(&b.hp_percent())
                .then(a.id.cmp(&b.id))
        })
        .map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::participant::Stats;
    use crate::core::types::Team;
    use rand::SeedableRng;

    fn party() -> Vec<Participant> {
        let stats = Stats {
            max_hp: 100,
            ..Stats::default()
        };
        vec![
            Participant::new(ParticipantId(0), "A", Team::Player, stats).with_hp(80),
            Participant::new(ParticipantId(1), "B", Team::Player, stats).with_hp(30),
            Participant::new(ParticipantId(2), "C", Team::Player, stats).with_hp(0),
            Participant::new(ParticipantId(3), "X", Team::Enemy, stats).with_hp(60),
        ]
    }

    #[test]
    fn test_weakest_enemy_ignores_downed() {
        let all = party();
        let mut rng = BattleRng::seed_from_u64(1);
        let target = select_target(TargetStrategy::WeakestEnemy, &all[3], &all, None, &mut rng);
        assert_eq!(target, Some(ParticipantId(1)));
    }

    #[test]
    fn test_strongest_enemy() {
        let all = party();
        let mut rng = BattleRng::seed_from_u64(1);
        let target = select_target(TargetStrategy::StrongestEnemy, &all[3], &all, None, &mut rng);
        assert_eq!(target, Some(ParticipantId(0)));
    }

    #[test]
    fn test_downed_ally() {
        let all = party();
        let mut rng = BattleRng::seed_from_u64(1);
        let target = select_target(TargetStrategy::DownedAlly, &all[0], &all, None, &mut rng);
        assert_eq!(target, Some(ParticipantId(2)));
    }

    #[test]
    fn test_random_enemy_never_downed() {
        let all = party();
        let mut rng = BattleRng::seed_from_u64(9);
        for _ in 0..50 {
            let target =
                select_target(TargetStrategy::RandomEnemy, &all[3], &all, None, &mut rng).unwrap();
            assert_ne!(target, ParticipantId(2));
        }
    }

    #[test]
    fn test_protect_overrides_ally_choice() {
        let all = party();
        let mut rng = BattleRng::seed_from_u64(1);
        let target = select_target(
            TargetStrategy::WeakestAlly,
            &all[0],
            &all,
            Some(ParticipantId(0)),
            &mut rng,
        );
        assert_eq!(target, Some(ParticipantId(0)));
    }

    #[test]
    fn test_no_opponents_yields_none() {
        let all = party();
        let mut rng = BattleRng::seed_from_u64(1);
        let only_players = &all[..3];
        let target =
            select_target(TargetStrategy::RandomEnemy, &only_players[0], only_players, None, &mut rng);
        assert_eq!(target, None);
    }
}
