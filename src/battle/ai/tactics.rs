//! Coordinated multi-enemy tactics
//!
//! Planned once at the start of each round. Enemies that take a role skip
//! their own rules for that round; everyone else decides normally.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::ai::profile::RuleAction;
use crate::battle::ai::targeting::{select_target, TargetStrategy};
use crate::battle::participant::Participant;
use crate::battle::status::StatusKind;
use crate::core::types::{BattleRng, ParticipantId, Stat, Team};

/// When a tactic fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TacticTrigger {
    /// Members at or above this HP percentage qualify
    AboveHp { hp_percent: f32 },
    /// Fires once an enemy built from `initiator` has acted this battle
    InitiatorActed { initiator: String },
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TacticRole {
    Initiator,
    Supporter,
    Finisher,
}

fn two() -> usize {
    2
}

fn bonus() -> f32 {
    1.5
}

fn focus_default() -> TargetStrategy {
    TargetStrategy::WeakestEnemy
}

/// A combined action across several enemies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatedTactic {
    pub name: String,
    /// Enemy template ids allowed to take part (empty = any)
    #[serde(default)]
    pub members: Vec<String>,
    pub trigger: TacticTrigger,
    #[serde(default = "two")]
    pub min_members: usize,
    #[serde(default)]
    pub max_members: Option<usize>,
    /// Bonus applied to the finisher's damage
    #[serde(default = "bonus")]
    pub damage_multiplier: f32,
    /// Shared target, picked when the tactic is planned
    #[serde(default = "focus_default")]
    pub focus: TargetStrategy,
    #[serde(default)]
    pub initiator_action: Option<RuleAction>,
    #[serde(default)]
    pub supporter_action: Option<RuleAction>,
    #[serde(default)]
    pub finisher_action: Option<RuleAction>,
}

impl CoordinatedTactic {
    pub fn new(name: impl Into<String>, trigger: TacticTrigger) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            trigger,
            min_members: 2,
            max_members: None,
            damage_multiplier: 1.5,
            focus: TargetStrategy::WeakestEnemy,
            initiator_action: None,
            supporter_action: None,
            finisher_action: None,
        }
    }

    fn admits(&self, p: &Participant) -> bool {
        self.members.is_empty()
            || p.template
                .as_deref()
                .is_some_and(|template| self.members.iter().any(|m| m == template))
    }

    fn action_for(&self, role: TacticRole) -> RuleAction {
        let configured = match role {
            TacticRole::Initiator => &self.initiator_action,
            TacticRole::Supporter => &self.supporter_action,
            TacticRole::Finisher => &self.finisher_action,
        };
        configured.clone().unwrap_or(RuleAction::Attack { target: self.focus })
    }
}

/// One enemy's part in a tactic this round
#[derive(Debug, Clone, PartialEq)]
pub struct TacticAssignment {
    pub tactic: String,
    pub role: TacticRole,
    pub action: RuleAction,
    /// Focus target chosen at plan time
    pub target: Option<ParticipantId>,
    pub damage_multiplier: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggeredTactic {
    pub name: String,
    pub members: Vec<ParticipantId>,
}

/// Role assignments for one round
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TacticsPlan {
    pub assignments: BTreeMap<ParticipantId, TacticAssignment>,
    pub triggered: Vec<TriggeredTactic>,
}

impl TacticsPlan {
    pub fn assignment(&self, id: ParticipantId) -> Option<&TacticAssignment> {
        self.assignments.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Capability: plan coordinated tactics for a round
pub trait TacticsPlanning: Send {
    fn plan(
        &mut self,
        tactics: &[CoordinatedTactic],
        participants: &[Participant],
        rng: &mut BattleRng,
    ) -> TacticsPlan;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TacticsCoordinator;

impl TacticsCoordinator {
    pub fn new() -> Self {
        Self
    }
}

fn can_coordinate(p: &Participant) -> bool {
    p.team == Team::Enemy && p.is_active() && !p.statuses.has(StatusKind::Stun)
}

impl TacticsPlanning for TacticsCoordinator {
    fn plan(
        &mut self,
        tactics: &[CoordinatedTactic],
        participants: &[Participant],
        rng: &mut BattleRng,
    ) -> TacticsPlan {
        let mut plan = TacticsPlan::default();
        let mut busy: BTreeSet<ParticipantId> = BTreeSet::new();

        for tactic in tactics {
            let mut members: Vec<&Participant> = participants
                .iter()
                .filter(|p| can_coordinate(p) && !busy.contains(&p.id) && tactic.admits(p))
                .collect();

            match &tactic.trigger {
                TacticTrigger::AboveHp { hp_percent } => {
                    members.retain(|p| p.hp_percent() >= *hp_percent);
                }
                TacticTrigger::InitiatorActed { initiator } => {
                    let ready = members.iter().any(|p| {
                        p.has_acted && p.template.as_deref() == Some(initiator.as_str())
                    });
                    if !ready {
                        continue;
                    }
                }
                TacticTrigger::Always => {}
            }

            if members.len() < tactic.min_members.max(2) {
                continue;
            }

            members.sort_by(|a, b| {
                b.effective(Stat::Speed)
                    .cmp(&a.effective(Stat::Speed))
                    .then(a.id.cmp(&b.id))
            });
            if let TacticTrigger::InitiatorActed { initiator } = &tactic.trigger {
                // the designated initiator leads
                if let Some(pos) = members
                    .iter()
                    .position(|p| p.template.as_deref() == Some(initiator.as_str()))
                {
                    let lead = members.remove(pos);
                    members.insert(0, lead);
                }
            }
            if let Some(max) = tactic.max_members {
                members.truncate(max.max(2));
            }

            let focus = select_target(tactic.focus, members[0], participants, None, rng);
            let last = members.len() - 1;
            for (slot, member) in members.iter().enumerate() {
                let role = if slot == 0 {
                    TacticRole::Initiator
                } else if slot == last {
                    TacticRole::Finisher
                } else {
                    TacticRole::Supporter
                };
                let damage_multiplier = if role == TacticRole::Finisher {
                    tactic.damage_multiplier
                } else {
                    1.0
                };
                plan.assignments.insert(
                    member.id,
                    TacticAssignment {
                        tactic: tactic.name.clone(),
                        role,
                        action: tactic.action_for(role),
                        target: focus,
                        damage_multiplier,
                    },
                );
                busy.insert(member.id);
            }

            let ids: Vec<ParticipantId> = members.iter().map(|p| p.id).collect();
            debug!(tactic = %tactic.name, members = ?ids, "Coordinated tactic planned");
            plan.triggered.push(TriggeredTactic {
                name: tactic.name.clone(),
                members: ids,
            });
        }

        plan
    }
}
