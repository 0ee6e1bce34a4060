//! Battle log: effect records and notifications
//!
//! Consumers may ignore any event; nothing in the simulation reads the log
//! back except statistics and tests.

use serde::{Deserialize, Serialize};

use crate::battle::actions::Action;
use crate::battle::ai::learning::DetectedPattern;
use crate::battle::memory::MemoryOp;
use crate::battle::morale::MoraleStage;
use crate::battle::outcome::BattleOutcome;
use crate::battle::status::StatusKind;
use crate::core::types::{BattleId, ItemId, ParticipantId, Round, Stat, Team};

/// What happened to a participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum EffectKind {
    /// HP actually lost
    Damage { amount: i32, critical: bool },
    Miss,
    Heal { amount: i32 },
    Revived { hp: i32 },
    SpSpent { amount: i32 },
    SpRestored { amount: i32 },
    StatusApplied { status: StatusKind, duration: u32 },
    StatusResisted { status: StatusKind },
    StatusRemoved { status: StatusKind },
    StatusExpired { status: StatusKind },
    /// Damage-over-time tick
    StatusDamage { status: StatusKind, amount: i32 },
    StatusHealing { status: StatusKind, amount: i32 },
    Guarding { multiplier: f32 },
    MoraleChanged { from: MoraleStage, to: MoraleStage },
    Spared,
    Fled,
    FleeFailed { chance: f32 },
    MemoryStored { op: MemoryOp, stat: Stat, value: i32 },
    MemoryRecalled { stat: Stat, amount: i32 },
    MemoryCleared,
    ItemConsumed { item: ItemId },
    Downed,
    /// No combat effect, message only
    Info { message: String },
}

/// One discrete effect: who caused it, who it landed on, what it was
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub source: ParticipantId,
    pub target: Option<ParticipantId>,
    pub kind: EffectKind,
}

impl EffectRecord {
    pub fn new(source: ParticipantId, target: ParticipantId, kind: EffectKind) -> Self {
        Self {
            source,
            target: Some(target),
            kind,
        }
    }

    /// Effect on the source itself
    pub fn on_self(source: ParticipantId, kind: EffectKind) -> Self {
        Self::new(source, source, kind)
    }

    pub fn info(source: ParticipantId, message: impl Into<String>) -> Self {
        Self {
            source,
            target: None,
            kind: EffectKind::Info {
                message: message.into(),
            },
        }
    }

    /// HP removed from the target by this effect
    pub fn hp_lost(&self) -> i32 {
        match self.kind {
            EffectKind::Damage { amount, .. } | EffectKind::StatusDamage { amount, .. } => amount,
            _ => 0,
        }
    }

    /// HP restored to the target by this effect
    pub fn hp_restored(&self) -> i32 {
        match self.kind {
            EffectKind::Heal { amount } | EffectKind::StatusHealing { amount, .. } => amount,
            EffectKind::Revived { hp } => hp,
            _ => 0,
        }
    }
}

/// Log entry for battle events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleEvent {
    pub round: Round,
    pub kind: BattleEventKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BattleEventKind {
    BattleStarted {
        battle_id: BattleId,
        seed: u64,
    },
    RoundStarted {
        order: Vec<ParticipantId>,
    },
    ActionResolved {
        actor: ParticipantId,
        action: Action,
    },
    Effect(EffectRecord),
    PhaseTransition {
        actor: ParticipantId,
        from: Option<String>,
        phase: String,
        hp_percent: f32,
    },
    Combo {
        team: Team,
        count: u32,
        multiplier: f32,
    },
    TacticTriggered {
        tactic: String,
        members: Vec<ParticipantId>,
    },
    PatternDetected {
        pattern: DetectedPattern,
    },
    /// Content defect degraded at runtime
    Diagnostic {
        actor: Option<ParticipantId>,
        message: String,
    },
    TurnSkipped {
        actor: ParticipantId,
        reason: String,
    },
    EnemyKilled {
        id: ParticipantId,
    },
    EnemySpared {
        id: ParticipantId,
    },
    EnemyFled {
        id: ParticipantId,
    },
    AllyDowned {
        id: ParticipantId,
    },
    BattleEnded {
        outcome: BattleOutcome,
    },
}

impl BattleEventKind {
    /// Topic for an external event bus, for events worth publishing
    pub fn topic(&self) -> Option<&'static str> {
        match self {
            BattleEventKind::EnemyKilled { .. } => Some("enemy_killed"),
            BattleEventKind::EnemySpared { .. } => Some("enemy_spared"),
            BattleEventKind::PhaseTransition { .. } => Some("phase_changed"),
            BattleEventKind::Combo { .. } => Some("combo"),
            BattleEventKind::TacticTriggered { .. } => Some("tactic_triggered"),
            BattleEventKind::PatternDetected { .. } => Some("pattern_detected"),
            BattleEventKind::BattleEnded { outcome } => match outcome {
                BattleOutcome::Victory => Some("battle_won"),
                BattleOutcome::Defeat => Some("battle_lost"),
                BattleOutcome::Escaped => Some("battle_escaped"),
                BattleOutcome::Aborted | BattleOutcome::Ongoing => None,
            },
            _ => None,
        }
    }
}

/// Append-only battle log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, round: Round, kind: BattleEventKind, description: String) {
        self.events.push(BattleEvent {
            round,
            kind,
            description,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BattleEvent> {
        self.events.iter()
    }

    /// Events from `index` onward
    pub fn since(&self, index: usize) -> &[BattleEvent] {
        &self.events[index.min(self.events.len())..]
    }

    pub fn effects(&self) -> impl Iterator<Item = &EffectRecord> {
        self.events.iter().filter_map(|event| match &event.kind {
            BattleEventKind::Effect(record) => Some(record),
            _ => None,
        })
    }

    /// Total HP a participant lost over the logged battle
    pub fn damage_taken_by(&self, id: ParticipantId) -> i32 {
        self.effects()
            .filter(|record| record.target == Some(id))
            .map(EffectRecord::hp_lost)
            .sum()
    }

    /// Events that map to an event-bus topic, paired with it
    pub fn published(&self) -> impl Iterator<Item = (&'static str, &BattleEvent)> {
        self.events
            .iter()
            .filter_map(|event| event.kind.topic().map(|topic| (topic, event)))
    }
}
