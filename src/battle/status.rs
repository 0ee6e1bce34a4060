//! Status effects: damage over time, disables and stat buffs
//!
//! Effects are kept in application order so ticking is deterministic.
//! Buffs never touch base stats; effective stats are derived from the
//! active buff potencies, so expiry reverts them automatically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::types::Stat;

/// Kinds of status effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Poison,
    Burn,
    Regen,
    Stun,
    Silence,
    AttackUp,
    DefenseUp,
    MagicUp,
    SpeedUp,
}

impl StatusKind {
    pub fn all() -> &'static [StatusKind] {
        &[
            StatusKind::Poison,
            StatusKind::Burn,
            StatusKind::Regen,
            StatusKind::Stun,
            StatusKind::Silence,
            StatusKind::AttackUp,
            StatusKind::DefenseUp,
            StatusKind::MagicUp,
            StatusKind::SpeedUp,
        ]
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusKind::Poison => "poison",
            StatusKind::Burn => "burn",
            StatusKind::Regen => "regen",
            StatusKind::Stun => "stun",
            StatusKind::Silence => "silence",
            StatusKind::AttackUp => "attack_up",
            StatusKind::DefenseUp => "defense_up",
            StatusKind::MagicUp => "magic_up",
            StatusKind::SpeedUp => "speed_up",
        }
    }

    /// Harmful statuses (removed by cure-all effects)
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            StatusKind::Poison | StatusKind::Burn | StatusKind::Stun | StatusKind::Silence
        )
    }

    /// Statuses that stack instead of replacing potency
    pub fn stacks(self) -> bool {
        matches!(self, StatusKind::Poison | StatusKind::Burn | StatusKind::Regen)
    }

    /// The stat a buff status raises
    pub fn buff_stat(self) -> Option<Stat> {
        match self {
            StatusKind::AttackUp => Some(Stat::Attack),
            StatusKind::DefenseUp => Some(Stat::Defense),
            StatusKind::MagicUp => Some(Stat::Magic),
            StatusKind::SpeedUp => Some(Stat::Speed),
            _ => None,
        }
    }

    /// The buff status backing a temporary raise of `stat`
    pub fn buff_for(stat: Stat) -> Option<StatusKind> {
        match stat {
            Stat::Attack => Some(StatusKind::AttackUp),
            Stat::Defense => Some(StatusKind::DefenseUp),
            Stat::Magic => Some(StatusKind::MagicUp),
            Stat::Speed => Some(StatusKind::SpeedUp),
            _ => None,
        }
    }

    /// Share of max HP lost (or regained) per stack per turn
    fn tick_fraction(self) -> f32 {
        match self {
            StatusKind::Poison => 0.05,
            StatusKind::Burn => 0.08,
            StatusKind::Regen => 0.05,
            _ => 0.0,
        }
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusKind::all()
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

/// One active status effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Turns left (ticks down at the start of the holder's turn)
    pub remaining: u32,
    pub stacks: u32,
    /// Fixed per-tick amount or buff size; 0 means "use the default fraction"
    pub potency: i32,
}

/// Result of ticking statuses at the start of a turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusTick {
    /// (kind, amount) pairs of HP lost to damage over time
    pub damage: Vec<(StatusKind, i32)>,
    /// (kind, amount) pairs of HP regained
    pub healing: Vec<(StatusKind, i32)>,
    pub expired: Vec<StatusKind>,
    pub stunned: bool,
}

/// Ordered collection of a participant's active statuses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    effects: Vec<StatusEffect>,
}

impl StatusEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a status. Stacking kinds gain a stack (up to `max_stacks`);
    /// other kinds replace potency. Duration always refreshes to the longer one.
    pub fn apply(&mut self, kind: StatusKind, duration: u32, potency: i32, max_stacks: u32) {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.kind == kind) {
            existing.remaining = existing.remaining.max(duration);
            if kind.stacks() {
                existing.stacks = (existing.stacks + 1).min(max_stacks.max(1));
            } else {
                existing.potency = potency;
            }
            return;
        }

        self.effects.push(StatusEffect {
            kind,
            remaining: duration,
            stacks: 1,
            potency,
        });
    }

    pub fn has(&self, kind: StatusKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind)
    }

    pub fn get(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.effects.iter().find(|e| e.kind == kind)
    }

    pub fn remove(&mut self, kind: StatusKind) -> bool {
        let before = self.effects.len();
        self.effects.retain(|e| e.kind != kind);
        before != self.effects.len()
    }

    /// Remove every harmful status, returning what was removed
    pub fn clear_negative(&mut self) -> Vec<StatusKind> {
        let removed: Vec<StatusKind> = self
            .effects
            .iter()
            .filter(|e| e.kind.is_negative())
            .map(|e| e.kind)
            .collect();
        self.effects.retain(|e| !e.kind.is_negative());
        removed
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    /// Total buff applied to a stat
    pub fn buff_total(&self, stat: Stat) -> i32 {
        self.effects
            .iter()
            .filter(|e| e.kind.buff_stat() == Some(stat))
            .map(|e| e.potency)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusEffect> {
        self.effects.iter()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Resolve start-of-turn effects and count durations down.
    ///
    /// Amounts are computed from the state before ticking, so a one-turn
    /// effect still fires once before it expires.
    pub fn tick(&mut self, max_hp: i32) -> StatusTick {
        let mut result = StatusTick {
            stunned: self.has(StatusKind::Stun),
            ..StatusTick::default()
        };

        for effect in &self.effects {
            let amount = Self::tick_amount(effect, max_hp);
            match effect.kind {
                StatusKind::Poison | StatusKind::Burn => result.damage.push((effect.kind, amount)),
                StatusKind::Regen => result.healing.push((effect.kind, amount)),
                _ => {}
            }
        }

        for effect in &mut self.effects {
            effect.remaining = effect.remaining.saturating_sub(1);
        }
        result.expired = self
            .effects
            .iter()
            .filter(|e| e.remaining == 0)
            .map(|e| e.kind)
            .collect();
        self.effects.retain(|e| e.remaining > 0);

        result
    }

    fn tick_amount(effect: &StatusEffect, max_hp: i32) -> i32 {
        let per_stack = if effect.potency > 0 {
            effect.potency as f32
        } else {
            max_hp as f32 * effect.kind.tick_fraction()
        };
        ((per_stack * effect.stacks as f32).round() as i32).max(1)
    }
}
