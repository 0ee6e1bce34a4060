//! Combatants and their mutable combat state
//!
//! HP and SP are private so every change goes through clamping methods:
//! current values always stay within `[0, max]`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::battle::ai::profile::AiProfile;
use crate::battle::memory::MemoryRegister;
use crate::battle::morale::MoraleState;
use crate::battle::status::{StatusEffects, StatusKind, StatusTick};
use crate::core::error::{BattleError, Result};
use crate::core::types::{Controller, ParticipantId, Stat, Team};

/// Core stats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub max_hp: i32,
    pub max_sp: i32,
    pub attack: i32,
    pub defense: i32,
    pub magic: i32,
    pub speed: i32,
    pub luck: i32,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            max_hp: 1,
            max_sp: 0,
            attack: 0,
            defense: 0,
            magic: 0,
            speed: 0,
            luck: 0,
        }
    }
}

impl Stats {
    /// Scale every stat by a factor, keeping each at least 1 (SP may be 0)
    pub fn scaled(&self, factor: f32) -> Stats {
        let scale = |value: i32| ((value as f32 * factor).round() as i32).max(1);
        Stats {
            max_hp: scale(self.max_hp),
            max_sp: if self.max_sp == 0 { 0 } else { scale(self.max_sp) },
            attack: scale(self.attack),
            defense: scale(self.defense),
            magic: scale(self.magic),
            speed: scale(self.speed),
            luck: scale(self.luck),
        }
    }

    pub fn base(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Hp => self.max_hp,
            Stat::Sp => self.max_sp,
            Stat::Attack => self.attack,
            Stat::Defense => self.defense,
            Stat::Magic => self.magic,
            Stat::Speed => self.speed,
            Stat::Luck => self.luck,
            Stat::LastDamage => 0,
        }
    }
}

/// One combatant (party member or enemy)
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub team: Team,
    pub controller: Controller,
    /// Enemy template this participant was built from
    pub template: Option<String>,
    pub level: u32,
    pub stats: Stats,
    hp: i32,
    sp: i32,
    pub statuses: StatusEffects,
    pub memory: MemoryRegister,
    pub morale: MoraleState,
    /// Incoming damage multiplier for the next hit, set by guarding
    pub guard: Option<f32>,
    pub last_damage_taken: i32,
    pub profile: Option<Arc<AiProfile>>,
    /// Has taken at least one action this battle
    pub has_acted: bool,
    pub fled: bool,
    /// Bosses cannot flee
    pub boss: bool,
}

impl Participant {
    /// Create a participant at full HP/SP.
    ///
    /// Player-side participants default to human control, enemies to AI.
    pub fn new(id: ParticipantId, name: impl Into<String>, team: Team, stats: Stats) -> Self {
        let controller = match team {
            Team::Player => Controller::Human,
            Team::Enemy => Controller::Ai,
        };
        Self {
            id,
            name: name.into(),
            team,
            controller,
            template: None,
            level: 1,
            hp: stats.max_hp.max(0),
            sp: stats.max_sp.max(0),
            stats,
            statuses: StatusEffects::new(),
            memory: MemoryRegister::default(),
            morale: MoraleState::default(),
            guard: None,
            last_damage_taken: 0,
            profile: None,
            has_acted: false,
            fled: false,
            boss: false,
        }
    }

    pub fn with_profile(mut self, profile: Arc<AiProfile>) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_controller(mut self, controller: Controller) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_hp(mut self, hp: i32) -> Self {
        self.set_hp(hp);
        self
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn sp(&self) -> i32 {
        self.sp
    }

    /// Set HP directly (clamped)
    pub fn set_hp(&mut self, hp: i32) {
        self.hp = hp.clamp(0, self.stats.max_hp);
    }

    /// Set SP directly (clamped)
    pub fn set_sp(&mut self, sp: i32) {
        self.sp = sp.clamp(0, self.stats.max_sp);
    }

    pub fn is_downed(&self) -> bool {
        self.hp == 0
    }

    pub fn is_spared(&self) -> bool {
        self.morale.is_spared()
    }

    /// Still in the fight: not downed, spared, or fled
    pub fn is_active(&self) -> bool {
        !self.is_downed() && !self.is_spared() && !self.fled
    }

    /// Present on the field (downed participants stay, for revival)
    pub fn is_present(&self) -> bool {
        !self.is_spared() && !self.fled
    }

    pub fn is_ai_controlled(&self) -> bool {
        self.controller == Controller::Ai
    }

    pub fn hp_percent(&self) -> f32 {
        if self.stats.max_hp <= 0 {
            return 0.0;
        }
        self.hp as f32 / self.stats.max_hp as f32 * 100.0
    }

    pub fn sp_percent(&self) -> f32 {
        if self.stats.max_sp <= 0 {
            return 0.0;
        }
        self.sp as f32 / self.stats.max_sp as f32 * 100.0
    }

    /// Stat including active buffs (HP/SP report current values)
    pub fn effective(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Sp => self.sp,
            Stat::LastDamage => self.last_damage_taken,
            other => (self.stats.base(other) + self.statuses.buff_total(other)).max(0),
        }
    }

    /// Value a memory key reads from a stat: base value for combat stats
    /// (so recalled buffs never feed back into the register), current value
    /// for HP, SP and last damage taken.
    pub fn memory_source_value(&self, stat: Stat) -> i32 {
        match stat {
            Stat::Hp | Stat::Sp | Stat::LastDamage => self.effective(stat),
            other => self.stats.base(other),
        }
    }

    pub fn can_use_skills(&self) -> bool {
        !self.statuses.has(StatusKind::Silence)
    }

    /// Lose HP. Returns the HP actually lost.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        if amount <= 0 || self.is_downed() {
            return 0;
        }
        let lost = amount.min(self.hp);
        self.hp -= lost;
        self.last_damage_taken = lost;
        if self.is_downed() {
            self.guard = None;
            self.statuses.clear();
        }
        lost
    }

    /// Restore HP to a living participant. Returns HP actually restored.
    pub fn heal(&mut self, amount: i32) -> i32 {
        if amount <= 0 || self.is_downed() {
            return 0;
        }
        let before = self.hp;
        self.set_hp(self.hp + amount);
        self.hp - before
    }

    /// Bring a downed participant back with some HP
    pub fn revive(&mut self, amount: i32) -> i32 {
        if !self.is_downed() {
            return 0;
        }
        self.set_hp(amount.max(1));
        self.hp
    }

    pub fn spend_sp(&mut self, cost: i32) -> Result<()> {
        if cost > self.sp {
            return Err(BattleError::InsufficientResource {
                needed: cost,
                available: self.sp,
            });
        }
        self.sp -= cost.max(0);
        Ok(())
    }

    pub fn restore_sp(&mut self, amount: i32) -> i32 {
        let before = self.sp;
        self.set_sp(self.sp + amount.max(0));
        self.sp - before
    }

    /// Consume the guard multiplier for an incoming hit
    pub fn take_guard(&mut self) -> Option<f32> {
        self.guard.take()
    }

    /// Start-of-turn upkeep: the guard from last turn lapses and statuses tick.
    ///
    /// Damage and healing from the tick are applied here; the returned tick
    /// carries the amounts actually applied.
    pub fn begin_turn(&mut self) -> StatusTick {
        self.guard = None;
        let mut tick = self.statuses.tick(self.stats.max_hp);

        for (_, amount) in tick.damage.iter_mut() {
            *amount = self.take_damage(*amount);
        }
        for (_, amount) in tick.healing.iter_mut() {
            *amount = self.heal(*amount);
        }

        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(hp: i32, sp: i32) -> Stats {
        Stats {
            max_hp: hp,
            max_sp: sp,
            attack: 10,
            defense: 5,
            magic: 8,
            speed: 7,
            luck: 3,
        }
    }

    fn hero() -> Participant {
        Participant::new(ParticipantId(0), "Hero", Team::Player, stats(50, 20))
    }

    #[test]
    fn test_new_participant_full_resources() {
        let p = hero();
        assert_eq!(p.hp(), 50);
        assert_eq!(p.sp(), 20);
        assert_eq!(p.controller, Controller::Human);
        assert!(p.is_active());
    }

    #[test]
    fn test_enemies_default_to_ai() {
        let p = Participant::new(ParticipantId(1), "Slime", Team::Enemy, stats(10, 0));
        assert!(p.is_ai_controlled());
    }

    #[test]
    fn test_damage_clamps_at_zero() {
        let mut p = hero();
        assert_eq!(p.take_damage(80), 50);
        assert_eq!(p.hp(), 0);
        assert!(p.is_downed());
        assert_eq!(p.take_damage(5), 0);
    }

    #[test]
    fn test_heal_clamps_at_max_and_ignores_downed() {
        let mut p = hero();
        p.take_damage(10);
        assert_eq!(p.heal(100), 10);
        p.take_damage(50);
        assert_eq!(p.heal(10), 0);
    }

    #[test]
    fn test_revive_only_downed() {
        let mut p = hero();
        assert_eq!(p.revive(10), 0);
        p.take_damage(50);
        assert_eq!(p.revive(0), 1);
        assert!(!p.is_downed());
    }

    #[test]
    fn test_spend_sp_insufficient_leaves_state() {
        let mut p = hero();
        let err = p.spend_sp(30).unwrap_err();
        assert!(matches!(
            err,
            BattleError::InsufficientResource {
                needed: 30,
                available: 20
            }
        ));
        assert_eq!(p.sp(), 20);
    }

    #[test]
    fn test_effective_includes_buffs() {
        let mut p = hero();
        p.statuses.apply(StatusKind::AttackUp, 2, 20, 5);
        assert_eq!(p.effective(Stat::Attack), 30);
        assert_eq!(p.memory_source_value(Stat::Attack), 10);
    }

    #[test]
    fn test_begin_turn_applies_poison() {
        let mut p = hero();
        p.guard = Some(0.5);
        p.statuses.apply(StatusKind::Poison, 2, 0, 5);
        let tick = p.begin_turn();
        assert_eq!(tick.damage[0].1, 3);
        assert_eq!(p.hp(), 47);
        assert!(p.guard.is_none());
    }

    #[test]
    fn test_scaled_stats_floor() {
        let scaled = stats(10, 0).scaled(0.01);
        assert_eq!(scaled.max_hp, 1);
        assert_eq!(scaled.max_sp, 0);
    }

    #[test]
    fn test_hp_percent() {
        let p = hero().with_hp(25);
        assert!((p.hp_percent() - 50.0).abs() < f32::EPSILON);
    }
}
