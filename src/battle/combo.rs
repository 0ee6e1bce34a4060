//! Combo tracking
//!
//! Consecutive damaging hits by one team build a damage multiplier. A miss
//! or an action by the other team resets it.

use serde::{Deserialize, Serialize};

use crate::core::config::EngineConfig;
use crate::core::types::Team;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboTracker {
    team: Option<Team>,
    count: u32,
    best: u32,
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn team(&self) -> Option<Team> {
        self.team
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Longest chain seen this battle
    pub fn best(&self) -> u32 {
        self.best
    }

    /// Called before `team` acts; breaks the other team's chain
    pub fn begin_action(&mut self, team: Team) {
        if self.team != Some(team) {
            self.reset();
            self.team = Some(team);
        }
    }

    /// Multiplier the next hit by `team` receives
    pub fn multiplier(&self, team: Team, config: &EngineConfig) -> f32 {
        if self.team != Some(team) {
            return 1.0;
        }
        (1.0 + config.combo_step * self.count as f32).min(config.combo_cap)
    }

    /// A damaging hit landed. Returns the new chain length.
    pub fn register_hit(&mut self, team: Team) -> u32 {
        if self.team != Some(team) {
            self.reset();
            self.team = Some(team);
        }
        self.count += 1;
        self.best = self.best.max(self.count);
        self.count
    }

    pub fn register_miss(&mut self) {
        self.count = 0;
    }

    pub fn reset(&mut self) {
        self.team = None;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_builds_and_caps() {
        let config = EngineConfig::default();
        let mut combo = ComboTracker::new();
        combo.begin_action(Team::Player);
        assert_eq!(combo.multiplier(Team::Player, &config), 1.0);

        for _ in 0..10 {
            combo.begin_action(Team::Player);
            combo.register_hit(Team::Player);
        }
        assert_eq!(combo.count(), 10);
        assert_eq!(combo.multiplier(Team::Player, &config), config.combo_cap);
    }

    #[test]
    fn test_opposing_action_resets() {
        let config = EngineConfig::default();
        let mut combo = ComboTracker::new();
        combo.begin_action(Team::Player);
        combo.register_hit(Team::Player);
        combo.register_hit(Team::Player);

        combo.begin_action(Team::Enemy);
        assert_eq!(combo.count(), 0);
        assert_eq!(combo.multiplier(Team::Player, &config), 1.0);
        assert_eq!(combo.best(), 2);
    }

    #[test]
    fn test_miss_resets() {
        let config = EngineConfig::default();
        let mut combo = ComboTracker::new();
        combo.begin_action(Team::Enemy);
        combo.register_hit(Team::Enemy);
        combo.register_miss();
        assert_eq!(combo.multiplier(Team::Enemy, &config), 1.0);
    }
}
