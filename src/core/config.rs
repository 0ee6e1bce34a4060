//! Engine configuration with documented constants
//!
//! All tuning numbers for damage, accuracy, combos, fleeing and the learning
//! AI live here. Each engine owns its own copy; there is no global config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};

/// Configuration for one battle engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === CONTENT ===
    /// Fail loudly on content defects instead of degrading.
    ///
    /// Meant for content-validation tooling. Live play keeps this off so a
    /// bad AI profile can never end a session.
    pub strict_content: bool,

    // === DAMAGE ===
    /// Random spread applied to every damage roll (0.15 = ±15%)
    pub damage_variance: f32,

    /// Incoming damage multiplier while guarding
    pub guard_multiplier: f32,

    /// Multiplier applied to critical hits
    pub crit_multiplier: f32,

    /// Critical chance gained per point of luck
    pub crit_per_luck: f32,

    /// Upper bound on critical chance
    pub max_crit_chance: f32,

    // === ACCURACY ===
    /// Hit chance before evasion
    pub base_hit_chance: f32,

    /// Evasion gained per point of speed the defender has over the attacker
    pub evasion_per_speed: f32,

    /// Upper bound on evasion
    pub max_evasion: f32,

    // === COMBO ===
    /// Damage multiplier added per consecutive same-team hit
    pub combo_step: f32,

    /// Maximum combo damage multiplier
    pub combo_cap: f32,

    // === STATUS ===
    /// Maximum stacks for damage-over-time statuses
    pub status_max_stacks: u32,

    /// Duration in turns of a buff recalled from the memory register
    pub memory_buff_duration: u32,

    // === FLEE ===
    /// Flee chance with equal speeds
    pub flee_base_chance: f32,

    /// Flee chance gained per point of speed over the opposing average
    pub flee_speed_factor: f32,

    pub flee_min_chance: f32,
    pub flee_max_chance: f32,

    // === LEARNING AI ===
    /// Number of recent player actions kept for pattern analysis
    pub learning_window: usize,

    /// Observed actions required before any counter-strategy is produced
    pub learning_min_actions: usize,

    /// Share of the window an action must reach to count as a pattern
    pub learning_threshold: f32,

    /// New observations required before a cached analysis is recomputed
    pub learning_refresh: u64,

    // === SAFETY ===
    /// Rounds after which hosts (and the runner) should abort a battle
    pub max_rounds: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_content: false,

            damage_variance: 0.15,
            guard_multiplier: 0.5,
            crit_multiplier: 1.5,
            crit_per_luck: 0.005,
            max_crit_chance: 0.25,

            base_hit_chance: 0.95,
            evasion_per_speed: 0.01,
            max_evasion: 0.30,

            combo_step: 0.1,
            combo_cap: 1.5,

            status_max_stacks: 5,
            memory_buff_duration: 3,

            flee_base_chance: 0.5,
            flee_speed_factor: 0.02,
            flee_min_chance: 0.1,
            flee_max_chance: 0.95,

            learning_window: 10,
            learning_min_actions: 3,
            learning_threshold: 0.5,
            learning_refresh: 2,

            max_rounds: 200,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Config that turns content defects into errors
    pub fn strict() -> Self {
        Self {
            strict_content: true,
            ..Self::default()
        }
    }

    /// Parse a config from TOML (missing keys take defaults)
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(contents)?;
        config.validate().map_err(BattleError::Config)?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..1.0).contains(&self.damage_variance) {
            return Err(format!(
                "damage_variance ({}) must be in [0, 1)",
                self.damage_variance
            ));
        }

        if !(0.0..=1.0).contains(&self.guard_multiplier) {
            return Err(format!(
                "guard_multiplier ({}) must be in [0, 1]",
                self.guard_multiplier
            ));
        }

        if self.combo_cap < 1.0 {
            return Err(format!("combo_cap ({}) must be >= 1.0", self.combo_cap));
        }

        if self.flee_min_chance > self.flee_max_chance {
            return Err(format!(
                "flee_min_chance ({}) should be <= flee_max_chance ({})",
                self.flee_min_chance, self.flee_max_chance
            ));
        }

        if self.learning_window == 0 || self.learning_min_actions > self.learning_window {
            return Err(format!(
                "learning_min_actions ({}) must fit in learning_window ({})",
                self.learning_min_actions, self.learning_window
            ));
        }

        if !(0.0..=1.0).contains(&self.learning_threshold) {
            return Err("learning_threshold must be in [0, 1]".into());
        }

        if self.status_max_stacks == 0 {
            return Err("status_max_stacks must be positive".into());
        }

        Ok(())
    }
}
