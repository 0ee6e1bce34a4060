//! Hit, critical and damage formulas
//!
//! Pure functions over stats and a generator handle; the executor decides
//! which stats feed them.

use rand::Rng;

use crate::core::config::EngineConfig;
use crate::core::types::BattleRng;

/// Chance an attack connects, given both speeds
pub fn hit_chance(attacker_speed: i32, defender_speed: i32, config: &EngineConfig) -> f32 {
    let speed_gap = (defender_speed - attacker_speed).max(0) as f32;
    let evasion = (speed_gap * config.evasion_per_speed).min(config.max_evasion);
    (config.base_hit_chance - evasion).clamp(0.0, 1.0)
}

/// Critical chance from luck
pub fn crit_chance(luck: i32, config: &EngineConfig) -> f32 {
    (luck.max(0) as f32 * config.crit_per_luck).min(config.max_crit_chance)
}

/// Roll a probability. Certain outcomes never touch the generator.
pub fn roll(chance: f32, rng: &mut BattleRng) -> bool {
    if chance >= 1.0 {
        return true;
    }
    if chance <= 0.0 {
        return false;
    }
    rng.gen::<f32>() < chance
}

/// Random spread factor around 1.0
pub fn variance_factor(config: &EngineConfig, rng: &mut BattleRng) -> f32 {
    if config.damage_variance <= 0.0 {
        return 1.0;
    }
    1.0 + rng.gen_range(-config.damage_variance..=config.damage_variance)
}

/// Inputs to one damage roll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRoll {
    /// Attack or magic of the source, plus any skill power
    pub offense: i32,
    /// Defense (or magic resistance) of the target
    pub defense: i32,
    /// Combo and tactic bonus
    pub multiplier: f32,
    pub critical: bool,
    /// Pending guard multiplier on the target
    pub guard: Option<f32>,
}

/// Final damage for a roll.
///
/// Defense counts at half. Any positive offense deals at least 1.
pub fn compute_damage(roll: &DamageRoll, variance: f32, config: &EngineConfig) -> i32 {
    if roll.offense <= 0 {
        return 0;
    }

    let base = (roll.offense as f32 - roll.defense.max(0) as f32 / 2.0).max(0.0);
    let mut damage = base * variance * roll.multiplier.max(0.0);
    if roll.critical {
        damage *= config.crit_multiplier;
    }
    if let Some(guard) = roll.guard {
        damage *= guard;
    }

    (damage.round() as i32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn roll_with(offense: i32, defense: i32) -> DamageRoll {
        DamageRoll {
            offense,
            defense,
            multiplier: 1.0,
            critical: false,
            guard: None,
        }
    }

    #[test]
    fn test_defense_counts_half() {
        let config = EngineConfig::default();
        assert_eq!(compute_damage(&roll_with(10, 0), 1.0, &config), 10);
        assert_eq!(compute_damage(&roll_with(10, 8), 1.0, &config), 6);
    }

    #[test]
    fn test_minimum_one_damage() {
        let config = EngineConfig::default();
        assert_eq!(compute_damage(&roll_with(3, 100), 1.0, &config), 1);
        assert_eq!(compute_damage(&roll_with(0, 0), 1.0, &config), 0);
    }

    #[test]
    fn test_guard_and_crit() {
        let config = EngineConfig::default();
        let mut roll = roll_with(20, 0);
        roll.guard = Some(config.guard_multiplier);
        assert_eq!(compute_damage(&roll, 1.0, &config), 10);
        roll.critical = true;
        assert_eq!(compute_damage(&roll, 1.0, &config), 15);
    }

    #[test]
    fn test_variance_bounds() {
        let config = EngineConfig::default();
        let mut rng = BattleRng::seed_from_u64(4);
        for _ in 0..200 {
            let factor = variance_factor(&config, &mut rng);
            assert!((0.85..=1.15).contains(&factor));
        }
    }

    #[test]
    fn test_hit_chance_evasion_capped() {
        let config = EngineConfig::default();
        assert_eq!(hit_chance(10, 5, &config), config.base_hit_chance);
        let chance = hit_chance(0, 500, &config);
        assert!((chance - (config.base_hit_chance - config.max_evasion)).abs() < 1e-6);
    }

    #[test]
    fn test_crit_chance_capped() {
        let config = EngineConfig::default();
        assert!((crit_chance(10, &config) - 0.05).abs() < 1e-6);
        assert_eq!(crit_chance(1000, &config), config.max_crit_chance);
    }
}
