//! Core type definitions used throughout the codebase

use std::fmt;
use std::str::FromStr;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Random generator owned by a battle session.
///
/// Every random roll in the simulation goes through a handle of this type,
/// so a seed fully determines a battle.
pub type BattleRng = ChaCha8Rng;

/// Round counter (one round = every living participant acts once)
pub type Round = u32;

/// Skill identifier as written in content files
pub type SkillId = String;

/// Item identifier as written in content files
pub type ItemId = String;

/// Unique identifier for a battle session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BattleId(pub Uuid);

impl BattleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BattleId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identifier of a participant within one battle.
///
/// Assigned in insertion order (party first, then enemies), which also
/// serves as the final tie-breaker in turn order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Side of the battle a participant fights for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Player,
    Enemy,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::Player => Team::Enemy,
            Team::Enemy => Team::Player,
        }
    }
}

/// Who decides a participant's commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    /// Commands come from the host (the human player)
    #[default]
    Human,
    /// Commands are computed by the AI pipeline
    Ai,
}

/// Stats a participant exposes to skills, buffs and the memory register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Hp,
    Sp,
    Attack,
    Defense,
    Magic,
    Speed,
    Luck,
    /// Amount of HP lost to the most recent hit
    LastDamage,
}

impl Stat {
    /// Stats a temporary buff can raise in combat
    pub fn is_combat(self) -> bool {
        matches!(self, Stat::Attack | Stat::Defense | Stat::Magic | Stat::Speed)
    }

    pub fn name(self) -> &'static str {
        match self {
            Stat::Hp => "hp",
            Stat::Sp => "sp",
            Stat::Attack => "attack",
            Stat::Defense => "defense",
            Stat::Magic => "magic",
            Stat::Speed => "speed",
            Stat::Luck => "luck",
            Stat::LastDamage => "last_damage",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hp" => Ok(Stat::Hp),
            "sp" => Ok(Stat::Sp),
            "attack" => Ok(Stat::Attack),
            "defense" => Ok(Stat::Defense),
            "magic" => Ok(Stat::Magic),
            "speed" => Ok(Stat::Speed),
            "luck" => Ok(Stat::Luck),
            "last_damage" => Ok(Stat::LastDamage),
            other => Err(format!("unknown stat '{}'", other)),
        }
    }
}

/// Damage element of a skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    #[default]
    None,
    Physical,
    Fire,
    Ice,
    Lightning,
    Holy,
    Dark,
}

impl Element {
    /// Elements that scale with the attack stat instead of magic
    pub fn is_physical(self) -> bool {
        matches!(self, Element::Physical | Element::None)
    }

    /// Physical and classic elemental damage (what aggressive AI favors)
    pub fn is_offensive(self) -> bool {
        matches!(
            self,
            Element::Physical | Element::Fire | Element::Ice | Element::Lightning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Player.opponent(), Team::Enemy);
        assert_eq!(Team::Enemy.opponent(), Team::Player);
    }

    #[test]
    fn test_stat_round_trip_names() {
        for stat in [Stat::Hp, Stat::Attack, Stat::LastDamage] {
            assert_eq!(stat.name().parse::<Stat>().unwrap(), stat);
        }
        assert!("charisma".parse::<Stat>().is_err());
    }

    #[test]
    fn test_combat_stats() {
        assert!(Stat::Attack.is_combat());
        assert!(Stat::Speed.is_combat());
        assert!(!Stat::Hp.is_combat());
        assert!(!Stat::LastDamage.is_combat());
    }

    #[test]
    fn test_participant_ids_order_by_insertion() {
        assert!(ParticipantId(0) < ParticipantId(3));
    }
}
