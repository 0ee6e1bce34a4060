//! Static definitions: skills, items and enemy templates
//!
//! The catalog is read-only once a battle starts and is shared between
//! sessions behind an `Arc`.

use std::collections::BTreeMap;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::battle::ai::profile::AiProfile;
use crate::battle::participant::Stats;
use crate::battle::status::StatusKind;
use crate::core::types::{Element, ItemId, SkillId, Stat};

/// Which participants a skill or item may be used on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetRule {
    /// A living opponent
    #[default]
    Enemy,
    /// A living teammate (the user included)
    Ally,
    #[serde(rename = "self")]
    Myself,
    /// A downed teammate
    DownedAlly,
}

fn always() -> f32 {
    1.0
}

/// What a skill does
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillEffect {
    Damage {
        power: i32,
    },
    /// Heals a living target, or revives a downed one
    Heal {
        power: i32,
    },
    Status {
        status: StatusKind,
        duration: u32,
        #[serde(default)]
        potency: i32,
        /// Chance to land (0.0 to 1.0)
        #[serde(default = "always")]
        chance: f32,
    },
    Buff {
        stat: Stat,
        amount: i32,
        duration: u32,
    },
    /// Removes harmful statuses
    Cleanse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDef {
    pub id: SkillId,
    pub name: String,
    #[serde(default)]
    pub sp_cost: i32,
    #[serde(default)]
    pub element: Element,
    #[serde(default)]
    pub target: TargetRule,
    pub effect: SkillEffect,
}

impl SkillDef {
    pub fn is_damaging(&self) -> bool {
        matches!(self.effect, SkillEffect::Damage { .. })
    }

    /// Healing aimed at the user's side
    pub fn heals_allies(&self) -> bool {
        matches!(self.effect, SkillEffect::Heal { .. } | SkillEffect::Cleanse)
            && matches!(
                self.target,
                TargetRule::Ally | TargetRule::Myself | TargetRule::DownedAlly
            )
    }
}

/// What an item does when consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEffect {
    Heal {
        amount: i32,
    },
    RestoreSp {
        amount: i32,
    },
    /// Revive with a share of max HP (0.0 to 1.0)
    Revive {
        percent: f32,
    },
    /// Fixed damage, ignoring defense
    Damage {
        amount: i32,
    },
    /// Remove one status, or every harmful one when `status` is absent
    Cure {
        #[serde(default)]
        status: Option<StatusKind>,
    },
    ApplyStatus {
        status: StatusKind,
        duration: u32,
        #[serde(default)]
        potency: i32,
    },
}

fn ally_rule() -> TargetRule {
    TargetRule::Ally
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDef {
    pub id: ItemId,
    pub name: String,
    #[serde(default = "ally_rule")]
    pub target: TargetRule,
    pub effect: ItemEffect,
}

fn one() -> u32 {
    1
}

/// Enemy template: stats at its base level plus AI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyTemplate {
    pub id: String,
    pub name: String,
    #[serde(default = "one")]
    pub level: u32,
    pub stats: Stats,
    #[serde(default)]
    pub ai: AiProfile,
    /// Boss enemies make the battle unescapable and never flee themselves
    #[serde(default)]
    pub boss: bool,
    /// Persuasion points needed per morale stage
    #[serde(default = "one")]
    pub talk_resistance: u32,
    /// Items the enemy carries into battle
    #[serde(default)]
    pub items: BTreeMap<ItemId, u32>,
}

/// Read-only definitions catalog
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    skills: AHashMap<SkillId, SkillDef>,
    items: AHashMap<ItemId, ItemDef>,
    enemies: AHashMap<String, EnemyTemplate>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_skill(&mut self, skill: SkillDef) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn insert_item(&mut self, item: ItemDef) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn insert_enemy(&mut self, enemy: EnemyTemplate) {
        self.enemies.insert(enemy.id.clone(), enemy);
    }

    pub fn skill(&self, id: &str) -> Option<&SkillDef> {
        self.skills.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&EnemyTemplate> {
        self.enemies.get(id)
    }

    /// Enemy templates sorted by id
    pub fn enemies(&self) -> Vec<&EnemyTemplate> {
        let mut enemies: Vec<&EnemyTemplate> = self.enemies.values().collect();
        enemies.sort_by(|a, b| a.id.cmp(&b.id));
        enemies
    }

    pub fn skill_count(&self) -> usize {
        self.skills.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}
