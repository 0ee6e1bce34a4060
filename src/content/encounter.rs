//! Encounter descriptors supplied at battle start

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::battle::ai::tactics::CoordinatedTactic;
use crate::battle::morale::MoraleState;
use crate::battle::participant::Participant;
use crate::content::catalog::{Catalog, EnemyTemplate};
use crate::core::error::{BattleError, Result};
use crate::core::types::{ItemId, ParticipantId, Team};

/// Stat growth per level above (or below) the template's level
pub const LEVEL_SCALING_PER_LEVEL: f32 = 0.1;

/// One enemy in an encounter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSlot {
    pub template: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
}

impl EncounterSlot {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            level: None,
            name: None,
        }
    }
}

/// Rewards passed through untouched to the outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rewards {
    pub experience: u32,
    pub gold: u32,
    pub items: Vec<ItemId>,
}

fn fleeable_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: String,
    pub enemies: Vec<EncounterSlot>,
    #[serde(default = "fleeable_default")]
    pub fleeable: bool,
    #[serde(default)]
    pub boss: bool,
    #[serde(default)]
    pub tactics: Vec<CoordinatedTactic>,
    #[serde(default)]
    pub rewards: Rewards,
}

impl Encounter {
    pub fn new(id: impl Into<String>, enemies: Vec<EncounterSlot>) -> Self {
        Self {
            id: id.into(),
            enemies,
            fleeable: true,
            boss: false,
            tactics: Vec::new(),
            rewards: Rewards::default(),
        }
    }

    /// Whether the party may attempt to flee
    pub fn is_escapable(&self, catalog: &Catalog) -> bool {
        self.fleeable
            && !self.boss
            && !self
                .enemies
                .iter()
                .filter_map(|slot| catalog.enemy(&slot.template))
                .any(|template| template.boss)
    }

    /// Instantiate the enemy participants, numbering ids from `first_id`
    pub fn build_enemies(&self, catalog: &Catalog, first_id: u32) -> Result<Vec<Participant>> {
        self.enemies
            .iter()
            .enumerate()
            .map(|(offset, slot)| {
                let template = catalog
                    .enemy(&slot.template)
                    .ok_or_else(|| BattleError::UnknownTemplate(slot.template.clone()))?;
                Ok(spawn_enemy(
                    template,
                    slot,
                    ParticipantId(first_id + offset as u32),
                ))
            })
            .collect()
    }
}

fn spawn_enemy(template: &EnemyTemplate, slot: &EncounterSlot, id: ParticipantId) -> Participant {
    let level = slot.level.unwrap_or(template.level);
    let level_delta = level as f32 - template.level as f32;
    let factor = (1.0 + LEVEL_SCALING_PER_LEVEL * level_delta).max(0.1);
    let stats = if level == template.level {
        template.stats
    } else {
        template.stats.scaled(factor)
    };

    let name = slot.name.clone().unwrap_or_else(|| template.name.clone());
    let mut enemy = Participant::new(id, name, Team::Enemy, stats)
        .with_profile(Arc::new(template.ai.clone()));
    enemy.template = Some(template.id.clone());
    enemy.level = level;
    enemy.morale = MoraleState::with_resistance(template.talk_resistance);
    enemy.boss = template.boss;
    enemy
}
