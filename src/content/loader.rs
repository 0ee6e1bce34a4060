//! TOML content packs
//!
//! One file may carry skills, items, enemy templates, encounters and the
//! party roster:
//!
//! ```toml
//! [[skills]]
//! id = "fireball"
//! name = "Fireball"
//! sp_cost = 6
//! element = "fire"
//! effect = { type = "damage", power = 12 }
//!
//! [[enemies]]
//! id = "slime"
//! name = "Slime"
//! stats = { max_hp = 30, attack = 6 }
//!
//! [[encounters]]
//! id = "meadow"
//! enemies = [{ template = "slime" }]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::battle::ai::profile::AiProfile;
use crate::battle::inventory::BasicInventory;
use crate::battle::participant::{Participant, Stats};
use crate::content::catalog::{Catalog, EnemyTemplate, ItemDef, SkillDef};
use crate::content::encounter::Encounter;
use crate::content::validate::{validate_catalog, validate_encounter, ContentDiagnostic};
use crate::core::error::{BattleError, Result};
use crate::core::types::{Controller, ItemId, ParticipantId, Team};

/// A party member as written in content files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMemberDef {
    pub name: String,
    pub stats: Stats,
    #[serde(default = "default_level")]
    pub level: u32,
    /// When present the member is AI-controlled with this profile
    #[serde(default)]
    pub ai: Option<AiProfile>,
}

fn default_level() -> u32 {
    1
}

impl PartyMemberDef {
    pub fn to_participant(&self, id: ParticipantId) -> Participant {
        let mut member = Participant::new(id, self.name.clone(), Team::Player, self.stats);
        member.level = self.level;
        if let Some(profile) = &self.ai {
            member = member
                .with_profile(Arc::new(profile.clone()))
                .with_controller(Controller::Ai);
        }
        member
    }
}

/// Everything one content file defines
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPack {
    pub skills: Vec<SkillDef>,
    pub items: Vec<ItemDef>,
    pub enemies: Vec<EnemyTemplate>,
    pub encounters: Vec<Encounter>,
    pub party: Vec<PartyMemberDef>,
    /// Shared party bag at battle start
    pub party_items: BTreeMap<ItemId, u32>,
}

impl ContentPack {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let pack: ContentPack = toml::from_str(contents)?;
        debug!(
            skills = pack.skills.len(),
            items = pack.items.len(),
            enemies = pack.enemies.len(),
            encounters = pack.encounters.len(),
            "Parsed content pack"
        );
        Ok(pack)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let pack = Self::from_toml_str(&contents)?;
        info!(path = %path.display(), "Loaded content pack");
        Ok(pack)
    }

    /// Build the read-only catalog from the pack's definitions
    pub fn catalog(&self) -> Catalog {
        let mut catalog = Catalog::new();
        for skill in &self.skills {
            catalog.insert_skill(skill.clone());
        }
        for item in &self.items {
            catalog.insert_item(item.clone());
        }
        for enemy in &self.enemies {
            catalog.insert_enemy(enemy.clone());
        }
        catalog
    }

    pub fn encounter(&self, id: &str) -> Result<&Encounter> {
        self.encounters
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| BattleError::UnknownTemplate(format!("encounter '{}'", id)))
    }

    /// Party participants, numbered from 0
    pub fn party_members(&self) -> Vec<Participant> {
        self.party
            .iter()
            .enumerate()
            .map(|(index, def)| def.to_participant(ParticipantId(index as u32)))
            .collect()
    }

    pub fn party_inventory(&self) -> BasicInventory {
        BasicInventory {
            party: self.party_items.clone(),
            ..BasicInventory::default()
        }
    }

    /// Every finding for the pack's templates and encounters
    pub fn validate(&self, is_registered: &dyn Fn(&str) -> bool) -> Vec<ContentDiagnostic> {
        let catalog = self.catalog();
        let mut found = validate_catalog(&catalog, is_registered);
        for encounter in &self.encounters {
            found.extend(validate_encounter(encounter, &catalog));
        }
        found
    }
}
