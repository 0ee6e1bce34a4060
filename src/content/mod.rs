//! Content definitions: skills, items, enemy templates and encounters

pub mod catalog;
pub mod encounter;
pub mod loader;
pub mod validate;

pub use catalog::{Catalog, EnemyTemplate, ItemDef, ItemEffect, SkillDef, SkillEffect, TargetRule};
pub use encounter::{Encounter, EncounterSlot, Rewards};
pub use loader::{ContentPack, PartyMemberDef};
pub use validate::{
    validate_catalog, validate_encounter, validate_profile, validate_tactic, ContentDiagnostic,
    DiagnosticKind,
};
