pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{BattleError, Result};
pub use types::{
    BattleId, BattleRng, Controller, Element, ItemId, ParticipantId, Round, SkillId, Stat, Team,
};
