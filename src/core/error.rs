use thiserror::Error;

use crate::core::types::{ItemId, ParticipantId, SkillId};

#[derive(Error, Debug)]
pub enum BattleError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Insufficient SP: needs {needed}, has {available}")]
    InsufficientResource { needed: i32, available: i32 },

    #[error("Item unavailable: {0}")]
    ItemUnavailable(ItemId),

    #[error("Cannot flee: {0}")]
    FleeDisallowed(String),

    #[error("Participant not found: {0}")]
    UnknownParticipant(ParticipantId),

    #[error("Unknown skill: {0}")]
    UnknownSkill(SkillId),

    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Unknown enemy template: {0}")]
    UnknownTemplate(String),

    #[error("Invalid AI profile: {0}")]
    InvalidProfile(String),

    #[error("Unregistered phase hook '{hook}' in phase '{phase}'")]
    UnregisteredPhase { phase: String, hook: String },

    #[error("Battle is already over")]
    BattleOver,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BattleError {
    /// Errors caused by a single rejected command (the actor keeps its turn)
    pub fn is_command_error(&self) -> bool {
        matches!(
            self,
            BattleError::InvalidCommand(_)
                | BattleError::InsufficientResource { .. }
                | BattleError::ItemUnavailable(_)
                | BattleError::FleeDisallowed(_)
                | BattleError::UnknownParticipant(_)
                | BattleError::UnknownSkill(_)
                | BattleError::UnknownItem(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BattleError>;
