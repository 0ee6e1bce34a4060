//! Turn-based battle engine
//!
//! A battle is a list of participants on two teams, a seeded RNG and an
//! event log. The engine advances one turn at a time: human-controlled
//! actors wait for a command, AI actors decide through the `ai` module.
//!
//! Key properties:
//! - Same seed and same commands produce the same battle
//! - HP and SP never leave `[0, max]`
//! - Every state change is recorded as an event

pub mod actions;
pub mod ai;
pub mod combo;
pub mod damage;
pub mod events;
pub mod execution;
pub mod inventory;
pub mod memory;
pub mod morale;
pub mod outcome;
pub mod participant;
pub mod resolution;
pub mod session;
pub mod status;
pub mod turn_order;

// Re-exports for convenient access
pub use actions::{Action, ActionKind};
pub use combo::ComboTracker;
pub use damage::{compute_damage, DamageRoll};
pub use events::{BattleEvent, BattleEventKind, BattleEventLog, EffectKind, EffectRecord};
pub use execution::{replay, BattleEngine, BattleEngineBuilder, EngineState, TurnReport};
pub use inventory::{BasicInventory, Inventory};
pub use memory::{MemoryOp, MemoryRegister};
pub use morale::{MoraleChange, MoraleStage, MoraleState, TalkTone};
pub use outcome::{
    calculate_score, BattleOutcome, BattleScore, BattleStatistics, OutcomeReport, ScoreWeights,
};
pub use participant::{Participant, Stats};
pub use resolution::{ActionExecutor, ActionResolution, Resolution, ResolutionContext};
pub use session::{BattleSession, BattleSetup, CommandRecord, RecordedCommand};
pub use status::{StatusEffect, StatusEffects, StatusKind, StatusTick};
pub use turn_order::compute_turn_order;
