//! Battle Core - deterministic turn-based combat with adversary AI
//!
//! - `core`: shared ids, configuration and errors
//! - `content`: catalogs and encounters loaded from TOML
//! - `battle`: the engine, action resolution and the AI

pub mod battle;
pub mod content;
pub mod core;
