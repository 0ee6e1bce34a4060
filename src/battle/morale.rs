//! Morale and mercy system
//!
//! Talking to an enemy moves it along a fixed ladder of morale stages,
//! independent of its HP. Reaching `Spared` removes it from the battle
//! without counting as a kill.

use serde::{Deserialize, Serialize};

/// Morale ladder, from fighting to spared
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MoraleStage {
    #[default]
    Hostile,
    Wary,
    Hesitant,
    Friendly,
    Spared,
}

impl MoraleStage {
    /// Position on the ladder (0 = hostile), used by morale conditions
    pub fn index(self) -> u32 {
        match self {
            MoraleStage::Hostile => 0,
            MoraleStage::Wary => 1,
            MoraleStage::Hesitant => 2,
            MoraleStage::Friendly => 3,
            MoraleStage::Spared => 4,
        }
    }

    pub fn next(self) -> MoraleStage {
        match self {
            MoraleStage::Hostile => MoraleStage::Wary,
            MoraleStage::Wary => MoraleStage::Hesitant,
            MoraleStage::Hesitant => MoraleStage::Friendly,
            MoraleStage::Friendly | MoraleStage::Spared => MoraleStage::Spared,
        }
    }

    pub fn previous(self) -> MoraleStage {
        match self {
            MoraleStage::Hostile | MoraleStage::Wary => MoraleStage::Hostile,
            MoraleStage::Hesitant => MoraleStage::Wary,
            MoraleStage::Friendly => MoraleStage::Hesitant,
            // Spared is terminal
            MoraleStage::Spared => MoraleStage::Spared,
        }
    }
}

/// How the actor talks to the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TalkTone {
    /// Moves the target toward sparing
    #[default]
    Persuade,
    /// Pushes the target back toward hostility
    Provoke,
}

/// Per-participant morale counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoraleState {
    pub stage: MoraleStage,
    /// Persuasion points accumulated toward the next stage
    pub progress: u32,
    /// Points needed per stage (talk resistance)
    pub per_stage: u32,
}

impl Default for MoraleState {
    fn default() -> Self {
        Self::with_resistance(1)
    }
}

/// Result of one talk action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoraleChange {
    pub from: MoraleStage,
    pub to: MoraleStage,
    pub progress: u32,
}

impl MoraleChange {
    pub fn spared(&self) -> bool {
        self.to == MoraleStage::Spared && self.from != MoraleStage::Spared
    }
}

impl MoraleState {
    pub fn with_resistance(per_stage: u32) -> Self {
        Self {
            stage: MoraleStage::Hostile,
            progress: 0,
            per_stage: per_stage.max(1),
        }
    }

    pub fn is_spared(&self) -> bool {
        self.stage == MoraleStage::Spared
    }

    /// Apply a talk action
    pub fn talk(&mut self, tone: TalkTone) -> MoraleChange {
        let from = self.stage;

        match tone {
            TalkTone::Persuade if !self.is_spared() => {
                self.progress += 1;
                if self.progress >= self.per_stage {
                    self.progress = 0;
                    self.stage = self.stage.next();
                }
            }
            TalkTone::Provoke => {
                self.progress = 0;
                self.stage = self.stage.previous();
            }
            TalkTone::Persuade => {}
        }

        MoraleChange {
            from,
            to: self.stage,
            progress: self.progress,
        }
    }
}
