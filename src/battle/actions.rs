//! Battle commands
//!
//! A command names a concrete target; AI rules carry a target strategy
//! instead and are resolved into one of these before execution.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::battle::memory::MemoryOp;
use crate::battle::morale::TalkTone;
use crate::core::types::{ItemId, ParticipantId, SkillId, Stat};

/// A command for one actor's turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Attack {
        target: ParticipantId,
    },
    Skill {
        skill: SkillId,
        target: ParticipantId,
    },
    Item {
        item: ItemId,
        target: ParticipantId,
    },
    Guard,
    Talk {
        target: ParticipantId,
        #[serde(default)]
        tone: TalkTone,
    },
    Flee,
    Memory {
        op: MemoryOp,
        stat: Stat,
    },
}

/// Action type without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Skill,
    Item,
    Guard,
    Talk,
    Flee,
    Memory,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Attack { .. } => ActionKind::Attack,
            Action::Skill { .. } => ActionKind::Skill,
            Action::Item { .. } => ActionKind::Item,
            Action::Guard => ActionKind::Guard,
            Action::Talk { .. } => ActionKind::Talk,
            Action::Flee => ActionKind::Flee,
            Action::Memory { .. } => ActionKind::Memory,
        }
    }

    /// The participant the action is aimed at, if any
    pub fn target(&self) -> Option<ParticipantId> {
        match self {
            Action::Attack { target }
            | Action::Skill { target, .. }
            | Action::Item { target, .. }
            | Action::Talk { target, .. } => Some(*target),
            Action::Guard | Action::Flee | Action::Memory { .. } => None,
        }
    }

    pub fn skill(&self) -> Option<&str> {
        match self {
            Action::Skill { skill, .. } => Some(skill.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Attack { target } => write!(f, "attack {}", target),
            Action::Skill { skill, target } => write!(f, "skill {} on {}", skill, target),
            Action::Item { item, target } => write!(f, "item {} on {}", item, target),
            Action::Guard => f.write_str("guard"),
            Action::Talk { target, tone } => write!(f, "talk ({:?}) to {}", tone, target),
            Action::Flee => f.write_str("flee"),
            Action::Memory { op, stat } => write!(f, "{} {}", op, stat),
        }
    }
}
