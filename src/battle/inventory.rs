//! Item stock seam
//!
//! Inventory belongs to the host; the executor only asks how many units an
//! actor can reach and requests consumption of one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{BattleError, Result};
use crate::core::types::{ItemId, ParticipantId, Team};

/// Item stock as seen by the battle
pub trait Inventory: Send {
    /// Units of `item` available to `holder`
    fn count(&self, holder: ParticipantId, team: Team, item: &str) -> u32;

    /// Remove one unit, failing with `ItemUnavailable` when there is none
    fn consume(&mut self, holder: ParticipantId, team: Team, item: &str) -> Result<()>;
}

/// Shared party bag plus per-participant stock
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicInventory {
    /// Reachable by every player-side participant
    pub party: BTreeMap<ItemId, u32>,
    /// Carried by one participant (enemy loot, personal pouches)
    pub personal: BTreeMap<ParticipantId, BTreeMap<ItemId, u32>>,
}

impl BasicInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_party_item(mut self, item: impl Into<ItemId>, count: u32) -> Self {
        self.add_party(item, count);
        self
    }

    pub fn add_party(&mut self, item: impl Into<ItemId>, count: u32) {
        *self.party.entry(item.into()).or_insert(0) += count;
    }

    pub fn add_personal(&mut self, holder: ParticipantId, item: impl Into<ItemId>, count: u32) {
        *self
            .personal
            .entry(holder)
            .or_default()
            .entry(item.into())
            .or_insert(0) += count;
    }

    fn personal_count(&self, holder: ParticipantId, item: &str) -> u32 {
        self.personal
            .get(&holder)
            .and_then(|stock| stock.get(item))
            .copied()
            .unwrap_or(0)
    }
}

impl Inventory for BasicInventory {
    fn count(&self, holder: ParticipantId, team: Team, item: &str) -> u32 {
        let shared = match team {
            Team::Player => self.party.get(item).copied().unwrap_or(0),
            Team::Enemy => 0,
        };
        self.personal_count(holder, item) + shared
    }

    fn consume(&mut self, holder: ParticipantId, team: Team, item: &str) -> Result<()> {
        // personal stock first
        if let Some(count) = self
            .personal
            .get_mut(&holder)
            .and_then(|stock| stock.get_mut(item))
            .filter(|count| **count > 0)
        {
            *count -= 1;
            return Ok(());
        }

        if team == Team::Player {
            if let Some(count) = self.party.get_mut(item).filter(|count| **count > 0) {
                *count -= 1;
                return Ok(());
            }
        }

        Err(BattleError::ItemUnavailable(item.to_string()))
    }
}
