//! Battle setup and the state a running battle owns

use serde::{Deserialize, Serialize};

use crate::battle::actions::Action;
use crate::battle::ai::tactics::CoordinatedTactic;
use crate::battle::combo::ComboTracker;
use crate::battle::events::BattleEventLog;
use crate::battle::inventory::BasicInventory;
use crate::battle::outcome::{BattleOutcome, BattleStatistics};
use crate::battle::participant::Participant;
use crate::content::catalog::Catalog;
use crate::content::encounter::{Encounter, Rewards};
use crate::core::error::Result;
use crate::core::types::{BattleId, BattleRng, ParticipantId, Round, Team};

/// Everything needed to start a battle
#[derive(Debug, Clone)]
pub struct BattleSetup {
    pub party: Vec<Participant>,
    pub enemies: Vec<Participant>,
    pub escapable: bool,
    pub tactics: Vec<CoordinatedTactic>,
    pub rewards: Rewards,
    pub inventory: BasicInventory,
}

impl BattleSetup {
    /// Ids are reassigned so that each participant's id is its index:
    /// the party first, then the enemies.
    pub fn new(party: Vec<Participant>, enemies: Vec<Participant>) -> Self {
        let mut setup = Self {
            party,
            enemies,
            escapable: true,
            tactics: Vec::new(),
            rewards: Rewards::default(),
            inventory: BasicInventory::new(),
        };
        setup.renumber();
        setup
    }

    /// Build the enemy side from an encounter descriptor
    pub fn from_encounter(
        encounter: &Encounter,
        catalog: &Catalog,
        party: Vec<Participant>,
    ) -> Result<Self> {
        let enemies = encounter.build_enemies(catalog, party.len() as u32)?;
        let mut setup = Self::new(party, enemies);
        setup.escapable = encounter.is_escapable(catalog);
        setup.tactics = encounter.tactics.clone();
        setup.rewards = encounter.rewards.clone();

        for enemy in &setup.enemies {
            let Some(template) = enemy.template.as_deref().and_then(|id| catalog.enemy(id)) else {
                continue;
            };
            for (item, count) in &template.items {
                setup.inventory.add_personal(enemy.id, item.clone(), *count);
            }
        }
        Ok(setup)
    }

    /// Replace the whole inventory
    pub fn with_inventory(mut self, inventory: BasicInventory) -> Self {
        self.inventory = inventory;
        self
    }

    pub fn with_tactics(mut self, tactics: Vec<CoordinatedTactic>) -> Self {
        self.tactics = tactics;
        self
    }

    pub fn unescapable(mut self) -> Self {
        self.escapable = false;
        self
    }

    fn renumber(&mut self) {
        for (index, member) in self.party.iter_mut().enumerate() {
            member.id = ParticipantId(index as u32);
            member.team = Team::Player;
        }
        let offset = self.party.len() as u32;
        for (index, enemy) in self.enemies.iter_mut().enumerate() {
            enemy.id = ParticipantId(offset + index as u32);
            enemy.team = Team::Enemy;
        }
    }

    /// All participants in id order
    pub fn into_participants(self) -> Vec<Participant> {
        let mut all = self.party;
        all.extend(self.enemies);
        all
    }
}

/// One resolved command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedCommand {
    pub actor: ParticipantId,
    pub action: Action,
    /// Submitted by the host rather than decided by the AI
    pub human: bool,
}

/// Seed plus every resolved command, enough to replay a battle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub battle_id: BattleId,
    pub seed: u64,
    pub entries: Vec<RecordedCommand>,
}

impl CommandRecord {
    pub fn new(battle_id: BattleId, seed: u64) -> Self {
        Self {
            battle_id,
            seed,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, actor: ParticipantId, action: Action, human: bool) {
        self.entries.push(RecordedCommand {
            actor,
            action,
            human,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Mutable state of one battle, owned by its engine
#[derive(Debug, Clone)]
pub struct BattleSession {
    pub battle_id: BattleId,
    pub seed: u64,
    pub participants: Vec<Participant>,
    pub round: Round,
    /// Turn order for the current round
    pub order: Vec<ParticipantId>,
    /// Next slot of `order` to take a turn
    pub cursor: usize,
    pub combo: ComboTracker,
    pub outcome: BattleOutcome,
    pub escapable: bool,
    pub tactics: Vec<CoordinatedTactic>,
    pub rewards: Rewards,
    pub log: BattleEventLog,
    pub statistics: BattleStatistics,
    pub record: CommandRecord,
    pub rng: BattleRng,
}

impl BattleSession {
    pub fn new(
        setup: BattleSetup,
        battle_id: BattleId,
        seed: u64,
        rng: BattleRng,
    ) -> (Self, BasicInventory) {
        let escapable = setup.escapable;
        let tactics = setup.tactics.clone();
        let rewards = setup.rewards.clone();
        let inventory = setup.inventory.clone();
        let session = Self {
            battle_id,
            seed,
            participants: setup.into_participants(),
            round: 0,
            order: Vec::new(),
            cursor: 0,
            combo: ComboTracker::new(),
            outcome: BattleOutcome::Ongoing,
            escapable,
            tactics,
            rewards,
            log: BattleEventLog::new(),
            statistics: BattleStatistics::default(),
            record: CommandRecord::new(battle_id, seed),
            rng,
        };
        (session, inventory)
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(id.0 as usize).filter(|p| p.id == id)
    }

    pub fn team_active(&self, team: Team) -> bool {
        self.participants
            .iter()
            .any(|p| p.team == team && p.is_active())
    }

    /// Share of a team's total max HP still standing
    pub fn hp_fraction(&self, team: Team) -> f32 {
        let (current, max) = self
            .participants
            .iter()
            .filter(|p| p.team == team)
            .fold((0i64, 0i64), |(current, max), p| {
                let standing = if p.is_present() { p.hp() as i64 } else { 0 };
                (current + standing, max + p.stats.max_hp as i64)
            });
        if max == 0 {
            0.0
        } else {
            current as f32 / max as f32
        }
    }
}
