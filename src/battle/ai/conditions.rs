//! Rule conditions
//!
//! Every condition key is optional; a missing key places no constraint on
//! that dimension. Unknown keys and unknown status names are rejected when
//! content is parsed, not during a battle.

use serde::{Deserialize, Serialize};

use crate::battle::ai::decision_context::DecisionContext;
use crate::battle::participant::Participant;
use crate::battle::status::StatusKind;

/// Inclusive numeric bounds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Bounds {
    pub min: Option<f32>,
    pub max: Option<f32>,
}

impl Bounds {
    pub fn at_least(min: f32) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn at_most(max: f32) -> Self {
        Self {
            min: None,
            max: Some(max),
        }
    }

    pub fn between(min: f32, max: f32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f32) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// `has_X` / `no_X` token for the flat self-status form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StatusToken {
    pub kind: StatusKind,
    pub present: bool,
}

impl TryFrom<String> for StatusToken {
    type Error = String;

    fn try_from(token: String) -> Result<Self, Self::Error> {
        let (present, name) = if let Some(name) = token.strip_prefix("has_") {
            (true, name)
        } else if let Some(name) = token.strip_prefix("no_") {
            (false, name)
        } else {
            return Err(format!(
                "status token '{}' must start with has_ or no_",
                token
            ));
        };
        Ok(Self {
            kind: name.parse()?,
            present,
        })
    }
}

impl From<StatusToken> for String {
    fn from(token: StatusToken) -> Self {
        let prefix = if token.present { "has_" } else { "no_" };
        format!("{}{}", prefix, token.kind.name())
    }
}

/// Structured status condition over a group of participants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusSet {
    /// All must be present together on at least one participant
    pub has: Vec<StatusKind>,
    /// At least one must be present on at least one participant
    pub any: Vec<StatusKind>,
    /// None may be present on any participant
    #[serde(alias = "not")]
    pub none: Vec<StatusKind>,
}

impl StatusSet {
    pub fn has(kinds: &[StatusKind]) -> Self {
        Self {
            has: kinds.to_vec(),
            ..Self::default()
        }
    }

    pub fn none(kinds: &[StatusKind]) -> Self {
        Self {
            none: kinds.to_vec(),
            ..Self::default()
        }
    }

    pub fn holds(&self, group: &[&Participant]) -> bool {
        if !self.has.is_empty()
            && !group
                .iter()
                .any(|p| self.has.iter().all(|kind| p.statuses.has(*kind)))
        {
            return false;
        }

        if !self.any.is_empty()
            && !group
                .iter()
                .any(|p| self.any.iter().any(|kind| p.statuses.has(*kind)))
        {
            return false;
        }

        if group
            .iter()
            .any(|p| self.none.iter().any(|kind| p.statuses.has(*kind)))
        {
            return false;
        }

        true
    }
}

/// Self-status condition in either accepted shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelfStatus {
    Tokens(Vec<StatusToken>),
    Set(StatusSet),
}

impl SelfStatus {
    pub fn holds(&self, actor: &Participant) -> bool {
        match self {
            SelfStatus::Tokens(tokens) => tokens
                .iter()
                .all(|token| actor.statuses.has(token.kind) == token.present),
            SelfStatus::Set(set) => set.holds(&[actor]),
        }
    }
}

/// Conditions a rule requires; all present keys must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConditionSet {
    pub hp_percent: Option<Bounds>,
    pub sp_percent: Option<Bounds>,
    /// Round number bounds
    pub turn: Option<Bounds>,
    /// Only every N-th round
    pub turn_every: Option<u32>,
    /// Own morale stage index (0 = hostile .. 4 = spared)
    pub morale: Option<Bounds>,
    /// Living teammates, not counting the actor
    pub ally_count: Option<Bounds>,
    pub enemy_count: Option<Bounds>,
    pub status: Option<SelfStatus>,
    pub ally_status: Option<StatusSet>,
    pub enemy_status: Option<StatusSet>,
}

impl ConditionSet {
    /// No constraints at all
    pub fn always() -> Self {
        Self::default()
    }

    pub fn is_unconditional(&self) -> bool {
        *self == Self::default()
    }

    /// Evaluate every present condition against the context
    pub fn holds(&self, ctx: &DecisionContext) -> bool {
        let actor = ctx.actor;

        if let Some(bounds) = &self.hp_percent {
            if !bounds.contains(actor.hp_percent()) {
                return false;
            }
        }

        if let Some(bounds) = &self.sp_percent {
            if !bounds.contains(actor.sp_percent()) {
                return false;
            }
        }

        if let Some(bounds) = &self.turn {
            if !bounds.contains(ctx.round as f32) {
                return false;
            }
        }

        if let Some(every) = self.turn_every {
            if every > 0 && ctx.round % every != 0 {
                return false;
            }
        }

        if let Some(bounds) = &self.morale {
            if !bounds.contains(actor.morale.stage.index() as f32) {
                return false;
            }
        }

        if let Some(bounds) = &self.ally_count {
            if !bounds.contains(ctx.ally_count() as f32) {
                return false;
            }
        }

        if let Some(bounds) = &self.enemy_count {
            if !bounds.contains(ctx.enemy_count() as f32) {
                return false;
            }
        }

        if let Some(status) = &self.status {
            if !status.holds(actor) {
                return false;
            }
        }

        if let Some(set) = &self.ally_status {
            if !set.holds(&ctx.allies) {
                return false;
            }
        }

        if let Some(set) = &self.enemy_status {
            if !set.holds(&ctx.enemies) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::participant::Stats;
    use crate::core::types::{ParticipantId, Team};

    fn field() -> Vec<Participant> {
        let stats = Stats {
            max_hp: 100,
            max_sp: 10,
            ..Stats::default()
        };
        vec![
            Participant::new(ParticipantId(0), "Hero", Team::Player, stats),
            Participant::new(ParticipantId(1), "Mage", Team::Player, stats),
            Participant::new(ParticipantId(2), "Boss", Team::Enemy, stats).with_hp(40),
        ]
    }

    #[test]
    fn test_empty_conditions_always_hold() {
        let all = field();
        let ctx = DecisionContext::new(&all[2], &all, 1);
        assert!(ConditionSet::always().holds(&ctx));
        assert!(ConditionSet::always().is_unconditional());
    }

    #[test]
    fn test_hp_bounds() {
        let all = field();
        let ctx = DecisionContext::new(&all[2], &all, 1);
        let low = ConditionSet {
            hp_percent: Some(Bounds::at_most(50.0)),
            ..ConditionSet::default()
        };
        let high = ConditionSet {
            hp_percent: Some(Bounds::at_least(50.0)),
            ..ConditionSet::default()
        };
        assert!(low.holds(&ctx));
        assert!(!high.holds(&ctx));
    }

    #[test]
    fn test_turn_every() {
        let all = field();
        let cond = ConditionSet {
            turn_every: Some(3),
            ..ConditionSet::default()
        };
        assert!(!cond.holds(&DecisionContext::new(&all[2], &all, 2)));
        assert!(cond.holds(&DecisionContext::new(&all[2], &all, 3)));
    }

    #[test]
    fn test_enemy_count() {
        let all = field();
        let ctx = DecisionContext::new(&all[2], &all, 1);
        let cond = ConditionSet {
            enemy_count: Some(Bounds::at_least(2.0)),
            ally_count: Some(Bounds::at_most(0.0)),
            ..ConditionSet::default()
        };
        assert!(cond.holds(&ctx));
    }

    #[test]
    fn test_self_status_round_trip() {
        let mut all = field();
        let cond = ConditionSet {
            status: Some(SelfStatus::Set(StatusSet::has(&[StatusKind::Poison]))),
            ..ConditionSet::default()
        };

        all[2].statuses.apply(StatusKind::Poison, 1, 0, 5);
        assert!(cond.holds(&DecisionContext::new(&all[2], &all, 1)));

        all[2].statuses.tick(100);
        assert!(!cond.holds(&DecisionContext::new(&all[2], &all, 2)));
    }

    #[test]
    fn test_flat_tokens() {
        let mut all = field();
        all[2].statuses.apply(StatusKind::Burn, 2, 0, 5);
        let cond: ConditionSet = toml::from_str("status = [\"has_burn\", \"no_stun\"]").unwrap();
        assert!(cond.holds(&DecisionContext::new(&all[2], &all, 1)));

        all[2].statuses.apply(StatusKind::Stun, 1, 0, 5);
        assert!(!cond.holds(&DecisionContext::new(&all[2], &all, 1)));
    }

    #[test]
    fn test_bad_token_rejected() {
        let result: Result<ConditionSet, _> = toml::from_str("status = [\"maybe_poison\"]");
        assert!(result.is_err());
        let result: Result<ConditionSet, _> = toml::from_str("status = [\"has_doom\"]");
        assert!(result.is_err());
    }

    #[test]
    fn test_enemy_status_has_requires_same_target() {
        let mut all = field();
        all[0].statuses.apply(StatusKind::Poison, 3, 0, 5);
        all[1].statuses.apply(StatusKind::Stun, 3, 0, 5);

        let split = ConditionSet {
            enemy_status: Some(StatusSet::has(&[StatusKind::Poison, StatusKind::Stun])),
            ..ConditionSet::default()
        };
        assert!(!split.holds(&DecisionContext::new(&all[2], &all, 1)));

        all[0].statuses.apply(StatusKind::Stun, 3, 0, 5);
        assert!(split.holds(&DecisionContext::new(&all[2], &all, 1)));
    }

    #[test]
    fn test_enemy_status_any_and_none() {
        let mut all = field();
        all[1].statuses.apply(StatusKind::Silence, 3, 0, 5);

        let any: ConditionSet =
            toml::from_str("enemy_status = { any = [\"poison\", \"silence\"] }").unwrap();
        assert!(any.holds(&DecisionContext::new(&all[2], &all, 1)));

        let none: ConditionSet = toml::from_str("enemy_status = { not = [\"silence\"] }").unwrap();
        assert!(!none.holds(&DecisionContext::new(&all[2], &all, 1)));
    }

    #[test]
    fn test_token_serializes_back() {
        let token = StatusToken {
            kind: StatusKind::Regen,
            present: false,
        };
        assert_eq!(String::from(token), "no_regen");
    }
}
