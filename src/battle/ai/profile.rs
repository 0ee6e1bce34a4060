//! AI profile data loaded from content files
//!
//! A profile is either a flat rule list or a list of HP-gated phases, plus a
//! fallback action and a behavior type that biases rule weights.

use serde::{Deserialize, Serialize};

use crate::battle::ai::conditions::ConditionSet;
use crate::battle::ai::targeting::TargetStrategy;
use crate::battle::memory::MemoryOp;
use crate::content::catalog::{Catalog, SkillEffect, TargetRule};
use crate::core::types::{ItemId, SkillId, Stat};

/// Coarse bias applied to rule weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviorType {
    Aggressive,
    Defensive,
    Support,
    #[default]
    Balanced,
}

/// What a rule does, with a target-selection strategy instead of a target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    Attack {
        #[serde(default)]
        target: TargetStrategy,
    },
    Skill {
        skill: SkillId,
        #[serde(default)]
        target: TargetStrategy,
    },
    Item {
        item: ItemId,
        #[serde(default = "TargetStrategy::ally_default")]
        target: TargetStrategy,
    },
    Guard,
    Flee,
    Memory {
        op: MemoryOp,
        stat: Stat,
    },
}

impl RuleAction {
    /// Plain attack on a random living opponent (the last-resort default)
    pub fn basic_attack() -> Self {
        RuleAction::Attack {
            target: TargetStrategy::RandomEnemy,
        }
    }

    pub fn target_strategy(&self) -> Option<TargetStrategy> {
        match self {
            RuleAction::Attack { target }
            | RuleAction::Skill { target, .. }
            | RuleAction::Item { target, .. } => Some(*target),
            RuleAction::Guard | RuleAction::Flee | RuleAction::Memory { .. } => None,
        }
    }

    /// Classify the action for behavior weighting and counter-strategies
    pub fn category(&self, catalog: &Catalog) -> ActionCategory {
        match self {
            RuleAction::Attack { .. } => ActionCategory::Attack,
            RuleAction::Skill { skill, .. } => catalog
                .skill(skill)
                .map(|def| ActionCategory::for_skill(&def.effect))
                .unwrap_or(ActionCategory::DamageSkill),
            RuleAction::Item { .. } => ActionCategory::Item,
            RuleAction::Guard => ActionCategory::Guard,
            RuleAction::Flee => ActionCategory::Flee,
            RuleAction::Memory { .. } => ActionCategory::Memory,
        }
    }

    /// Does the action aim at the actor's own side?
    pub fn targets_allies(&self, catalog: &Catalog) -> bool {
        if let Some(strategy) = self.target_strategy() {
            if strategy.is_ally_side() {
                return true;
            }
        }
        match self {
            RuleAction::Skill { skill, .. } => catalog
                .skill(skill)
                .map(|def| matches!(def.target, TargetRule::Ally | TargetRule::DownedAlly))
                .unwrap_or(false),
            _ => false,
        }
    }
}

/// Broad action families
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Attack,
    DamageSkill,
    HealSkill,
    StatusSkill,
    BuffSkill,
    Item,
    Guard,
    Flee,
    Memory,
}

impl ActionCategory {
    pub fn for_skill(effect: &SkillEffect) -> Self {
        match effect {
            SkillEffect::Damage { .. } => ActionCategory::DamageSkill,
            SkillEffect::Heal { .. } | SkillEffect::Cleanse => ActionCategory::HealSkill,
            SkillEffect::Status { .. } => ActionCategory::StatusSkill,
            SkillEffect::Buff { .. } => ActionCategory::BuffSkill,
        }
    }
}

fn default_weight() -> u32 {
    1
}

/// One AI rule: all conditions must hold for the rule to be a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub conditions: ConditionSet,
    pub action: RuleAction,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Rule {
    pub fn new(action: RuleAction, weight: u32) -> Self {
        Self {
            name: None,
            conditions: ConditionSet::default(),
            action,
            weight,
        }
    }

    pub fn when(mut self, conditions: ConditionSet) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{:?}", self.action))
    }
}

/// HP-gated rule set for multi-stage adversaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    /// Minimum HP percentage at which this phase is active
    pub threshold: f32,
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Phase hook run when the adversary enters this phase
    #[serde(default)]
    pub on_enter: Option<String>,
}

impl Phase {
    pub fn new(name: impl Into<String>, threshold: f32, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            threshold,
            rules,
            on_enter: None,
        }
    }
}

/// Complete AI profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiProfile {
    pub behavior: BehaviorType,
    pub rules: Vec<Rule>,
    pub phases: Vec<Phase>,
    pub fallback: Option<RuleAction>,
}

impl AiProfile {
    pub fn flat(rules: Vec<Rule>, fallback: Option<RuleAction>) -> Self {
        Self {
            behavior: BehaviorType::Balanced,
            rules,
            phases: Vec::new(),
            fallback,
        }
    }

    pub fn phased(phases: Vec<Phase>, fallback: Option<RuleAction>) -> Self {
        Self {
            behavior: BehaviorType::Balanced,
            rules: Vec::new(),
            phases,
            fallback,
        }
    }

    pub fn with_behavior(mut self, behavior: BehaviorType) -> Self {
        self.behavior = behavior;
        self
    }

    pub fn is_phased(&self) -> bool {
        !self.phases.is_empty()
    }

    /// Phase used as the catch-all floor: threshold 0 if present,
    /// otherwise the lowest threshold.
    pub fn floor_phase(&self) -> Option<&Phase> {
        self.phases
            .iter()
            .find(|p| p.threshold <= 0.0)
            .or_else(|| {
                self.phases
                    .iter()
                    .min_by(|a, b| a.threshold.total_cmp(&b.threshold))
            })
    }

    pub fn has_explicit_floor(&self) -> bool {
        self.phases.iter().any(|p| p.threshold <= 0.0)
    }

    /// Every rule in the profile, flat and phased
    pub fn all_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules
            .iter()
            .chain(self.phases.iter().flat_map(|p| p.rules.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_action_from_toml() {
        let rule: Rule = toml::from_str(
            r#"
            weight = 5
            action = { type = "skill", skill = "fireball", target = "weakest_enemy" }
            "#,
        )
        .unwrap();
        assert_eq!(rule.weight, 5);
        assert_eq!(
            rule.action,
            RuleAction::Skill {
                skill: "fireball".into(),
                target: TargetStrategy::WeakestEnemy
            }
        );
    }

    #[test]
    fn test_default_weight_and_target() {
        let rule: Rule = toml::from_str("action = { type = \"attack\" }").unwrap();
        assert_eq!(rule.weight, 1);
        assert_eq!(rule.action, RuleAction::basic_attack());
    }

    #[test]
    fn test_item_defaults_to_ally_target() {
        let action: RuleAction = toml::from_str("type = \"item\"\nitem = \"potion\"").unwrap();
        assert_eq!(action.target_strategy(), Some(TargetStrategy::WeakestAlly));
    }

    #[test]
    fn test_floor_phase_prefers_zero_threshold() {
        let profile = AiProfile::phased(
            vec![
                Phase::new("calm", 70.0, vec![]),
                Phase::new("last", 0.0, vec![]),
                Phase::new("angry", 25.0, vec![]),
            ],
            None,
        );
        assert_eq!(profile.floor_phase().unwrap().name, "last");
        assert!(profile.has_explicit_floor());
    }

    #[test]
    fn test_floor_phase_falls_back_to_lowest() {
        let profile = AiProfile::phased(
            vec![
                Phase::new("calm", 70.0, vec![]),
                Phase::new("angry", 25.0, vec![]),
            ],
            None,
        );
        assert_eq!(profile.floor_phase().unwrap().name, "angry");
        assert!(!profile.has_explicit_floor());
    }

    #[test]
    fn test_unknown_condition_key_rejected() {
        let result: Result<Rule, _> = toml::from_str(
            r#"
            action = { type = "guard" }
            conditions = { hp_precent = { max = 50.0 } }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_action_type_rejected() {
        let result: Result<Rule, _> = toml::from_str("action = { type = \"dance\" }");
        assert!(result.is_err());
    }
}
