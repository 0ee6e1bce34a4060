//! Rule evaluation and weighted selection
//!
//! Shared rule definitions are never modified. Each evaluation builds a
//! side table of (rule index, effective weight) and selects from that.

use rand::distributions::{Distribution, WeightedIndex};
use tracing::debug;

use crate::battle::ai::behavior::behavior_multiplier;
use crate::battle::ai::decision_context::DecisionContext;
use crate::battle::ai::learning::CounterStrategy;
use crate::battle::ai::profile::{BehaviorType, Rule, RuleAction};
use crate::content::catalog::Catalog;
use crate::core::types::BattleRng;

/// A rule whose conditions hold, with its weight for this evaluation
#[derive(Debug, Clone, Copy)]
pub struct WeightedRule<'r> {
    pub index: usize,
    pub rule: &'r Rule,
    pub weight: f32,
}

/// Where a chosen action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// Index into the evaluated rule list
    Rule(usize),
    /// The profile's fallback action
    Fallback,
    /// Built-in basic attack
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleChoice {
    pub action: RuleAction,
    pub source: RuleSource,
}

impl RuleChoice {
    /// Profile fallback, or the basic attack when there is none
    pub fn fallback(fallback: Option<&RuleAction>) -> Self {
        match fallback {
            Some(action) => Self {
                action: action.clone(),
                source: RuleSource::Fallback,
            },
            None => Self {
                action: RuleAction::basic_attack(),
                source: RuleSource::Default,
            },
        }
    }
}

/// Everything rule selection needs besides the rules themselves
pub struct SelectionInput<'a> {
    pub behavior: BehaviorType,
    pub fallback: Option<&'a RuleAction>,
    pub catalog: &'a Catalog,
    pub counter: &'a CounterStrategy,
}

/// Capability: choose an action from a rule list
pub trait RuleSelection: Send {
    fn select(
        &self,
        rules: &[Rule],
        ctx: &DecisionContext,
        input: &SelectionInput,
        rng: &mut BattleRng,
    ) -> RuleChoice;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Rules whose conditions all hold, with behavior and counter weights
    pub fn candidates<'r>(
        &self,
        rules: &'r [Rule],
        ctx: &DecisionContext,
        input: &SelectionInput,
    ) -> Vec<WeightedRule<'r>> {
        let mut valid: Vec<WeightedRule<'r>> = rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.conditions.holds(ctx))
            .map(|(index, rule)| WeightedRule {
                index,
                rule,
                weight: effective_weight(rule, input),
            })
            .collect();

        if let Some(priority) = input.counter.priority {
            let prioritized = |w: &WeightedRule| {
                w.weight > 0.0 && w.rule.action.category(input.catalog) == priority
            };
            if valid.iter().any(prioritized) {
                valid.retain(prioritized);
            }
        }

        valid
    }

    /// Weighted pick among candidates; zero-weight rules are never chosen
    pub fn choose(
        &self,
        candidates: &[WeightedRule],
        fallback: Option<&RuleAction>,
        rng: &mut BattleRng,
    ) -> RuleChoice {
        let live: Vec<&WeightedRule> = candidates.iter().filter(|w| w.weight > 0.0).collect();
        if live.is_empty() {
            return RuleChoice::fallback(fallback);
        }

        match WeightedIndex::new(live.iter().map(|w| w.weight)) {
            Ok(distribution) => {
                let chosen = live[distribution.sample(rng)];
                RuleChoice {
                    action: chosen.rule.action.clone(),
                    source: RuleSource::Rule(chosen.index),
                }
            }
            Err(err) => {
                debug!(error = %err, "Rule weights unusable, using fallback");
                RuleChoice::fallback(fallback)
            }
        }
    }
}

fn effective_weight(rule: &Rule, input: &SelectionInput) -> f32 {
    let action = &rule.action;
    let mut weight = rule.weight as f32;
    weight *= behavior_multiplier(input.behavior, action, input.catalog);
    weight *= input.counter.multiplier(action.category(input.catalog));
    if action.targets_allies(input.catalog) {
        weight *= input.counter.ally_target_multiplier;
    }
    weight
}

impl RuleSelection for RuleEvaluator {
    fn select(
        &self,
        rules: &[Rule],
        ctx: &DecisionContext,
        input: &SelectionInput,
        rng: &mut BattleRng,
    ) -> RuleChoice {
        let candidates = self.candidates(rules, ctx, input);
        self.choose(&candidates, input.fallback, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::ai::conditions::{Bounds, ConditionSet};
    use crate::battle::ai::profile::ActionCategory;
    use crate::battle::participant::{Participant, Stats};
    use crate::core::types::{ParticipantId, Team};
    use rand::SeedableRng;

    fn field() -> Vec<Participant> {
        let stats = Stats {
            max_hp: 100,
            ..Stats::default()
        };
        vec![
            Participant::new(ParticipantId(0), "Hero", Team::Player, stats),
            Participant::new(ParticipantId(1), "Imp", Team::Enemy, stats),
        ]
    }

    fn input<'a>(catalog: &'a Catalog, counter: &'a CounterStrategy) -> SelectionInput<'a> {
        SelectionInput {
            behavior: BehaviorType::Balanced,
            fallback: None,
            catalog,
            counter,
        }
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        let all = field();
        let ctx = DecisionContext::new(&all[1], &all, 1);
        let catalog = Catalog::new();
        let counter = CounterStrategy::none();
        let rules = vec![
            Rule::new(RuleAction::basic_attack(), 10),
            Rule::new(RuleAction::Guard, 0),
        ];

        let mut rng = BattleRng::seed_from_u64(11);
        for _ in 0..500 {
            let choice = RuleEvaluator.select(&rules, &ctx, &input(&catalog, &counter), &mut rng);
            assert_eq!(choice.source, RuleSource::Rule(0));
        }
    }

    #[test]
    fn test_equal_weights_converge() {
        let all = field();
        let ctx = DecisionContext::new(&all[1], &all, 1);
        let catalog = Catalog::new();
        let counter = CounterStrategy::none();
        let rules = vec![
            Rule::new(RuleAction::basic_attack(), 5),
            Rule::new(RuleAction::Guard, 5),
        ];

        let mut rng = BattleRng::seed_from_u64(2024);
        let picks = 10_000;
        let firsts = (0..picks)
            .filter(|_| {
                RuleEvaluator.select(&rules, &ctx, &input(&catalog, &counter), &mut rng).source
                    == RuleSource::Rule(0)
            })
            .count();
        let share = firsts as f32 / picks as f32;
        assert!((0.47..=0.53).contains(&share), "share was {}", share);
    }

    #[test]
    fn test_no_valid_rule_uses_fallback_then_default() {
        let all = field();
        let ctx = DecisionContext::new(&all[1], &all, 1);
        let catalog = Catalog::new();
        let counter = CounterStrategy::none();
        let never = ConditionSet {
            hp_percent: Some(Bounds::at_most(10.0)),
            ..ConditionSet::default()
        };
        let rules = vec![Rule::new(RuleAction::Guard, 3).when(never)];

        let mut rng = BattleRng::seed_from_u64(1);
        let fallback = RuleAction::Flee;
        let mut with_fallback = input(&catalog, &counter);
        with_fallback.fallback = Some(&fallback);
        let choice = RuleEvaluator.select(&rules, &ctx, &with_fallback, &mut rng);
        assert_eq!(choice.action, RuleAction::Flee);
        assert_eq!(choice.source, RuleSource::Fallback);

        let choice = RuleEvaluator.select(&rules, &ctx, &input(&catalog, &counter), &mut rng);
        assert_eq!(choice.action, RuleAction::basic_attack());
        assert_eq!(choice.source, RuleSource::Default);
    }

    #[test]
    fn test_all_zero_weights_use_fallback() {
        let all = field();
        let ctx = DecisionContext::new(&all[1], &all, 1);
        let catalog = Catalog::new();
        let counter = CounterStrategy::none();
        let rules = vec![Rule::new(RuleAction::Guard, 0)];
        let mut rng = BattleRng::seed_from_u64(1);
        let choice = RuleEvaluator.select(&rules, &ctx, &input(&catalog, &counter), &mut rng);
        assert_eq!(choice.source, RuleSource::Default);
    }

    #[test]
    fn test_behavior_scaling_does_not_touch_rules() {
        let all = field();
        let ctx = DecisionContext::new(&all[1], &all, 1);
        let catalog = Catalog::new();
        let counter = CounterStrategy::none();
        let rules = vec![
            Rule::new(RuleAction::basic_attack(), 4),
            Rule::new(RuleAction::Guard, 4),
        ];
        let mut aggressive = input(&catalog, &counter);
        aggressive.behavior = BehaviorType::Aggressive;

        let candidates = RuleEvaluator.candidates(&rules, &ctx, &aggressive);
        assert_eq!(candidates[0].weight, 8.0);
        assert_eq!(candidates[1].weight, 4.0);
        assert_eq!(rules[0].weight, 4);
    }

    #[test]
    fn test_counter_priority_filters() {
        let all = field();
        let ctx = DecisionContext::new(&all[1], &all, 1);
        let catalog = Catalog::new();
        let mut counter = CounterStrategy::none();
        counter.priority = Some(ActionCategory::Guard);
        counter.weight_multipliers.insert(ActionCategory::Attack, 0.5);
        let rules = vec![
            Rule::new(RuleAction::basic_attack(), 100),
            Rule::new(RuleAction::Guard, 1),
        ];

        let candidates = RuleEvaluator.candidates(&rules, &ctx, &input(&catalog, &counter));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].index, 1);
    }
}
