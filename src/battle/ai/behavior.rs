//! Behavior-type weight scaling

use crate::battle::ai::profile::{BehaviorType, RuleAction};
use crate::battle::ai::targeting::TargetStrategy;
use crate::content::catalog::{Catalog, TargetRule};
use crate::core::types::Element;

/// Weight multiplier a behavior type gives an action
///
/// The doubled family is checked before the 1.5x one, so an action that
/// fits both is doubled.
pub fn behavior_multiplier(behavior: BehaviorType, action: &RuleAction, catalog: &Catalog) -> f32 {
    let skill = match action {
        RuleAction::Skill { skill, .. } => catalog.skill(skill),
        _ => None,
    };

    match behavior {
        BehaviorType::Balanced => 1.0,

        BehaviorType::Aggressive => {
            if matches!(action, RuleAction::Attack { .. }) {
                2.0
            } else if skill.is_some_and(|s| s.is_damaging() && s.element.is_offensive()) {
                1.5
            } else {
                1.0
            }
        }

        BehaviorType::Defensive => {
            let self_target = action.target_strategy() == Some(TargetStrategy::Myself)
                || skill.is_some_and(|s| s.target == TargetRule::Myself);
            if matches!(action, RuleAction::Guard) || self_target {
                2.0
            } else if skill.is_some_and(|s| s.element == Element::Holy) {
                1.5
            } else {
                1.0
            }
        }

        BehaviorType::Support => {
            if matches!(action, RuleAction::Item { .. }) || action.targets_allies(catalog) {
                2.0
            } else if skill.is_some_and(|s| s.heals_allies()) {
                1.5
            } else {
                1.0
            }
        }
    }
}
