//! Per-turn AI decision pipeline
//!
//! tactic assignment → phase (or flat) rules → weighted rule pick →
//! concrete target → validation. Anything that fails validation degrades
//! to the profile fallback, then a basic attack, then guarding.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::battle::actions::Action;
use crate::battle::ai::decision_context::DecisionContext;
use crate::battle::ai::learning::CounterStrategy;
use crate::battle::ai::phases::{PhaseSelection, PhaseTransition};
use crate::battle::ai::profile::{AiProfile, RuleAction};
use crate::battle::ai::rules::{RuleChoice, RuleSelection, RuleSource, SelectionInput};
use crate::battle::ai::tactics::{TacticAssignment, TacticRole};
use crate::battle::ai::targeting::{select_target, TargetStrategy};
use crate::battle::participant::Participant;
use crate::battle::resolution::{index_of, ActionResolution, ResolutionContext};
use crate::content::catalog::{Catalog, ItemEffect, TargetRule};
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleRng, ParticipantId, Round};

/// Where the decided action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionSource {
    Tactic(TacticRole),
    Rule(RuleSource),
    /// Nothing else was valid; the actor guards
    LastResort,
}

/// The action an AI-controlled actor will take this turn
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub action: Action,
    /// Tactic bonus for the action's damage
    pub damage_multiplier: f32,
    pub source: DecisionSource,
    pub transition: Option<PhaseTransition>,
    /// Content defects met while deciding
    pub diagnostics: Vec<String>,
}

/// What the engine knows about the actor's situation
pub struct DecisionRequest<'a> {
    pub actor: ParticipantId,
    pub participants: &'a [Participant],
    pub round: Round,
    pub counter: &'a CounterStrategy,
    pub assignment: Option<&'a TacticAssignment>,
    pub strict: bool,
}

/// Capabilities the pipeline runs through
pub struct DecisionComponents<'a> {
    pub phases: &'a mut dyn PhaseSelection,
    pub rules: &'a dyn RuleSelection,
    pub executor: &'a dyn ActionResolution,
}

/// Decide an AI action for `request.actor`
pub fn decide(
    request: &DecisionRequest,
    components: DecisionComponents,
    ctx: &ResolutionContext,
    rng: &mut BattleRng,
) -> Result<Decision> {
    let participants = request.participants;
    let actor = &participants[index_of(participants, request.actor)?];
    let profile: Arc<AiProfile> = actor.profile.clone().unwrap_or_default();

    // phase tracking runs even for tactic members so transitions are announced
    let choice = components.phases.select(actor, &profile, request.strict)?;
    let mut diagnostics = choice.diagnostics;
    let transition = choice.transition;

    if let Some(assignment) = request.assignment {
        let resolved = resolve_action(
            &assignment.action,
            actor,
            participants,
            ctx.catalog,
            assignment.target,
            request.counter.protect,
            rng,
        );
        let checked = resolved.map(|action| {
            let valid = components.executor.validate(actor.id, &action, participants, ctx);
            (action, valid)
        });
        match checked {
            Some((action, Ok(()))) => {
                debug!(actor = %actor.id, tactic = %assignment.tactic, role = ?assignment.role, "Tactic action");
                return Ok(Decision {
                    action,
                    damage_multiplier: assignment.damage_multiplier,
                    source: DecisionSource::Tactic(assignment.role),
                    transition,
                    diagnostics,
                });
            }
            Some((_, Err(err @ (BattleError::UnknownSkill(_) | BattleError::UnknownItem(_))))) => {
                warn!(actor = %actor.id, tactic = %assignment.tactic, error = %err, "Tactic references missing content");
                let message = format!("tactic '{}' ({}): {}", assignment.tactic, actor.name, err);
                if request.strict {
                    return Err(BattleError::InvalidProfile(message));
                }
                diagnostics.push(message);
            }
            _ => debug!(actor = %actor.id, tactic = %assignment.tactic, "Tactic action unusable, deciding normally"),
        }
    }

    let ctx_view = DecisionContext::new(actor, participants, request.round);
    let input = SelectionInput {
        behavior: profile.behavior,
        fallback: profile.fallback.as_ref(),
        catalog: ctx.catalog,
        counter: request.counter,
    };
    let picked = components.rules.select(choice.rules, &ctx_view, &input, rng);

    let mut attempts = vec![picked.clone()];
    if !matches!(picked.source, RuleSource::Fallback | RuleSource::Default) {
        attempts.push(RuleChoice::fallback(profile.fallback.as_ref()));
    }
    if picked.source != RuleSource::Default {
        attempts.push(RuleChoice::fallback(None));
    }
    attempts.dedup_by(|a, b| a.action == b.action);

    for attempt in attempts {
        let Some(action) = resolve_action(
            &attempt.action,
            actor,
            participants,
            ctx.catalog,
            None,
            request.counter.protect,
            rng,
        ) else {
            debug!(actor = %actor.id, action = ?attempt.action, "No target available");
            continue;
        };

        match components.executor.validate(actor.id, &action, participants, ctx) {
            Ok(()) => {
                return Ok(Decision {
                    action,
                    damage_multiplier: 1.0,
                    source: DecisionSource::Rule(attempt.source),
                    transition,
                    diagnostics,
                });
            }
            Err(err @ (BattleError::UnknownSkill(_) | BattleError::UnknownItem(_))) => {
                warn!(actor = %actor.id, error = %err, "AI rule references missing content");
                if request.strict {
                    return Err(BattleError::InvalidProfile(format!("{}: {}", actor.name, err)));
                }
                diagnostics.push(format!("{}: {}", actor.name, err));
            }
            Err(err) => debug!(actor = %actor.id, error = %err, "AI choice rejected"),
        }
    }

    let action = Action::Guard;
    components.executor.validate(actor.id, &action, participants, ctx)?;
    Ok(Decision {
        action,
        damage_multiplier: 1.0,
        source: DecisionSource::LastResort,
        transition,
        diagnostics,
    })
}

/// Turn a rule action into a command with a concrete target.
///
/// A skill or item's own target rule overrides a strategy aimed at the
/// wrong side. `forced` (a tactic's focus) wins while it is still a valid
/// opponent.
pub fn resolve_action(
    action: &RuleAction,
    actor: &Participant,
    participants: &[Participant],
    catalog: &Catalog,
    forced: Option<ParticipantId>,
    protect: Option<ParticipantId>,
    rng: &mut BattleRng,
) -> Option<Action> {
    let forced = forced.filter(|id| {
        participants
            .iter()
            .any(|p| p.id == *id && p.team != actor.team && p.is_active())
    });
    let pick = |strategy: TargetStrategy, rng: &mut BattleRng| match forced {
        Some(id) if !strategy.is_ally_side() => Some(id),
        _ => select_target(strategy, actor, participants, protect, rng),
    };

    match action {
        RuleAction::Attack { target } => {
            let target = pick(*target, rng)?;
            Some(Action::Attack { target })
        }
        RuleAction::Skill { skill, target } => {
            let strategy = match catalog.skill(skill).map(|def| def.target) {
                Some(rule) => strategy_for(rule, *target),
                None => *target,
            };
            let target = pick(strategy, rng)?;
            Some(Action::Skill {
                skill: skill.clone(),
                target,
            })
        }
        RuleAction::Item { item, target } => {
            let strategy = match catalog.item(item) {
                Some(def) if matches!(def.effect, ItemEffect::Revive { .. }) => {
                    TargetStrategy::DownedAlly
                }
                Some(def) => strategy_for(def.target, *target),
                None => *target,
            };
            let target = pick(strategy, rng)?;
            Some(Action::Item {
                item: item.clone(),
                target,
            })
        }
        RuleAction::Guard => Some(Action::Guard),
        RuleAction::Flee => Some(Action::Flee),
        RuleAction::Memory { op, stat } => Some(Action::Memory {
            op: *op,
            stat: *stat,
        }),
    }
}

fn strategy_for(rule: TargetRule, requested: TargetStrategy) -> TargetStrategy {
    match rule {
        TargetRule::Myself => TargetStrategy::Myself,
        TargetRule::DownedAlly => TargetStrategy::DownedAlly,
        TargetRule::Ally if !requested.is_ally_side() => TargetStrategy::WeakestAlly,
        TargetRule::Enemy if requested.is_ally_side() => TargetStrategy::RandomEnemy,
        _ => requested,
    }
}
