//! Adversary AI for battle decision-making
//!
//! Architecture: Trait + Data hybrid
//! - AiProfile holds TOML-loaded rules, phases and behavior type
//! - Capability traits (RuleSelection, PhaseSelection, TacticsPlanning,
//!   PatternLearning) let the engine swap implementations
//! - DecisionContext is the read-only battle view conditions evaluate against

pub mod behavior;
pub mod conditions;
pub mod decision_context;
pub mod director;
pub mod learning;
pub mod phases;
pub mod profile;
pub mod rules;
pub mod tactics;
pub mod targeting;

pub use behavior::behavior_multiplier;
pub use conditions::{Bounds, ConditionSet, SelfStatus, StatusSet, StatusToken};
pub use decision_context::DecisionContext;
pub use director::{decide, resolve_action, Decision, DecisionComponents, DecisionRequest, DecisionSource};
pub use learning::{
    CounterStrategy, DetectedPattern, LearningAi, PatternLearning, PlayerAction, PlayerPattern,
};
pub use phases::{
    select_phase_index, PhaseChoice, PhaseHook, PhaseHookRegistry, PhaseSelection, PhaseSelector,
    PhaseTransition,
};
pub use profile::{ActionCategory, AiProfile, BehaviorType, Phase, Rule, RuleAction};
pub use rules::{RuleChoice, RuleEvaluator, RuleSelection, RuleSource, SelectionInput, WeightedRule};
pub use tactics::{
    CoordinatedTactic, TacticAssignment, TacticRole, TacticTrigger, TacticsCoordinator,
    TacticsPlan, TacticsPlanning, TriggeredTactic,
};
pub use targeting::{select_target, TargetStrategy};
