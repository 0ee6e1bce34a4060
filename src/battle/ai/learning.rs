//! Learning AI: adapts to the player's recent habits
//!
//! Player actions go into a bounded window. Analysis is deferred until a
//! counter-strategy is requested, then cached until enough new actions
//! arrive. Below the minimum sample size the counter-strategy is a no-op.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::battle::actions::{Action, ActionKind};
use crate::battle::ai::profile::ActionCategory;
use crate::core::config::EngineConfig;
use crate::core::types::{ParticipantId, SkillId};

/// One observed player choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAction {
    pub kind: ActionKind,
    pub target: Option<ParticipantId>,
    pub skill: Option<SkillId>,
}

impl From<&Action> for PlayerAction {
    fn from(action: &Action) -> Self {
        Self {
            kind: action.kind(),
            target: action.target(),
            skill: action.skill().map(str::to_string),
        }
    }
}

/// A habit seen in the window
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum PlayerPattern {
    RepeatedAction { kind: ActionKind },
    RepeatedSkill { skill: SkillId },
    FocusedTarget { target: ParticipantId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub pattern: PlayerPattern,
    /// Share of the window (0.0 to 1.0)
    pub frequency: f32,
}

/// Weight adjustments handed to rule selection
#[derive(Debug, Clone, PartialEq)]
pub struct CounterStrategy {
    pub weight_multipliers: BTreeMap<ActionCategory, f32>,
    /// Extra multiplier for rules aimed at the AI's own side
    pub ally_target_multiplier: f32,
    /// Restrict candidates to this category when any qualify
    pub priority: Option<ActionCategory>,
    /// Ally the player keeps hitting
    pub protect: Option<ParticipantId>,
    pub patterns: Vec<DetectedPattern>,
}

impl Default for CounterStrategy {
    fn default() -> Self {
        Self {
            weight_multipliers: BTreeMap::new(),
            ally_target_multiplier: 1.0,
            priority: None,
            protect: None,
            patterns: Vec::new(),
        }
    }
}

impl CounterStrategy {
    /// No adjustments at all
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.weight_multipliers.is_empty()
            && self.priority.is_none()
            && self.protect.is_none()
            && self.ally_target_multiplier == 1.0
    }

    pub fn multiplier(&self, category: ActionCategory) -> f32 {
        self.weight_multipliers.get(&category).copied().unwrap_or(1.0)
    }

    fn scale(&mut self, category: ActionCategory, factor: f32) {
        *self.weight_multipliers.entry(category).or_insert(1.0) *= factor;
    }
}

/// Counters for a repeated action type, strongest first
fn counters_for(kind: ActionKind) -> &'static [(ActionCategory, f32)] {
    use ActionCategory as C;
    match kind {
        // burst through the guard, stop wasting hits on it
        ActionKind::Guard => &[
            (C::DamageSkill, 2.0),
            (C::StatusSkill, 1.5),
            (C::Attack, 0.5),
            (C::Guard, 0.5),
        ],
        ActionKind::Attack => &[(C::Guard, 2.0), (C::BuffSkill, 1.5), (C::HealSkill, 1.5)],
        ActionKind::Skill => &[(C::StatusSkill, 2.0), (C::Attack, 1.5)],
        ActionKind::Item => &[(C::DamageSkill, 1.5), (C::StatusSkill, 1.5)],
        ActionKind::Talk => &[(C::Attack, 1.5)],
        ActionKind::Flee => &[(C::StatusSkill, 1.5)],
        ActionKind::Memory => &[(C::Attack, 1.5), (C::DamageSkill, 1.5)],
    }
}

/// Frequency at which a pattern also forces a priority category
const PRIORITY_FREQUENCY: f32 = 0.9;

/// Capability: observe the player and produce counter-strategies
pub trait PatternLearning: Send {
    fn record(&mut self, action: PlayerAction);

    fn counter_strategy(&mut self) -> CounterStrategy;

    /// Patterns detected since the last call, each reported once
    fn take_new_patterns(&mut self) -> Vec<DetectedPattern>;
}

#[derive(Debug, Clone)]
pub struct LearningAi {
    window: VecDeque<PlayerAction>,
    capacity: usize,
    min_actions: usize,
    threshold: f32,
    refresh: u64,
    total: u64,
    cache: Option<(u64, CounterStrategy)>,
    reported: BTreeSet<PlayerPattern>,
    pending: Vec<DetectedPattern>,
}

impl LearningAi {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.learning_window),
            capacity: config.learning_window.max(1),
            min_actions: config.learning_min_actions,
            threshold: config.learning_threshold,
            refresh: config.learning_refresh.max(1),
            total: 0,
            cache: None,
            reported: BTreeSet::new(),
            pending: Vec::new(),
        }
    }

    /// Actions observed over the whole battle
    pub fn observed(&self) -> u64 {
        self.total
    }

    fn detect(&self) -> Vec<DetectedPattern> {
        let size = self.window.len() as f32;
        let mut kinds: BTreeMap<ActionKind, u32> = BTreeMap::new();
        let mut skills: BTreeMap<&str, u32> = BTreeMap::new();
        let mut targets: BTreeMap<ParticipantId, u32> = BTreeMap::new();

        for action in &self.window {
            *kinds.entry(action.kind).or_insert(0) += 1;
            if let Some(skill) = &action.skill {
                *skills.entry(skill.as_str()).or_insert(0) += 1;
            }
            if let Some(target) = action.target {
                *targets.entry(target).or_insert(0) += 1;
            }
        }

        let frequent = |count: u32| {
            let frequency = count as f32 / size;
            (frequency >= self.threshold).then_some(frequency)
        };

        let mut patterns = Vec::new();
        for (kind, count) in kinds {
            if let Some(frequency) = frequent(count) {
                patterns.push(DetectedPattern {
                    pattern: PlayerPattern::RepeatedAction { kind },
                    frequency,
                });
            }
        }
        for (skill, count) in skills {
            if let Some(frequency) = frequent(count) {
                patterns.push(DetectedPattern {
                    pattern: PlayerPattern::RepeatedSkill {
                        skill: skill.to_string(),
                    },
                    frequency,
                });
            }
        }
        for (target, count) in targets {
            if let Some(frequency) = frequent(count) {
                patterns.push(DetectedPattern {
                    pattern: PlayerPattern::FocusedTarget { target },
                    frequency,
                });
            }
        }
        patterns
    }

    fn analyze(&self, patterns: Vec<DetectedPattern>) -> CounterStrategy {
        let mut strategy = CounterStrategy::none();

        for detected in &patterns {
            match &detected.pattern {
                PlayerPattern::RepeatedAction { kind } => {
                    let counters = counters_for(*kind);
                    for (category, factor) in counters {
                        strategy.scale(*category, *factor);
                    }
                    if detected.frequency >= PRIORITY_FREQUENCY && strategy.priority.is_none() {
                        strategy.priority = counters.first().map(|(category, _)| *category);
                    }
                }
                // a favorite skill is countered by disrupting the caster
                PlayerPattern::RepeatedSkill { .. } => {
                    strategy.scale(ActionCategory::StatusSkill, 1.5);
                }
                PlayerPattern::FocusedTarget { target } => {
                    strategy.ally_target_multiplier *= 2.0;
                    strategy.scale(ActionCategory::HealSkill, 1.5);
                    strategy.scale(ActionCategory::BuffSkill, 1.5);
                    if strategy.protect.is_none() {
                        strategy.protect = Some(*target);
                    }
                }
            }
        }

        strategy.patterns = patterns;
        strategy
    }
}

impl PatternLearning for LearningAi {
    fn record(&mut self, action: PlayerAction) {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(action);
        self.total += 1;
    }

    fn counter_strategy(&mut self) -> CounterStrategy {
        if (self.total as usize) < self.min_actions || self.window.is_empty() {
            return CounterStrategy::none();
        }

        if let Some((at, cached)) = &self.cache {
            if self.total - at < self.refresh {
                return cached.clone();
            }
        }

        let patterns = self.detect();
        for detected in &patterns {
            if self.reported.insert(detected.pattern.clone()) {
                debug!(pattern = ?detected.pattern, frequency = detected.frequency, "Player pattern detected");
                self.pending.push(detected.clone());
            }
        }

        let strategy = self.analyze(patterns);
        self.cache = Some((self.total, strategy.clone()));
        strategy
    }

    fn take_new_patterns(&mut self) -> Vec<DetectedPattern> {
        std::mem::take(&mut self.pending)
    }
}
