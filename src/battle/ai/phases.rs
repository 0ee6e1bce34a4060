//! Phase selection for multi-stage adversaries
//!
//! Phases are scanned from the highest threshold down; the first one the
//! current HP% reaches is active, and the lowest one catches everything
//! else. Phase hooks run once when a phase is entered.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{info, warn};

use crate::battle::ai::profile::{AiProfile, Phase, Rule};
use crate::battle::events::EffectKind;
use crate::battle::participant::Participant;
use crate::battle::status::StatusKind;
use crate::core::error::{BattleError, Result};
use crate::core::types::{ParticipantId, Stat};

/// Turns a hook-granted status lasts
const HOOK_DURATION: u32 = 99;

/// Index into `phases` of the active phase for an HP percentage
pub fn select_phase_index(phases: &[Phase], hp_percent: f32) -> Option<usize> {
    let mut order: Vec<usize> = (0..phases.len()).collect();
    // stable: equal thresholds keep declaration order
    order.sort_by(|&a, &b| phases[b].threshold.total_cmp(&phases[a].threshold));

    order
        .iter()
        .copied()
        .find(|&i| hp_percent >= phases[i].threshold)
        .or_else(|| order.last().copied())
}

pub type PhaseHook = Box<dyn Fn(&mut Participant) -> Vec<EffectKind> + Send + Sync>;

/// Named behaviors a phase can trigger on entry
pub struct PhaseHookRegistry {
    hooks: BTreeMap<String, PhaseHook>,
}

impl fmt::Debug for PhaseHookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseHookRegistry")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for PhaseHookRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn buff_hook(kind: StatusKind, stat: Stat) -> PhaseHook {
    Box::new(move |p: &mut Participant| {
        let amount = (p.stats.base(stat) / 4).max(1);
        p.statuses.apply(kind, HOOK_DURATION, amount, 1);
        vec![EffectKind::StatusApplied {
            status: kind,
            duration: HOOK_DURATION,
        }]
    })
}

impl PhaseHookRegistry {
    /// Registry with no hooks at all
    pub fn empty() -> Self {
        Self {
            hooks: BTreeMap::new(),
        }
    }

    /// `enrage`, `fortify`, `regenerate` and `purge`
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("enrage", buff_hook(StatusKind::AttackUp, Stat::Attack));
        registry.register("fortify", buff_hook(StatusKind::DefenseUp, Stat::Defense));
        registry.register(
            "regenerate",
            Box::new(|p: &mut Participant| {
                p.statuses.apply(StatusKind::Regen, 5, 0, 1);
                vec![EffectKind::StatusApplied {
                    status: StatusKind::Regen,
                    duration: 5,
                }]
            }),
        );
        registry.register(
            "purge",
            Box::new(|p: &mut Participant| {
                p.statuses
                    .clear_negative()
                    .into_iter()
                    .map(|status| EffectKind::StatusRemoved { status })
                    .collect()
            }),
        );
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, hook: PhaseHook) {
        self.hooks.insert(name.into(), hook);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Run a hook; `None` if it is not registered
    pub fn run(&self, name: &str, participant: &mut Participant) -> Option<Vec<EffectKind>> {
        self.hooks.get(name).map(|hook| hook(participant))
    }
}

/// A change of phase to announce
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTransition {
    pub actor: ParticipantId,
    pub from: Option<String>,
    pub to: String,
    pub hp_percent: f32,
    pub hook: Option<String>,
}

/// Rules chosen for one decision
#[derive(Debug, Clone)]
pub struct PhaseChoice<'p> {
    pub rules: &'p [Rule],
    pub phase: Option<&'p str>,
    pub transition: Option<PhaseTransition>,
    pub diagnostics: Vec<String>,
}

/// Capability: pick the active rule set for a phased profile
pub trait PhaseSelection: Send {
    fn select<'p>(
        &mut self,
        actor: &Participant,
        profile: &'p AiProfile,
        strict: bool,
    ) -> Result<PhaseChoice<'p>>;

    /// Apply an entered phase's hook to its owner
    fn run_hook(&self, hook: &str, actor: &mut Participant) -> Option<Vec<EffectKind>>;

    /// Record the starting phase without announcing it
    fn prime(&mut self, _actor: &Participant, _profile: &AiProfile) {}

    fn current_phase(&self, actor: ParticipantId) -> Option<&str>;

    /// Whether a hook name has behavior behind it
    fn is_registered(&self, hook: &str) -> bool;
}

/// Default phase selector; remembers each adversary's phase
#[derive(Debug, Default)]
pub struct PhaseSelector {
    hooks: PhaseHookRegistry,
    current: BTreeMap<ParticipantId, String>,
    /// Unusable phases already reported, per actor
    reported: BTreeSet<(ParticipantId, String)>,
}

impl PhaseSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hooks(hooks: PhaseHookRegistry) -> Self {
        Self {
            hooks,
            current: BTreeMap::new(),
            reported: BTreeSet::new(),
        }
    }

    pub fn hooks(&self) -> &PhaseHookRegistry {
        &self.hooks
    }

    fn is_usable(&self, phase: &Phase) -> bool {
        phase
            .on_enter
            .as_deref()
            .map_or(true, |hook| self.hooks.contains(hook))
    }

    /// Nearest usable phase to `selected`: lower thresholds first, then higher
    fn nearest_usable(&self, phases: &[Phase], selected: usize) -> Option<usize> {
        let mut order: Vec<usize> = (0..phases.len()).collect();
        order.sort_by(|&a, &b| phases[b].threshold.total_cmp(&phases[a].threshold));
        let position = order.iter().position(|&i| i == selected)?;

        order[position + 1..]
            .iter()
            .chain(order[..position].iter().rev())
            .copied()
            .find(|&i| self.is_usable(&phases[i]))
    }
}

impl PhaseSelection for PhaseSelector {
    fn select<'p>(
        &mut self,
        actor: &Participant,
        profile: &'p AiProfile,
        strict: bool,
    ) -> Result<PhaseChoice<'p>> {
        let hp_percent = actor.hp_percent();
        let Some(mut index) = select_phase_index(&profile.phases, hp_percent) else {
            return Ok(PhaseChoice {
                rules: &profile.rules,
                phase: None,
                transition: None,
                diagnostics: Vec::new(),
            });
        };

        let mut diagnostics = Vec::new();
        let phase = &profile.phases[index];
        if !self.is_usable(phase) {
            let hook = phase.on_enter.clone().unwrap_or_default();
            if strict {
                return Err(BattleError::UnregisteredPhase {
                    phase: phase.name.clone(),
                    hook,
                });
            }

            if self.reported.insert((actor.id, phase.name.clone())) {
                warn!(actor = %actor.id, phase = %phase.name, hook = %hook, "Unregistered phase hook");
                diagnostics.push(format!(
                    "phase '{}' of {} uses unregistered hook '{}'",
                    phase.name, actor.name, hook
                ));
            }

            match self.nearest_usable(&profile.phases, index) {
                Some(nearest) => index = nearest,
                None => {
                    return Ok(PhaseChoice {
                        rules: &profile.rules,
                        phase: None,
                        transition: None,
                        diagnostics,
                    })
                }
            }
        }

        let phase = &profile.phases[index];
        let previous = self.current.insert(actor.id, phase.name.clone());
        let transition = match previous {
            Some(from) if from != phase.name => {
                info!(
                    actor = %actor.id,
                    from = %from,
                    to = %phase.name,
                    hp_percent,
                    "Phase transition"
                );
                Some(PhaseTransition {
                    actor: actor.id,
                    from: Some(from),
                    to: phase.name.clone(),
                    hp_percent,
                    hook: phase.on_enter.clone(),
                })
            }
            _ => None,
        };

        Ok(PhaseChoice {
            rules: &phase.rules,
            phase: Some(phase.name.as_str()),
            transition,
            diagnostics,
        })
    }

    fn run_hook(&self, hook: &str, actor: &mut Participant) -> Option<Vec<EffectKind>> {
        self.hooks.run(hook, actor)
    }

    fn prime(&mut self, actor: &Participant, profile: &AiProfile) {
        let Some(index) = select_phase_index(&profile.phases, actor.hp_percent()) else {
            return;
        };
        let index = if self.is_usable(&profile.phases[index]) {
            Some(index)
        } else {
            self.nearest_usable(&profile.phases, index)
        };
        if let Some(index) = index {
            self.current.insert(actor.id, profile.phases[index].name.clone());
        }
    }

    fn current_phase(&self, actor: ParticipantId) -> Option<&str> {
        self.current.get(&actor).map(String::as_str)
    }

    fn is_registered(&self, hook: &str) -> bool {
        self.hooks.contains(hook)
    }
}
