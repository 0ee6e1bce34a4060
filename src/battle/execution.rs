//! Battle execution loop
//!
//! Each turn: upkeep -> decide (AI) or validate (human) -> resolve ->
//! log -> outcome check -> next actor. Rounds recompute turn order and
//! coordinated tactics.

use std::sync::Arc;

use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::battle::actions::Action;
use crate::battle::ai::director::{decide, Decision, DecisionComponents, DecisionRequest};
use crate::battle::ai::learning::{CounterStrategy, LearningAi, PatternLearning, PlayerAction};
use crate::battle::ai::phases::{PhaseSelection, PhaseSelector, PhaseTransition};
use crate::battle::ai::rules::{RuleEvaluator, RuleSelection};
use crate::battle::ai::tactics::{TacticsCoordinator, TacticsPlan, TacticsPlanning};
use crate::battle::events::{BattleEvent, BattleEventKind, BattleEventLog, EffectKind, EffectRecord};
use crate::battle::inventory::Inventory;
use crate::battle::outcome::{BattleOutcome, OutcomeReport};
use crate::battle::participant::Participant;
use crate::battle::resolution::{ActionExecutor, ActionResolution, ResolutionContext};
use crate::battle::session::{BattleSession, BattleSetup, CommandRecord};
use crate::battle::turn_order::compute_turn_order;
use crate::content::catalog::Catalog;
use crate::content::validate::{validate_profile, validate_tactic};
use crate::core::config::EngineConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleId, BattleRng, ParticipantId, Round, Team};

/// Engine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EngineState {
    AwaitingCommand { actor: ParticipantId },
    ResolvingAction { actor: ParticipantId },
    CheckingOutcome,
    Over { outcome: BattleOutcome },
}

impl EngineState {
    pub fn is_over(&self) -> bool {
        matches!(self, EngineState::Over { .. })
    }
}

/// Result of one `advance_turn` call
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub actor: ParticipantId,
    pub action: Action,
    /// Everything logged from the action up to the next actor's turn
    pub events: Vec<BattleEvent>,
    pub state: EngineState,
}

/// Builds an engine, optionally with replacement components
pub struct BattleEngineBuilder {
    setup: BattleSetup,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    seed: u64,
    battle_id: Option<BattleId>,
    executor: Option<Box<dyn ActionResolution>>,
    rules: Option<Box<dyn RuleSelection>>,
    phases: Option<Box<dyn PhaseSelection>>,
    tactics: Option<Box<dyn TacticsPlanning>>,
    learning: Option<Box<dyn PatternLearning>>,
    inventory: Option<Box<dyn Inventory>>,
}

impl BattleEngineBuilder {
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn battle_id(mut self, id: BattleId) -> Self {
        self.battle_id = Some(id);
        self
    }

    pub fn executor(mut self, executor: impl ActionResolution + 'static) -> Self {
        self.executor = Some(Box::new(executor));
        self
    }

    pub fn rules(mut self, rules: impl RuleSelection + 'static) -> Self {
        self.rules = Some(Box::new(rules));
        self
    }

    pub fn phases(mut self, phases: impl PhaseSelection + 'static) -> Self {
        self.phases = Some(Box::new(phases));
        self
    }

    pub fn tactics(mut self, tactics: impl TacticsPlanning + 'static) -> Self {
        self.tactics = Some(Box::new(tactics));
        self
    }

    pub fn learning(mut self, learning: impl PatternLearning + 'static) -> Self {
        self.learning = Some(Box::new(learning));
        self
    }

    /// Use a host-owned inventory instead of the setup's
    pub fn inventory(mut self, inventory: impl Inventory + 'static) -> Self {
        self.inventory = Some(Box::new(inventory));
        self
    }

    pub fn build(self) -> Result<BattleEngine> {
        self.config.validate().map_err(BattleError::Config)?;

        let mut phases = self
            .phases
            .unwrap_or_else(|| Box::new(PhaseSelector::new()));
        let diagnostics = check_profiles(&self.setup, &self.catalog, phases.as_ref(), &self.config)?;

        let battle_id = self.battle_id.unwrap_or_default();
        let rng = BattleRng::seed_from_u64(self.seed);
        let (session, stock) = BattleSession::new(self.setup, battle_id, self.seed, rng);
        // starting phases, so damage taken before a first turn still transitions
        for p in &session.participants {
            if let Some(profile) = p.profile.as_ref().filter(|profile| profile.is_phased()) {
                phases.prime(p, profile);
            }
        }
        let inventory = self.inventory.unwrap_or_else(|| Box::new(stock));
        let learning = self
            .learning
            .unwrap_or_else(|| Box::new(LearningAi::new(&self.config)));

        let mut engine = BattleEngine {
            config: self.config,
            catalog: self.catalog,
            session,
            state: EngineState::CheckingOutcome,
            executor: self.executor.unwrap_or_else(|| Box::new(ActionExecutor)),
            rules: self.rules.unwrap_or_else(|| Box::new(RuleEvaluator)),
            phases,
            tactics: self.tactics.unwrap_or_else(|| Box::new(TacticsCoordinator)),
            learning,
            inventory,
            plan: TacticsPlan::default(),
        };

        info!(
            battle_id = %battle_id.0,
            seed = engine.session.seed,
            participants = engine.session.participants.len(),
            "Battle started"
        );
        engine.push(
            BattleEventKind::BattleStarted {
                battle_id,
                seed: engine.session.seed,
            },
            format!("Battle started (seed {})", engine.session.seed),
        );
        for message in diagnostics {
            engine.push(
                BattleEventKind::Diagnostic {
                    actor: None,
                    message: message.clone(),
                },
                message,
            );
        }

        if !engine.check_outcome(false) {
            engine.next_turn();
        }
        Ok(engine)
    }
}

/// Validate every AI profile and coordinated tactic in the setup.
///
/// Strict mode fails on the first error; otherwise findings are returned
/// as messages for the log.
fn check_profiles(
    setup: &BattleSetup,
    catalog: &Catalog,
    phases: &dyn PhaseSelection,
    config: &EngineConfig,
) -> Result<Vec<String>> {
    let is_registered = |hook: &str| phases.is_registered(hook);
    let is_known_template = |id: &str| {
        catalog.enemy(id).is_some()
            || setup
                .enemies
                .iter()
                .any(|p| p.template.as_deref() == Some(id))
    };

    let mut diagnostics = Vec::new();
    for p in setup.party.iter().chain(setup.enemies.iter()) {
        if let Some(profile) = &p.profile {
            diagnostics.extend(validate_profile(&p.name, profile, catalog, &is_registered));
        }
    }
    for tactic in &setup.tactics {
        let subject = format!("tactic '{}'", tactic.name);
        diagnostics.extend(validate_tactic(&subject, tactic, catalog, &is_known_template));
    }

    let mut messages = Vec::new();
    for diagnostic in diagnostics {
        if config.strict_content && diagnostic.is_error() {
            return Err(BattleError::InvalidProfile(diagnostic.to_string()));
        }
        warn!(subject = %diagnostic.subject, "{}", diagnostic);
        let message = diagnostic.to_string();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }
    Ok(messages)
}

/// Turn-based battle engine
///
/// Owns the session and its generator; components are injected behind
/// capability traits.
pub struct BattleEngine {
    config: EngineConfig,
    catalog: Arc<Catalog>,
    session: BattleSession,
    state: EngineState,
    executor: Box<dyn ActionResolution>,
    rules: Box<dyn RuleSelection>,
    phases: Box<dyn PhaseSelection>,
    tactics: Box<dyn TacticsPlanning>,
    learning: Box<dyn PatternLearning>,
    inventory: Box<dyn Inventory>,
    plan: TacticsPlan,
}

impl BattleEngine {
    pub fn builder(setup: BattleSetup, catalog: Arc<Catalog>) -> BattleEngineBuilder {
        BattleEngineBuilder {
            setup,
            catalog,
            config: EngineConfig::default(),
            seed: 0,
            battle_id: None,
            executor: None,
            rules: None,
            phases: None,
            tactics: None,
            learning: None,
            inventory: None,
        }
    }

    /// Engine with default components
    pub fn seeded(
        setup: BattleSetup,
        catalog: Arc<Catalog>,
        config: EngineConfig,
        seed: u64,
    ) -> Result<Self> {
        Self::builder(setup, catalog).config(config).seed(seed).build()
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_over(&self) -> bool {
        self.state.is_over()
    }

    pub fn outcome(&self) -> BattleOutcome {
        self.session.outcome
    }

    pub fn round(&self) -> Round {
        self.session.round
    }

    pub fn participants(&self) -> &[Participant] {
        &self.session.participants
    }

    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.session.participant(id)
    }

    pub fn log(&self) -> &BattleEventLog {
        &self.session.log
    }

    pub fn record(&self) -> &CommandRecord {
        &self.session.record
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn battle_id(&self) -> BattleId {
        self.session.battle_id
    }

    /// Participant whose command is awaited
    pub fn current_actor(&self) -> Option<ParticipantId> {
        match self.state {
            EngineState::AwaitingCommand { actor } => Some(actor),
            _ => None,
        }
    }

    /// Phase the AI is currently in for a phased adversary
    pub fn current_phase(&self, id: ParticipantId) -> Option<&str> {
        self.phases.current_phase(id)
    }

    /// Resolve the current actor's turn.
    ///
    /// `None` asks the AI to decide; human-controlled actors must supply a
    /// command. A rejected command leaves the battle untouched and the
    /// actor keeps its turn.
    pub fn advance_turn(&mut self, command: Option<Action>) -> Result<TurnReport> {
        let actor_id = match self.state {
            EngineState::AwaitingCommand { actor } => actor,
            EngineState::Over { .. } => return Err(BattleError::BattleOver),
            EngineState::ResolvingAction { .. } | EngineState::CheckingOutcome => {
                return Err(BattleError::InvalidCommand("no actor is waiting".into()))
            }
        };
        let index = actor_id.0 as usize;
        let (team, ai_controlled) = {
            let actor = &self.session.participants[index];
            (actor.team, actor.is_ai_controlled())
        };
        let log_start = self.session.log.len();

        let human = command.is_some();
        let (action, tactic_multiplier) = match command {
            Some(action) => {
                let ctx = ResolutionContext {
                    catalog: &self.catalog,
                    config: &self.config,
                    inventory: self.inventory.as_mut(),
                    escapable: self.session.escapable,
                    damage_multiplier: 1.0,
                };
                self.executor
                    .validate(actor_id, &action, &self.session.participants, &ctx)?;
                (action, 1.0)
            }
            None if ai_controlled => {
                let decision = self.decide_for(actor_id, team)?;
                self.apply_decision_side_effects(actor_id, &decision);
                (decision.action, decision.damage_multiplier)
            }
            None => {
                return Err(BattleError::InvalidCommand(format!(
                    "{} is player-controlled and needs a command",
                    self.session.participants[index].name
                )))
            }
        };

        self.state = EngineState::ResolvingAction { actor: actor_id };
        self.session.combo.begin_action(team);
        let combo_multiplier = self.session.combo.multiplier(team, &self.config);

        let resolution = {
            let mut ctx = ResolutionContext {
                catalog: &self.catalog,
                config: &self.config,
                inventory: self.inventory.as_mut(),
                escapable: self.session.escapable,
                damage_multiplier: combo_multiplier * tactic_multiplier,
            };
            self.executor.execute(
                actor_id,
                &action,
                &mut self.session.participants,
                &mut ctx,
                &mut self.session.rng,
            )
        };
        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(err) => {
                self.state = EngineState::AwaitingCommand { actor: actor_id };
                return Err(err);
            }
        };

        debug!(actor = %actor_id, action = %action, effects = resolution.effects.len(), "Action resolved");
        self.session.record.push(actor_id, action.clone(), human);
        self.session.statistics.actions += 1;
        let description = format!("{} uses {}", self.name_of(actor_id), action);
        self.push(
            BattleEventKind::ActionResolved {
                actor: actor_id,
                action: action.clone(),
            },
            description,
        );
        for record in resolution.effects {
            self.log_effect(record);
        }

        match resolution.hit {
            Some(true) => {
                let count = self.session.combo.register_hit(team);
                if count >= 2 {
                    let multiplier = self.session.combo.multiplier(team, &self.config);
                    self.push(
                        BattleEventKind::Combo {
                            team,
                            count,
                            multiplier,
                        },
                        format!("{}-hit combo (x{:.2})", count, multiplier),
                    );
                }
            }
            Some(false) => {
                self.session.combo.register_miss();
                self.session.statistics.misses += 1;
            }
            None => {}
        }

        if team == Team::Player {
            self.learning.record(PlayerAction::from(&action));
        }

        if !self.check_outcome(resolution.escaped) {
            self.next_turn();
        }

        Ok(TurnReport {
            actor: actor_id,
            action,
            events: self.session.log.since(log_start).to_vec(),
            state: self.state,
        })
    }

    /// End the battle at the current turn boundary
    pub fn abort(&mut self) -> Result<()> {
        if self.is_over() {
            return Err(BattleError::BattleOver);
        }
        self.finish(BattleOutcome::Aborted);
        Ok(())
    }

    /// Outcome record, once the battle is over
    pub fn report(&self) -> Option<OutcomeReport> {
        if !self.session.outcome.is_terminal() {
            return None;
        }
        let ids = |keep: fn(&Participant) -> bool| -> Vec<ParticipantId> {
            self.session
                .participants
                .iter()
                .filter(|p| keep(p))
                .map(|p| p.id)
                .collect()
        };

        Some(OutcomeReport {
            battle_id: self.session.battle_id,
            seed: self.session.seed,
            outcome: self.session.outcome,
            survivors: ids(|p| p.is_active()),
            defeated: ids(|p| p.is_present() && p.is_downed()),
            spared: ids(|p| p.is_spared()),
            fled: ids(|p| p.fled),
            party_hp_fraction: self.session.hp_fraction(Team::Player),
            enemy_hp_fraction: self.session.hp_fraction(Team::Enemy),
            rewards: self.session.rewards.clone(),
            statistics: self.session.statistics.clone(),
        })
    }

    fn decide_for(&mut self, actor: ParticipantId, team: Team) -> Result<Decision> {
        let counter = if team == Team::Enemy {
            let counter = self.learning.counter_strategy();
            self.drain_patterns();
            counter
        } else {
            CounterStrategy::none()
        };
        let assignment = self.plan.assignment(actor).cloned();

        let ctx = ResolutionContext {
            catalog: &self.catalog,
            config: &self.config,
            inventory: self.inventory.as_mut(),
            escapable: self.session.escapable,
            damage_multiplier: 1.0,
        };
        let request = DecisionRequest {
            actor,
            participants: &self.session.participants,
            round: self.session.round,
            counter: &counter,
            assignment: assignment.as_ref(),
            strict: self.config.strict_content,
        };
        let components = DecisionComponents {
            phases: self.phases.as_mut(),
            rules: self.rules.as_ref(),
            executor: self.executor.as_ref(),
        };
        decide(&request, components, &ctx, &mut self.session.rng)
    }

    /// Log diagnostics and apply a phase transition (with its hook)
    fn apply_decision_side_effects(&mut self, actor: ParticipantId, decision: &Decision) {
        for message in &decision.diagnostics {
            self.push(
                BattleEventKind::Diagnostic {
                    actor: Some(actor),
                    message: message.clone(),
                },
                message.clone(),
            );
        }
        if let Some(transition) = &decision.transition {
            self.enter_phase(transition);
        }
    }

    fn enter_phase(&mut self, transition: &PhaseTransition) {
        let description = format!(
            "{} enters phase '{}' at {:.0}% HP",
            self.name_of(transition.actor),
            transition.to,
            transition.hp_percent
        );
        self.push(
            BattleEventKind::PhaseTransition {
                actor: transition.actor,
                from: transition.from.clone(),
                phase: transition.to.clone(),
                hp_percent: transition.hp_percent,
            },
            description,
        );
        self.session.statistics.phase_transitions += 1;

        let Some(hook) = &transition.hook else {
            return;
        };
        let index = transition.actor.0 as usize;
        let Some(effects) = self
            .phases
            .run_hook(hook, &mut self.session.participants[index])
        else {
            return;
        };
        for kind in effects {
            self.log_effect(EffectRecord::on_self(transition.actor, kind));
        }
    }

    fn drain_patterns(&mut self) {
        for pattern in self.learning.take_new_patterns() {
            let description = format!(
                "Enemies notice a habit: {:?} ({:.0}%)",
                pattern.pattern,
                pattern.frequency * 100.0
            );
            self.session.statistics.patterns_detected += 1;
            self.push(BattleEventKind::PatternDetected { pattern }, description);
        }
    }

    /// Returns true if the battle ended
    fn check_outcome(&mut self, escaped: bool) -> bool {
        self.state = EngineState::CheckingOutcome;
        let outcome = if escaped {
            BattleOutcome::Escaped
        } else if !self.session.team_active(Team::Enemy) {
            BattleOutcome::Victory
        } else if !self.session.team_active(Team::Player) {
            BattleOutcome::Defeat
        } else {
            return false;
        };
        self.finish(outcome);
        true
    }

    fn finish(&mut self, outcome: BattleOutcome) {
        self.session.outcome = outcome;
        self.session.statistics.rounds = self.session.round;
        self.session.statistics.best_combo = self.session.combo.best();
        info!(
            battle_id = %self.session.battle_id.0,
            outcome = ?outcome,
            rounds = self.session.round,
            "Battle ended"
        );
        self.push(
            BattleEventKind::BattleEnded { outcome },
            format!("Battle ended: {:?}", outcome),
        );
        self.state = EngineState::Over { outcome };
    }

    fn start_round(&mut self) {
        self.session.round += 1;
        self.session.order = compute_turn_order(&self.session.participants);
        self.session.cursor = 0;
        debug!(round = self.session.round, order = ?self.session.order, "Round started");
        self.push(
            BattleEventKind::RoundStarted {
                order: self.session.order.clone(),
            },
            format!("Round {}", self.session.round),
        );

        self.plan = self.tactics.plan(
            &self.session.tactics,
            &self.session.participants,
            &mut self.session.rng,
        );
        for triggered in self.plan.triggered.clone() {
            self.session.statistics.tactics_triggered += 1;
            let description = format!("Coordinated tactic '{}'", triggered.name);
            self.push(
                BattleEventKind::TacticTriggered {
                    tactic: triggered.name,
                    members: triggered.members,
                },
                description,
            );
        }
    }

    /// Move to the next participant able to act, running start-of-turn upkeep
    fn next_turn(&mut self) {
        loop {
            if self.session.cursor >= self.session.order.len() {
                self.start_round();
                if self.session.order.is_empty() {
                    // no one can act; treat as the host ending it
                    warn!("No participant can act, aborting");
                    self.finish(BattleOutcome::Aborted);
                    return;
                }
            }

            let id = self.session.order[self.session.cursor];
            self.session.cursor += 1;
            let index = id.0 as usize;
            if !self.session.participants[index].is_active() {
                continue;
            }

            let tick = self.session.participants[index].begin_turn();
            for (status, amount) in tick.damage {
                self.log_effect(EffectRecord::on_self(id, EffectKind::StatusDamage { status, amount }));
            }
            for (status, amount) in tick.healing {
                self.log_effect(EffectRecord::on_self(id, EffectKind::StatusHealing { status, amount }));
            }
            for status in tick.expired {
                self.log_effect(EffectRecord::on_self(id, EffectKind::StatusExpired { status }));
            }

            if self.session.participants[index].is_downed() {
                self.log_effect(EffectRecord::on_self(id, EffectKind::Downed));
                if self.check_outcome(false) {
                    return;
                }
                continue;
            }

            if tick.stunned {
                let description = format!("{} is stunned", self.name_of(id));
                self.push(
                    BattleEventKind::TurnSkipped {
                        actor: id,
                        reason: "stunned".into(),
                    },
                    description,
                );
                continue;
            }

            self.state = EngineState::AwaitingCommand { actor: id };
            return;
        }
    }

    fn push(&mut self, kind: BattleEventKind, description: String) {
        self.session.log.push(self.session.round, kind, description);
    }

    fn name_of(&self, id: ParticipantId) -> String {
        self.session
            .participant(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Log one effect, update statistics and raise semantic events
    fn log_effect(&mut self, record: EffectRecord) {
        let target = record.target.and_then(|id| self.session.participant(id));
        let target_team = target.map(|p| p.team);
        let target_name = target.map(|p| p.name.clone()).unwrap_or_default();
        let stats = &mut self.session.statistics;

        let mut follow_up = None;
        let description = match &record.kind {
            EffectKind::Damage { amount, critical } => {
                if let Some(team) = target_team {
                    stats.record_damage(team, *amount);
                }
                if *critical {
                    stats.criticals += 1;
                    format!("Critical! {} takes {} damage", target_name, amount)
                } else {
                    format!("{} takes {} damage", target_name, amount)
                }
            }
            EffectKind::StatusDamage { status, amount } => {
                if let Some(team) = target_team {
                    stats.record_damage(team, *amount);
                }
                format!("{} takes {} {} damage", target_name, amount, status.name())
            }
            EffectKind::Heal { amount } | EffectKind::StatusHealing { amount, .. } => {
                stats.healing += *amount as i64;
                format!("{} recovers {} HP", target_name, amount)
            }
            EffectKind::Revived { hp } => {
                stats.healing += *hp as i64;
                format!("{} is revived with {} HP", target_name, hp)
            }
            EffectKind::Downed => {
                if let (Some(id), Some(team)) = (record.target, target_team) {
                    follow_up = Some(match team {
                        Team::Enemy => {
                            stats.kills += 1;
                            BattleEventKind::EnemyKilled { id }
                        }
                        Team::Player => BattleEventKind::AllyDowned { id },
                    });
                }
                format!("{} is down", target_name)
            }
            EffectKind::Spared => {
                stats.spared += 1;
                follow_up = record.target.map(|id| BattleEventKind::EnemySpared { id });
                format!("{} is spared", target_name)
            }
            EffectKind::Fled => {
                if target_team == Some(Team::Enemy) {
                    follow_up = record.target.map(|id| BattleEventKind::EnemyFled { id });
                }
                format!("{} flees", target_name)
            }
            EffectKind::Miss => format!("The attack misses {}", target_name),
            EffectKind::Info { message } => message.clone(),
            other => format!("{}: {:?}", target_name, other),
        };

        self.push(BattleEventKind::Effect(record), description.clone());
        if let Some(kind) = follow_up {
            self.push(kind, description);
        }
    }
}

/// Re-run a recorded battle and check it plays out identically.
///
/// Human commands are resubmitted; AI turns are decided again and must
/// produce the recorded action.
pub fn replay(
    setup: BattleSetup,
    catalog: Arc<Catalog>,
    config: EngineConfig,
    record: &CommandRecord,
) -> Result<BattleEngine> {
    let mut engine = BattleEngine::builder(setup, catalog)
        .config(config)
        .seed(record.seed)
        .battle_id(record.battle_id)
        .build()?;

    for (step, entry) in record.entries.iter().enumerate() {
        if engine.current_actor() != Some(entry.actor) {
            return Err(BattleError::InvalidCommand(format!(
                "replay diverged at step {}: expected {} to act",
                step, entry.actor
            )));
        }
        let command = entry.human.then(|| entry.action.clone());
        let report = engine.advance_turn(command)?;
        if report.action != entry.action {
            return Err(BattleError::InvalidCommand(format!(
                "replay diverged at step {}: {} chose {} instead of {}",
                step, entry.actor, report.action, entry.action
            )));
        }
    }
    Ok(engine)
}
