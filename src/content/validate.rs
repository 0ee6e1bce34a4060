//! Load-time content checks
//!
//! Catches broken references before a battle starts. Live play treats the
//! findings as warnings; strict mode turns the errors into failures.

use std::fmt;

use serde::Serialize;

use crate::battle::ai::profile::{AiProfile, RuleAction};
use crate::battle::ai::tactics::CoordinatedTactic;
use crate::content::catalog::Catalog;
use crate::content::encounter::Encounter;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownSkill { skill: String },
    UnknownItem { item: String },
    UnknownTemplate { template: String },
    /// No phase with threshold 0; the lowest phase catches low HP instead
    MissingFloorPhase { lowest: String },
    UnregisteredHook { phase: String, hook: String },
    /// No rules anywhere and no fallback; the actor will only basic-attack
    NoActions,
}

/// One finding, tied to the profile or encounter it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDiagnostic {
    pub subject: String,
    pub kind: DiagnosticKind,
}

impl ContentDiagnostic {
    fn new(subject: &str, kind: DiagnosticKind) -> Self {
        Self {
            subject: subject.to_string(),
            kind,
        }
    }

    /// Defects that strict mode refuses to run with
    pub fn is_error(&self) -> bool {
        !matches!(self.kind, DiagnosticKind::MissingFloorPhase { .. })
    }
}

impl fmt::Display for ContentDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::UnknownSkill { skill } => {
                write!(f, "{}: unknown skill '{}'", self.subject, skill)
            }
            DiagnosticKind::UnknownItem { item } => {
                write!(f, "{}: unknown item '{}'", self.subject, item)
            }
            DiagnosticKind::UnknownTemplate { template } => {
                write!(f, "{}: unknown enemy template '{}'", self.subject, template)
            }
            DiagnosticKind::MissingFloorPhase { lowest } => write!(
                f,
                "{}: no phase at threshold 0, '{}' covers low HP",
                self.subject, lowest
            ),
            DiagnosticKind::UnregisteredHook { phase, hook } => write!(
                f,
                "{}: phase '{}' uses unregistered hook '{}'",
                self.subject, phase, hook
            ),
            DiagnosticKind::NoActions => write!(f, "{}: profile has no rules and no fallback", self.subject),
        }
    }
}

fn check_action(subject: &str, action: &RuleAction, catalog: &Catalog, out: &mut Vec<ContentDiagnostic>) {
    match action {
        RuleAction::Skill { skill, .. } if catalog.skill(skill).is_none() => {
            out.push(ContentDiagnostic::new(
                subject,
                DiagnosticKind::UnknownSkill {
                    skill: skill.clone(),
                },
            ));
        }
        RuleAction::Item { item, .. } if catalog.item(item).is_none() => {
            out.push(ContentDiagnostic::new(
                subject,
                DiagnosticKind::UnknownItem { item: item.clone() },
            ));
        }
        _ => {}
    }
}

/// Check one AI profile against the catalog and the registered phase hooks
pub fn validate_profile(
    subject: &str,
    profile: &AiProfile,
    catalog: &Catalog,
    is_registered: &dyn Fn(&str) -> bool,
) -> Vec<ContentDiagnostic> {
    let mut out = Vec::new();

    for rule in profile.all_rules() {
        check_action(subject, &rule.action, catalog, &mut out);
    }
    if let Some(fallback) = &profile.fallback {
        check_action(subject, fallback, catalog, &mut out);
    }

    if profile.is_phased() && !profile.has_explicit_floor() {
        if let Some(lowest) = profile.floor_phase() {
            out.push(ContentDiagnostic::new(
                subject,
                DiagnosticKind::MissingFloorPhase {
                    lowest: lowest.name.clone(),
                },
            ));
        }
    }

    for phase in &profile.phases {
        if let Some(hook) = &phase.on_enter {
            if !is_registered(hook) {
                out.push(ContentDiagnostic::new(
                    subject,
                    DiagnosticKind::UnregisteredHook {
                        phase: phase.name.clone(),
                        hook: hook.clone(),
                    },
                ));
            }
        }
    }

    if profile.all_rules().next().is_none() && profile.fallback.is_none() {
        out.push(ContentDiagnostic::new(subject, DiagnosticKind::NoActions));
    }

    out
}

/// Check every enemy template in the catalog
pub fn validate_catalog(catalog: &Catalog, is_registered: &dyn Fn(&str) -> bool) -> Vec<ContentDiagnostic> {
    catalog
        .enemies()
        .into_iter()
        .flat_map(|template| validate_profile(&template.id, &template.ai, catalog, is_registered))
        .collect()
}

impl Catalog {
    pub fn validate(&self, is_registered: &dyn Fn(&str) -> bool) -> Vec<ContentDiagnostic> {
        validate_catalog(self, is_registered)
    }
}

/// Check that an encounter only names known templates and skills
pub fn validate_encounter(encounter: &Encounter, catalog: &Catalog) -> Vec<ContentDiagnostic> {
    let mut out = Vec::new();
    for slot in &encounter.enemies {
        if catalog.enemy(&slot.template).is_none() {
            out.push(ContentDiagnostic::new(
                &encounter.id,
                DiagnosticKind::UnknownTemplate {
                    template: slot.template.clone(),
                },
            ));
        }
    }
    for tactic in &encounter.tactics {
        out.extend(validate_tactic(&encounter.id, tactic, catalog, &|id: &str| {
            catalog.enemy(id).is_some()
        }));
    }
    out
}

/// Check a coordinated tactic's role actions and member templates
pub fn validate_tactic(
    subject: &str,
    tactic: &CoordinatedTactic,
    catalog: &Catalog,
    is_known_template: &dyn Fn(&str) -> bool,
) -> Vec<ContentDiagnostic> {
    let mut out = Vec::new();
    let actions = [
        &tactic.initiator_action,
        &tactic.supporter_action,
        &tactic.finisher_action,
    ];
    for action in actions.into_iter().flatten() {
        check_action(subject, action, catalog, &mut out);
    }
    for member in &tactic.members {
        if !is_known_template(member) {
            out.push(ContentDiagnostic::new(
                subject,
                DiagnosticKind::UnknownTemplate {
                    template: member.clone(),
                },
            ));
        }
    }
    out
}
