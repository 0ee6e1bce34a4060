//! Action resolution
//!
//! Every command is validated in full before anything is mutated, so a
//! rejected command leaves the battle exactly as it was.

use tracing::debug;

use crate::battle::actions::Action;
use crate::battle::damage::{compute_damage, crit_chance, hit_chance, roll, variance_factor, DamageRoll};
use crate::battle::events::{EffectKind, EffectRecord};
use crate::battle::inventory::Inventory;
use crate::battle::memory::MemoryOp;
use crate::battle::morale::TalkTone;
use crate::battle::participant::Participant;
use crate::battle::status::StatusKind;
use crate::content::catalog::{Catalog, ItemEffect, SkillDef, SkillEffect, TargetRule};
use crate::core::config::EngineConfig;
use crate::core::error::{BattleError, Result};
use crate::core::types::{BattleRng, ParticipantId, Stat, Team};

/// Buff length for skills and hooks that do not say otherwise
const DEFAULT_BUFF_DURATION: u32 = 3;

/// Everything besides the participants an action may read or touch
pub struct ResolutionContext<'a> {
    pub catalog: &'a Catalog,
    pub config: &'a EngineConfig,
    pub inventory: &'a mut dyn Inventory,
    /// The party may attempt to flee
    pub escapable: bool,
    /// Combo and tactic bonus for damage this action deals
    pub damage_multiplier: f32,
}

/// Outcome of one resolved action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub effects: Vec<EffectRecord>,
    /// `Some(true)` when a damaging hit landed, `Some(false)` on a miss
    pub hit: Option<bool>,
    /// The party got away
    pub escaped: bool,
}

impl Resolution {
    fn push(&mut self, record: EffectRecord) {
        self.effects.push(record);
    }
}

/// Capability: check and apply commands
pub trait ActionResolution: Send {
    /// Reject commands the actor cannot perform right now
    fn validate(
        &self,
        actor: ParticipantId,
        action: &Action,
        participants: &[Participant],
        ctx: &ResolutionContext,
    ) -> Result<()>;

    /// Validate, then apply the command
    fn execute(
        &self,
        actor: ParticipantId,
        action: &Action,
        participants: &mut [Participant],
        ctx: &mut ResolutionContext,
        rng: &mut BattleRng,
    ) -> Result<Resolution>;
}

/// Default executor
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }
}

pub(crate) fn index_of(participants: &[Participant], id: ParticipantId) -> Result<usize> {
    participants
        .iter()
        .position(|p| p.id == id)
        .ok_or(BattleError::UnknownParticipant(id))
}

/// Can `target` receive an effect under `rule` from `actor`?
fn check_target(
    rule: TargetRule,
    actor: &Participant,
    target: &Participant,
    allows_downed: bool,
) -> Result<()> {
    let ok = match rule {
        TargetRule::Enemy => target.team != actor.team && target.is_active(),
        TargetRule::Myself => target.id == actor.id,
        TargetRule::Ally => {
            target.team == actor.team
                && (target.is_active() || (allows_downed && target.is_present()))
        }
        TargetRule::DownedAlly => {
            target.team == actor.team && target.is_present() && target.is_downed()
        }
    };

    if ok {
        Ok(())
    } else {
        Err(BattleError::InvalidCommand(format!(
            "{} is not a valid {:?} target for {}",
            target.name, rule, actor.name
        )))
    }
}

fn skill_revives(skill: &SkillDef) -> bool {
    matches!(skill.effect, SkillEffect::Heal { .. })
}

fn item_revives(effect: &ItemEffect) -> bool {
    matches!(effect, ItemEffect::Revive { .. })
}

impl ActionResolution for ActionExecutor {
    fn validate(
        &self,
        actor_id: ParticipantId,
        action: &Action,
        participants: &[Participant],
        ctx: &ResolutionContext,
    ) -> Result<()> {
        let actor = &participants[index_of(participants, actor_id)?];
        if !actor.is_active() {
            return Err(BattleError::InvalidCommand(format!(
                "{} cannot act",
                actor.name
            )));
        }

        match action {
            Action::Attack { target } => {
                let target = &participants[index_of(participants, *target)?];
                check_target(TargetRule::Enemy, actor, target, false)
            }

            Action::Skill { skill, target } => {
                let def = ctx
                    .catalog
                    .skill(skill)
                    .ok_or_else(|| BattleError::UnknownSkill(skill.clone()))?;
                if !actor.can_use_skills() {
                    return Err(BattleError::InvalidCommand(format!(
                        "{} is silenced",
                        actor.name
                    )));
                }
                if def.sp_cost > actor.sp() {
                    return Err(BattleError::InsufficientResource {
                        needed: def.sp_cost,
                        available: actor.sp(),
                    });
                }
                let target = &participants[index_of(participants, *target)?];
                check_target(def.target, actor, target, skill_revives(def))
            }

            Action::Item { item, target } => {
                let def = ctx
                    .catalog
                    .item(item)
                    .ok_or_else(|| BattleError::UnknownItem(item.clone()))?;
                if ctx.inventory.count(actor.id, actor.team, item) == 0 {
                    return Err(BattleError::ItemUnavailable(item.clone()));
                }
                let target = &participants[index_of(participants, *target)?];
                if item_revives(&def.effect) && !target.is_downed() {
                    return Err(BattleError::InvalidCommand(format!(
                        "{} is not downed",
                        target.name
                    )));
                }
                check_target(def.target, actor, target, item_revives(&def.effect))
            }

            Action::Guard | Action::Memory { .. } => Ok(()),

            Action::Talk { target, .. } => {
                if actor.team != Team::Player {
                    return Err(BattleError::InvalidCommand(
                        "only the party can talk".into(),
                    ));
                }
                let target = &participants[index_of(participants, *target)?];
                if target.team != Team::Enemy || !target.is_active() {
                    return Err(BattleError::InvalidCommand(format!(
                        "cannot talk to {}",
                        target.name
                    )));
                }
                Ok(())
            }

            Action::Flee => match actor.team {
                Team::Player if !ctx.escapable => Err(BattleError::FleeDisallowed(
                    "this battle cannot be escaped".into(),
                )),
                Team::Enemy if actor.boss => Err(BattleError::FleeDisallowed(format!(
                    "{} does not retreat",
                    actor.name
                ))),
                _ => Ok(()),
            },
        }
    }

    fn execute(
        &self,
        actor_id: ParticipantId,
        action: &Action,
        participants: &mut [Participant],
        ctx: &mut ResolutionContext,
        rng: &mut BattleRng,
    ) -> Result<Resolution> {
        self.validate(actor_id, action, participants, ctx)?;
        let actor = index_of(participants, actor_id)?;

        let mut resolution = Resolution::default();
        match action {
            Action::Attack { target } => {
                let target = index_of(participants, *target)?;
                let offense = participants[actor].effective(Stat::Attack);
                let defense = participants[target].effective(Stat::Defense);
                strike(participants, actor, target, offense, defense, ctx, rng, &mut resolution);
            }

            Action::Skill { skill, target } => {
                let def = ctx
                    .catalog
                    .skill(skill)
                    .ok_or_else(|| BattleError::UnknownSkill(skill.clone()))?
                    .clone();
                let target = index_of(participants, *target)?;
                use_skill(participants, actor, target, &def, ctx, rng, &mut resolution)?;
            }

            Action::Item { item, target } => {
                let def = ctx
                    .catalog
                    .item(item)
                    .ok_or_else(|| BattleError::UnknownItem(item.clone()))?
                    .clone();
                let target = index_of(participants, *target)?;
                let (holder, team) = (participants[actor].id, participants[actor].team);
                ctx.inventory.consume(holder, team, item)?;
                resolution.push(EffectRecord::on_self(
                    holder,
                    EffectKind::ItemConsumed { item: item.clone() },
                ));
                use_item(participants, actor, target, &def.effect, ctx.config, &mut resolution);
            }

            Action::Guard => {
                let multiplier = ctx.config.guard_multiplier;
                let p = &mut participants[actor];
                p.guard = Some(multiplier);
                resolution.push(EffectRecord::on_self(p.id, EffectKind::Guarding { multiplier }));
            }

            Action::Talk { target, tone } => {
                let target = index_of(participants, *target)?;
                talk(participants, actor, target, *tone, &mut resolution);
            }

            Action::Flee => flee(participants, actor, ctx.config, rng, &mut resolution),

            Action::Memory { op, stat } => {
                memory(&mut participants[actor], *op, *stat, ctx.config, &mut resolution)
            }
        }

        participants[actor].has_acted = true;
        Ok(resolution)
    }
}

/// Roll and apply one damaging hit
#[allow(clippy::too_many_arguments)]
fn strike(
    participants: &mut [Participant],
    actor: usize,
    target: usize,
    offense: i32,
    defense: i32,
    ctx: &ResolutionContext,
    rng: &mut BattleRng,
    resolution: &mut Resolution,
) {
    let config = ctx.config;
    let source = participants[actor].id;
    let target_id = participants[target].id;

    let chance = hit_chance(
        participants[actor].effective(Stat::Speed),
        participants[target].effective(Stat::Speed),
        config,
    );
    if !roll(chance, rng) {
        debug!(actor = %source, target = %target_id, chance, "Attack missed");
        resolution.hit = Some(false);
        resolution.push(EffectRecord::new(source, target_id, EffectKind::Miss));
        return;
    }

    let critical = roll(crit_chance(participants[actor].effective(Stat::Luck), config), rng);
    let variance = variance_factor(config, rng);
    let guard = participants[target].take_guard();
    let amount = compute_damage(
        &DamageRoll {
            offense,
            defense,
            multiplier: ctx.damage_multiplier,
            critical,
            guard,
        },
        variance,
        config,
    );

    let lost = participants[target].take_damage(amount);
    resolution.hit = Some(true);
    resolution.push(EffectRecord::new(
        source,
        target_id,
        EffectKind::Damage {
            amount: lost,
            critical,
        },
    ));
    if participants[target].is_downed() {
        resolution.push(EffectRecord::new(source, target_id, EffectKind::Downed));
    }
}

fn use_skill(
    participants: &mut [Participant],
    actor: usize,
    target: usize,
    def: &SkillDef,
    ctx: &ResolutionContext,
    rng: &mut BattleRng,
    resolution: &mut Resolution,
) -> Result<()> {
    let source = participants[actor].id;
    let target_id = participants[target].id;
    let config = ctx.config;

    participants[actor].spend_sp(def.sp_cost)?;
    if def.sp_cost > 0 {
        resolution.push(EffectRecord::on_self(
            source,
            EffectKind::SpSpent {
                amount: def.sp_cost,
            },
        ));
    }

    match &def.effect {
        SkillEffect::Damage { power } => {
            let (offense, defense) = if def.element.is_physical() {
                (
                    participants[actor].effective(Stat::Attack),
                    participants[target].effective(Stat::Defense),
                )
            } else {
                (
                    participants[actor].effective(Stat::Magic),
                    participants[target].effective(Stat::Magic),
                )
            };
            strike(
                participants,
                actor,
                target,
                offense + power,
                defense,
                ctx,
                rng,
                resolution,
            );
        }

        SkillEffect::Heal { power } => {
            let amount = power + participants[actor].effective(Stat::Magic) / 2;
            heal_or_revive(&mut participants[target], source, amount, resolution);
        }

        SkillEffect::Status {
            status,
            duration,
            potency,
            chance,
        } => {
            if roll(*chance, rng) {
                participants[target].statuses.apply(
                    *status,
                    *duration,
                    *potency,
                    config.status_max_stacks,
                );
                resolution.push(EffectRecord::new(
                    source,
                    target_id,
                    EffectKind::StatusApplied {
                        status: *status,
                        duration: *duration,
                    },
                ));
            } else {
                resolution.push(EffectRecord::new(
                    source,
                    target_id,
                    EffectKind::StatusResisted { status: *status },
                ));
            }
        }

        SkillEffect::Buff {
            stat,
            amount,
            duration,
        } => match StatusKind::buff_for(*stat) {
            Some(kind) => {
                let duration = if *duration == 0 {
                    DEFAULT_BUFF_DURATION
                } else {
                    *duration
                };
                participants[target].statuses.apply(
                    kind,
                    duration,
                    *amount,
                    config.status_max_stacks,
                );
                resolution.push(EffectRecord::new(
                    source,
                    target_id,
                    EffectKind::StatusApplied {
                        status: kind,
                        duration,
                    },
                ));
            }
            None => resolution.push(EffectRecord::info(
                source,
                format!("{} cannot be buffed", stat),
            )),
        },

        SkillEffect::Cleanse => {
            for status in participants[target].statuses.clear_negative() {
                resolution.push(EffectRecord::new(
                    source,
                    target_id,
                    EffectKind::StatusRemoved { status },
                ));
            }
        }
    }

    Ok(())
}

fn heal_or_revive(
    target: &mut Participant,
    source: ParticipantId,
    amount: i32,
    resolution: &mut Resolution,
) {
    if target.is_downed() {
        let hp = target.revive(amount);
        resolution.push(EffectRecord::new(source, target.id, EffectKind::Revived { hp }));
    } else {
        let amount = target.heal(amount);
        resolution.push(EffectRecord::new(source, target.id, EffectKind::Heal { amount }));
    }
}

fn use_item(
    participants: &mut [Participant],
    actor: usize,
    target: usize,
    effect: &ItemEffect,
    config: &EngineConfig,
    resolution: &mut Resolution,
) {
    let source = participants[actor].id;
    let t = &mut participants[target];

    match effect {
        ItemEffect::Heal { amount } => {
            let amount = t.heal(*amount);
            resolution.push(EffectRecord::new(source, t.id, EffectKind::Heal { amount }));
        }
        ItemEffect::RestoreSp { amount } => {
            let amount = t.restore_sp(*amount);
            resolution.push(EffectRecord::new(source, t.id, EffectKind::SpRestored { amount }));
        }
        ItemEffect::Revive { percent } => {
            let amount = (t.stats.max_hp as f32 * percent.clamp(0.0, 1.0)).round() as i32;
            let hp = t.revive(amount);
            resolution.push(EffectRecord::new(source, t.id, EffectKind::Revived { hp }));
        }
        ItemEffect::Damage { amount } => {
            let amount = match t.take_guard() {
                Some(guard) => ((*amount as f32 * guard).round() as i32).max(1),
                None => *amount,
            };
            let lost = t.take_damage(amount);
            resolution.push(EffectRecord::new(
                source,
                t.id,
                EffectKind::Damage {
                    amount: lost,
                    critical: false,
                },
            ));
            if t.is_downed() {
                resolution.push(EffectRecord::new(source, t.id, EffectKind::Downed));
            }
        }
        ItemEffect::Cure { status } => {
            let removed = match status {
                Some(kind) => {
                    if t.statuses.remove(*kind) {
                        vec![*kind]
                    } else {
                        Vec::new()
                    }
                }
                None => t.statuses.clear_negative(),
            };
            if removed.is_empty() {
                resolution.push(EffectRecord::info(source, format!("{} had nothing to cure", t.name)));
            }
            for status in removed {
                resolution.push(EffectRecord::new(source, t.id, EffectKind::StatusRemoved { status }));
            }
        }
        ItemEffect::ApplyStatus {
            status,
            duration,
            potency,
        } => {
            t.statuses
                .apply(*status, *duration, *potency, config.status_max_stacks);
            resolution.push(EffectRecord::new(
                source,
                t.id,
                EffectKind::StatusApplied {
                    status: *status,
                    duration: *duration,
                },
            ));
        }
    }
}

fn talk(
    participants: &mut [Participant],
    actor: usize,
    target: usize,
    tone: TalkTone,
    resolution: &mut Resolution,
) {
    let source = participants[actor].id;
    let t = &mut participants[target];
    let change = t.morale.talk(tone);

    resolution.push(EffectRecord::new(
        source,
        t.id,
        EffectKind::MoraleChanged {
            from: change.from,
            to: change.to,
        },
    ));
    if change.spared() {
        t.guard = None;
        resolution.push(EffectRecord::new(source, t.id, EffectKind::Spared));
    }
}

fn flee(
    participants: &mut [Participant],
    actor: usize,
    config: &EngineConfig,
    rng: &mut BattleRng,
    resolution: &mut Resolution,
) {
    let team = participants[actor].team;
    let speed = participants[actor].effective(Stat::Speed) as f32;

    let opponents: Vec<i32> = participants
        .iter()
        .filter(|p| p.team != team && p.is_active())
        .map(|p| p.effective(Stat::Speed))
        .collect();
    let opposing_speed = if opponents.is_empty() {
        speed
    } else {
        opponents.iter().sum::<i32>() as f32 / opponents.len() as f32
    };

    let chance = (config.flee_base_chance + (speed - opposing_speed) * config.flee_speed_factor)
        .clamp(config.flee_min_chance, config.flee_max_chance);

    let p = &mut participants[actor];
    if roll(chance, rng) {
        match team {
            Team::Player => resolution.escaped = true,
            Team::Enemy => p.fled = true,
        }
        resolution.push(EffectRecord::on_self(p.id, EffectKind::Fled));
    } else {
        resolution.push(EffectRecord::on_self(p.id, EffectKind::FleeFailed { chance }));
    }
}

fn memory(
    p: &mut Participant,
    op: MemoryOp,
    stat: Stat,
    config: &EngineConfig,
    resolution: &mut Resolution,
) {
    match op {
        MemoryOp::Add | MemoryOp::Subtract => {
            let amount = p.memory_source_value(stat);
            let value = if op == MemoryOp::Add {
                p.memory.add(amount, stat)
            } else {
                p.memory.subtract(amount, stat)
            };
            resolution.push(EffectRecord::on_self(
                p.id,
                EffectKind::MemoryStored { op, stat, value },
            ));
        }

        MemoryOp::Recall => {
            let amount = p.memory.recall_amount();
            match StatusKind::buff_for(stat) {
                Some(kind) if amount > 0 => {
                    p.statuses.apply(
                        kind,
                        config.memory_buff_duration,
                        amount,
                        config.status_max_stacks,
                    );
                    resolution.push(EffectRecord::on_self(
                        p.id,
                        EffectKind::MemoryRecalled { stat, amount },
                    ));
                }
                Some(_) => resolution.push(EffectRecord::info(
                    p.id,
                    format!("{}'s memory is empty; recall has no effect", p.name),
                )),
                None => resolution.push(EffectRecord::info(
                    p.id,
                    format!("{} is not a combat stat; recall has no effect", stat),
                )),
            }
        }

        MemoryOp::Clear => {
            p.memory.clear();
            resolution.push(EffectRecord::on_self(p.id, EffectKind::MemoryCleared));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::inventory::BasicInventory;
    use crate::battle::participant::Stats;
    use crate::content::catalog::ItemDef;
    use crate::core::types::Element;
    use rand::SeedableRng;

    fn exact_config() -> EngineConfig {
        EngineConfig {
            damage_variance: 0.0,
            base_hit_chance: 1.0,
            evasion_per_speed: 0.0,
            crit_per_luck: 0.0,
            ..EngineConfig::default()
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.insert_skill(SkillDef {
            id: "fire".into(),
            name: "Fire".into(),
            sp_cost: 5,
            element: Element::Fire,
            target: TargetRule::Enemy,
            effect: SkillEffect::Damage { power: 10 },
        });
        catalog.insert_skill(SkillDef {
            id: "cure".into(),
            name: "Cure".into(),
            sp_cost: 3,
            element: Element::Holy,
            target: TargetRule::Ally,
            effect: SkillEffect::Heal { power: 10 },
        });
        catalog.insert_item(ItemDef {
            id: "potion".into(),
            name: "Potion".into(),
            target: TargetRule::Ally,
            effect: ItemEffect::Heal { amount: 25 },
        });
        catalog.insert_item(ItemDef {
            id: "bomb".into(),
            name: "Bomb".into(),
            target: TargetRule::Enemy,
            effect: ItemEffect::Damage { amount: 20 },
        });
        catalog
    }

    fn field() -> Vec<Participant> {
        let hero = Stats {
            max_hp: 50,
            max_sp: 10,
            attack: 10,
            defense: 0,
            magic: 6,
            speed: 5,
            luck: 0,
        };
        let slime = Stats {
            max_hp: 100,
            attack: 10,
            defense: 4,
            magic: 4,
            speed: 3,
            ..Stats::default()
        };
        vec![
            Participant::new(ParticipantId(0), "Hero", Team::Player, hero),
            Participant::new(ParticipantId(1), "Slime", Team::Enemy, slime),
        ]
    }

    struct Fixture {
        catalog: Catalog,
        config: EngineConfig,
        inventory: BasicInventory,
        participants: Vec<Participant>,
        rng: BattleRng,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                catalog: catalog(),
                config: exact_config(),
                inventory: BasicInventory::new(),
                participants: field(),
                rng: BattleRng::seed_from_u64(7),
            }
        }

        fn run(&mut self, actor: u32, action: Action) -> Result<Resolution> {
            let mut ctx = ResolutionContext {
                catalog: &self.catalog,
                config: &self.config,
                inventory: &mut self.inventory,
                escapable: true,
                damage_multiplier: 1.0,
            };
            ActionExecutor::new().execute(
                ParticipantId(actor),
                &action,
                &mut self.participants,
                &mut ctx,
                &mut self.rng,
            )
        }
    }

    #[test]
    fn test_attack_damage_matches_log() {
        let mut fx = Fixture::new();
        let result = fx
            .run(0, Action::Attack { target: ParticipantId(1) })
            .unwrap();
        assert_eq!(result.hit, Some(true));
        assert_eq!(fx.participants[1].hp(), 92);
        assert_eq!(result.effects[0].hp_lost(), 8);
    }

    #[test]
    fn test_attack_on_ally_rejected_without_mutation() {
        let mut fx = Fixture::new();
        let err = fx
            .run(0, Action::Attack { target: ParticipantId(0) })
            .unwrap_err();
        assert!(matches!(err, BattleError::InvalidCommand(_)));
        assert_eq!(fx.participants[0].hp(), 50);
        assert!(!fx.participants[0].has_acted);
    }

    #[test]
    fn test_skill_insufficient_sp_leaves_state() {
        let mut fx = Fixture::new();
        fx.participants[0].set_sp(2);
        let err = fx
            .run(
                0,
                Action::Skill {
                    skill: "fire".into(),
                    target: ParticipantId(1),
                },
            )
            .unwrap_err();
        assert!(matches!(err, BattleError::InsufficientResource { needed: 5, available: 2 }));
        assert_eq!(fx.participants[0].sp(), 2);
        assert_eq!(fx.participants[1].hp(), 100);
    }

    #[test]
    fn test_magic_skill_uses_magic() {
        let mut fx = Fixture::new();
        fx.run(
            0,
            Action::Skill {
                skill: "fire".into(),
                target: ParticipantId(1),
            },
        )
        .unwrap();
        // (6 + 10) - 4 / 2
        assert_eq!(fx.participants[1].hp(), 86);
        assert_eq!(fx.participants[0].sp(), 5);
    }

    #[test]
    fn test_heal_skill_revives_downed_ally() {
        let mut fx = Fixture::new();
        fx.participants.push(
            Participant::new(ParticipantId(2), "Mage", Team::Player, Stats {
                max_hp: 30,
                ..Stats::default()
            })
            .with_hp(0),
        );
        let result = fx
            .run(
                0,
                Action::Skill {
                    skill: "cure".into(),
                    target: ParticipantId(2),
                },
            )
            .unwrap();
        assert_eq!(fx.participants[2].hp(), 13);
        assert!(matches!(result.effects[1].kind, EffectKind::Revived { hp: 13 }));
    }

    #[test]
    fn test_item_unavailable() {
        let mut fx = Fixture::new();
        let err = fx
            .run(
                0,
                Action::Item {
                    item: "potion".into(),
                    target: ParticipantId(0),
                },
            )
            .unwrap_err();
        assert!(matches!(err, BattleError::ItemUnavailable(_)));
    }

    #[test]
    fn test_item_consumed_and_applied() {
        let mut fx = Fixture::new();
        fx.inventory.add_party("potion", 1);
        fx.participants[0].take_damage(30);
        fx.run(
            0,
            Action::Item {
                item: "potion".into(),
                target: ParticipantId(0),
            },
        )
        .unwrap();
        assert_eq!(fx.participants[0].hp(), 45);
        assert_eq!(fx.inventory.party["potion"], 0);
    }

    #[test]
    fn test_guard_halves_next_hit_only() {
        let mut fx = Fixture::new();
        fx.run(0, Action::Guard).unwrap();
        fx.run(1, Action::Attack { target: ParticipantId(0) }).unwrap();
        assert_eq!(fx.participants[0].hp(), 45);
        fx.run(1, Action::Attack { target: ParticipantId(0) }).unwrap();
        assert_eq!(fx.participants[0].hp(), 35);
    }

    #[test]
    fn test_guard_softens_item_damage() {
        let mut fx = Fixture::new();
        fx.inventory.add_party("bomb", 2);
        let bomb = Action::Item {
            item: "bomb".into(),
            target: ParticipantId(1),
        };
        fx.run(1, Action::Guard).unwrap();
        fx.run(0, bomb.clone()).unwrap();
        assert_eq!(fx.participants[1].hp(), 90);
        assert!(fx.participants[1].guard.is_none());
        fx.run(0, bomb).unwrap();
        assert_eq!(fx.participants[1].hp(), 70);
    }

    #[test]
    fn test_flee_disallowed_when_unescapable() {
        let mut fx = Fixture::new();
        let mut ctx = ResolutionContext {
            catalog: &fx.catalog,
            config: &fx.config,
            inventory: &mut fx.inventory,
            escapable: false,
            damage_multiplier: 1.0,
        };
        let err = ActionExecutor::new()
            .execute(ParticipantId(0), &Action::Flee, &mut fx.participants, &mut ctx, &mut fx.rng)
            .unwrap_err();
        assert!(matches!(err, BattleError::FleeDisallowed(_)));
    }

    #[test]
    fn test_boss_enemy_cannot_flee() {
        let mut fx = Fixture::new();
        fx.participants[1].boss = true;
        let err = fx.run(1, Action::Flee).unwrap_err();
        assert!(matches!(err, BattleError::FleeDisallowed(_)));
    }

    #[test]
    fn test_talk_until_spared() {
        let mut fx = Fixture::new();
        let mut spared = false;
        for _ in 0..4 {
            let result = fx
                .run(
                    0,
                    Action::Talk {
                        target: ParticipantId(1),
                        tone: TalkTone::Persuade,
                    },
                )
                .unwrap();
            spared |= result.effects.iter().any(|e| e.kind == EffectKind::Spared);
        }
        assert!(spared);
        assert!(!fx.participants[1].is_active());
        assert!(!fx.participants[1].is_downed());
    }

    #[test]
    fn test_memory_add_then_recall_half() {
        let mut fx = Fixture::new();
        fx.participants[0].stats.attack = 40;
        fx.run(0, Action::Memory { op: MemoryOp::Add, stat: Stat::Attack }).unwrap();
        let result = fx
            .run(0, Action::Memory { op: MemoryOp::Recall, stat: Stat::Attack })
            .unwrap();
        assert_eq!(
            result.effects[0].kind,
            EffectKind::MemoryRecalled {
                stat: Stat::Attack,
                amount: 20
            }
        );
        assert_eq!(fx.participants[0].effective(Stat::Attack), 60);
    }

    #[test]
    fn test_memory_clear_then_recall_is_informational() {
        let mut fx = Fixture::new();
        fx.run(0, Action::Memory { op: MemoryOp::Add, stat: Stat::Attack }).unwrap();
        fx.run(0, Action::Memory { op: MemoryOp::Clear, stat: Stat::Attack }).unwrap();
        let result = fx
            .run(0, Action::Memory { op: MemoryOp::Recall, stat: Stat::Attack })
            .unwrap();
        assert!(matches!(result.effects[0].kind, EffectKind::Info { .. }));
        assert_eq!(fx.participants[0].effective(Stat::Attack), 10);
    }

    #[test]
    fn test_recall_non_combat_stat_is_noop() {
        let mut fx = Fixture::new();
        fx.run(0, Action::Memory { op: MemoryOp::Add, stat: Stat::Hp }).unwrap();
        let result = fx
            .run(0, Action::Memory { op: MemoryOp::Recall, stat: Stat::Hp })
            .unwrap();
        assert!(matches!(result.effects[0].kind, EffectKind::Info { .. }));
        assert!(fx.participants[0].statuses.is_empty());
    }
}
