//! Battle engine integration tests

use std::path::Path;
use std::sync::Arc;

use battle_core::battle::ai::{AiProfile, Rule, RuleAction};
use battle_core::battle::*;
use battle_core::content::{Catalog, ContentPack};
use battle_core::core::{BattleError, BattleId, Controller, EngineConfig, ParticipantId, Stat, Team};
use proptest::prelude::*;

fn exact() -> EngineConfig {
    EngineConfig {
        damage_variance: 0.0,
        base_hit_chance: 1.0,
        evasion_per_speed: 0.0,
        crit_per_luck: 0.0,
        ..EngineConfig::default()
    }
}

fn fighter(name: &str, team: Team, hp: i32, attack: i32, speed: i32) -> Participant {
    let stats = Stats {
        max_hp: hp,
        attack,
        speed,
        ..Stats::default()
    };
    Participant::new(ParticipantId(0), name, team, stats)
}

fn always_attack() -> Arc<AiProfile> {
    Arc::new(AiProfile::flat(
        vec![Rule::new(RuleAction::basic_attack(), 1)],
        None,
    ))
}

fn demo_pack() -> ContentPack {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/content/demo.toml");
    ContentPack::load(&path).unwrap()
}

/// Demo encounter with the whole party on autopilot
fn autopiloted(pack: &ContentPack, encounter: &str) -> BattleSetup {
    let party = pack
        .party_members()
        .into_iter()
        .map(|member| {
            let profile = member.profile.clone().unwrap_or_else(always_attack);
            member.with_profile(profile).with_controller(Controller::Ai)
        })
        .collect();
    BattleSetup::from_encounter(pack.encounter(encounter).unwrap(), &pack.catalog(), party)
        .unwrap()
        .with_inventory(pack.party_inventory())
}

fn play_out(engine: &mut BattleEngine) {
    while !engine.is_over() {
        if engine.round() > engine.config().max_rounds {
            engine.abort().unwrap();
            break;
        }
        engine.advance_turn(None).unwrap();
    }
}

#[test]
fn test_hero_falls_to_steady_attacker() {
    let hero = fighter("Hero", Team::Player, 50, 1, 5);
    let brute = fighter("Brute", Team::Enemy, 100, 10, 1).with_profile(always_attack());
    let setup = BattleSetup::new(vec![hero], vec![brute]);
    let mut engine = BattleEngine::seeded(setup, Arc::new(Catalog::new()), exact(), 11).unwrap();

    let hero_id = ParticipantId(0);
    while !engine.is_over() {
        let command = (engine.current_actor() == Some(hero_id)).then(|| Action::Attack {
            target: ParticipantId(1),
        });
        engine.advance_turn(command).unwrap();
    }

    assert_eq!(engine.outcome(), BattleOutcome::Defeat);
    assert_eq!(engine.log().damage_taken_by(hero_id), 50);
    assert_eq!(engine.participant(ParticipantId(1)).unwrap().hp(), 95);
    assert!(engine.log().published().any(|(topic, _)| topic == "battle_lost"));

    let report = engine.report().unwrap();
    assert_eq!(report.party_hp_fraction, 0.0);
}

#[test]
fn test_same_seed_same_battle() {
    let pack = demo_pack();
    let catalog = Arc::new(pack.catalog());
    let id = BattleId::new();

    let run = |seed: u64| {
        let mut engine = BattleEngine::builder(autopiloted(&pack, "forest_ambush"), Arc::clone(&catalog))
            .seed(seed)
            .battle_id(id)
            .build()
            .unwrap();
        play_out(&mut engine);
        engine
    };

    let first = run(42);
    let second = run(42);
    assert!(first.is_over());
    assert_eq!(first.log(), second.log());
    assert_eq!(first.record(), second.record());
}

#[test]
fn test_replay_reproduces_mixed_battle() {
    let hero = fighter("Hero", Team::Player, 80, 12, 6);
    let wolf = fighter("Wolf", Team::Enemy, 40, 8, 4).with_profile(always_attack());
    let imp = fighter("Imp", Team::Enemy, 30, 6, 2).with_profile(always_attack());
    let setup = BattleSetup::new(vec![hero], vec![wolf, imp]);
    let catalog = Arc::new(Catalog::new());

    let mut engine =
        BattleEngine::seeded(setup.clone(), Arc::clone(&catalog), EngineConfig::default(), 99).unwrap();
    while !engine.is_over() {
        let command = match engine.current_actor() {
            Some(ParticipantId(0)) => {
                let target = engine
                    .participants()
                    .iter()
                    .find(|p| p.team == Team::Enemy && p.is_active())
                    .map(|p| p.id)
                    .unwrap();
                Some(Action::Attack { target })
            }
            _ => None,
        };
        engine.advance_turn(command).unwrap();
    }

    let replayed = replay(setup, catalog, EngineConfig::default(), engine.record()).unwrap();
    assert_eq!(replayed.outcome(), engine.outcome());
    assert_eq!(replayed.log(), engine.log());
}

#[test]
fn test_broken_profile_degrades_or_fails() {
    let touch = RuleAction::Skill {
        skill: "ghost_touch".into(),
        target: Default::default(),
    };
    let haunted = || {
        let hero = fighter("Hero", Team::Player, 50, 10, 9);
        let ghost = fighter("Ghost", Team::Enemy, 30, 5, 1).with_profile(Arc::new(AiProfile::flat(
            vec![Rule::new(touch.clone(), 1)],
            None,
        )));
        BattleSetup::new(vec![hero], vec![ghost])
    };

    let err = BattleEngine::seeded(haunted(), Arc::new(Catalog::new()), EngineConfig::strict(), 1)
        .err()
        .unwrap();
    assert!(matches!(err, BattleError::InvalidProfile(_)));

    let mut engine =
        BattleEngine::seeded(haunted(), Arc::new(Catalog::new()), exact(), 1).unwrap();
    assert!(engine
        .log()
        .iter()
        .any(|e| matches!(e.kind, BattleEventKind::Diagnostic { .. })));

    engine
        .advance_turn(Some(Action::Attack {
            target: ParticipantId(1),
        }))
        .unwrap();
    // unknown skill falls back to a basic attack
    let report = engine.advance_turn(None).unwrap();
    assert!(matches!(report.action, Action::Attack { .. }));
}

/// Hero acts, then the opponent answers
fn hero_turn(engine: &mut BattleEngine, action: Action) -> TurnReport {
    let report = engine.advance_turn(Some(action)).unwrap();
    engine.advance_turn(None).unwrap();
    report
}

#[test]
fn test_memory_register_through_engine() {
    let mut hero = fighter("Hero", Team::Player, 80, 40, 9);
    hero.stats.defense = 4;
    let dummy = fighter("Dummy", Team::Enemy, 500, 1, 1).with_profile(Arc::new(AiProfile::flat(
        vec![Rule::new(RuleAction::Guard, 1)],
        None,
    )));
    let setup = BattleSetup::new(vec![hero], vec![dummy]);
    let mut engine = BattleEngine::seeded(setup, Arc::new(Catalog::new()), exact(), 5).unwrap();

    let stored = hero_turn(
        &mut engine,
        Action::Memory {
            op: MemoryOp::Add,
            stat: Stat::Attack,
        },
    );
    assert!(stored.events.iter().any(|e| matches!(
        &e.kind,
        BattleEventKind::Effect(record)
            if record.kind == (EffectKind::MemoryStored { op: MemoryOp::Add, stat: Stat::Attack, value: 40 })
    )));

    hero_turn(
        &mut engine,
        Action::Memory {
            op: MemoryOp::Recall,
            stat: Stat::Attack,
        },
    );
    assert_eq!(
        engine.participant(ParticipantId(0)).unwrap().effective(Stat::Attack),
        60
    );

    hero_turn(
        &mut engine,
        Action::Memory {
            op: MemoryOp::Clear,
            stat: Stat::Attack,
        },
    );
    let recalled = hero_turn(
        &mut engine,
        Action::Memory {
            op: MemoryOp::Recall,
            stat: Stat::Attack,
        },
    );
    assert!(recalled.events.iter().any(|e| matches!(
        &e.kind,
        BattleEventKind::Effect(record) if matches!(record.kind, EffectKind::Info { .. })
    )));
}

#[test]
fn test_abort_reports_aborted() {
    let setup = BattleSetup::new(
        vec![fighter("Hero", Team::Player, 50, 10, 9)],
        vec![fighter("Slime", Team::Enemy, 30, 5, 1).with_profile(always_attack())],
    );
    let mut engine = BattleEngine::seeded(setup, Arc::new(Catalog::new()), exact(), 3).unwrap();
    assert!(engine.report().is_none());
    engine.abort().unwrap();

    let report = engine.report().unwrap();
    assert_eq!(report.outcome, BattleOutcome::Aborted);
    assert!(matches!(engine.abort(), Err(BattleError::BattleOver)));
    assert_eq!(calculate_score(&report, &ScoreWeights::default(), 200).outcome, BattleOutcome::Aborted);
}

#[test]
fn test_boss_encounter_cannot_flee() {
    let pack = demo_pack();
    let catalog = Arc::new(pack.catalog());
    let setup = autopiloted(&pack, "warden_keep");
    assert!(!setup.escapable);

    let mut engine = BattleEngine::seeded(setup, catalog, exact(), 8).unwrap();
    let actor = engine.current_actor().unwrap();
    if engine.participant(actor).unwrap().team == Team::Player {
        let before = engine.log().len();
        assert!(matches!(
            engine.advance_turn(Some(Action::Flee)),
            Err(BattleError::FleeDisallowed(_))
        ));
        assert_eq!(engine.log().len(), before);
    }
}

#[test]
fn test_demo_pack_validates() {
    let pack = demo_pack();
    let hooks = battle_core::battle::ai::PhaseHookRegistry::with_builtins();
    let findings = pack.validate(&|name: &str| hooks.contains(name));
    assert!(findings.is_empty(), "{:?}", findings);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_hp_and_sp_stay_in_bounds(seed in any::<u64>()) {
        let pack = demo_pack();
        let mut engine =
            BattleEngine::seeded(autopiloted(&pack, "forest_ambush"), Arc::new(pack.catalog()), EngineConfig::default(), seed)
                .unwrap();
        while !engine.is_over() && engine.round() <= 100 {
            engine.advance_turn(None).unwrap();
            for p in engine.participants() {
                prop_assert!(p.hp() >= 0 && p.hp() <= p.stats.max_hp);
                prop_assert!(p.sp() >= 0 && p.sp() <= p.stats.max_sp);
            }
        }
    }
}
