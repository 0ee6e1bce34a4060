//! Rule selection and full-battle throughput

use std::sync::Arc;

use battle_core::battle::ai::{
    AiProfile, Bounds, ConditionSet, CounterStrategy, DecisionContext, Rule, RuleAction,
    RuleEvaluator, RuleSelection, SelectionInput, TargetStrategy,
};
use battle_core::battle::{BattleEngine, BattleSetup, Participant, Stats};
use battle_core::content::Catalog;
use battle_core::core::{BattleRng, EngineConfig, ParticipantId, Team};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;

fn side(team: Team, count: u32) -> Vec<Participant> {
    (0..count)
        .map(|i| {
            let stats = Stats {
                max_hp: 80 + i as i32 * 10,
                max_sp: 20,
                attack: 10,
                defense: 4,
                speed: 3 + i as i32,
                ..Stats::default()
            };
            Participant::new(ParticipantId(i), format!("{:?}{}", team, i), team, stats)
        })
        .collect()
}

fn rules() -> Vec<Rule> {
    vec![
        Rule::new(
            RuleAction::Attack {
                target: TargetStrategy::WeakestEnemy,
            },
            3,
        ),
        Rule::new(RuleAction::basic_attack(), 2),
        Rule::new(RuleAction::Guard, 1).when(ConditionSet {
            hp_percent: Some(Bounds::at_most(30.0)),
            ..ConditionSet::default()
        }),
        Rule::new(RuleAction::Flee, 1).when(ConditionSet {
            hp_percent: Some(Bounds::at_most(10.0)),
            ally_count: Some(Bounds::at_most(0.0)),
            ..ConditionSet::default()
        }),
    ]
}

fn bench_rule_selection(c: &mut Criterion) {
    let setup = BattleSetup::new(side(Team::Player, 4), side(Team::Enemy, 4));
    let participants = setup.into_participants();
    let catalog = Catalog::new();
    let counter = CounterStrategy::none();
    let rules = rules();
    let evaluator = RuleEvaluator::new();
    let mut rng = BattleRng::seed_from_u64(1);

    c.bench_function("select_rule_8_participants", |b| {
        b.iter(|| {
            let ctx = DecisionContext::new(&participants[5], &participants, 3);
            let input = SelectionInput {
                behavior: Default::default(),
                fallback: None,
                catalog: &catalog,
                counter: &counter,
            };
            black_box(evaluator.select(&rules, &ctx, &input, &mut rng))
        })
    });
}

fn bench_full_battle(c: &mut Criterion) {
    let catalog = Arc::new(Catalog::new());
    let profile = Arc::new(AiProfile::flat(rules(), None));
    let controlled = |team: Team| -> Vec<Participant> {
        side(team, 3)
            .into_iter()
            .map(|p| {
                p.with_profile(Arc::clone(&profile))
                    .with_controller(battle_core::core::Controller::Ai)
            })
            .collect()
    };

    c.bench_function("battle_3v3_to_completion", |b| {
        b.iter(|| {
            let setup = BattleSetup::new(controlled(Team::Player), controlled(Team::Enemy));
            let mut engine =
                BattleEngine::seeded(setup, Arc::clone(&catalog), EngineConfig::default(), 7)
                    .expect("engine builds");
            while !engine.is_over() && engine.round() < 200 {
                engine.advance_turn(None).expect("turn resolves");
            }
            black_box(engine.outcome())
        })
    });
}

criterion_group!(benches, bench_rule_selection, bench_full_battle);
criterion_main!(benches);
