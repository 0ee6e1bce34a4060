//! Headless Battle Runner
//!
//! Plays encounters from a content pack with an AI-driven party and prints
//! outcome scores, for balancing runs.

use std::path::PathBuf;
use std::sync::Arc;

use battle_core::battle::ai::{AiProfile, Rule, RuleAction};
use battle_core::battle::{calculate_score, BattleEngine, BattleSetup, ScoreWeights};
use battle_core::content::{Catalog, ContentPack};
use battle_core::core::{BattleError, Controller, EngineConfig, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Headless Battle Runner - auto-played encounters for balancing
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run encounters with an AI-controlled party and output scores")]
struct Args {
    /// Content pack (TOML) with skills, items, enemies, encounters and party
    #[arg(long, default_value = "data/content/demo.toml")]
    content: PathBuf,

    /// Encounter id from the content pack
    #[arg(long)]
    encounter: String,

    /// Engine configuration (TOML); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Number of battles, seeded `seed..seed + runs`
    #[arg(long, default_value_t = 1)]
    runs: u64,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Log every battle event to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct BattleResult {
    seed: u64,
    outcome: String,
    rounds: u32,
    party_loss_percent: f32,
    enemy_loss_percent: f32,
    efficiency_delta: f32,
    score: f32,
    best_combo: u32,
    phase_transitions: u32,
    tactics_triggered: u32,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&args) {
        error!(error = %err, "Battle runner failed");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let pack = ContentPack::load(&args.content)?;
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let catalog = Arc::new(pack.catalog());
    let seed = args.seed.unwrap_or_else(rand::random);

    info!(encounter = %args.encounter, seed, runs = args.runs, "Starting battles");

    let results: Vec<Result<BattleResult>> = if args.runs > 1 {
        let end = seed_range_end(seed, args.runs)?;
        (seed..end)
            .into_par_iter()
            .map(|run_seed| play(&pack, &catalog, &config, &args.encounter, run_seed, args.verbose))
            .collect()
    } else {
        vec![play(&pack, &catalog, &config, &args.encounter, seed, args.verbose)]
    };
    let results = results.into_iter().collect::<Result<Vec<_>>>()?;

    match args.format.as_str() {
        "text" => print_text(&results),
        "json" => print_json(&results)?,
        other => {
            warn!(format = other, "Unknown format, defaulting to json");
            print_json(&results)?;
        }
    }
    Ok(())
}

/// End of the `seed..seed + runs` range
fn seed_range_end(seed: u64, runs: u64) -> Result<u64> {
    seed.checked_add(runs).ok_or_else(|| {
        BattleError::Config(format!("seed {} plus {} runs overflows u64", seed, runs))
    })
}

/// Party members without a profile just attack
fn autopilot() -> Arc<AiProfile> {
    Arc::new(AiProfile::flat(
        vec![Rule::new(RuleAction::basic_attack(), 1)],
        None,
    ))
}

fn play(
    pack: &ContentPack,
    catalog: &Arc<Catalog>,
    config: &EngineConfig,
    encounter_id: &str,
    seed: u64,
    verbose: bool,
) -> Result<BattleResult> {
    let encounter = pack.encounter(encounter_id)?;
    let party = pack
        .party_members()
        .into_iter()
        .map(|member| {
            let profile = member.profile.clone().unwrap_or_else(autopilot);
            member.with_profile(profile).with_controller(Controller::Ai)
        })
        .collect();
    let setup = BattleSetup::from_encounter(encounter, catalog, party)?
        .with_inventory(pack.party_inventory());

    let mut engine = BattleEngine::seeded(setup, Arc::clone(catalog), config.clone(), seed)?;
    let mut printed = 0;
    while !engine.is_over() {
        if engine.round() > config.max_rounds {
            warn!(seed, rounds = engine.round(), "Round limit reached, aborting");
            engine.abort()?;
            break;
        }
        engine.advance_turn(None)?;
        if verbose {
            for event in engine.log().since(printed) {
                debug!(round = event.round, kind = ?event.kind, "{}", event.description);
            }
            printed = engine.log().len();
        }
    }

    let report = engine
        .report()
        .ok_or_else(|| BattleError::InvalidCommand("battle ended without an outcome".into()))?;
    let score = calculate_score(&report, &ScoreWeights::default(), config.max_rounds);
    info!(seed, outcome = ?report.outcome, score = score.raw_score, "Battle finished");

    Ok(BattleResult {
        seed,
        outcome: format!("{:?}", score.outcome),
        rounds: score.rounds_taken,
        party_loss_percent: score.party_loss_percent,
        enemy_loss_percent: score.enemy_loss_percent,
        efficiency_delta: score.efficiency_delta,
        score: score.raw_score,
        best_combo: report.statistics.best_combo,
        phase_transitions: report.statistics.phase_transitions,
        tactics_triggered: report.statistics.tactics_triggered,
    })
}

fn print_json(results: &[BattleResult]) -> Result<()> {
    let output = if results.len() == 1 {
        serde_json::to_string_pretty(&results[0])
    } else {
        serde_json::to_string_pretty(results)
    };
    let output = output.map_err(|e| BattleError::Config(e.to_string()))?;
    println!("{}", output);
    Ok(())
}

fn print_text(results: &[BattleResult]) {
    for result in results {
        println!("Battle Result (seed {})", result.seed);
        println!("=============");
        println!("Outcome: {}", result.outcome);
        println!("Rounds: {}", result.rounds);
        println!("Party losses: {:.1}%", result.party_loss_percent * 100.0);
        println!("Enemy losses: {:.1}%", result.enemy_loss_percent * 100.0);
        println!("Efficiency delta: {:.3}", result.efficiency_delta);
        println!("Score: {:.1}", result.score);
        println!(
            "Best combo: {}, phase changes: {}, tactics: {}",
            result.best_combo, result.phase_transitions, result.tactics_triggered
        );
        println!();
    }
    if results.len() > 1 {
        let mean = results.iter().map(|r| r.score).sum::<f32>() / results.len() as f32;
        println!("Mean score over {} runs: {:.1}", results.len(), mean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_range_end() {
        assert_eq!(seed_range_end(10, 5).unwrap(), 15);
        assert!(matches!(
            seed_range_end(u64::MAX - 1, 5),
            Err(BattleError::Config(_))
        ));
    }
}
