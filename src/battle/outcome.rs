//! Battle outcome, statistics and scoring
//!
//! The report is the only thing a battle hands upward; turning it into
//! rewards or save data is the caller's job.

use serde::{Deserialize, Serialize};

use crate::content::encounter::Rewards;
use crate::core::types::{BattleId, ParticipantId, Round, Team};

/// Terminal (or not yet terminal) result of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    #[default]
    Ongoing,
    Victory,
    Defeat,
    Escaped,
    /// Ended by the host at a turn boundary
    Aborted,
}

impl BattleOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BattleOutcome::Ongoing)
    }
}

/// Running totals kept while the battle is played
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattleStatistics {
    pub rounds: Round,
    pub actions: u32,
    /// HP removed from enemies
    pub player_damage: i64,
    /// HP removed from the party
    pub enemy_damage: i64,
    pub healing: i64,
    pub kills: u32,
    pub spared: u32,
    pub misses: u32,
    pub criticals: u32,
    pub best_combo: u32,
    pub phase_transitions: u32,
    pub tactics_triggered: u32,
    pub patterns_detected: u32,
}

impl BattleStatistics {
    /// Credit HP lost by a member of `victim_team`
    pub fn record_damage(&mut self, victim_team: Team, amount: i32) {
        match victim_team {
            Team::Enemy => self.player_damage += amount as i64,
            Team::Player => self.enemy_damage += amount as i64,
        }
    }
}

/// Final battle report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub battle_id: BattleId,
    pub seed: u64,
    pub outcome: BattleOutcome,
    pub survivors: Vec<ParticipantId>,
    pub defeated: Vec<ParticipantId>,
    pub spared: Vec<ParticipantId>,
    pub fled: Vec<ParticipantId>,
    /// Share of the party's total max HP still standing (0.0 to 1.0)
    pub party_hp_fraction: f32,
    /// Share of the enemies' total max HP still standing (0.0 to 1.0)
    pub enemy_hp_fraction: f32,
    pub rewards: Rewards,
    pub statistics: BattleStatistics,
}

/// Weights for different aspects of battle performance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Points for winning
    pub win_bonus: f32,
    /// Points deducted for losing
    pub defeat_penalty: f32,
    /// Points for getting away; sparing counts as a win
    pub escape_bonus: f32,
    /// Multiplier for (enemy loss % - party loss %)
    pub efficiency_weight: f32,
    /// Points per round left under the limit (rewards quick wins)
    pub speed_bonus: f32,
    /// Points for preserving party HP (1.0 = untouched)
    pub survival_weight: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            win_bonus: 1000.0,
            defeat_penalty: -500.0,
            escape_bonus: 100.0,
            efficiency_weight: 500.0,
            speed_bonus: 0.5,
            survival_weight: 200.0,
        }
    }
}

/// Detailed score report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleScore {
    pub outcome: BattleOutcome,
    pub rounds_taken: Round,
    pub party_loss_percent: f32,
    pub enemy_loss_percent: f32,
    pub efficiency_delta: f32,
    pub raw_score: f32,
}

/// Summarize a finished battle for tuning runs
pub fn calculate_score(report: &OutcomeReport, weights: &ScoreWeights, max_rounds: Round) -> BattleScore {
    let party_loss = 1.0 - report.party_hp_fraction.clamp(0.0, 1.0);
    let enemy_loss = 1.0 - report.enemy_hp_fraction.clamp(0.0, 1.0);
    let efficiency_delta = enemy_loss - party_loss;

    let mut score = match report.outcome {
        BattleOutcome::Victory => weights.win_bonus,
        BattleOutcome::Escaped => weights.escape_bonus,
        BattleOutcome::Defeat => weights.defeat_penalty,
        BattleOutcome::Aborted | BattleOutcome::Ongoing => 0.0,
    };

    score += efficiency_delta * weights.efficiency_weight;
    score += (1.0 - party_loss) * weights.survival_weight;

    if report.outcome == BattleOutcome::Victory {
        let rounds_saved = max_rounds.saturating_sub(report.statistics.rounds);
        score += rounds_saved as f32 * weights.speed_bonus;
    }

    BattleScore {
        outcome: report.outcome,
        rounds_taken: report.statistics.rounds,
        party_loss_percent: party_loss,
        enemy_loss_percent: enemy_loss,
        efficiency_delta,
        raw_score: score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: BattleOutcome, party: f32, enemy: f32, rounds: Round) -> OutcomeReport {
        OutcomeReport {
            battle_id: BattleId::new(),
            seed: 1,
            outcome,
            survivors: vec![],
            defeated: vec![],
            spared: vec![],
            fled: vec![],
            party_hp_fraction: party,
            enemy_hp_fraction: enemy,
            rewards: Rewards::default(),
            statistics: BattleStatistics {
                rounds,
                ..BattleStatistics::default()
            },
        }
    }

    #[test]
    fn test_outcome_terminal() {
        assert!(!BattleOutcome::Ongoing.is_terminal());
        assert!(BattleOutcome::Aborted.is_terminal());
    }

    #[test]
    fn test_clean_victory_beats_costly_one() {
        let weights = ScoreWeights::default();
        let clean = calculate_score(&report(BattleOutcome::Victory, 0.9, 0.0, 5), &weights, 100);
        let costly = calculate_score(&report(BattleOutcome::Victory, 0.1, 0.0, 5), &weights, 100);
        assert!(clean.raw_score > costly.raw_score);
        assert!((clean.efficiency_delta - 0.9).abs() < 0.001);
    }

    #[test]
    fn test_defeat_scores_below_victory() {
        let weights = ScoreWeights::default();
        let win = calculate_score(&report(BattleOutcome::Victory, 0.5, 0.0, 10), &weights, 100);
        let loss = calculate_score(&report(BattleOutcome::Defeat, 0.0, 0.5, 10), &weights, 100);
        assert!(win.raw_score > loss.raw_score);
        assert!(loss.raw_score < 0.0);
    }

    #[test]
    fn test_record_damage_by_victim_team() {
        let mut stats = BattleStatistics::default();
        stats.record_damage(Team::Enemy, 12);
        stats.record_damage(Team::Player, 5);
        assert_eq!(stats.player_damage, 12);
        assert_eq!(stats.enemy_damage, 5);
    }
}
