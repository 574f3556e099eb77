//! One-step lookahead balance score for greedy team selection.

use crate::models::{TeamId, TEAM_COUNT};
use crate::sorting::CandidateKey;

use super::state::SchedulerState;

/// Score giving `weight` to `team` on top of the current totals.
///
/// Formula: `alpha * L' + (1 - alpha) * Emax'`
/// where `L' = (max - min) / sum` over the tentative per-team weights and
/// `Emax' = max / sum` over the tentative per-team event counts.
///
/// Lower score = better balanced after the assignment.
pub fn balance_score(
    weights: &[u64; TEAM_COUNT],
    events: &[u32; TEAM_COUNT],
    team: TeamId,
    weight: u64,
    alpha: f64,
) -> f64 {
    let mut w = *weights;
    let mut e = *events;
    w[team.index()] += weight;
    e[team.index()] += 1;

    let w_total: u64 = w.iter().sum();
    let w_max = w.iter().copied().max().unwrap_or(0);
    let w_min = w.iter().copied().min().unwrap_or(0);
    let load = if w_total == 0 {
        0.0
    } else {
        (w_max - w_min) as f64 / w_total as f64
    };

    let e_total: u32 = e.iter().sum();
    let e_max = e.iter().copied().max().unwrap_or(0);
    let event_peak = if e_total == 0 {
        0.0
    } else {
        f64::from(e_max) / f64::from(e_total)
    };

    alpha * load + (1.0 - alpha) * event_peak
}

/// Rank `candidates` for a unit of `weight` (best first).
pub fn rank_candidates(
    candidates: &[TeamId],
    state: &SchedulerState,
    weight: u64,
    alpha: f64,
) -> Vec<CandidateKey> {
    let weights = state.total_weights();
    let events = state.total_events();
    let mut keys: Vec<CandidateKey> = candidates
        .iter()
        .map(|&team| CandidateKey {
            score: balance_score(weights, events, team, weight, alpha),
            current_weight: weights[team.index()],
            current_events: events[team.index()],
            team,
        })
        .collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: u8) -> TeamId {
        TeamId::new(id).unwrap()
    }

    #[test]
    fn test_empty_state_scores_are_equal() {
        let weights = [0; TEAM_COUNT];
        let events = [0; TEAM_COUNT];
        let a = balance_score(&weights, &events, team(1), 5, 0.5);
        let b = balance_score(&weights, &events, team(10), 5, 0.5);
        assert_eq!(a, b);
        // L' = 5/5, Emax' = 1/1
        assert!((a - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_trades_weight_against_events() {
        // Team 1 carries weight 10 with no events, team 2 weight 2 with one event.
        let mut state = SchedulerState::new();
        state.seed_totals(team(1), 10, 0);
        state.seed_totals(team(2), 2, 1);
        let candidates = [team(1), team(2)];

        let by_events = rank_candidates(&candidates, &state, 5, 0.0);
        assert_eq!(by_events[0].team, team(1));

        let by_weight = rank_candidates(&candidates, &state, 5, 1.0);
        assert_eq!(by_weight[0].team, team(2));
    }

    #[test]
    fn test_ties_fall_back_to_team_id() {
        let state = SchedulerState::new();
        let ranked = rank_candidates(&[team(9), team(3), team(2)], &state, 4, 1.0);
        let ids: Vec<u8> = ranked.iter().map(|k| k.team.get()).collect();
        assert_eq!(ids, vec![2, 3, 9]);
    }
}
