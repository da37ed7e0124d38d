//! Balance adjuster (rubber-banding).
//!
//! Runs after allocation. The multiplier scales the financial outcome derived
//! from a team's share, never the share itself, so segment shares still sum to 1.

use serde::{Deserialize, Serialize};
use sim_core::{BalanceConfig, TeamId};
use std::collections::BTreeMap;
use tracing::debug;

/// A team's raw standing for the round (this round's unadjusted revenue).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceStanding {
    pub team: TeamId,
    pub value: f64,
}

/// Per-team multipliers. Every team gets an entry; 1.0 means no adjustment.
///
/// Teams trailing the leader by a relative gap above the threshold are boosted.
/// The leader is damped only when it leads alone and its lead over the
/// runner-up exceeds the threshold.
pub fn balance_multipliers(
    standings: &[BalanceStanding],
    config: &BalanceConfig,
) -> BTreeMap<TeamId, f64> {
    let mut out: BTreeMap<TeamId, f64> =
        standings.iter().map(|s| (s.team.clone(), 1.0)).collect();
    if !config.enabled || standings.len() < 2 {
        return out;
    }
    let value = |s: &BalanceStanding| if s.value.is_finite() { s.value.max(0.0) } else { 0.0 };
    let leader = standings.iter().map(value).fold(0.0, f64::max);
    if leader <= 0.0 {
        return out;
    }

    for s in standings {
        let gap = (leader - value(s)) / leader;
        if gap > config.threshold {
            let boost = ((gap - config.threshold) * config.boost_strength).min(config.max_boost);
            out.insert(s.team.clone(), 1.0 + boost);
        }
    }

    let leaders: Vec<&BalanceStanding> =
        standings.iter().filter(|s| value(*s) >= leader).collect();
    if let [top] = leaders.as_slice() {
        let runner_up = standings
            .iter()
            .filter(|s| s.team != top.team)
            .map(value)
            .fold(0.0, f64::max);
        let lead = (leader - runner_up) / leader;
        if lead > config.threshold {
            let penalty =
                ((lead - config.threshold) * config.penalty_strength).min(config.max_penalty);
            out.insert(top.team.clone(), 1.0 - penalty);
        }
    }
    debug!(teams = out.len(), "balance multipliers computed");
    out
}
