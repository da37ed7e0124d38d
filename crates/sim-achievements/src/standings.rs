//! Cross-team standings used to resolve `best` / `worst` targets.

use crate::metric::{Metric, TeamContext};
use sim_core::{Segment, TeamId};
use std::collections::{BTreeMap, BTreeSet};

/// Metric values of every team this round, per ranked metric.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Standings {
    values: BTreeMap<(Metric, Option<Segment>), BTreeMap<TeamId, f64>>,
}

impl Standings {
    /// Resolve each requested metric for every team.
    pub fn compute<'m>(
        contexts: &[TeamContext<'_>],
        metrics: impl IntoIterator<Item = &'m (Metric, Option<Segment>)>,
    ) -> Self {
        let unique: BTreeSet<(Metric, Option<Segment>)> = metrics.into_iter().copied().collect();
        let values = unique
            .into_iter()
            .map(|(metric, scope)| {
                let per_team = contexts
                    .iter()
                    .map(|ctx| (ctx.id().clone(), metric.resolve(ctx, scope)))
                    .collect();
                ((metric, scope), per_team)
            })
            .collect();
        Self { values }
    }

    fn better(metric: Metric, a: f64, b: f64) -> bool {
        if metric.lower_is_better() {
            a < b
        } else {
            a > b
        }
    }

    /// 1-based position of `team`, ties sharing the better position.
    pub fn position(&self, metric: Metric, scope: Option<Segment>, team: &TeamId) -> Option<u32> {
        let per_team = self.values.get(&(metric, scope))?;
        let own = *per_team.get(team)?;
        let ahead = per_team
            .values()
            .filter(|v| Self::better(metric, **v, own))
            .count();
        Some(ahead as u32 + 1)
    }

    /// No team is strictly better and at least one is strictly worse.
    pub fn is_best(&self, metric: Metric, scope: Option<Segment>, team: &TeamId) -> bool {
        self.extreme(metric, scope, team, |own, other| Self::better(metric, own, other))
    }

    /// No team is strictly worse and at least one is strictly better.
    pub fn is_worst(&self, metric: Metric, scope: Option<Segment>, team: &TeamId) -> bool {
        self.extreme(metric, scope, team, |own, other| Self::better(metric, other, own))
    }

    fn extreme(
        &self,
        metric: Metric,
        scope: Option<Segment>,
        team: &TeamId,
        beats: impl Fn(f64, f64) -> bool,
    ) -> bool {
        let Some(per_team) = self.values.get(&(metric, scope)) else {
            return false;
        };
        let Some(own) = per_team.get(team).copied() else {
            return false;
        };
        let ahead_of_someone = per_team.values().any(|v| beats(own, *v));
        let behind_someone = per_team.values().any(|v| beats(*v, own));
        ahead_of_someone && !behind_someone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standings(metric: Metric, values: &[(&str, f64)]) -> Standings {
        Standings {
            values: BTreeMap::from([(
                (metric, None),
                values.iter().map(|(t, v)| (TeamId::from(*t), *v)).collect(),
            )]),
        }
    }

    #[test]
    fn best_and_worst_follow_metric_direction() {
        let s = standings(Metric::Revenue, &[("a", 10.0), ("b", 30.0), ("c", 20.0)]);
        assert!(s.is_best(Metric::Revenue, None, &"b".into()));
        assert!(s.is_worst(Metric::Revenue, None, &"a".into()));
        assert_eq!(s.position(Metric::Revenue, None, &"c".into()), Some(2));

        let d = standings(Metric::Debt, &[("a", 10.0), ("b", 30.0)]);
        assert!(d.is_best(Metric::Debt, None, &"a".into()));
        assert!(d.is_worst(Metric::Debt, None, &"b".into()));
    }

    #[test]
    fn ties_share_the_top_but_a_full_tie_ranks_nobody() {
        let s = standings(Metric::EsgScore, &[("a", 800.0), ("b", 800.0), ("c", 500.0)]);
        assert!(s.is_best(Metric::EsgScore, None, &"a".into()));
        assert!(s.is_best(Metric::EsgScore, None, &"b".into()));
        assert!(s.is_worst(Metric::EsgScore, None, &"c".into()));

        let level = standings(Metric::EsgScore, &[("a", 800.0), ("b", 800.0)]);
        assert!(!level.is_best(Metric::EsgScore, None, &"a".into()));
        assert!(!level.is_worst(Metric::EsgScore, None, &"a".into()));

        let solo = standings(Metric::EsgScore, &[("a", 800.0)]);
        assert!(!solo.is_best(Metric::EsgScore, None, &"a".into()));
        assert!(!solo.is_worst(Metric::EsgScore, None, &"a".into()));
    }

    #[test]
    fn unknown_metric_or_team_is_not_ranked() {
        let s = standings(Metric::Revenue, &[("a", 1.0), ("b", 2.0)]);
        assert_eq!(s.position(Metric::Cash, None, &"a".into()), None);
        assert!(!s.is_best(Metric::Revenue, None, &"z".into()));
        assert!(!s.is_worst(Metric::Revenue, None, &"z".into()));
    }
}
