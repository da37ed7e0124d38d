//! Closed set of metrics an achievement requirement can read.
//!
//! Every metric maps to exactly one field or derived value of the settled
//! round through `Metric::resolve`. Adding a variant without a resolver arm
//! is a compile error.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    overall_share, Department, FinancialResult, MarketState, Segment, Severity, SupplyChainState,
    TeamId, TeamState,
};

/// Everything the ledger knows about one team after settlement.
#[derive(Clone, Copy, Debug)]
pub struct TeamContext<'a> {
    pub round: u32,
    /// Committed state after this round.
    pub team: &'a TeamState,
    /// State before this round was settled.
    pub previous: &'a TeamState,
    pub supply: &'a SupplyChainState,
    pub result: &'a FinancialResult,
    pub market: &'a MarketState,
    pub team_count: usize,
}

impl TeamContext<'_> {
    pub fn id(&self) -> &TeamId {
        &self.team.id
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    // financial
    Cash,
    Debt,
    Revenue,
    NetIncome,
    CumulativeRevenue,
    CumulativeNetIncome,
    ProfitMargin,
    RevenueGrowth,
    ProfitableStreak,
    CashDelta,
    // market
    OverallShare,
    SegmentShare,
    SegmentsPresent,
    MarketShareDelta,
    // operations
    UnitsSold,
    ProductionCapacity,
    FactoryEfficiency,
    DefectRate,
    FactoryCount,
    Utilization,
    // workforce
    Headcount,
    Morale,
    WorkforceEfficiency,
    TurnoverRate,
    SalaryIndex,
    // marketing
    BrandValue,
    BrandGrowth,
    MarketingSpend,
    // innovation
    ProductsLaunched,
    ActiveProducts,
    AverageQuality,
    MaxQuality,
    RdSpend,
    // sustainability
    EsgScore,
    EsgDelta,
    FactorySpend,
    // supply chain
    SupplierConcentration,
    GeographicDiversity,
    VulnerabilityCount,
    CriticalVulnerabilities,
    SupplyCostMultiplier,
    SupplyQuality,
    AverageSupplierRelationship,
    // trade
    TariffsPaid,
    CumulativeTariffs,
    TariffShare,
    // resilience
    ActiveDisruptions,
    DisruptionsWeathered,
    // competitive
    Rank,
    RoundsAsLeader,
    BalanceMultiplier,
    // milestones
    Round,
    RoundsPlayed,
}

fn money(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

fn ratio(num: f64, den: f64) -> f64 {
    if den.abs() < f64::EPSILON {
        0.0
    } else {
        num / den
    }
}

impl Metric {
    /// Metrics where a smaller value ranks better.
    pub fn lower_is_better(&self) -> bool {
        matches!(
            self,
            Metric::Debt
                | Metric::DefectRate
                | Metric::TurnoverRate
                | Metric::SupplierConcentration
                | Metric::VulnerabilityCount
                | Metric::CriticalVulnerabilities
                | Metric::SupplyCostMultiplier
                | Metric::TariffShare
                | Metric::ActiveDisruptions
                | Metric::Rank
        )
    }

    /// Metrics that need a segment scope.
    pub fn needs_scope(&self) -> bool {
        matches!(self, Metric::SegmentShare)
    }

    /// Value of the metric for one team this round.
    ///
    /// `scope` is only read by segment-scoped metrics; a missing scope reads 0.
    pub fn resolve(&self, ctx: &TeamContext<'_>, scope: Option<Segment>) -> f64 {
        let team = ctx.team;
        let prev = ctx.previous;
        let result = ctx.result;
        let supply = ctx.supply;
        match self {
            Metric::Cash => money(team.cash),
            Metric::Debt => money(team.debt),
            Metric::Revenue => money(result.revenue),
            Metric::NetIncome => money(result.net_income),
            Metric::CumulativeRevenue => money(team.cumulative_revenue),
            Metric::CumulativeNetIncome => money(team.cumulative_net_income),
            Metric::ProfitMargin => money(result.profit_margin()),
            Metric::RevenueGrowth => ratio(
                money(result.revenue) - money(prev.last_revenue),
                money(prev.last_revenue),
            ),
            Metric::ProfitableStreak => team.counters.profitable_streak as f64,
            Metric::CashDelta => money(result.cash_delta),

            Metric::OverallShare => overall_share(&result.market_share, ctx.market),
            Metric::SegmentShare => scope
                .and_then(|s| result.market_share.get(&s))
                .copied()
                .unwrap_or(0.0),
            Metric::SegmentsPresent => {
                result.market_share.values().filter(|s| **s > 0.0).count() as f64
            }
            Metric::MarketShareDelta => result.market_share_delta,

            Metric::UnitsSold => result.total_units() as f64,
            Metric::ProductionCapacity => result.production_capacity as f64,
            Metric::FactoryEfficiency => team.average_factory_efficiency(),
            Metric::DefectRate => team.average_defect_rate(),
            Metric::FactoryCount => team.factories.len() as f64,
            Metric::Utilization => ratio(
                result.total_units() as f64,
                result.production_capacity as f64,
            ),

            Metric::Headcount => team.workforce.headcount as f64,
            Metric::Morale => team.workforce.morale,
            Metric::WorkforceEfficiency => team.workforce.efficiency,
            Metric::TurnoverRate => team.workforce.turnover_rate,
            Metric::SalaryIndex => team.workforce.salary_index,

            Metric::BrandValue => team.brand_value,
            Metric::BrandGrowth => team.brand_value - prev.brand_value,
            Metric::MarketingSpend => money(result.spend(Department::Marketing)),

            Metric::ProductsLaunched => team.counters.products_launched as f64,
            Metric::ActiveProducts => team.launched_products().count() as f64,
            Metric::AverageQuality => team.average_product_quality(),
            Metric::MaxQuality => team
                .launched_products()
                .map(|p| p.quality)
                .fold(0.0, f64::max),
            Metric::RdSpend => money(result.spend(Department::Rd)),

            Metric::EsgScore => team.esg_score,
            Metric::EsgDelta => team.esg_score - prev.esg_score,
            Metric::FactorySpend => money(result.spend(Department::Factory)),

            Metric::SupplierConcentration => supply.concentration,
            Metric::GeographicDiversity => supply.geographic_diversity,
            Metric::VulnerabilityCount => supply.vulnerabilities.len() as f64,
            Metric::CriticalVulnerabilities => supply
                .vulnerabilities
                .iter()
                .filter(|v| v.severity == Severity::Critical)
                .count() as f64,
            Metric::SupplyCostMultiplier => supply.cost_multiplier,
            Metric::SupplyQuality => supply.quality_impact,
            Metric::AverageSupplierRelationship => {
                let active: Vec<f64> = supply
                    .suppliers
                    .iter()
                    .filter(|s| s.in_use())
                    .map(|s| s.relationship)
                    .collect();
                ratio(active.iter().sum(), active.len() as f64)
            }

            Metric::TariffsPaid => money(result.tariffs_paid),
            Metric::CumulativeTariffs => money(team.counters.tariffs_paid),
            Metric::TariffShare => ratio(money(result.tariffs_paid), money(result.cost_of_goods)),

            Metric::ActiveDisruptions => supply.disruptions.len() as f64,
            Metric::DisruptionsWeathered => team.counters.disruptions_weathered as f64,

            Metric::Rank => result.rank as f64,
            Metric::RoundsAsLeader => team.counters.rounds_as_leader as f64,
            Metric::BalanceMultiplier => result.balance_multiplier,

            Metric::Round => ctx.round as f64,
            Metric::RoundsPlayed => team.counters.rounds_played as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{GameProfile, Region};

    #[test]
    fn growth_metrics_read_against_previous_state() {
        let profile = GameProfile::default();
        let (mut previous, supply) = profile.new_team("a".into(), "A", Region::Europe);
        previous.last_revenue = Decimal::new(1_000, 0);
        let mut team = previous.clone();
        team.esg_score = previous.esg_score + 40.0;
        let mut result = FinancialResult::empty("a".into(), 2);
        result.revenue = Decimal::new(1_500, 0);
        let market = profile.initial_market();
        let ctx = TeamContext {
            round: 2,
            team: &team,
            previous: &previous,
            supply: &supply,
            result: &result,
            market: &market,
            team_count: 1,
        };
        assert!((Metric::RevenueGrowth.resolve(&ctx, None) - 0.5).abs() < 1e-12);
        assert!((Metric::EsgDelta.resolve(&ctx, None) - 40.0).abs() < 1e-12);
        assert_eq!(Metric::SegmentShare.resolve(&ctx, None), 0.0);
        assert_eq!(Metric::Round.resolve(&ctx, None), 2.0);
    }

    #[test]
    fn metric_names_are_snake_case() {
        let m: Metric = serde_yaml::from_str("supplier_concentration").unwrap();
        assert_eq!(m, Metric::SupplierConcentration);
        assert!(m.lower_is_better());
        assert!(!Metric::Revenue.lower_is_better());
    }
}
