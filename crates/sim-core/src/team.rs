//! Team-owned state: the company each team runs.

use crate::market::{FeatureVector, Segment};
use crate::supply::Region;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique team identifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TeamId {
    fn from(s: &str) -> Self {
        TeamId(s.to_string())
    }
}

/// Unique product identifier within a team.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Development status of a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    InDevelopment { rounds_remaining: u32 },
    Launched,
    Discontinued,
}

/// A handset model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub segment: Segment,
    /// Build quality on 0–100.
    pub quality: f64,
    pub features: FeatureVector,
    pub price: Decimal,
    /// Bill of materials per unit before supply, tariff and inflation effects.
    pub unit_cost: Decimal,
    pub status: ProductStatus,
}

impl Product {
    /// Whether the product can be sold in `segment` this round.
    pub fn qualifies_for(&self, segment: Segment) -> bool {
        self.segment == segment && self.status == ProductStatus::Launched
    }
}

/// A production site.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Factory {
    pub id: String,
    pub region: Region,
    /// Fraction of nominal capacity achieved, in [0,1].
    pub efficiency: f64,
    /// Nominal units per round.
    pub capacity: u64,
    /// Fraction of output scrapped, in [0,1].
    pub defect_rate: f64,
}

impl Factory {
    pub fn output(&self) -> f64 {
        self.capacity as f64 * self.efficiency.clamp(0.0, 1.0)
    }
}

/// Aggregated view of a team's employees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workforce {
    pub headcount: u32,
    /// Average morale on 0–100.
    pub morale: f64,
    /// Average efficiency on 0–100.
    pub efficiency: f64,
    /// Share of staff leaving per round, in [0,1].
    pub turnover_rate: f64,
    /// Salary level relative to the market (1.0 = market rate).
    pub salary_index: f64,
}

/// Running counters consumed by the achievement ledger.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamCounters {
    pub products_launched: u32,
    pub disruptions_weathered: u32,
    pub profitable_streak: u32,
    pub rounds_played: u32,
    pub tariffs_paid: Decimal,
    pub rounds_as_leader: u32,
}

/// Complete state of one team's company.
///
/// Owned by a single team and only changed by round settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TeamState {
    pub id: TeamId,
    pub name: String,
    pub home_region: Region,
    pub cash: Decimal,
    pub debt: Decimal,
    pub cumulative_revenue: Decimal,
    pub cumulative_net_income: Decimal,
    pub last_revenue: Decimal,
    pub last_net_income: Decimal,
    /// Segment -> share of that segment's units; shares across teams sum to at most 1.
    pub market_share: BTreeMap<Segment, f64>,
    /// Reputation in [0,1].
    pub brand_value: f64,
    /// ESG score on 0–1000.
    pub esg_score: f64,
    pub workforce: Workforce,
    pub products: Vec<Product>,
    pub factories: Vec<Factory>,
    #[serde(default)]
    pub counters: TeamCounters,
    /// Monotonic counter for product ids.
    #[serde(default)]
    pub next_product_seq: u64,
}

impl TeamState {
    pub fn share(&self, segment: Segment) -> f64 {
        self.market_share.get(&segment).copied().unwrap_or(0.0)
    }

    pub fn product(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }

    pub fn product_mut(&mut self, id: &ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| &p.id == id)
    }

    pub fn launched_products(&self) -> impl Iterator<Item = &Product> {
        self.products
            .iter()
            .filter(|p| p.status == ProductStatus::Launched)
    }

    /// Mean quality of launched products, 0 when none are on the market.
    pub fn average_product_quality(&self) -> f64 {
        let (sum, n) = self
            .launched_products()
            .fold((0.0, 0usize), |(s, n), p| (s + p.quality, n + 1));
        if n == 0 {
            0.0
        } else {
            sum / n as f64
        }
    }

    /// Nominal output of all factories after efficiency.
    pub fn factory_output(&self) -> f64 {
        self.factories.iter().map(Factory::output).sum()
    }

    /// Output-weighted defect rate, 0 without factories.
    pub fn average_defect_rate(&self) -> f64 {
        let total: f64 = self.factories.iter().map(Factory::output).sum();
        if total <= 0.0 {
            return 0.0;
        }
        self.factories
            .iter()
            .map(|f| f.output() * f.defect_rate.clamp(0.0, 1.0))
            .sum::<f64>()
            / total
    }

    pub fn average_factory_efficiency(&self) -> f64 {
        if self.factories.is_empty() {
            return 0.0;
        }
        self.factories.iter().map(|f| f.efficiency).sum::<f64>() / self.factories.len() as f64
    }

    pub fn allocate_product_id(&mut self) -> ProductId {
        self.next_product_seq += 1;
        ProductId(format!("{}-p{}", self.id.0, self.next_product_seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(eff: f64, cap: u64, defect: f64) -> Factory {
        Factory {
            id: "f".into(),
            region: Region::EastAsia,
            efficiency: eff,
            capacity: cap,
            defect_rate: defect,
        }
    }

    #[test]
    fn defect_rate_is_output_weighted() {
        let f1 = factory(1.0, 1000, 0.10);
        let f2 = factory(0.5, 1000, 0.02);
        let total = f1.output() + f2.output();
        let expected = (1000.0 * 0.10 + 500.0 * 0.02) / total;
        let team = TeamState {
            id: "t".into(),
            name: "T".into(),
            home_region: Region::NorthAmerica,
            cash: Decimal::ZERO,
            debt: Decimal::ZERO,
            cumulative_revenue: Decimal::ZERO,
            cumulative_net_income: Decimal::ZERO,
            last_revenue: Decimal::ZERO,
            last_net_income: Decimal::ZERO,
            market_share: BTreeMap::new(),
            brand_value: 0.5,
            esg_score: 500.0,
            workforce: Workforce {
                headcount: 10,
                morale: 60.0,
                efficiency: 60.0,
                turnover_rate: 0.05,
                salary_index: 1.0,
            },
            products: vec![],
            factories: vec![f1, f2],
            counters: TeamCounters::default(),
            next_product_seq: 0,
        };
        assert!((team.average_defect_rate() - expected).abs() < 1e-12);
        assert_eq!(team.average_product_quality(), 0.0);
    }
}
