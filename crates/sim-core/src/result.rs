//! Per-team financial outcome of a settled round.

use crate::decisions::Department;
use crate::market::Segment;
use crate::team::TeamId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Financial statement and standing of one team for one round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialResult {
    pub team: TeamId,
    pub round: u32,
    pub revenue: Decimal,
    pub cost_of_goods: Decimal,
    pub operating_expenses: Decimal,
    pub interest: Decimal,
    pub tax: Decimal,
    pub net_income: Decimal,
    pub cash_delta: Decimal,
    /// Tariff surcharge paid on components this round.
    pub tariffs_paid: Decimal,
    /// Discretionary spend applied per department, after sanitizing.
    pub department_spend: BTreeMap<Department, Decimal>,
    pub units_sold: BTreeMap<Segment, u64>,
    /// Unadjusted segment shares from allocation.
    pub market_share: BTreeMap<Segment, f64>,
    /// Change of demand-weighted overall share against last round.
    pub market_share_delta: f64,
    /// 1-based rank among all teams.
    pub rank: u32,
    /// Catch-up multiplier applied to revenue (1.0 = none).
    pub balance_multiplier: f64,
    /// Production ceiling this round in units.
    pub production_capacity: u64,
    pub messages: Vec<String>,
    pub warnings: Vec<String>,
}

impl FinancialResult {
    pub fn empty(team: TeamId, round: u32) -> Self {
        Self {
            team,
            round,
            revenue: Decimal::ZERO,
            cost_of_goods: Decimal::ZERO,
            operating_expenses: Decimal::ZERO,
            interest: Decimal::ZERO,
            tax: Decimal::ZERO,
            net_income: Decimal::ZERO,
            cash_delta: Decimal::ZERO,
            tariffs_paid: Decimal::ZERO,
            department_spend: BTreeMap::new(),
            units_sold: BTreeMap::new(),
            market_share: BTreeMap::new(),
            market_share_delta: 0.0,
            rank: 0,
            balance_multiplier: 1.0,
            production_capacity: 0,
            messages: vec![],
            warnings: vec![],
        }
    }

    pub fn total_units(&self) -> u64 {
        self.units_sold.values().copied().fold(0u64, u64::saturating_add)
    }

    pub fn spend(&self, department: Department) -> Decimal {
        self.department_spend
            .get(&department)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Net margin, 0 without revenue.
    pub fn profit_margin(&self) -> Decimal {
        if self.revenue.is_zero() {
            Decimal::ZERO
        } else {
            self.net_income / self.revenue
        }
    }
}
