//! Per-department decisions a team submits each round.
//!
//! Every department is optional. A department that is missing or fails
//! validation is replaced by its `Default` (zero spend, no changes) during
//! settlement and the team is warned; the round continues for everyone.

use crate::market::{FeatureAxis, FeatureVector, Segment};
use crate::supply::{SupplierId, SupplyChainState};
use crate::team::{ProductId, TeamState};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Department a decision belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Factory,
    Hr,
    Marketing,
    Finance,
    Rd,
}

impl Department {
    pub fn as_str(&self) -> &'static str {
        match self {
            Department::Factory => "factory",
            Department::Hr => "hr",
            Department::Marketing => "marketing",
            Department::Finance => "finance",
            Department::Rd => "r&d",
        }
    }
}

/// Why a department decision was rejected.
#[derive(Debug, Error, PartialEq)]
pub enum DecisionError {
    #[error("{field} must be a non-negative amount")]
    NegativeAmount { field: &'static str },
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("{field} must be within [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
    },
    #[error("unknown product {0}")]
    UnknownProduct(String),
    #[error("unknown supplier {0}")]
    UnknownSupplier(String),
    #[error("unknown factory {0}")]
    UnknownFactory(String),
    #[error("sourcing shares sum to {0:.3}, above 1")]
    SourcingOverCommitted(f64),
    #[error("cannot fire {fires} of {headcount} employees")]
    TooManyFires { fires: u32, headcount: u32 },
    #[error("price must be positive")]
    NonPositivePrice,
}

fn non_negative(field: &'static str, v: Decimal) -> Result<(), DecisionError> {
    if v < Decimal::ZERO {
        return Err(DecisionError::NegativeAmount { field });
    }
    Ok(())
}

fn in_range(field: &'static str, v: f64, min: f64, max: f64) -> Result<(), DecisionError> {
    if !v.is_finite() {
        return Err(DecisionError::NonFinite { field });
    }
    if v < min || v > max {
        return Err(DecisionError::OutOfRange { field, min, max });
    }
    Ok(())
}

/// Kind of factory investment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Efficiency,
    Capacity,
    QualityControl,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FactoryUpgrade {
    pub factory_id: String,
    pub kind: UpgradeKind,
    pub investment: Decimal,
}

/// Volume share placed with one supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourcingOrder {
    pub supplier_id: SupplierId,
    pub volume_share: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryDecision {
    pub upgrades: Vec<FactoryUpgrade>,
    /// New sourcing split. Empty keeps last round's split.
    pub sourcing: Vec<SourcingOrder>,
    /// Safety-stock buffer in [0, 0.5]. `None` keeps the current buffer.
    pub safety_stock: Option<f64>,
    pub supplier_investment: BTreeMap<SupplierId, Decimal>,
    pub esg_investment: Decimal,
}

impl FactoryDecision {
    pub fn validate(
        &self,
        team: &TeamState,
        supply: &SupplyChainState,
    ) -> Result<(), DecisionError> {
        for up in &self.upgrades {
            non_negative("upgrade investment", up.investment)?;
            if !team.factories.iter().any(|f| f.id == up.factory_id) {
                return Err(DecisionError::UnknownFactory(up.factory_id.clone()));
            }
        }
        let mut total = 0.0;
        for order in &self.sourcing {
            in_range("volume share", order.volume_share, 0.0, 1.0)?;
            if supply.supplier(&order.supplier_id).is_none() {
                return Err(DecisionError::UnknownSupplier(order.supplier_id.0.clone()));
            }
            total += order.volume_share;
        }
        if total > 1.0 + 1e-9 {
            return Err(DecisionError::SourcingOverCommitted(total));
        }
        if let Some(buffer) = self.safety_stock {
            in_range("safety stock", buffer, 0.0, 0.5)?;
        }
        for (id, amount) in &self.supplier_investment {
            non_negative("supplier investment", *amount)?;
            if supply.supplier(id).is_none() {
                return Err(DecisionError::UnknownSupplier(id.0.clone()));
            }
        }
        non_negative("esg investment", self.esg_investment)?;
        Ok(())
    }

    pub fn total_spend(&self) -> Decimal {
        self.upgrades.iter().map(|u| u.investment).sum::<Decimal>()
            + self.supplier_investment.values().copied().sum::<Decimal>()
            + self.esg_investment
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrDecision {
    pub hires: u32,
    pub fires: u32,
    pub training_spend: Decimal,
    pub benefits_spend: Decimal,
    /// Relative salary change in [-0.2, 0.3].
    pub salary_adjustment: f64,
}

impl HrDecision {
    pub fn validate(&self, team: &TeamState) -> Result<(), DecisionError> {
        if self.fires > team.workforce.headcount {
            return Err(DecisionError::TooManyFires {
                fires: self.fires,
                headcount: team.workforce.headcount,
            });
        }
        non_negative("training spend", self.training_spend)?;
        non_negative("benefits spend", self.benefits_spend)?;
        in_range("salary adjustment", self.salary_adjustment, -0.2, 0.3)
    }
}

/// Marketing channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Digital,
    Television,
    Retail,
    Sponsorship,
}

/// One cell of the segment × channel spend matrix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketingSpend {
    pub segment: Segment,
    pub channel: Channel,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingDecision {
    pub spend: Vec<MarketingSpend>,
    pub prices: BTreeMap<ProductId, Decimal>,
}

impl MarketingDecision {
    pub fn validate(&self, team: &TeamState) -> Result<(), DecisionError> {
        for cell in &self.spend {
            non_negative("marketing spend", cell.amount)?;
        }
        for (id, price) in &self.prices {
            if team.product(id).is_none() {
                return Err(DecisionError::UnknownProduct(id.0.clone()));
            }
            if *price <= Decimal::ZERO {
                return Err(DecisionError::NonPositivePrice);
            }
        }
        Ok(())
    }

    pub fn total_spend(&self) -> Decimal {
        self.spend.iter().map(|c| c.amount).sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceDecision {
    pub borrow: Decimal,
    pub repay: Decimal,
    pub dividend: Decimal,
}

impl FinanceDecision {
    pub fn validate(&self, team: &TeamState) -> Result<(), DecisionError> {
        non_negative("borrow", self.borrow)?;
        non_negative("repay", self.repay)?;
        non_negative("dividend", self.dividend)?;
        if self.repay > team.debt + self.borrow {
            return Err(DecisionError::OutOfRange {
                field: "repay",
                min: 0.0,
                max: (team.debt + self.borrow).to_f64().unwrap_or(0.0),
            });
        }
        Ok(())
    }
}

/// Product-level R&D action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ProductAction {
    Develop {
        name: String,
        segment: Segment,
        features: FeatureVector,
        target_quality: f64,
        price: Decimal,
    },
    Improve {
        product_id: ProductId,
        axis: FeatureAxis,
        investment: Decimal,
    },
    Discontinue {
        product_id: ProductId,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdDecision {
    /// General budget spread over launched products' quality.
    pub budget: Decimal,
    pub actions: Vec<ProductAction>,
}

impl RdDecision {
    pub fn validate(&self, team: &TeamState) -> Result<(), DecisionError> {
        non_negative("r&d budget", self.budget)?;
        for action in &self.actions {
            match action {
                ProductAction::Develop {
                    features,
                    target_quality,
                    price,
                    ..
                } => {
                    if !features.is_finite() {
                        return Err(DecisionError::NonFinite { field: "features" });
                    }
                    in_range("target quality", *target_quality, 0.0, 100.0)?;
                    if *price <= Decimal::ZERO {
                        return Err(DecisionError::NonPositivePrice);
                    }
                }
                ProductAction::Improve {
                    product_id,
                    investment,
                    ..
                } => {
                    non_negative("improvement investment", *investment)?;
                    if team.product(product_id).is_none() {
                        return Err(DecisionError::UnknownProduct(product_id.0.clone()));
                    }
                }
                ProductAction::Discontinue { product_id } => {
                    if team.product(product_id).is_none() {
                        return Err(DecisionError::UnknownProduct(product_id.0.clone()));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn total_spend(&self) -> Decimal {
        self.budget
            + self
                .actions
                .iter()
                .map(|a| match a {
                    ProductAction::Improve { investment, .. } => *investment,
                    _ => Decimal::ZERO,
                })
                .sum::<Decimal>()
    }
}

/// Everything one team submits for a round.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionBundle {
    pub factory: Option<FactoryDecision>,
    pub hr: Option<HrDecision>,
    pub marketing: Option<MarketingDecision>,
    pub finance: Option<FinanceDecision>,
    pub rd: Option<RdDecision>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supply::Region;
    use crate::team::{TeamCounters, Workforce};

    fn team() -> TeamState {
        TeamState {
            id: "a".into(),
            name: "A".into(),
            home_region: Region::Europe,
            cash: Decimal::new(1_000_000, 0),
            debt: Decimal::new(100, 0),
            cumulative_revenue: Decimal::ZERO,
            cumulative_net_income: Decimal::ZERO,
            last_revenue: Decimal::ZERO,
            last_net_income: Decimal::ZERO,
            market_share: BTreeMap::new(),
            brand_value: 0.3,
            esg_score: 400.0,
            workforce: Workforce {
                headcount: 5,
                morale: 50.0,
                efficiency: 50.0,
                turnover_rate: 0.1,
                salary_index: 1.0,
            },
            products: vec![],
            factories: vec![],
            counters: TeamCounters::default(),
            next_product_seq: 0,
        }
    }

    #[test]
    fn hr_rejects_firing_more_than_headcount() {
        let d = HrDecision {
            fires: 6,
            ..Default::default()
        };
        assert_eq!(
            d.validate(&team()),
            Err(DecisionError::TooManyFires {
                fires: 6,
                headcount: 5
            })
        );
    }

    #[test]
    fn hr_rejects_nan_salary_adjustment() {
        let d = HrDecision {
            salary_adjustment: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            d.validate(&team()),
            Err(DecisionError::NonFinite { .. })
        ));
    }

    #[test]
    fn marketing_rejects_unknown_product_price() {
        let mut d = MarketingDecision::default();
        d.prices
            .insert(ProductId("ghost".into()), Decimal::new(100, 0));
        assert_eq!(
            d.validate(&team()),
            Err(DecisionError::UnknownProduct("ghost".into()))
        );
    }

    #[test]
    fn finance_rejects_over_repayment() {
        let d = FinanceDecision {
            repay: Decimal::new(500, 0),
            ..Default::default()
        };
        assert!(d.validate(&team()).is_err());
        let ok = FinanceDecision {
            borrow: Decimal::new(400, 0),
            repay: Decimal::new(500, 0),
            ..Default::default()
        };
        assert!(ok.validate(&team()).is_ok());
    }

    #[test]
    fn factory_rejects_unknown_supplier() {
        let supply = SupplyChainState {
            suppliers: vec![],
            ..Default::default()
        };
        let d = FactoryDecision {
            sourcing: vec![SourcingOrder {
                supplier_id: SupplierId("s1".into()),
                volume_share: 0.5,
            }],
            ..Default::default()
        };
        assert_eq!(
            d.validate(&team(), &supply),
            Err(DecisionError::UnknownSupplier("s1".into()))
        );
    }

    #[test]
    fn default_bundle_is_empty() {
        let b = DecisionBundle::default();
        assert!(b.factory.is_none() && b.hr.is_none() && b.rd.is_none());
    }
}
