//! Department operations applied to a team before demand is allocated.
//!
//! Each function takes an already sanitized decision, mutates the team and
//! returns what the department spent. None of them can fail.

use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sim_core::{
    EsgThresholds, FactoryDecision, FinanceDecision, HrDecision, MarketingDecision,
    OperationsConfig, Product, ProductAction, ProductStatus, RdDecision, SupplyChainState,
    TeamState, UpgradeKind, VulnerabilityThresholds,
};
use tracing::debug;

/// `amount / unit` as a float, 0 for a non-positive unit.
pub(crate) fn per(amount: Decimal, unit: Decimal) -> f64 {
    if unit <= Decimal::ZERO {
        return 0.0;
    }
    amount
        .checked_div(unit)
        .and_then(|q| q.to_f64())
        .unwrap_or(0.0)
        .max(0.0)
}

pub(crate) fn to_decimal(v: f64) -> Decimal {
    if v.is_finite() {
        Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

/// Result of the HR step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HrOutcome {
    /// Training, benefits, hiring and severance.
    pub spend: Decimal,
    pub payroll: Decimal,
    pub leavers: u32,
}

/// Fires, hires, training, benefits, salary change, then seeded turnover.
pub fn apply_hr<R: Rng + ?Sized>(
    team: &mut TeamState,
    decision: &HrDecision,
    config: &OperationsConfig,
    rng: &mut R,
) -> HrOutcome {
    let wf = &mut team.workforce;
    let fires = decision.fires.min(wf.headcount);
    if fires > 0 && wf.headcount > 0 {
        let layoff_share = fires as f64 / wf.headcount as f64;
        wf.morale -= (layoff_share * 50.0).min(20.0);
    }
    wf.headcount -= fires;

    if decision.hires > 0 {
        let old = wf.headcount as f64;
        let new = decision.hires as f64;
        wf.efficiency = (wf.efficiency * old + 50.0 * new) / (old + new);
        wf.headcount = wf.headcount.saturating_add(decision.hires);
    }

    let cap = config.max_hr_gain_per_round;
    wf.efficiency += per(decision.training_spend, config.training_spend_per_point).min(cap);
    wf.morale += per(decision.benefits_spend, config.benefits_spend_per_point).min(cap);
    wf.salary_index = (wf.salary_index * (1.0 + decision.salary_adjustment)).clamp(0.5, 2.0);
    wf.morale += decision.salary_adjustment * 50.0;
    wf.morale = wf.morale.clamp(0.0, 100.0);
    wf.efficiency = wf.efficiency.clamp(0.0, 100.0);

    let morale_factor = 1.0 + (60.0 - wf.morale) / 100.0;
    let pay_factor = (2.0 - wf.salary_index).max(0.2);
    wf.turnover_rate = (config.base_turnover * morale_factor * pay_factor).clamp(0.01, 0.5);
    let jitter: f64 = rng.gen_range(0.8..=1.2);
    let leavers = ((wf.headcount as f64 * wf.turnover_rate * jitter).floor() as u32).min(wf.headcount);
    wf.headcount -= leavers;

    let spend = decision.training_spend
        + decision.benefits_spend
        + config.hire_cost * Decimal::from(decision.hires)
        + config.severance_cost * Decimal::from(fires);
    let payroll = config.salary_per_employee
        * Decimal::from(wf.headcount)
        * to_decimal(wf.salary_index);
    debug!(team = %team.id, headcount = team.workforce.headcount, leavers, "hr applied");
    HrOutcome {
        spend,
        payroll: payroll.round_dp(2),
        leavers,
    }
}

/// Result of the R&D step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RdOutcome {
    pub spend: Decimal,
    pub launched: Vec<String>,
    pub started: Vec<String>,
}

fn estimated_unit_cost(quality: f64, product: &sim_core::FeatureVector) -> Decimal {
    let features = product.clamped().sum() / 6.0;
    to_decimal(30.0 + quality * 1.5 + features * 0.5).round_dp(2)
}

/// Progress development, then apply the budget and product actions.
///
/// A product started this round launches after `development_rounds` further rounds.
pub fn apply_rd(team: &mut TeamState, decision: &RdDecision, config: &OperationsConfig) -> RdOutcome {
    let mut outcome = RdOutcome::default();

    for product in &mut team.products {
        if let ProductStatus::InDevelopment { rounds_remaining } = product.status {
            let left = rounds_remaining.saturating_sub(1);
            product.status = if left == 0 {
                outcome.launched.push(product.name.clone());
                ProductStatus::Launched
            } else {
                ProductStatus::InDevelopment {
                    rounds_remaining: left,
                }
            };
        }
    }

    let launched = team.launched_products().count();
    if launched > 0 && decision.budget > Decimal::ZERO {
        let points = per(decision.budget, config.rd_spend_per_quality_point) / launched as f64;
        for p in team
            .products
            .iter_mut()
            .filter(|p| p.status == ProductStatus::Launched)
        {
            p.quality = (p.quality + points * (100.0 - p.quality) / 100.0).clamp(0.0, 100.0);
        }
    }
    outcome.spend += decision.budget;

    for action in &decision.actions {
        match action {
            ProductAction::Develop {
                name,
                segment,
                features,
                target_quality,
                price,
            } => {
                let id = team.allocate_product_id();
                let status = if config.development_rounds == 0 {
                    outcome.launched.push(name.clone());
                    ProductStatus::Launched
                } else {
                    ProductStatus::InDevelopment {
                        rounds_remaining: config.development_rounds,
                    }
                };
                team.products.push(Product {
                    id,
                    name: name.clone(),
                    segment: *segment,
                    quality: target_quality.clamp(0.0, 100.0),
                    features: features.clamped(),
                    price: *price,
                    unit_cost: estimated_unit_cost(*target_quality, features),
                    status,
                });
                outcome.started.push(name.clone());
                outcome.spend += config.development_cost;
            }
            ProductAction::Improve {
                product_id,
                axis,
                investment,
            } => {
                if let Some(p) = team.product_mut(product_id) {
                    let gain = per(*investment, config.feature_spend_per_point);
                    let value = p.features.get_mut(*axis);
                    *value = (*value + gain).clamp(0.0, 100.0);
                    outcome.spend += *investment;
                }
            }
            ProductAction::Discontinue { product_id } => {
                if let Some(p) = team.product_mut(product_id) {
                    p.status = ProductStatus::Discontinued;
                }
            }
        }
    }
    team.counters.products_launched += outcome.launched.len() as u32;
    outcome
}

/// Set prices and return the marketing spend.
pub fn apply_marketing(team: &mut TeamState, decision: &MarketingDecision) -> Decimal {
    for (id, price) in &decision.prices {
        if let Some(p) = team.product_mut(id) {
            p.price = *price;
        }
    }
    decision.total_spend()
}

/// Apply factory upgrades and ESG investment. Sourcing is handled by the
/// supply chain engine.
pub fn apply_factory(
    team: &mut TeamState,
    decision: &FactoryDecision,
    config: &OperationsConfig,
) -> Decimal {
    for upgrade in &decision.upgrades {
        let Some(factory) = team.factories.iter_mut().find(|f| f.id == upgrade.factory_id) else {
            continue;
        };
        match upgrade.kind {
            UpgradeKind::Efficiency => {
                let gain = per(upgrade.investment, config.efficiency_spend_per_point) * 0.01;
                factory.efficiency = (factory.efficiency + gain).min(config.max_factory_efficiency);
            }
            UpgradeKind::Capacity => {
                let units = per(upgrade.investment, config.capacity_spend_per_unit).floor();
                factory.capacity = factory.capacity.saturating_add(units as u64);
            }
            UpgradeKind::QualityControl => {
                let cut = per(upgrade.investment, config.quality_spend_per_point) * 0.001;
                factory.defect_rate = (factory.defect_rate - cut).max(config.min_defect_rate);
            }
        }
    }
    team.esg_score += per(decision.esg_investment, config.esg_spend_per_point);
    decision.total_spend()
}

/// Borrow, repay and dividend flows. Returns the net cash movement excluding income.
pub fn apply_finance(team: &mut TeamState, decision: &FinanceDecision) -> Decimal {
    team.debt += decision.borrow;
    let repay = decision.repay.min(team.debt);
    team.debt -= repay;
    decision.borrow - repay - decision.dividend
}

/// Brand moves once per round: growth from marketing, capped decay without it,
/// and a nudge from the ESG band.
pub fn evolve_brand(
    team: &mut TeamState,
    weighted_spend: f64,
    awareness_spend_per_point: Decimal,
    config: &OperationsConfig,
    esg: &EsgThresholds,
) {
    let per_point = awareness_spend_per_point.to_f64().unwrap_or(0.0);
    let mut brand = team.brand_value;
    if weighted_spend > 0.0 && per_point > 0.0 {
        brand += (weighted_spend / per_point * 0.01).min(config.max_brand_growth);
    } else {
        brand -= (brand * config.brand_decay).min(config.brand_decay_cap);
    }
    if team.esg_score >= esg.high {
        brand += esg.brand_bonus;
    } else if team.esg_score < esg.mid {
        brand -= esg.brand_penalty;
    }
    team.brand_value = brand.clamp(0.0, 1.0);
}

/// Suppliers below the ethics floor erode the ESG score.
pub fn evolve_esg(
    team: &mut TeamState,
    supply: &SupplyChainState,
    config: &OperationsConfig,
    thresholds: &VulnerabilityThresholds,
) {
    let unethical = supply
        .suppliers
        .iter()
        .filter(|s| s.in_use() && s.ethics < thresholds.ethics_min)
        .count() as f64;
    team.esg_score =
        (team.esg_score - unethical * config.unethical_supplier_esg_penalty).clamp(0.0, 1000.0);
}
