//! Round settlement.
//!
//! `collect → macro/trade → per-team operations and supply → allocate →
//! balance → financials → rankings → commit`. Allocation is relative, so every
//! team's operations finish before any segment is allocated, and ranking and
//! balance wait for every allocation.

use crate::operations::{
    apply_factory, apply_finance, apply_hr, apply_marketing, apply_rd, evolve_brand, evolve_esg,
    to_decimal, HrOutcome, RdOutcome,
};
use crate::sanitize::{sanitize, SanitizedDecisions};
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{
    overall_share, subsystem_rng, validate_shares, validate_team, DecisionBundle, Department,
    FinancialResult, GameProfile, MarketState, ProductId, Segment, Subsystem, Supplier,
    SupplyChainState, TariffState, TeamId, TeamState, ValidationError,
};
use sim_econ::demand::weighted_awareness_spend;
use sim_econ::{
    advance_cycle, allocate_market, balance_multipliers, BalanceStanding, MacroOutlook,
    SegmentAllocation, TeamSegmentInput,
};
use sim_supply::{advance_supply_chain, SupplyPlan, SupplyReport};
use sim_trade::{advance_trade, landed_cost_multiplier, TradeContext, TradeReport};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Everything needed to settle one round. Nothing here is mutated.
#[derive(Clone, Copy, Debug)]
pub struct RoundInput<'a> {
    pub round: u32,
    pub seed: u64,
    pub profile: &'a GameProfile,
    pub market: &'a MarketState,
    pub tariffs: &'a TariffState,
    pub teams: &'a BTreeMap<TeamId, TeamState>,
    pub supply: &'a BTreeMap<TeamId, SupplyChainState>,
    pub decisions: &'a BTreeMap<TeamId, DecisionBundle>,
}

/// New snapshots and per-team results of a settled round.
#[derive(Clone, Debug, Serialize)]
pub struct RoundOutcome {
    pub round: u32,
    pub market: MarketState,
    pub tariffs: TariffState,
    pub outlook: MacroOutlook,
    pub trade: TradeReport,
    pub allocations: BTreeMap<Segment, SegmentAllocation>,
    pub teams: BTreeMap<TeamId, TeamState>,
    pub supply: BTreeMap<TeamId, SupplyChainState>,
    pub supply_reports: BTreeMap<TeamId, SupplyReport>,
    pub results: BTreeMap<TeamId, FinancialResult>,
    /// Team ids, best first.
    pub rankings: Vec<TeamId>,
}

/// A team between operations and financials.
struct Working {
    team: TeamState,
    supply: SupplyChainState,
    report: SupplyReport,
    awareness: BTreeMap<Segment, f64>,
    hr: HrOutcome,
    rd: RdOutcome,
    marketing_spend: Decimal,
    factory_spend: Decimal,
    finance_flow: Decimal,
    messages: Vec<String>,
    warnings: Vec<String>,
}

fn operate(input: &RoundInput<'_>, id: &TeamId, previous: &TeamState) -> Working {
    let profile = input.profile;
    let ops = &profile.operations;
    let mut team = previous.clone();
    let mut warnings = Vec::new();
    let mut supply = match input.supply.get(id) {
        Some(s) => s.clone(),
        None => {
            warnings.push("No supply chain on record; operating without suppliers".to_string());
            SupplyChainState::default()
        }
    };

    let SanitizedDecisions {
        factory,
        hr,
        marketing,
        finance,
        rd,
        warnings: rejected,
    } = sanitize(&team, &supply, input.decisions.get(id));
    warnings.extend(rejected);

    let mut hr_rng = subsystem_rng(input.seed, input.round, Subsystem::Hr, &id.0);
    let hr = apply_hr(&mut team, &hr, ops, &mut hr_rng);
    let rd = apply_rd(&mut team, &rd, ops);
    let marketing_spend = apply_marketing(&mut team, &marketing);
    let factory_spend = apply_factory(&mut team, &factory, ops);
    let finance_flow = apply_finance(&mut team, &finance);

    let plan = SupplyPlan {
        sourcing: factory.sourcing.clone(),
        safety_stock: factory.safety_stock,
        investment: factory.supplier_investment.clone(),
    };
    let mut supply_rng = subsystem_rng(input.seed, input.round, Subsystem::Supply, &id.0);
    let report = advance_supply_chain(&mut supply, &plan, profile, input.round, &mut supply_rng);
    team.counters.disruptions_weathered += report.resolved.len() as u32;
    evolve_esg(&mut team, &supply, ops, &profile.supply.thresholds);

    let awareness = weighted_awareness_spend(&marketing.spend, &profile.allocation);
    evolve_brand(
        &mut team,
        awareness.values().sum(),
        profile.allocation.awareness_spend_per_point,
        ops,
        &profile.esg,
    );

    let mut messages = report.messages.clone();
    for name in &rd.launched {
        messages.push(format!("Product launched: {name}"));
    }
    for name in &rd.started {
        messages.push(format!("Development started: {name}"));
    }
    if hr.leavers > 0 {
        messages.push(format!("{} employees left the company", hr.leavers));
    }

    Working {
        team,
        supply,
        report,
        awareness,
        hr,
        rd,
        marketing_spend,
        factory_spend,
        finance_flow,
        messages,
        warnings,
    }
}

/// Units the team can deliver this round.
pub fn production_capacity(
    team: &TeamState,
    supply: &SupplyChainState,
    units_per_worker: u64,
) -> u64 {
    let labour = team.workforce.headcount as f64
        * units_per_worker as f64
        * (team.workforce.efficiency / 100.0).clamp(0.0, 1.0);
    let ceiling = team
        .factory_output()
        .min(labour)
        .min(supply.effective_capacity as f64)
        .max(0.0);
    (ceiling * (1.0 - team.average_defect_rate())).floor() as u64
}

/// Units won per segment, scaled down proportionally when over capacity.
fn deliverable_units(
    id: &TeamId,
    allocations: &BTreeMap<Segment, SegmentAllocation>,
    capacity: u64,
) -> (BTreeMap<Segment, (u64, Decimal, ProductId)>, bool) {
    let mut won: BTreeMap<Segment, (u64, Decimal, ProductId)> = allocations
        .iter()
        .filter_map(|(segment, alloc)| {
            alloc
                .contenders
                .iter()
                .find(|c| &c.team == id)
                .map(|c| (*segment, (c.units, c.price, c.product.clone())))
        })
        .collect();
    let demanded: u64 = won.values().map(|(u, _, _)| *u).sum();
    if demanded <= capacity {
        return (won, false);
    }
    let scale = capacity as f64 / demanded as f64;
    for (units, _, _) in won.values_mut() {
        *units = (*units as f64 * scale).floor() as u64;
    }
    (won, true)
}

fn compare_standing(
    a: &FinancialResult,
    b: &FinancialResult,
    share: &BTreeMap<TeamId, (f64, f64)>,
) -> Ordering {
    let (share_a, esg_a) = share.get(&a.team).copied().unwrap_or_default();
    let (share_b, esg_b) = share.get(&b.team).copied().unwrap_or_default();
    b.revenue
        .cmp(&a.revenue)
        .then_with(|| b.net_income.cmp(&a.net_income))
        .then_with(|| share_b.total_cmp(&share_a))
        .then_with(|| esg_b.total_cmp(&esg_a))
        .then_with(|| a.team.cmp(&b.team))
}

/// Settle one round.
///
/// Only an invalid profile is an error. Per-team problems become warnings.
pub fn settle_round(input: &RoundInput<'_>) -> Result<RoundOutcome, ValidationError> {
    let profile = input.profile;
    profile.validate()?;
    let ops = &profile.operations;
    let round = input.round;
    info!(round, teams = input.teams.len(), "settling round");

    let mut economy_rng = subsystem_rng(input.seed, round, Subsystem::Economy, "");
    let outlook = advance_cycle(input.market, &profile.economy, &mut economy_rng);
    let mut market = input.market.clone();
    market.round = round;
    market.phase = outlook.phase;
    market.cost_index = outlook.cost_index;
    market.demand_multiplier = outlook.demand_multiplier;
    market.inflation = outlook.inflation;
    market.interest_rate = outlook.interest_rate;
    for seg in market.segments.values_mut() {
        let grown = (seg.demand_units as f64 * (1.0 + seg.profile.growth_rate)).floor();
        seg.demand_units = grown.clamp(0.0, u64::MAX as f64) as u64;
    }

    let mut tariffs = input.tariffs.clone();
    let context = TradeContext::from_teams(input.teams.values());
    let mut trade_rng = subsystem_rng(input.seed, round, Subsystem::Trade, "");
    let trade = advance_trade(&mut tariffs, profile, round, &context, &mut trade_rng);

    let mut working: BTreeMap<TeamId, Working> = input
        .teams
        .par_iter()
        .map(|(id, team)| (id.clone(), operate(input, id, team)))
        .collect();
    for id in input.decisions.keys().filter(|id| !input.teams.contains_key(*id)) {
        warn!(round, team = %id, "decisions for unknown team ignored");
    }

    let allocations = {
        let inputs: Vec<TeamSegmentInput<'_>> = working
            .iter()
            .map(|(id, w)| TeamSegmentInput {
                team: id,
                brand_value: w.team.brand_value,
                esg_score: w.team.esg_score,
                supply_quality: w
                    .supply
                    .suppliers
                    .iter()
                    .any(Supplier::in_use)
                    .then_some(w.report.quality_impact),
                awareness_spend: w.awareness.clone(),
                products: &w.team.products,
            })
            .collect();
        allocate_market(&market, &inputs, outlook.demand_multiplier, &profile.allocation)
    };
    for (segment, alloc) in &allocations {
        if let Some(seg) = market.segments.get_mut(segment) {
            seg.last_effective_units = alloc.total_units;
            seg.last_average_price = alloc.average_price;
        }
    }

    let mut delivered = BTreeMap::new();
    let mut standings = Vec::with_capacity(working.len());
    for (id, w) in &mut working {
        let capacity = production_capacity(&w.team, &w.supply, ops.units_per_worker);
        let (units, scaled) = deliverable_units(id, &allocations, capacity);
        if scaled {
            w.warnings.push(format!(
                "Demand exceeded production capacity of {capacity} units; sales scaled down"
            ));
        }
        let raw: Decimal = units
            .values()
            .map(|(u, price, _)| Decimal::from(*u) * *price)
            .sum();
        standings.push(BalanceStanding {
            team: id.clone(),
            value: raw.to_f64().unwrap_or(0.0),
        });
        delivered.insert(id.clone(), (capacity, units, raw));
    }
    let multipliers = balance_multipliers(&standings, &profile.balance);

    let cost_index = to_decimal(market.cost_index);
    let interest_rate = to_decimal(market.interest_rate);
    let tax_rate = ops.tax_rate;
    let mut results = BTreeMap::new();
    let mut share_esg = BTreeMap::new();
    for (id, w) in &mut working {
        let Some((capacity, units, raw)) = delivered.remove(id) else {
            continue;
        };
        let multiplier = multipliers.get(id).copied().unwrap_or(1.0);
        let revenue = (raw * to_decimal(multiplier)).round_dp(2);

        let landed = landed_cost_multiplier(&tariffs, &w.supply.suppliers, w.team.home_region, round);
        let supply_factor = to_decimal(w.supply.cost_multiplier) * cost_index;
        let tariff_factor = to_decimal((landed - 1.0).max(0.0));
        let mut base_cogs = Decimal::ZERO;
        for (u, _, product) in units.values() {
            let unit_cost = w
                .team
                .product(product)
                .map_or(Decimal::ZERO, |p| p.unit_cost);
            base_cogs += unit_cost * Decimal::from(*u) * supply_factor;
        }
        let tariffs_paid = (base_cogs * tariff_factor).round_dp(2);
        let cost_of_goods = (base_cogs + tariffs_paid).round_dp(2);

        let department_spend = BTreeMap::from([
            (Department::Factory, w.factory_spend),
            (Department::Hr, w.hr.spend),
            (Department::Marketing, w.marketing_spend),
            (Department::Finance, Decimal::ZERO),
            (Department::Rd, w.rd.spend),
        ]);
        let operating_expenses =
            (w.hr.payroll + department_spend.values().copied().sum::<Decimal>()).round_dp(2);
        let interest = (w.team.debt * interest_rate).round_dp(2);
        let pre_tax = revenue - cost_of_goods - operating_expenses - interest;
        let tax = (pre_tax.max(Decimal::ZERO) * tax_rate).round_dp(2);
        let net_income = pre_tax - tax;
        let cash_delta = net_income + w.finance_flow;

        let previous_shares = w.team.market_share.clone();
        let shares: BTreeMap<Segment, f64> = allocations
            .iter()
            .map(|(segment, alloc)| (*segment, alloc.share_of(id)))
            .collect();
        let overall = overall_share(&shares, &market);
        let market_share_delta = overall - overall_share(&previous_shares, &market);

        let team = &mut w.team;
        team.cash += cash_delta;
        team.market_share = shares.clone();
        team.last_revenue = revenue;
        team.last_net_income = net_income;
        team.cumulative_revenue += revenue;
        team.cumulative_net_income += net_income;
        team.counters.rounds_played += 1;
        team.counters.tariffs_paid += tariffs_paid;
        team.counters.profitable_streak = if net_income > Decimal::ZERO {
            team.counters.profitable_streak + 1
        } else {
            0
        };
        if team.cash < Decimal::ZERO {
            w.warnings.push(format!("Cash is negative: {}", team.cash.round_dp(2)));
        }
        share_esg.insert(id.clone(), (overall, team.esg_score));

        let mut messages = std::mem::take(&mut w.messages);
        messages.extend(trade.messages.iter().cloned());
        if multiplier > 1.0 {
            messages.push(format!("Catch-up bonus applied to revenue: x{multiplier:.3}"));
        } else if multiplier < 1.0 {
            messages.push(format!("Leader damping applied to revenue: x{multiplier:.3}"));
        }
        results.insert(
            id.clone(),
            FinancialResult {
                team: id.clone(),
                round,
                revenue,
                cost_of_goods,
                operating_expenses,
                interest,
                tax,
                net_income,
                cash_delta,
                tariffs_paid,
                department_spend,
                units_sold: units.iter().map(|(s, (u, _, _))| (*s, *u)).collect(),
                market_share: shares,
                market_share_delta,
                rank: 0,
                balance_multiplier: multiplier,
                production_capacity: capacity,
                messages,
                warnings: std::mem::take(&mut w.warnings),
            },
        );
    }

    let mut order: Vec<&FinancialResult> = results.values().collect();
    order.sort_by(|a, b| compare_standing(a, b, &share_esg));
    let rankings: Vec<TeamId> = order.into_iter().map(|r| r.team.clone()).collect();
    for (pos, id) in rankings.iter().enumerate() {
        if let Some(result) = results.get_mut(id) {
            result.rank = pos as u32 + 1;
        }
        if pos == 0 {
            if let Some(w) = working.get_mut(id) {
                w.team.counters.rounds_as_leader += 1;
            }
        }
    }

    let mut teams = BTreeMap::new();
    let mut supply = BTreeMap::new();
    let mut supply_reports = BTreeMap::new();
    for (id, w) in working {
        if let Err(err) = validate_team(&w.team) {
            warn!(round, team = %id, %err, "team state out of range after settlement");
            if let Some(result) = results.get_mut(&id) {
                result.warnings.push(format!("Team state out of range: {err}"));
            }
        }
        debug!(round, team = %id, cash = %w.team.cash, "team committed");
        teams.insert(id.clone(), w.team);
        supply.insert(id.clone(), w.supply);
        supply_reports.insert(id, w.report);
    }
    if let Err(err) = validate_shares(teams.values()) {
        warn!(round, %err, "market shares overflow");
    }
    info!(
        round,
        phase = market.phase.as_str(),
        leader = rankings.first().map(|t| t.0.as_str()).unwrap_or("-"),
        "round settled"
    );

    Ok(RoundOutcome {
        round,
        market,
        tariffs,
        outlook,
        trade,
        allocations,
        teams,
        supply,
        supply_reports,
        results,
        rankings,
    })
}
