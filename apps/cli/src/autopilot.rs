//! Seeded rule-of-thumb decisions for headless games.

use rand::seq::SliceRandom;
use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sim_core::{
    subsystem_rng, Channel, DecisionBundle, FactoryDecision, FactoryUpgrade, FeatureVector,
    FinanceDecision, GameProfile, HrDecision, MarketState, MarketingDecision, MarketingSpend,
    ProductAction, ProductStatus, RdDecision, Segment, Subsystem, TeamState, UpgradeKind,
};
use sim_econ::{band_price, discounted, noisy_demand};
use std::collections::BTreeMap;

const CHANNELS: [Channel; 4] = [
    Channel::Digital,
    Channel::Television,
    Channel::Retail,
    Channel::Sponsorship,
];

fn dec(v: f64) -> Decimal {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO).round_dp(2)
}

/// Decisions for one team in `round`. Same inputs, same bundle.
pub fn decide(
    profile: &GameProfile,
    market: &MarketState,
    team: &TeamState,
    team_count: usize,
    seed: u64,
    round: u32,
) -> DecisionBundle {
    let mut rng = subsystem_rng(seed, round, Subsystem::Autopilot, &team.id.0);
    let ops = &profile.operations;
    let cash = team.cash.to_f64().unwrap_or(0.0).max(0.0);

    let mut prices = BTreeMap::new();
    let mut expected_units = 0u64;
    for product in team.launched_products() {
        let Some(seg) = profile.segments.get(&product.segment) else {
            continue;
        };
        let mut price = band_price(seg, product.unit_cost);
        if rng.gen_bool(0.25) {
            price = discounted(price, rng.gen_range(0.05..0.2))
                .unwrap_or(price)
                .max(seg.price_floor);
        }
        if let Some(seg) = market.segments.get(&product.segment) {
            let fair_share = seg.demand_units / team_count.max(1) as u64;
            expected_units += noisy_demand(
                fair_share,
                price,
                seg.profile.reference_price(),
                seg.profile.price_elasticity,
                0.15,
                &mut rng,
            )
            .unwrap_or(fair_share);
        }
        prices.insert(product.id.clone(), price);
    }

    let segments: Vec<Segment> = {
        let mut s: Vec<Segment> = team.launched_products().map(|p| p.segment).collect();
        s.sort();
        s.dedup();
        s
    };
    let marketing_budget = (cash * 0.04).min(400_000.0);
    let spend = segments
        .iter()
        .map(|segment| MarketingSpend {
            segment: *segment,
            channel: CHANNELS.choose(&mut rng).copied().unwrap_or(Channel::Digital),
            amount: dec(marketing_budget / segments.len() as f64),
        })
        .collect();

    let labour = team.workforce.headcount as f64
        * ops.units_per_worker as f64
        * (team.workforce.efficiency / 100.0);
    let hires = if expected_units as f64 > labour * 0.9 {
        ((expected_units as f64 - labour * 0.9) / ops.units_per_worker as f64).ceil() as u32
    } else {
        0
    };

    let mut upgrades = Vec::new();
    if expected_units as f64 > team.factory_output() {
        if let Some(factory) = team.factories.first() {
            upgrades.push(FactoryUpgrade {
                factory_id: factory.id.clone(),
                kind: UpgradeKind::Capacity,
                investment: dec((cash * 0.03).min(300_000.0)),
            });
        }
    }
    if let Some(worst) = team
        .factories
        .iter()
        .max_by(|a, b| a.defect_rate.total_cmp(&b.defect_rate))
    {
        if worst.defect_rate > 0.02 && rng.gen_bool(0.5) {
            upgrades.push(FactoryUpgrade {
                factory_id: worst.id.clone(),
                kind: UpgradeKind::QualityControl,
                investment: Decimal::new(60_000, 0),
            });
        }
    }

    let mut actions = Vec::new();
    let developing = team
        .products
        .iter()
        .any(|p| matches!(p.status, ProductStatus::InDevelopment { .. }));
    let missing: Vec<Segment> = Segment::ALL
        .into_iter()
        .filter(|s| !team.launched_products().any(|p| p.segment == *s))
        .collect();
    if !developing && cash > 2_500_000.0 {
        if let Some(segment) = missing.choose(&mut rng) {
            if let Some(seg) = profile.segments.get(segment) {
                actions.push(ProductAction::Develop {
                    name: format!("{} {}", team.name, segment.as_str()),
                    segment: *segment,
                    features: FeatureVector::uniform(rng.gen_range(45.0..75.0)),
                    target_quality: seg.quality_expectation.min(90.0),
                    price: seg.reference_price(),
                });
            }
        }
    }

    let repay = if cash > 3_000_000.0 {
        team.debt
    } else {
        Decimal::ZERO
    };
    let borrow = if cash < 500_000.0 {
        Decimal::new(1_000_000, 0)
    } else {
        Decimal::ZERO
    };

    DecisionBundle {
        factory: Some(FactoryDecision {
            upgrades,
            esg_investment: dec(rng.gen_range(20_000.0..80_000.0)),
            ..Default::default()
        }),
        hr: Some(HrDecision {
            hires: hires.min(60),
            training_spend: Decimal::new(40_000, 0),
            benefits_spend: Decimal::new(30_000, 0),
            ..Default::default()
        }),
        marketing: Some(MarketingDecision { spend, prices }),
        finance: Some(FinanceDecision {
            borrow,
            repay: repay.min(team.debt + borrow),
            dividend: Decimal::ZERO,
        }),
        rd: Some(RdDecision {
            budget: dec((cash * 0.03).min(350_000.0)),
            actions,
        }),
    }
}
