//! Segment demand allocator.
//!
//! Every team's best qualifying product in a segment is reduced to one
//! desirability score; the segment's units are then split by a softmax over
//! those scores. Scoring is pure: all randomness is drawn by the cycle engine
//! and arrives here as the demand multiplier.

use crate::pricing;
use rayon::prelude::*;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    AllocationConfig, FeatureAxis, MarketState, MarketingSpend, Product, ProductId, Segment,
    SegmentMarket, SegmentProfile, TeamId,
};
use std::collections::BTreeMap;
use tracing::debug;

/// What the allocator needs to know about one team.
#[derive(Clone, Debug)]
pub struct TeamSegmentInput<'a> {
    pub team: &'a TeamId,
    /// Reputation in [0,1].
    pub brand_value: f64,
    /// ESG score on 0–1000.
    pub esg_score: f64,
    /// Component quality delivered by the supply chain (0–100), `None` without suppliers.
    pub supply_quality: Option<f64>,
    /// Channel-weighted marketing spend per segment.
    pub awareness_spend: BTreeMap<Segment, f64>,
    pub products: &'a [Product],
}

/// A team's entry in one segment's allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contender {
    pub team: TeamId,
    pub product: ProductId,
    pub price: Decimal,
    pub score: f64,
    pub share: f64,
    pub units: u64,
}

/// Allocation result for one segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentAllocation {
    pub segment: Segment,
    /// Units addressable this round after macro and price effects.
    pub total_units: u64,
    /// Mean price over qualifying products.
    pub average_price: Option<Decimal>,
    /// In input team order. Empty when no team qualifies.
    pub contenders: Vec<Contender>,
}

impl SegmentAllocation {
    pub fn share_of(&self, team: &TeamId) -> f64 {
        self.contenders
            .iter()
            .find(|c| &c.team == team)
            .map_or(0.0, |c| c.share)
    }
}

/// Sum marketing spend per segment, weighted by channel effectiveness.
pub fn weighted_awareness_spend(
    spend: &[MarketingSpend],
    config: &AllocationConfig,
) -> BTreeMap<Segment, f64> {
    let mut out = BTreeMap::new();
    for cell in spend {
        let amount = cell.amount.to_f64().unwrap_or(0.0).max(0.0);
        let effectiveness = config
            .channel_effectiveness
            .get(&cell.channel)
            .copied()
            .unwrap_or(1.0);
        *out.entry(cell.segment).or_insert(0.0) += amount * effectiveness;
    }
    out
}

fn awareness_bonus(spend: f64, config: &AllocationConfig) -> f64 {
    let per_point = config.awareness_spend_per_point.to_f64().unwrap_or(0.0);
    if per_point <= 0.0 || !spend.is_finite() {
        return 0.0;
    }
    (spend / per_point * 0.01).clamp(0.0, config.max_awareness_bonus)
}

fn price_component(price: f64, floor: f64, ceiling: f64) -> f64 {
    let span = ceiling - floor;
    if span <= 0.0 {
        return 0.0;
    }
    let position = ((price - floor) / span).clamp(0.0, 1.0);
    (1.0 - position) * 100.0
}

fn feature_component(product: &Product, profile: &SegmentProfile) -> f64 {
    let prefs = &profile.feature_preferences;
    let total: f64 = FeatureAxis::ALL.iter().map(|a| prefs.get(*a).max(0.0)).sum();
    let features = product.features.clamped();
    if total <= 0.0 {
        return features.sum() / FeatureAxis::ALL.len() as f64;
    }
    FeatureAxis::ALL
        .iter()
        .map(|a| prefs.get(*a).max(0.0) * features.get(*a))
        .sum::<f64>()
        / total
}

/// Score points lost for pricing under the segment floor beyond the tolerated threshold.
pub fn underprice_penalty(price: f64, floor: f64, config: &AllocationConfig) -> f64 {
    if floor <= 0.0 {
        return 0.0;
    }
    let threshold_price = floor * (1.0 - config.underprice_threshold);
    if price >= threshold_price {
        return 0.0;
    }
    ((threshold_price - price) / floor * 100.0).min(config.underprice_penalty_cap)
}

/// Desirability of one product in a segment, on a 0–100 scale before penalties.
pub fn score_product(
    product: &Product,
    input: &TeamSegmentInput<'_>,
    segment: Segment,
    profile: &SegmentProfile,
    config: &AllocationConfig,
) -> f64 {
    let price = product.price.to_f64().unwrap_or(0.0);
    let floor = profile.price_floor.to_f64().unwrap_or(0.0);
    let ceiling = profile.price_ceiling.to_f64().unwrap_or(0.0);

    let quality = match input.supply_quality {
        Some(supplied) => {
            let w = config.supply_quality_weight;
            product.quality * (1.0 - w) + supplied * w
        }
        None => product.quality,
    };
    let quality_score = if profile.quality_expectation > 0.0 {
        (quality / profile.quality_expectation * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    };
    let spend = input.awareness_spend.get(&segment).copied().unwrap_or(0.0);
    let brand_score =
        ((input.brand_value + awareness_bonus(spend, config)).clamp(0.0, 1.0)) * 100.0;
    let esg_score = (input.esg_score / 10.0).clamp(0.0, 100.0);

    let w = profile.weights;
    let weighted = w.price as f64 * price_component(price, floor, ceiling)
        + w.quality as f64 * quality_score
        + w.brand as f64 * brand_score
        + w.esg as f64 * esg_score
        + w.features as f64 * feature_component(product, profile);
    let score = weighted / 100.0 - underprice_penalty(price, floor, config);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}

/// Best score among a team's qualifying products, with the product that earned it.
///
/// Ties keep the earlier product. `None` when nothing qualifies.
pub fn best_product<'a>(
    input: &TeamSegmentInput<'a>,
    segment: Segment,
    profile: &SegmentProfile,
    config: &AllocationConfig,
) -> Option<(&'a Product, f64)> {
    let mut best: Option<(&'a Product, f64)> = None;
    for product in input.products.iter().filter(|p| p.qualifies_for(segment)) {
        let score = score_product(product, input, segment, profile, config);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((product, score));
        }
    }
    best
}

/// A team's score in a segment; 0 when it has nothing to sell there.
pub fn score_team(
    input: &TeamSegmentInput<'_>,
    segment: Segment,
    profile: &SegmentProfile,
    config: &AllocationConfig,
) -> f64 {
    best_product(input, segment, profile, config).map_or(0.0, |(_, s)| s)
}

/// Softmax over scores at `temperature`, with max-subtraction for stability.
///
/// Returns an empty vector for empty input; otherwise the shares sum to 1.
pub fn softmax_shares(scores: &[f64], temperature: f64) -> Vec<f64> {
    if scores.is_empty() {
        return vec![];
    }
    let t = if temperature.is_finite() && temperature > 0.0 {
        temperature
    } else {
        f64::EPSILON
    };
    let clean: Vec<f64> = scores
        .iter()
        .map(|s| if s.is_finite() { *s } else { 0.0 })
        .collect();
    let max = clean.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = clean.iter().map(|s| ((s - max) / t).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Units addressable in a segment this round.
///
/// Underlying demand scaled by the macro multiplier, then by the
/// constant-elasticity response of the mean price against the reference price.
pub fn segment_units(
    market: &SegmentMarket,
    demand_multiplier: f64,
    average_price: Option<Decimal>,
) -> u64 {
    let scaled = (market.demand_units as f64 * demand_multiplier.max(0.0)).floor();
    let base = scaled.clamp(0.0, u64::MAX as f64) as u64;
    match average_price {
        Some(price) => pricing::demand_response(
            base,
            price,
            market.profile.reference_price(),
            market.profile.price_elasticity,
        )
        .unwrap_or(base),
        None => base,
    }
}

/// Allocate one segment's units across teams.
pub fn allocate_segment(
    segment: Segment,
    market: &SegmentMarket,
    inputs: &[TeamSegmentInput<'_>],
    demand_multiplier: f64,
    config: &AllocationConfig,
) -> SegmentAllocation {
    let profile = &market.profile;
    let mut entries = Vec::new();
    for input in inputs {
        if let Some((product, score)) = best_product(input, segment, profile, config) {
            entries.push((input.team, product, score));
        }
    }
    let offers: Vec<Decimal> = entries.iter().map(|(_, p, _)| p.price).collect();
    let average_price = pricing::mean_price(&offers);
    let total_units = segment_units(market, demand_multiplier, average_price);
    let scores: Vec<f64> = entries.iter().map(|(_, _, s)| *s).collect();
    let shares = softmax_shares(&scores, config.temperature);
    let contenders: Vec<Contender> = entries
        .into_iter()
        .zip(shares)
        .map(|((team, product, score), share)| Contender {
            team: team.clone(),
            product: product.id.clone(),
            price: product.price,
            score,
            share,
            units: (total_units as f64 * share).floor() as u64,
        })
        .collect();
    debug!(
        segment = segment.as_str(),
        total_units,
        contenders = contenders.len(),
        "segment allocated"
    );
    SegmentAllocation {
        segment,
        total_units,
        average_price,
        contenders,
    }
}

/// Allocate every configured segment. Segments are scored in parallel.
pub fn allocate_market(
    market: &MarketState,
    inputs: &[TeamSegmentInput<'_>],
    demand_multiplier: f64,
    config: &AllocationConfig,
) -> BTreeMap<Segment, SegmentAllocation> {
    market
        .segments
        .par_iter()
        .map(|(segment, seg)| {
            (
                *segment,
                allocate_segment(*segment, seg, inputs, demand_multiplier, config),
            )
        })
        .collect()
}
