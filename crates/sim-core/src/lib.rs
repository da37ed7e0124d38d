#![deny(warnings)]

//! Core domain models and invariants for Handset Tycoon.
//!
//! This crate defines the serializable types shared by every engine of the
//! round settlement kernel (teams, market, supply chains, trade regime,
//! decisions, results), the configuration profile, and validation helpers
//! that guarantee basic invariants.

pub mod decisions;
pub mod market;
pub mod profile;
pub mod result;
pub mod seed;
pub mod supply;
pub mod team;
pub mod trade;

pub use decisions::*;
pub use market::*;
pub use profile::*;
pub use result::*;
pub use seed::*;
pub use supply::*;
pub use team::*;
pub use trade::*;

use rust_decimal::Decimal;
use thiserror::Error;

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Numeric field must be finite and in range.
    #[error("non-finite or out-of-range numeric value encountered")]
    NonFinite,
    /// Price or cost must be non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Elasticity must be strictly negative.
    #[error("price elasticity must be < 0")]
    ElasticityNonNegative,
    #[error("segment {segment} weights sum to {total}, expected 100")]
    SegmentWeights { segment: String, total: u32 },
    #[error("segment {0} price floor must be positive and below the ceiling")]
    PriceBand(String),
    #[error("profile defines no segments")]
    NoSegments,
    #[error("inverted threshold: {0}")]
    InvertedThreshold(String),
    #[error("starting cash must be positive")]
    NonPositiveStartingCash,
    #[error("softmax temperature must be positive")]
    NonPositiveTemperature,
    #[error("{name} = {value} is outside [0,1]")]
    ProbabilityOutOfRange { name: String, value: f64 },
    #[error("min exceeds max in {0}")]
    InvertedRange(String),
    #[error("economic phase {0} is not configured")]
    MissingPhase(String),
    #[error("transitions out of {phase} sum to {sum}, expected 1")]
    TransitionRowSum { phase: String, sum: f64 },
    #[error("shares in segment {segment} sum to {total}, above 1")]
    ShareOverflow { segment: String, total: f64 },
}

/// Validate a segment profile.
pub fn validate_segment(segment: Segment, s: &SegmentProfile) -> Result<(), ValidationError> {
    let total = s.weights.total();
    if total != 100 {
        return Err(ValidationError::SegmentWeights {
            segment: segment.to_string(),
            total,
        });
    }
    if s.price_floor <= Decimal::ZERO || s.price_floor >= s.price_ceiling {
        return Err(ValidationError::PriceBand(segment.to_string()));
    }
    if !s.price_elasticity.is_finite() {
        return Err(ValidationError::NonFinite);
    }
    if s.price_elasticity >= 0.0 {
        return Err(ValidationError::ElasticityNonNegative);
    }
    if !(s.quality_expectation.is_finite() && s.quality_expectation > 0.0)
        || !s.growth_rate.is_finite()
        || !s.feature_preferences.is_finite()
    {
        return Err(ValidationError::NonFinite);
    }
    Ok(())
}

/// Validate a team's state fields.
pub fn validate_team(team: &TeamState) -> Result<(), ValidationError> {
    if !(0.0..=1.0).contains(&team.brand_value) || !(0.0..=1000.0).contains(&team.esg_score) {
        return Err(ValidationError::NonFinite);
    }
    if team.debt < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    for p in &team.products {
        if p.price < Decimal::ZERO || p.unit_cost < Decimal::ZERO {
            return Err(ValidationError::NegativeMoney);
        }
        if !(0.0..=100.0).contains(&p.quality) {
            return Err(ValidationError::NonFinite);
        }
    }
    for f in &team.factories {
        if !(0.0..=1.0).contains(&f.efficiency) || !(0.0..=1.0).contains(&f.defect_rate) {
            return Err(ValidationError::NonFinite);
        }
    }
    Ok(())
}

/// Check that shares across teams sum to at most 1 in every segment.
pub fn validate_shares<'a>(
    teams: impl IntoIterator<Item = &'a TeamState>,
) -> Result<(), ValidationError> {
    let mut totals: std::collections::BTreeMap<Segment, f64> = Default::default();
    for team in teams {
        for (segment, share) in &team.market_share {
            *totals.entry(*segment).or_default() += share;
        }
    }
    for (segment, total) in totals {
        if total > 1.0 + 1e-9 {
            return Err(ValidationError::ShareOverflow {
                segment: segment.to_string(),
                total,
            });
        }
    }
    Ok(())
}

/// Demand-weighted overall market share of a team.
pub fn overall_share(shares: &std::collections::BTreeMap<Segment, f64>, market: &MarketState) -> f64 {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (segment, seg) in &market.segments {
        let units = seg.last_effective_units as f64;
        total += units;
        weighted += units * shares.get(segment).copied().unwrap_or(0.0);
    }
    if total <= 0.0 {
        0.0
    } else {
        weighted / total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn serde_roundtrip_team() {
        let (team, _) = GameProfile::default().new_team(TeamId("a".into()), "A", Region::Europe);
        let s = serde_json::to_string(&team).unwrap();
        let back: TeamState = serde_json::from_str(&s).unwrap();
        assert_eq!(back, team);
        validate_team(&back).unwrap();
    }

    #[test]
    fn share_overflow_is_detected() {
        let p = GameProfile::default();
        let (mut a, _) = p.new_team(TeamId("a".into()), "A", Region::Europe);
        let (mut b, _) = p.new_team(TeamId("b".into()), "B", Region::Europe);
        a.market_share.insert(Segment::Budget, 0.7);
        b.market_share.insert(Segment::Budget, 0.3);
        assert!(validate_shares([&a, &b]).is_ok());
        b.market_share.insert(Segment::Budget, 0.4);
        assert!(matches!(
            validate_shares([&a, &b]),
            Err(ValidationError::ShareOverflow { .. })
        ));
    }

    #[test]
    fn overall_share_weights_by_units() {
        let mut market = GameProfile::default().initial_market();
        for seg in market.segments.values_mut() {
            seg.last_effective_units = 0;
        }
        market.segments.get_mut(&Segment::Budget).unwrap().last_effective_units = 300;
        market.segments.get_mut(&Segment::General).unwrap().last_effective_units = 100;
        let shares = BTreeMap::from([(Segment::Budget, 0.5), (Segment::General, 1.0)]);
        assert!((overall_share(&shares, &market) - 0.625).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn elasticity_must_be_negative(e in 0.0f32..5.0f32) {
            let mut s = default_segments()[&Segment::Budget].clone();
            s.price_elasticity = e;
            prop_assert_eq!(validate_segment(Segment::Budget, &s), Err(ValidationError::ElasticityNonNegative));
        }

        #[test]
        fn any_weight_perturbation_is_rejected(delta in 1u32..50) {
            let mut s = default_segments()[&Segment::Professional].clone();
            s.weights.quality += delta;
            let rejected = matches!(
                validate_segment(Segment::Professional, &s),
                Err(ValidationError::SegmentWeights { .. })
            );
            prop_assert!(rejected);
        }
    }
}
