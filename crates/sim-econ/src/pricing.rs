//! Segment price helpers.
//!
//! The allocator prices a segment by the plain mean of its qualifying offers
//! and responds to it along the segment's constant-elasticity curve. The
//! autopilot prices products at the markup optimum inside the segment band.

use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sim_core::SegmentProfile;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    /// Demand needs ε < 0; a markup optimum needs ε < -1.
    #[error("segment elasticity {0} has no usable response")]
    Elasticity(f32),
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),
    #[error("fraction {0} outside [0, 1)")]
    Fraction(f64),
    #[error("non-finite intermediate value")]
    NonFinite,
}

/// Profit-maximising price for `unit_cost` on a segment curve of elasticity `ε`.
///
/// `P = C / (1 + 1/ε)`. Inelastic segments (ε ≥ -1) have no interior optimum.
pub fn markup_price(unit_cost: Decimal, elasticity: f32) -> Result<Decimal, PricingError> {
    if !elasticity.is_finite() || elasticity >= -1.0 {
        return Err(PricingError::Elasticity(elasticity));
    }
    if unit_cost <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice(unit_cost));
    }
    let denom = 1.0 + 1.0 / elasticity as f64;
    let denom = Decimal::from_f64(denom).ok_or(PricingError::NonFinite)?;
    Ok((unit_cost / denom).round_dp(2))
}

/// Markup price kept inside the segment's price band.
///
/// Falls back to the band's reference price when the segment is inelastic.
pub fn band_price(profile: &SegmentProfile, unit_cost: Decimal) -> Decimal {
    markup_price(unit_cost, profile.price_elasticity)
        .unwrap_or_else(|_| profile.reference_price())
        .clamp(profile.price_floor, profile.price_ceiling)
}

/// Unweighted mean of the offers in a segment. `None` without offers.
pub fn mean_price(prices: &[Decimal]) -> Option<Decimal> {
    let n = Decimal::from_usize(prices.len()).filter(|n| !n.is_zero())?;
    Some(prices.iter().sum::<Decimal>() / n)
}

/// Units a segment absorbs at `price`: `base × (price / reference)^ε`, floored.
pub fn demand_response(
    base: u64,
    price: Decimal,
    reference: Decimal,
    elasticity: f32,
) -> Result<u64, PricingError> {
    if !elasticity.is_finite() || elasticity >= 0.0 {
        return Err(PricingError::Elasticity(elasticity));
    }
    if price <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice(price));
    }
    if reference <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice(reference));
    }
    let ratio = (price / reference).to_f64().ok_or(PricingError::NonFinite)?;
    let q = base as f64 * ratio.powf(elasticity as f64);
    if !q.is_finite() {
        return Err(PricingError::NonFinite);
    }
    Ok(q.floor().clamp(0.0, u64::MAX as f64) as u64)
}

/// [`demand_response`] times a uniform factor in `[1 - noise, 1 + noise]` drawn from `rng`.
pub fn noisy_demand<R: Rng>(
    base: u64,
    price: Decimal,
    reference: Decimal,
    elasticity: f32,
    noise: f64,
    rng: &mut R,
) -> Result<u64, PricingError> {
    if !(0.0..1.0).contains(&noise) {
        return Err(PricingError::Fraction(noise));
    }
    let q = demand_response(base, price, reference, elasticity)?;
    if noise == 0.0 {
        return Ok(q);
    }
    let factor = 1.0 + rng.gen_range(-noise..=noise);
    Ok((q as f64 * factor).floor().clamp(0.0, u64::MAX as f64) as u64)
}

/// `price` less a promotional `discount` fraction, rounded to cents.
pub fn discounted(price: Decimal, discount: f64) -> Result<Decimal, PricingError> {
    if price <= Decimal::ZERO {
        return Err(PricingError::NonPositivePrice(price));
    }
    if !(0.0..1.0).contains(&discount) {
        return Err(PricingError::Fraction(discount));
    }
    let keep = Decimal::from_f64(1.0 - discount).ok_or(PricingError::NonFinite)?;
    Ok((price * keep).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sim_core::{GameProfile, Segment};

    #[test]
    fn markup_doubles_cost_at_unit_two_elasticity() {
        let p = markup_price(Decimal::new(150, 0), -2.0).unwrap();
        assert_eq!(p, Decimal::new(300, 0));
        assert!(matches!(
            markup_price(Decimal::new(150, 0), -0.8),
            Err(PricingError::Elasticity(_))
        ));
    }

    #[test]
    fn band_price_stays_inside_the_segment_band() {
        let profile = GameProfile::default();
        for segment in Segment::ALL {
            let seg = &profile.segments[&segment];
            for cost in [1, 90, 400, 5_000] {
                let p = band_price(seg, Decimal::new(cost, 0));
                assert!(p >= seg.price_floor && p <= seg.price_ceiling, "{segment:?} {cost}");
            }
        }
    }

    #[test]
    fn band_price_falls_back_to_reference_when_inelastic() {
        let mut seg = GameProfile::default().segments[&Segment::Professional].clone();
        seg.price_elasticity = -0.5;
        assert_eq!(band_price(&seg, Decimal::new(100, 0)), seg.reference_price());
    }

    #[test]
    fn mean_price_of_offers() {
        let offers = [Decimal::new(300, 0), Decimal::new(500, 0), Decimal::new(400, 0)];
        assert_eq!(mean_price(&offers), Some(Decimal::new(400, 0)));
        assert_eq!(mean_price(&[]), None);
    }

    #[test]
    fn demand_is_unchanged_at_the_reference_price() {
        let p = Decimal::new(450, 0);
        assert_eq!(demand_response(80_000, p, p, -1.6).unwrap(), 80_000);
        assert!(demand_response(80_000, Decimal::ZERO, p, -1.6).is_err());
    }

    #[test]
    fn noisy_demand_is_bounded_and_follows_the_rng() {
        let p = Decimal::new(500, 0);
        let draw = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            noisy_demand(10_000, p, p, -1.4, 0.1, &mut rng).unwrap()
        };
        assert_eq!(draw(42), draw(42));
        assert!((9_000..=11_000).contains(&draw(7)));
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(noisy_demand(10_000, p, p, -1.4, 1.0, &mut rng).is_err());
    }

    #[test]
    fn promotions_round_to_cents() {
        assert_eq!(discounted(Decimal::new(40000, 2), 0.1).unwrap(), Decimal::new(36000, 2));
        assert!(discounted(Decimal::new(100, 0), 1.0).is_err());
    }

    proptest! {
        #[test]
        fn markup_rises_with_cost(cents in 100i64..100_000, e in -4.0f32..-1.2f32) {
            let low = markup_price(Decimal::new(cents, 2), e).unwrap();
            let high = markup_price(Decimal::new(cents + 500, 2), e).unwrap();
            prop_assert!(high >= low);
        }

        #[test]
        fn demand_falls_as_price_rises(base in 1u64..1_000_000, p in 10i64..10_000, e in -5.0f32..-0.1f32) {
            let reference = Decimal::new(p, 2);
            let at = demand_response(base, Decimal::new(p, 2), reference, e).unwrap();
            let above = demand_response(base, Decimal::new(p + 100, 2), reference, e).unwrap();
            prop_assert!(at >= above);
        }
    }
}
