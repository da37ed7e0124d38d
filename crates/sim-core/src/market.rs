//! Market-side model: customer segments, preference weights and the shared
//! per-round market snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Customer segment a handset competes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Price-driven entry-level buyers.
    Budget,
    /// Mainstream buyers balancing price and quality.
    General,
    /// Feature-hungry early adopters.
    Enthusiast,
    /// Business users who value quality and reputation.
    Professional,
    /// Outdoor and fitness buyers.
    ActiveLifestyle,
}

impl Segment {
    /// Every segment in canonical order.
    pub const ALL: [Segment; 5] = [
        Segment::Budget,
        Segment::General,
        Segment::Enthusiast,
        Segment::Professional,
        Segment::ActiveLifestyle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Budget => "budget",
            Segment::General => "general",
            Segment::Enthusiast => "enthusiast",
            Segment::Professional => "professional",
            Segment::ActiveLifestyle => "active_lifestyle",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the six product feature axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureAxis {
    Battery,
    Camera,
    Ai,
    Durability,
    Display,
    Connectivity,
}

impl FeatureAxis {
    pub const ALL: [FeatureAxis; 6] = [
        FeatureAxis::Battery,
        FeatureAxis::Camera,
        FeatureAxis::Ai,
        FeatureAxis::Durability,
        FeatureAxis::Display,
        FeatureAxis::Connectivity,
    ];
}

/// Six-axis feature vector, each axis on a 0–100 scale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureVector {
    pub battery: f64,
    pub camera: f64,
    pub ai: f64,
    pub durability: f64,
    pub display: f64,
    pub connectivity: f64,
}

impl FeatureVector {
    /// Same value on every axis.
    pub fn uniform(v: f64) -> Self {
        Self {
            battery: v,
            camera: v,
            ai: v,
            durability: v,
            display: v,
            connectivity: v,
        }
    }

    pub fn get(&self, axis: FeatureAxis) -> f64 {
        match axis {
            FeatureAxis::Battery => self.battery,
            FeatureAxis::Camera => self.camera,
            FeatureAxis::Ai => self.ai,
            FeatureAxis::Durability => self.durability,
            FeatureAxis::Display => self.display,
            FeatureAxis::Connectivity => self.connectivity,
        }
    }

    pub fn get_mut(&mut self, axis: FeatureAxis) -> &mut f64 {
        match axis {
            FeatureAxis::Battery => &mut self.battery,
            FeatureAxis::Camera => &mut self.camera,
            FeatureAxis::Ai => &mut self.ai,
            FeatureAxis::Durability => &mut self.durability,
            FeatureAxis::Display => &mut self.display,
            FeatureAxis::Connectivity => &mut self.connectivity,
        }
    }

    pub fn sum(&self) -> f64 {
        FeatureAxis::ALL.iter().map(|a| self.get(*a)).sum()
    }

    pub fn is_finite(&self) -> bool {
        FeatureAxis::ALL.iter().all(|a| self.get(*a).is_finite())
    }

    /// Clamp every axis into [0, 100].
    pub fn clamped(mut self) -> Self {
        for axis in FeatureAxis::ALL {
            let v = self.get_mut(axis);
            *v = v.clamp(0.0, 100.0);
        }
        self
    }
}

/// Preference weights of a segment over the five scoring dimensions.
///
/// Weights are integers that must sum to exactly 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentWeights {
    pub price: u32,
    pub quality: u32,
    pub brand: u32,
    pub esg: u32,
    pub features: u32,
}

impl SegmentWeights {
    pub fn total(&self) -> u32 {
        self.price + self.quality + self.brand + self.esg + self.features
    }
}

/// Static description of a segment as configured in a profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentProfile {
    pub weights: SegmentWeights,
    /// Lowest price the segment considers normal.
    pub price_floor: Decimal,
    /// Price at which the price component of the score reaches zero.
    pub price_ceiling: Decimal,
    /// Quality (0–100) at which the quality component saturates.
    pub quality_expectation: f64,
    /// Relative importance of each feature axis inside the feature component.
    pub feature_preferences: FeatureVector,
    /// Units demanded per round at game start.
    pub base_demand_units: u64,
    /// Demand growth per round (e.g. 0.02 = 2%).
    pub growth_rate: f64,
    /// Price elasticity of aggregate demand (< 0).
    pub price_elasticity: f32,
}

impl SegmentProfile {
    /// Reference price used by the aggregate demand curve: the middle of the band.
    pub fn reference_price(&self) -> Decimal {
        (self.price_floor + self.price_ceiling) / Decimal::TWO
    }
}

/// Phase of the macro-economic cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomicPhase {
    Recession,
    Recovery,
    #[default]
    Expansion,
    Boom,
}

impl EconomicPhase {
    pub const ALL: [EconomicPhase; 4] = [
        EconomicPhase::Recession,
        EconomicPhase::Recovery,
        EconomicPhase::Expansion,
        EconomicPhase::Boom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EconomicPhase::Recession => "recession",
            EconomicPhase::Recovery => "recovery",
            EconomicPhase::Expansion => "expansion",
            EconomicPhase::Boom => "boom",
        }
    }
}

/// Per-round state of one segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentMarket {
    pub profile: SegmentProfile,
    /// Underlying demand before macro and price effects.
    pub demand_units: u64,
    /// Units actually addressable last round after macro and price effects.
    pub last_effective_units: u64,
    /// Mean qualifying price observed last round.
    pub last_average_price: Option<Decimal>,
}

/// Shared market snapshot for one round. Read-only input to every team's scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    /// Round this snapshot was produced for (0 = initial).
    pub round: u32,
    pub segments: BTreeMap<Segment, SegmentMarket>,
    pub phase: EconomicPhase,
    /// Compounded price level, starts at 1.0.
    pub cost_index: f64,
    /// Demand multiplier drawn for the round.
    pub demand_multiplier: f64,
    /// Inflation applied in the round.
    pub inflation: f64,
    /// Per-round interest rate on debt.
    pub interest_rate: f64,
}

impl MarketState {
    /// Weights of a segment, if the segment is configured.
    pub fn weights(&self, segment: Segment) -> Option<SegmentWeights> {
        self.segments.get(&segment).map(|s| s.profile.weights)
    }

    /// Sum of effective units over all segments last round.
    pub fn total_effective_units(&self) -> u64 {
        self.segments
            .values()
            .map(|s| s.last_effective_units)
            .fold(0u64, |a, b| a.saturating_add(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_vector_axis_access_roundtrips() {
        let mut v = FeatureVector::default();
        *v.get_mut(FeatureAxis::Camera) = 70.0;
        assert_eq!(v.get(FeatureAxis::Camera), 70.0);
        assert_eq!(v.sum(), 70.0);
    }

    #[test]
    fn clamped_bounds_axes() {
        let v = FeatureVector {
            battery: 140.0,
            camera: -3.0,
            ..FeatureVector::uniform(50.0)
        }
        .clamped();
        assert_eq!(v.battery, 100.0);
        assert_eq!(v.camera, 0.0);
        assert_eq!(v.ai, 50.0);
    }

    #[test]
    fn segment_serializes_snake_case() {
        let s = serde_json::to_string(&Segment::ActiveLifestyle).unwrap();
        assert_eq!(s, "\"active_lifestyle\"");
    }
}
