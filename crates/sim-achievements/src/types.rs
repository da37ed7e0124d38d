//! Rule definitions: categories, tiers and requirements.

use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use sim_core::{Segment, TierMultipliers};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementCategory {
    Financial,
    MarketDominance,
    Operations,
    Workforce,
    Marketing,
    Innovation,
    Sustainability,
    SupplyChain,
    GlobalTrade,
    Competitive,
    Resilience,
    Milestones,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 12] = [
        AchievementCategory::Financial,
        AchievementCategory::MarketDominance,
        AchievementCategory::Operations,
        AchievementCategory::Workforce,
        AchievementCategory::Marketing,
        AchievementCategory::Innovation,
        AchievementCategory::Sustainability,
        AchievementCategory::SupplyChain,
        AchievementCategory::GlobalTrade,
        AchievementCategory::Competitive,
        AchievementCategory::Resilience,
        AchievementCategory::Milestones,
    ];
}

/// Tier of an achievement. Each tier has a fixed base point value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Secret,
    Infamy,
}

impl AchievementTier {
    pub fn base_points(&self) -> i64 {
        match self {
            AchievementTier::Bronze => 10,
            AchievementTier::Silver => 25,
            AchievementTier::Gold => 50,
            AchievementTier::Platinum => 100,
            AchievementTier::Secret => 75,
            AchievementTier::Infamy => -25,
        }
    }

    pub fn multiplier(&self, m: &TierMultipliers) -> f64 {
        match self {
            AchievementTier::Bronze => m.bronze,
            AchievementTier::Silver => m.silver,
            AchievementTier::Gold => m.gold,
            AchievementTier::Platinum => m.platinum,
            AchievementTier::Secret => m.secret,
            AchievementTier::Infamy => m.infamy,
        }
    }

    /// Base points scaled by the difficulty multiplier, rounded half away from zero.
    pub fn points(&self, m: &TierMultipliers) -> i64 {
        (self.base_points() as f64 * self.multiplier(m)).round() as i64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementTier::Bronze => "bronze",
            AchievementTier::Silver => "silver",
            AchievementTier::Gold => "gold",
            AchievementTier::Platinum => "platinum",
            AchievementTier::Secret => "secret",
            AchievementTier::Infamy => "infamy",
        }
    }
}

impl fmt::Display for AchievementTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison operator of a requirement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    /// Holds for any value.
    #[serde(rename = "any")]
    Any,
}

impl Comparison {
    pub fn holds(&self, value: f64, target: f64) -> bool {
        match self {
            Comparison::Ge => value >= target,
            Comparison::Gt => value > target,
            Comparison::Le => value <= target,
            Comparison::Lt => value < target,
            Comparison::Eq => (value - target).abs() < 1e-9,
            Comparison::Ne => (value - target).abs() >= 1e-9,
            Comparison::Any => true,
        }
    }
}

/// Position among all teams this round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeRank {
    Best,
    Worst,
}

/// What a metric is compared against.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Value(f64),
    /// Resolved from the round's standings instead of a number.
    Rank(RelativeRank),
}

impl Default for Target {
    fn default() -> Self {
        Target::Value(0.0)
    }
}

/// One typed condition of an achievement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub metric: Metric,
    /// Segment for segment-scoped metrics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Segment>,
    pub op: Comparison,
    #[serde(default)]
    pub target: Target,
    /// Consecutive rounds the condition must hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustained: Option<u32>,
    /// Compare the running total of the metric instead of this round's value.
    #[serde(default)]
    pub cumulative: bool,
    /// Express ratio metrics in percent before comparing.
    #[serde(default)]
    pub percentage: bool,
    /// Met when the comparison does NOT hold.
    #[serde(default)]
    pub invert: bool,
}

/// An immutable rule from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: AchievementCategory,
    pub tier: AchievementTier,
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub repeatable: bool,
}
