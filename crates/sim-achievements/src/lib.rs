#![deny(warnings)]

//! Achievement ledger for Handset Tycoon.
//!
//! Scores each settled round against a catalog of rules. A rule is a list of
//! typed requirements over a closed [`Metric`] set; requirements may need to
//! hold for several consecutive rounds, read a running total, or compare a
//! team against every other team (`best` / `worst`).
//!
//! Rules are independent of each other, so they are evaluated in parallel and
//! folded into each team's [`AchievementState`] in catalog order.

pub mod catalog;
pub mod ledger;
pub mod metric;
pub mod standings;
pub mod types;

pub use catalog::{AchievementCatalog, CatalogError, BUILTIN_ACHIEVEMENTS_YAML};
pub use ledger::{
    AchievementDelta, AchievementLedger, AchievementMessage, AchievementProgress,
    AchievementState, EarnedAchievement, MessageKind, RequirementProgress,
};
pub use metric::{Metric, TeamContext};
pub use standings::Standings;
pub use types::{
    AchievementCategory, AchievementDefinition, AchievementTier, Comparison, RelativeRank,
    Requirement, Target,
};
