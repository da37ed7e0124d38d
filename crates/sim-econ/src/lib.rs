#![deny(warnings)]

//! Economic models for Handset Tycoon.
//!
//! This crate provides:
//! - The economic cycle engine (phase transitions and macro multipliers)
//! - The segment demand allocator (multi-factor scoring and softmax shares)
//! - The balance adjuster applied after allocation
//! - Segment price helpers: markup, band, mean offer and demand response

pub mod balance;
pub mod cycle;
pub mod demand;
pub mod pricing;

pub use balance::{balance_multipliers, BalanceStanding};
pub use cycle::{advance_cycle, next_phase, MacroOutlook};
pub use demand::{
    allocate_market, allocate_segment, score_product, score_team, segment_units, softmax_shares,
    Contender, SegmentAllocation, TeamSegmentInput,
};
pub use pricing::{
    band_price, demand_response, discounted, markup_price, mean_price, noisy_demand, PricingError,
};
