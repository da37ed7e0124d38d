#![deny(warnings)]

//! Round settlement orchestrator for Handset Tycoon.
//!
//! [`settle_round`] turns one round's decisions into new market, trade, team
//! and supply snapshots plus a financial result per team. [`Session`] carries
//! those snapshots across rounds and runs the achievement ledger after each
//! settlement.

pub mod operations;
pub mod sanitize;
pub mod session;
pub mod settle;

pub use sanitize::{sanitize, SanitizedDecisions};
pub use session::{RoundReport, Session, SessionError, TeamSpec};
pub use settle::{production_capacity, settle_round, RoundInput, RoundOutcome};
