#![warn(clippy::all, missing_docs)]

//! Core domain logic for civcalc.
//!
//! This crate hosts the rule data model, the card state engine with its
//! credit ledger and finishability search, funds valuation, configuration
//! and situation persistence used by the command-line shell and any future
//! frontends.

pub mod config;
mod credit;
pub mod engine;
pub mod funds;
pub mod models;
pub mod rules;
pub mod search;
pub mod store;

pub use config::AppConfig;
pub use engine::{
    CardRuntimeState, CardState, Situation, SituationRecord, StateArgument, StateEngine,
};
pub use funds::{recalc_total_funds, FundsSnapshot, FundsTotals};
pub use models::RulesInfo;
pub use rules::{CardId, CommodityId, GameOptions, RuleCatalog, RuleSet, RuleSetError};
pub use search::{power_set, FinishabilitySearch};
pub use store::{SituationEntry, SituationStore};
