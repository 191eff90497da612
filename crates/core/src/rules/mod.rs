//! Rule data: card and commodity definitions and the derived rule set.

pub mod catalog;
pub mod models;
mod ruleset;

pub use catalog::RuleCatalog;
pub use models::{
    CardDefinition, CardId, CommodityDefinition, CommodityId, GameOptions, RawOptions, RawRules,
};
pub use ruleset::{RuleSet, RuleSetError};
