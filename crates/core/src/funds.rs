//! Funds valuation: treasury plus the trade value of held commodities.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::rules::{CommodityId, RuleSet};

/// Bounds of the treasury track.
pub const TREASURY_MIN: i32 = -99;
/// Bounds of the treasury track.
pub const TREASURY_MAX: i32 = 99;

/// Funds as entered by the player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsSnapshot {
    /// Treasury tokens, kept within [`TREASURY_MIN`]..=[`TREASURY_MAX`].
    #[serde(default)]
    pub treasury: i32,
    /// Number of cards held per commodity.
    #[serde(default)]
    pub commodities: BTreeMap<CommodityId, u32>,
    /// Whether the best mining yield should be counted.
    #[serde(default)]
    pub use_mining_bonus: bool,
}

impl FundsSnapshot {
    /// Set the treasury, clamping it to the track.
    pub fn set_treasury(&mut self, value: i32) {
        self.treasury = value.clamp(TREASURY_MIN, TREASURY_MAX);
    }

    /// Set the treasury from free-text input.
    pub fn set_treasury_input(&mut self, input: &str) {
        self.set_treasury(coerce_treasury(input));
    }

    /// Set a commodity count. A count of zero removes the entry.
    pub fn set_count(&mut self, commodity: impl Into<CommodityId>, count: u32) {
        let commodity = commodity.into();
        if count == 0 {
            self.commodities.remove(&commodity);
        } else {
            self.commodities.insert(commodity, count);
        }
    }

    /// Set a commodity count from free-text input.
    pub fn set_count_input(&mut self, commodity: impl Into<CommodityId>, input: &str) {
        self.set_count(commodity, coerce_count(input));
    }

    /// Held count for a commodity, zero when absent.
    pub fn count(&self, commodity: &str) -> u32 {
        self.commodities.get(commodity).copied().unwrap_or(0)
    }
}

/// Result of a funds valuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundsTotals {
    /// Total spendable funds, never negative.
    pub total: u32,
    /// Highest extra value obtainable by mining one more commodity card.
    pub max_mining_yield: u32,
}

/// Value a player's funds against the commodity definitions of `rules`.
///
/// Ordinary commodities are worth `count² × base`. Wine-type commodities are
/// pooled: their combined count multiplies their combined `count × base`.
/// Counts above a commodity's maximum are clamped. The mining yield is
/// always reported but only added when the player opted in and
/// `mining_bonus_owned` says a card granting it is owned.
pub fn recalc_total_funds(
    funds: &FundsSnapshot,
    rules: &RuleSet,
    mining_bonus_owned: bool,
) -> FundsTotals {
    for id in funds.commodities.keys() {
        if rules.commodity(id.as_str()).is_none() {
            warn!(commodity = %id, "Ignoring unknown commodity in funds");
        }
    }

    let mut total = i64::from(funds.treasury.clamp(TREASURY_MIN, TREASURY_MAX));
    let mut wine_count: i64 = 0;
    let mut wine_value: i64 = 0;
    let mut max_mining_yield: i64 = 0;

    for commodity in rules.commodities() {
        let count = i64::from(funds.count(commodity.id.as_str()).min(commodity.max));
        if count == 0 {
            continue;
        }
        let base = i64::from(commodity.base);
        if commodity.wine {
            wine_count += count;
            wine_value += count * base;
        } else {
            total += count * count * base;
        }
        if commodity.mineable && count < i64::from(commodity.max) {
            let gain = (count + 1) * (count + 1) * base - count * count * base;
            max_mining_yield = max_mining_yield.max(gain);
        }
    }
    total += wine_count * wine_value;
    if funds.use_mining_bonus && mining_bonus_owned {
        total += max_mining_yield;
    }

    FundsTotals {
        total: u32::try_from(total.max(0)).unwrap_or(u32::MAX),
        max_mining_yield: u32::try_from(max_mining_yield).unwrap_or(u32::MAX),
    }
}

static LEADING_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\+?(\d+)").expect("failed to compile count regex"));

static LEADING_SIGNED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+)").expect("failed to compile treasury regex"));

/// Parse a commodity count, treating anything non-numeric as zero.
pub fn coerce_count(input: &str) -> u32 {
    LEADING_COUNT_RE
        .captures(input)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(0)
}

/// Parse a treasury value, treating anything non-numeric as zero and
/// clamping the result to the treasury track.
pub fn coerce_treasury(input: &str) -> i32 {
    LEADING_SIGNED_RE
        .captures(input)
        .and_then(|cap| cap.get(1))
        .map(|m| match m.as_str().parse::<i64>() {
            Ok(value) => value.clamp(i64::from(TREASURY_MIN), i64::from(TREASURY_MAX)),
            Err(_) if m.as_str().starts_with('-') => i64::from(TREASURY_MIN),
            Err(_) => i64::from(TREASURY_MAX),
        })
        .and_then(|value| i32::try_from(value).ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{GameOptions, RawRules};
    use serde_json::json;

    fn rules() -> RuleSet {
        let raw: RawRules = serde_json::from_value(json!({
            "id": "funds",
            "title": "Funds",
            "cards": [{ "id": "mining", "cost": 180, "mining_bonus": true }],
            "commodities": [
                { "id": "ochre", "base": 1, "max": 7, "mineable": true },
                { "id": "bronze", "base": 6, "max": 5, "mineable": true },
                { "id": "salt", "base": 3, "max": 9 },
                { "id": "wine_x", "base": 3, "max": 5, "wine": true },
                { "id": "wine_y", "base": 4, "max": 5, "wine": true }
            ]
        }))
        .expect("valid rule json");
        RuleSet::new(raw, &GameOptions::default()).expect("valid rule set")
    }

    fn funds(entries: &[(&str, u32)]) -> FundsSnapshot {
        let mut funds = FundsSnapshot::default();
        for (id, count) in entries {
            funds.set_count(*id, *count);
        }
        funds
    }

    #[test]
    fn ordinary_commodities_grow_quadratically() {
        let totals = recalc_total_funds(&funds(&[("salt", 3), ("ochre", 2)]), &rules(), true);
        assert_eq!(totals.total, 9 * 3 + 4);
    }

    #[test]
    fn wine_commodities_are_pooled() {
        let totals = recalc_total_funds(&funds(&[("wine_x", 2), ("wine_y", 1)]), &rules(), true);
        assert_eq!(totals.total, (2 * 3 + 4) * 3);
    }

    #[test]
    fn counts_are_clamped_to_maximum() {
        let totals = recalc_total_funds(&funds(&[("bronze", 9)]), &rules(), true);
        assert_eq!(totals.total, 25 * 6);
        assert_eq!(totals.max_mining_yield, 0);
    }

    #[test]
    fn mining_yield_only_counts_when_opted_in() {
        let mut snapshot = funds(&[("ochre", 3), ("bronze", 1)]);
        let totals = recalc_total_funds(&snapshot, &rules(), true);
        // bronze 1 -> 2 gains 4*6 - 1*6 = 18, ochre 3 -> 4 gains 16 - 9 = 7
        assert_eq!(totals.max_mining_yield, 18);
        assert_eq!(totals.total, 9 + 6);

        snapshot.use_mining_bonus = true;
        let totals = recalc_total_funds(&snapshot, &rules(), true);
        assert_eq!(totals.total, 9 + 6 + 18);
    }

    #[test]
    fn mining_yield_needs_an_owned_bonus_card() {
        let mut snapshot = funds(&[("ochre", 3)]);
        snapshot.use_mining_bonus = true;
        let totals = recalc_total_funds(&snapshot, &rules(), false);
        assert_eq!(totals.total, 9);
        assert_eq!(totals.max_mining_yield, 7);
    }

    #[test]
    fn total_is_floored_at_zero() {
        let mut snapshot = funds(&[("ochre", 2)]);
        snapshot.set_treasury(-500);
        assert_eq!(snapshot.treasury, TREASURY_MIN);
        assert_eq!(recalc_total_funds(&snapshot, &rules(), true).total, 0);
    }

    #[test]
    fn adding_a_commodity_never_lowers_funds() {
        let rules = rules();
        let mut snapshot = funds(&[("wine_x", 1), ("salt", 2)]);
        snapshot.set_treasury(-10);
        for commodity in rules.commodities() {
            let mut previous = recalc_total_funds(&snapshot, &rules, true).total;
            for count in 0..=commodity.max {
                let mut next = snapshot.clone();
                next.set_count(commodity.id.clone(), count);
                let total = recalc_total_funds(&next, &rules, true).total;
                if count > 0 {
                    assert!(total >= previous, "{} at {count}", commodity.id);
                }
                previous = total;
            }
        }
    }

    #[test]
    fn free_text_input_is_coerced() {
        assert_eq!(coerce_count("12"), 12);
        assert_eq!(coerce_count(" 4 cards"), 4);
        assert_eq!(coerce_count("lots"), 0);
        assert_eq!(coerce_count("-3"), 0);
        assert_eq!(coerce_treasury("-12"), -12);
        assert_eq!(coerce_treasury("250"), 99);
        assert_eq!(coerce_treasury("abc"), 0);

        let mut snapshot = FundsSnapshot::default();
        snapshot.set_treasury_input("-1000");
        assert_eq!(snapshot.treasury, -99);
        snapshot.set_count_input("salt", "x");
        assert_eq!(snapshot.count("salt"), 0);
    }
}
