#![allow(missing_docs)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::CardRuntimeState;
use crate::{
    funds::{FundsSnapshot, FundsTotals},
    rules::{models::FALLBACK_LANGUAGE, CardId, GameOptions},
};

/// Persisted part of a player's situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationRecord {
    pub player: String,
    pub rules_id: String,
    #[serde(default)]
    pub options: GameOptions,
    /// Owned cards in the order they were bought.
    #[serde(default)]
    pub owned: Vec<CardId>,
    #[serde(default)]
    pub funds: FundsSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_target: Option<u32>,
    #[serde(default)]
    pub card_filter_active: bool,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SituationRecord {
    pub fn new(player: impl Into<String>, rules_id: impl Into<String>) -> Self {
        Self {
            player: player.into(),
            rules_id: rules_id.into(),
            options: GameOptions::default(),
            owned: Vec::new(),
            funds: FundsSnapshot::default(),
            points_target: None,
            card_filter_active: false,
            language: default_language(),
            updated_at: None,
        }
    }
}

fn default_language() -> String {
    FALLBACK_LANGUAGE.to_string()
}

/// Runtime session of one player: the persisted record plus everything
/// derived from it.
#[derive(Debug, Clone)]
pub struct Situation {
    pub(crate) record: SituationRecord,
    /// Volatile, never persisted.
    pub(crate) planned: Vec<CardId>,
    pub(crate) cards: HashMap<CardId, CardRuntimeState>,
    pub(crate) score: u32,
    pub(crate) num_owned: u32,
    pub(crate) planned_value: u32,
    pub(crate) funds: FundsTotals,
}

impl Situation {
    pub(crate) fn new(record: SituationRecord) -> Self {
        Self {
            record,
            planned: Vec::new(),
            cards: HashMap::new(),
            score: 0,
            num_owned: 0,
            planned_value: 0,
            funds: FundsTotals::default(),
        }
    }

    pub fn record(&self) -> &SituationRecord {
        &self.record
    }

    pub fn planned(&self) -> &[CardId] {
        &self.planned
    }

    pub fn cards(&self) -> &HashMap<CardId, CardRuntimeState> {
        &self.cards
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn num_owned(&self) -> u32 {
        self.num_owned
    }

    pub fn num_planned(&self) -> u32 {
        u32::try_from(self.planned.len()).unwrap_or(u32::MAX)
    }

    pub fn planned_value(&self) -> u32 {
        self.planned_value
    }

    pub fn funds(&self) -> FundsTotals {
        self.funds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_fills_defaults() {
        let record: SituationRecord = serde_json::from_value(json!({
            "player": "Ada",
            "rules_id": "mega",
            "owned": ["pottery"]
        }))
        .unwrap();
        assert_eq!(record.language, "en");
        assert_eq!(record.owned, vec![CardId::from("pottery")]);
        assert!(!record.card_filter_active);
        assert_eq!(record.funds, FundsSnapshot::default());
    }
}
