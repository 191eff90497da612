//! Shared domain models.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Summary of a rule data file found by the rule catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesInfo {
    /// Short identifier (e.g. `mega`).
    pub id: String,
    /// Human-readable game title.
    pub title: String,
    /// Optional subtitle/variant name.
    pub subtitle: Option<String>,
    /// File the rules were read from.
    pub path: PathBuf,
    /// Number of civilization cards defined.
    pub card_count: usize,
    /// Maximum number of cards a player may own, if limited.
    pub card_limit: Option<u32>,
}

impl RulesInfo {
    /// Returns a user-facing label combining title and subtitle.
    pub fn display_name(&self) -> String {
        match self.subtitle.as_deref() {
            Some(subtitle) if !subtitle.is_empty() => format!("{} · {}", self.title, subtitle),
            _ => self.title.clone(),
        }
    }
}
