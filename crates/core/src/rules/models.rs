#![allow(missing_docs)]

use std::{
    borrow::Borrow,
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

/// Language used when a definition carries no name for the requested one.
pub const FALLBACK_LANGUAGE: &str = "en";

/// Identifier of a civilization card as it appears in rule data.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CardId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Identifier of a trade commodity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommodityId(String);

impl CommodityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommodityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CommodityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CommodityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Display names keyed by language code.
pub type Names = BTreeMap<String, String>;

/// Resolve a display name, falling back to English and then to `fallback`.
pub fn localized<'a>(names: &'a Names, language: &str, fallback: &'a str) -> &'a str {
    names
        .get(language)
        .or_else(|| names.get(FALLBACK_LANGUAGE))
        .map(String::as_str)
        .unwrap_or(fallback)
}

/// Static definition of a civilization card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: CardId,
    #[serde(default)]
    pub names: Names,
    pub cost: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerequisite: Option<CardId>,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    /// Credit points this card grants to each target card.
    #[serde(default)]
    pub credits: BTreeMap<CardId, u32>,
    #[serde(default)]
    pub mining_bonus: bool,
}

impl CardDefinition {
    pub fn display_name(&self, language: &str) -> &str {
        localized(&self.names, language, self.id.as_str())
    }
}

/// Static definition of a trade commodity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityDefinition {
    pub id: CommodityId,
    #[serde(default)]
    pub names: Names,
    pub base: u32,
    pub max: u32,
    #[serde(default)]
    pub wine: bool,
    #[serde(default)]
    pub mineable: bool,
}

impl CommodityDefinition {
    pub fn display_name(&self, language: &str) -> &str {
        localized(&self.names, language, self.id.as_str())
    }
}

/// Game options as declared by the rule data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOptions {
    #[serde(default)]
    pub card_limit: Option<u32>,
    #[serde(default = "default_multi_use_credits")]
    pub multi_use_credits: bool,
    #[serde(default)]
    pub points_targets: Vec<u32>,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            card_limit: None,
            multi_use_credits: default_multi_use_credits(),
            points_targets: Vec::new(),
        }
    }
}

fn default_multi_use_credits() -> bool {
    true
}

/// Complete rule data file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRules {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub options: RawOptions,
    pub cards: Vec<CardDefinition>,
    #[serde(default)]
    pub commodities: Vec<CommodityDefinition>,
}

/// Options chosen by the players for a particular game. `None` keeps the
/// value declared by the rule data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOptions {
    #[serde(default)]
    pub card_limit: Option<u32>,
    #[serde(default)]
    pub multi_use_credits: Option<bool>,
}
