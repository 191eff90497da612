//! Discovery and loading of rule data files.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::models::{GameOptions, RawRules};
use super::ruleset::RuleSet;
use crate::models::RulesInfo;

/// Thread-safe catalog that discovers rule data files in a directory.
#[derive(Clone)]
pub struct RuleCatalog {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    root_path: PathBuf,
    cache: Vec<RulesInfo>,
}

impl RuleCatalog {
    /// Build a catalog rooted at the given rules directory.
    pub fn new(root_path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                root_path: root_path.into(),
                cache: Vec::new(),
            })),
        }
    }

    /// Directory the catalog scans.
    pub fn root_path(&self) -> PathBuf {
        self.inner.read().root_path.clone()
    }

    /// Point the catalog at a different directory and drop cached entries.
    pub fn refresh(&self, root_path: impl Into<PathBuf>) {
        let mut inner = self.inner.write();
        inner.root_path = root_path.into();
        inner.cache.clear();
    }

    /// Return all known rule files, populating the cache on first use.
    pub fn rules(&self) -> Result<Vec<RulesInfo>> {
        let mut inner = self.inner.write();
        if inner.cache.is_empty() {
            inner.cache = discover_rules(&inner.root_path)?;
        }
        Ok(inner.cache.clone())
    }

    /// Filter rule files using a case-insensitive substring search.
    pub fn rules_matching(&self, query: &str) -> Result<Vec<RulesInfo>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.rules();
        }

        Ok(self
            .rules()?
            .into_iter()
            .filter(|info| {
                info.id.to_lowercase().contains(&needle)
                    || info.title.to_lowercase().contains(&needle)
                    || info
                        .subtitle
                        .as_ref()
                        .map(|value| value.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect())
    }

    /// Read the raw rule data registered under `id`.
    pub fn load_raw(&self, id: &str) -> Result<RawRules> {
        let info = self
            .rules()?
            .into_iter()
            .find(|info| info.id == id)
            .ok_or_else(|| anyhow!("no rules with id '{id}' in {}", self.root_path().display()))?;
        read_raw(&info.path)
    }

    /// Load and validate the rule set registered under `id`.
    pub fn load(&self, id: &str, options: &GameOptions) -> Result<RuleSet> {
        let raw = self.load_raw(id)?;
        RuleSet::new(raw, options).with_context(|| format!("invalid rule data for '{id}'"))
    }
}

fn discover_rules(root: &Path) -> Result<Vec<RulesInfo>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<_> = fs::read_dir(root)
        .with_context(|| format!("failed to read rules directory {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter(|entry| entry.path().extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    files.sort_by_key(|entry| entry.file_name());

    let mut rules = Vec::new();
    for entry in files {
        let path = entry.path();
        match read_raw(&path) {
            Ok(raw) => {
                debug!(id = %raw.id, path = %path.display(), "Discovered rules");
                rules.push(RulesInfo {
                    id: raw.id.trim().to_string(),
                    title: raw.title.trim().to_string(),
                    subtitle: raw
                        .subtitle
                        .map(|value| value.trim().to_string())
                        .filter(|s| !s.is_empty()),
                    path,
                    card_count: raw.cards.len(),
                    card_limit: raw.options.card_limit,
                });
            }
            Err(err) => warn!("Skipping {}: {err:#}", path.display()),
        }
    }

    Ok(rules)
}

fn read_raw(path: &Path) -> Result<RawRules> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
