//! Situation persistence: one JSON file per player.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::SituationRecord;

/// Directory under the user's config directory used for situations.
pub const DEFAULT_STORE_DIR: &str = "civcalc/situations";

/// Summary of a persisted situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationEntry {
    /// Absolute path to the situation file on disk.
    pub path: PathBuf,
    /// Player the situation belongs to.
    pub player: String,
    /// Identifier of the rules the situation was recorded with.
    pub rules_id: String,
    /// Number of owned cards.
    pub owned_count: usize,
    /// Timestamp of the last write.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SituationEntry {
    fn new(path: PathBuf, record: &SituationRecord) -> Self {
        Self {
            path,
            player: record.player.clone(),
            rules_id: record.rules_id.clone(),
            owned_count: record.owned.len(),
            updated_at: record.updated_at,
        }
    }
}

/// Reads and writes situation records.
pub struct SituationStore {
    root: PathBuf,
}

impl SituationStore {
    /// Create a store rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STORE_DIR)
    }

    /// File holding the situation of `player`.
    pub fn path_for(&self, player: &str) -> PathBuf {
        self.root
            .join(format!("{}.json", sanitize_component(player)))
    }

    /// All stored situations, most recently updated first.
    pub fn entries(&self) -> Result<Vec<SituationEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).context("failed to read situation directory")? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match read_record(&entry.path()) {
                Ok(record) => entries.push(SituationEntry::new(entry.path(), &record)),
                Err(err) => {
                    warn!("Failed to read situation {:?}: {err}", entry.path());
                }
            }
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    /// Load the situation of `player`, if one was stored. Fails when the
    /// file belongs to a different player, which happens on filesystems that
    /// ignore case.
    pub fn load(&self, player: &str) -> Result<Option<SituationRecord>> {
        let path = self.path_for(player);
        if !path.exists() {
            return Ok(None);
        }
        let record = read_record(&path)?;
        if record.player != player {
            bail!(
                "{} holds the situation of '{}', not '{player}'",
                path.display(),
                record.player
            );
        }
        Ok(Some(record))
    }

    /// Persist `record`, stamping its update time.
    pub fn save(&self, record: &mut SituationRecord) -> Result<SituationEntry> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        record.updated_at = Some(Utc::now());
        let path = self.path_for(&record.player);
        let serialised = serde_json::to_vec_pretty(record)?;
        fs::write(&path, serialised)
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!(player = %record.player, path = %path.display(), "Situation saved");
        Ok(SituationEntry::new(path, record))
    }

    /// Delete the situation of `player`. Returns whether a file was removed.
    pub fn remove(&self, player: &str) -> Result<bool> {
        let path = self.path_for(player);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        Ok(true)
    }
}

fn read_record(path: &Path) -> Result<SituationRecord> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// File-name-safe and injective: every byte other than an ASCII letter,
/// digit or `-` becomes `_xx`.
fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            result.push(char::from(byte));
        } else {
            let _ = write!(result, "_{byte:02x}");
        }
    }
    if result.is_empty() {
        "player".to_string()
    } else {
        result
    }
}
