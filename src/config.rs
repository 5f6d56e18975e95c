use crate::error::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const MODE_ENV: &str = "SNAPSHOT_MODE";
pub const UPDATE_ENV: &str = "UPDATE_SNAPSHOTS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotMode {
    /// Write a new reference and fail so it gets reviewed.
    Record,
    #[default]
    Compare,
}

impl std::str::FromStr for SnapshotMode {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "record" => Ok(SnapshotMode::Record),
            "compare" => Ok(SnapshotMode::Compare),
            other => Err(SnapshotError::Config(format!(
                "unknown snapshot mode {other:?}, expected \"record\" or \"compare\""
            ))),
        }
    }
}

/// Where snapshot artifacts live and which lifecycle mode to run.
///
/// ```toml
/// mode = "compare"
/// reference_dir = "tests/screenshots"
/// output_dir = "target/screenshots/output"
/// diff_dir = "target/screenshots/diff"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub mode: SnapshotMode,
    /// Committed reference images.
    pub reference_dir: PathBuf,
    /// Captures that failed comparison.
    pub output_dir: PathBuf,
    /// Highlight overlays of failed comparisons.
    pub diff_dir: PathBuf,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            mode: SnapshotMode::Compare,
            reference_dir: PathBuf::from("tests/screenshots"),
            output_dir: PathBuf::from("target/screenshots/output"),
            diff_dir: PathBuf::from("target/screenshots/diff"),
        }
    }
}

impl SnapshotConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SnapshotError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| SnapshotError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn with_mode(mut self, mode: SnapshotMode) -> Self {
        self.mode = mode;
        self
    }

    /// Resolves relative directories against `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        for dir in [
            &mut self.reference_dir,
            &mut self.output_dir,
            &mut self.diff_dir,
        ] {
            if dir.is_relative() {
                *dir = root.join(&*dir);
            }
        }
        self
    }

    /// Applies `SNAPSHOT_MODE` and `UPDATE_SNAPSHOTS` from the process
    /// environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// `UPDATE_SNAPSHOTS=1` (or `true`) forces record mode and wins over
    /// `SNAPSHOT_MODE`.
    pub fn apply_vars<F>(mut self, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = var(MODE_ENV) {
            self.mode = mode.parse()?;
        }
        let update = var(UPDATE_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if update {
            self.mode = SnapshotMode::Record;
        }
        Ok(self)
    }
}
