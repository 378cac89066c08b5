#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Durable local settings: accumulated edits, theme, active data source,
//! and the auto-refresh interval.
//!
//! The store is write-through: every mutation persists the full blob to
//! disk before returning, so a crash immediately after an edit loses
//! nothing. Reads fail soft — a missing or corrupted blob loads as the
//! default empty state with a logged warning, never an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use unit_map_unit_models::{DataSource, Settings, UnitPatch};

/// Default location of the settings blob.
pub const DEFAULT_SETTINGS_PATH: &str = "data/settings.json";

/// Errors from settings persistence. Loads never fail; only writes can.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Writing the blob to disk failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the blob failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The single writer of edits and the data-source descriptor.
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Loads the settings blob from `path`, falling back to defaults when
    /// the file is missing or unreadable.
    #[must_use]
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_blob(&path);
        Self { path, settings }
    }

    /// The current settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The accumulated edit patches, keyed by record id.
    #[must_use]
    pub const fn edits(&self) -> &BTreeMap<String, UnitPatch> {
        &self.settings.edits
    }

    /// Upserts one field into the patch for `id`, creating the patch if
    /// absent, and persists.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the persist fails. The in-memory
    /// state is updated regardless so the session keeps working.
    pub fn set_field(
        &mut self,
        id: &str,
        key: &str,
        value: Value,
    ) -> Result<(), SettingsError> {
        self.settings
            .edits
            .entry(id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.persist()
    }

    /// Removes all patches and persists.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the persist fails.
    pub fn clear_edits(&mut self) -> Result<(), SettingsError> {
        self.settings.edits.clear();
        self.persist()
    }

    /// Sets the UI theme and persists.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the persist fails.
    pub fn set_theme(&mut self, theme: &str) -> Result<(), SettingsError> {
        self.settings.theme = theme.to_string();
        self.persist()
    }

    /// Sets the active data-source descriptor and persists.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the persist fails.
    pub fn set_data_source(&mut self, source: DataSource) -> Result<(), SettingsError> {
        self.settings.data_source = source;
        self.persist()
    }

    /// Sets the auto-refresh interval in minutes and persists.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the persist fails.
    pub fn set_refresh_minutes(&mut self, minutes: u64) -> Result<(), SettingsError> {
        self.settings.refresh_minutes = minutes;
        self.persist()
    }

    /// Writes the full blob atomically: serialize to a temp file beside
    /// the target, then rename over it. A crash mid-write keeps the
    /// previous good blob intact.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if serialization or the write fails.
    pub fn persist(&self) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_vec_pretty(&self.settings)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn read_blob(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Settings blob at {} is corrupted ({e}); resetting to defaults",
                    path.display()
                );
                Settings::default()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
        Err(e) => {
            log::warn!(
                "Failed to read settings blob at {} ({e}); using defaults",
                path.display()
            );
            Settings::default()
        }
    }
}
