// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Non-sensitive connection settings kept for pre-filling the login form.
//!
//! Only the server address, protocol, tenant and database are saved here.
//! Credentials never leave the encrypted session record.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::StorageResult;
use crate::clock::{Clock, SystemClock};
use crate::session::Protocol;

/// Settings older than this are ignored on load.
pub const SETTINGS_MAX_AGE_DAYS: i64 = 365;

/// Last-used connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<Protocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// JSON settings file.
#[derive(Clone)]
pub struct SettingsFile {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SettingsFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved settings. Missing, corrupt or stale files read as `None`.
    pub fn load(&self) -> Option<SavedSettings> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read settings file");
                return None;
            }
        };

        let settings: SavedSettings = match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to parse settings file");
                return None;
            }
        };

        if let Some(saved_at) = settings.saved_at {
            if self.clock.now() - saved_at > Duration::days(SETTINGS_MAX_AGE_DAYS) {
                return None;
            }
        }

        Some(settings)
    }

    /// Save settings (atomic write via rename), stamping `saved_at`.
    pub fn save(&self, settings: &SavedSettings) -> StorageResult<()> {
        let mut settings = settings.clone();
        settings.saved_at = Some(self.clock.now());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &settings)?;
            writer.flush()?;
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Delete the settings file.
    pub fn clear(&self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn sample() -> SavedSettings {
        SavedSettings {
            server_url: Some("chroma.internal:8000".into()),
            protocol: Some(Protocol::Https),
            tenant: Some("acme".into()),
            database: Some("prod".into()),
            saved_at: None,
        }
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        file.save(&sample()).unwrap();

        let loaded = file.load().unwrap();
        assert_eq!(loaded.server_url.as_deref(), Some("chroma.internal:8000"));
        assert_eq!(loaded.protocol, Some(Protocol::Https));
        assert!(loaded.saved_at.is_some());
        assert!(!dir.path().join("settings.tmp").exists());
    }

    #[test]
    fn serialized_form_uses_camel_case_and_no_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        file.save(&sample()).unwrap();

        let raw = fs::read_to_string(file.path()).unwrap();
        assert!(raw.contains("\"serverUrl\""));
        assert!(raw.contains("\"https\""));
        assert!(!raw.contains("token"));
    }

    #[test]
    fn missing_and_corrupt_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        assert_eq!(file.load(), None);

        fs::write(file.path(), "{not json").unwrap();
        assert_eq!(file.load(), None);
    }

    #[test]
    fn stale_settings_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::starting_now());
        let file = SettingsFile::new(dir.path().join("settings.json")).with_clock(clock.clone());
        file.save(&sample()).unwrap();

        clock.advance(Duration::days(SETTINGS_MAX_AGE_DAYS + 1));
        assert_eq!(file.load(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        file.save(&sample()).unwrap();
        file.clear().unwrap();
        file.clear().unwrap();
        assert_eq!(file.load(), None);
    }
}
