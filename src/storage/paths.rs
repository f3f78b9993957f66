// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the local data directory.

use std::path::{Path, PathBuf};

/// Fallback data directory when no home directory can be determined.
pub const DATA_ROOT: &str = ".chroma-admin";

/// Storage path utilities for the local data directory.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        let root = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .map(|home| PathBuf::from(home).join(DATA_ROOT))
            .unwrap_or_else(|| PathBuf::from(DATA_ROOT));
        Self::new(root)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all local data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key-value database holding the encrypted session and last route.
    pub fn session_db(&self) -> PathBuf {
        self.root.join("session.redb")
    }

    /// Non-sensitive connection settings.
    pub fn settings_file(&self) -> PathBuf {
        self.root.join("settings.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_rooted() {
        let paths = StoragePaths::new("/tmp/chroma-admin-test");
        assert_eq!(paths.root(), Path::new("/tmp/chroma-admin-test"));
        assert_eq!(
            paths.session_db(),
            PathBuf::from("/tmp/chroma-admin-test/session.redb")
        );
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/tmp/chroma-admin-test/settings.json")
        );
    }

    #[test]
    fn default_root_ends_with_data_dir_name() {
        let paths = StoragePaths::default();
        assert!(paths.root().ends_with(DATA_ROOT));
    }
}
