// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration Constants
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `CHROMA_HOST` | Default server (scheme + host + port) | `http://localhost:8000` |
//! | `CHROMA_ADMIN_DATA_DIR` | Directory for session database and settings | `~/.chroma-admin` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use url::Url;

use crate::session::Protocol;
use crate::storage::StoragePaths;

/// Environment variable holding the default Chroma server URL.
///
/// Seeds the server address and protocol of a fresh session. Values without
/// a scheme are treated as `http`.
pub const CHROMA_HOST_ENV: &str = "CHROMA_HOST";

/// Default server when `CHROMA_HOST` is unset.
pub const DEFAULT_CHROMA_HOST: &str = "http://localhost:8000";

/// Environment variable name for the local data directory.
pub const DATA_DIR_ENV: &str = "CHROMA_ADMIN_DATA_DIR";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Tenant used when none is given.
pub const DEFAULT_TENANT: &str = "default_tenant";

/// Database used when none is given.
pub const DEFAULT_DATABASE: &str = "default_database";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid server URL {value:?}: {reason}")]
    InvalidHost { value: String, reason: String },
}

/// Default connection target derived from `CHROMA_HOST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub protocol: Protocol,
    /// `host[:port]` without scheme.
    pub server_url: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Http,
            server_url: "localhost:8000".to_string(),
        }
    }
}

impl HostConfig {
    /// Read `CHROMA_HOST`, falling back to the default when unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env_optional(CHROMA_HOST_ENV) {
            Some(value) => Self::parse(&value),
            None => Ok(Self::default()),
        }
    }

    /// Split a URL such as `https://chroma.example.com:8443` into protocol
    /// and `host:port`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let invalid = |reason: String| ConfigError::InvalidHost {
            value: raw.to_string(),
            reason,
        };

        let url = Url::parse(&with_scheme).map_err(|e| invalid(e.to_string()))?;
        let protocol = match url.scheme() {
            "http" => Protocol::Http,
            "https" => Protocol::Https,
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        };
        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?;

        let server_url = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        Ok(Self {
            protocol,
            server_url,
        })
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.server_url)
    }
}

/// Data directory from `CHROMA_ADMIN_DATA_DIR`, or the default location.
pub fn storage_paths_from_env() -> StoragePaths {
    match env_optional(DATA_DIR_ENV) {
        Some(dir) => StoragePaths::new(dir),
        None => StoragePaths::default(),
    }
}

pub(crate) fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
