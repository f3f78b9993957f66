// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session data types.

use std::fmt;
use std::str::FromStr;

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, HostConfig, DEFAULT_DATABASE, DEFAULT_TENANT};

/// Connection scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => write!(f, "http"),
            Protocol::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(format!("unknown protocol {other:?} (expected http or https)")),
        }
    }
}

/// Credentials sent with every request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Server runs without authentication.
    #[default]
    None,
    /// `Authorization: Bearer <token>`
    Token { token: String },
    /// `Authorization: Basic <base64(username:password)>`
    Basic { username: String, password: String },
}

impl AuthMethod {
    /// Value of the `Authorization` header, if any.
    pub fn header_value(&self) -> Option<String> {
        match self {
            AuthMethod::None => None,
            AuthMethod::Token { token } => Some(format!("Bearer {token}")),
            AuthMethod::Basic { username, password } => {
                let encoded = Base64::encode_string(format!("{username}:{password}").as_bytes());
                Some(format!("Basic {encoded}"))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Token { .. } => "token",
            AuthMethod::Basic { .. } => "basic",
        }
    }
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::None => write!(f, "None"),
            AuthMethod::Token { .. } => f.debug_struct("Token").field("token", &"<redacted>").finish(),
            AuthMethod::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// Where the session is in its login lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    Authenticated,
}

/// In-memory session held by the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub server_url: String,
    pub protocol: Protocol,
    pub tenant: String,
    pub database: String,
    pub auth: AuthMethod,
    pub last_route: Option<String>,
}

impl SessionState {
    /// Anonymous session pointing at the configured default server.
    pub fn new(host: &HostConfig) -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            server_url: host.server_url.clone(),
            protocol: host.protocol,
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            auth: AuthMethod::None,
            last_route: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.server_url)
    }
}

/// Encrypted on-disk form of an authenticated session. The last route is
/// kept separately under its own plain key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub is_authenticated: bool,
    pub server_url: String,
    pub protocol: Protocol,
    pub tenant: String,
    pub database: String,
    #[serde(default)]
    pub auth: AuthMethod,
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            is_authenticated: state.is_authenticated(),
            server_url: state.server_url.clone(),
            protocol: state.protocol,
            tenant: state.tenant.clone(),
            database: state.database.clone(),
            auth: state.auth.clone(),
        }
    }
}

/// Input to [`super::SessionStore::login`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub server_url: String,
    pub protocol: Protocol,
    pub tenant: Option<String>,
    pub database: Option<String>,
    pub auth: AuthMethod,
}

impl LoginForm {
    pub fn new(server_url: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            server_url: server_url.into(),
            protocol,
            tenant: None,
            database: None,
            auth: AuthMethod::None,
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_auth(mut self, auth: AuthMethod) -> Self {
        self.auth = auth;
        self
    }

    /// Server address and protocol to connect to. A scheme in the address
    /// overrides [`Self::protocol`].
    pub fn endpoint(&self) -> Result<(String, Protocol), ConfigError> {
        let trimmed = self.server_url.trim();
        if trimmed.contains("://") {
            let host = HostConfig::parse(trimmed)?;
            return Ok((host.server_url, host.protocol));
        }
        Ok((trimmed.trim_end_matches('/').to_string(), self.protocol))
    }

    pub fn tenant_or_default(&self) -> String {
        non_blank(self.tenant.as_deref()).unwrap_or_else(|| DEFAULT_TENANT.to_string())
    }

    pub fn database_or_default(&self) -> String {
        non_blank(self.database.as_deref()).unwrap_or_else(|| DEFAULT_DATABASE.to_string())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
