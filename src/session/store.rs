// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session store: login, logout and restoration of the connection session.
//!
//! ## Lifecycle
//!
//! ```text
//! Anonymous --login--> Authenticating --probe ok--> Authenticated
//!                            |
//!                            +--probe failed--> Anonymous (error returned)
//! Authenticated --logout--> Anonymous
//! Anonymous --restore_session (valid record)--> Authenticated
//! ```
//!
//! An authenticated session is only ever committed after a heartbeat probe
//! against the exact server, tenant and database it names.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::state::{LoginForm, PersistedSession, SessionPhase, SessionState};
use crate::config::HostConfig;
use crate::error::ApiError;
use crate::storage::{SavedSettings, SecureStorage, SettingsFile, StorageError, DEFAULT_TTL};

/// Secure-storage key of the persisted session.
pub const SESSION_KEY: &str = "auth";

/// Plain-storage key of the last authorized route.
pub const LAST_ROUTE_KEY: &str = "lastRoute";

/// Health-check endpoint probed on login.
pub const HEARTBEAT_PATH: &str = "/api/v2/heartbeat";

/// Upper bound for the login probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server could not be reached or rejected the probe.
    #[error("{0}")]
    Connection(#[from] ApiError),

    /// The session was established but could not be persisted.
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid server address: {0}")]
    InvalidServer(String),
}

/// Owner of the connection session. The only writer of [`SessionState`].
pub struct SessionStore {
    host: HostConfig,
    state: RwLock<SessionState>,
    secure: SecureStorage,
    settings: Option<SettingsFile>,
    http: reqwest::Client,
    restoration_attempted: AtomicBool,
}

impl SessionStore {
    pub fn new(host: HostConfig, secure: SecureStorage, http: reqwest::Client) -> Self {
        Self {
            state: RwLock::new(SessionState::new(&host)),
            host,
            secure,
            settings: None,
            http,
            restoration_attempted: AtomicBool::new(false),
        }
    }

    /// Remember non-sensitive connection settings in this file after login.
    pub fn with_settings(mut self, settings: SettingsFile) -> Self {
        self.settings = Some(settings);
        self
    }

    // ========== Transitions ==========

    /// Probe the server described by `form` and, on success, commit and
    /// persist the session.
    ///
    /// No retry is attempted. On failure the session is anonymous and the
    /// error is returned for display.
    pub async fn login(&self, form: LoginForm) -> Result<(), SessionError> {
        let (server_url, protocol) = form
            .endpoint()
            .map_err(|e| SessionError::InvalidServer(e.to_string()))?;
        if server_url.is_empty() {
            return Err(SessionError::InvalidServer(
                "server address is required".to_string(),
            ));
        }

        let candidate = {
            let mut state = self.state.write().await;
            state.phase = SessionPhase::Authenticating;
            SessionState {
                phase: SessionPhase::Authenticated,
                server_url,
                protocol,
                tenant: form.tenant_or_default(),
                database: form.database_or_default(),
                auth: form.auth.clone(),
                last_route: state.last_route.clone(),
            }
        };

        info!(
            server = %candidate.base_url(),
            tenant = %candidate.tenant,
            database = %candidate.database,
            auth = candidate.auth.kind(),
            "Probing Chroma server"
        );

        if let Err(e) = self.probe(&candidate).await {
            self.state.write().await.phase = SessionPhase::Anonymous;
            warn!(server = %candidate.base_url(), error = %e, "Login probe failed");
            return Err(e.into());
        }

        *self.state.write().await = candidate.clone();
        self.save_settings(&candidate);
        self.secure
            .set_secure_item(SESSION_KEY, &PersistedSession::from(&candidate), DEFAULT_TTL)
            .await?;

        info!(server = %candidate.base_url(), "Login succeeded");
        Ok(())
    }

    /// Drop credentials and the persisted session. Safe to call repeatedly.
    ///
    /// The server address is kept so the next login can start from it.
    pub async fn logout(&self) {
        {
            let mut state = self.state.write().await;
            let fresh = SessionState::new(&self.host);
            state.phase = SessionPhase::Anonymous;
            state.auth = fresh.auth;
            state.tenant = fresh.tenant;
            state.database = fresh.database;
            state.last_route = None;
        }

        if let Err(e) = self.secure.remove_secure_item(SESSION_KEY) {
            warn!(error = %e, "Failed to remove persisted session");
        }
        if let Err(e) = self.secure.store().remove(LAST_ROUTE_KEY) {
            warn!(error = %e, "Failed to remove last route");
        }
        info!("Logged out");
    }

    /// Restore an authenticated session from secure storage.
    ///
    /// Returns `true` if the session is authenticated afterwards. An
    /// already-authenticated in-memory session is never downgraded. Storage
    /// and decryption problems degrade to `false`; this never fails.
    pub async fn restore_session(&self) -> bool {
        if self.is_authenticated().await {
            return true;
        }

        let Some(persisted) = self
            .secure
            .get_secure_item::<PersistedSession>(SESSION_KEY)
            .await
        else {
            debug!("No persisted session to restore");
            return false;
        };

        if !persisted.is_authenticated {
            debug!("Persisted session is not authenticated");
            return false;
        }

        let mut state = self.state.write().await;
        if state.is_authenticated() {
            return true;
        }

        let last_route = state.last_route.take();
        *state = SessionState {
            phase: SessionPhase::Authenticated,
            server_url: persisted.server_url,
            protocol: persisted.protocol,
            tenant: persisted.tenant,
            database: persisted.database,
            auth: persisted.auth,
            last_route,
        };

        info!(server = %state.base_url(), "Session restored");
        true
    }

    /// Run [`Self::restore_session`] the first time only.
    ///
    /// Later calls skip storage entirely and report the in-memory state.
    pub async fn restore_once(&self) -> bool {
        if self.restoration_attempted.swap(true, Ordering::SeqCst) {
            return self.is_authenticated().await;
        }
        self.restore_session().await
    }

    pub fn restoration_attempted(&self) -> bool {
        self.restoration_attempted.load(Ordering::SeqCst)
    }

    /// Allow the next [`Self::restore_once`] to hit storage again.
    pub fn reset_restoration(&self) {
        self.restoration_attempted.store(false, Ordering::SeqCst);
    }

    // ========== Last Route ==========

    /// Remember the last authorized path (best effort).
    pub async fn set_last_route(&self, path: &str) {
        self.state.write().await.last_route = Some(path.to_string());
        if let Err(e) = self.secure.store().set(LAST_ROUTE_KEY, path) {
            warn!(error = %e, "Failed to store last route");
        }
    }

    /// Last authorized path, from memory first, then plain storage.
    pub async fn last_route(&self) -> Option<String> {
        if let Some(route) = self.state.read().await.last_route.clone() {
            return Some(route);
        }
        match self.secure.store().get(LAST_ROUTE_KEY) {
            Ok(route) => route,
            Err(e) => {
                warn!(error = %e, "Failed to read last route");
                None
            }
        }
    }

    // ========== Getters ==========

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn base_url(&self) -> String {
        self.state.read().await.base_url()
    }

    pub async fn tenant(&self) -> String {
        self.state.read().await.tenant.clone()
    }

    pub async fn database(&self) -> String {
        self.state.read().await.database.clone()
    }

    /// Request headers for the current session.
    pub async fn headers(&self) -> HeaderMap {
        build_headers(&*self.state.read().await)
    }

    /// Login form pre-filled from saved settings over the configured host.
    pub fn login_defaults(&self) -> LoginForm {
        let saved = self
            .settings
            .as_ref()
            .and_then(SettingsFile::load)
            .unwrap_or_default();

        LoginForm {
            server_url: saved
                .server_url
                .unwrap_or_else(|| self.host.server_url.clone()),
            protocol: saved.protocol.unwrap_or(self.host.protocol),
            tenant: saved.tenant,
            database: saved.database,
            auth: Default::default(),
        }
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ========== Internals ==========

    async fn probe(&self, candidate: &SessionState) -> Result<(), ApiError> {
        let response = self
            .http
            .get(format!("{}{HEARTBEAT_PATH}", candidate.base_url()))
            .headers(build_headers(candidate))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(ApiError::transport)?;
        ApiError::check(response).await?;
        Ok(())
    }

    fn save_settings(&self, state: &SessionState) {
        let Some(file) = &self.settings else {
            return;
        };
        let settings = SavedSettings {
            server_url: Some(state.server_url.clone()),
            protocol: Some(state.protocol),
            tenant: Some(state.tenant.clone()),
            database: Some(state.database.clone()),
            saved_at: None,
        };
        if let Err(e) = file.save(&settings) {
            warn!(path = %file.path().display(), error = %e, "Failed to save settings");
        }
    }
}

fn build_headers(state: &SessionState) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(value) = state.auth.header_value() {
        match HeaderValue::from_str(&value) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("Credentials contain characters not allowed in a header"),
        }
    }
    headers
}
