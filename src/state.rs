// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Application wiring: storage, session, guard, loading, notifications and
//! the data-access layer.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::chroma::ChromaStore;
use crate::config::HostConfig;
use crate::loading::LoadingState;
use crate::notifications::NotificationCenter;
use crate::router::{NavigationGuard, RouteTable};
use crate::session::SessionStore;
use crate::storage::{
    Fingerprint, KeyValueStore, MemoryStore, RedbStore, SecureStorage, SettingsFile, StorageError,
    StoragePaths,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Failed to open session storage: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct AppState {
    /// Plain key-value store under the secure storage.
    pub store: Arc<dyn KeyValueStore>,
    pub session: Arc<SessionStore>,
    pub guard: NavigationGuard,
    pub loading: Arc<LoadingState>,
    pub notifications: NotificationCenter,
    pub chroma: ChromaStore,
}

impl AppState {
    /// Open the on-disk stores under `paths` and sweep expired secure items.
    pub async fn bootstrap(paths: &StoragePaths, host: HostConfig) -> Result<Self, BootstrapError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(RedbStore::open(&paths.session_db())?);
        let secure = SecureStorage::new(store.clone(), Fingerprint::from_environment());

        let swept = secure.clear_expired_items().await;
        if swept > 0 {
            info!(count = swept, "Removed expired secure items");
        }

        let session = SessionStore::new(host, secure, http_client()?)
            .with_settings(SettingsFile::new(paths.settings_file()));
        info!(data_dir = %paths.root().display(), "Storage ready");
        Ok(Self::wire(store, session))
    }

    /// Fully in-memory state; nothing touches the disk.
    pub fn in_memory(host: HostConfig, fingerprint: Fingerprint) -> Result<Self, BootstrapError> {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let secure = SecureStorage::new(store.clone(), fingerprint);
        let session = SessionStore::new(host, secure, http_client()?);
        Ok(Self::wire(store, session))
    }

    fn wire(store: Arc<dyn KeyValueStore>, session: SessionStore) -> Self {
        let session = Arc::new(session);
        let loading = Arc::new(LoadingState::new());
        let notifications = NotificationCenter::new();

        Self {
            store,
            guard: NavigationGuard::new(session.clone(), RouteTable::standard()),
            chroma: ChromaStore::new(session.clone(), loading.clone(), notifications.clone()),
            session,
            loading,
            notifications,
        }
    }
}

fn http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("chroma-admin/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::router::Navigation;
    use crate::session::{LoginForm, Protocol};
    use crate::storage::DEFAULT_TTL;
    use crate::test_support::FakeChroma;

    #[tokio::test]
    async fn in_memory_state_is_wired() {
        let state = AppState::in_memory(HostConfig::default(), Fingerprint::fixed("state")).unwrap();
        assert_eq!(
            state.guard.before_each("/").await,
            Navigation::Redirect("/login".into())
        );
        assert!(!state.loading.is_any_loading());
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn bootstrap_sweeps_expired_items_only() {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::new(dir.path());

        {
            let store: Arc<dyn KeyValueStore> = Arc::new(RedbStore::open(&paths.session_db()).unwrap());
            let past = Arc::new(ManualClock::new(Utc::now() - chrono::Duration::days(2)));
            let secure = SecureStorage::new(store.clone(), Fingerprint::from_environment()).with_clock(past);
            secure.set_secure_item("old", &"stale", DEFAULT_TTL).await.unwrap();
            store.set("lastRoute", "/collection/docs").unwrap();
        }

        let state = AppState::bootstrap(&paths, HostConfig::default()).await.unwrap();
        assert_eq!(state.store.get("secure:old").unwrap(), None);
        assert_eq!(
            state.store.get("lastRoute").unwrap().as_deref(),
            Some("/collection/docs")
        );
    }

    #[tokio::test]
    async fn session_survives_process_restart() {
        let server = FakeChroma::start().await;
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::new(dir.path());

        {
            let state = AppState::bootstrap(&paths, HostConfig::default()).await.unwrap();
            state
                .session
                .login(LoginForm::new(server.server_url(), Protocol::Http).with_tenant("acme"))
                .await
                .unwrap();
        }

        let state = AppState::bootstrap(&paths, HostConfig::default()).await.unwrap();
        assert_eq!(state.guard.before_each("/").await, Navigation::Proceed);
        assert_eq!(state.session.tenant().await, "acme");
        assert_eq!(state.session.login_defaults().server_url, server.server_url());
    }
}
