// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Data-access layer: CRUD against collections and records with a local
//! mirror of what the server returned.
//!
//! Every operation follows the same shape:
//!
//! 1. Resolve local references (collection by name). A miss sets the local
//!    error, emits an error notification and returns without a request.
//! 2. Run the request inside [`LoadingState::with_loading`].
//! 3. On success update the mirror and possibly notify.
//! 4. On failure set the local error, notify and return the error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::metadata::validate_document;
use super::models::{
    AddRecordsBody, CollectionInfo, CreateCollectionBody, DeleteRecordsBody, Document,
    GetRecordsBody, GetRecordsResponse, NewDocument,
};
use super::paths;
use crate::error::ApiError;
use crate::loading::{LoadingKey, LoadingState};
use crate::notifications::NotificationCenter;
use crate::session::SessionStore;

#[derive(Debug, Default)]
struct Mirror {
    collections: Vec<CollectionInfo>,
    current_collection: Option<String>,
    documents: Vec<Document>,
    error: Option<String>,
}

impl Mirror {
    fn find(&self, name: &str) -> Option<CollectionInfo> {
        self.collections.iter().find(|c| c.name == name).cloned()
    }

    fn upsert(&mut self, collection: CollectionInfo) {
        self.collections.retain(|c| c.name != collection.name);
        let index = self
            .collections
            .partition_point(|c| c.name < collection.name);
        self.collections.insert(index, collection);
    }
}

pub struct ChromaStore {
    session: Arc<SessionStore>,
    loading: Arc<LoadingState>,
    notifications: NotificationCenter,
    mirror: RwLock<Mirror>,
    /// Bumped by every documents fetch; a response is applied only if no
    /// newer fetch started meanwhile.
    documents_generation: AtomicU64,
}

impl ChromaStore {
    pub fn new(
        session: Arc<SessionStore>,
        loading: Arc<LoadingState>,
        notifications: NotificationCenter,
    ) -> Self {
        Self {
            session,
            loading,
            notifications,
            mirror: RwLock::new(Mirror::default()),
            documents_generation: AtomicU64::new(0),
        }
    }

    // ========== Collections ==========

    /// List every collection in the session's tenant and database.
    pub async fn fetch_collections(&self) -> Result<(), ApiError> {
        self.clear_error().await;

        let result = self
            .loading
            .with_loading(LoadingKey::Collections, async {
                let url = self.collections_url().await?;
                self.send_json::<Vec<CollectionInfo>>(self.request(Method::GET, url).await)
                    .await
            })
            .await;

        match result {
            Ok(mut collections) => {
                collections.sort_by(|a, b| a.name.cmp(&b.name));
                debug!(count = collections.len(), "Fetched collections");
                self.mirror.write().await.collections = collections;
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to fetch collections", e).await),
        }
    }

    pub async fn create_collection(&self, name: &str) -> Result<(), ApiError> {
        self.clear_error().await;
        let name = name.trim();
        if name.is_empty() {
            self.reject("Collection name is required").await;
            return Ok(());
        }

        let result = self
            .loading
            .with_loading(LoadingKey::Collections, async {
                let url = self.collections_url().await?;
                let request = self
                    .request(Method::POST, url)
                    .await
                    .json(&CreateCollectionBody { name });
                self.send_json::<CollectionInfo>(request).await
            })
            .await;

        match result {
            Ok(collection) => {
                info!(collection = %collection.name, id = %collection.id, "Collection created");
                self.mirror.write().await.upsert(collection);
                self.notifications
                    .success(format!("Collection \"{name}\" created"));
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to create collection", e).await),
        }
    }

    pub async fn delete_collection(&self, name: &str) -> Result<(), ApiError> {
        self.clear_error().await;
        if self.resolve(name).await.is_none() {
            return Ok(());
        }

        let result = self
            .loading
            .with_loading(LoadingKey::Collections, async {
                let url = self.collection_url(name).await?;
                self.send(self.request(Method::DELETE, url).await).await
            })
            .await;

        match result {
            Ok(()) => {
                {
                    let mut mirror = self.mirror.write().await;
                    mirror.collections.retain(|c| c.name != name);
                    if mirror.current_collection.as_deref() == Some(name) {
                        mirror.current_collection = None;
                        mirror.documents.clear();
                    }
                }
                info!(collection = %name, "Collection deleted");
                self.notifications
                    .success(format!("Collection \"{name}\" deleted"));
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to delete collection", e).await),
        }
    }

    // ========== Documents ==========

    /// Load every record of `name` and make it the current collection.
    ///
    /// If another fetch starts before this one completes, this response is
    /// discarded and the mirror is left to the newer fetch.
    pub async fn fetch_collection_documents(&self, name: &str) -> Result<(), ApiError> {
        self.clear_error().await;
        let Some(collection) = self.resolve(name).await else {
            return Ok(());
        };

        let generation = self.documents_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.mirror.write().await.current_collection = Some(name.to_string());

        let result = self
            .loading
            .with_loading(LoadingKey::Documents, async {
                let url = self.action_url(&collection.id, "get").await?;
                let request = self
                    .request(Method::POST, url)
                    .await
                    .json(&GetRecordsBody::default());
                self.send_json::<GetRecordsResponse>(request).await
            })
            .await;

        if self.documents_generation.load(Ordering::SeqCst) != generation {
            debug!(collection = %name, "Discarding stale documents response");
            return result.map(|_| ());
        }

        match result {
            Ok(response) => {
                let documents = response.into_documents();
                debug!(collection = %name, count = documents.len(), "Fetched documents");
                self.mirror.write().await.documents = documents;
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to fetch documents", e).await),
        }
    }

    /// Add a record and return its id, generated locally when not given.
    ///
    /// Returns `Ok(None)` when the collection is unknown or the content is
    /// empty. Id collisions are resolved by the server.
    pub async fn add_document(
        &self,
        collection_name: &str,
        document: NewDocument,
    ) -> Result<Option<String>, ApiError> {
        self.clear_error().await;
        if let Err(e) = validate_document(&document.document) {
            self.reject(e.to_string()).await;
            return Ok(None);
        }
        let Some(collection) = self.resolve(collection_name).await else {
            return Ok(None);
        };

        let id = document
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let body = AddRecordsBody {
            ids: vec![id.clone()],
            documents: vec![document.document],
            metadatas: vec![(!document.metadata.is_empty()).then_some(document.metadata)],
        };

        let result = self
            .loading
            .with_loading(LoadingKey::Documents, async {
                let url = self.action_url(&collection.id, "add").await?;
                self.send(self.request(Method::POST, url).await.json(&body))
                    .await
            })
            .await;

        if let Err(e) = result {
            return Err(self.fail("Failed to add document", e).await);
        }

        info!(collection = %collection_name, id = %id, "Document added");
        self.notifications.success("Document added");

        if self.current_collection().await.as_deref() == Some(collection_name) {
            if let Err(e) = self.fetch_collection_documents(collection_name).await {
                warn!(collection = %collection_name, error = %e, "Failed to refresh documents");
            }
        }
        Ok(Some(id))
    }

    pub async fn delete_document(&self, collection_name: &str, id: &str) -> Result<(), ApiError> {
        self.clear_error().await;
        let Some(collection) = self.resolve(collection_name).await else {
            return Ok(());
        };

        let body = DeleteRecordsBody {
            ids: vec![id.to_string()],
        };
        let result = self
            .loading
            .with_loading(LoadingKey::Documents, async {
                let url = self.action_url(&collection.id, "delete").await?;
                self.send(self.request(Method::POST, url).await.json(&body))
                    .await
            })
            .await;

        match result {
            Ok(()) => {
                {
                    let mut mirror = self.mirror.write().await;
                    if mirror.current_collection.as_deref() == Some(collection_name) {
                        mirror.documents.retain(|d| d.id != id);
                    }
                }
                info!(collection = %collection_name, id, "Document deleted");
                self.notifications.success("Document deleted");
                Ok(())
            }
            Err(e) => Err(self.fail("Failed to delete document", e).await),
        }
    }

    // ========== Getters ==========

    /// Collections sorted by name.
    pub async fn collections(&self) -> Vec<CollectionInfo> {
        self.mirror.read().await.collections.clone()
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.mirror.read().await.documents.clone()
    }

    pub async fn current_collection(&self) -> Option<String> {
        self.mirror.read().await.current_collection.clone()
    }

    /// Message of the last failed operation.
    pub async fn error(&self) -> Option<String> {
        self.mirror.read().await.error.clone()
    }

    pub async fn clear_error(&self) {
        self.mirror.write().await.error = None;
    }

    pub fn loading(&self) -> &LoadingState {
        &self.loading
    }

    // ========== Internals ==========

    async fn resolve(&self, name: &str) -> Option<CollectionInfo> {
        let found = self.mirror.read().await.find(name);
        if found.is_none() {
            self.reject(format!("Collection \"{name}\" not found")).await;
        }
        found
    }

    /// Local failure: error state and notification, no request.
    async fn reject(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "Rejected request");
        self.mirror.write().await.error = Some(message.clone());
        self.notifications.error(message);
    }

    async fn fail(&self, context: &str, error: ApiError) -> ApiError {
        warn!(status = ?error.status, error = %error, "{context}");
        self.mirror.write().await.error = Some(error.message.clone());
        self.notifications.error(format!("{context}: {}", error.message));
        error
    }

    async fn collections_url(&self) -> Result<Url, ApiError> {
        let (base, tenant, database) = self.namespace().await;
        paths::collections_url(&base, &tenant, &database)
    }

    async fn collection_url(&self, collection: &str) -> Result<Url, ApiError> {
        let (base, tenant, database) = self.namespace().await;
        paths::collection_url(&base, &tenant, &database, collection)
    }

    async fn action_url(&self, collection_id: &str, action: &str) -> Result<Url, ApiError> {
        let (base, tenant, database) = self.namespace().await;
        paths::collection_action_url(&base, &tenant, &database, collection_id, action)
    }

    async fn namespace(&self) -> (String, String, String) {
        let session = self.session.snapshot().await;
        (session.base_url(), session.tenant, session.database)
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.session
            .http()
            .request(method, url)
            .headers(self.session.headers().await)
    }

    async fn send(&self, request: RequestBuilder) -> Result<(), ApiError> {
        let response = request.send().await.map_err(ApiError::transport)?;
        ApiError::check(response).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await.map_err(ApiError::transport)?;
        ApiError::check(response)
            .await?
            .json::<T>()
            .await
            .map_err(ApiError::transport)
    }
}
