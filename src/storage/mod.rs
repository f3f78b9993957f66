// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Local Storage Module
//!
//! Persistence for the client side of a Chroma administration session.
//!
//! ## Layers
//!
//! - [`KeyValueStore`]: flat string store (`MemoryStore`, `RedbStore`),
//!   the equivalent of browser `localStorage`
//! - [`SecureStorage`]: AES-256-GCM encrypted, expiring values on top of a
//!   key-value store, namespaced under `secure:`
//! - [`SettingsFile`]: plain JSON file with non-sensitive connection settings
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.chroma-admin/
//!   session.redb     # kv table: secure:auth, lastRoute, ...
//!   settings.json    # last-used server, protocol, tenant, database
//! ```

pub mod crypto;
pub mod error;
pub mod kv;
pub mod paths;
pub mod redb_store;
pub mod secure;
pub mod settings;

pub use crypto::Fingerprint;
pub use error::{StorageError, StorageResult};
pub use kv::{KeyValueStore, MemoryStore};
pub use paths::StoragePaths;
pub use redb_store::RedbStore;
pub use secure::{EncryptedRecord, SecureStorage, DEFAULT_TTL};
pub use settings::{SavedSettings, SettingsFile};
