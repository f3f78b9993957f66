// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted, expiring key-value storage on top of a plain store.
//!
//! ## Record Format
//!
//! Every secured value is wrapped as `{ "data": value, "expiresAt": millis }`,
//! serialized to JSON, encrypted (see [`super::crypto`]) and written as:
//!
//! ```text
//! secure:<key> -> {"ciphertext":"<b64>","iv":"<b64 12 bytes>","salt":"<b64 16 bytes>"}
//! ```
//!
//! The `secure:` namespace lets [`SecureStorage::clear_expired_items`] sweep
//! its own entries without guessing at unrelated application data.
//!
//! ## Failure Policy
//!
//! Reads fail closed: a record that cannot be parsed, fails authentication,
//! or has expired is deleted and reported as absent. Writes fail loudly:
//! an encryption failure is returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use ring::rand::SystemRandom;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::crypto::{self, Fingerprint, IV_LEN, SALT_LEN};
use super::{KeyValueStore, StorageError, StorageResult};
use crate::clock::{Clock, SystemClock};

/// Reserved key prefix for encrypted entries.
pub const SECURE_PREFIX: &str = "secure:";

/// Default lifetime of a secured value (24 hours).
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Persisted form of a secured value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub ciphertext: String,
    pub iv: String,
    pub salt: String,
}

/// Plaintext wrapper carrying the expiry alongside the value.
#[derive(Debug, Serialize, Deserialize)]
struct StoredPayload<T> {
    data: T,
    #[serde(rename = "expiresAt")]
    expires_at: i64,
}

/// Storage key under which a secured value named `key` lives.
pub fn storage_key(key: &str) -> String {
    format!("{SECURE_PREFIX}{key}")
}

/// Encrypted key-value storage with per-item expiration.
#[derive(Clone)]
pub struct SecureStorage {
    store: Arc<dyn KeyValueStore>,
    fingerprint: Fingerprint,
    clock: Arc<dyn Clock>,
    rng: SystemRandom,
}

impl SecureStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, fingerprint: Fingerprint) -> Self {
        Self {
            store,
            fingerprint,
            clock: Arc::new(SystemClock),
            rng: SystemRandom::new(),
        }
    }

    /// Replace the clock used for expiry checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The underlying plain store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Encrypt `value` and store it under `key` for `ttl`.
    ///
    /// Overwrites any existing value. A fresh salt and nonce are drawn for
    /// every write.
    pub async fn set_secure_item<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> StorageResult<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = self.clock.now_millis().saturating_add(ttl_ms);
        let plaintext = serde_json::to_vec(&StoredPayload {
            data: value,
            expires_at,
        })?;

        let record = self.encrypt(plaintext).await?;
        self.store
            .set(&storage_key(key), &serde_json::to_string(&record)?)?;

        debug!(key, expires_at, "Stored secure item");
        Ok(())
    }

    /// Read and decrypt the value stored under `key`.
    ///
    /// Returns `None` when the key is absent, unreadable, tampered with or
    /// expired. In every case but absence the raw entry is deleted.
    pub async fn get_secure_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw_key = storage_key(key);
        let raw = match self.store.get(&raw_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read secure item");
                return None;
            }
        };

        match self.read_payload::<T>(&raw).await {
            Ok(payload) if payload.expires_at > self.clock.now_millis() => Some(payload.data),
            Ok(_) => {
                debug!(key, "Secure item expired");
                self.discard(&raw_key);
                None
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable secure item");
                self.discard(&raw_key);
                None
            }
        }
    }

    /// Delete the value stored under `key`. Missing keys are fine.
    pub fn remove_secure_item(&self, key: &str) -> StorageResult<()> {
        self.store.remove(&storage_key(key))
    }

    /// Delete every expired entry in the secure namespace.
    ///
    /// Entries outside the namespace are never touched. A failure on one key
    /// is logged and the sweep moves on. Returns the number of entries
    /// removed.
    pub async fn clear_expired_items(&self) -> usize {
        let keys = match self.store.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list keys for expiry sweep");
                return 0;
            }
        };

        let now = self.clock.now_millis();
        let mut removed = 0;

        for key in keys.into_iter().filter(|k| k.starts_with(SECURE_PREFIX)) {
            let raw = match self.store.get(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key, error = %e, "Failed to read entry during expiry sweep");
                    continue;
                }
            };

            match self.read_payload::<IgnoredAny>(&raw).await {
                Ok(payload) if payload.expires_at <= now => match self.store.remove(&key) {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(key, error = %e, "Failed to remove expired entry"),
                },
                Ok(_) => {}
                Err(e) => debug!(key, error = %e, "Skipping undecryptable entry during sweep"),
            }
        }

        info!(removed, "Expired secure items cleared");
        removed
    }

    fn discard(&self, raw_key: &str) {
        if let Err(e) = self.store.remove(raw_key) {
            warn!(key = raw_key, error = %e, "Failed to delete invalid secure item");
        }
    }

    async fn read_payload<T: DeserializeOwned>(&self, raw: &str) -> StorageResult<StoredPayload<T>> {
        let record: EncryptedRecord = serde_json::from_str(raw)?;
        let plaintext = self.decrypt(&record).await?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    async fn encrypt(&self, plaintext: Vec<u8>) -> StorageResult<EncryptedRecord> {
        let salt: [u8; SALT_LEN] = crypto::random_bytes(&self.rng)?;
        let iv: [u8; IV_LEN] = crypto::random_bytes(&self.rng)?;
        let key = self.derive_key(salt.to_vec()).await?;
        let ciphertext = crypto::seal(&key, &iv, &plaintext)?;

        Ok(EncryptedRecord {
            ciphertext: Base64::encode_string(&ciphertext),
            iv: Base64::encode_string(&iv),
            salt: Base64::encode_string(&salt),
        })
    }

    async fn decrypt(&self, record: &EncryptedRecord) -> StorageResult<Vec<u8>> {
        let ciphertext = decode_field("ciphertext", &record.ciphertext)?;
        let iv = decode_field("iv", &record.iv)?;
        let salt = decode_field("salt", &record.salt)?;
        if salt.len() != SALT_LEN {
            return Err(StorageError::Crypto(format!("salt must be {SALT_LEN} bytes")));
        }

        let key = self.derive_key(salt).await?;
        crypto::open(&key, &iv, &ciphertext)
    }

    /// PBKDF2 is deliberately slow, so it runs on the blocking pool.
    async fn derive_key(&self, salt: Vec<u8>) -> StorageResult<[u8; crypto::KEY_LEN]> {
        let passphrase = self.fingerprint.passphrase().to_string();
        let key = tokio::task::spawn_blocking(move || crypto::derive_key(&passphrase, &salt)).await?;
        Ok(key)
    }
}

fn decode_field(name: &str, value: &str) -> StorageResult<Vec<u8>> {
    Base64::decode_vec(value).map_err(|e| StorageError::Crypto(format!("invalid base64 in {name}: {e}")))
}
