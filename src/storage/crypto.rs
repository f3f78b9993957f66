// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key derivation and authenticated encryption for secure storage.
//!
//! ## Scheme
//!
//! - Passphrase: SHA-256 of a host fingerprint (see [`Fingerprint`])
//! - Key: PBKDF2-HMAC-SHA256, 100 000 iterations, 16-byte random salt,
//!   256-bit output
//! - Cipher: AES-256-GCM with a 96-bit random nonce per encryption
//!
//! ## Known Limitation
//!
//! The passphrase is recomputable from properties anyone on the same host
//! can observe. This keeps credentials out of plain view in the store; it is
//! not a defense against a compromised process or user account.

use std::num::NonZeroU32;

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};

use super::{StorageError, StorageResult};

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(n) => n,
    None => panic!("iteration count must be non-zero"),
};

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// AES-GCM nonce length in bytes.
pub const IV_LEN: usize = 12;

const PASSPHRASE_PREFIX: &str = "chroma-admin-session-";

/// Host fingerprint used as the key-derivation passphrase.
#[derive(Clone, PartialEq, Eq)]
pub struct Fingerprint {
    passphrase: String,
}

impl Fingerprint {
    /// Build the fingerprint from the current process environment.
    pub fn from_environment() -> Self {
        Self::from_signals(&environment_signals())
    }

    /// Hash a list of identifying signals into a stable passphrase.
    pub fn from_signals(signals: &[String]) -> Self {
        let digest = Sha256::digest(signals.join("|").as_bytes());
        let short: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
        Self {
            passphrase: format!("{PASSPHRASE_PREFIX}{short}"),
        }
    }

    /// Fixed passphrase, for tests and scripted environments.
    pub fn fixed(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
        }
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fingerprint")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Signals that identify this host and user: agent string, locale,
/// timezone offset, host name and user name.
fn environment_signals() -> Vec<String> {
    let agent = format!(
        "{}/{} ({}; {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    let locale = first_env(&["LC_ALL", "LANG"]).unwrap_or_else(|| "C".to_string());
    let tz_offset = chrono::Local::now().offset().local_minus_utc().to_string();
    let host = first_env(&["HOSTNAME", "COMPUTERNAME"]).unwrap_or_default();
    let user = first_env(&["USER", "USERNAME"]).unwrap_or_default();

    vec![agent, locale, tz_offset, host, user]
}

fn first_env(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Derive a 256-bit key from the passphrase and salt.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        PBKDF2_ITERATIONS,
        salt,
        passphrase.as_bytes(),
        &mut key,
    );
    key
}

/// Fill a fixed-size buffer from the system CSPRNG.
pub fn random_bytes<const N: usize>(rng: &SystemRandom) -> StorageResult<[u8; N]> {
    let mut buf = [0u8; N];
    rng.fill(&mut buf)
        .map_err(|_| StorageError::Crypto("system random source unavailable".to_string()))?;
    Ok(buf)
}

fn aead_key(key: &[u8; KEY_LEN]) -> StorageResult<LessSafeKey> {
    let unbound = UnboundKey::new(&aead::AES_256_GCM, key)
        .map_err(|_| StorageError::Crypto("invalid AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext`, returning ciphertext with the GCM tag appended.
pub fn seal(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN], plaintext: &[u8]) -> StorageResult<Vec<u8>> {
    let key = aead_key(key)?;
    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(Nonce::assume_unique_for_key(*iv), Aad::empty(), &mut in_out)
        .map_err(|_| StorageError::Crypto("AES-GCM encryption failed".to_string()))?;
    Ok(in_out)
}

/// Decrypt and authenticate `ciphertext`.
///
/// Fails on a wrong key, a nonce of the wrong length, or any modification
/// of the ciphertext or tag.
pub fn open(key: &[u8; KEY_LEN], iv: &[u8], ciphertext: &[u8]) -> StorageResult<Vec<u8>> {
    let key = aead_key(key)?;
    let nonce = Nonce::try_assume_unique_for_key(iv)
        .map_err(|_| StorageError::Crypto(format!("nonce must be {IV_LEN} bytes")))?;
    let mut in_out = ciphertext.to_vec();
    let plaintext_len = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| StorageError::Crypto("authentication tag mismatch".to_string()))?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}
