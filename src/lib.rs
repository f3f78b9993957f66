// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chroma Admin - administration client for Chroma vector database servers
//!
//! This crate keeps an authenticated connection session to a Chroma server,
//! persisted encrypted at rest with expiry, and manages collections and
//! documents through the server's v2 HTTP API.
//!
//! ## Modules
//!
//! - `storage` - Plain and encrypted local storage, settings file
//! - `session` - Login, logout and session restoration
//! - `router` - Route table and navigation guard
//! - `loading` - Per-category loading flags
//! - `notifications` - Auto-dismissing user notifications
//! - `chroma` - Data-access layer for collections and documents
//! - `state` - Application wiring

pub mod chroma;
pub mod clock;
pub mod config;
pub mod error;
pub mod loading;
pub mod logging;
pub mod notifications;
pub mod router;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
