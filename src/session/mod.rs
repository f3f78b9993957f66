// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Session Module
//!
//! Connection session for one Chroma server: who we talk to, with which
//! credentials, in which tenant and database.
//!
//! - [`state`]: plain data (protocol, auth method, in-memory and persisted
//!   session, login form)
//! - [`store`]: the [`SessionStore`] that owns the session and drives
//!   login, logout and restoration

pub mod state;
pub mod store;

pub use state::{AuthMethod, LoginForm, PersistedSession, Protocol, SessionPhase, SessionState};
pub use store::{SessionError, SessionStore, HEARTBEAT_PATH, LAST_ROUTE_KEY, SESSION_KEY};
