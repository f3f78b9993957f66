// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-category loading flags.
//!
//! A flag is set while a [`LoadingState::with_loading`] call for its
//! category is in flight. The flag is cleared by a drop guard, so it also
//! clears when the operation fails, panics or is cancelled.
//!
//! Overlapping calls for one category are not counted: the first call to
//! finish clears the flag. Callers avoid running two operations under the
//! same key at once.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

/// Closed set of operation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadingKey {
    Collections,
    Documents,
    Authentication,
    Navigation,
}

impl LoadingKey {
    pub const ALL: [LoadingKey; Self::COUNT] = [
        LoadingKey::Collections,
        LoadingKey::Documents,
        LoadingKey::Authentication,
        LoadingKey::Navigation,
    ];

    const COUNT: usize = 4;

    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoadingKey::Collections => "collections",
            LoadingKey::Documents => "documents",
            LoadingKey::Authentication => "authentication",
            LoadingKey::Navigation => "navigation",
        }
    }
}

impl fmt::Display for LoadingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
pub struct LoadingState {
    flags: [AtomicBool; LoadingKey::COUNT],
}

impl LoadingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, key: LoadingKey) {
        trace!(key = %key, "loading started");
        self.flags[key.index()].store(true, Ordering::SeqCst);
    }

    pub fn stop(&self, key: LoadingKey) {
        trace!(key = %key, "loading stopped");
        self.flags[key.index()].store(false, Ordering::SeqCst);
    }

    pub fn is_loading(&self, key: LoadingKey) -> bool {
        self.flags[key.index()].load(Ordering::SeqCst)
    }

    pub fn is_any_loading(&self) -> bool {
        LoadingKey::ALL.iter().any(|key| self.is_loading(*key))
    }

    /// Run `operation` with `key` marked as loading.
    ///
    /// The output, `Ok` or `Err`, is returned untouched.
    pub async fn with_loading<F>(&self, key: LoadingKey, operation: F) -> F::Output
    where
        F: Future,
    {
        let _guard = LoadingGuard::start(self, key);
        operation.await
    }
}

struct LoadingGuard<'a> {
    state: &'a LoadingState,
    key: LoadingKey,
}

impl<'a> LoadingGuard<'a> {
    fn start(state: &'a LoadingState, key: LoadingKey) -> Self {
        state.start(key);
        Self { state, key }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.state.stop(self.key);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_idle() {
        let state = LoadingState::new();
        assert!(!state.is_any_loading());
        for key in LoadingKey::ALL {
            assert!(!state.is_loading(key));
        }
    }

    #[test]
    fn keys_are_independent() {
        let state = LoadingState::new();
        state.start(LoadingKey::Documents);
        assert!(state.is_loading(LoadingKey::Documents));
        assert!(!state.is_loading(LoadingKey::Collections));
        assert!(state.is_any_loading());

        state.stop(LoadingKey::Documents);
        assert!(!state.is_any_loading());
    }

    #[tokio::test]
    async fn flag_is_set_while_running() {
        let state = LoadingState::new();
        let seen = state
            .with_loading(LoadingKey::Collections, async {
                state.is_loading(LoadingKey::Collections)
            })
            .await;
        assert!(seen);
        assert!(!state.is_loading(LoadingKey::Collections));
    }

    #[tokio::test]
    async fn error_clears_flag_and_propagates_unchanged() {
        let state = LoadingState::new();
        let result: Result<(), String> = state
            .with_loading(LoadingKey::Documents, async { Err("boom".to_string()) })
            .await;

        assert_eq!(result, Err("boom".to_string()));
        assert!(!state.is_loading(LoadingKey::Documents));
    }

    #[tokio::test]
    async fn panic_clears_flag() {
        let state = Arc::new(LoadingState::new());
        let task_state = state.clone();
        let joined = tokio::spawn(async move {
            task_state
                .with_loading(LoadingKey::Authentication, async {
                    panic!("operation panicked");
                })
                .await
        })
        .await;

        assert!(joined.is_err());
        assert!(!state.is_loading(LoadingKey::Authentication));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_clears_flag() {
        let state = LoadingState::new();
        let timed_out = tokio::time::timeout(
            Duration::from_millis(5),
            state.with_loading(LoadingKey::Navigation, std::future::pending::<()>()),
        )
        .await;

        assert!(timed_out.is_err());
        assert!(!state.is_loading(LoadingKey::Navigation));
    }
}
