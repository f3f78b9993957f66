// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Route table and the navigation guard run before every route change.
//!
//! ## Guard policy (in order)
//!
//! 1. A route that requires authentication, with no session: go to `/login`.
//! 2. `/login` with a session: go to the last remembered route, or `/`.
//! 3. Anything else proceeds.
//!
//! The first evaluation waits for the one-time session restoration.

use std::collections::BTreeMap;
use std::sync::Arc;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::session::SessionStore;

pub const LOGIN_PATH: &str = "/login";

/// Landing route after authentication.
pub const HOME_PATH: &str = "/";

/// Everything but RFC 3986 unreserved characters is escaped in a param.
const PARAM: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    /// Pattern; `:param` segments match any single segment.
    pub path: &'static str,
    pub requires_auth: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: Route,
    pub params: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Login, collection list and single collection views.
    pub fn standard() -> Self {
        Self::new(vec![
            Route {
                name: "login",
                path: LOGIN_PATH,
                requires_auth: false,
            },
            Route {
                name: "collections",
                path: HOME_PATH,
                requires_auth: true,
            },
            Route {
                name: "collection",
                path: "/collection/:name",
                requires_auth: true,
            },
        ])
    }

    /// Path of the view for one collection, with the name percent-encoded
    /// into a single segment.
    pub fn collection_path(name: &str) -> String {
        format!("/collection/{}", utf8_percent_encode(name, PARAM))
    }

    /// Find the route for `full_path`. The query string and fragment are
    /// ignored, as is one trailing slash. Params are percent-decoded.
    pub fn resolve(&self, full_path: &str) -> Option<RouteMatch> {
        let path = strip_query(full_path);
        self.match_path(path).or_else(|| {
            path.strip_suffix('/')
                .filter(|trimmed| !trimmed.is_empty())
                .and_then(|trimmed| self.match_path(trimmed))
        })
    }

    fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let wanted = segments(path);

        self.routes.iter().find_map(|route| {
            let pattern = segments(route.path);
            if pattern.len() != wanted.len() {
                return None;
            }

            let mut params = BTreeMap::new();
            for (expected, actual) in pattern.iter().zip(&wanted) {
                match expected.strip_prefix(':') {
                    Some(name) => {
                        let value = percent_decode_str(actual).decode_utf8_lossy();
                        params.insert(name.to_string(), value.into_owned());
                    }
                    None if expected == actual => {}
                    None => return None,
                }
            }

            Some(RouteMatch {
                route: route.clone(),
                params,
            })
        })
    }
}

fn strip_query(full_path: &str) -> &str {
    full_path
        .split(['?', '#'])
        .next()
        .unwrap_or(full_path)
}

/// Segments after the leading slash. Empty segments are kept so an empty
/// param still occupies its position.
fn segments(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

/// Pre-navigation hook enforcing route protection.
pub struct NavigationGuard {
    session: Arc<SessionStore>,
    routes: RouteTable,
}

impl NavigationGuard {
    pub fn new(session: Arc<SessionStore>, routes: RouteTable) -> Self {
        Self { session, routes }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Decide whether navigation to `full_path` may proceed.
    ///
    /// Unknown paths proceed; not-found handling belongs to the caller.
    pub async fn before_each(&self, full_path: &str) -> Navigation {
        self.session.restore_once().await;
        let authenticated = self.session.is_authenticated().await;

        let path = strip_query(full_path);
        let is_login = path == LOGIN_PATH;
        let requires_auth = self
            .routes
            .resolve(full_path)
            .is_some_and(|m| m.route.requires_auth);

        if requires_auth && !authenticated {
            debug!(path = %full_path, "not authenticated; redirecting to login");
            return Navigation::Redirect(LOGIN_PATH.to_string());
        }

        if is_login && authenticated {
            let target = self
                .session
                .last_route()
                .await
                .filter(|route| strip_query(route) != LOGIN_PATH)
                .unwrap_or_else(|| HOME_PATH.to_string());
            debug!(target = %target, "already authenticated; leaving login");
            return Navigation::Redirect(target);
        }

        if authenticated && requires_auth {
            self.session.set_last_route(full_path).await;
        }

        Navigation::Proceed
    }
}
