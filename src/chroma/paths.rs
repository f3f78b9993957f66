// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chroma v2 endpoint URLs. Tenant, database and collection segments are
//! percent-encoded.

use url::Url;

use crate::error::ApiError;

/// `<base>/api/v2/tenants/{tenant}/databases/{database}/collections`
pub fn collections_url(base: &str, tenant: &str, database: &str) -> Result<Url, ApiError> {
    build(base, &[tenant, database], &[])
}

/// `<base>/api/v2/tenants/{tenant}/databases/{database}/collections/{collection}`
pub fn collection_url(
    base: &str,
    tenant: &str,
    database: &str,
    collection: &str,
) -> Result<Url, ApiError> {
    build(base, &[tenant, database], &[collection])
}

/// `<base>/api/v2/tenants/{tenant}/databases/{database}/collections/{collection}/{action}`
pub fn collection_action_url(
    base: &str,
    tenant: &str,
    database: &str,
    collection: &str,
    action: &str,
) -> Result<Url, ApiError> {
    build(base, &[tenant, database], &[collection, action])
}

fn build(base: &str, namespace: &[&str; 2], rest: &[&str]) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::new(None, format!("Invalid server URL {base}: {reason}"));

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|()| invalid("cannot be a base".to_string()))?;
        segments
            .pop_if_empty()
            .extend(["api", "v2", "tenants", namespace[0], "databases", namespace[1], "collections"])
            .extend(rest);
    }
    Ok(url)
}
