// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error type shared by the session probe and the data-access layer.

use reqwest::{Response, StatusCode};
use serde_json::Value;

/// Longest raw response body quoted in a user-facing message.
const MAX_BODY_IN_MESSAGE: usize = 200;

/// A failed request against the Chroma server.
///
/// `message` is always human-readable and safe to show in the UI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub status: Option<StatusCode>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Connection-level failure (DNS, refused connection, timeout, bad body).
    pub fn transport(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "The server did not respond in time".to_string()
        } else if err.is_connect() {
            "Could not connect to the server".to_string()
        } else {
            format!("Request failed: {err}")
        };
        Self::new(err.status(), message)
    }

    /// Build an error from a non-success response, reading its body.
    pub async fn from_response(response: Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::new(Some(status), message_from_body(status, &body))
    }

    /// Pass successful responses through; turn anything else into an error.
    pub async fn check(response: Response) -> Result<Response, Self> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::from_response(response).await)
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status,
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }
}

/// Derive a user-facing message from an error response body.
///
/// Chroma answers with `{"error": "...", "message": "..."}`; older servers
/// use `{"detail": "..."}`. Anything else falls back to the status line.
pub(crate) fn message_from_body(status: StatusCode, body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let field = |name: &str| json.get(name).and_then(Value::as_str).map(str::to_string);
        if let Some(message) = field("message").or_else(|| field("detail")) {
            return message;
        }
        if let Some(error) = field("error") {
            return error;
        }
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return format!("Authentication failed ({status}). Check your credentials.");
    }

    let body = body.trim();
    if !body.is_empty() && body.len() <= MAX_BODY_IN_MESSAGE {
        format!("Request failed with status {status}: {body}")
    } else {
        format!("Request failed with status {status}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::new(Some(StatusCode::NOT_FOUND), "missing");
        assert_eq!(nf.status, Some(StatusCode::NOT_FOUND));
        assert_eq!(nf.to_string(), "missing");
        assert!(!nf.is_unauthorized());

        let denied = ApiError::new(Some(StatusCode::FORBIDDEN), "no");
        assert!(denied.is_unauthorized());
    }

    #[test]
    fn chroma_error_body_prefers_message() {
        let body = r#"{"error":"NotFoundError","message":"Collection [x] does not exist"}"#;
        assert_eq!(
            message_from_body(StatusCode::NOT_FOUND, body),
            "Collection [x] does not exist"
        );
        assert_eq!(
            message_from_body(StatusCode::BAD_REQUEST, r#"{"error":"InvalidArgument"}"#),
            "InvalidArgument"
        );
        assert_eq!(
            message_from_body(StatusCode::UNPROCESSABLE_ENTITY, r#"{"detail":"bad name"}"#),
            "bad name"
        );
    }

    #[test]
    fn unauthorized_without_body_gets_hint() {
        let msg = message_from_body(StatusCode::UNAUTHORIZED, "");
        assert!(msg.contains("Check your credentials"));
    }

    #[test]
    fn plain_body_is_quoted_when_short() {
        assert_eq!(
            message_from_body(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "Request failed with status 500 Internal Server Error: boom"
        );
        let long = "x".repeat(MAX_BODY_IN_MESSAGE + 1);
        assert_eq!(
            message_from_body(StatusCode::BAD_GATEWAY, &long),
            "Request failed with status 502 Bad Gateway"
        );
    }
}
