//! # Authentication Module
//!
//! Optional API key authentication for the Hoard HTTP API.
//!
//! When `api_key` is configured (`hoard.toml` or `HOARD_API_KEY`), every
//! request except `GET /health` must carry it:
//!
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use super::types::ApiError;

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Compare two keys in constant time.
///
/// Both sides are padded to the same length so the comparison always runs
/// over the same number of bytes; the length check happens afterwards.
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
///
/// Accepts both `Bearer <key>` and a raw `<key>` in the Authorization header.
pub async fn api_key_auth_middleware(
    State(expected): State<Arc<str>>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v));

    match provided {
        Some(key) if keys_match(key, &expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                "Authentication failed: invalid API key"
            );
            ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(keys_match("attic-key", "attic-key"));
    }

    #[test]
    fn prefix_and_padding_do_not_match() {
        assert!(!keys_match("attic", "attic-key"));
        assert!(!keys_match("attic-key\0", "attic-key"));
        assert!(!keys_match("", "attic-key"));
    }
}
