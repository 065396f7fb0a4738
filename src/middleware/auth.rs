use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::git_tags::GitTagSource;
use crate::server::router::TagnoteState;

pub const KEY_HEADER: &str = "x-tagnote-key";

fn key_matches(candidate: &str, expected: &str) -> bool {
    bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()))
}

/// Ensure the inbound request carries the server key.
/// Accepts either:
/// - Header: `x-tagnote-key: ...`
/// - Header: `Authorization: Bearer ...`
/// - Query string: `?key=...`
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<(), Response> {
    // 1) header: x-tagnote-key
    if let Some(hv) = headers.get(KEY_HEADER).and_then(|v| v.to_str().ok())
        && key_matches(hv, expected)
    {
        return Ok(());
    }

    // 2) header: Authorization: Bearer <key>
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && key_matches(token, expected)
        {
            return Ok(());
        }
    }

    // 3) query: key=...
    if let Some(qs) = query {
        for (k, v) in url::form_urlencoded::parse(qs.as_bytes()) {
            if k == "key" && key_matches(&v, expected) {
                return Ok(());
            }
        }
    }

    Err((
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized", "reason": "invalid or missing key"})),
    )
        .into_response())
}

#[derive(Debug, Clone, Copy)]
pub struct RequireKeyAuth;

impl<S: GitTagSource> FromRequestParts<TagnoteState<S>> for RequireKeyAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &TagnoteState<S>,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, parts.uri.query(), &state.tagnote_key)?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn accepts_each_key_location() {
        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, HeaderValue::from_static("pwd"));
        assert!(ensure_authorized(&headers, None, "pwd").is_ok());

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer pwd"));
        assert!(ensure_authorized(&headers, None, "pwd").is_ok());

        assert!(ensure_authorized(&HeaderMap::new(), Some("refresh=true&key=pwd"), "pwd").is_ok());
    }

    #[test]
    fn rejects_missing_or_wrong_key() {
        assert!(ensure_authorized(&HeaderMap::new(), None, "pwd").is_err());

        let mut headers = HeaderMap::new();
        headers.insert(KEY_HEADER, HeaderValue::from_static("pw"));
        let resp = ensure_authorized(&headers, Some("key=nope"), "pwd").expect_err("rejected");
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
