//! Request identification and cache-bypass parsing.
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing; an incoming
//!   `x-request-id` is kept, otherwise a UUID v4 is generated
//! - The ID is echoed on every response

use axum::http::{header::CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, Request};
use serde::Deserialize;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Legacy per-request cache switch, `no-cache: true`.
pub const NO_CACHE: HeaderName = HeaderName::from_static("no-cache");

/// Generates UUID v4 request IDs.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// The request ID header value, or `"-"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
}

#[derive(Debug, Default, Deserialize)]
pub struct RateParams {
    pub no_cache: Option<String>,
}

/// Whether the caller asked to skip the cache.
///
/// Accepts `no-cache: true`, `Cache-Control: no-cache` or `?no_cache=true`.
pub fn wants_bypass(headers: &HeaderMap, params: &RateParams) -> bool {
    let is_true = |v: &str| v.trim().eq_ignore_ascii_case("true");

    let no_cache_header = headers
        .get(NO_CACHE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_true);

    let cache_control = headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|directive| directive.trim().eq_ignore_ascii_case("no-cache"));

    let query = params.no_cache.as_deref().is_some_and(is_true);

    no_cache_header || cache_control || query
}
