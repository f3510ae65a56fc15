//! Response decoration — rate-limit and validator headers, status overrides.

use crate::cache::{CacheDecision, ResourceVersion};
use crate::http::{Response, StatusCode};
use crate::limiter::RateLimitResult;

pub const RATE_LIMIT_LIMIT: &str = "X-Rate-Limit-Limit";
pub const RATE_LIMIT_REMAINING: &str = "X-Rate-Limit-Remaining";
/// Seconds until the window refills; never an epoch timestamp.
pub const RATE_LIMIT_RESET: &str = "X-Rate-Limit-Reset";
pub const ETAG: &str = "ETag";
pub const LAST_MODIFIED: &str = "Last-Modified";

/// Applies admission and cache outcomes to an outgoing [`Response`].
///
/// Headers are written with replace semantics, so decorating the same response
/// twice with the same inputs leaves an identical header set.
///
/// # Examples
///
/// ```
/// use rttp_guard::http::{Response, StatusCode};
/// use rttp_guard::{CacheDecision, RateLimitResult, ResponseDecorator};
///
/// let mut resp = Response::new(StatusCode::Ok).body("hello");
/// let rate = RateLimitResult { admitted: false, limit: 10, remaining: 0, reset_seconds: 42 };
///
/// ResponseDecorator::decorate(&mut resp, &rate, None, CacheDecision::default());
/// assert_eq!(resp.status(), StatusCode::TooManyRequests);
/// assert_eq!(resp.headers().get("X-Rate-Limit-Reset"), Some("42"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecorator;

impl ResponseDecorator {
    /// Decorates `response` in place.
    ///
    /// - Rate-limit headers are always set.
    /// - `ETag` and `Last-Modified` are set when `version` is given.
    /// - A rejected request becomes `429 Too Many Requests`; the rejection
    ///   takes precedence over any cache outcome.
    /// - An admitted, not-modified request becomes `304 Not Modified` with an
    ///   empty body.
    pub fn decorate(
        response: &mut Response,
        rate: &RateLimitResult,
        version: Option<&ResourceVersion>,
        cache: CacheDecision,
    ) {
        response.set_header(RATE_LIMIT_LIMIT, rate.limit.to_string());
        response.set_header(RATE_LIMIT_REMAINING, rate.remaining.to_string());
        response.set_header(RATE_LIMIT_RESET, rate.reset_seconds.to_string());

        if let Some(version) = version {
            response.set_header(ETAG, version.entity_tag.as_str());
            response.set_header(LAST_MODIFIED, version.last_modified_http());
        }

        if !rate.admitted {
            response.set_status(StatusCode::TooManyRequests);
        } else if cache.not_modified {
            response.set_status(StatusCode::NotModified);
            response.clear_body();
        }
    }
}
