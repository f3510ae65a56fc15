//! Conditional-request validation — entity tags and modification dates.
//!
//! The resource owner supplies a [`ResourceVersion`]; the request supplies a
//! [`ConditionalRequest`] parsed from `If-None-Match` and `If-Modified-Since`.
//! [`ConditionalCacheValidator::evaluate`] decides whether the client's copy is
//! still current.
//!
//! Malformed validators never fail a request: an unparseable
//! `If-Modified-Since` is treated as absent, so the full representation is
//! served.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::http::Headers;

/// Version of a resource at the time of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceVersion {
    /// Opaque validator, compared byte-for-byte with `If-None-Match`.
    pub entity_tag: String,
    pub last_modified: SystemTime,
}

impl ResourceVersion {
    pub fn new(entity_tag: impl Into<String>, last_modified: SystemTime) -> Self {
        Self {
            entity_tag: entity_tag.into(),
            last_modified,
        }
    }

    /// `last_modified` as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
    ///
    /// Times outside the representable range are clamped to it: anything
    /// before the epoch formats as `Thu, 01 Jan 1970 00:00:00 GMT`, anything
    /// after the end of year 9999 as `Fri, 31 Dec 9999 23:59:59 GMT`.
    pub fn last_modified_http(&self) -> String {
        httpdate::fmt_http_date(clamp_to_http_date(self.last_modified))
    }
}

/// Validators carried by an incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalRequest {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<SystemTime>,
}

impl ConditionalRequest {
    /// Extracts `If-None-Match` and `If-Modified-Since` from request headers.
    ///
    /// # Examples
    ///
    /// ```
    /// use rttp_guard::http::Headers;
    /// use rttp_guard::ConditionalRequest;
    ///
    /// let mut headers = Headers::new();
    /// headers.insert("If-None-Match", "\"v1\"");
    /// headers.insert("If-Modified-Since", "yesterday-ish");
    ///
    /// let cond = ConditionalRequest::from_headers(&headers);
    /// assert_eq!(cond.if_none_match.as_deref(), Some("\"v1\""));
    /// assert!(cond.if_modified_since.is_none());
    /// ```
    pub fn from_headers(headers: &Headers) -> Self {
        let if_none_match = headers
            .get("if-none-match")
            .map(|v| v.trim().to_owned());

        let if_modified_since = headers.get("if-modified-since").and_then(|raw| {
            match httpdate::parse_http_date(raw.trim()) {
                Ok(ts) => Some(ts),
                Err(_) => {
                    debug!(value = raw, "ignoring malformed If-Modified-Since");
                    None
                }
            }
        });

        Self {
            if_none_match,
            if_modified_since,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.if_none_match.is_none() && self.if_modified_since.is_none()
    }
}

/// Result of evaluating a conditional request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheDecision {
    pub not_modified: bool,
}

/// Decides `304 Not Modified` versus a full response.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalCacheValidator;

impl ConditionalCacheValidator {
    /// Wildcard `If-None-Match` value that matches any current tag.
    pub const ANY_TAG: &'static str = "*";

    /// Evaluates `conditional` against the `current` resource version.
    ///
    /// An exact tag match (or `*`) wins. Otherwise the resource is unmodified
    /// when its last modification is not later than `If-Modified-Since`,
    /// compared at whole-second precision.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::SystemTime;
    /// use rttp_guard::{ConditionalCacheValidator, ConditionalRequest, ResourceVersion};
    ///
    /// let current = ResourceVersion::new("v1", SystemTime::now());
    /// let cond = ConditionalRequest {
    ///     if_none_match: Some("v1".into()),
    ///     if_modified_since: None,
    /// };
    /// assert!(ConditionalCacheValidator::evaluate(&current, &cond).not_modified);
    /// ```
    pub fn evaluate(current: &ResourceVersion, conditional: &ConditionalRequest) -> CacheDecision {
        if let Some(tag) = conditional.if_none_match.as_deref() {
            if tag == current.entity_tag || tag == Self::ANY_TAG {
                return CacheDecision { not_modified: true };
            }
        }

        let not_modified = conditional
            .if_modified_since
            .is_some_and(|since| whole_seconds(current.last_modified) <= whole_seconds(since));

        CacheDecision { not_modified }
    }
}

/// Last instant an IMF-fixdate can express (9999-12-31T23:59:59Z).
const LATEST_HTTP_DATE_SECS: u64 = 253_402_300_799;

fn clamp_to_http_date(ts: SystemTime) -> SystemTime {
    let latest = UNIX_EPOCH + Duration::from_secs(LATEST_HTTP_DATE_SECS);
    ts.clamp(UNIX_EPOCH, latest)
}

// HTTP dates carry no sub-second part, so both sides are truncated before
// comparing. Instants before the epoch clamp to zero.
fn whole_seconds(ts: SystemTime) -> Duration {
    let since_epoch = ts.duration_since(UNIX_EPOCH).unwrap_or_default();
    Duration::from_secs(since_epoch.as_secs())
}
