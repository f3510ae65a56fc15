//! # rttp-guard
//!
//! Per-client rate limiting and conditional-request caching for an async
//! HTTP middleware pipeline.
//!
//! - [`RateLimitTracker`] counts requests per [`ClientIdentity`] in fixed
//!   windows and answers admit/reject with a reset countdown.
//! - [`ConditionalCacheValidator`] compares `If-None-Match` /
//!   `If-Modified-Since` against a [`ResourceVersion`].
//! - [`ResponseDecorator`] writes `X-Rate-Limit-*`, `ETag` and
//!   `Last-Modified`, and turns responses into `429` or `304`.
//! - [`middleware::GuardMiddleware`] ties the three together.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::SystemTime;
//! use rttp_guard::context::Context;
//! use rttp_guard::http::{Method, Request, Response, StatusCode};
//! use rttp_guard::middleware::{GuardMiddleware, Next, endpoint, from_middleware};
//! use rttp_guard::{ResourceVersion, ThrottleConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let guard = GuardMiddleware::from_config(&ThrottleConfig::new(2, 60)).unwrap();
//! let stack = vec![
//!     from_middleware(Arc::new(guard)),
//!     endpoint(|_ctx: Context| async {
//!         Response::new(StatusCode::Ok)
//!             .version(ResourceVersion::new("\"v1\"", SystemTime::now()))
//!             .body("hello")
//!     }),
//! ];
//!
//! let req = Request::new(Method::Get, "/greeting").header("If-None-Match", "\"v1\"");
//! let resp = Next::new(stack).run(Context::new(req)).await;
//! assert_eq!(resp.status(), StatusCode::NotModified);
//! assert_eq!(resp.headers().get("X-Rate-Limit-Remaining"), Some("1"));
//! # });
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod decorator;
pub mod http;
pub mod limiter;
pub mod middleware;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheDecision, ConditionalCacheValidator, ConditionalRequest, ResourceVersion};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ThrottleConfig};
pub use decorator::ResponseDecorator;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use limiter::{
    ClientIdentity, RateLimitPolicy, RateLimitResult, RateLimitTracker, RateLimitWindow,
};
