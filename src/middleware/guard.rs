use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{Middleware, Next};
use crate::cache::{CacheDecision, ConditionalCacheValidator, ConditionalRequest};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ThrottleConfig};
use crate::context::Context;
use crate::decorator::ResponseDecorator;
use crate::http::{Response, StatusCode};
use crate::limiter::{ClientIdentity, RateLimitPolicy, RateLimitTracker};

/// Rate limiting and conditional-request middleware.
///
/// For every request:
///
/// 1. The caller is identified by the [`ClientIdentity`] extension if an
///    upstream layer set one, otherwise by [`ClientIdentity::from_request`].
/// 2. The tracker decides admission. A rejected request is answered with a
///    decorated `429 Too Many Requests` and the downstream handler is **not**
///    called.
/// 3. The downstream handler runs. For `GET`/`HEAD` requests whose response is
///    2xx and carries a [`ResourceVersion`](crate::ResourceVersion), the
///    request's validators are evaluated.
/// 4. The response is decorated with rate-limit and validator headers, and
///    becomes `304 Not Modified` when the client's copy is current.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use rttp_guard::ThrottleConfig;
/// use rttp_guard::middleware::{GuardMiddleware, from_middleware};
///
/// let guard = GuardMiddleware::from_config(&ThrottleConfig::new(60, 60)).unwrap();
/// let handler = from_middleware(Arc::new(guard));
/// ```
pub struct GuardMiddleware<C = SystemClock>
where
    C: Clock,
{
    tracker: Arc<RateLimitTracker<C>>,
    policy: RateLimitPolicy,
}

impl GuardMiddleware<SystemClock> {
    /// Builds a guard with a fresh tracker from validated settings.
    pub fn from_config(config: &ThrottleConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(
            Arc::new(RateLimitTracker::default()),
            config.policy(),
        ))
    }
}

impl<C> GuardMiddleware<C>
where
    C: Clock + 'static,
{
    /// Builds a guard over an existing (possibly shared) tracker.
    pub fn new(tracker: Arc<RateLimitTracker<C>>, policy: RateLimitPolicy) -> Self {
        Self { tracker, policy }
    }

    pub fn tracker(&self) -> &Arc<RateLimitTracker<C>> {
        &self.tracker
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    /// Starts background eviction at the configured interval.
    ///
    /// Returns `None` when eviction is disabled. Must be called from within a
    /// tokio runtime.
    pub fn spawn_evictor(&self, config: &ThrottleConfig) -> Option<JoinHandle<()>> {
        config
            .eviction_interval()
            .map(|every| self.tracker.spawn_evictor(every))
    }
}

impl<C> Middleware for GuardMiddleware<C>
where
    C: Clock + 'static,
{
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let tracker = Arc::clone(&self.tracker);
        let policy = self.policy;

        Box::pin(async move {
            let client = ctx
                .extensions()
                .get::<ClientIdentity>()
                .cloned()
                .unwrap_or_else(|| ClientIdentity::from_request(ctx.request()));

            let rate = tracker.check_now(&client, &policy);
            if !rate.admitted {
                warn!(
                    client = %client,
                    limit = rate.limit,
                    reset_seconds = rate.reset_seconds,
                    "rate limit exceeded"
                );
                let mut resp =
                    Response::new(StatusCode::TooManyRequests).body("Rate limit exceeded");
                ResponseDecorator::decorate(&mut resp, &rate, None, CacheDecision::default());
                return resp;
            }

            let conditional = ctx
                .request()
                .method()
                .is_cacheable_read()
                .then(|| ConditionalRequest::from_headers(ctx.request().headers()));

            let mut resp = next.run(ctx).await;

            let version = resp.resource_version().cloned();
            let cache = match (&conditional, &version) {
                (Some(cond), Some(current)) if resp.status().is_success() => {
                    ConditionalCacheValidator::evaluate(current, cond)
                }
                _ => CacheDecision::default(),
            };
            if cache.not_modified {
                debug!(client = %client, "conditional request satisfied; sending 304");
            }

            ResponseDecorator::decorate(&mut resp, &rate, version.as_ref(), cache);
            resp
        })
    }
}
