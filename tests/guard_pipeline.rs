use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rttp_guard::context::Context;
use rttp_guard::http::{Method, Request, Response, StatusCode};
use rttp_guard::middleware::{
    GuardMiddleware, LoggerMiddleware, MiddlewareHandler, Next, endpoint, from_middleware,
};
use rttp_guard::{
    ClientIdentity, ManualClock, RateLimitPolicy, RateLimitTracker, ResourceVersion, ThrottleConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn modified_at() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(784_111_777)
}

struct Harness {
    clock: ManualClock,
    tracker: Arc<RateLimitTracker<ManualClock>>,
    calls: Arc<AtomicUsize>,
    stack: Vec<MiddlewareHandler>,
}

impl Harness {
    fn new(limit: u32, window_seconds: u64) -> Self {
        init_tracing();
        let clock = ManualClock::new();
        let tracker = Arc::new(RateLimitTracker::new(clock.clone()));
        let guard = GuardMiddleware::new(
            Arc::clone(&tracker),
            RateLimitPolicy::new(limit, window_seconds),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let stack = vec![
            from_middleware(Arc::new(LoggerMiddleware)),
            from_middleware(Arc::new(guard)),
            endpoint(move |ctx: Context| {
                counter.fetch_add(1, Ordering::SeqCst);
                let missing = ctx.request().path() == "/missing";
                async move {
                    if missing {
                        return Response::new(StatusCode::NotFound)
                            .version(ResourceVersion::new("v1", modified_at()))
                            .body("no such thing");
                    }
                    Response::new(StatusCode::Ok)
                        .version(ResourceVersion::new("v1", modified_at()))
                        .body("resource body")
                }
            }),
        ];

        Self {
            clock,
            tracker,
            calls,
            stack,
        }
    }

    async fn send(&self, request: Request) -> Response {
        Next::new(self.stack.clone()).run(Context::new(request)).await
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn get(token: &str) -> Request {
    Request::new(Method::Get, "/widgets/1").header("Authorization", format!("Bearer {token}"))
}

fn header<'a>(resp: &'a Response, name: &str) -> Option<&'a str> {
    resp.headers().get(name)
}

#[tokio::test]
async fn two_per_minute_over_the_wire() {
    let h = Harness::new(2, 60);
    let mut statuses = Vec::new();
    let mut remaining = Vec::new();
    let mut resets = Vec::new();

    for advance in [0, 10, 10, 50] {
        h.clock.advance(Duration::from_secs(advance));
        let resp = h.send(get("alice")).await;
        statuses.push(resp.status());
        remaining.push(header(&resp, "X-Rate-Limit-Remaining").unwrap().to_owned());
        resets.push(header(&resp, "X-Rate-Limit-Reset").unwrap().to_owned());
        assert_eq!(header(&resp, "X-Rate-Limit-Limit"), Some("2"));
    }

    assert_eq!(
        statuses,
        [
            StatusCode::Ok,
            StatusCode::Ok,
            StatusCode::TooManyRequests,
            StatusCode::Ok
        ]
    );
    assert_eq!(remaining, ["1", "0", "0", "1"]);
    assert_eq!(resets[2], "40");
    assert_eq!(resets[3], "60");
}

#[tokio::test]
async fn rejected_request_never_reaches_handler() {
    let h = Harness::new(1, 60);

    assert_eq!(h.send(get("bob")).await.status(), StatusCode::Ok);
    let rejected = h.send(get("bob")).await;

    assert_eq!(rejected.status(), StatusCode::TooManyRequests);
    assert_eq!(h.calls(), 1);
    assert!(header(&rejected, "ETag").is_none());
    assert_eq!(header(&rejected, "X-Rate-Limit-Reset"), Some("60"));
}

#[tokio::test]
async fn matching_etag_yields_empty_304() {
    let h = Harness::new(10, 60);

    let resp = h.send(get("carol").header("If-None-Match", "v1")).await;

    assert_eq!(resp.status(), StatusCode::NotModified);
    assert!(resp.body_ref().is_empty());
    assert_eq!(header(&resp, "ETag"), Some("v1"));
    assert_eq!(header(&resp, "Last-Modified"), Some("Sun, 06 Nov 1994 08:49:37 GMT"));
    assert_eq!(header(&resp, "X-Rate-Limit-Remaining"), Some("9"));

    let bytes = resp.into_bytes();
    let wire = std::str::from_utf8(&bytes).unwrap();
    assert!(wire.starts_with("HTTP/1.1 304 Not Modified\r\n"));
    assert!(wire.ends_with("Content-Length: 0\r\n\r\n"));
}

#[tokio::test]
async fn stale_etag_serves_full_body() {
    let h = Harness::new(10, 60);

    let resp = h.send(get("carol").header("If-None-Match", "v0")).await;

    assert_eq!(resp.status(), StatusCode::Ok);
    assert_eq!(resp.body_ref(), b"resource body");
    assert_eq!(header(&resp, "ETag"), Some("v1"));
}

#[tokio::test]
async fn if_modified_since_yields_304() {
    let h = Harness::new(10, 60);

    let resp = h
        .send(get("dave").header("If-Modified-Since", "Sun, 06 Nov 1994 08:49:37 GMT"))
        .await;
    assert_eq!(resp.status(), StatusCode::NotModified);

    let resp = h
        .send(get("dave").header("If-Modified-Since", "Sun, 06 Nov 1994 08:49:36 GMT"))
        .await;
    assert_eq!(resp.status(), StatusCode::Ok);
}

#[tokio::test]
async fn malformed_if_modified_since_fails_open() {
    let h = Harness::new(10, 60);

    let resp = h.send(get("erin").header("If-Modified-Since", "last tuesday")).await;

    assert_eq!(resp.status(), StatusCode::Ok);
    assert_eq!(resp.body_ref(), b"resource body");
}

#[tokio::test]
async fn unsafe_methods_are_never_304() {
    let h = Harness::new(10, 60);

    let req = Request::new(Method::Put, "/widgets/1")
        .header("Authorization", "Bearer frank")
        .header("If-None-Match", "v1");
    let resp = h.send(req).await;

    assert_eq!(resp.status(), StatusCode::Ok);
    assert_eq!(header(&resp, "X-Rate-Limit-Remaining"), Some("9"));
}

#[tokio::test]
async fn error_responses_are_never_304() {
    let h = Harness::new(10, 60);

    let req = Request::new(Method::Get, "/missing").header("If-None-Match", "v1");
    let resp = h.send(req).await;

    assert_eq!(resp.status(), StatusCode::NotFound);
    assert_eq!(resp.body_ref(), b"no such thing");
}

#[tokio::test]
async fn upstream_identity_overrides_headers() {
    let h = Harness::new(1, 60);

    let mut ctx = Context::new(get("shared-token"));
    ctx.extensions_mut().insert(ClientIdentity::new("tenant:42"));
    let resp = Next::new(h.stack.clone()).run(ctx).await;
    assert_eq!(resp.status(), StatusCode::Ok);

    // Same token, but a different accounting key than the extension above.
    assert_eq!(h.send(get("shared-token")).await.status(), StatusCode::Ok);
    assert!(h.tracker.window(&ClientIdentity::new("tenant:42")).is_some());
    assert!(h
        .tracker
        .window(&ClientIdentity::new("token:shared-token"))
        .is_some());
}

#[tokio::test]
async fn clients_are_limited_independently() {
    let h = Harness::new(1, 60);

    assert_eq!(h.send(get("gina")).await.status(), StatusCode::Ok);
    assert_eq!(h.send(get("gina")).await.status(), StatusCode::TooManyRequests);
    assert_eq!(h.send(get("hank")).await.status(), StatusCode::Ok);

    let anon = Request::new(Method::Get, "/widgets/1");
    assert_eq!(h.send(anon).await.status(), StatusCode::Ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_respect_limit() {
    let h = Arc::new(Harness::new(25, 60));

    let tasks: Vec<_> = (0..100)
        .map(|_| {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.send(get("swarm")).await.status() })
        })
        .collect();

    let mut ok = 0;
    for task in tasks {
        if task.await.unwrap() == StatusCode::Ok {
            ok += 1;
        }
    }
    assert_eq!(ok, 25);
    assert_eq!(h.calls(), 25);
}

#[tokio::test]
async fn evictor_drops_elapsed_windows_and_exits_with_tracker() {
    init_tracing();
    let clock = ManualClock::new();
    let tracker = Arc::new(RateLimitTracker::new(clock.clone()));
    let policy = RateLimitPolicy::new(5, 1);

    tracker.check_now(&ClientIdentity::new("a"), &policy);
    tracker.check_now(&ClientIdentity::new("b"), &policy);
    assert_eq!(tracker.len(), 2);

    let handle = tracker.spawn_evictor(Duration::from_millis(10));
    clock.advance(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(tracker.is_empty());

    drop(tracker);
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("evictor should stop once the tracker is dropped")
        .unwrap();
}

#[tokio::test]
async fn guard_from_config_spawns_configured_evictor() {
    let config = ThrottleConfig::from_json(r#"{ "limit": 3, "window_seconds": 10 }"#).unwrap();
    let guard = GuardMiddleware::from_config(&config).unwrap();
    assert_eq!(guard.policy(), RateLimitPolicy::new(3, 10));

    let handle = guard.spawn_evictor(&config).expect("eviction enabled by default");
    handle.abort();

    let disabled = config.clone().eviction_interval_seconds(0);
    assert!(guard.spawn_evictor(&disabled).is_none());
}
