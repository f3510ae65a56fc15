//! Caller identity used as the rate-limit accounting key.

use std::fmt;

use crate::http::Request;

/// Opaque key identifying the caller (an API token or a client address).
///
/// Normally produced by an upstream authentication layer and stored in the
/// request [`Extensions`](crate::context::Extensions). When none is present,
/// [`ClientIdentity::from_request`] derives one from the request headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Key shared by every caller that carries no identifying header.
    pub const ANONYMOUS: &'static str = "anonymous";

    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives an identity from request headers.
    ///
    /// Lookup order: `Authorization` (the credential after the scheme),
    /// the first hop of `X-Forwarded-For`, `X-Real-IP`, and finally
    /// [`ANONYMOUS`](Self::ANONYMOUS). Token and address keys are prefixed
    /// (`token:` / `ip:`) so the two namespaces cannot collide.
    ///
    /// # Examples
    ///
    /// ```
    /// use rttp_guard::http::{Method, Request};
    /// use rttp_guard::ClientIdentity;
    ///
    /// let req = Request::new(Method::Get, "/")
    ///     .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1");
    /// assert_eq!(ClientIdentity::from_request(&req).as_str(), "ip:203.0.113.9");
    /// ```
    pub fn from_request(request: &Request) -> Self {
        let headers = request.headers();

        if let Some(auth) = headers.get("authorization") {
            let credential = auth
                .split_once(' ')
                .map(|(_, rest)| rest)
                .unwrap_or(auth)
                .trim();
            if !credential.is_empty() {
                return Self(format!("token:{credential}"));
            }
        }

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let real_ip = headers
            .get("x-real-ip")
            .map(str::trim)
            .filter(|v| !v.is_empty());

        match forwarded.or(real_ip) {
            Some(addr) => Self(format!("ip:{addr}")),
            None => Self(Self::ANONYMOUS.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientIdentity {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for ClientIdentity {
    fn from(key: String) -> Self {
        Self(key)
    }
}
