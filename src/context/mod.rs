//! Per-request context — the request plus type-keyed extensions.
//!
//! Upstream layers (authentication, for instance) use the extensions map to
//! hand values such as a [`ClientIdentity`](crate::ClientIdentity) to the guard
//! without either side knowing about the other's types.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use crate::Request;

/// Type-erased request extensions map.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value of the same type
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    pub fn remove<T>(&mut self) -> Option<T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

/// State carried through the middleware pipeline for one request.
pub struct Context {
    request: Request,
    extensions: Extensions,
}

impl Context {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            extensions: Extensions::new(),
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientIdentity;
    use crate::http::Method;

    #[test]
    fn extensions_are_keyed_by_type() {
        let mut ctx = Context::new(Request::new(Method::Get, "/"));
        ctx.extensions_mut().insert(ClientIdentity::new("token:a"));
        ctx.extensions_mut().insert(7u32);

        assert_eq!(
            ctx.extensions().get::<ClientIdentity>(),
            Some(&ClientIdentity::new("token:a"))
        );
        assert_eq!(ctx.extensions_mut().remove::<u32>(), Some(7));
        assert!(ctx.extensions().get::<u32>().is_none());
    }
}
