//! Radix-tree request router.
//!
//! One tree per HTTP method. Route groups are plain functions that take a
//! [`Router`] and return it with their routes added, see [`crate::routes`].

use std::collections::HashMap;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::handler::{Endpoint, Handler};

/// The application router.
///
/// Built once by [`create_app`](crate::create_app). Each registration returns
/// `self` so calls chain.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<Endpoint>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves
    /// them. Static segments win over parameters, so `/hello` and `/{id}`
    /// can coexist.
    ///
    /// # Panics
    ///
    /// Panics on a malformed or conflicting path. Routes are fixed at
    /// startup, so this is a programming error.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_endpoint())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, path, handler)
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Endpoint, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let endpoint = matched.value.clone();
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((endpoint, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
