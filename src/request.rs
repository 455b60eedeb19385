//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method};
use rusqlite::Connection;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::context::RequestContext;
use crate::error::Error;
use crate::models::User;
use crate::session::Session;

/// An incoming HTTP request together with its [`RequestContext`].
///
/// Handlers take it by value. The context, and with it any open database
/// connection, is dropped when the handler is done with the request.
#[derive(Debug)]
pub struct Request {
    parts: http::request::Parts,
    body: Bytes,
    params: HashMap<String, String>,
    ctx: RequestContext,
}

impl Request {
    pub(crate) fn new(
        parts: http::request::Parts,
        body: Bytes,
        params: HashMap<String, String>,
        ctx: RequestContext,
    ) -> Self {
        Self { parts, body, params, ctx }
    }

    pub fn method(&self) -> &Method { &self.parts.method }
    pub fn path(&self) -> &str { self.parts.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.parts.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Values that are not visible ASCII are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/{id}/update`, `req.param("id")` on `/42/update` returns
    /// `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Deserializes the body as JSON. A malformed body is a `400`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::Validation(format!("invalid request body: {e}")))
    }

    pub fn config(&self) -> &Config { self.ctx.config() }
    pub fn session(&self) -> &Session { self.ctx.session() }

    /// This request's database connection, opened on first use.
    pub fn db(&mut self) -> Result<&Connection, Error> {
        self.ctx.db()
    }

    pub fn current_user(&mut self) -> Result<Option<User>, Error> {
        self.ctx.current_user()
    }
}
