//! Request representation handed to route handlers.
//!
//! # Responsibilities
//! - Buffer the incoming axum request into an owned `HubRequest`
//! - Carry attributes bound from variable path segments
//! - Expose the request ID assigned by the request-id middleware
//!
//! # Design Decisions
//! - Bodies are buffered up front (bounded by `listener.max_body_bytes`); commands are small JSON
//! - The path is kept percent-encoded; the router decodes per segment

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::routing::HandlerError;

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct HubRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    attributes: HashMap<String, String>,
}

impl HubRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Buffer an axum request, reading at most `limit` body bytes.
    pub async fn from_http(request: Request<Body>, limit: usize) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit).await?;
        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            headers: parts.headers,
            body,
            attributes: HashMap::new(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Attribute that the matched pattern is known to bind.
    pub fn require_attribute(&self, name: &str) -> Result<&str, HandlerError> {
        self.attribute(name)
            .ok_or_else(|| HandlerError::new(format!("missing path attribute `{}`", name)))
    }

    /// Decode the JSON body. An empty body decodes as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let body: &[u8] = if self.body.is_empty() { b"{}" } else { &self.body };
        serde_json::from_slice(body)
            .map_err(|e| HandlerError::new(format!("invalid JSON body: {}", e)))
    }
}
