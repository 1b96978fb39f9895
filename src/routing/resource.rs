//! A routable endpoint: one path pattern plus its per-method handlers.
//!
//! # Responsibilities
//! - Register handlers fluently with `on(method, handler)`
//! - Answer OPTIONS with the `Allow` header
//! - Serve HEAD through the GET handler
//! - Answer unbound methods with 405
//!
//! # Design Decisions
//! - Handlers are type-erased async closures so resources of one router can be stored together
//! - Registering the same method twice replaces the earlier handler

use futures_util::future::BoxFuture;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

use axum::http::Method;

use super::pattern::PathPattern;
use crate::http::response::WireStatus;
use crate::http::{HubRequest, HubResponse};

/// Failure raised by a handler; the router turns it into a 500.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    wire: WireStatus,
    session_id: Option<String>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            wire: WireStatus::UnknownError,
            session_id: None,
        }
    }

    pub fn with_wire_status(mut self, wire: WireStatus) -> Self {
        self.wire = wire;
        self
    }

    pub fn for_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn wire_status(&self) -> WireStatus {
        self.wire
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

pub type HandlerResult = Result<HubResponse, HandlerError>;

type Handler = Arc<dyn Fn(HubRequest) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

pub struct Resource {
    pattern: PathPattern,
    handlers: HashMap<Method, Handler>,
}

impl Resource {
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            handlers: HashMap::new(),
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn on<H, Fut>(&mut self, method: Method, handler: H) -> &mut Self
    where
        H: Fn(HubRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |request| Box::pin(handler(request)));
        self.handlers.insert(method, handler);
        self
    }

    pub fn is_match_for(&self, path: &str) -> bool {
        self.pattern.is_match_for(path)
    }

    pub fn supports(&self, method: &Method) -> bool {
        self.handlers.contains_key(method)
    }

    /// Bound methods, plus HEAD when GET is bound, plus OPTIONS; sorted, comma separated.
    pub fn allow_header(&self) -> String {
        let mut methods: BTreeSet<&str> = self.handlers.keys().map(Method::as_str).collect();
        if self.supports(&Method::GET) {
            methods.insert(Method::HEAD.as_str());
        }
        methods.insert(Method::OPTIONS.as_str());
        methods.into_iter().collect::<Vec<_>>().join(", ")
    }

    pub async fn handle(&self, request: HubRequest) -> HandlerResult {
        let method = request.method().clone();

        if method == Method::OPTIONS {
            return Ok(HubResponse::options(&self.allow_header()));
        }

        if let Some(handler) = self.handlers.get(&method) {
            return handler(request).await;
        }

        if method == Method::HEAD {
            if let Some(get) = self.handlers.get(&Method::GET) {
                let mut response = get(request).await?;
                response.clear_body();
                return Ok(response);
            }
        }

        Ok(HubResponse::method_not_allowed(
            &method,
            request.path(),
            &self.allow_header(),
        ))
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("pattern", &self.pattern.as_str())
            .field("allow", &self.allow_header())
            .finish()
    }
}
