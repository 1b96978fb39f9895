//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum app that feeds every request to the hub `Router`
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind server to listener and stop on the shutdown signal

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HubConfig;
use crate::http::request::HubRequest;
use crate::http::response::{HubResponse, WireStatus};
use crate::routing::Router as HubRouter;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<HubRouter>,
    pub max_body_bytes: usize,
}

/// HTTP server for the hub.
pub struct HttpServer {
    app: Router,
}

impl HttpServer {
    pub fn new(config: &HubConfig, router: Arc<HubRouter>) -> Self {
        let state = AppState {
            router,
            max_body_bytes: config.listener.max_body_bytes,
        };
        Self {
            app: Self::build_app(config, state),
        }
    }

    /// Build the axum app with all middleware layers.
    #[allow(deprecated)]
    fn build_app(config: &HubConfig, state: AppState) -> Router {
        let max_body_bytes = state.max_body_bytes;
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The app as a service, for driving requests without a socket.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Every path goes through the hub router; axum only does transport.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    match HubRequest::from_http(request, state.max_body_bytes).await {
        Ok(request) => state.router.dispatch(request).await.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            HubResponse::error(
                StatusCode::BAD_REQUEST,
                WireStatus::UnknownError,
                None,
                format!("failed to read request body: {}", e),
            )
            .into_response()
        }
    }
}
