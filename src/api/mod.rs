//! Hub resource table.
//!
//! # Responsibilities
//! - Hold the shared hub state (sessions, command catalog, browser factory, wait defaults)
//! - Bind every hub endpoint on a `Router`
//!
//! # Design Decisions
//! - Wait defaults sit behind `ArcSwap` so a config reload applies to the next command
//! - Handlers are plain async functions of `(Arc<HubState>, HubRequest)`

pub mod handlers;

use arc_swap::ArcSwap;
use axum::http::Method;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::browser::BrowserFactory;
use crate::commands::CommandCatalog;
use crate::config::{HubConfig, RoutingConfig, WaitConfig};
use crate::http::HubRequest;
use crate::lifecycle::Shutdown;
use crate::routing::{HandlerResult, Router};
use crate::session::SessionStore;

pub struct HubState {
    pub sessions: SessionStore,
    pub catalog: CommandCatalog,
    pub browsers: Arc<dyn BrowserFactory>,
    waits: ArcSwap<WaitConfig>,
    started_at: Instant,
}

impl HubState {
    pub fn new(config: &HubConfig, browsers: Arc<dyn BrowserFactory>, shutdown: &Shutdown) -> Self {
        Self {
            sessions: SessionStore::new(config.queue.clone(), shutdown.token()),
            catalog: CommandCatalog::standard(),
            browsers,
            waits: ArcSwap::from_pointee(config.waits.clone()),
            started_at: Instant::now(),
        }
    }

    /// Wait defaults for the next command.
    pub fn waits(&self) -> WaitConfig {
        self.waits.load().as_ref().clone()
    }

    pub fn update_waits(&self, waits: WaitConfig) {
        if *self.waits.load().as_ref() != waits {
            tracing::info!(
                timeout_ms = waits.timeout_ms,
                interval_ms = waits.interval_ms,
                implicit_wait_ms = waits.implicit_wait_ms,
                "Wait defaults updated"
            );
            self.waits.store(Arc::new(waits));
        }
    }

    /// Apply the `waits` section of every reloaded config until the channel closes.
    pub fn watch_waits(self: &Arc<Self>, mut updates: mpsc::UnboundedReceiver<HubConfig>) -> JoinHandle<()> {
        let state = self.clone();
        tokio::spawn(async move {
            while let Some(reloaded) = updates.recv().await {
                state.update_waits(reloaded.waits);
            }
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

fn with_state<F, Fut>(state: &Arc<HubState>, handler: F) -> impl Fn(HubRequest) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<HubState>, HubRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    let state = state.clone();
    move |request| handler(state.clone(), request)
}

/// Bind the hub endpoints under `routing.mount_prefix`.
pub fn build_router(state: &Arc<HubState>, routing: &RoutingConfig) -> Router {
    let mut router = Router::new(routing.mount_prefix.clone()).with_policy(routing.selection);

    router
        .bind("/status")
        .on(Method::GET, with_state(state, handlers::status));
    router
        .bind("/sessions")
        .on(Method::GET, with_state(state, handlers::list_sessions));
    router
        .bind("/session")
        .on(Method::POST, with_state(state, handlers::new_session));
    router
        .bind("/session/:sessionId")
        .on(Method::GET, with_state(state, handlers::get_session))
        .on(Method::DELETE, with_state(state, handlers::delete_session));
    router
        .bind("/session/:sessionId/selenium/:command")
        .on(Method::POST, with_state(state, handlers::run_command));
    router
        .bind("/session/:sessionId/interrupt")
        .on(Method::POST, with_state(state, handlers::interrupt));
    router
        .bind("/session/:sessionId/element/:id/attribute/:name")
        .on(Method::GET, with_state(state, handlers::element_attribute));

    for resource in router.resources() {
        tracing::debug!(pattern = %resource.pattern(), allow = %resource.allow_header(), "Bound resource");
    }
    router
}
