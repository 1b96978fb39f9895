//! Resource lookup and dispatch.
//!
//! # Responsibilities
//! - Enforce the mount prefix and strip it before matching
//! - Pick the most specific matching resource under the configured policy
//! - Bind variable segments into request attributes
//! - Turn handler errors and panics into 500 responses
//!
//! # Design Decisions
//! - Built once at startup, then shared read-only behind `Arc`
//! - O(n) scan over resources (the hub binds a handful)
//! - Equal specificity falls back to registration order; the first bound resource wins
//! - Routing failures are responses, never errors

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use super::resource::Resource;
use crate::http::{HubRequest, HubResponse};
use crate::observability::metrics;

/// How to rank several resources that match the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// More literal segments wins (`/session/new` beats `/session/:id`).
    #[default]
    FewestVariables,
    /// More variable segments wins. Legacy behavior.
    MostVariables,
}

impl SelectionPolicy {
    fn prefers(self, candidate: usize, current: usize) -> bool {
        match self {
            SelectionPolicy::FewestVariables => candidate < current,
            SelectionPolicy::MostVariables => candidate > current,
        }
    }
}

#[derive(Debug)]
pub struct Router {
    prefix: String,
    policy: SelectionPolicy,
    resources: Vec<Resource>,
}

impl Router {
    /// `prefix` is the mount point (e.g. `/hub`); an empty prefix accepts every path.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            policy: SelectionPolicy::default(),
            resources: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Register a new resource. Binding the same pattern twice keeps both.
    pub fn bind(&mut self, pattern: &str) -> &mut Resource {
        let index = self.resources.len();
        self.resources.push(Resource::new(pattern));
        &mut self.resources[index]
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Remove the mount prefix; `None` when the path lies outside it.
    pub fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(path);
        }
        match path.strip_prefix(self.prefix.as_str())? {
            "" => Some("/"),
            rest if rest.starts_with('/') => Some(rest),
            _ => None,
        }
    }

    /// Most specific resource matching an already stripped path.
    pub fn resolve(&self, path: &str) -> Option<&Resource> {
        let mut best: Option<&Resource> = None;
        for resource in self.resources.iter().filter(|r| r.is_match_for(path)) {
            let better = match best {
                None => true,
                Some(current) => self.policy.prefers(
                    resource.pattern().variable_count(),
                    current.pattern().variable_count(),
                ),
            };
            if better {
                best = Some(resource);
            }
        }
        best
    }

    pub async fn dispatch(&self, mut request: HubRequest) -> HubResponse {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_string();
        let request_id = request.request_id().to_string();

        let matched = self
            .strip_prefix(&path)
            .and_then(|stripped| self.resolve(stripped).map(|resource| (stripped, resource)));

        let response = match matched {
            None => {
                tracing::debug!(request_id = %request_id, method = %method, path = %path, "No resource matched");
                HubResponse::not_found(&method, &path)
            }
            Some((stripped, resource)) => {
                for (name, value) in resource.pattern().extract(stripped) {
                    request.set_attribute(name, value);
                }
                tracing::debug!(
                    request_id = %request_id,
                    method = %method,
                    pattern = %resource.pattern(),
                    "Dispatching"
                );

                match AssertUnwindSafe(resource.handle(request)).catch_unwind().await {
                    Ok(Ok(response)) => response,
                    Ok(Err(err)) => {
                        tracing::error!(
                            request_id = %request_id,
                            method = %method,
                            path = %path,
                            wire_status = err.wire_status().code(),
                            error = %err,
                            "Handler failed"
                        );
                        HubResponse::from_handler_error(&err)
                    }
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        tracing::error!(
                            request_id = %request_id,
                            method = %method,
                            path = %path,
                            panic = %message,
                            "Handler panicked"
                        );
                        HubResponse::internal_error(None, &message)
                    }
                }
            }
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), started);
        response
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::HandlerError;
    use axum::http::{Method, StatusCode};
    use serde_json::Value;

    fn echo_pattern(router: &mut Router, pattern: &'static str) {
        router.bind(pattern).on(Method::GET, move |req: HubRequest| async move {
            let mut attrs: Vec<_> = req
                .attributes()
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            attrs.sort();
            Ok(HubResponse::success(
                None,
                serde_json::json!({ "pattern": pattern, "attrs": attrs }),
            ))
        });
    }

    async fn get(router: &Router, path: &str) -> HubResponse {
        router.dispatch(HubRequest::new(Method::GET, path)).await
    }

    #[test]
    fn test_strip_prefix_on_segment_boundary() {
        let router = Router::new("/hub");
        assert_eq!(router.strip_prefix("/hub/status"), Some("/status"));
        assert_eq!(router.strip_prefix("/hub"), Some("/"));
        assert_eq!(router.strip_prefix("/hubx/status"), None);
        assert_eq!(router.strip_prefix("/status"), None);
    }

    #[test]
    fn test_empty_prefix_accepts_everything() {
        let router = Router::new("");
        assert_eq!(router.strip_prefix("/status"), Some("/status"));
    }

    #[tokio::test]
    async fn test_variables_bound_as_attributes() {
        let mut router = Router::new("/hub");
        echo_pattern(&mut router, "/a/:x/b");

        let response = get(&router, "/hub/a/123/b").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body_json()["value"]["attrs"][0], "x=123");
    }

    #[tokio::test]
    async fn test_prefix_mismatch_is_404() {
        let mut router = Router::new("/hub");
        echo_pattern(&mut router, "/status");
        assert_eq!(get(&router, "/status").await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_fewest_variables_prefers_literals() {
        let mut router = Router::new("/hub");
        echo_pattern(&mut router, "/session/:id");
        echo_pattern(&mut router, "/session/new");

        let body = get(&router, "/hub/session/new").await.body_json();
        assert_eq!(body["value"]["pattern"], "/session/new");
    }

    #[tokio::test]
    async fn test_most_variables_policy() {
        let mut router = Router::new("/hub").with_policy(SelectionPolicy::MostVariables);
        echo_pattern(&mut router, "/session/new");
        echo_pattern(&mut router, "/session/:id");

        let body = get(&router, "/hub/session/new").await.body_json();
        assert_eq!(body["value"]["pattern"], "/session/:id");
    }

    #[tokio::test]
    async fn test_equal_specificity_first_registered_wins() {
        for policy in [SelectionPolicy::FewestVariables, SelectionPolicy::MostVariables] {
            let mut router = Router::new("/hub").with_policy(policy);
            echo_pattern(&mut router, "/x/:a");
            echo_pattern(&mut router, "/x/:b");

            for _ in 0..3 {
                let body = get(&router, "/hub/x/1").await.body_json();
                assert_eq!(body["value"]["pattern"], "/x/:a");
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_bind_keeps_both() {
        let mut router = Router::new("/hub");
        echo_pattern(&mut router, "/status");
        echo_pattern(&mut router, "/status");
        assert_eq!(router.resources().len(), 2);
        assert_eq!(get(&router, "/hub/status").await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500() {
        let mut router = Router::new("/hub");
        router
            .bind("/fail")
            .on(Method::GET, |_req| async { Err(HandlerError::new("exploded")) });

        let response = get(&router, "/hub/fail").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body_json()["value"]["message"], "exploded");
        assert_eq!(response.body_json()["status"], 13);
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_500() {
        let mut router = Router::new("/hub");
        router.bind("/panic").on(Method::GET, |_req| async {
            if true {
                panic!("kaboom");
            }
            Ok(HubResponse::success(None, Value::Null))
        });

        let response = get(&router, "/hub/panic").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = response.body_json()["value"]["message"].as_str().unwrap().to_string();
        assert!(message.contains("kaboom"));

        // The router keeps serving after a panic.
        assert_eq!(get(&router, "/hub/panic").await.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
