//! Responses produced by route handlers and the router.
//!
//! # Responsibilities
//! - Build legacy JSON-wire bodies: `{"sessionId", "status", "value"}`
//! - Build routing failures (404, 405 with `Allow`, 500)
//! - Convert into an axum response at the server boundary
//!
//! # Design Decisions
//! - Every failure body carries a wire status next to the HTTP status
//! - Bodies are fully materialized; HEAD handling clears them after the GET handler ran

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderName, HeaderValue, ALLOW, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::routing::HandlerError;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Legacy JSON-wire protocol status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum WireStatus {
    Success = 0,
    NoSuchSession = 6,
    NoSuchElement = 7,
    UnknownCommand = 9,
    UnknownError = 13,
    JavaScriptError = 17,
    Timeout = 21,
    NoSuchWindow = 23,
    UnexpectedAlertOpen = 26,
}

impl WireStatus {
    pub fn code(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorValue {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub status: u32,
    pub value: ErrorValue,
}

#[derive(Debug, Clone, Serialize)]
struct SuccessPayload<'a> {
    #[serde(rename = "sessionId")]
    session_id: Option<&'a str>,
    status: u32,
    value: Value,
}

#[derive(Debug, Clone)]
pub struct HubResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl HubResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        match serde_json::to_vec(payload) {
            Ok(body) => {
                let mut response = Self::new(status);
                response
                    .headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                response.body = Bytes::from(body);
                response
            }
            Err(e) => Self::internal_error(None, &format!("failed to encode response: {}", e)),
        }
    }

    /// 200 with a wire-status 0 body.
    pub fn success(session_id: Option<&str>, value: Value) -> Self {
        Self::json(
            StatusCode::OK,
            &SuccessPayload {
                session_id,
                status: WireStatus::Success.code(),
                value,
            },
        )
    }

    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    pub fn error(status: StatusCode, wire: WireStatus, session_id: Option<String>, message: impl Into<String>) -> Self {
        Self::json(
            status,
            &ErrorPayload {
                session_id,
                status: wire.code(),
                value: ErrorValue { message: message.into() },
            },
        )
    }

    pub fn not_found(method: &Method, path: &str) -> Self {
        Self::error(
            StatusCode::NOT_FOUND,
            WireStatus::UnknownCommand,
            None,
            format!("no resource for {} {}", method, path),
        )
    }

    pub fn method_not_allowed(method: &Method, path: &str, allow: &str) -> Self {
        Self::error(
            StatusCode::METHOD_NOT_ALLOWED,
            WireStatus::UnknownCommand,
            None,
            format!("{} is not supported on {}", method, path),
        )
        .with_allow(allow)
    }

    /// 200 with an `Allow` header and no body.
    pub fn options(allow: &str) -> Self {
        Self::new(StatusCode::OK).with_allow(allow)
    }

    pub fn from_handler_error(err: &HandlerError) -> Self {
        Self::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            err.wire_status(),
            err.session_id().map(str::to_string),
            err.message(),
        )
    }

    pub fn internal_error(session_id: Option<String>, message: &str) -> Self {
        // Built by hand: `json` falls back to this on encode failure.
        let payload = serde_json::json!({
            "sessionId": session_id,
            "status": WireStatus::UnknownError.code(),
            "value": { "message": message },
        });
        let mut response = Self::new(StatusCode::INTERNAL_SERVER_ERROR);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        response.body = Bytes::from(payload.to_string());
        response
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn with_allow(self, allow: &str) -> Self {
        match HeaderValue::from_str(allow) {
            Ok(value) => self.with_header(ALLOW, value),
            Err(_) => self,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parsed JSON body; `Value::Null` when empty or not JSON.
    pub fn body_json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn clear_body(&mut self) {
        self.body = Bytes::new();
    }
}

impl IntoResponse for HubResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
