use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::HubState;
use crate::http::{HubRequest, HubResponse, WireStatus};
use crate::routing::{HandlerError, HandlerResult};
use crate::session::Session;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NewSessionRequest {
    #[serde(alias = "desiredCapabilities")]
    capabilities: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommandRequest {
    args: Vec<Value>,
}

/// Selenese arguments travel as strings; numbers and booleans are stringified.
fn arg_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn session(state: &HubState, request: &HubRequest) -> Result<Arc<Session>, HandlerError> {
    let id = request.require_attribute("sessionId")?;
    state.sessions.get(id).ok_or_else(|| {
        HandlerError::new(format!("session {} does not exist", id))
            .with_wire_status(WireStatus::NoSuchSession)
            .for_session(id)
    })
}

pub async fn status(state: Arc<HubState>, _request: HubRequest) -> HandlerResult {
    Ok(HubResponse::success(
        None,
        json!({
            "ready": true,
            "version": env!("CARGO_PKG_VERSION"),
            "uptimeSecs": state.uptime_secs(),
            "sessions": state.sessions.len(),
            "commands": state.catalog.names(),
        }),
    ))
}

pub async fn list_sessions(state: Arc<HubState>, _request: HubRequest) -> HandlerResult {
    let sessions: Vec<Value> = state.sessions.list().iter().map(|s| s.describe()).collect();
    Ok(HubResponse::success(None, Value::Array(sessions)))
}

pub async fn new_session(state: Arc<HubState>, request: HubRequest) -> HandlerResult {
    let body: NewSessionRequest = request.json()?;
    let capabilities = body.capabilities.unwrap_or_else(|| json!({}));

    let browser = state
        .browsers
        .launch(&capabilities)
        .await
        .map_err(|e| HandlerError::new(format!("failed to launch browser: {}", e)))?;

    let session = state.sessions.create(browser, capabilities.clone());
    tracing::info!(request_id = %request.request_id(), session_id = %session.id(), "New session");
    Ok(HubResponse::success(
        Some(session.id()),
        json!({ "capabilities": capabilities }),
    ))
}

pub async fn get_session(state: Arc<HubState>, request: HubRequest) -> HandlerResult {
    let session = session(&state, &request)?;
    Ok(HubResponse::success(Some(session.id()), session.describe()))
}

pub async fn delete_session(state: Arc<HubState>, request: HubRequest) -> HandlerResult {
    let id = session(&state, &request)?.id().to_string();
    if let Some(session) = state.sessions.remove(&id) {
        session
            .close()
            .await
            .map_err(|e| HandlerError::new(format!("failed to close browser: {}", e)).for_session(id.as_str()))?;
    }
    Ok(HubResponse::success(Some(id.as_str()), Value::Null))
}

pub async fn run_command(state: Arc<HubState>, request: HubRequest) -> HandlerResult {
    let session = session(&state, &request)?;
    let command = request.require_attribute("command")?;
    let body: CommandRequest = request.json()?;
    let args: Vec<String> = body.args.into_iter().map(arg_string).collect();

    tracing::info!(
        request_id = %request.request_id(),
        session_id = %session.id(),
        command,
        args = args.len(),
        "Running command"
    );

    let value = session
        .run(&state.catalog, command, args, state.waits())
        .await
        .map_err(|e| HandlerError::from(e).for_session(session.id()))?;
    Ok(HubResponse::success(Some(session.id()), value))
}

pub async fn interrupt(state: Arc<HubState>, request: HubRequest) -> HandlerResult {
    let session = session(&state, &request)?;
    let interrupted = session.interrupt();
    tracing::info!(session_id = %session.id(), interrupted, "Interrupt requested");
    Ok(HubResponse::success(
        Some(session.id()),
        json!({ "interrupted": interrupted }),
    ))
}

/// `GET /session/:sessionId/element/:id/attribute/:name`, where `:id` is a Selenese locator.
pub async fn element_attribute(state: Arc<HubState>, request: HubRequest) -> HandlerResult {
    let session = session(&state, &request)?;
    let locator = request.require_attribute("id")?;
    let name = request.require_attribute("name")?;

    let value = session
        .run(
            &state.catalog,
            "getAttribute",
            vec![format!("{}@{}", locator, name)],
            state.waits(),
        )
        .await
        .map_err(|e| HandlerError::from(e).for_session(session.id()))?;
    Ok(HubResponse::success(Some(session.id()), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_string() {
        assert_eq!(arg_string(Value::from("id=q")), "id=q");
        assert_eq!(arg_string(Value::from(3000)), "3000");
        assert_eq!(arg_string(Value::Bool(true)), "true");
        assert_eq!(arg_string(Value::Null), "");
    }

    #[test]
    fn test_new_session_accepts_legacy_key() {
        let body: NewSessionRequest =
            serde_json::from_str(r#"{"desiredCapabilities":{"browserName":"memory"}}"#).unwrap();
        assert_eq!(body.capabilities.unwrap()["browserName"], "memory");
    }
}
