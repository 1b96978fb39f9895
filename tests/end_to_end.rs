//! Hub served on a real socket, driven with an HTTP client.

use serde_json::{json, Value};
use std::time::Duration;

mod common;

#[tokio::test]
async fn test_full_session_over_tcp() {
    let (addr, hub) = common::spawn_server(common::test_config()).await;
    let base = format!("http://{}/hub", addr);
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    let status: Value = client.get(format!("{}/status", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["value"]["ready"], true);

    let created: Value = client
        .post(format!("{}/session", base))
        .json(&json!({ "capabilities": { "browserName": "memory" } }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let session = created["sessionId"].as_str().unwrap().to_string();

    let run = |command: &str, args: Value| {
        client
            .post(format!("{}/session/{}/selenium/{}", base, session, command))
            .json(&json!({ "args": args }))
            .send()
    };

    let res = run("click", json!(["id=next"])).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    // Numeric timeouts are accepted as JSON numbers too.
    let res = run("waitForPageToLoad", json!([1000])).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);

    let title: Value = run("getTitle", json!([])).await.unwrap().json().await.unwrap();
    assert_eq!(title["value"], "Next Page");

    let res = run("waitForCondition", json!(["false", "100"])).await.unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 21);
    assert_eq!(body["sessionId"], session.as_str());

    let res = client
        .delete(format!("{}/session/{}", base, session))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), reqwest::StatusCode::OK);
    assert!(hub.hub.sessions.is_empty());

    hub.shutdown.trigger();
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let (addr, hub) = common::spawn_server(common::test_config()).await;
    let client = reqwest::Client::new();

    let res = client.get(format!("http://{}/hub/status", addr)).send().await.unwrap();
    assert!(res.status().is_success());
    drop(res);
    drop(client);

    hub.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let fresh = reqwest::Client::builder()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    assert!(fresh.get(format!("http://{}/hub/status", addr)).send().await.is_err());
}
