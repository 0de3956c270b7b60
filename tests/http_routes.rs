mod support;

use agentd::agent::{AgentRegistry, MemoryKind};
use agentd::config::ServiceConfig;
use agentd::dispatch::RequestDispatcher;
use agentd::resolver::AgentResolver;
use agentd::server::{self, ServeHandle};
use serde_json::{json, Value};
use std::sync::Arc;
use support::{local_spec, text, tool_call, ScriptedModels};

async fn start() -> (ServeHandle, String) {
    let models = ScriptedModels::new(vec![
        tool_call("calculate", r#"{"expression":"2+2"}"#),
        text("2 + 2 = 4"),
    ]);
    let registry = Arc::new(AgentRegistry::new());
    registry
        .register_spec(
            local_spec("calculator")
                .tool("calculate")
                .memory(MemoryKind::None)
                .max_iterations(3),
            models.services(),
        )
        .unwrap();
    registry
        .register_spec(local_spec("default").max_iterations(3), models.services())
        .unwrap();
    let dispatcher = RequestDispatcher::new(registry, AgentResolver::new("default").unwrap());

    let handle = server::serve(&ServiceConfig::default(), dispatcher, "127.0.0.1:0")
        .await
        .unwrap();
    let base = format!("http://127.0.0.1:{}", handle.port);
    (handle, base)
}

fn event_types(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str::<Value>(data.trim()).unwrap())
        .map(|event| event["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

fn run_body() -> Value {
    json!({
        "threadId": "thread-1",
        "runId": "run-1",
        "messages": [{ "id": "m1", "role": "user", "content": "What is 2+2?" }]
    })
}

#[tokio::test]
async fn header_routed_run_streams_agui_events() {
    let (handle, base) = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/agui/run", base))
        .header("X-Agent-Id", "calculator")
        .json(&run_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(response.headers()["x-agent-id"], "calculator");

    let body = response.text().await.unwrap();
    let types = event_types(&body);
    assert_eq!(types.first().map(String::as_str), Some("RUN_STARTED"));
    assert_eq!(types.last().map(String::as_str), Some("RUN_FINISHED"));
    for expected in ["TOOL_CALL_START", "TOOL_CALL_ARGS", "TOOL_CALL_END", "TOOL_CALL_RESULT"] {
        assert!(types.iter().any(|t| t == expected), "missing {}", expected);
    }
    assert!(body.contains("2 + 2 = 4"));

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn path_signal_overrides_body_signal() {
    let (handle, base) = start().await;
    let mut body = run_body();
    body["forwardedProps"] = json!({ "agentId": "ghost" });

    let response = reqwest::Client::new()
        .post(format!("{}/agui/run/calculator", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-agent-id"], "calculator");

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn routing_errors_map_to_status_codes() {
    let (handle, base) = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/agui/run/ghost", base))
        .json(&run_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let error: Value = response.json().await.unwrap();
    assert!(error["error"].as_str().unwrap().contains("ghost"));

    let response = client
        .post(format!("{}/agui/run", base))
        .header("X-Agent-Id", "not valid!")
        .json(&run_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn lists_agents_and_reports_health() {
    let (handle, base) = start().await;
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let listing: Value = client
        .get(format!("{}/agui/agents", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["default"], "default");
    let ids: Vec<&str> = listing["agents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["calculator", "default"]);
    assert_eq!(listing["agents"][0]["instantiated"], false);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreadable_bodies_get_json_errors() {
    let (handle, base) = start().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/agui/run", base))
        .header("content-type", "application/json")
        .body("{\"messages\": [")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert!(error["error"].is_string());

    let response = client
        .post(format!("{}/agui/run/calculator", base))
        .body(run_body().to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 415);
    let error: Value = response.json().await.unwrap();
    assert!(error["error"].is_string());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn non_utf8_agent_header_is_rejected() {
    let (handle, base) = start().await;
    let mut body = run_body();
    body["forwardedProps"] = json!({ "agentId": "calculator" });

    let response = reqwest::Client::new()
        .post(format!("{}/agui/run", base))
        .header(
            "X-Agent-Id",
            reqwest::header::HeaderValue::from_bytes(b"calc\xffulator").unwrap(),
        )
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert!(error["error"].as_str().unwrap().contains("UTF-8"));

    handle.shutdown().await.unwrap();
}
