//! HTTP server
//!
//! AG-UI endpoints over axum. Run requests are answered with a server-sent
//! event stream; routing failures are answered with a JSON error before any
//! event is sent.

pub mod agui;

use crate::agent::EntryState;
use crate::config::ServiceConfig;
use crate::dispatch::{DispatchRequest, RequestDispatcher};
use crate::error::ApiError;
use crate::resolver::AgentSignals;
use agui::{AgUiEvent, RunAgentInput};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    dispatcher: RequestDispatcher,
    agent_header: HeaderName,
}

impl AppState {
    pub fn new(dispatcher: RequestDispatcher, agent_header: &str) -> Result<Self, ApiError> {
        let agent_header = HeaderName::from_bytes(agent_header.trim().as_bytes()).map_err(|e| {
            ApiError::ConfigError(format!("Invalid agent header '{}': {}", agent_header, e))
        })?;
        Ok(Self {
            dispatcher,
            agent_header,
        })
    }
}

/// Error answered with a `{"error": ...}` JSON body
pub enum HttpError {
    Api(ApiError),
    /// Request body could not be read as `RunAgentInput`
    Body(JsonRejection),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Api(ApiError::UnknownAgent(_)) => StatusCode::NOT_FOUND,
            HttpError::Api(ApiError::InvalidAgentId { .. }) => StatusCode::BAD_REQUEST,
            HttpError::Api(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            HttpError::Api(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HttpError::Body(rejection) => rejection.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            HttpError::Api(e) => e.to_string(),
            HttpError::Body(rejection) => rejection.body_text(),
        }
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        HttpError::Api(err)
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::Body(rejection)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Build the router with run, agent-listing, and health routes.
pub fn router(state: AppState, base_path: &str) -> Router {
    Router::new()
        .route(&format!("{}/run", base_path), post(run_default))
        .route(&format!("{}/run/{{agent_id}}", base_path), post(run_with_path))
        .route(&format!("{}/agents", base_path), get(list_agents))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

async fn run_default(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<RunAgentInput>, JsonRejection>,
) -> Result<Response, HttpError> {
    let Json(body) = body?;
    run(&state, None, &headers, body)
}

async fn run_with_path(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<RunAgentInput>, JsonRejection>,
) -> Result<Response, HttpError> {
    let Json(body) = body?;
    run(&state, Some(agent_id), &headers, body)
}

fn run(
    state: &AppState,
    path: Option<String>,
    headers: &HeaderMap,
    body: RunAgentInput,
) -> Result<Response, HttpError> {
    let header = match headers.get(&state.agent_header) {
        None => None,
        Some(value) => Some(value.to_str().map(str::to_string).map_err(|_| {
            ApiError::invalid_id(
                &String::from_utf8_lossy(value.as_bytes()),
                format!("{} header is not valid UTF-8", state.agent_header),
            )
        })?),
    };
    let signals = AgentSignals {
        path,
        header,
        body: body.agent_id_signal(),
    };
    let request = DispatchRequest {
        signals,
        input: body.into_run_input(),
    };
    let (agent_id, events) = state.dispatcher.dispatch_stream(request)?;

    let stream = events.map(|item| {
        let event = match item {
            Ok(event) => AgUiEvent::from(event),
            Err(e) => {
                warn!(error = %e, "Run failed mid-stream");
                AgUiEvent::RunError {
                    message: e.to_string(),
                    code: error_code(&e).to_string(),
                }
            }
        };
        Event::default().json_data(event)
    });

    let mut response = Sse::new(stream).into_response();
    if let Ok(value) = HeaderValue::from_str(&agent_id) {
        response.headers_mut().insert(state.agent_header.clone(), value);
    }
    Ok(response)
}

fn error_code(err: &ApiError) -> &'static str {
    match err {
        ApiError::Execution { .. } => "agent_execution",
        ApiError::ProviderRateLimit(_) => "rate_limited",
        ApiError::ProviderRequestFailed(_) => "provider_unavailable",
        _ => "internal",
    }
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let registry = state.dispatcher.registry();
    let agents: Vec<_> = registry
        .list_ids()
        .into_iter()
        .map(|id| {
            let instantiated = registry.state(&id) == EntryState::Instantiated;
            json!({ "id": id, "instantiated": instantiated })
        })
        .collect();
    Json(json!({
        "default": state.dispatcher.resolver().default_id(),
        "agents": agents,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Handle returned by [`serve`]: the bound port and a shutdown trigger.
pub struct ServeHandle {
    pub port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<tokio::task::JoinHandle<Result<(), std::io::Error>>>,
}

impl ServeHandle {
    /// Trigger graceful shutdown and wait for the server to stop.
    pub async fn shutdown(mut self) -> Result<(), ApiError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.wait().await
    }

    /// Wait for the server task to exit.
    pub async fn wait(mut self) -> Result<(), ApiError> {
        if let Some(join) = self.join.take() {
            join.await
                .map_err(|e| ApiError::Server(format!("server task failed: {}", e)))??;
        }
        Ok(())
    }

    /// Take the shutdown trigger, e.g. to wire it to a signal handler.
    pub fn shutdown_trigger(&mut self) -> Option<oneshot::Sender<()>> {
        self.shutdown_tx.take()
    }
}

/// Bind `bind` and serve `dispatcher` in a spawned task.
pub async fn serve(
    config: &ServiceConfig,
    dispatcher: RequestDispatcher,
    bind: &str,
) -> Result<ServeHandle, ApiError> {
    let base_path = config.base_path();
    let state = AppState::new(dispatcher, &config.server.agent_header)?;
    let app = router(state, &base_path);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    let port = listener.local_addr()?.port();
    info!(bind = %bind, port, base_path = %base_path, "Server listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Received shutdown signal");
            })
            .await
    });

    Ok(ServeHandle {
        port,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}
