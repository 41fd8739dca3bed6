//! Conductor HTTP API
//!
//! 启动: cargo run --bin conductor-web --features web
//! - GET  /health
//! - POST /workflow          {"request": "..."}：运行一次编排，返回汇总
//! - POST /workflow/stream   {"request": "..."}：NDJSON 流，逐行输出 RunEvent
//! - POST /workers/:worker   {"message": "..."}：直接调用单个 Worker

#![cfg(feature = "web")]

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use conductor::config::{load_config, AppConfig};
use conductor::core::{Orchestrator, RunEvent, RunSupervisor, TaskRecord};
use conductor::runtime::build_orchestrator;
use conductor::workers::{WorkerId, WorkerResult};
use conductor::{RunConfig, RunStatus};

struct AppState {
    config: AppConfig,
    orchestrator: Orchestrator,
    supervisor: RunSupervisor,
}

#[derive(Debug, Deserialize)]
struct WorkflowRequest {
    request: String,
}

#[derive(Debug, Serialize)]
struct WorkflowResponse {
    status: RunStatus,
    request: String,
    tasks_completed: Vec<TaskRecord>,
    final_error: Option<String>,
    execution_id: Uuid,
    timestamp: String,
    steps: usize,
}

#[derive(Debug, Deserialize)]
struct WorkerRequest {
    message: String,
}

#[derive(Debug, Serialize)]
struct WorkerResponse {
    status: &'static str,
    worker: WorkerId,
    message: String,
    response: String,
    timestamp: String,
}

type ApiError = (StatusCode, String);

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.app.name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

fn require_text(text: &str, field: &str) -> Result<String, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, format!("{field} is required")));
    }
    Ok(text.to_string())
}

/// POST /workflow：运行至终止后返回汇总
async fn api_workflow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WorkflowRequest>,
) -> Result<Json<WorkflowResponse>, ApiError> {
    let request = require_text(&req.request, "request")?;
    let result = state
        .orchestrator
        .run_with_cancel(&request, state.supervisor.child_token())
        .await;
    Ok(Json(WorkflowResponse {
        status: result.status,
        request,
        tasks_completed: result.completed_tasks,
        final_error: result.final_error,
        execution_id: result.run_id,
        timestamp: Utc::now().to_rfc3339(),
        steps: result.steps,
    }))
}

/// POST /workflow/stream：NDJSON 流，每行一个 RunEvent
async fn api_workflow_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WorkflowRequest>,
) -> Result<Response, ApiError> {
    let request = require_text(&req.request, "request")?;
    let (event_tx, event_rx) = mpsc::unbounded_channel::<RunEvent>();

    let run_state = Arc::clone(&state);
    tokio::spawn(async move {
        run_state
            .orchestrator
            .run_with_events(&request, run_state.supervisor.child_token(), Some(event_tx))
            .await;
    });

    type BoxErr = Box<dyn std::error::Error + Send + Sync>;
    let stream = stream::unfold(event_rx, |mut rx| async move {
        let ev = rx.recv().await?;
        let line = match serde_json::to_string(&ev) {
            Ok(json) => format!("{json}\n"),
            Err(e) => format!("{{\"type\":\"error\",\"text\":\"{e}\"}}\n"),
        };
        Some((Ok::<String, BoxErr>(line), rx))
    });
    let mut res = Response::new(Body::from_stream(stream));
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/x-ndjson; charset=utf-8"),
    );
    Ok(res)
}

/// POST /workers/:worker：直接调用单个 Worker（标识按 Planner 规则归一化）
async fn api_worker(
    State(state): State<Arc<AppState>>,
    Path(worker): Path<String>,
    Json(req): Json<WorkerRequest>,
) -> Result<Json<WorkerResponse>, ApiError> {
    let id: WorkerId = worker
        .parse()
        .map_err(|e: conductor::workers::UnknownWorker| (StatusCode::NOT_FOUND, e.to_string()))?;
    let message = require_text(&req.message, "message")?;

    let result = state.orchestrator.executor().execute(id, &message, &[]).await;
    let status = match result {
        WorkerResult::Success { .. } => "success",
        WorkerResult::Failure { .. } => "error",
    };
    Ok(Json(WorkerResponse {
        status,
        worker: id,
        response: result.signal_text().to_string(),
        message,
        timestamp: Utc::now().to_rfc3339(),
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    conductor::observability::init();

    let config = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("config load failed ({e}), using defaults");
        AppConfig::default()
    });
    let orchestrator = build_orchestrator(&config, RunConfig::from(&config.orchestrator))?;
    let supervisor = RunSupervisor::new();
    supervisor.cancel_on_ctrl_c();
    let shutdown = supervisor.cancel_token();

    let addr = std::env::var("CONDUCTOR_WEB_ADDR").unwrap_or_else(|_| config.app.bind_addr.clone());
    let state = Arc::new(AppState {
        config,
        orchestrator,
        supervisor,
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/workflow", post(api_workflow))
        .route("/workflow/stream", post(api_workflow_stream))
        .route("/workers/:worker", post(api_worker))
        .with_state(Arc::clone(&state));

    tracing::info!("Conductor API: http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
