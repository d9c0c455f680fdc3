//! HTTP servers.
//!
//! Two routers share one error contract and CORS policy: the ticket API
//! (ingestion, retrieval, augmentation, news) and the agent API.
//!
//! # Ticket API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/ingest_json_ticket` | Ingest one ticket, returns a message string |
//! | `POST` | `/api/ingest_json_file` | Multipart upload (`file`) of a JSON array of tickets, up to 32 MiB |
//! | `POST` | `/api/get_similar_tickets` | Tickets similar to the posted one |
//! | `POST` | `/api/augment_ticket_information` | `{summary, contacts}` for the posted ticket |
//! | `POST` | `/api/summarize_news` | Summary and key points of `{title, content}` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Agent API
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/solve_ticket` | `{ticket}` → `{solution}` |
//! | `GET`  | `/health` | Health check |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "ticket id must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (500), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser front-ends
//! can call both servers directly.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::agent::ResolutionAgent;
use crate::config::Config;
use crate::error::{AgentError, NewsError};
use crate::ingest::{ingest_batch, ingest_one, BatchReport};
use crate::models::{AugmentationResult, Ticket};
use crate::news::{NewsInput, NewsSummary};
use crate::services::{agent_from_config, Services};

/// Request body limit for ticket file uploads.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// State shared by the ticket API handlers.
#[derive(Clone)]
pub struct ApiState {
    services: Services,
}

impl ApiState {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

/// State shared by the agent API handlers.
#[derive(Clone)]
pub struct AgentState {
    agent: Arc<ResolutionAgent>,
}

impl AgentState {
    pub fn new(agent: ResolutionAgent) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router for the ticket API.
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/ingest_json_ticket", post(handle_ingest_ticket))
        .route(
            "/api/ingest_json_file",
            post(handle_ingest_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/get_similar_tickets", post(handle_similar))
        .route("/api/augment_ticket_information", post(handle_augment))
        .route("/api/summarize_news", post(handle_summarize_news))
        .route("/health", get(handle_health))
        .layer(cors())
        .with_state(state)
}

/// Router for the agent API.
pub fn agent_router(state: AgentState) -> Router {
    Router::new()
        .route("/solve_ticket", post(handle_solve))
        .route("/health", get(handle_health))
        .layer(cors())
        .with_state(state)
}

/// Start the ticket API on `[server].bind`. Runs until the process ends.
pub async fn run_api_server(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config)?;
    serve(&config.server.bind, api_router(ApiState::new(services)), "ticket API").await
}

/// Start the agent API on `[agent].bind`. Runs until the process ends.
pub async fn run_agent_server(config: &Config) -> anyhow::Result<()> {
    let agent = agent_from_config(config)?;
    serve(&config.agent.bind, agent_router(AgentState::new(agent)), "agent API").await
}

async fn serve(bind_addr: &str, app: Router, label: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "{} listening", label);
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "upstream_error",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

/// Unwrap a JSON body, turning extractor rejections into 400s.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    Ok(body?.0)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Ticket API ============

/// `POST /api/ingest_json_ticket`. Success and ingestion errors are both
/// returned as a JSON string; only unreadable tickets get an error envelope.
async fn handle_ingest_ticket(
    State(state): State<ApiState>,
    body: Result<Json<Ticket>, JsonRejection>,
) -> Result<Json<String>, AppError> {
    let ticket = json_body(body)?;
    ticket.validate().map_err(|e| bad_request(e.to_string()))?;

    let message = match ingest_one(&state.services.repository, &ticket).await {
        Ok(msg) | Err(msg) => msg,
    };
    Ok(Json(message))
}

#[derive(Serialize)]
struct IngestFileResponse {
    message: String,
    #[serde(flatten)]
    report: BatchReport,
}

/// `POST /api/ingest_json_file`. The upload is staged to a temporary file
/// that is removed once the batch has run.
async fn handle_ingest_file(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<IngestFileResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload.json").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
            upload = Some((filename, bytes));
            break;
        }
    }
    let (filename, bytes) = upload.ok_or_else(|| bad_request("missing multipart field 'file'"))?;

    let staged = std::env::temp_dir().join(format!("tkt-upload-{}.json", uuid::Uuid::new_v4()));
    tokio::fs::write(&staged, &bytes)
        .await
        .map_err(|e| internal(format!("failed to stage upload: {}", e)))?;

    let report = ingest_batch(&state.services.repository, &staged).await;

    if let Err(e) = tokio::fs::remove_file(&staged).await {
        warn!(path = %staged.display(), error = %e, "failed to remove staged upload");
    }

    let message = if report.loaded == 0 {
        format!("No tickets were loaded from {}.", filename)
    } else {
        format!(
            "Processed {}: {} of {} tickets ingested.",
            filename, report.ingested, report.loaded
        )
    };
    Ok(Json(IngestFileResponse { message, report }))
}

async fn handle_similar(
    State(state): State<ApiState>,
    body: Result<Json<Ticket>, JsonRejection>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let ticket = json_body(body)?;
    Ok(Json(state.services.retrieval.retrieve_relevant(&ticket).await))
}

async fn handle_augment(
    State(state): State<ApiState>,
    body: Result<Json<Ticket>, JsonRejection>,
) -> Result<Json<AugmentationResult>, AppError> {
    let ticket = json_body(body)?;
    Ok(Json(state.services.augment.augment(&ticket).await))
}

async fn handle_summarize_news(
    State(state): State<ApiState>,
    body: Result<Json<NewsInput>, JsonRejection>,
) -> Result<Json<NewsSummary>, AppError> {
    let input = json_body(body)?;
    match state.services.news.summarize(&input).await {
        Ok(summary) => Ok(Json(summary)),
        Err(NewsError::Invalid(e)) => Err(bad_request(e.to_string())),
        Err(e @ NewsError::Upstream(_)) => {
            warn!(error = %e, "news summarization failed");
            Err(upstream_error(e.to_string()))
        }
    }
}

// ============ Agent API ============

#[derive(Deserialize)]
struct SolveRequest {
    ticket: Ticket,
}

#[derive(Serialize)]
struct SolveResponse {
    solution: String,
}

async fn handle_solve(
    State(state): State<AgentState>,
    body: Result<Json<SolveRequest>, JsonRejection>,
) -> Result<Json<SolveResponse>, AppError> {
    let request = json_body(body)?;
    match state.agent.solve(&request.ticket).await {
        Ok(solution) => Ok(Json(SolveResponse { solution })),
        Err(e @ AgentError::EmptyDescription) => Err(bad_request(e.to_string())),
        Err(e) => Err(internal(e.to_string())),
    }
}
