//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Liveness message |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/api/` (and `/api`) | Answer a question |
//!
//! # Error Contract
//!
//! `POST /api/` answers with `200` and a [`QaResponse`] whenever the body
//! parses, including when the model or the corpora fail. Only malformed
//! bodies are rejected:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `payload_too_large` (413, body over
//! `[server].max_body_bytes`).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the API can be called
//! from browser-based evaluation pages.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::completion::{create_provider, CompletionProvider};
use crate::config::Config;
use crate::models::{QaRequest, QaResponse};
use crate::relay::answer_question;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    provider: Arc<dyn CompletionProvider>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}

/// Starts the HTTP server and runs until the process is terminated.
///
/// `bind` overrides `[server].bind` when given. The completion provider is
/// created up front, so a missing API token fails here rather than on the
/// first question.
pub async fn run_server(config: &Config, bind: Option<String>) -> anyhow::Result<()> {
    let bind_addr = bind.unwrap_or_else(|| config.server.bind.clone());
    let provider: Arc<dyn CompletionProvider> = Arc::from(create_provider(&config.completion)?);

    tracing::info!(
        model = provider.model_name(),
        course = %config.context.course_path.display(),
        forum = %config.context.forum_path.display(),
        "completion provider ready"
    );

    let app = router(AppState::new(config.clone(), provider));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Virtual TA listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router with CORS and the request body limit applied.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.server.max_body_bytes;
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/", post(handle_answer))
        .route("/api", post(handle_answer))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
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

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn payload_too_large(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::PAYLOAD_TOO_LARGE,
        code: "payload_too_large".to_string(),
        message: message.into(),
    }
}

/// Maps a body rejection to the error contract, keeping 413 for oversize bodies.
fn classify_rejection(rejection: JsonRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        payload_too_large(rejection.body_text())
    } else {
        bad_request(rejection.body_text())
    }
}

// ============ GET / ============

#[derive(Serialize)]
struct RootResponse {
    message: String,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "TDS Virtual TA is running!".to_string(),
    })
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

// ============ POST /api/ ============

async fn handle_answer(
    State(state): State<AppState>,
    payload: Result<Json<QaRequest>, JsonRejection>,
) -> Result<Json<QaResponse>, AppError> {
    let Json(request) = payload.map_err(classify_rejection)?;

    tracing::info!(
        question_chars = request.question.chars().count(),
        has_image = request.image.as_deref().is_some_and(|s| !s.is_empty()),
        "answering question"
    );

    let response = answer_question(&state.config, state.provider.as_ref(), &request).await;
    Ok(Json(response))
}
