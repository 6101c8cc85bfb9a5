//! HTTP surface of the intake service.
//!
//! - `POST /graphs` registers a graph (201 / 400 / 500)
//! - `GET /graphs/{name}` returns the stored record
//! - `GET /health` reports whether the graph store answers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::intake::{IntakeError, IntakeHandler};
use crate::model::{GraphRecord, GraphStatus};

/// Build the router. The handler is the only shared state.
pub fn router(handler: IntakeHandler) -> Router {
    Router::new()
        .route("/graphs", post(create_graph))
        .route("/graphs/:name", get(get_graph))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Body of a successful registration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub graph_name: String,
    pub current_state: GraphStatus,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

impl IntakeError {
    /// Validation failures and duplicates are the caller's fault (400); a
    /// store or queue fault is ours (500).
    pub fn status_code(&self) -> StatusCode {
        match self {
            IntakeError::Invalid(_) | IntakeError::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            IntakeError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string())
    }
}

/// The body is read as raw bytes so that malformed JSON is reported with
/// the same 400 shape as any other validation failure.
async fn create_graph(
    State(handler): State<IntakeHandler>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedResponse>), IntakeError> {
    let registered = handler.handle_body(&body).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            graph_name: registered.record.release_name,
            current_state: registered.record.current_state,
        }),
    ))
}

async fn get_graph(
    State(handler): State<IntakeHandler>,
    Path(name): Path<String>,
) -> Result<Json<GraphRecord>, Response> {
    match handler.lookup(&name).await {
        Ok(Some(record)) => Ok(Json(record)),
        Ok(None) => Err(error_response(
            StatusCode::NOT_FOUND,
            format!("Graph {} not found", name.to_ascii_lowercase()),
        )),
        Err(e) => Err(e.into_response()),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check(State(handler): State<IntakeHandler>) -> (StatusCode, Json<HealthResponse>) {
    let version = env!("CARGO_PKG_VERSION");
    match handler.health().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                version,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unavailable",
                    version,
                }),
            )
        }
    }
}
