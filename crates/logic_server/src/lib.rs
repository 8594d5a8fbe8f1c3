//! Development backend hosting the todo logic over HTTP.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    domain::TodoRecord,
    error::{ApiError, ApiException, ErrorCode},
    protocol::{InteractionReceipt, SubmitRoutineRequest, SubmitRoutineResponse},
};
use tokio::sync::Mutex;
use tracing::warn;

pub mod config;
pub mod logic;

use logic::TodoLogic;

pub struct AppState {
    logic_id: String,
    logic: Mutex<TodoLogic>,
}

impl AppState {
    pub fn new(logic_id: impl Into<String>, logic: TodoLogic) -> Arc<Self> {
        Arc::new(Self {
            logic_id: logic_id.into(),
            logic: Mutex::new(logic),
        })
    }

    fn check_logic(&self, logic_id: &str) -> Result<(), ApiException> {
        if logic_id != self.logic_id {
            return Err(ApiException::not_found(format!("unknown logic {logic_id}")));
        }
        Ok(())
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn reject(error: ApiException) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::FuelExhausted => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(code = ?error.code, message = %error.message, "request rejected");
    (status, Json(error.into()))
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/logics/:logic_id/state/todos", get(read_todos))
        .route("/logics/:logic_id/routines", post(submit_routine))
        .route("/interactions/:ix_hash/receipt", get(fetch_receipt))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn read_todos(
    State(state): State<Arc<AppState>>,
    Path(logic_id): Path<String>,
) -> ApiResult<Vec<TodoRecord>> {
    state.check_logic(&logic_id).map_err(reject)?;
    let todos = state.logic.lock().await.todos(Instant::now());
    Ok(Json(todos))
}

async fn submit_routine(
    State(state): State<Arc<AppState>>,
    Path(logic_id): Path<String>,
    Json(req): Json<SubmitRoutineRequest>,
) -> ApiResult<SubmitRoutineResponse> {
    state.check_logic(&logic_id).map_err(reject)?;
    let ix_hash = state
        .logic
        .lock()
        .await
        .submit(req.call, req.fuel, Instant::now())
        .map_err(reject)?;
    Ok(Json(SubmitRoutineResponse { ix_hash }))
}

async fn fetch_receipt(
    State(state): State<Arc<AppState>>,
    Path(ix_hash): Path<String>,
) -> ApiResult<InteractionReceipt> {
    let receipt = state
        .logic
        .lock()
        .await
        .receipt(&ix_hash, Instant::now())
        .map_err(reject)?;
    Ok(Json(receipt))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
