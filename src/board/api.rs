use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use serde::Deserialize;

use super::db::DbHandle;
#[cfg(test)]
use super::db::BoardDb;
use super::models::CardChanges;
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub db: DbHandle,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateBoardRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateColumnRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateCardRequest {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Clients send the target column as either `newColumnId` or `new_column_id`.
#[derive(Deserialize)]
pub struct MoveCardRequest {
    #[serde(alias = "newColumnId")]
    pub new_column_id: String,
}

// ── Error handling ────────────────────────────────────────────────────

/// One message for every failed move, so callers cannot tell which check failed.
const MOVE_REJECTED: &str = "Card or column not found, or invalid move";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Unprocessable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"detail": message}))).into_response()
    }
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::InvalidMove { .. } => ApiError::NotFound(MOVE_REJECTED.into()),
            e if e.is_not_found() => ApiError::NotFound(e.to_string()),
            BoardError::Validation(msg) => ApiError::Unprocessable(msg),
            e => {
                tracing::error!(error = %e, "Request failed");
                ApiError::Internal(e.to_string())
            }
        }
    }
}

/// Names and titles must be non-empty before they reach the store.
fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.is_empty() {
        return Err(BoardError::Validation(format!("{} must not be empty", field)).into());
    }
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/{id}", get(get_board).delete(delete_board))
        .route("/boards/{id}/columns", post(create_column))
        .route("/columns/{id}", delete(delete_column))
        .route("/columns/{id}/cards", post(create_card))
        .route(
            "/cards/{id}",
            get(get_card)
                .put(update_card)
                .patch(update_card)
                .delete(delete_card),
        )
        .route("/cards/{id}/move", patch(move_card))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({"message": "Taskboard API", "docs": "/docs"}))
}

async fn health_check() -> &'static str {
    "ok"
}

async fn list_boards(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let boards = state.db.call(move |db| db.list_boards()).await?;
    Ok(Json(boards))
}

async fn create_board(
    State(state): State<SharedState>,
    Json(req): Json<CreateBoardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_empty("name", &req.name)?;
    let name = req.name;
    let board = state.db.call(move |db| db.create_board(&name)).await?;
    Ok(Json(board))
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state.db.call(move |db| db.get_board_detail(&id)).await?;
    Ok(Json(detail))
}

async fn delete_board(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.call(move |db| db.delete_board(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_column(
    State(state): State<SharedState>,
    Path(board_id): Path<String>,
    Json(req): Json<CreateColumnRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_empty("name", &req.name)?;
    let name = req.name;
    let column = state
        .db
        .call(move |db| db.create_column(&board_id, &name))
        .await?;
    Ok(Json(column))
}

async fn delete_column(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.call(move |db| db.delete_column(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_card(
    State(state): State<SharedState>,
    Path(column_id): Path<String>,
    Json(req): Json<CreateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_non_empty("title", &req.title)?;
    let title = req.title;
    let description = req.description;
    let card = state
        .db
        .call(move |db| db.create_card(&column_id, &title, description.as_deref()))
        .await?;
    Ok(Json(card))
}

async fn get_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = id.clone();
    let card = state.db.call(move |db| db.get_card(&lookup)).await?;
    match card {
        Some(card) => Ok(Json(card)),
        None => Err(ApiError::NotFound(format!("Card {} not found", id))),
    }
}

async fn update_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(title) = &req.title {
        require_non_empty("title", title)?;
    }
    let changes = CardChanges {
        title: req.title,
        description: req.description,
    };
    let card = state
        .db
        .call(move |db| db.update_card(&id, &changes))
        .await?;
    Ok(Json(card))
}

async fn delete_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.call(move |db| db.delete_card(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn move_card(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(req): Json<MoveCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let target = req.new_column_id;
    let card = state
        .db
        .call(move |db| db.move_card(&id, &target))
        .await
        .map_err(|e| {
            if e.is_not_found() {
                tracing::debug!(error = %e, "Move card rejected");
                ApiError::NotFound(MOVE_REJECTED.into())
            } else {
                ApiError::from(e)
            }
        })?;
    Ok(Json(card))
}

// ── Tests ─────────────────────────────────────────────────────────────
