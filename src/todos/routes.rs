//! REST endpoints for the careers board.
//!
//! Handlers translate store results directly into status + JSON body pairs;
//! every error response has the shape `{"error": <message>}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::model::{
    AddCommentRequest, Comment, CreateTodoRequest, DeleteCommentQuery, MAX_USERNAME_LEN, Todo,
    TodoView, ToggleLikeRequest, UpdateTodoRequest,
};
use crate::error::DatabaseError;
use crate::store::Database;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
}

/// Build the Axum router with all board routes.
pub fn board_routes(db: Arc<dyn Database>) -> Router {
    let state = AppState { db };

    Router::new()
        .route("/health", get(health))
        .route("/careers/", get(list_todos).post(create_todo))
        .route(
            "/careers/{id}/",
            get(get_todo).put(put_todo).patch(patch_todo).delete(delete_todo),
        )
        .route("/careers/{id}/toggle_like/", post(toggle_like))
        .route("/careers/{id}/add_comment/", post(add_comment))
        .route("/careers/{id}/comments/{comment_id}/", delete(delete_comment))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({"error": message}))).into_response()
}

fn internal_error(e: DatabaseError) -> Response {
    error!(error = %e, "Database error");
    error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

fn parse_id(raw: &str, label: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw)
        .map_err(|_| error_body(StatusCode::BAD_REQUEST, &format!("Invalid {label} ID")))
}

/// Assemble the transport view of a todo with its embedded comments.
async fn view_for(db: &Arc<dyn Database>, todo: Todo) -> Result<TodoView, DatabaseError> {
    let comments = db.list_comments(todo.id).await?;
    Ok(TodoView::new(todo, comments))
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "careers-board"
    }))
}

// ── Standard CRUD ───────────────────────────────────────────────────────

async fn list_todos(State(state): State<AppState>) -> Response {
    let todos = match state.db.list_todos().await {
        Ok(todos) => todos,
        Err(e) => return internal_error(e),
    };

    let mut views = Vec::with_capacity(todos.len());
    for todo in todos {
        match view_for(&state.db, todo).await {
            Ok(view) => views.push(view),
            Err(e) => return internal_error(e),
        }
    }
    Json(views).into_response()
}

async fn create_todo(
    State(state): State<AppState>,
    Json(body): Json<CreateTodoRequest>,
) -> Response {
    if let Err(message) = body.validate() {
        return error_body(StatusCode::BAD_REQUEST, &message);
    }

    let todo = Todo::new(
        body.username.unwrap_or_default(),
        body.title.unwrap_or_default(),
        body.content.unwrap_or_default(),
    );
    if let Err(e) = state.db.create_todo(&todo).await {
        return internal_error(e);
    }
    info!(id = %todo.id, username = %todo.username, "Todo created");

    match view_for(&state.db, todo).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn get_todo(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id, "todo") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.get_todo(id).await {
        Ok(Some(todo)) => match view_for(&state.db, todo).await {
            Ok(view) => Json(view).into_response(),
            Err(e) => internal_error(e),
        },
        Ok(None) => error_body(StatusCode::NOT_FOUND, "Todo not found"),
        Err(e) => internal_error(e),
    }
}

async fn put_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTodoRequest>,
) -> Response {
    update_todo(state, &id, body, true).await
}

async fn patch_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTodoRequest>,
) -> Response {
    update_todo(state, &id, body, false).await
}

async fn update_todo(
    state: AppState,
    raw_id: &str,
    body: UpdateTodoRequest,
    full: bool,
) -> Response {
    let id = match parse_id(raw_id, "todo") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let validation = if full {
        body.validate_put()
    } else {
        body.validate_patch()
    };
    if let Err(message) = validation {
        return error_body(StatusCode::BAD_REQUEST, &message);
    }

    let mut todo = match state.db.get_todo(id).await {
        Ok(Some(todo)) => todo,
        Ok(None) => return error_body(StatusCode::NOT_FOUND, "Todo not found"),
        Err(e) => return internal_error(e),
    };

    body.apply_to(&mut todo);
    if let Err(e) = state.db.update_todo(&todo).await {
        return internal_error(e);
    }

    match view_for(&state.db, todo).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn delete_todo(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id, "todo") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.delete_todo(id).await {
        Ok(true) => {
            info!(id = %id, "Todo deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => error_body(StatusCode::NOT_FOUND, "Todo not found"),
        Err(e) => internal_error(e),
    }
}

// ── Custom actions ──────────────────────────────────────────────────────

async fn toggle_like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ToggleLikeRequest>,
) -> Response {
    let id = match parse_id(&id, "todo") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut todo = match state.db.get_todo(id).await {
        Ok(Some(todo)) => todo,
        Ok(None) => return error_body(StatusCode::NOT_FOUND, "Todo not found"),
        Err(e) => return internal_error(e),
    };

    let username = body.username.as_deref().unwrap_or("");
    if username.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "Username required");
    }

    // Read-modify-write: no coordination with concurrent toggles on the
    // same todo. The single-column UPDATE below is the only write.
    let liked = todo.liked_by.toggle(username);
    if let Err(e) = state.db.update_liked_by(id, &todo.liked_by).await {
        return internal_error(e);
    }
    info!(id = %id, username = %username, liked, "Like toggled");

    match view_for(&state.db, todo).await {
        Ok(view) => Json(view).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<AddCommentRequest>,
) -> Response {
    let id = match parse_id(&id, "todo") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let todo = match state.db.get_todo(id).await {
        Ok(Some(todo)) => todo,
        Ok(None) => return error_body(StatusCode::NOT_FOUND, "Todo not found"),
        Err(e) => return internal_error(e),
    };

    let username = body.username.as_deref().unwrap_or("");
    let content = body.content.as_deref().unwrap_or("");
    if username.is_empty() || content.is_empty() {
        return error_body(StatusCode::BAD_REQUEST, "username and content required");
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return error_body(
            StatusCode::BAD_REQUEST,
            &format!("username must be at most {MAX_USERNAME_LEN} characters"),
        );
    }

    let comment = Comment::new(todo.id, username, content);
    if let Err(e) = state.db.create_comment(&comment).await {
        return internal_error(e);
    }
    info!(id = %comment.id, todo_id = %todo.id, username = %username, "Comment added");

    (StatusCode::CREATED, Json(comment)).into_response()
}

async fn delete_comment(
    State(state): State<AppState>,
    Path((id, comment_id)): Path<(String, String)>,
    Query(query): Query<DeleteCommentQuery>,
) -> Response {
    let todo_id = match parse_id(&id, "todo") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let comment_id = match parse_id(&comment_id, "comment") {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    // A missing todo and a comment under a different todo both land here;
    // the coarser "Comment not found" answer is intentional.
    let comment = match state.db.get_comment(todo_id, comment_id).await {
        Ok(Some(comment)) => comment,
        Ok(None) => return error_body(StatusCode::NOT_FOUND, "Comment not found"),
        Err(e) => return internal_error(e),
    };

    // Author check is a plain string comparison; there is no auth layer.
    let username = query.username.as_deref().unwrap_or("");
    if comment.username != username {
        warn!(comment_id = %comment_id, supplied = %username, "Comment delete refused");
        return error_body(StatusCode::FORBIDDEN, "Not allowed");
    }

    match state.db.delete_comment(comment_id).await {
        Ok(true) => {
            info!(id = %comment_id, todo_id = %todo_id, "Comment deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => error_body(StatusCode::NOT_FOUND, "Comment not found"),
        Err(e) => internal_error(e),
    }
}
