//! Board data model — todos, comments, likes, and request/response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of an author username.
pub const MAX_USERNAME_LEN: usize = 100;
/// Maximum length of a todo title.
pub const MAX_TITLE_LEN: usize = 200;

/// An ordered set of usernames backing the like list.
///
/// Preserves insertion order; membership is exact string equality, so
/// case-variant usernames count as distinct likers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LikeSet(Vec<String>);

impl LikeSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_vec(usernames: Vec<String>) -> Self {
        Self(usernames)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.0.iter().any(|u| u == username)
    }

    /// Flip membership: remove the first occurrence if present, append
    /// otherwise. Returns `true` if the username was added.
    pub fn toggle(&mut self, username: &str) -> bool {
        if let Some(pos) = self.0.iter().position(|u| u == username) {
            self.0.remove(pos);
            false
        } else {
            self.0.push(username.to_string());
            true
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// A user-authored post on the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Todo {
    /// Unique ID, assigned at creation.
    pub id: Uuid,
    /// Author.
    pub username: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// When the todo was created. Never updated.
    pub created_datetime: DateTime<Utc>,
    /// Usernames that currently like this todo, in like order.
    pub liked_by: LikeSet,
}

impl Todo {
    pub fn new(
        username: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            title: title.into(),
            content: content.into(),
            created_datetime: Utc::now(),
            liked_by: LikeSet::new(),
        }
    }
}

/// A user-authored reply attached to exactly one todo.
///
/// Immutable after creation except for deletion. Serializes the parent
/// reference under the key `todo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    #[serde(rename = "todo")]
    pub todo_id: Uuid,
    pub username: String,
    pub content: String,
    pub created_datetime: DateTime<Utc>,
}

impl Comment {
    pub fn new(todo_id: Uuid, username: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            todo_id,
            username: username.into(),
            content: content.into(),
            created_datetime: Utc::now(),
        }
    }
}

// ── Presentation ────────────────────────────────────────────────────────

/// Transport representation of a todo: every stored field plus the derived
/// `likes_count` and the embedded comments (oldest first).
#[derive(Debug, Clone, Serialize)]
pub struct TodoView {
    pub id: Uuid,
    pub username: String,
    pub title: String,
    pub content: String,
    pub created_datetime: DateTime<Utc>,
    pub liked_by: LikeSet,
    pub likes_count: usize,
    pub comments: Vec<Comment>,
}

impl TodoView {
    pub fn new(todo: Todo, comments: Vec<Comment>) -> Self {
        Self {
            id: todo.id,
            username: todo.username,
            title: todo.title,
            content: todo.content,
            created_datetime: todo.created_datetime,
            likes_count: todo.liked_by.len(),
            liked_by: todo.liked_by,
            comments,
        }
    }
}

// ── Request bodies ──────────────────────────────────────────────────────

/// Check one required text field against its length bound.
///
/// Pushes a problem description onto `errors` if the field is missing,
/// empty, or over `max_len` (no bound when `max_len` is `None`).
fn check_field(errors: &mut Vec<String>, name: &str, value: Option<&str>, max_len: Option<usize>) {
    match value {
        None => errors.push(format!("{name} is required")),
        Some(v) if v.is_empty() => errors.push(format!("{name} must not be empty")),
        Some(v) => {
            if let Some(max) = max_len {
                if v.chars().count() > max {
                    errors.push(format!("{name} must be at most {max} characters"));
                }
            }
        }
    }
}

fn join_errors(errors: Vec<String>) -> Result<(), String> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join(", "))
    }
}

/// Body for `POST /careers/`.
///
/// Fields are optional at the serde level so that missing ones surface as
/// a structured validation error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct CreateTodoRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

impl CreateTodoRequest {
    /// Validate presence and length constraints, listing every offending
    /// field in the error message.
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        check_field(
            &mut errors,
            "username",
            self.username.as_deref(),
            Some(MAX_USERNAME_LEN),
        );
        check_field(&mut errors, "title", self.title.as_deref(), Some(MAX_TITLE_LEN));
        check_field(&mut errors, "content", self.content.as_deref(), None);
        join_errors(errors)
    }
}

/// Body for `PUT` / `PATCH /careers/{id}/`.
#[derive(Debug, Deserialize)]
pub struct UpdateTodoRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub liked_by: Option<Vec<String>>,
}

impl UpdateTodoRequest {
    /// Full-update validation: username, title, and content are required.
    pub fn validate_put(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        check_field(
            &mut errors,
            "username",
            self.username.as_deref(),
            Some(MAX_USERNAME_LEN),
        );
        check_field(&mut errors, "title", self.title.as_deref(), Some(MAX_TITLE_LEN));
        check_field(&mut errors, "content", self.content.as_deref(), None);
        join_errors(errors)
    }

    /// Partial-update validation: only provided fields are checked.
    pub fn validate_patch(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        if self.username.is_some() {
            check_field(
                &mut errors,
                "username",
                self.username.as_deref(),
                Some(MAX_USERNAME_LEN),
            );
        }
        if self.title.is_some() {
            check_field(&mut errors, "title", self.title.as_deref(), Some(MAX_TITLE_LEN));
        }
        if self.content.is_some() {
            check_field(&mut errors, "content", self.content.as_deref(), None);
        }
        join_errors(errors)
    }

    /// Apply the provided fields onto an existing todo.
    pub fn apply_to(&self, todo: &mut Todo) {
        if let Some(username) = &self.username {
            todo.username = username.clone();
        }
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(content) = &self.content {
            todo.content = content.clone();
        }
        if let Some(liked_by) = &self.liked_by {
            todo.liked_by = LikeSet::from_vec(liked_by.clone());
        }
    }
}

/// Body for `POST /careers/{id}/toggle_like/`.
#[derive(Debug, Deserialize)]
pub struct ToggleLikeRequest {
    #[serde(default)]
    pub username: Option<String>,
}

/// Body for `POST /careers/{id}/add_comment/`.
#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Query parameters for `DELETE /careers/{id}/comments/{comment_id}/`.
#[derive(Debug, Deserialize)]
pub struct DeleteCommentQuery {
    #[serde(default)]
    pub username: Option<String>,
}
