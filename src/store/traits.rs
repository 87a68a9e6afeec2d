//! `Database` trait — single async interface for board persistence.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::todos::model::{Comment, LikeSet, Todo};

/// Backend-agnostic database trait covering todos and comments.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Todos ───────────────────────────────────────────────────────

    /// Insert a new todo.
    async fn create_todo(&self, todo: &Todo) -> Result<(), DatabaseError>;

    /// Get a todo by ID.
    async fn get_todo(&self, id: Uuid) -> Result<Option<Todo>, DatabaseError>;

    /// List all todos, newest first.
    async fn list_todos(&self) -> Result<Vec<Todo>, DatabaseError>;

    /// Update a todo's mutable fields. Returns false if the row is missing.
    /// `id` and `created_datetime` are never rewritten.
    async fn update_todo(&self, todo: &Todo) -> Result<bool, DatabaseError>;

    /// Overwrite only the like list of a todo. Returns false if the row is
    /// missing. This is the single write toggle-like performs.
    async fn update_liked_by(&self, id: Uuid, liked_by: &LikeSet) -> Result<bool, DatabaseError>;

    /// Delete a todo. Its comments go with it (cascade). Returns false if
    /// the row was already absent.
    async fn delete_todo(&self, id: Uuid) -> Result<bool, DatabaseError>;

    // ── Comments ────────────────────────────────────────────────────

    /// Insert a new comment.
    async fn create_comment(&self, comment: &Comment) -> Result<(), DatabaseError>;

    /// Get a comment by ID, but only if it belongs to the given todo.
    async fn get_comment(
        &self,
        todo_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Comment>, DatabaseError>;

    /// List a todo's comments, oldest first.
    async fn list_comments(&self, todo_id: Uuid) -> Result<Vec<Comment>, DatabaseError>;

    /// Delete a comment. Returns false if the row was already absent.
    async fn delete_comment(&self, id: Uuid) -> Result<bool, DatabaseError>;
}
