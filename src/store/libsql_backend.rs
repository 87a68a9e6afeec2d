//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Foreign keys are switched
//! on per connection so that deleting a todo cascades to its comments.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::Database;
use crate::todos::model::{Comment, LikeSet, Todo};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_db(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_db(db).await
    }

    async fn from_db(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        // Cascade deletes depend on this; SQLite defaults to OFF.
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to enable foreign keys: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::Serialization(format!("invalid uuid {s}: {e}")))
}

const TODO_COLUMNS: &str = "id, username, title, content, created_datetime, liked_by";
const COMMENT_COLUMNS: &str = "id, todo_id, username, content, created_datetime";

/// Map a libsql row (selected with `TODO_COLUMNS`) to a Todo.
fn row_to_todo(row: &libsql::Row) -> Result<Todo, DatabaseError> {
    let read = |i| -> Result<String, DatabaseError> {
        row.get::<String>(i)
            .map_err(|e| DatabaseError::Query(format!("todo column {i}: {e}")))
    };

    let liked_by_json = read(5)?;
    let liked_by: Vec<String> = serde_json::from_str(&liked_by_json)
        .map_err(|e| DatabaseError::Serialization(format!("liked_by: {e}")))?;

    Ok(Todo {
        id: parse_uuid(&read(0)?)?,
        username: read(1)?,
        title: read(2)?,
        content: read(3)?,
        created_datetime: parse_datetime(&read(4)?),
        liked_by: LikeSet::from_vec(liked_by),
    })
}

/// Map a libsql row (selected with `COMMENT_COLUMNS`) to a Comment.
fn row_to_comment(row: &libsql::Row) -> Result<Comment, DatabaseError> {
    let read = |i| -> Result<String, DatabaseError> {
        row.get::<String>(i)
            .map_err(|e| DatabaseError::Query(format!("comment column {i}: {e}")))
    };

    Ok(Comment {
        id: parse_uuid(&read(0)?)?,
        todo_id: parse_uuid(&read(1)?)?,
        username: read(2)?,
        content: read(3)?,
        created_datetime: parse_datetime(&read(4)?),
    })
}

fn liked_by_json(liked_by: &LikeSet) -> Result<String, DatabaseError> {
    serde_json::to_string(liked_by).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

// ── Database impl ───────────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Todos ───────────────────────────────────────────────────────

    async fn create_todo(&self, todo: &Todo) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO todos (id, username, title, content, created_datetime, liked_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                todo.id.to_string(),
                todo.username.as_str(),
                todo.title.as_str(),
                todo.content.as_str(),
                todo.created_datetime.to_rfc3339(),
                liked_by_json(&todo.liked_by)?,
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_todo: {e}")))?;
        debug!(id = %todo.id, "Todo created");
        Ok(())
    }

    async fn get_todo(&self, id: Uuid) -> Result<Option<Todo>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_todo: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_todo(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_todo row: {e}"))),
        }
    }

    async fn list_todos(&self) -> Result<Vec<Todo>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {TODO_COLUMNS} FROM todos ORDER BY created_datetime DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_todos: {e}")))?;

        let mut todos = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            todos.push(row_to_todo(&row)?);
        }
        Ok(todos)
    }

    async fn update_todo(&self, todo: &Todo) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "UPDATE todos SET username = ?1, title = ?2, content = ?3, liked_by = ?4 WHERE id = ?5",
                params![
                    todo.username.as_str(),
                    todo.title.as_str(),
                    todo.content.as_str(),
                    liked_by_json(&todo.liked_by)?,
                    todo.id.to_string(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_todo: {e}")))?;
        Ok(count > 0)
    }

    async fn update_liked_by(&self, id: Uuid, liked_by: &LikeSet) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "UPDATE todos SET liked_by = ?1 WHERE id = ?2",
                params![liked_by_json(liked_by)?, id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_liked_by: {e}")))?;
        debug!(id = %id, likes = liked_by.len(), "Like list updated");
        Ok(count > 0)
    }

    async fn delete_todo(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute("DELETE FROM todos WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_todo: {e}")))?;
        if count > 0 {
            debug!(id = %id, "Todo deleted");
        }
        Ok(count > 0)
    }

    // ── Comments ────────────────────────────────────────────────────

    async fn create_comment(&self, comment: &Comment) -> Result<(), DatabaseError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO comments (id, todo_id, username, content, created_datetime)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                comment.id.to_string(),
                comment.todo_id.to_string(),
                comment.username.as_str(),
                comment.content.as_str(),
                comment.created_datetime.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("create_comment: {e}")))?;
        debug!(id = %comment.id, todo_id = %comment.todo_id, "Comment created");
        Ok(())
    }

    async fn get_comment(
        &self,
        todo_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Comment>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1 AND todo_id = ?2"),
                params![comment_id.to_string(), todo_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_comment: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_comment(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_comment row: {e}"))),
        }
    }

    async fn list_comments(&self, todo_id: Uuid) -> Result<Vec<Comment>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {COMMENT_COLUMNS} FROM comments WHERE todo_id = ?1 ORDER BY created_datetime ASC"
                ),
                params![todo_id.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_comments: {e}")))?;

        let mut comments = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            comments.push(row_to_comment(&row)?);
        }
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute("DELETE FROM comments WHERE id = ?1", params![id.to_string()])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_comment: {e}")))?;
        if count > 0 {
            debug!(id = %id, "Comment deleted");
        }
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    // ── Todo CRUD ───────────────────────────────────────────────────

    #[tokio::test]
    async fn todo_create_and_get() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        let id = todo.id;
        db.create_todo(&todo).await.unwrap();

        let fetched = db.get_todo(id).await.unwrap().expect("todo should exist");
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.title, "T1");
        assert_eq!(fetched.content, "C1");
        assert!(fetched.liked_by.is_empty());
    }

    #[tokio::test]
    async fn todo_get_not_found() {
        let db = test_db().await;
        let result = db.get_todo(Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn todo_list_newest_first() {
        let db = test_db().await;
        let base = Utc::now() - chrono::Duration::minutes(10);

        for (i, title) in ["Oldest", "Middle", "Newest"].iter().enumerate() {
            let mut todo = Todo::new("u", *title, "c");
            todo.created_datetime = base + chrono::Duration::seconds(i as i64 * 60);
            db.create_todo(&todo).await.unwrap();
        }

        let todos = db.list_todos().await.unwrap();
        assert_eq!(todos.len(), 3);
        assert_eq!(todos[0].title, "Newest");
        assert_eq!(todos[1].title, "Middle");
        assert_eq!(todos[2].title, "Oldest");
    }

    #[tokio::test]
    async fn todo_update_fields() {
        let db = test_db().await;
        let mut todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        todo.title = "T2".into();
        todo.content = "C2".into();
        assert!(db.update_todo(&todo).await.unwrap());

        let fetched = db.get_todo(todo.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "T2");
        assert_eq!(fetched.content, "C2");
    }

    #[tokio::test]
    async fn todo_update_missing_returns_false() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        assert!(!db.update_todo(&todo).await.unwrap());
    }

    #[tokio::test]
    async fn todo_update_preserves_created_datetime() {
        let db = test_db().await;
        let mut todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();
        let created = db.get_todo(todo.id).await.unwrap().unwrap().created_datetime;

        todo.title = "T2".into();
        db.update_todo(&todo).await.unwrap();

        let fetched = db.get_todo(todo.id).await.unwrap().unwrap();
        assert_eq!(fetched.created_datetime, created);
    }

    #[tokio::test]
    async fn todo_delete() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        assert!(db.delete_todo(todo.id).await.unwrap());
        assert!(db.get_todo(todo.id).await.unwrap().is_none());
        assert!(!db.delete_todo(todo.id).await.unwrap());
    }

    // ── Likes ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn liked_by_roundtrips() {
        let db = test_db().await;
        let mut todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        todo.liked_by.toggle("bob");
        todo.liked_by.toggle("carol");
        assert!(db.update_liked_by(todo.id, &todo.liked_by).await.unwrap());

        let fetched = db.get_todo(todo.id).await.unwrap().unwrap();
        assert_eq!(fetched.liked_by.as_slice(), ["bob", "carol"]);
        assert_eq!(fetched.liked_by.len(), 2);
    }

    #[tokio::test]
    async fn update_liked_by_leaves_other_fields_alone() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        let mut likes = LikeSet::new();
        likes.toggle("bob");
        db.update_liked_by(todo.id, &likes).await.unwrap();

        let fetched = db.get_todo(todo.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "T1");
        assert_eq!(fetched.content, "C1");
        assert_eq!(fetched.username, "alice");
    }

    #[tokio::test]
    async fn update_liked_by_missing_todo_returns_false() {
        let db = test_db().await;
        let likes = LikeSet::new();
        assert!(!db.update_liked_by(Uuid::new_v4(), &likes).await.unwrap());
    }

    // ── Comments ────────────────────────────────────────────────────

    #[tokio::test]
    async fn comment_create_and_get() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        let comment = Comment::new(todo.id, "carol", "hi");
        db.create_comment(&comment).await.unwrap();

        let fetched = db
            .get_comment(todo.id, comment.id)
            .await
            .unwrap()
            .expect("comment should exist");
        assert_eq!(fetched.username, "carol");
        assert_eq!(fetched.content, "hi");
        assert_eq!(fetched.todo_id, todo.id);
    }

    #[tokio::test]
    async fn comment_lookup_scoped_to_todo() {
        let db = test_db().await;
        let t1 = Todo::new("alice", "T1", "C1");
        let t2 = Todo::new("bob", "T2", "C2");
        db.create_todo(&t1).await.unwrap();
        db.create_todo(&t2).await.unwrap();

        let comment = Comment::new(t1.id, "carol", "hi");
        db.create_comment(&comment).await.unwrap();

        // Same comment id under the wrong todo must not resolve.
        assert!(db.get_comment(t2.id, comment.id).await.unwrap().is_none());
        assert!(db.get_comment(t1.id, comment.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn comments_list_oldest_first() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        let base = Utc::now() - chrono::Duration::minutes(5);
        for (i, text) in ["first", "second", "third"].iter().enumerate() {
            let mut comment = Comment::new(todo.id, "carol", *text);
            comment.created_datetime = base + chrono::Duration::seconds(i as i64 * 30);
            db.create_comment(&comment).await.unwrap();
        }

        let comments = db.list_comments(todo.id).await.unwrap();
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].content, "first");
        assert_eq!(comments[2].content, "third");
    }

    #[tokio::test]
    async fn comment_delete() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();
        let comment = Comment::new(todo.id, "carol", "hi");
        db.create_comment(&comment).await.unwrap();

        assert!(db.delete_comment(comment.id).await.unwrap());
        assert!(db.get_comment(todo.id, comment.id).await.unwrap().is_none());
        assert!(!db.delete_comment(comment.id).await.unwrap());
    }

    #[tokio::test]
    async fn comment_requires_existing_todo() {
        let db = test_db().await;
        let comment = Comment::new(Uuid::new_v4(), "carol", "orphan");
        let result = db.create_comment(&comment).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn deleting_todo_cascades_to_comments() {
        let db = test_db().await;
        let todo = Todo::new("alice", "T1", "C1");
        db.create_todo(&todo).await.unwrap();

        let c1 = Comment::new(todo.id, "carol", "one");
        let c2 = Comment::new(todo.id, "dave", "two");
        db.create_comment(&c1).await.unwrap();
        db.create_comment(&c2).await.unwrap();

        db.delete_todo(todo.id).await.unwrap();

        assert!(db.get_comment(todo.id, c1.id).await.unwrap().is_none());
        assert!(db.get_comment(todo.id, c2.id).await.unwrap().is_none());
        assert!(db.list_comments(todo.id).await.unwrap().is_empty());
    }

    // ── On-disk database ────────────────────────────────────────────

    #[tokio::test]
    async fn local_file_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");

        let todo = Todo::new("alice", "T1", "C1");
        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.create_todo(&todo).await.unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        let fetched = db.get_todo(todo.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "T1");
    }

    #[tokio::test]
    async fn parse_datetime_accepts_sqlite_formats() {
        let rfc = Utc::now().to_rfc3339();
        assert!(parse_datetime(&rfc) > DateTime::<Utc>::MIN_UTC);
        assert!(parse_datetime("2026-01-15 08:30:00") > DateTime::<Utc>::MIN_UTC);
        assert!(parse_datetime("2026-01-15 08:30:00.123") > DateTime::<Utc>::MIN_UTC);
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
