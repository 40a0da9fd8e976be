// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::params;
use std::sync::Arc;

use crate::db::models::Post;
use crate::error::AppError;
use crate::posts::domain::{Category, PostFields};
use crate::state::DbPool;

/// Repository trait - all post persistence operations
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post and bump the creator's post count in one transaction.
    async fn create(
        &self,
        fields: &PostFields,
        avatar: &str,
        creator: &str,
    ) -> Result<Post, AppError>;

    /// All posts, most recently updated first.
    async fn list(&self) -> Result<Vec<Post>, AppError>;

    /// Single post by id.
    async fn get(&self, id: &str) -> Result<Post, AppError>;

    /// Posts in one category, most recently created first.
    async fn list_by_category(&self, category: Category) -> Result<Vec<Post>, AppError>;

    /// Posts by one creator, most recently created first.
    async fn list_by_creator(&self, creator: &str) -> Result<Vec<Post>, AppError>;

    /// Update text fields and optionally the avatar filename.
    async fn update(
        &self,
        id: &str,
        fields: &PostFields,
        avatar: Option<&str>,
    ) -> Result<Post, AppError>;

    /// Delete a post and drop the creator's post count in one transaction.
    async fn delete(&self, id: &str, creator: &str) -> Result<(), AppError>;
}

/// SQLite implementation
pub struct SqlitePostRepository {
    pool: DbPool,
}

impl SqlitePostRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str =
    "id, title, category, description, story, avatar, creator, created_at, updated_at";

fn row_to_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    let category: String = row.get(2)?;
    let category = category.parse::<Category>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        category,
        description: row.get(3)?,
        story: row.get(4)?,
        avatar: row.get(5)?,
        creator: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// RFC 3339 with microseconds so lexicographic order matches time order.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl PostRepository for SqlitePostRepository {
    async fn create(
        &self,
        fields: &PostFields,
        avatar: &str,
        creator: &str,
    ) -> Result<Post, AppError> {
        let conn = self.pool.get()?;

        let id = uuid::Uuid::now_v7().to_string();
        let ts = now();

        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<(), AppError> = (|| {
            conn.execute(
                "INSERT INTO posts (id, title, category, description, story, avatar, creator, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    id,
                    fields.title,
                    fields.category.as_str(),
                    fields.description,
                    fields.story,
                    avatar,
                    creator,
                    ts
                ],
            )?;

            // Counter moves with the insert or not at all
            conn.execute(
                "UPDATE users SET posts = posts + 1 WHERE id = ?1",
                params![creator],
            )?;

            Ok(())
        })();

        match result {
            Ok(()) => conn.execute("COMMIT", [])?,
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                return Err(e);
            }
        };

        conn.query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            params![id],
            row_to_post,
        )
        .map_err(AppError::from)
    }

    async fn list(&self) -> Result<Vec<Post>, AppError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts ORDER BY updated_at DESC",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map([], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn get(&self, id: &str) -> Result<Post, AppError> {
        let conn = self.pool.get()?;
        conn.query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            params![id],
            row_to_post,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
            other => other.into(),
        })
    }

    async fn list_by_category(&self, category: Category) -> Result<Vec<Post>, AppError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE category = ?1 ORDER BY created_at DESC",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![category.as_str()], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn list_by_creator(&self, creator: &str) -> Result<Vec<Post>, AppError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM posts WHERE creator = ?1 ORDER BY created_at DESC",
            POST_COLUMNS
        ))?;
        let posts = stmt
            .query_map(params![creator], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    async fn update(
        &self,
        id: &str,
        fields: &PostFields,
        avatar: Option<&str>,
    ) -> Result<Post, AppError> {
        let conn = self.pool.get()?;
        let ts = now();

        let rows = match avatar {
            Some(avatar) => conn.execute(
                "UPDATE posts SET title = ?1, category = ?2, description = ?3, story = ?4,
                 avatar = ?5, updated_at = ?6 WHERE id = ?7",
                params![
                    fields.title,
                    fields.category.as_str(),
                    fields.description,
                    fields.story,
                    avatar,
                    ts,
                    id
                ],
            )?,
            None => conn.execute(
                "UPDATE posts SET title = ?1, category = ?2, description = ?3, story = ?4,
                 updated_at = ?5 WHERE id = ?6",
                params![
                    fields.title,
                    fields.category.as_str(),
                    fields.description,
                    fields.story,
                    ts,
                    id
                ],
            )?,
        };

        if rows == 0 {
            return Err(AppError::NotFound);
        }

        conn.query_row(
            &format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS),
            params![id],
            row_to_post,
        )
        .map_err(AppError::from)
    }

    async fn delete(&self, id: &str, creator: &str) -> Result<(), AppError> {
        let conn = self.pool.get()?;

        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<(), AppError> = (|| {
            let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
            if rows == 0 {
                return Err(AppError::NotFound);
            }

            conn.execute(
                "UPDATE users SET posts = posts - 1 WHERE id = ?1",
                params![creator],
            )?;

            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute("COMMIT", [])?;
                Ok(())
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynPostRepository = Arc<dyn PostRepository>;
