pub mod session;

use rusqlite::params;

use crate::db::models::User;
use crate::error::AppError;
use crate::state::DbPool;

const USER_COLUMNS: &str = "id, username, email, password_hash, posts, created_at";

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        posts: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Register a new user with a bcrypt-hashed password.
pub fn create_user(
    pool: &DbPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    if username.trim().is_empty() || email.trim().is_empty() || password.len() < 6 {
        return Err(AppError::Validation(
            "Username, email, and a password of at least 6 characters are required".into(),
        ));
    }

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("bcrypt: {}", e)))?;
    let id = uuid::Uuid::now_v7().to_string();

    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, ?4)",
        params![id, username, email, hash],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Validation("Username or email already taken".into())
        }
        other => other.into(),
    })?;

    find_user_by_id(pool, &id)
}

/// Look up a user by id.
pub fn find_user_by_id(pool: &DbPool, id: &str) -> Result<User, AppError> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
        params![id],
        row_to_user,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
        other => other.into(),
    })
}

/// Verify credentials; the same Unauthorized comes back for an unknown
/// username and a wrong password.
pub fn verify_login(pool: &DbPool, username: &str, password: &str) -> Result<User, AppError> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
            params![username],
            row_to_user,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => AppError::Unauthorized,
            other => other.into(),
        })?;

    let ok = bcrypt::verify(password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("bcrypt: {}", e)))?;
    if !ok {
        return Err(AppError::Unauthorized);
    }
    Ok(user)
}
