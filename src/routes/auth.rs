use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth;
use crate::error::AppResult;
use crate::extractors::session_token_from_headers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users/login", post(login))
        .route("/api/users/logout", post(logout))
        .route("/api/users/{id}", get(profile))
}

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct UserProfile {
    id: String,
    username: String,
    posts: i64,
    created_at: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let user = auth::create_user(&state.db, &req.username, &req.email, &req.password)?;
    Ok((
        StatusCode::CREATED,
        Json(UserProfile {
            id: user.id,
            username: user.username,
            posts: user.posts,
            created_at: user.created_at,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let user = auth::verify_login(&state.db, &req.username, &req.password)?;
    let hours = state.config.auth.session_hours;
    let token = auth::session::create_session(&state.db, &user.id, hours)?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        state.config.auth.cookie_name,
        token,
        hours * 3600
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "id": user.id, "username": user.username })),
    ))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<impl IntoResponse> {
    if let Some(token) = session_token_from_headers(&headers, &state.config.auth.cookie_name) {
        auth::session::delete_session(&state.db, token)?;
    }

    // Expire the cookie either way
    let cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        state.config.auth.cookie_name
    );
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "Logged out" })),
    ))
}

async fn profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let user = auth::find_user_by_id(&state.db, &id)?;

    Ok(Json(UserProfile {
        id: user.id,
        username: user.username,
        posts: user.posts,
        created_at: user.created_at,
    }))
}
