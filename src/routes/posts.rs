use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::posts::domain::{Category, PostFields};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", post(create_post))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{id}", get(get_post))
        .route("/api/posts/categories/{category}", get(list_by_category))
        .route("/api/posts/users/{id}", get(list_by_creator))
        .route("/api/posts/{id}", patch(edit_post))
        .route("/api/posts/{id}", delete(delete_post))
}

/// Text fields plus the optional avatar pulled out of a multipart body.
#[derive(Default)]
struct PostForm {
    title: Option<String>,
    category: Option<String>,
    description: Option<String>,
    story: Option<String>,
    avatar: Option<(String, Vec<u8>)>,
}

impl PostForm {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PostForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "title" | "category" | "description" | "story" => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Bad field {}: {}", name, e)))?;
                    match name.as_str() {
                        "title" => form.title = Some(value),
                        "category" => form.category = Some(value),
                        "description" => form.description = Some(value),
                        _ => form.story = Some(value),
                    }
                }
                "avatar" => {
                    let filename = field
                        .file_name()
                        .map(|f| f.to_string())
                        .ok_or_else(|| AppError::Validation("Avatar needs a filename".into()))?;
                    let data = field.bytes().await.map_err(|e| {
                        AppError::Validation(format!("Could not read avatar: {}", e))
                    })?;
                    form.avatar = Some((filename, data.to_vec()));
                }
                // Unknown fields are ignored, matching lenient form handling
                _ => {}
            }
        }

        Ok(form)
    }

    fn fields(&self) -> Result<PostFields, AppError> {
        PostFields::new(
            self.title.clone(),
            self.category.clone(),
            self.description.clone(),
            self.story.clone(),
        )
    }
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = PostForm::from_multipart(multipart).await?;
    let fields = form.fields()?;
    let (original_name, data) = form
        .avatar
        .ok_or_else(|| AppError::Validation("Fill all fields and select an image".into()))?;

    let stored = state.uploads.save(&original_name, &data)?;

    match state.posts.create(&fields, &stored, &user.id).await {
        Ok(post) => Ok((StatusCode::CREATED, Json(post))),
        Err(e) => {
            // Don't leave an orphan file behind when the insert fails
            state.uploads.remove_best_effort(&stored);
            Err(e)
        }
    }
}

async fn list_posts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let posts = state.posts.list().await?;
    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let post = state.posts.get(&id).await?;
    Ok(Json(post))
}

async fn list_by_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(category): Path<String>,
) -> AppResult<impl IntoResponse> {
    // Unknown category names 404 rather than hitting the store
    let category: Category = category.parse().map_err(|_| AppError::NotFound)?;
    let posts = state.posts.list_by_category(category).await?;
    Ok(Json(posts))
}

async fn list_by_creator(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let posts = state.posts.list_by_creator(&id).await?;
    Ok(Json(posts))
}

async fn edit_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = PostForm::from_multipart(multipart).await?;
    let fields = form.fields()?;

    let old = state.posts.get(&id).await?;
    if old.creator != user.id {
        return Err(AppError::Forbidden);
    }

    let new_avatar = match form.avatar {
        None => None,
        Some((original_name, data)) => {
            let stored = state.uploads.save(&original_name, &data)?;
            // Old file cleanup is best-effort; the update proceeds regardless
            state.uploads.remove_best_effort(&old.avatar);
            Some(stored)
        }
    };

    match state.posts.update(&id, &fields, new_avatar.as_deref()).await {
        Ok(updated) => Ok(Json(updated)),
        Err(e) => {
            if let Some(stored) = new_avatar {
                state.uploads.remove_best_effort(&stored);
            }
            Err(e)
        }
    }
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let post = state.posts.get(&id).await?;
    if post.creator != user.id {
        return Err(AppError::Forbidden);
    }

    // A failed file removal aborts the delete; callers may retry.
    // A file that is already gone does not.
    state.uploads.remove(&post.avatar)?;

    state.posts.delete(&id, &post.creator).await?;

    Ok(Json(json!({
        "message": format!("Post {} deleted successfully", id)
    })))
}
