use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::error::AppResult;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/uploads/{filename}", get(serve))
}

/// Serves a stored avatar by its generated filename.
async fn serve(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let data = state.uploads.read(&filename)?;
    let mime = mime_guess::from_path(&filename).first_or_octet_stream();
    let cache = format!(
        "public, max-age={}",
        state.config.storage.cache_max_age_secs
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, cache),
        ],
        data,
    ))
}
