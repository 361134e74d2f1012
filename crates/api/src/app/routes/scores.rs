use std::sync::Arc;

use axum::{Json, extract::Extension, response::IntoResponse};

use marquee_core::ScoreSubmission;

use crate::app::errors;
use crate::app::services::AppServices;

/// Record a user's score; answers with the movie's new average.
pub async fn save_score(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<ScoreSubmission>,
) -> axum::response::Response {
    match services.catalog.save_score(body) {
        Ok(movie) => Json(movie).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
