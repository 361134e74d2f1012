use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use marquee_core::{MovieDraft, MovieId};

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movies).post(create_movie))
        .route("/:id", get(get_movie).put(update_movie).delete(delete_movie))
}

pub async fn list_movies(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list() {
        Ok(movies) => Json(movies).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = id.parse::<MovieId>().and_then(|id| services.catalog.get(id));
    match result {
        Ok(movie) => Json(movie).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<MovieDraft>,
) -> axum::response::Response {
    match services.catalog.insert(body) {
        Ok(movie) => {
            tracing::info!(movie_id = %movie.id, "movie created");
            (StatusCode::CREATED, Json(movie)).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<MovieDraft>,
) -> axum::response::Response {
    let result = id
        .parse::<MovieId>()
        .and_then(|id| services.catalog.update(id, body));
    match result {
        Ok(movie) => Json(movie).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_movie(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let result = id.parse::<MovieId>().and_then(|id| services.catalog.delete(id));
    match result {
        Ok(()) => {
            tracing::info!(movie_id = %id, "movie deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}
