use axum::{
    Router,
    routing::{get, put},
};

pub mod admin;
pub mod movies;
pub mod scores;
pub mod system;

/// Router for every endpoint; access is decided by the authz layer, not here.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/whoami", get(system::whoami))
        .nest("/movies", movies::router())
        .route("/scores", put(scores::save_score))
        .nest("/admin", admin::router())
}
