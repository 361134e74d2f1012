use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
};

use marquee_auth::explain_authorization;

use crate::app::dto::ExplainQuery;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/authz/explain", get(explain))
}

/// Why `subject` would be granted or denied `method path`.
pub async fn explain(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<ExplainQuery>,
) -> impl IntoResponse {
    let method = query.method.trim().to_ascii_uppercase();
    let explanation = explain_authorization(
        &services.engine,
        services.principals.as_ref(),
        &query.subject,
        &method,
        &query.path,
        services.lookup_timeout,
    )
    .await;

    Json(explanation)
}
