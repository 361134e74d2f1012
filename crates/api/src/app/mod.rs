//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: catalog, principal directory and demo seed data
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use marquee_auth::{ConfigError, InMemoryPrincipalStore, PrincipalStore};
use marquee_core::{InMemoryCatalog, MovieCatalog};

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Fails if the security configuration is invalid.
pub fn build_app(config: &AppConfig) -> Result<Router, ConfigError> {
    if config.seed_demo_data {
        build_app_with(
            config,
            Arc::new(services::demo_catalog()),
            Arc::new(services::demo_principals()),
        )
    } else {
        build_app_with(
            config,
            Arc::new(InMemoryCatalog::new()),
            Arc::new(InMemoryPrincipalStore::new()),
        )
    }
}

pub fn build_app_with(
    config: &AppConfig,
    catalog: Arc<dyn MovieCatalog>,
    principals: Arc<dyn PrincipalStore>,
) -> Result<Router, ConfigError> {
    let security = config.security_config().build()?;

    let services = Arc::new(services::AppServices {
        catalog,
        principals,
        engine: security.engine.clone(),
        lookup_timeout: config.lookup_timeout(),
    });

    // CORS wraps authorization so pre-flights never reach the authz layer.
    Ok(routes::router().layer(Extension(services)).layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn_with_state(
                security.clone(),
                middleware::cors_middleware,
            ))
            .layer(axum::middleware::from_fn_with_state(
                security,
                middleware::authz_middleware,
            )),
    ))
}
