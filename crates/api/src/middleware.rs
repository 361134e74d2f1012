use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use marquee_auth::{CorsOutcome, CorsRequest, SecurityComponents};

use crate::app::errors;
use crate::context::PrincipalContext;

/// Shared state of both security layers.
pub type SecurityState = SecurityComponents;

/// Cross-origin handling; runs outside (before) authorization.
///
/// Pre-flights are answered here with `204` and never reach the authz layer.
pub async fn cors_middleware(
    State(state): State<SecurityState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let headers = req.headers();
    let outcome = state.cors.evaluate(&CorsRequest {
        origin: header_str(headers, &header::ORIGIN),
        method: req.method().as_str(),
        request_method: header_str(headers, &header::ACCESS_CONTROL_REQUEST_METHOD),
        request_headers: header_str(headers, &header::ACCESS_CONTROL_REQUEST_HEADERS),
    });

    if outcome.preflight {
        let mut res = StatusCode::NO_CONTENT.into_response();
        attach_cors_headers(res.headers_mut(), &outcome);
        return res;
    }

    if !outcome.allow {
        tracing::info!(
            method = %req.method(),
            path = req.uri().path(),
            "rejected request from disallowed origin"
        );
        return (StatusCode::FORBIDDEN, "invalid CORS request").into_response();
    }

    let mut res = next.run(req).await;
    attach_cors_headers(res.headers_mut(), &outcome);
    res
}

/// Route-level access control.
///
/// Denials carry a generic body only; the reason goes to the log.
pub async fn authz_middleware(
    State(state): State<SecurityState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let authorization = header_str(req.headers(), &header::AUTHORIZATION);
    let decision = state
        .engine
        .authorize(req.method().as_str(), req.uri().path(), authorization);

    if !decision.allowed {
        tracing::info!(
            method = %req.method(),
            path = req.uri().path(),
            reason = ?decision.reason,
            rule = ?decision.rule,
            "request denied"
        );
        return errors::denied(decision.reason);
    }

    if let Some(claims) = decision.claims {
        req.extensions_mut().insert(PrincipalContext::from(claims));
    }

    next.run(req).await
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn attach_cors_headers(headers: &mut HeaderMap, outcome: &CorsOutcome) {
    for (name, value) in &outcome.headers {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                headers.append(HeaderName::from_static(*name), value);
            }
            Err(_) => tracing::warn!(header = *name, "dropping unencodable CORS header"),
        }
    }
}
