use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::claims::{Claims, TokenError};
use crate::policy::{Access, RoutePolicy, RuleSource};
use crate::principal::{PrincipalStore, load_principal};
use crate::token::TokenValidator;

/// Why a request was allowed or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// No rule matched and the default rule grants nobody.
    NoRuleMatched,
    Public,
    RoleSatisfied,
    RoleMissing,
    TokenInvalid,
    TokenExpired,
}

impl DecisionReason {
    /// Authentication problems (401) as opposed to authorization ones (403).
    pub fn is_authentication_failure(self) -> bool {
        matches!(self, DecisionReason::TokenInvalid | DecisionReason::TokenExpired)
    }
}

impl From<TokenError> for DecisionReason {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Invalid => DecisionReason::TokenInvalid,
            TokenError::Expired => DecisionReason::TokenExpired,
        }
    }
}

/// Outcome of [`AuthorizationEngine::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: DecisionReason,
    pub rule: RuleSource,
    /// Verified claims, present on allowed gated requests only.
    pub claims: Option<Claims>,
}

impl Decision {
    fn allow(reason: DecisionReason, rule: RuleSource, claims: Option<Claims>) -> Self {
        Self {
            allowed: true,
            reason,
            rule,
            claims,
        }
    }

    fn deny(reason: DecisionReason, rule: RuleSource) -> Self {
        Self {
            allowed: false,
            reason,
            rule,
            claims: None,
        }
    }
}

/// Per-request access decisions over an immutable route policy.
///
/// - No IO
/// - No panics
/// - No mutation (safe to share behind an `Arc` across request tasks)
pub struct AuthorizationEngine {
    policy: RoutePolicy,
    validator: Arc<dyn TokenValidator>,
}

impl AuthorizationEngine {
    pub fn new(policy: RoutePolicy, validator: Arc<dyn TokenValidator>) -> Self {
        Self { policy, validator }
    }

    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Decide a request against the current wall clock.
    pub fn authorize(&self, method: &str, path: &str, authorization: Option<&str>) -> Decision {
        self.authorize_at(method, path, authorization, Utc::now())
    }

    pub fn authorize_at(
        &self,
        method: &str,
        path: &str,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Decision {
        let resolved = self.policy.resolve(method, path);
        let source = resolved.source;

        let decision = match &resolved.rule.access {
            // Public routes never look at the header, even a broken one.
            Access::Public => Decision::allow(DecisionReason::Public, source, None),
            Access::AnyRole(roles) if roles.is_empty() && source == RuleSource::Default => {
                Decision::deny(DecisionReason::NoRuleMatched, source)
            }
            access => match self.verify(authorization, now) {
                Err(reason) => Decision::deny(reason, source),
                Ok(claims) => match access {
                    Access::AnyRole(required) if !claims.has_any_role(required) => {
                        Decision::deny(DecisionReason::RoleMissing, source)
                    }
                    _ => Decision::allow(DecisionReason::RoleSatisfied, source, Some(claims)),
                },
            },
        };

        tracing::debug!(
            method,
            path,
            rule = %resolved.rule,
            source = ?source,
            allowed = decision.allowed,
            reason = ?decision.reason,
            "authorization decision"
        );

        decision
    }

    fn verify(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Claims, DecisionReason> {
        let token = authorization
            .and_then(extract_bearer)
            .ok_or(DecisionReason::TokenInvalid)?;

        self.validator
            .validate(token, now)
            .map_err(DecisionReason::from)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (admin-facing)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a given principal would be allowed or denied on a route.
///
/// Built from the directory, not from a token, so it is only meant for
/// administrators diagnosing `RoleMissing` denials.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub subject: String,
    pub method: String,
    pub path: String,
    /// Display form of the effective rule (`GET /movies/**`).
    pub rule: String,
    pub source: RuleSource,
    pub access: Access,
    pub principal_found: bool,
    pub held_roles: Vec<String>,
    pub granted: bool,
    pub reason: String,
}

/// Explain the decision `subject` would get on `(method, path)` with a valid
/// token carrying its current directory roles.
pub async fn explain_authorization(
    engine: &AuthorizationEngine,
    store: &dyn PrincipalStore,
    subject: &str,
    method: &str,
    path: &str,
    lookup_timeout: Duration,
) -> AuthorizationExplanation {
    let resolved = engine.policy().resolve(method, path);
    let principal = load_principal(store, subject, lookup_timeout).await.ok();

    let held_roles: Vec<String> = principal
        .as_ref()
        .map(|p| p.roles.iter().map(|r| r.as_str().to_string()).collect())
        .unwrap_or_default();

    let (granted, reason) = match (&resolved.rule.access, &principal) {
        (Access::Public, _) => (true, "Route is public; no token is required".to_string()),
        (Access::AnyRole(required), _) if required.is_empty() => (
            false,
            "No rule matches and the default rule grants no role".to_string(),
        ),
        (_, None) => (false, format!("Principal '{subject}' is not known to the directory")),
        (Access::Authenticated, Some(_)) => {
            (true, "Any authenticated principal is allowed".to_string())
        }
        (Access::AnyRole(required), Some(p)) => {
            if crate::roles::intersects(&p.roles, required) {
                (true, "Principal holds one of the required roles".to_string())
            } else {
                let required: Vec<&str> = required.iter().map(|r| r.as_str()).collect();
                (
                    false,
                    format!(
                        "Principal holds {held_roles:?}, but the route requires one of {required:?}"
                    ),
                )
            }
        }
    };

    AuthorizationExplanation {
        subject: subject.to_string(),
        method: method.to_string(),
        path: path.to_string(),
        rule: resolved.rule.to_string(),
        source: resolved.source,
        access: resolved.rule.access.clone(),
        principal_found: principal.is_some(),
        held_roles,
        granted,
        reason,
    }
}
