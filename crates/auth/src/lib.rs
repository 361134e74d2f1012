//! `marquee-auth`: access-control core (stateless, fail-closed).
//!
//! This crate is intentionally decoupled from HTTP and storage: the web layer
//! hands in `{method, path, Authorization, Origin}` and enforces the result.

pub mod authorize;
pub mod claims;
pub mod config;
pub mod cors;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{
    AuthorizationEngine, AuthorizationExplanation, Decision, DecisionReason, explain_authorization,
    extract_bearer,
};
pub use claims::{Claims, TokenClaims, TokenError, validate_claims};
pub use config::{
    AccessSpec, ConfigError, RuleSpec, SecurityComponents, SecurityConfig, default_rules,
};
pub use cors::{CorsOutcome, CorsPolicy, CorsRequest, CorsSettings, OriginPattern};
pub use policy::{Access, MethodMatcher, PathPattern, ResolvedRule, RoutePolicy, Rule, RuleSource};
pub use principal::{
    InMemoryPrincipalStore, Principal, PrincipalError, PrincipalStore, StoreError, load_principal,
};
pub use roles::Role;
pub use token::{JwtTokenValidator, TokenValidator, VerificationKey};
