//! Process-wide security configuration.
//!
//! Built once at startup into immutable components. Any malformed entry is a
//! fatal [`ConfigError`]; the process must not run with an undefined policy.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;
use crate::authorize::AuthorizationEngine;
use crate::cors::{CorsPolicy, CorsSettings, OriginPattern};
use crate::policy::{Access, MethodMatcher, PathPattern, Rule, RoutePolicy};
use crate::token::{JwtTokenValidator, VerificationKey};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("token verification secret is empty")]
    EmptySecret,

    #[error("token verification key is not usable: {0}")]
    InvalidKey(String),

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("rule '{0}' requires roles but lists none")]
    EmptyRoleList(String),

    #[error("role names must not be blank")]
    BlankRole,

    #[error("invalid CORS origin '{origin}': {reason}")]
    InvalidOrigin { origin: String, reason: String },
}

/// Access requirement as written in configuration.
///
/// ```yaml
/// access: public
/// access: authenticated
/// access: { any_role: [ADMIN, CLIENT] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSpec {
    Public,
    Authenticated,
    AnyRole(Vec<String>),
}

/// One rule as written in configuration. `method` defaults to any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default = "any_method")]
    pub method: String,
    pub path: String,
    pub access: AccessSpec,
}

fn any_method() -> String {
    "*".to_string()
}

impl RuleSpec {
    pub fn new(method: &str, path: &str, access: AccessSpec) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            access,
        }
    }

    fn build(&self) -> Result<Rule, ConfigError> {
        let method = MethodMatcher::parse(&self.method)?;
        let pattern = PathPattern::parse(&self.path)?;
        let access = match &self.access {
            AccessSpec::Public => Access::Public,
            AccessSpec::Authenticated => Access::Authenticated,
            AccessSpec::AnyRole(names) => {
                if names.is_empty() {
                    let rule = format!("{} {}", self.method, self.path);
                    return Err(ConfigError::EmptyRoleList(rule));
                }
                Access::AnyRole(parse_roles(names)?)
            }
        };
        Ok(Rule::new(method, pattern, access))
    }
}

fn parse_roles(names: &[String]) -> Result<Vec<Role>, ConfigError> {
    names
        .iter()
        .map(|n| {
            let n = n.trim();
            if n.is_empty() {
                Err(ConfigError::BlankRole)
            } else {
                Ok(Role::from(n))
            }
        })
        .collect()
}

/// Rule table of the movie/score service: public token endpoint, H2 console
/// and API docs, public movie reads and score submission; everything else
/// needs `ADMIN` through the default rule.
pub fn default_rules() -> Vec<RuleSpec> {
    let mut rules = vec![
        RuleSpec::new("*", "/oauth/token", AccessSpec::Public),
        RuleSpec::new("*", "/h2-console/**", AccessSpec::Public),
    ];

    for docs in [
        "/v2/api-docs",
        "/configuration/ui",
        "/swagger-resources/**",
        "/configuration/security",
        "/swagger-ui.html",
        "/webjars/**",
    ] {
        rules.push(RuleSpec::new("*", docs, AccessSpec::Public));
    }

    rules.extend([
        RuleSpec::new("GET", "/movies/**", AccessSpec::Public),
        RuleSpec::new("PUT", "/scores/**", AccessSpec::Public),
        RuleSpec::new("GET", "/health", AccessSpec::Public),
        RuleSpec::new("GET", "/whoami", AccessSpec::Authenticated),
    ]);

    rules
}

/// Explicit, passed-down security configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub verification_key: VerificationKey,
    /// Origin patterns, already split from the comma-separated form.
    pub allowed_origins: Vec<String>,
    pub cors: CorsSettings,
    /// Ordered; first match wins.
    pub rules: Vec<RuleSpec>,
    /// Roles required by unmatched routes. Empty denies them outright.
    pub default_roles: Vec<String>,
}

impl SecurityConfig {
    /// Configuration with the default rule table and CORS settings.
    pub fn new(verification_key: VerificationKey, allowed_origins: Vec<String>) -> Self {
        Self {
            verification_key,
            allowed_origins,
            cors: CorsSettings::default(),
            rules: default_rules(),
            default_roles: vec![Role::ADMIN.to_string()],
        }
    }

    /// Validate everything and build the shared, read-only components.
    pub fn build(&self) -> Result<SecurityComponents, ConfigError> {
        let validator = JwtTokenValidator::new(&self.verification_key)?;

        let rules = self
            .rules
            .iter()
            .map(RuleSpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        let default_roles = parse_roles(&self.default_roles)?;
        let policy = RoutePolicy::new(rules, default_roles);

        let origins = self
            .allowed_origins
            .iter()
            .map(|o| OriginPattern::parse(o))
            .collect::<Result<Vec<_>, _>>()?;

        for m in &self.cors.allowed_methods {
            if MethodMatcher::parse(m)? == MethodMatcher::Any {
                return Err(ConfigError::InvalidMethod(m.clone()));
            }
        }

        tracing::info!(
            rules = policy.rules().len(),
            default_rule = ?policy.default_rule().access,
            origins = origins.len(),
            "security policy loaded"
        );

        Ok(SecurityComponents {
            engine: Arc::new(AuthorizationEngine::new(policy, Arc::new(validator))),
            cors: Arc::new(CorsPolicy::new(origins, self.cors.clone())),
        })
    }
}

/// Immutable components shared by all request handlers.
#[derive(Clone)]
pub struct SecurityComponents {
    pub engine: Arc<AuthorizationEngine>,
    pub cors: Arc<CorsPolicy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::policy::RuleSource;

    fn hmac() -> VerificationKey {
        VerificationKey::Hmac(b"MY-JWT-SECRET".to_vec())
    }

    #[test]
    fn default_configuration_builds() {
        let cfg = SecurityConfig::new(hmac(), vec!["http://localhost:3000".to_string()]);
        let components = cfg.build().unwrap();
        let policy = components.engine.policy();

        assert_eq!(policy.rules().len(), default_rules().len());
        assert_eq!(policy.default_rule().access, Access::AnyRole(vec![Role::ADMIN]));
        assert!(matches!(policy.resolve("GET", "/movies/1").source, RuleSource::Declared(_)));
        assert_eq!(policy.resolve("POST", "/movies").source, RuleSource::Default);
    }

    #[test]
    fn default_table_matches_service_routes() {
        let components = SecurityConfig::new(hmac(), vec![]).build().unwrap();
        let engine = components.engine;

        for (method, path) in [
            ("POST", "/oauth/token"),
            ("GET", "/h2-console/login.do"),
            ("GET", "/swagger-ui.html"),
            ("GET", "/webjars/springfox/x.js"),
            ("GET", "/movies"),
            ("GET", "/movies/3"),
            ("PUT", "/scores"),
            ("GET", "/health"),
        ] {
            assert!(engine.authorize(method, path, None).allowed, "{method} {path}");
        }

        let requests = [
            ("POST", "/movies"),
            ("PUT", "/movies/3"),
            ("DELETE", "/movies/3"),
            ("GET", "/whoami"),
        ];
        for (method, path) in requests {
            assert!(!engine.authorize(method, path, None).allowed, "{method} {path}");
        }
    }

    #[test]
    fn yaml_rule_specs_deserialize() {
        let json = r#"[
            {"path": "/oauth/token", "access": "public"},
            {"method": "PUT", "path": "/scores/**", "access": {"any_role": ["CLIENT", "ADMIN"]}},
            {"method": "GET", "path": "/whoami", "access": "authenticated"}
        ]"#;
        let specs: Vec<RuleSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(specs[0].method, "*");
        assert_eq!(
            specs[1].access,
            AccessSpec::AnyRole(vec!["CLIENT".to_string(), "ADMIN".to_string()])
        );
        assert_eq!(specs[2].access, AccessSpec::Authenticated);
    }

    #[test]
    fn malformed_entries_are_fatal() {
        let mut cfg = SecurityConfig::new(hmac(), vec![]);
        cfg.rules.push(RuleSpec::new("GET", "movies", AccessSpec::Public));
        assert!(matches!(cfg.build(), Err(ConfigError::InvalidPattern { .. })));

        let mut cfg = SecurityConfig::new(hmac(), vec![]);
        cfg.rules.push(RuleSpec::new("GET", "/x", AccessSpec::AnyRole(vec![])));
        assert!(matches!(cfg.build(), Err(ConfigError::EmptyRoleList(_))));

        let mut cfg = SecurityConfig::new(hmac(), vec![]);
        cfg.default_roles = vec![" ".to_string()];
        assert_eq!(cfg.build().err(), Some(ConfigError::BlankRole));

        let cfg = SecurityConfig::new(hmac(), vec!["localhost".to_string()]);
        assert!(matches!(cfg.build(), Err(ConfigError::InvalidOrigin { .. })));

        let cfg = SecurityConfig::new(VerificationKey::Hmac(vec![]), vec![]);
        assert_eq!(cfg.build().err(), Some(ConfigError::EmptySecret));

        let mut cfg = SecurityConfig::new(hmac(), vec![]);
        cfg.cors.allowed_methods.push("*".to_string());
        assert!(matches!(cfg.build(), Err(ConfigError::InvalidMethod(_))));
    }
}
