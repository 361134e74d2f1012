//! Cross-origin policy, evaluated before authorization.
//!
//! Produces the headers to attach; the HTTP layer decides how to send them.
//! Credentials are only ever allowed for explicitly listed origins.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
pub const ALLOW_METHODS: &str = "access-control-allow-methods";
pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
pub const MAX_AGE: &str = "access-control-max-age";
pub const VARY: &str = "vary";

/// One entry of the origin allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPattern {
    /// `*`: any origin, never with credentials.
    Any,
    /// `https://app.example.com`
    Exact(String),
    /// `https://*.example.com`: one or more subdomain labels, not the apex.
    Subdomain { prefix: String, suffix: String },
}

impl OriginPattern {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim().trim_end_matches('/');
        let invalid = |why: &str| ConfigError::InvalidOrigin {
            origin: raw.to_string(),
            reason: why.to_string(),
        };

        if raw == "*" {
            return Ok(Self::Any);
        }
        let (scheme, host) = raw
            .split_once("://")
            .ok_or_else(|| invalid("expected scheme://host"))?;
        if scheme.is_empty() || host.is_empty() {
            return Err(invalid("expected scheme://host"));
        }

        if let Some(rest) = host.strip_prefix("*.") {
            if rest.is_empty() || rest.contains('*') {
                return Err(invalid("wildcard must be a leading '*.' label"));
            }
            return Ok(Self::Subdomain {
                prefix: format!("{}://", scheme.to_ascii_lowercase()),
                suffix: format!(".{}", rest.to_ascii_lowercase()),
            });
        }
        if host.contains('*') {
            return Err(invalid("wildcard must be a leading '*.' label"));
        }

        Ok(Self::Exact(raw.to_ascii_lowercase()))
    }

    pub fn matches(&self, origin: &str) -> bool {
        let origin = origin.trim().to_ascii_lowercase();
        match self {
            OriginPattern::Any => true,
            OriginPattern::Exact(o) => *o == origin,
            OriginPattern::Subdomain { prefix, suffix } => origin
                .strip_prefix(prefix.as_str())
                .and_then(|host| host.strip_suffix(suffix.as_str()))
                .is_some_and(|labels| {
                    !labels.is_empty()
                        && !labels.starts_with('.')
                        && !labels.contains(['/', ':', '@'])
                }),
        }
    }

    /// Only explicit origins may be combined with credentials.
    pub fn is_explicit(&self) -> bool {
        matches!(self, OriginPattern::Exact(_))
    }
}

/// Fixed parts of the CORS configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_methods: ["POST", "GET", "PUT", "DELETE", "PATCH"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_headers: ["Authorization", "Content-Type"]
                .into_iter()
                .map(String::from)
                .collect(),
            allow_credentials: true,
            max_age_secs: 3600,
        }
    }
}

/// The CORS-relevant parts of an inbound request.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorsRequest<'a> {
    pub origin: Option<&'a str>,
    pub method: &'a str,
    /// `Access-Control-Request-Method` (pre-flight only).
    pub request_method: Option<&'a str>,
    /// `Access-Control-Request-Headers` (pre-flight only).
    pub request_headers: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsOutcome {
    /// Whether the request may proceed at all.
    pub allow: bool,
    /// Pre-flights are answered directly and never reach authorization.
    pub preflight: bool,
    /// Lower-case header names with their values.
    pub headers: Vec<(&'static str, String)>,
}

impl CorsOutcome {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<OriginPattern>,
    settings: CorsSettings,
}

impl CorsPolicy {
    pub fn new(origins: Vec<OriginPattern>, settings: CorsSettings) -> Self {
        Self { origins, settings }
    }

    /// Parse a comma-separated origin list (`cors.origins` style).
    pub fn parse_origins(list: &str) -> Result<Vec<OriginPattern>, ConfigError> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(OriginPattern::parse)
            .collect()
    }

    pub fn evaluate(&self, req: &CorsRequest<'_>) -> CorsOutcome {
        let preflight = req.method == "OPTIONS";
        let pass = |headers| CorsOutcome {
            allow: true,
            preflight,
            headers,
        };

        let Some(origin) = req.origin else {
            return pass(Vec::new());
        };

        let Some(pattern) = self.origins.iter().find(|p| p.matches(origin)) else {
            tracing::debug!(origin, preflight, "origin not in CORS allow-list");
            return CorsOutcome {
                allow: preflight,
                preflight,
                headers: Vec::new(),
            };
        };

        let method = if preflight {
            req.request_method.map(str::trim).unwrap_or_default()
        } else {
            req.method
        };
        if !self.method_allowed(method) {
            return pass(Vec::new());
        }

        let mut headers = self.origin_headers(pattern, origin);
        if preflight {
            headers.push((ALLOW_METHODS, self.settings.allowed_methods.join(", ")));
            if let Some(allowed) = self.reflect_headers(req.request_headers) {
                headers.push((ALLOW_HEADERS, allowed));
            }
            headers.push((MAX_AGE, self.settings.max_age_secs.to_string()));
        }

        pass(headers)
    }

    fn method_allowed(&self, method: &str) -> bool {
        self.settings.allowed_methods.iter().any(|m| m == method)
    }

    fn origin_headers(&self, pattern: &OriginPattern, origin: &str) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if *pattern == OriginPattern::Any {
            headers.push((ALLOW_ORIGIN, "*".to_string()));
            return headers;
        }

        headers.push((ALLOW_ORIGIN, origin.trim().to_string()));
        headers.push((VARY, "Origin".to_string()));
        if self.settings.allow_credentials && pattern.is_explicit() {
            headers.push((ALLOW_CREDENTIALS, "true".to_string()));
        }
        headers
    }

    /// Requested headers that are also configured, in request order.
    fn reflect_headers(&self, requested: Option<&str>) -> Option<String> {
        let allowed: Vec<&str> = requested?
            .split(',')
            .map(str::trim)
            .filter(|h| {
                !h.is_empty()
                    && self
                        .settings
                        .allowed_headers
                        .iter()
                        .any(|a| a.eq_ignore_ascii_case(h))
            })
            .collect();

        if allowed.is_empty() { None } else { Some(allowed.join(", ")) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(origins: &str) -> CorsPolicy {
        CorsPolicy::new(CorsPolicy::parse_origins(origins).unwrap(), CorsSettings::default())
    }

    fn preflight<'a>(origin: &'a str, method: &'a str) -> CorsRequest<'a> {
        CorsRequest {
            origin: Some(origin),
            method: "OPTIONS",
            request_method: Some(method),
            request_headers: Some("authorization, content-type, x-debug"),
        }
    }

    #[test]
    fn parses_comma_separated_origins() {
        let origins =
            CorsPolicy::parse_origins("http://localhost:3000, https://*.dsmovie.com ,").unwrap();
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], OriginPattern::Exact("http://localhost:3000".to_string()));
        assert!(matches!(origins[1], OriginPattern::Subdomain { .. }));
    }

    #[test]
    fn rejects_malformed_origin_patterns() {
        assert!(OriginPattern::parse("localhost:3000").is_err());
        assert!(OriginPattern::parse("https://api.*.com").is_err());
        assert!(OriginPattern::parse("https://*.").is_err());
    }

    #[test]
    fn subdomain_wildcard_excludes_apex_and_lookalikes() {
        let p = OriginPattern::parse("https://*.dsmovie.com").unwrap();
        assert!(p.matches("https://app.dsmovie.com"));
        assert!(p.matches("https://a.b.dsmovie.com"));
        assert!(!p.matches("https://dsmovie.com"));
        assert!(!p.matches("https://evildsmovie.com"));
        assert!(!p.matches("http://app.dsmovie.com"));
        assert!(!p.matches("https://app.dsmovie.com.evil.io"));
    }

    #[test]
    fn preflight_from_explicit_origin_gets_credentials() {
        let out = policy("https://app.dsmovie.com")
            .evaluate(&preflight("https://app.dsmovie.com", "PUT"));
        assert!(out.allow);
        assert!(out.preflight);
        assert_eq!(out.header(ALLOW_ORIGIN), Some("https://app.dsmovie.com"));
        assert_eq!(out.header(ALLOW_CREDENTIALS), Some("true"));
        assert_eq!(out.header(ALLOW_METHODS), Some("POST, GET, PUT, DELETE, PATCH"));
        assert_eq!(out.header(ALLOW_HEADERS), Some("authorization, content-type"));
        assert_eq!(out.header(MAX_AGE), Some("3600"));
        assert_eq!(out.header(VARY), Some("Origin"));
    }

    #[test]
    fn wildcard_origins_never_get_credentials() {
        let sub = policy("https://*.dsmovie.com")
            .evaluate(&preflight("https://app.dsmovie.com", "GET"));
        assert_eq!(sub.header(ALLOW_ORIGIN), Some("https://app.dsmovie.com"));
        assert_eq!(sub.header(ALLOW_CREDENTIALS), None);

        let any = policy("*").evaluate(&preflight("https://anything.io", "GET"));
        assert_eq!(any.header(ALLOW_ORIGIN), Some("*"));
        assert_eq!(any.header(ALLOW_CREDENTIALS), None);
    }

    #[test]
    fn preflight_from_unknown_origin_passes_without_headers() {
        let out = policy("https://app.dsmovie.com").evaluate(&preflight("https://evil.io", "GET"));
        assert!(out.allow);
        assert!(out.preflight);
        assert!(out.headers.is_empty());
    }

    #[test]
    fn preflight_for_unlisted_method_is_not_reflected() {
        let out = policy("https://app.dsmovie.com")
            .evaluate(&preflight("https://app.dsmovie.com", "TRACE"));
        assert!(out.allow);
        assert!(out.headers.is_empty());
    }

    #[test]
    fn actual_request_from_unknown_origin_is_rejected() {
        let out = policy("https://app.dsmovie.com").evaluate(&CorsRequest {
            origin: Some("https://evil.io"),
            method: "GET",
            ..CorsRequest::default()
        });
        assert!(!out.allow);
        assert!(!out.preflight);
    }

    #[test]
    fn actual_request_from_allowed_origin_gets_origin_headers_only() {
        let out = policy("https://app.dsmovie.com").evaluate(&CorsRequest {
            origin: Some("https://app.dsmovie.com"),
            method: "DELETE",
            ..CorsRequest::default()
        });
        assert!(out.allow);
        assert_eq!(out.header(ALLOW_ORIGIN), Some("https://app.dsmovie.com"));
        assert_eq!(out.header(ALLOW_METHODS), None);
    }

    #[test]
    fn same_origin_requests_are_untouched() {
        let out = policy("https://app.dsmovie.com").evaluate(&CorsRequest {
            method: "GET",
            ..CorsRequest::default()
        });
        assert!(out.allow);
        assert!(out.headers.is_empty());
    }

    #[test]
    fn credentials_can_be_disabled() {
        let settings = CorsSettings {
            allow_credentials: false,
            ..CorsSettings::default()
        };
        let origins = CorsPolicy::parse_origins("https://app.dsmovie.com").unwrap();
        let p = CorsPolicy::new(origins, settings);
        let out = p.evaluate(&preflight("https://app.dsmovie.com", "GET"));
        assert_eq!(out.header(ALLOW_CREDENTIALS), None);
    }
}
