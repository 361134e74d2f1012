//! Process configuration.
//!
//! Layered with `figment`: built-in defaults, then an optional YAML file
//! (`MARQUEE_CONFIG`, default `marquee.yaml`), then `MARQUEE_*` environment
//! variables (`__` separates nested keys). The bare `JWT_SECRET` and
//! `CORS_ORIGINS` variables are honoured last.

use std::time::Duration;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use marquee_auth::{CorsSettings, Role, RuleSpec, SecurityConfig, VerificationKey, default_rules};
use marquee_observability::LogFormat;

const DEFAULT_CONFIG_PATH: &str = "marquee.yaml";
const DEV_JWT_SECRET: &str = "MY-JWT-SECRET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub log_format: LogFormat,
    /// HMAC secret for HS256 tokens.
    pub jwt_secret: Option<String>,
    /// RSA public key for RS256 tokens; wins over `jwt_secret`.
    pub jwt_public_key_pem: Option<String>,
    /// Comma-separated origin patterns.
    pub cors_origins: String,
    pub cors: CorsSettings,
    pub rules: Vec<RuleSpec>,
    pub default_roles: Vec<String>,
    pub principal_lookup_timeout_ms: u64,
    /// Seed the in-memory catalog and principal directory.
    pub seed_demo_data: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            log_format: LogFormat::default(),
            jwt_secret: None,
            jwt_public_key_pem: None,
            cors_origins: "http://localhost:3000,http://localhost:5173".to_string(),
            cors: CorsSettings::default(),
            rules: default_rules(),
            default_roles: vec![Role::ADMIN.to_string()],
            principal_lookup_timeout_ms: 2_000,
            seed_demo_data: true,
        }
    }
}

impl AppConfig {
    /// Load from the default locations.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("MARQUEE_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_figment(Self::figment(&path))
            .with_context(|| format!("failed to load configuration (file: {path})"))
    }

    pub fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("MARQUEE_").split("__"))
            .merge(Env::raw().only(&["JWT_SECRET", "CORS_ORIGINS"]))
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        Ok(figment.extract()?)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.principal_lookup_timeout_ms)
    }

    /// Security settings for [`SecurityConfig::build`].
    ///
    /// A missing key falls back to a development secret; an empty one is kept
    /// so that the build rejects it.
    pub fn security_config(&self) -> SecurityConfig {
        let verification_key = match (&self.jwt_public_key_pem, &self.jwt_secret) {
            (Some(pem), _) => VerificationKey::RsaPem(pem.clone()),
            (None, Some(secret)) => VerificationKey::Hmac(secret.clone().into_bytes()),
            (None, None) => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                VerificationKey::Hmac(DEV_JWT_SECRET.as_bytes().to_vec())
            }
        };

        let allowed_origins = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        SecurityConfig {
            verification_key,
            allowed_origins,
            cors: self.cors.clone(),
            rules: self.rules.clone(),
            default_roles: self.default_roles.clone(),
        }
    }
}
