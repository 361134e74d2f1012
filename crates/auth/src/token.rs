//! Bearer-token verification.
//!
//! Pure computation over the token and a key loaded once at startup: no I/O
//! and no clock reads (the caller passes `now`).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::claims::{Claims, TokenClaims, TokenError, validate_claims};
use crate::config::ConfigError;

/// Verifies a raw bearer token and extracts its claims.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError>;
}

/// Key material used to verify token signatures.
#[derive(Clone)]
pub enum VerificationKey {
    /// Shared HMAC secret (HS256).
    Hmac(Vec<u8>),
    /// PEM-encoded RSA public key (RS256).
    RsaPem(String),
}

impl core::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            VerificationKey::Hmac(_) => f.write_str("VerificationKey::Hmac(<redacted>)"),
            VerificationKey::RsaPem(_) => f.write_str("VerificationKey::RsaPem(..)"),
        }
    }
}

/// JWT validator backed by `jsonwebtoken`.
///
/// Library-side expiry checking is disabled: the signature is verified by
/// `decode`, then [`validate_claims`] classifies the time window so that an
/// expired-but-authentic token reports `Expired` rather than `Invalid`.
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    pub fn new(key: &VerificationKey) -> Result<Self, ConfigError> {
        let (key, algorithm) = match key {
            VerificationKey::Hmac(secret) => {
                if secret.is_empty() {
                    return Err(ConfigError::EmptySecret);
                }
                (DecodingKey::from_secret(secret), Algorithm::HS256)
            }
            VerificationKey::RsaPem(pem) => {
                let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
                (key, Algorithm::RS256)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        Ok(Self { key, validation })
    }

    /// Convenience constructor for a shared HMAC secret.
    pub fn hs256(secret: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        Self::new(&VerificationKey::Hmac(secret.into()))
    }
}

impl TokenValidator for JwtTokenValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        if token.is_empty() {
            return Err(TokenError::Invalid);
        }

        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            TokenError::Invalid
        })?;

        validate_claims(data.claims, now)
    }
}
