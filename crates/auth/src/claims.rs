use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Role;

/// Verified bearer-token claims (transport-agnostic).
///
/// Only produced by a [`crate::TokenValidator`] after the signature checked
/// out and the token has not expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity (the principal's email).
    pub subject: String,

    /// Authorities carried by the token, in token order.
    pub roles: Vec<Role>,

    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn has_any_role(&self, required: &[Role]) -> bool {
        crate::roles::intersects(&self.roles, required)
    }
}

/// Why a bearer token was rejected.
///
/// `Expired` is kept apart from `Invalid` so callers can ask the client to
/// re-authenticate instead of reporting a malformed request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not verify")]
    Invalid,

    #[error("token has expired")]
    Expired,
}

/// JWT payload as it appears on the wire.
///
/// Accepts both the standard `sub` and the Spring OAuth2 `user_name` subject
/// claim, and `authorities` or `roles` for the role list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(alias = "user_name")]
    pub sub: String,

    #[serde(default, alias = "roles")]
    pub authorities: Vec<String>,

    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(subject: impl Into<String>, roles: &[Role], expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: subject.into(),
            authorities: roles.iter().map(|r| r.as_str().to_owned()).collect(),
            exp: expires_at.timestamp(),
        }
    }
}

/// Check the time window of decoded claims and lift them into [`Claims`].
///
/// Signature verification happens before this, in the validator.
pub fn validate_claims(raw: TokenClaims, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    if raw.sub.trim().is_empty() {
        return Err(TokenError::Invalid);
    }

    let expires_at = DateTime::<Utc>::from_timestamp(raw.exp, 0).ok_or(TokenError::Invalid)?;
    if now >= expires_at {
        return Err(TokenError::Expired);
    }

    Ok(Claims {
        subject: raw.sub,
        roles: raw.authorities.into_iter().map(Role::from).collect(),
        expires_at,
    })
}
