use chrono::{DateTime, Utc};

use marquee_auth::{Claims, Role};

/// Principal context for a request (verified token subject + roles).
///
/// Only present on routes that required a token; public routes never see one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    subject: String,
    roles: Vec<Role>,
    expires_at: DateTime<Utc>,
}

impl PrincipalContext {
    pub fn new(subject: impl Into<String>, roles: Vec<Role>, expires_at: DateTime<Utc>) -> Self {
        Self {
            subject: subject.into(),
            roles,
            expires_at,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl From<Claims> for PrincipalContext {
    fn from(claims: Claims) -> Self {
        Self::new(claims.subject, claims.roles, claims.expires_at)
    }
}
