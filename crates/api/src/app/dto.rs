use serde::{Deserialize, Serialize};

use crate::context::PrincipalContext;

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub subject: String,
    pub roles: Vec<String>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<&PrincipalContext> for WhoAmIResponse {
    fn from(principal: &PrincipalContext) -> Self {
        Self {
            subject: principal.subject().to_string(),
            roles: principal.roles().iter().map(|r| r.as_str().to_string()).collect(),
            expires_at: principal.expires_at(),
        }
    }
}

/// `GET /admin/authz/explain` query string. `method` defaults to `GET`.
#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub subject: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
}

fn default_method() -> String {
    "GET".to_string()
}
