use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Named authority granted to a principal (e.g. `ADMIN`, `CLIENT`).
///
/// Roles are opaque at this layer. Equality is exact and case-sensitive:
/// `admin` and `ADMIN` are different roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("ADMIN"));
    pub const CLIENT: Role = Role(Cow::Borrowed("CLIENT"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self(Cow::Owned(value.to_owned()))
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Whether `held` and `required` share at least one role.
pub fn intersects(held: &[Role], required: &[Role]) -> bool {
    held.iter().any(|r| required.contains(r))
}
