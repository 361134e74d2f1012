use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::Role;

/// An account as known to the user directory.
///
/// Constructed per lookup and never cached by the authorization core. The
/// request path relies on the roles embedded in verified claims instead.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    /// Unique identifying attribute (email).
    pub identifier: String,
    /// Opaque credential hash; only the token-issuing side reads it.
    pub password_hash: String,
    /// Granted roles. May be empty, which fails every role-gated check.
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(
        identifier: impl Into<String>,
        password_hash: impl Into<String>,
        roles: Vec<Role>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            password_hash: password_hash.into(),
            roles,
        }
    }
}

impl core::fmt::Debug for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Principal")
            .field("identifier", &self.identifier)
            .field("password_hash", &"<redacted>")
            .field("roles", &self.roles)
            .finish()
    }
}

/// Storage-side failure of a principal lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("principal store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalError {
    #[error("principal not found")]
    NotFound,
}

/// Persistence capability: find a principal by its identifying attribute.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, StoreError>;
}

#[async_trait]
impl<S> PrincipalStore for Arc<S>
where
    S: PrincipalStore + ?Sized,
{
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, StoreError> {
        (**self).find_by_identifier(identifier).await
    }
}

/// Load a principal with a bounded wait.
///
/// Missing records, storage errors and timeouts all collapse to `NotFound`.
pub async fn load_principal(
    store: &dyn PrincipalStore,
    identifier: &str,
    timeout: Duration,
) -> Result<Principal, PrincipalError> {
    match tokio::time::timeout(timeout, store.find_by_identifier(identifier)).await {
        Ok(Ok(Some(principal))) => Ok(principal),
        Ok(Ok(None)) => Err(PrincipalError::NotFound),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "principal lookup failed");
            Err(PrincipalError::NotFound)
        }
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "principal lookup timed out");
            Err(PrincipalError::NotFound)
        }
    }
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPrincipalStore {
    inner: RwLock<HashMap<String, Principal>>,
}

impl InMemoryPrincipalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_principals(principals: impl IntoIterator<Item = Principal>) -> Self {
        let store = Self::new();
        for p in principals {
            store.insert(p);
        }
        store
    }

    /// Insert or replace by identifier.
    pub fn insert(&self, principal: Principal) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(principal.identifier.clone(), principal);
        }
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(map.get(identifier).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    #[async_trait]
    impl PrincipalStore for FailingStore {
        async fn find_by_identifier(
            &self,
            _identifier: &str,
        ) -> Result<Option<Principal>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl PrincipalStore for SlowStore {
        async fn find_by_identifier(
            &self,
            identifier: &str,
        ) -> Result<Option<Principal>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(Principal::new(identifier, "", vec![Role::ADMIN])))
        }
    }

    #[tokio::test]
    async fn loads_existing_principal() {
        let store = InMemoryPrincipalStore::with_principals([Principal::new(
            "maria@gmail.com",
            "$2a$10$hash",
            vec![Role::CLIENT, Role::ADMIN],
        )]);

        let p = load_principal(&store, "maria@gmail.com", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(p.roles, vec![Role::CLIENT, Role::ADMIN]);
    }

    #[tokio::test]
    async fn unknown_identifier_is_not_found() {
        let store = InMemoryPrincipalStore::new();
        let err = load_principal(&store, "nobody@gmail.com", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, PrincipalError::NotFound);
    }

    #[tokio::test]
    async fn storage_failure_fails_closed() {
        let err = load_principal(&FailingStore, "maria@gmail.com", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, PrincipalError::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fails_closed() {
        let err = load_principal(&SlowStore, "maria@gmail.com", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert_eq!(err, PrincipalError::NotFound);
    }

    #[test]
    fn debug_output_redacts_password_hash() {
        let p = Principal::new("maria@gmail.com", "$2a$10$secret", vec![]);
        let dbg = format!("{p:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("maria@gmail.com"));
    }
}
