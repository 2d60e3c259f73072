//! Account/session types and the current-user lookup.
//!
//! Interactive sign-in flows live in the apps; the engine only needs to
//! know who the current account is.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

/// A persisted auth session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now().timestamp() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Platform-specific persistence for the auth session
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> Result<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> Result<()>;
    fn clear_session(&self) -> Result<()>;
}

/// Current-user lookup consumed by the sync engine (async)
#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    /// The signed-in account, or `None` when nobody is signed in.
    async fn current_user(&self) -> Result<Option<AuthUser>>;
}

/// `AuthProvider` backed by a persisted session.
#[derive(Clone)]
pub struct SessionAuth<S: SessionPersistence> {
    store: S,
}

impl<S: SessionPersistence> SessionAuth<S> {
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }
}

impl<S: SessionPersistence> AuthProvider for SessionAuth<S> {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        let Some(session) = self.store.load_session()? else {
            return Ok(None);
        };

        if session.is_expired() {
            tracing::debug!("Stored session for {} has expired", session.user.id);
            return Ok(None);
        }

        Ok(Some(session.user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct FixedStore(Option<AuthSession>);

    impl SessionPersistence for FixedStore {
        fn load_session(&self) -> Result<Option<AuthSession>> {
            Ok(self.0.clone())
        }

        fn save_session(&self, _session: &AuthSession) -> Result<()> {
            Ok(())
        }

        fn clear_session(&self) -> Result<()> {
            Ok(())
        }
    }

    fn session(expires_at: i64) -> AuthSession {
        AuthSession {
            access_token: "secret-access".to_string(),
            refresh_token: "secret-refresh".to_string(),
            expires_at,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("farm@example.com".to_string()),
            },
        }
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let debug = format!("{:?}", session(123));
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn current_user_returns_unexpired_session_user() {
        let future = chrono::Utc::now().timestamp() + 3600;
        let auth = SessionAuth::new(FixedStore(Some(session(future))));
        let user = auth.current_user().await.unwrap().unwrap();
        assert_eq!(user.id, "user-1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn current_user_ignores_expired_session() {
        let auth = SessionAuth::new(FixedStore(Some(session(0))));
        assert!(auth.current_user().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn current_user_none_without_session() {
        let auth = SessionAuth::new(FixedStore(None));
        assert!(auth.current_user().await.unwrap().is_none());
    }
}
