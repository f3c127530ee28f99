//! Cached login session.
//!
//! The identity and bearer token issued at login are kept in memory and,
//! when a path is configured, in an `auth.json` file so later runs start
//! logged in.

use crate::persist::PersistError;
use serde::{Deserialize, Serialize};
use sheet_api::{AuthResponse, Client, LoginRequest, RegisterRequest};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] sheet_api::Error),

    #[error("Failed to store session: {0}")]
    Persist(#[from] PersistError),
}

/// A logged-in user and their token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires_at: String,
}

impl From<AuthResponse> for Identity {
    fn from(response: AuthResponse) -> Self {
        Self {
            user_id: response.user_id,
            username: response.username,
            email: response.email,
            token: response.token,
            expires_at: response.expires_at,
        }
    }
}

pub struct AuthSession {
    path: Option<PathBuf>,
    identity: Mutex<Option<Identity>>,
}

impl AuthSession {
    /// A session that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            identity: Mutex::new(None),
        }
    }

    /// Load the session cached at `path`, if any.
    ///
    /// An unreadable cache counts as logged out.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identity = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Identity>(&content) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt auth cache");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path: Some(path),
            identity: Mutex::new(identity),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.lock().as_ref().map(|i| i.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_some()
    }

    /// `base` with this session's token attached, if logged in.
    pub fn client(&self, base: &Client) -> Client {
        match self.token() {
            Some(token) => base.clone().with_token(token),
            None => base.clone(),
        }
    }

    /// Remember a login or registration response.
    pub fn store(&self, response: AuthResponse) -> Result<Identity, PersistError> {
        let identity = Identity::from(response);
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&identity)?)?;
        }
        *self.lock() = Some(identity.clone());
        tracing::info!(username = %identity.username, "logged in");
        Ok(identity)
    }

    /// Forget the identity and token, in memory and on disk.
    pub fn logout(&self) -> Result<(), PersistError> {
        let was_logged_in = self.lock().take().is_some();
        if let Some(path) = &self.path {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if was_logged_in {
            tracing::info!("logged out");
        }
        Ok(())
    }

    pub async fn login(
        &self,
        client: &Client,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let response = client
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(self.store(response)?)
    }

    pub async fn register(
        &self,
        client: &Client,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let response = client
            .register(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        Ok(self.store(response)?)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Identity>> {
        self.identity.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> AuthResponse {
        AuthResponse {
            user_id: "u-1".to_string(),
            username: "vex".to_string(),
            email: "vex@example.com".to_string(),
            token: "token-abc".to_string(),
            expires_at: "2030-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_in_memory_session() {
        let session = AuthSession::in_memory();
        assert!(!session.is_authenticated());

        session.store(response()).unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("token-abc"));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.identity(), None);
    }

    #[test]
    fn test_session_survives_reopen() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("auth.json");

        AuthSession::open(&path).store(response()).unwrap();
        assert!(path.exists());

        let reopened = AuthSession::open(&path);
        assert_eq!(reopened.identity().unwrap().username, "vex");

        reopened.logout().unwrap();
        assert!(!path.exists());
        assert!(!AuthSession::open(&path).is_authenticated());
    }

    #[test]
    fn test_corrupt_cache_is_logged_out() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("auth.json");
        std::fs::write(&path, "{nope").unwrap();

        assert!(!AuthSession::open(&path).is_authenticated());
    }

    #[test]
    fn test_client_carries_token() {
        let session = AuthSession::in_memory();
        let base = Client::new(sheet_api::DEFAULT_API_URL);
        assert!(!session.client(&base).has_token());

        session.store(response()).unwrap();
        assert!(session.client(&base).has_token());
    }
}
