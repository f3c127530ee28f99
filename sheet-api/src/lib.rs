//! Client for the character sheet web service.
//!
//! This crate provides:
//! - Account registration and login (bearer token issuance)
//! - The per-user remote character collection (`/characters`)
//! - Read-only reference data lookups in [`catalog`]
//!
//! Character payloads are opaque strings here; interpreting them is the
//! caller's job.

pub mod catalog;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default service location, matching the development server.
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Errors that can occur when talking to the service.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Not logged in")]
    NoToken,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Credential rejected or expired")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether retrying the same request later might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Character sheet service client.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Client {
    /// Create a client for the service rooted at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Create a client from the SHEET_API_URL environment variable.
    pub fn from_env() -> Self {
        let base = std::env::var("SHEET_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(base)
    }

    /// Attach a bearer token to every subsequent request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Create an account and receive a token for it.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, Error> {
        let builder = self.http.post(self.url("/auth/register")).json(request);
        self.send(builder).await
    }

    /// Exchange credentials for a token.
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, Error> {
        let builder = self.http.post(self.url("/auth/login")).json(request);
        self.send(builder).await
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// List the caller's characters, most recently updated first.
    pub async fn list_characters(&self) -> Result<Vec<CharacterDto>, Error> {
        let builder = self.authorized(self.http.get(self.url("/characters")))?;
        self.send(builder).await
    }

    pub async fn get_character(&self, id: &str) -> Result<CharacterDto, Error> {
        let builder = self.authorized(self.http.get(self.url(&format!("/characters/{id}"))))?;
        self.send(builder).await
    }

    pub async fn create_character(
        &self,
        request: &CreateCharacterRequest,
    ) -> Result<CharacterDto, Error> {
        let builder = self.authorized(self.http.post(self.url("/characters")).json(request))?;
        self.send(builder).await
    }

    /// Update name and/or data; omitted fields are left untouched.
    pub async fn update_character(
        &self,
        id: &str,
        request: &UpdateCharacterRequest,
    ) -> Result<CharacterDto, Error> {
        let builder = self.authorized(
            self.http
                .put(self.url(&format!("/characters/{id}")))
                .json(request),
        )?;
        self.send(builder).await
    }

    pub async fn delete_character(&self, id: &str) -> Result<(), Error> {
        let builder =
            self.authorized(self.http.delete(self.url(&format!("/characters/{id}"))))?;
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder, Error> {
        let token = self.token.as_deref().ok_or(Error::NoToken)?;
        Ok(builder.bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T, Error> {
        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(status, "service request failed");
            return Err(error_for_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

/// Map a non-success response to an error.
///
/// The service reports failures as `{"message": ..., "statusCode": ...}`; the
/// message is used when present, otherwise the raw body.
pub fn error_for_status(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        401 => Error::Unauthorized,
        404 => Error::NotFound(message),
        _ => Error::Api { status, message },
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Identity and token issued on login or registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub token: String,
    pub expires_at: String,
}

/// A stored character. `data` is the serialized sheet, never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDto {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCharacterRequest {
    pub name: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCharacterRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    message: String,
}
