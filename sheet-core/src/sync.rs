//! Cloud save and load.
//!
//! Saving is explicit and never debounced. A save is split in three steps so
//! the store stays editable while the request is out:
//!
//! 1. [`CharacterStore::cloud_snapshot`] captures the document,
//! 2. [`CloudSync::save`] sends it (create or update),
//! 3. [`CharacterStore::complete_cloud_save`] records the result.
//!
//! [`CloudSync::push`] runs all three for callers that hold the store.

use crate::auth::AuthSession;
use crate::character::{LocalId, RemoteId};
use crate::persist::{encode_document, PersistError};
use crate::store::CharacterStore;
use async_trait::async_trait;
use sheet_api::{CharacterDto, Client, CreateCharacterRequest, UpdateCharacterRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("A cloud save is already in progress")]
    InFlight,

    #[error("No character is open")]
    NotOpen,

    #[error("Session expired or rejected; log in again")]
    Unauthorized,

    #[error("Cloud character not found: {0}")]
    NotFound(String),

    #[error("Cloud request failed: {0}")]
    Remote(sheet_api::Error),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

impl From<sheet_api::Error> for SyncError {
    fn from(error: sheet_api::Error) -> Self {
        match error {
            sheet_api::Error::Unauthorized => SyncError::Unauthorized,
            sheet_api::Error::NotFound(message) => SyncError::NotFound(message),
            other => SyncError::Remote(other),
        }
    }
}

/// The remote character collection.
#[async_trait]
pub trait RemoteCharacters: Send + Sync {
    async fn create(&self, name: &str, data: &str) -> Result<CharacterDto, sheet_api::Error>;

    async fn update(
        &self,
        id: &str,
        name: &str,
        data: &str,
    ) -> Result<CharacterDto, sheet_api::Error>;

    async fn list(&self) -> Result<Vec<CharacterDto>, sheet_api::Error>;

    async fn get(&self, id: &str) -> Result<CharacterDto, sheet_api::Error>;

    async fn delete(&self, id: &str) -> Result<(), sheet_api::Error>;
}

#[async_trait]
impl RemoteCharacters for Client {
    async fn create(&self, name: &str, data: &str) -> Result<CharacterDto, sheet_api::Error> {
        self.create_character(&CreateCharacterRequest {
            name: name.to_string(),
            data: data.to_string(),
        })
        .await
    }

    async fn update(
        &self,
        id: &str,
        name: &str,
        data: &str,
    ) -> Result<CharacterDto, sheet_api::Error> {
        self.update_character(
            id,
            &UpdateCharacterRequest {
                name: Some(name.to_string()),
                data: Some(data.to_string()),
            },
        )
        .await
    }

    async fn list(&self) -> Result<Vec<CharacterDto>, sheet_api::Error> {
        self.list_characters().await
    }

    async fn get(&self, id: &str) -> Result<CharacterDto, sheet_api::Error> {
        self.get_character(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), sheet_api::Error> {
        self.delete_character(id).await
    }
}

/// A document captured for upload.
#[derive(Debug, Clone)]
pub struct CloudSnapshot {
    pub local_id: LocalId,
    pub remote_id: Option<RemoteId>,
    pub name: String,
    pub data: String,
    pub revision: u64,
}

/// Outcome of a successful cloud save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudSaved {
    pub local_id: LocalId,
    pub remote_id: RemoteId,
    /// True when a new cloud record was created.
    pub created: bool,
    pub revision: u64,
}

/// Sends characters to, and fetches them from, the remote collection.
pub struct CloudSync {
    remote: Arc<dyn RemoteCharacters>,
    auth: Option<Arc<AuthSession>>,
    in_flight: AtomicBool,
}

impl CloudSync {
    pub fn new(remote: Arc<dyn RemoteCharacters>) -> Self {
        Self {
            remote,
            auth: None,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Log `auth` out whenever the service rejects the token.
    pub fn with_auth(mut self, auth: Arc<AuthSession>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Create the cloud record, or update it when the snapshot has a remote id.
    ///
    /// Only one save runs at a time; a second call while one is outstanding
    /// fails with [`SyncError::InFlight`] without contacting the service.
    pub async fn save(&self, snapshot: CloudSnapshot) -> Result<CloudSaved, SyncError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SyncError::InFlight)?;

        let (result, created) = match &snapshot.remote_id {
            None => (
                self.remote.create(&snapshot.name, &snapshot.data).await,
                true,
            ),
            Some(id) => (
                self.remote
                    .update(id.as_str(), &snapshot.name, &snapshot.data)
                    .await,
                false,
            ),
        };

        let record = result.map_err(|e| self.failed(e))?;
        tracing::info!(
            local_id = %snapshot.local_id,
            remote_id = %record.id,
            created,
            "saved character to cloud"
        );

        Ok(CloudSaved {
            local_id: snapshot.local_id,
            remote_id: RemoteId(record.id),
            created,
            revision: snapshot.revision,
        })
    }

    /// Snapshot, save and record the result for the open character.
    pub async fn push(&self, store: &mut CharacterStore) -> Result<CloudSaved, SyncError> {
        let snapshot = store.cloud_snapshot()?;
        let saved = self.save(snapshot).await?;
        store.complete_cloud_save(&saved);
        Ok(saved)
    }

    /// Open a cloud record in `store` and keep a local copy of it.
    pub async fn pull(&self, store: &mut CharacterStore, id: &str) -> Result<LocalId, SyncError> {
        let record = self.fetch(id).await?;
        let local_id = store.load_from_remote(&record)?;
        store.save_now()?;
        Ok(local_id)
    }

    /// Cloud records, most recently updated first.
    pub async fn list(&self) -> Result<Vec<CharacterDto>, SyncError> {
        self.remote.list().await.map_err(|e| self.failed(e))
    }

    pub async fn fetch(&self, id: &str) -> Result<CharacterDto, SyncError> {
        self.remote.get(id).await.map_err(|e| self.failed(e))
    }

    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        self.remote.delete(id).await.map_err(|e| self.failed(e))
    }

    fn failed(&self, error: sheet_api::Error) -> SyncError {
        let error = SyncError::from(error);
        match &error {
            SyncError::Unauthorized => {
                tracing::warn!("cloud rejected credentials; logging out");
                if let Some(auth) = &self.auth {
                    if let Err(e) = auth.logout() {
                        tracing::warn!(error = %e, "failed to clear auth session");
                    }
                }
            }
            other => tracing::warn!(error = %other, "cloud request failed"),
        }
        error
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl CharacterStore {
    /// Capture the open character for upload.
    pub fn cloud_snapshot(&self) -> Result<CloudSnapshot, SyncError> {
        let local_id = self.local_id().ok_or(SyncError::NotOpen)?;
        Ok(CloudSnapshot {
            local_id,
            remote_id: self.remote_id().cloned(),
            name: self.doc().display_name().to_string(),
            data: encode_document(self.doc())?,
            revision: self.revision(),
        })
    }

    /// Record a finished save. Returns whether it applied to the open
    /// character.
    ///
    /// When a different character has been opened since the snapshot, only
    /// the stored copy of the saved character is linked to the cloud record.
    /// The dirty flag is only cleared if no edit landed while the save was out.
    pub fn complete_cloud_save(&mut self, saved: &CloudSaved) -> bool {
        if self.local_id() != Some(saved.local_id) {
            match self.link_stored(saved.local_id, &saved.remote_id) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(local_id = %saved.local_id, "saved character no longer stored")
                }
                Err(e) => {
                    tracing::warn!(local_id = %saved.local_id, error = %e, "failed to link cloud record")
                }
            }
            return false;
        }
        if self.remote_id() != Some(&saved.remote_id) {
            self.set_remote_id(saved.remote_id.clone());
        }
        self.mark_synced_if_unchanged(saved.revision);
        true
    }
}
