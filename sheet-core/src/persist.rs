//! Local character persistence, export and import.
//!
//! Characters are stored as [`LocalCharacter`] records keyed by [`LocalId`].
//! The on-disk [`FileStore`] keeps one JSON file per record plus an index of
//! ids; the same record shape is used as the portable export format.

use crate::character::{CharacterDocument, LocalId, RemoteId, DOCUMENT_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tokio::fs;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid character format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Character not found: {0}")]
    NotFound(LocalId),
}

// ============================================================================
// Document codec
// ============================================================================

/// Serialize a document to its compact JSON payload.
pub fn encode_document(doc: &CharacterDocument) -> Result<String, PersistError> {
    Ok(serde_json::to_string(doc)?)
}

/// Parse a JSON payload into a document, migrating older versions.
pub fn decode_document(raw: &str) -> Result<CharacterDocument, PersistError> {
    let value: Value = serde_json::from_str(raw)?;
    document_from_value(value)
}

/// Build a document from parsed JSON, migrating older versions.
///
/// Payloads without a `version` are treated as version 1. Payloads from a
/// newer version are rejected rather than silently dropping fields.
pub fn document_from_value(value: Value) -> Result<CharacterDocument, PersistError> {
    let Value::Object(mut map) = value else {
        return Err(PersistError::InvalidFormat(
            "character data must be a JSON object".to_string(),
        ));
    };

    let found = match map.get("version") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| PersistError::InvalidFormat(format!("bad version: {v}")))?,
    };

    if found > DOCUMENT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: DOCUMENT_VERSION,
            found,
        });
    }
    if found < 2 {
        migrate_v1(&mut map);
    }
    map.insert("version".to_string(), Value::from(DOCUMENT_VERSION));

    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Version 1 kept racial and background traits in a separate top-level
/// `traits` list. Version 2 folds them into `features`.
fn migrate_v1(map: &mut Map<String, Value>) {
    let Some(Value::Array(traits)) = map.remove("traits") else {
        return;
    };

    let category = Value::from("trait");
    let features = map
        .entry("features")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !features.is_array() {
        *features = Value::Array(Vec::new());
    }

    if let Value::Array(features) = features {
        for mut entry in traits {
            if let Value::Object(fields) = &mut entry {
                fields.insert("category".to_string(), category.clone());
                features.push(entry);
            }
        }
    }
}

fn deserialize_document<'de, D>(deserializer: D) -> Result<CharacterDocument, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = match Value::deserialize(deserializer)? {
        // Some exports carry the document as an encoded string.
        Value::String(raw) => serde_json::from_str(&raw).map_err(D::Error::custom)?,
        other => other,
    };
    document_from_value(value).map_err(D::Error::custom)
}

// ============================================================================
// Local records
// ============================================================================

/// A character as kept on this device, and as exported to a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalCharacter {
    pub id: LocalId,
    #[serde(default)]
    pub name: String,
    #[serde(deserialize_with = "deserialize_document")]
    pub data: CharacterDocument,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Cloud record this character was last pushed to or pulled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<RemoteId>,
}

impl LocalCharacter {
    pub fn summary(&self) -> CharacterSummary {
        CharacterSummary {
            id: self.id,
            name: self.data.display_name().to_string(),
            race: self.data.basic_info.race.clone(),
            class_name: self.data.basic_info.class_name.clone(),
            level: self.data.basic_info.level,
            updated_at: self.updated_at,
            remote_id: self.remote_id.clone(),
        }
    }
}

/// Listing entry for a stored character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterSummary {
    pub id: LocalId,
    pub name: String,
    pub race: String,
    pub class_name: String,
    pub level: u32,
    pub updated_at: DateTime<Utc>,
    pub remote_id: Option<RemoteId>,
}

/// On-device character storage keyed by local id.
pub trait LocalStore: Send + Sync {
    /// Insert or replace the record with `character.id`.
    fn save(&self, character: &LocalCharacter) -> Result<(), PersistError>;

    /// `Ok(None)` when no record has this id.
    fn load(&self, id: LocalId) -> Result<Option<LocalCharacter>, PersistError>;

    /// Summaries of every stored record, in insertion order.
    fn list(&self) -> Result<Vec<CharacterSummary>, PersistError>;

    /// Remove a record. Returns whether anything was removed.
    fn delete(&self, id: LocalId) -> Result<bool, PersistError>;
}

const INDEX_FILE: &str = "index.json";

/// Directory-backed store: `<id>.json` per record plus `index.json`.
pub struct FileStore {
    dir: PathBuf,
    // Serializes index read-modify-write cycles.
    lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: LocalId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_index(&self) -> Result<Vec<LocalId>, PersistError> {
        let path = self.dir.join(INDEX_FILE);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_index(&self, ids: &[LocalId]) -> Result<(), PersistError> {
        write_atomic(&self.dir.join(INDEX_FILE), &serde_json::to_string(ids)?)
    }

    fn read_record(&self, id: LocalId) -> Result<Option<LocalCharacter>, PersistError> {
        match std::fs::read_to_string(self.record_path(id)) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl LocalStore for FileStore {
    fn save(&self, character: &LocalCharacter) -> Result<(), PersistError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let content = serde_json::to_string(character)?;
        write_atomic(&self.record_path(character.id), &content)?;

        let mut ids = self.read_index()?;
        if !ids.contains(&character.id) {
            ids.push(character.id);
            self.write_index(&ids)?;
        }
        Ok(())
    }

    fn load(&self, id: LocalId) -> Result<Option<LocalCharacter>, PersistError> {
        self.read_record(id)
    }

    fn list(&self) -> Result<Vec<CharacterSummary>, PersistError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut summaries = Vec::new();
        for id in self.read_index()? {
            match self.read_record(id) {
                Ok(Some(character)) => summaries.push(character.summary()),
                Ok(None) => tracing::debug!(%id, "index entry without a record"),
                Err(e) => tracing::warn!(%id, error = %e, "skipping unreadable character"),
            }
        }
        Ok(summaries)
    }

    fn delete(&self, id: LocalId) -> Result<bool, PersistError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let removed_file = match std::fs::remove_file(self.record_path(id)) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let mut ids = self.read_index()?;
        let before = ids.len();
        ids.retain(|i| *i != id);
        let removed_index = ids.len() != before;
        if removed_index {
            self.write_index(&ids)?;
        }

        Ok(removed_file || removed_index)
    }
}

/// Write through a temporary file so readers never see a torn record.
fn write_atomic(path: &Path, content: &str) -> Result<(), PersistError> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ============================================================================
// Export / Import
// ============================================================================

/// Pretty-printed export file contents.
pub fn export_json(character: &LocalCharacter) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(character)?)
}

/// Suggested export file name: the character name with whitespace replaced.
pub fn export_file_name(character: &LocalCharacter) -> String {
    let name = character.name.trim();
    let name = if name.is_empty() { "character" } else { name };
    let sanitized = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect::<String>();
    format!("{sanitized}.json")
}

/// Write an export file.
pub async fn export_to_file(
    character: &LocalCharacter,
    path: impl AsRef<Path>,
) -> Result<(), PersistError> {
    let content = export_json(character)?;
    fs::write(path, content).await?;
    Ok(())
}

/// Parse an export file into a new record.
///
/// The embedded id and any cloud link are discarded and a fresh id assigned;
/// `updatedAt` becomes `now`. `createdAt` is kept when present.
pub fn import_json(raw: &str, now: DateTime<Utc>) -> Result<LocalCharacter, PersistError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Partial {
        #[serde(default)]
        name: Option<String>,
        #[serde(deserialize_with = "deserialize_document")]
        data: CharacterDocument,
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    }

    let value: Value = serde_json::from_str(raw)?;
    if !value.get("data").is_some_and(|d| !d.is_null()) {
        return Err(PersistError::InvalidFormat(
            "missing character data".to_string(),
        ));
    }
    let partial: Partial = serde_json::from_value(value)?;

    let name = partial
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| partial.data.basic_info.name.clone());

    Ok(LocalCharacter {
        id: LocalId::new(),
        name,
        data: partial.data,
        created_at: partial.created_at.unwrap_or(now),
        updated_at: now,
        remote_id: None,
    })
}

/// Read an export file from disk and store it as a new record.
pub async fn import_file(
    store: &dyn LocalStore,
    path: impl AsRef<Path>,
    now: DateTime<Utc>,
) -> Result<LocalCharacter, PersistError> {
    let raw = fs::read_to_string(path).await?;
    import_into(store, &raw, now)
}

/// Parse `raw` and store it as a new record. Nothing is stored on error.
pub fn import_into(
    store: &dyn LocalStore,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<LocalCharacter, PersistError> {
    let character = import_json(raw, now)?;
    store.save(&character)?;
    tracing::info!(id = %character.id, name = %character.name, "imported character");
    Ok(character)
}
