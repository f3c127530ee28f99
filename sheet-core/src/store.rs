//! The character record store.
//!
//! [`CharacterStore`] owns the open character. Every edit goes through
//! [`CharacterStore::apply`]: the current document is cloned, the clone is
//! mutated and recomputed, and the result replaces the current document.
//! Handles returned by [`CharacterStore::document`] are snapshots and are
//! never mutated afterwards.

use crate::autosave::{Autosave, DEFAULT_AUTOSAVE_DELAY};
use crate::character::{
    AbilityScores, Appearance, BasicInfo, CharacterDocument, Combat, Currency, EquipmentItem,
    Feature, LocalId, Personality, Proficiencies, RemoteId, SavingThrows, Skills, Spellcasting,
};
use crate::clock::Clock;
use crate::persist::{decode_document, LocalCharacter, LocalStore, PersistError};
use crate::rules;
use chrono::{DateTime, Utc};
use sheet_api::CharacterDto;
use std::sync::Arc;
use std::time::Duration;

/// Whole-field replacements accepted by [`CharacterStore::set_field`].
///
/// Derived fields (proficiency bonus, initiative, spell DC and attack bonus)
/// are recomputed after the replacement whatever the new value holds.
#[derive(Debug, Clone)]
pub enum Field {
    BasicInfo(BasicInfo),
    Abilities(AbilityScores),
    SavingThrows(SavingThrows),
    Skills(Skills),
    Combat(Combat),
    Equipment(Vec<EquipmentItem>),
    Currency(Currency),
    Spellcasting(Spellcasting),
    Features(Vec<Feature>),
    Proficiencies(Proficiencies),
    Personality(Personality),
    Backstory(String),
    Appearance(Appearance),
    Allies(Vec<String>),
    Notes(String),
}

impl Field {
    fn assign(self, doc: &mut CharacterDocument) {
        match self {
            Field::BasicInfo(v) => doc.basic_info = v,
            Field::Abilities(v) => doc.abilities = v,
            Field::SavingThrows(v) => doc.saving_throws = v,
            Field::Skills(v) => doc.skills = v,
            Field::Combat(v) => doc.combat = v,
            Field::Equipment(v) => doc.equipment = v,
            Field::Currency(v) => doc.currency = v,
            Field::Spellcasting(v) => doc.spellcasting = v,
            Field::Features(v) => doc.features = v,
            Field::Proficiencies(v) => doc.proficiencies = v,
            Field::Personality(v) => doc.personality = v,
            Field::Backstory(v) => doc.backstory = v,
            Field::Appearance(v) => doc.appearance = v,
            Field::Allies(v) => doc.allies = v,
            Field::Notes(v) => doc.notes = v,
        }
    }
}

/// The open character and its persistence state.
pub struct CharacterStore {
    backend: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    autosave: Autosave,
    local_id: Option<LocalId>,
    remote_id: Option<RemoteId>,
    document: Arc<CharacterDocument>,
    created_at: DateTime<Utc>,
    dirty: bool,
    revision: u64,
}

impl CharacterStore {
    /// A store with no open character and the default autosave delay.
    pub fn new(backend: Arc<dyn LocalStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_autosave_delay(backend, clock, DEFAULT_AUTOSAVE_DELAY)
    }

    pub fn with_autosave_delay(
        backend: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        delay: Duration,
    ) -> Self {
        let mut document = CharacterDocument::default();
        rules::recompute(&mut document);
        let created_at = clock.now();

        Self {
            autosave: Autosave::new(Arc::clone(&backend), delay),
            backend,
            clock,
            local_id: None,
            remote_id: None,
            document: Arc::new(document),
            created_at,
            dirty: false,
            revision: 0,
        }
    }

    // ========================================================================
    // Opening characters
    // ========================================================================

    /// Start a fresh character and store it right away.
    pub fn create_new(&mut self) -> Result<LocalId, PersistError> {
        self.autosave.flush()?;

        let mut document = CharacterDocument::default();
        rules::recompute(&mut document);
        let id = LocalId::new();
        let now = self.clock.now();

        let record = LocalCharacter {
            id,
            name: document.display_name().to_string(),
            data: document.clone(),
            created_at: now,
            updated_at: now,
            remote_id: None,
        };
        self.backend.save(&record)?;

        self.local_id = Some(id);
        self.remote_id = None;
        self.document = Arc::new(document);
        self.created_at = now;
        self.dirty = false;
        self.revision = 0;
        self.autosave.note_saved(now);

        tracing::info!(%id, "created character");
        Ok(id)
    }

    /// Open a stored character. Returns `false`, leaving the store as it
    /// was, when no record has this id.
    pub fn load_from_local(&mut self, id: LocalId) -> Result<bool, PersistError> {
        // A pending save may be for this very record.
        self.autosave.flush()?;
        let Some(record) = self.backend.load(id)? else {
            return Ok(false);
        };

        let mut document = record.data;
        rules::recompute(&mut document);

        self.local_id = Some(record.id);
        self.remote_id = record.remote_id;
        self.document = Arc::new(document);
        self.created_at = record.created_at;
        self.dirty = false;
        self.revision = 0;
        self.autosave.reset_last_saved();
        Ok(true)
    }

    /// Open a cloud record as a new local character.
    ///
    /// The character gets a fresh local id; the record's id becomes the
    /// remote id. Nothing is written locally until the first edit.
    pub fn load_from_remote(&mut self, record: &CharacterDto) -> Result<LocalId, PersistError> {
        let mut document = decode_document(&record.data)?;
        rules::recompute(&mut document);
        self.autosave.flush()?;

        let id = LocalId::new();
        self.local_id = Some(id);
        self.remote_id = Some(RemoteId(record.id.clone()));
        self.document = Arc::new(document);
        self.created_at = self.clock.now();
        self.dirty = false;
        self.revision = 0;
        self.autosave.reset_last_saved();

        tracing::info!(%id, remote_id = %record.id, "opened cloud character");
        Ok(id)
    }

    // ========================================================================
    // Editing
    // ========================================================================

    /// Apply an edit to a copy of the document, recompute derived stats and
    /// make the copy current. Schedules an autosave when a character is open.
    pub fn apply<F>(&mut self, mutation: F)
    where
        F: FnOnce(&mut CharacterDocument),
    {
        let mut next = (*self.document).clone();
        mutation(&mut next);
        rules::recompute(&mut next);

        self.document = Arc::new(next);
        self.dirty = true;
        self.revision += 1;

        if let Some(record) = self.snapshot() {
            self.autosave.schedule(record);
        }
    }

    /// Replace one top-level field.
    pub fn set_field(&mut self, field: Field) {
        self.apply(|doc| field.assign(doc));
    }

    /// Clear the dirty flag after a successful cloud save.
    pub fn mark_synced(&mut self) {
        self.dirty = false;
    }

    /// Clear the dirty flag only if no edit landed since `revision` was read.
    pub fn mark_synced_if_unchanged(&mut self, revision: u64) -> bool {
        if self.revision == revision {
            self.dirty = false;
            true
        } else {
            false
        }
    }

    /// Link the open character to a cloud record and persist the link.
    pub fn set_remote_id(&mut self, remote_id: RemoteId) {
        self.remote_id = Some(remote_id);
        if let Some(record) = self.snapshot() {
            self.autosave.schedule(record);
        }
    }

    /// Link a stored record that is not the open character to a cloud
    /// record. Returns whether the record was found.
    pub(crate) fn link_stored(
        &self,
        id: LocalId,
        remote_id: &RemoteId,
    ) -> Result<bool, PersistError> {
        let Some(mut record) = self.backend.load(id)? else {
            return Ok(false);
        };
        if record.remote_id.as_ref() != Some(remote_id) {
            record.remote_id = Some(remote_id.clone());
            self.backend.save(&record)?;
        }
        Ok(true)
    }

    /// Write any pending autosave now.
    pub fn flush(&self) -> Result<bool, PersistError> {
        self.autosave.flush()
    }

    /// Write the open character immediately, superseding any pending save.
    pub fn save_now(&self) -> Result<bool, PersistError> {
        let Some(record) = self.snapshot() else {
            return Ok(false);
        };
        self.autosave.cancel();
        self.backend.save(&record)?;
        self.autosave.note_saved(record.updated_at);
        Ok(true)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Shared handle to the current document.
    pub fn document(&self) -> Arc<CharacterDocument> {
        Arc::clone(&self.document)
    }

    pub fn doc(&self) -> &CharacterDocument {
        &self.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn local_id(&self) -> Option<LocalId> {
        self.local_id
    }

    pub fn remote_id(&self) -> Option<&RemoteId> {
        self.remote_id.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.autosave.last_saved_at()
    }

    pub fn has_pending_save(&self) -> bool {
        self.autosave.is_pending()
    }

    /// Edit counter since the character was opened.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The open character as a storable record, stamped with the current time.
    pub fn snapshot(&self) -> Option<LocalCharacter> {
        let id = self.local_id?;
        Some(LocalCharacter {
            id,
            name: self.document.display_name().to_string(),
            data: (*self.document).clone(),
            created_at: self.created_at,
            updated_at: self.clock.now(),
            remote_id: self.remote_id.clone(),
        })
    }
}
