//! Test doubles for the character store and cloud sync.
//!
//! - `MemoryStore`: an in-memory [`LocalStore`] that counts writes
//! - `MemoryRemote`: an in-memory [`RemoteCharacters`] with scripted failures
//!   and an optional gate that holds requests open
//! - `FixedClock`: a [`Clock`] that only moves when told to

use crate::character::{Ability, CharacterDocument, LocalId, Skill};
use crate::clock::Clock;
use crate::persist::{CharacterSummary, LocalCharacter, LocalStore, PersistError};
use crate::rules;
use crate::sync::RemoteCharacters;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sheet_api::CharacterDto;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ============================================================================
// Local store
// ============================================================================

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<LocalCharacter>>,
    saves: AtomicUsize,
    fail_next: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful writes so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make the next `save` fail with an I/O error.
    pub fn fail_next_save(&self) {
        *lock(&self.fail_next) = true;
    }

    pub fn get(&self, id: LocalId) -> Option<LocalCharacter> {
        lock(&self.records).iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LocalStore for MemoryStore {
    fn save(&self, character: &LocalCharacter) -> Result<(), PersistError> {
        if std::mem::take(&mut *lock(&self.fail_next)) {
            return Err(PersistError::Io(std::io::Error::other("scripted failure")));
        }

        let mut records = lock(&self.records);
        match records.iter_mut().find(|r| r.id == character.id) {
            Some(existing) => *existing = character.clone(),
            None => records.push(character.clone()),
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn load(&self, id: LocalId) -> Result<Option<LocalCharacter>, PersistError> {
        Ok(self.get(id))
    }

    fn list(&self) -> Result<Vec<CharacterSummary>, PersistError> {
        Ok(lock(&self.records).iter().map(|r| r.summary()).collect())
    }

    fn delete(&self, id: LocalId) -> Result<bool, PersistError> {
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

// ============================================================================
// Remote collection
// ============================================================================

/// In-memory cloud collection.
pub struct MemoryRemote {
    records: Mutex<Vec<CharacterDto>>,
    next_id: AtomicUsize,
    creates: AtomicUsize,
    updates: AtomicUsize,
    failures: Mutex<Vec<sheet_api::Error>>,
    gate: Option<Semaphore>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            creates: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// A remote whose create and update calls wait for [`release`](Self::release).
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    /// Let one held request proceed.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Fail the next request with `error`. Queued failures apply in order.
    pub fn fail_next(&self, error: sheet_api::Error) {
        lock(&self.failures).push(error);
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<CharacterDto> {
        lock(&self.records).clone()
    }

    /// Seed a record directly, returning its id.
    pub fn insert(&self, name: &str, doc: &CharacterDocument) -> String {
        let id = self.allocate_id();
        lock(&self.records).push(CharacterDto {
            id: id.clone(),
            user_id: "user-1".to_string(),
            name: name.to_string(),
            data: serde_json::to_string(doc).unwrap_or_default(),
            created_at: String::new(),
            updated_at: String::new(),
        });
        id
    }

    fn allocate_id(&self) -> String {
        format!("remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn take_failure(&self) -> Result<(), sheet_api::Error> {
        let mut failures = lock(&self.failures);
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.remove(0))
        }
    }

    async fn wait_for_gate(&self) {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

#[async_trait]
impl RemoteCharacters for MemoryRemote {
    async fn create(&self, name: &str, data: &str) -> Result<CharacterDto, sheet_api::Error> {
        self.wait_for_gate().await;
        self.take_failure()?;

        let record = CharacterDto {
            id: self.allocate_id(),
            user_id: "user-1".to_string(),
            name: name.to_string(),
            data: data.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        };
        lock(&self.records).push(record.clone());
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(record)
    }

    async fn update(
        &self,
        id: &str,
        name: &str,
        data: &str,
    ) -> Result<CharacterDto, sheet_api::Error> {
        self.wait_for_gate().await;
        self.take_failure()?;

        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| sheet_api::Error::NotFound("Character not found.".to_string()))?;
        record.name = name.to_string();
        record.data = data.to_string();
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<CharacterDto>, sheet_api::Error> {
        self.take_failure()?;
        Ok(self.records())
    }

    async fn get(&self, id: &str) -> Result<CharacterDto, sheet_api::Error> {
        self.take_failure()?;
        lock(&self.records)
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| sheet_api::Error::NotFound("Character not found.".to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), sheet_api::Error> {
        self.take_failure()?;
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(sheet_api::Error::NotFound("Character not found.".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// A clock that stands still until advanced.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();
        Self::at(start)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A level 5 wizard with a few trained skills, recomputed.
pub fn sample_wizard(name: &str) -> CharacterDocument {
    let mut doc = CharacterDocument::default();
    doc.basic_info.name = name.to_string();
    doc.basic_info.race = "High Elf".to_string();
    doc.basic_info.class_name = "Wizard".to_string();
    doc.basic_info.level = 5;
    doc.abilities.set(Ability::Dexterity, 14);
    doc.abilities.set(Ability::Intelligence, 18);
    doc.saving_throws.get_mut(Ability::Intelligence).proficient = true;
    doc.saving_throws.get_mut(Ability::Wisdom).proficient = true;
    doc.skills.get_mut(Skill::Arcana).proficient = true;
    doc.skills.get_mut(Skill::History).proficient = true;
    doc.spellcasting.spellcasting_ability = Some(Ability::Intelligence);
    rules::recompute(&mut doc);
    doc
}
