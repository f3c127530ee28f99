//! QA tests for the character record store.
//!
//! These tests drive the store the way a front end does: open a character,
//! edit it, and check derived stats and autosave behaviour.
//! Run with: `cargo test -p sheet-core --test qa_store`

use sheet_core::character::{Ability, Skill};
use sheet_core::rules;
use sheet_core::testing::{FixedClock, MemoryStore};
use sheet_core::{CharacterStore, Field, LocalStore, NewItem};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<MemoryStore>, CharacterStore) {
    let backend = Arc::new(MemoryStore::new());
    let store = CharacterStore::new(backend.clone(), Arc::new(FixedClock::default()));
    (backend, store)
}

fn skill_bonus(store: &CharacterStore, skill: Skill) -> i32 {
    rules::all_skill_bonuses(store.doc())
        .into_iter()
        .find(|(s, _)| *s == skill)
        .map(|(_, bonus)| bonus)
        .expect("every skill has a bonus")
}

// =============================================================================
// Derived stats
// =============================================================================

#[tokio::test]
async fn test_new_character_baseline() {
    let (_, mut store) = setup();
    store.create_new().expect("create should succeed");

    let doc = store.doc();
    assert_eq!(doc.proficiency_bonus, 2);
    assert_eq!(doc.combat.initiative, 0);
    for ability in Ability::all() {
        assert_eq!(doc.abilities.modifier(ability), 0);
    }
    for skill in Skill::all() {
        assert_eq!(skill_bonus(&store, skill), 0);
    }
}

#[tokio::test]
async fn test_edits_drive_derivations() {
    let (_, mut store) = setup();
    store.create_new().expect("create should succeed");

    assert!(store.set_ability(Ability::Dexterity, 16));
    assert_eq!(store.doc().combat.initiative, 3);

    assert!(store.set_level(5));
    assert_eq!(store.doc().proficiency_bonus, 3);

    assert!(store.set_ability(Ability::Wisdom, 14));
    store.cycle_skill(Skill::Perception);
    assert_eq!(skill_bonus(&store, Skill::Perception), 5);

    store.cycle_skill(Skill::Perception);
    assert_eq!(skill_bonus(&store, Skill::Perception), 8);
}

#[tokio::test]
async fn test_spellcasting_follows_ability() {
    let (_, mut store) = setup();
    store.create_new().expect("create should succeed");

    store.set_level(5);
    store.set_ability(Ability::Intelligence, 18);
    store.set_spellcasting_ability(Some(Ability::Intelligence));
    assert_eq!(store.doc().spellcasting.spell_save_dc, 15);
    assert_eq!(store.doc().spellcasting.spell_attack_bonus, 7);

    // Raising the score moves the numbers while the ability is selected.
    store.set_ability(Ability::Intelligence, 20);
    assert_eq!(store.doc().spellcasting.spell_save_dc, 16);

    // Once cleared, they stay where they were.
    store.set_spellcasting_ability(None);
    store.set_ability(Ability::Intelligence, 8);
    assert_eq!(store.doc().spellcasting.spell_save_dc, 16);
    assert_eq!(store.doc().spellcasting.spell_attack_bonus, 8);
}

#[tokio::test]
async fn test_set_field_recomputes() {
    let (_, mut store) = setup();
    store.create_new().expect("create should succeed");

    let mut info = store.doc().basic_info.clone();
    info.level = 17;
    store.set_field(Field::BasicInfo(info));

    assert_eq!(store.doc().proficiency_bonus, 6);
    assert!(store.is_dirty());
}

// =============================================================================
// Autosave
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_three_quick_edits_write_once() {
    let (backend, mut store) = setup();
    let id = store.create_new().expect("create should succeed");
    let baseline = backend.save_count();

    store.set_name("First");
    tokio::time::sleep(Duration::from_millis(100)).await;
    store.set_name("Second");
    tokio::time::sleep(Duration::from_millis(100)).await;
    store.set_name("Third");

    tokio::time::sleep(Duration::from_millis(499)).await;
    assert_eq!(backend.save_count(), baseline);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(backend.save_count(), baseline + 1);

    let saved = backend.get(id).expect("record should exist");
    assert_eq!(saved.name, "Third");
    assert_eq!(saved.data.basic_info.name, "Third");
    assert!(store.last_saved_at().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_flush_before_switching_characters() {
    let (backend, mut store) = setup();
    let first = store.create_new().expect("create should succeed");
    store.set_name("Pending");

    // Opening another character writes the pending edit first.
    store.create_new().expect("create should succeed");
    assert_eq!(backend.get(first).expect("stored").name, "Pending");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(backend.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reopening_open_character_keeps_pending_edit() {
    let (backend, mut store) = setup();
    let id = store.create_new().expect("create should succeed");

    store.set_name("Edited");
    assert!(store.has_pending_save());
    assert!(store.load_from_local(id).expect("load should succeed"));
    assert_eq!(store.doc().basic_info.name, "Edited");

    store.set_level(2);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let saved = backend.get(id).expect("record should exist");
    assert_eq!(saved.data.basic_info.name, "Edited");
    assert_eq!(saved.data.basic_info.level, 2);
    assert_eq!(store.doc().basic_info.name, "Edited");
}

#[tokio::test(start_paused = true)]
async fn test_reload_restores_edits() {
    let (backend, mut store) = setup();
    let id = store.create_new().expect("create should succeed");

    store.set_ability(Ability::Strength, 17);
    store
        .add_item(NewItem::named("Longsword"))
        .expect("item should be accepted");
    tokio::time::sleep(Duration::from_millis(600)).await;

    let mut reopened = CharacterStore::new(backend.clone(), Arc::new(FixedClock::default()));
    assert!(reopened.load_from_local(id).expect("load should succeed"));
    assert_eq!(reopened.doc().abilities.strength, 17);
    assert_eq!(reopened.doc().equipment[0].name, "Longsword");
    assert!(!reopened.is_dirty());
}

#[tokio::test]
async fn test_deleted_character_cannot_be_opened() {
    let (backend, mut store) = setup();
    let id = store.create_new().expect("create should succeed");

    assert!(backend.delete(id).expect("delete should succeed"));
    let mut other = CharacterStore::new(backend.clone(), Arc::new(FixedClock::default()));
    assert!(!other.load_from_local(id).expect("load should succeed"));
    assert_eq!(other.local_id(), None);
}
