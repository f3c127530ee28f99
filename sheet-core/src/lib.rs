//! D&D 5e character sheet engine.
//!
//! This crate provides:
//! - The character document model and its derived statistics
//! - A record store that recomputes after every edit and autosaves locally
//! - Local persistence, export and import
//! - Cloud save and load through the sheet service
//! - A printable, paginated rendering of a sheet
//!
//! # Quick Start
//!
//! ```ignore
//! use sheet_core::{CharacterStore, FileStore, SheetConfig, SystemClock};
//! use sheet_core::character::Ability;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SheetConfig::from_env()?;
//!     let backend = Arc::new(FileStore::open(config.characters_dir())?);
//!     let mut store = CharacterStore::new(backend, Arc::new(SystemClock));
//!
//!     store.create_new()?;
//!     store.set_ability(Ability::Dexterity, 16);
//!     assert_eq!(store.doc().combat.initiative, 3);
//!
//!     store.flush()?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod autosave;
pub mod character;
pub mod clock;
pub mod config;
pub mod dice;
pub mod edits;
pub mod persist;
pub mod print;
pub mod rules;
pub mod store;
pub mod sync;
pub mod testing;

// Primary public API
pub use auth::{AuthError, AuthSession, Identity};
pub use character::CharacterDocument;
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, SheetConfig};
pub use edits::{NewFeature, NewItem, NewSpell};
pub use persist::{FileStore, LocalCharacter, LocalStore, PersistError};
pub use store::{CharacterStore, Field};
pub use sync::{CloudSaved, CloudSnapshot, CloudSync, RemoteCharacters, SyncError};
