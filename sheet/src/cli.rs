//! Command-line arguments.

use clap::{Parser, Subcommand};
use sheet_core::character::{Ability, LocalId, Skill};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "sheet")]
#[command(about = "Create, edit, print and sync D&D 5e character sheets")]
pub struct Cli {
    /// Data directory for characters and the login session
    #[arg(long, env = "SHEET_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a new character
    New {
        /// Character name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List stored characters, most recently created last
    List,

    /// Show a character's sheet with derived stats
    Show { id: LocalId },

    /// Delete a stored character
    Delete { id: LocalId },

    /// Write a character to a portable JSON file
    Export {
        id: LocalId,

        /// Output file (defaults to `<Name>.json`)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Store a character from an exported JSON file
    Import { file: PathBuf },

    /// Render a printable sheet
    Print {
        id: LocalId,

        /// Output file (defaults to `<Name>_Level<N>_<Class>.txt`)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Set an ability score (1-30)
    Ability {
        id: LocalId,
        ability: Ability,
        score: i32,
    },

    /// Set the character level (1-20)
    Level { id: LocalId, level: u32 },

    /// Cycle a skill through untrained, proficient and expertise
    Skill { id: LocalId, skill: Skill },

    /// Add a spell from the reference catalog by name
    Learn {
        id: LocalId,

        /// Exact spell name, case-insensitive
        spell: String,
    },

    /// Create an account and log in
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SHEET_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log in to the character service
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "SHEET_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the cached login
    Logout,

    /// Save a character to the cloud
    Push { id: LocalId },

    /// Copy a cloud character to this device
    Pull { remote_id: String },

    /// List cloud characters
    Cloud,

    /// List catalog spells
    Spells {
        /// Only spells whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
}
