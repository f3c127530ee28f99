//! D&D 5e character sheet command-line front end.
//!
//! Characters are stored under the data directory and can be saved to, and
//! loaded from, the character service after `sheet login`.
//!
//! ```bash
//! sheet new --name "Elara"
//! sheet ability <id> int 18
//! sheet print <id>
//! ```

mod cli;

use anyhow::{bail, Context};
use clap::Parser;
use cli::{Cli, Command};
use sheet_api::catalog::{search_spells, Catalog};
use sheet_api::Client;
use sheet_core::character::{Ability, LocalId, Proficiency, Skill};
use sheet_core::{
    persist, print, rules, AuthSession, CharacterStore, Clock, CloudSync, FileStore,
    LocalStore, PersistError, SheetConfig, SystemClock,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = SheetConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(data_dir = %config.data_dir.display(), api_url = %config.api_url, "loaded configuration");

    let backend = Arc::new(FileStore::open(config.characters_dir())?);
    let auth = Arc::new(AuthSession::open(config.auth_path()));

    match cli.command {
        Command::New { name } => {
            let mut store = new_store(&backend, &config);
            let id = store.create_new()?;
            if let Some(name) = name {
                store.set_name(&name);
            }
            store.flush()?;
            println!("{id}");
        }

        Command::List => {
            let characters = backend.list()?;
            if characters.is_empty() {
                println!("No characters yet. Create one with `sheet new`.");
            }
            for c in characters {
                let cloud = if c.remote_id.is_some() { " [cloud]" } else { "" };
                println!(
                    "{}  {}  {} {} {}{}",
                    c.id,
                    c.name,
                    c.race,
                    c.class_name,
                    c.level,
                    cloud
                );
            }
        }

        Command::Show { id } => {
            let store = open_character(&backend, &config, id)?;
            show(&store);
        }

        Command::Delete { id } => {
            if !backend.delete(id)? {
                bail!("No character with id {id}");
            }
            println!("Deleted {id}");
        }

        Command::Export { id, out } => {
            let record = backend.load(id)?.ok_or(PersistError::NotFound(id))?;
            let path = out.unwrap_or_else(|| persist::export_file_name(&record).into());
            persist::export_to_file(&record, &path).await?;
            println!("Exported to {}", path.display());
        }

        Command::Import { file } => {
            let record = persist::import_file(&*backend, &file, SystemClock.now()).await?;
            println!("Imported {} as {}", record.name, record.id);
        }

        Command::Print { id, out } => {
            let store = open_character(&backend, &config, id)?;
            let sheet = print::render(store.doc());
            let path = out.unwrap_or_else(|| print::print_file_name(store.doc()).into());
            tokio::fs::write(&path, sheet.to_text()).await?;
            println!("Wrote {} page(s) to {}", sheet.page_count(), path.display());
        }

        Command::Ability { id, ability, score } => {
            let mut store = open_character(&backend, &config, id)?;
            if !store.set_ability(ability, score) {
                bail!("{} must be between 1 and 30", ability.name());
            }
            store.flush()?;
            print_ability(&store, ability);
        }

        Command::Level { id, level } => {
            let mut store = open_character(&backend, &config, id)?;
            if !store.set_level(level) {
                bail!("Level must be between 1 and 20");
            }
            store.flush()?;
            println!(
                "Level {} (proficiency bonus {})",
                store.doc().basic_info.level,
                rules::format_modifier(store.doc().proficiency_bonus)
            );
        }

        Command::Skill { id, skill } => {
            let mut store = open_character(&backend, &config, id)?;
            let proficiency = store.cycle_skill(skill);
            store.flush()?;
            println!("{}: {:?}, {}", skill.name(), proficiency, skill_line(&store, skill));
        }

        Command::Learn { id, spell } => {
            let mut store = open_character(&backend, &config, id)?;
            let catalog = Catalog::new(&config.reference_url);
            let spells = catalog.spells(&config.spell_sources).await?;
            let option = spells
                .iter()
                .find(|s| s.name.eq_ignore_ascii_case(spell.trim()))
                .with_context(|| format!("No catalog spell named {spell}"))?;
            if store.add_catalog_spell(option).is_none() {
                bail!("{} cannot be added", option.name);
            }
            store.flush()?;
            println!("Added {} ({})", option.name, option.source);
        }

        Command::Register {
            username,
            email,
            password,
        } => {
            let client = Client::new(&config.api_url);
            let identity = auth.register(&client, &username, &email, &password).await?;
            println!("Registered and logged in as {}", identity.username);
        }

        Command::Login { email, password } => {
            let client = Client::new(&config.api_url);
            let identity = auth.login(&client, &email, &password).await?;
            println!("Logged in as {}", identity.username);
        }

        Command::Logout => {
            auth.logout()?;
            println!("Logged out");
        }

        Command::Push { id } => {
            let sync = cloud(&auth, &config)?;
            let mut store = open_character(&backend, &config, id)?;
            let saved = sync.push(&mut store).await?;
            store.flush()?;
            let verb = if saved.created { "Created" } else { "Updated" };
            println!("{verb} cloud character {}", saved.remote_id);
        }

        Command::Pull { remote_id } => {
            let sync = cloud(&auth, &config)?;
            let mut store = new_store(&backend, &config);
            let id = sync.pull(&mut store, &remote_id).await?;
            println!("Copied {} to {id}", store.doc().display_name());
        }

        Command::Cloud => {
            let sync = cloud(&auth, &config)?;
            let records = sync.list().await?;
            if records.is_empty() {
                println!("No cloud characters.");
            }
            for record in records {
                println!("{}  {}  (updated {})", record.id, record.name, record.updated_at);
            }
        }

        Command::Spells { search } => {
            let catalog = Catalog::new(&config.reference_url);
            let spells = catalog.spells(&config.spell_sources).await?;
            for spell in search_spells(&spells, search.as_deref().unwrap_or_default()) {
                let level = match spell.level {
                    0 => "Cantrip".to_string(),
                    n => format!("Level {n}"),
                };
                println!(
                    "{} [{}] {}, {}, {}",
                    spell.name, spell.source, level, spell.school, spell.casting_time
                );
            }
        }
    }

    Ok(())
}

fn new_store(backend: &Arc<FileStore>, config: &SheetConfig) -> CharacterStore {
    CharacterStore::with_autosave_delay(
        backend.clone(),
        Arc::new(SystemClock),
        config.autosave_delay,
    )
}

fn open_character(
    backend: &Arc<FileStore>,
    config: &SheetConfig,
    id: LocalId,
) -> anyhow::Result<CharacterStore> {
    let mut store = new_store(backend, config);
    if !store.load_from_local(id)? {
        bail!("No character with id {id}");
    }
    Ok(store)
}

fn cloud(auth: &Arc<AuthSession>, config: &SheetConfig) -> anyhow::Result<CloudSync> {
    if !auth.is_authenticated() {
        bail!("Not logged in. Run `sheet login` first.");
    }
    let client = auth.client(&Client::new(&config.api_url));
    Ok(CloudSync::new(Arc::new(client)).with_auth(auth.clone()))
}

fn print_ability(store: &CharacterStore, ability: Ability) {
    let abilities = &store.doc().abilities;
    println!(
        "{} {} ({})",
        ability.abbreviation(),
        abilities.get(ability),
        rules::format_modifier(abilities.modifier(ability))
    );
}

fn skill_line(store: &CharacterStore, skill: Skill) -> String {
    rules::all_skill_bonuses(store.doc())
        .into_iter()
        .find(|(s, _)| *s == skill)
        .map(|(_, bonus)| rules::format_modifier(bonus))
        .unwrap_or_default()
}

fn show(store: &CharacterStore) {
    let doc = store.doc();
    let info = &doc.basic_info;
    println!("{}", doc.display_name());
    println!(
        "Level {} {} {}  |  {}",
        info.level,
        info.race,
        info.class_name,
        info.alignment.map(|a| a.name()).unwrap_or("Unaligned")
    );
    println!(
        "AC {}  HP {}/{}  Speed {}  Initiative {}  Proficiency {}",
        doc.combat.armor_class,
        doc.combat.current_hit_points,
        doc.combat.max_hit_points,
        doc.combat.speed,
        rules::format_modifier(doc.combat.initiative),
        rules::format_modifier(doc.proficiency_bonus)
    );
    println!();

    for ability in Ability::all() {
        print_ability(store, ability);
    }
    println!();

    println!("Saving throws:");
    for (ability, bonus) in rules::all_saving_throws(doc) {
        let mark = if doc.saving_throws.get(ability).proficient { "*" } else { " " };
        println!("  {mark} {:<13} {}", ability.name(), rules::format_modifier(bonus));
    }

    println!("Skills:");
    for (skill, bonus) in rules::all_skill_bonuses(doc) {
        let mark = match doc.skills.get(skill).proficiency() {
            Proficiency::Expertise => "**",
            Proficiency::Proficient => "* ",
            Proficiency::None => "  ",
        };
        println!("  {mark} {:<16} {}", skill.name(), rules::format_modifier(bonus));
    }

    if let Some(ability) = doc.spellcasting.spellcasting_ability {
        println!();
        println!(
            "Spellcasting ({}): save DC {}, attack {}",
            ability.abbreviation(),
            doc.spellcasting.spell_save_dc,
            rules::format_modifier(doc.spellcasting.spell_attack_bonus)
        );
    }
}
