//! Reference data lookups for races, classes, backgrounds, and spells.
//!
//! Reads the public 5etools JSON mirror. Everything here is optional for a
//! working sheet: callers use it for autocomplete and to pre-fill spell
//! details, and fall back to manual entry when a lookup fails.

use crate::Error;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Root of the reference data mirror.
pub const DEFAULT_BASE_URL: &str =
    "https://raw.githubusercontent.com/5etools-mirror-3/5etools-src/main/data/";

/// Spell sources included when none are specified.
pub const DEFAULT_SPELL_SOURCES: [&str; 3] = ["PHB", "XGE", "TCE"];

/// Entries tagged with this edition belong to the 2024 rules and are skipped.
const SKIPPED_EDITION: &str = "one";

lazy_static::lazy_static! {
    static ref SCHOOLS: HashMap<&'static str, &'static str> = HashMap::from([
        ("A", "Abjuration"),
        ("C", "Conjuration"),
        ("D", "Divination"),
        ("EN", "Enchantment"),
        ("EV", "Evocation"),
        ("I", "Illusion"),
        ("N", "Necromancy"),
        ("T", "Transmutation"),
    ]);

    static ref ABILITY_KEYS: HashMap<&'static str, &'static str> = HashMap::from([
        ("str", "strength"),
        ("dex", "dexterity"),
        ("con", "constitution"),
        ("int", "intelligence"),
        ("wis", "wisdom"),
        ("cha", "charisma"),
    ]);

    static ref ABILITY_NAMES: HashMap<&'static str, &'static str> = HashMap::from([
        ("str", "Strength"),
        ("dex", "Dexterity"),
        ("con", "Constitution"),
        ("int", "Intelligence"),
        ("wis", "Wisdom"),
        ("cha", "Charisma"),
    ]);
}

// ============================================================================
// Public option types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceOption {
    pub name: String,
    pub source: String,
    /// Ability key (e.g. "dexterity") to bonus.
    pub ability_increases: BTreeMap<String, i32>,
    pub size: String,
    pub speed: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubclassOption {
    pub name: String,
    pub short_name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassOption {
    pub name: String,
    pub source: String,
    pub hit_die: u32,
    pub saving_throws: Vec<String>,
    pub subclasses: Vec<SubclassOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundOption {
    pub name: String,
    pub source: String,
    pub skill_proficiencies: Vec<String>,
}

/// A spell with its descriptive fields already rendered for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpellOption {
    pub name: String,
    pub source: String,
    pub level: u8,
    pub school: String,
    pub casting_time: String,
    pub range: String,
    pub components: String,
    pub duration: String,
}

// ============================================================================
// Raw mirror shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRace {
    name: String,
    source: String,
    #[serde(default)]
    ability: Vec<serde_json::Map<String, Value>>,
    #[serde(default)]
    size: Vec<String>,
    #[serde(default)]
    speed: Option<Value>,
    #[serde(default)]
    edition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHitDie {
    faces: u32,
}

#[derive(Debug, Deserialize)]
struct RawClass {
    name: String,
    source: String,
    #[serde(default)]
    hd: Option<RawHitDie>,
    #[serde(default)]
    proficiency: Vec<String>,
    #[serde(default)]
    edition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSubclass {
    name: String,
    #[serde(default)]
    short_name: String,
    source: String,
    class_name: String,
    class_source: String,
    #[serde(default)]
    edition: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBackground {
    name: String,
    source: String,
    #[serde(default)]
    skill_proficiencies: Vec<serde_json::Map<String, Value>>,
    #[serde(default)]
    edition: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTime {
    number: u32,
    unit: String,
}

#[derive(Debug, Deserialize)]
struct RawDistance {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    amount: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawRange {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    distance: Option<RawDistance>,
}

#[derive(Debug, Default, Deserialize)]
struct RawComponents {
    #[serde(default)]
    v: bool,
    #[serde(default)]
    s: bool,
    #[serde(default)]
    m: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawDurationAmount {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    amount: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawDuration {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    duration: Option<RawDurationAmount>,
    #[serde(default)]
    concentration: bool,
}

#[derive(Debug, Deserialize)]
struct RawSpell {
    name: String,
    source: String,
    level: u8,
    school: String,
    #[serde(default)]
    time: Vec<RawTime>,
    #[serde(default)]
    range: Option<RawRange>,
    #[serde(default)]
    components: Option<RawComponents>,
    #[serde(default)]
    duration: Vec<RawDuration>,
}

#[derive(Debug, Deserialize)]
struct RaceFile {
    #[serde(default)]
    race: Vec<RawRace>,
}

#[derive(Debug, Deserialize)]
struct ClassFile {
    #[serde(default)]
    class: Vec<RawClass>,
    #[serde(default)]
    subclass: Vec<RawSubclass>,
}

#[derive(Debug, Deserialize)]
struct BackgroundFile {
    #[serde(default)]
    background: Vec<RawBackground>,
}

#[derive(Debug, Deserialize)]
struct SpellFile {
    #[serde(default)]
    spell: Vec<RawSpell>,
}

// ============================================================================
// Client
// ============================================================================

/// Reference data client with an in-memory response cache.
pub struct Catalog {
    http: reqwest::Client,
    base_url: String,
    cache: Mutex<HashMap<String, Value>>,
}

impl Catalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// All races, deduplicated by name and sorted.
    pub async fn races(&self) -> Result<Vec<RaceOption>, Error> {
        let file: RaceFile = self.fetch("races.json").await?;
        Ok(parse_races(file))
    }

    /// All classes with their subclasses.
    ///
    /// Class files that fail to load are skipped; only a failure to read the
    /// index is an error.
    pub async fn classes(&self) -> Result<Vec<ClassOption>, Error> {
        let index: BTreeMap<String, String> = self.fetch("class/index.json").await?;

        let files = join_all(index.values().map(|filename| async move {
            let path = format!("class/{filename}");
            match self.fetch::<ClassFile>(&path).await {
                Ok(file) => Some(file),
                Err(e) => {
                    tracing::warn!(%path, error = %e, "skipping class file");
                    None
                }
            }
        }))
        .await;

        let mut classes: Vec<ClassOption> = files
            .into_iter()
            .flatten()
            .flat_map(parse_class_file)
            .collect();
        classes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(classes)
    }

    pub async fn backgrounds(&self) -> Result<Vec<BackgroundOption>, Error> {
        let file: BackgroundFile = self.fetch("backgrounds.json").await?;
        Ok(parse_backgrounds(file))
    }

    /// Spells from the given sources, sorted by level then name.
    ///
    /// Sources absent from the index are ignored.
    pub async fn spells(&self, sources: &[String]) -> Result<Vec<SpellOption>, Error> {
        let index: BTreeMap<String, String> = self.fetch("spells/index.json").await?;

        let files = join_all(
            sources
                .iter()
                .filter_map(|source| index.get(source))
                .map(|filename| async move {
                    let path = format!("spells/{filename}");
                    match self.fetch::<SpellFile>(&path).await {
                        Ok(file) => Some(file),
                        Err(e) => {
                            tracing::warn!(%path, error = %e, "skipping spell file");
                            None
                        }
                    }
                }),
        )
        .await;

        let mut spells: Vec<SpellOption> = files
            .into_iter()
            .flatten()
            .flat_map(|file| file.spell)
            .map(spell_option)
            .collect();
        sort_spells(&mut spells);
        Ok(spells)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned();

        let value = match cached {
            Some(value) => value,
            None => {
                let value = self.fetch_uncached(path).await?;
                self.cache
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(path.to_string(), value.clone());
                value
            }
        };

        serde_json::from_value(value).map_err(|e| Error::Parse(format!("{path}: {e}")))
    }

    async fn fetch_uncached(&self, path: &str) -> Result<Value, Error> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                message: format!("Failed to fetch {path}"),
            });
        }

        response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Case-insensitive substring search over spell names.
pub fn search_spells<'a>(spells: &'a [SpellOption], query: &str) -> Vec<&'a SpellOption> {
    let query = query.trim().to_lowercase();
    spells
        .iter()
        .filter(|s| query.is_empty() || s.name.to_lowercase().contains(&query))
        .collect()
}

// ============================================================================
// Normalization
// ============================================================================

fn is_skipped(edition: &Option<String>) -> bool {
    edition.as_deref() == Some(SKIPPED_EDITION)
}

fn parse_races(file: RaceFile) -> Vec<RaceOption> {
    let mut seen = HashSet::new();
    let mut races = Vec::new();

    for race in file.race {
        if is_skipped(&race.edition) || !seen.insert(race.name.clone()) {
            continue;
        }

        let mut ability_increases = BTreeMap::new();
        for entry in &race.ability {
            for (key, value) in entry {
                if key == "choose" {
                    continue;
                }
                let Some(amount) = value.as_i64() else { continue };
                let ability = ABILITY_KEYS.get(key.as_str()).copied().unwrap_or(key.as_str());
                *ability_increases.entry(ability.to_string()).or_insert(0) += amount as i32;
            }
        }

        let speed = match &race.speed {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(30) as u32,
            Some(Value::Object(map)) => map.get("walk").and_then(Value::as_u64).unwrap_or(30) as u32,
            _ => 30,
        };

        races.push(RaceOption {
            name: race.name,
            source: race.source,
            ability_increases,
            size: race.size.first().cloned().unwrap_or_else(|| "M".to_string()),
            speed,
        });
    }

    races.sort_by(|a, b| a.name.cmp(&b.name));
    races
}

fn parse_class_file(file: ClassFile) -> Vec<ClassOption> {
    file.class
        .iter()
        .filter(|class| !is_skipped(&class.edition))
        .map(|class| {
            let mut subclasses: Vec<SubclassOption> = file
                .subclass
                .iter()
                .filter(|sc| {
                    sc.class_name == class.name
                        && sc.class_source == class.source
                        && !is_skipped(&sc.edition)
                })
                .map(|sc| SubclassOption {
                    name: sc.name.clone(),
                    short_name: sc.short_name.clone(),
                    source: sc.source.clone(),
                })
                .collect();
            subclasses.sort_by(|a, b| a.name.cmp(&b.name));

            ClassOption {
                name: class.name.clone(),
                source: class.source.clone(),
                hit_die: class.hd.as_ref().map(|hd| hd.faces).unwrap_or(8),
                saving_throws: class
                    .proficiency
                    .iter()
                    .map(|p| {
                        ABILITY_NAMES
                            .get(p.as_str())
                            .map(|name| name.to_string())
                            .unwrap_or_else(|| p.clone())
                    })
                    .collect(),
                subclasses,
            }
        })
        .collect()
}

fn parse_backgrounds(file: BackgroundFile) -> Vec<BackgroundOption> {
    let mut seen = HashSet::new();
    let mut backgrounds = Vec::new();

    for background in file.background {
        if is_skipped(&background.edition) || !seen.insert(background.name.clone()) {
            continue;
        }

        let skill_proficiencies = background
            .skill_proficiencies
            .iter()
            .flat_map(|entry| entry.iter())
            .filter(|(_, granted)| granted.as_bool() == Some(true))
            .map(|(key, _)| title_case(key))
            .collect();

        backgrounds.push(BackgroundOption {
            name: background.name,
            source: background.source,
            skill_proficiencies,
        });
    }

    backgrounds.sort_by(|a, b| a.name.cmp(&b.name));
    backgrounds
}

fn spell_option(spell: RawSpell) -> SpellOption {
    SpellOption {
        school: SCHOOLS
            .get(spell.school.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| spell.school.clone()),
        casting_time: spell
            .time
            .first()
            .map(|t| format!("{} {}", t.number, t.unit))
            .unwrap_or_default(),
        range: format_range(spell.range.as_ref()),
        components: format_components(spell.components.as_ref()),
        duration: format_duration(&spell.duration),
        name: spell.name,
        source: spell.source,
        level: spell.level,
    }
}

fn sort_spells(spells: &mut [SpellOption]) {
    spells.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.name.cmp(&b.name)));
}

/// "animalHandling" -> "Animal Handling"
fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i == 0 {
            out.extend(c.to_uppercase());
        } else if c.is_uppercase() {
            out.push(' ');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

fn format_range(range: Option<&RawRange>) -> String {
    let Some(range) = range else {
        return String::new();
    };

    match range.kind.as_str() {
        "self" => "Self".to_string(),
        "touch" => "Touch".to_string(),
        "sight" => "Sight".to_string(),
        "unlimited" => "Unlimited".to_string(),
        "special" => "Special".to_string(),
        _ => match &range.distance {
            Some(d) => match (d.kind.as_str(), d.amount) {
                ("feet", Some(amount)) => format!("{amount} ft."),
                ("miles", Some(amount)) => format!("{amount} mi."),
                (_, Some(amount)) => amount.to_string(),
                ("self", None) => "Self".to_string(),
                ("touch", None) => "Touch".to_string(),
                (kind, None) => kind.to_string(),
            },
            None => range.kind.clone(),
        },
    }
}

fn format_components(components: Option<&RawComponents>) -> String {
    let Some(c) = components else {
        return String::new();
    };

    let mut parts = Vec::new();
    if c.v {
        parts.push("V".to_string());
    }
    if c.s {
        parts.push("S".to_string());
    }
    match &c.m {
        Some(Value::String(text)) => parts.push(format!("M ({text})")),
        Some(Value::Object(map)) => match map.get("text").and_then(Value::as_str) {
            Some(text) => parts.push(format!("M ({text})")),
            None => parts.push("M".to_string()),
        },
        Some(Value::Bool(true)) => parts.push("M".to_string()),
        _ => {}
    }
    parts.join(", ")
}

fn format_duration(durations: &[RawDuration]) -> String {
    let Some(d) = durations.first() else {
        return String::new();
    };

    match d.kind.as_str() {
        "instant" => "Instantaneous".to_string(),
        "permanent" => "Until dispelled".to_string(),
        "special" => "Special".to_string(),
        _ => match &d.duration {
            Some(amount) => {
                let n = amount.amount.unwrap_or(1);
                let plural = if n == 1 { "" } else { "s" };
                let base = format!("{n} {}{plural}", amount.kind);
                if d.concentration {
                    format!("Conc., up to {base}")
                } else {
                    base
                }
            }
            None => d.kind.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spell_from(value: Value) -> SpellOption {
        spell_option(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_spell_formatting() {
        let spell = spell_from(json!({
            "name": "Fireball",
            "source": "PHB",
            "level": 3,
            "school": "V",
            "time": [{"number": 1, "unit": "action"}],
            "range": {"type": "point", "distance": {"type": "feet", "amount": 150}},
            "components": {"v": true, "s": true, "m": "a tiny ball of bat guano and sulfur"},
            "duration": [{"type": "instant"}]
        }));

        assert_eq!(spell.casting_time, "1 action");
        assert_eq!(spell.range, "150 ft.");
        assert_eq!(spell.components, "V, S, M (a tiny ball of bat guano and sulfur)");
        assert_eq!(spell.duration, "Instantaneous");
        // Unknown abbreviations pass through untouched
        assert_eq!(spell.school, "V");
    }

    #[test]
    fn test_spell_concentration_duration() {
        let spell = spell_from(json!({
            "name": "Bless",
            "source": "PHB",
            "level": 1,
            "school": "EN",
            "range": {"type": "point", "distance": {"type": "feet", "amount": 30}},
            "components": {"v": true, "s": true, "m": {"text": "a sprinkling of holy water"}},
            "duration": [{"type": "timed", "duration": {"type": "minute", "amount": 1}, "concentration": true}]
        }));

        assert_eq!(spell.school, "Enchantment");
        assert_eq!(spell.components, "V, S, M (a sprinkling of holy water)");
        assert_eq!(spell.duration, "Conc., up to 1 minute");
        assert_eq!(spell.casting_time, "");
    }

    #[test]
    fn test_spell_self_range_and_plural_duration() {
        let spell = spell_from(json!({
            "name": "Mage Armor",
            "source": "PHB",
            "level": 1,
            "school": "A",
            "range": {"type": "point", "distance": {"type": "touch"}},
            "components": {"v": true, "s": true, "m": true},
            "duration": [{"type": "timed", "duration": {"type": "hour", "amount": 8}}]
        }));

        assert_eq!(spell.range, "Touch");
        assert_eq!(spell.components, "V, S, M");
        assert_eq!(spell.duration, "8 hours");
    }

    #[test]
    fn test_races_skip_new_edition_and_duplicates() {
        let file: RaceFile = serde_json::from_value(json!({
            "race": [
                {"name": "Elf", "source": "PHB", "ability": [{"dex": 2}], "size": ["M"], "speed": 30},
                {"name": "Elf", "source": "DMG", "ability": [{"int": 1}]},
                {"name": "Dwarf", "source": "XPHB", "edition": "one"},
                {"name": "Aarakocra", "source": "EEPC", "ability": [{"dex": 2, "wis": 1, "choose": {}}],
                 "speed": {"walk": 25, "fly": 50}}
            ]
        }))
        .unwrap();

        let races = parse_races(file);
        let names: Vec<_> = races.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Aarakocra", "Elf"]);

        assert_eq!(races[0].speed, 25);
        assert_eq!(races[0].ability_increases.get("dexterity"), Some(&2));
        assert_eq!(races[0].ability_increases.get("wisdom"), Some(&1));
        assert_eq!(races[0].size, "M");
        assert_eq!(races[1].ability_increases.get("dexterity"), Some(&2));
    }

    #[test]
    fn test_class_file_pairs_subclasses() {
        let file: ClassFile = serde_json::from_value(json!({
            "class": [
                {"name": "Wizard", "source": "PHB", "hd": {"number": 1, "faces": 6}, "proficiency": ["int", "wis"]},
                {"name": "Wizard", "source": "XPHB", "edition": "one"}
            ],
            "subclass": [
                {"name": "School of Evocation", "shortName": "Evocation", "source": "PHB",
                 "className": "Wizard", "classSource": "PHB"},
                {"name": "Bladesinging", "shortName": "Bladesinging", "source": "TCE",
                 "className": "Wizard", "classSource": "PHB"},
                {"name": "Evoker", "shortName": "Evoker", "source": "XPHB",
                 "className": "Wizard", "classSource": "XPHB", "edition": "one"}
            ]
        }))
        .unwrap();

        let classes = parse_class_file(file);
        assert_eq!(classes.len(), 1);
        let wizard = &classes[0];
        assert_eq!(wizard.hit_die, 6);
        assert_eq!(wizard.saving_throws, vec!["Intelligence", "Wisdom"]);
        let subclasses: Vec<_> = wizard.subclasses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(subclasses, vec!["Bladesinging", "School of Evocation"]);
    }

    #[test]
    fn test_background_skills_title_cased() {
        let file: BackgroundFile = serde_json::from_value(json!({
            "background": [
                {"name": "Outlander", "source": "PHB",
                 "skillProficiencies": [{"athletics": true, "survival": true}]},
                {"name": "Hermit", "source": "PHB",
                 "skillProficiencies": [{"medicine": true, "religion": true, "any": 1}]},
                {"name": "Folk Hero", "source": "PHB",
                 "skillProficiencies": [{"animalHandling": true, "survival": true}]}
            ]
        }))
        .unwrap();

        let backgrounds = parse_backgrounds(file);
        assert_eq!(backgrounds[0].name, "Folk Hero");
        assert_eq!(
            backgrounds[0].skill_proficiencies,
            vec!["Animal Handling", "Survival"]
        );
        assert_eq!(backgrounds[1].skill_proficiencies, vec!["Medicine", "Religion"]);
    }

    #[test]
    fn test_search_and_sort_spells() {
        let mut spells: Vec<SpellOption> = ["Shield", "Fire Bolt", "Fireball"]
            .iter()
            .zip([1u8, 0, 3])
            .map(|(name, level)| SpellOption {
                name: name.to_string(),
                source: "PHB".to_string(),
                level,
                school: String::new(),
                casting_time: String::new(),
                range: String::new(),
                components: String::new(),
                duration: String::new(),
            })
            .collect();
        sort_spells(&mut spells);

        let names: Vec<_> = spells.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Fire Bolt", "Shield", "Fireball"]);

        let hits = search_spells(&spells, "FIRE");
        assert_eq!(hits.len(), 2);
        assert_eq!(search_spells(&spells, "  ").len(), 3);
    }

    #[test]
    fn test_catalog_base_url_gets_trailing_slash() {
        let catalog = Catalog::new("https://example.com/data");
        assert_eq!(catalog.base_url, "https://example.com/data/");
    }
}
