//! Character document types.
//!
//! [`CharacterDocument`] is the canonical, versioned record behind a sheet.
//! Every substructure has a default so that partially populated payloads
//! deserialize into a fully formed document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Current document schema version.
pub const DOCUMENT_VERSION: u32 = 2;

/// Inclusive bounds for an ability score.
pub const MIN_ABILITY_SCORE: i32 = 1;
pub const MAX_ABILITY_SCORE: i32 = 30;

/// Inclusive bounds for character level.
pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 20;

// ============================================================================
// ID Types
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a document in on-device storage.
    LocalId
);
uuid_id!(
    /// Identifier of an equipment entry.
    ItemId
);
uuid_id!(
    /// Identifier shared by leveled spells and cantrips.
    SpellId
);
uuid_id!(
    /// Identifier of a feature or trait entry.
    FeatureId
);

/// Server-assigned identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl RemoteId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RemoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Ability Scores
// ============================================================================

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn all() -> [Ability; 6] {
        [
            Ability::Strength,
            Ability::Dexterity,
            Ability::Constitution,
            Ability::Intelligence,
            Ability::Wisdom,
            Ability::Charisma,
        ]
    }
}

impl fmt::Display for Ability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbreviation())
    }
}

impl FromStr for Ability {
    type Err = String;

    /// Accepts full names or abbreviations, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Ability::all()
            .into_iter()
            .find(|a| a.name().to_lowercase() == needle || a.abbreviation().to_lowercase() == needle)
            .ok_or_else(|| format!("Unknown ability: {s}"))
    }
}

/// Ability scores container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl AbilityScores {
    pub fn new(str: i32, dex: i32, con: i32, int: i32, wis: i32, cha: i32) -> Self {
        Self {
            strength: str,
            dexterity: dex,
            constitution: con,
            intelligence: int,
            wisdom: wis,
            charisma: cha,
        }
    }

    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    pub fn set(&mut self, ability: Ability, value: i32) {
        match ability {
            Ability::Strength => self.strength = value,
            Ability::Dexterity => self.dexterity = value,
            Ability::Constitution => self.constitution = value,
            Ability::Intelligence => self.intelligence = value,
            Ability::Wisdom => self.wisdom = value,
            Ability::Charisma => self.charisma = value,
        }
    }

    pub fn modifier(&self, ability: Ability) -> i32 {
        crate::rules::ability_modifier(self.get(ability))
    }
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self::new(10, 10, 10, 10, 10, 10)
    }
}

/// Saving throw entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveEntry {
    pub proficient: bool,
}

/// Saving throws keyed by ability. Missing entries read as not proficient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavingThrows(BTreeMap<Ability, SaveEntry>);

impl SavingThrows {
    pub fn get(&self, ability: Ability) -> SaveEntry {
        self.0.get(&ability).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, ability: Ability) -> &mut SaveEntry {
        self.0.entry(ability).or_default()
    }
}

impl Default for SavingThrows {
    fn default() -> Self {
        Self(
            Ability::all()
                .into_iter()
                .map(|a| (a, SaveEntry::default()))
                .collect(),
        )
    }
}

// ============================================================================
// Skills
// ============================================================================

/// D&D 5e skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Skill {
    Acrobatics,
    AnimalHandling,
    Arcana,
    Athletics,
    Deception,
    History,
    Insight,
    Intimidation,
    Investigation,
    Medicine,
    Nature,
    Perception,
    Performance,
    Persuasion,
    Religion,
    SleightOfHand,
    Stealth,
    Survival,
}

impl Skill {
    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Acrobatics => "Acrobatics",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Arcana => "Arcana",
            Skill::Athletics => "Athletics",
            Skill::Deception => "Deception",
            Skill::History => "History",
            Skill::Insight => "Insight",
            Skill::Intimidation => "Intimidation",
            Skill::Investigation => "Investigation",
            Skill::Medicine => "Medicine",
            Skill::Nature => "Nature",
            Skill::Perception => "Perception",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
            Skill::Religion => "Religion",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Survival => "Survival",
        }
    }

    /// All skills in alphabetical order.
    pub fn all() -> [Skill; 18] {
        [
            Skill::Acrobatics,
            Skill::AnimalHandling,
            Skill::Arcana,
            Skill::Athletics,
            Skill::Deception,
            Skill::History,
            Skill::Insight,
            Skill::Intimidation,
            Skill::Investigation,
            Skill::Medicine,
            Skill::Nature,
            Skill::Perception,
            Skill::Performance,
            Skill::Persuasion,
            Skill::Religion,
            Skill::SleightOfHand,
            Skill::Stealth,
            Skill::Survival,
        ]
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Skill {
    type Err = String;

    /// Accepts display names with or without spaces ("sleight of hand",
    /// "sleightOfHand", "SleightOfHand").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squash = |v: &str| {
            v.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        };
        let needle = squash(s);
        Skill::all()
            .into_iter()
            .find(|skill| squash(skill.name()) == needle)
            .ok_or_else(|| format!("Unknown skill: {s}"))
    }
}

/// Training level of a skill, derived from its two stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Proficiency {
    None,
    Proficient,
    Expertise,
}

/// A skill's stored flags. Expertise dominates proficient when both are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillEntry {
    pub proficient: bool,
    pub expertise: bool,
}

impl SkillEntry {
    pub fn proficiency(&self) -> Proficiency {
        if self.expertise {
            Proficiency::Expertise
        } else if self.proficient {
            Proficiency::Proficient
        } else {
            Proficiency::None
        }
    }

    /// Advance none -> proficient -> expertise -> none.
    pub fn cycle(&mut self) {
        match (self.proficient, self.expertise) {
            (false, false) => self.proficient = true,
            (true, false) => self.expertise = true,
            _ => {
                self.proficient = false;
                self.expertise = false;
            }
        }
    }
}

/// Skill entries keyed by skill. Missing entries read as untrained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Skills(BTreeMap<Skill, SkillEntry>);

impl Skills {
    pub fn get(&self, skill: Skill) -> SkillEntry {
        self.0.get(&skill).copied().unwrap_or_default()
    }

    pub fn get_mut(&mut self, skill: Skill) -> &mut SkillEntry {
        self.0.entry(skill).or_default()
    }
}

impl Default for Skills {
    fn default() -> Self {
        Self(
            Skill::all()
                .into_iter()
                .map(|s| (s, SkillEntry::default()))
                .collect(),
        )
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The nine alignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    #[serde(rename = "Lawful Good")]
    LawfulGood,
    #[serde(rename = "Neutral Good")]
    NeutralGood,
    #[serde(rename = "Chaotic Good")]
    ChaoticGood,
    #[serde(rename = "Lawful Neutral")]
    LawfulNeutral,
    #[serde(rename = "True Neutral")]
    TrueNeutral,
    #[serde(rename = "Chaotic Neutral")]
    ChaoticNeutral,
    #[serde(rename = "Lawful Evil")]
    LawfulEvil,
    #[serde(rename = "Neutral Evil")]
    NeutralEvil,
    #[serde(rename = "Chaotic Evil")]
    ChaoticEvil,
}

impl Alignment {
    pub fn name(&self) -> &'static str {
        match self {
            Alignment::LawfulGood => "Lawful Good",
            Alignment::NeutralGood => "Neutral Good",
            Alignment::ChaoticGood => "Chaotic Good",
            Alignment::LawfulNeutral => "Lawful Neutral",
            Alignment::TrueNeutral => "True Neutral",
            Alignment::ChaoticNeutral => "Chaotic Neutral",
            Alignment::LawfulEvil => "Lawful Evil",
            Alignment::NeutralEvil => "Neutral Evil",
            Alignment::ChaoticEvil => "Chaotic Evil",
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BasicInfo {
    pub name: String,
    pub race: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub subclass: String,
    pub level: u32,
    pub background: String,
    #[serde(with = "empty_as_none")]
    pub alignment: Option<Alignment>,
    pub experience_points: u32,
}

impl Default for BasicInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            race: String::new(),
            class_name: String::new(),
            subclass: String::new(),
            level: 1,
            background: String::new(),
            alignment: None,
            experience_points: 0,
        }
    }
}

// ============================================================================
// Combat
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitDice {
    /// Dice notation, e.g. "3d10".
    pub total: String,
    pub current: i32,
}

impl Default for HitDice {
    fn default() -> Self {
        Self {
            total: "1d8".to_string(),
            current: 1,
        }
    }
}

/// Death saving throw tallies. Not capped; the table enforces the limit of 3.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathSaves {
    pub successes: u32,
    pub failures: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Combat {
    pub armor_class: i32,
    /// Derived from dexterity on every recompute.
    pub initiative: i32,
    pub speed: i32,
    pub max_hit_points: i32,
    pub current_hit_points: i32,
    pub temporary_hit_points: i32,
    pub hit_dice: HitDice,
    pub death_saves: DeathSaves,
}

impl Default for Combat {
    fn default() -> Self {
        Self {
            armor_class: 10,
            initiative: 0,
            speed: 30,
            max_hit_points: 8,
            current_hit_points: 8,
            temporary_hit_points: 0,
            hit_dice: HitDice::default(),
            death_saves: DeathSaves::default(),
        }
    }
}

// ============================================================================
// Equipment and Currency
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    #[serde(default)]
    pub id: ItemId,
    pub name: String,
    pub quantity: u32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub equipped: bool,
}

/// Coin denominations, smallest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coin {
    Copper,
    Silver,
    Electrum,
    Gold,
    Platinum,
}

impl Coin {
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Coin::Copper => "CP",
            Coin::Silver => "SP",
            Coin::Electrum => "EP",
            Coin::Gold => "GP",
            Coin::Platinum => "PP",
        }
    }

    pub fn all() -> [Coin; 5] {
        [Coin::Copper, Coin::Silver, Coin::Electrum, Coin::Gold, Coin::Platinum]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Currency {
    pub copper: u32,
    pub silver: u32,
    pub electrum: u32,
    pub gold: u32,
    pub platinum: u32,
}

impl Currency {
    pub fn get(&self, coin: Coin) -> u32 {
        match coin {
            Coin::Copper => self.copper,
            Coin::Silver => self.silver,
            Coin::Electrum => self.electrum,
            Coin::Gold => self.gold,
            Coin::Platinum => self.platinum,
        }
    }

    pub fn set(&mut self, coin: Coin, amount: u32) {
        match coin {
            Coin::Copper => self.copper = amount,
            Coin::Silver => self.silver = amount,
            Coin::Electrum => self.electrum = amount,
            Coin::Gold => self.gold = amount,
            Coin::Platinum => self.platinum = amount,
        }
    }
}

// ============================================================================
// Spellcasting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotInfo {
    pub max: u32,
    pub used: u32,
}

impl SlotInfo {
    pub fn available(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spell {
    #[serde(default)]
    pub id: SpellId,
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub casting_time: String,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub components: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prepared: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cantrip {
    #[serde(default)]
    pub id: SpellId,
    pub name: String,
    #[serde(default)]
    pub school: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Spellcasting {
    #[serde(with = "empty_as_none")]
    pub spellcasting_ability: Option<Ability>,
    /// Derived while an ability is selected; stale otherwise.
    #[serde(rename = "spellSaveDC")]
    pub spell_save_dc: i32,
    /// Derived while an ability is selected; stale otherwise.
    pub spell_attack_bonus: i32,
    /// Slot level (1-9) to slot counts. Levels appear on first write.
    pub spell_slots: BTreeMap<u8, SlotInfo>,
    pub spells_known: Vec<Spell>,
    pub cantrips: Vec<Cantrip>,
}

impl Spellcasting {
    /// Slot counts for a level; unwritten levels read as empty.
    pub fn slot(&self, level: u8) -> SlotInfo {
        self.spell_slots.get(&level).copied().unwrap_or_default()
    }

    pub fn slot_mut(&mut self, level: u8) -> &mut SlotInfo {
        self.spell_slots.entry(level).or_default()
    }
}

// ============================================================================
// Features and flavor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    #[default]
    Feature,
    Trait,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(default)]
    pub id: FeatureId,
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: FeatureCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Proficiencies {
    pub armor: Vec<String>,
    pub weapons: Vec<String>,
    pub tools: Vec<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub traits: String,
    pub ideals: String,
    pub bonds: String,
    pub flaws: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Appearance {
    pub age: u32,
    pub height: String,
    pub weight: String,
    pub eyes: String,
    pub skin: String,
    pub hair: String,
    pub portrait_url: Option<String>,
}

// ============================================================================
// Document
// ============================================================================

/// A complete character sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharacterDocument {
    pub version: u32,
    pub basic_info: BasicInfo,
    pub abilities: AbilityScores,
    /// Derived from level on every recompute.
    pub proficiency_bonus: i32,
    pub saving_throws: SavingThrows,
    pub skills: Skills,
    pub combat: Combat,
    pub equipment: Vec<EquipmentItem>,
    pub currency: Currency,
    pub spellcasting: Spellcasting,
    pub features: Vec<Feature>,
    pub proficiencies: Proficiencies,
    pub personality: Personality,
    pub backstory: String,
    pub appearance: Appearance,
    pub allies: Vec<String>,
    pub notes: String,
}

impl Default for CharacterDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            basic_info: BasicInfo::default(),
            abilities: AbilityScores::default(),
            proficiency_bonus: 2,
            saving_throws: SavingThrows::default(),
            skills: Skills::default(),
            combat: Combat::default(),
            equipment: Vec::new(),
            currency: Currency::default(),
            spellcasting: Spellcasting::default(),
            features: Vec::new(),
            proficiencies: Proficiencies::default(),
            personality: Personality::default(),
            backstory: String::new(),
            appearance: Appearance::default(),
            allies: Vec::new(),
            notes: String::new(),
        }
    }
}

impl CharacterDocument {
    /// Name for listings; blank names show as "Unnamed".
    pub fn display_name(&self) -> &str {
        let name = self.basic_info.name.trim();
        if name.is_empty() {
            "Unnamed"
        } else {
            name
        }
    }

    pub fn features_in(&self, category: FeatureCategory) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(move |f| f.category == category)
    }
}

/// Serde adapter storing `None` as an empty string.
mod empty_as_none {
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.is_empty() => Ok(None),
            other => T::deserialize(other).map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_document_shape() {
        let doc = CharacterDocument::default();
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert_eq!(doc.basic_info.level, 1);
        assert_eq!(doc.abilities, AbilityScores::default());
        assert_eq!(doc.combat.hit_dice.total, "1d8");
        assert_eq!(doc.combat.speed, 30);
        assert_eq!(doc.display_name(), "Unnamed");
        for skill in Skill::all() {
            assert_eq!(doc.skills.get(skill), SkillEntry::default());
        }
    }

    #[test]
    fn test_skill_cycle() {
        let mut entry = SkillEntry::default();
        assert_eq!(entry.proficiency(), Proficiency::None);
        entry.cycle();
        assert_eq!(entry.proficiency(), Proficiency::Proficient);
        entry.cycle();
        assert_eq!(entry.proficiency(), Proficiency::Expertise);
        assert!(entry.proficient && entry.expertise);
        entry.cycle();
        assert_eq!(entry, SkillEntry::default());
    }

    #[test]
    fn test_expertise_without_proficient_counts_as_expertise() {
        let entry = SkillEntry {
            proficient: false,
            expertise: true,
        };
        assert_eq!(entry.proficiency(), Proficiency::Expertise);
    }

    #[test]
    fn test_wire_names() {
        let mut doc = CharacterDocument::default();
        doc.basic_info.class_name = "Wizard".to_string();
        doc.basic_info.alignment = Some(Alignment::ChaoticGood);
        doc.spellcasting.spellcasting_ability = Some(Ability::Intelligence);
        doc.spellcasting.slot_mut(1).max = 2;

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["basicInfo"]["class"], "Wizard");
        assert_eq!(value["basicInfo"]["alignment"], "Chaotic Good");
        assert_eq!(value["spellcasting"]["spellcastingAbility"], "intelligence");
        assert_eq!(value["spellcasting"]["spellSaveDC"], 0);
        assert_eq!(value["spellcasting"]["spellSlots"]["1"]["max"], 2);
        assert_eq!(value["skills"]["sleightOfHand"]["proficient"], false);
        assert_eq!(value["combat"]["hitDice"]["total"], "1d8");
    }

    #[test]
    fn test_empty_strings_read_as_unset() {
        let doc: CharacterDocument = serde_json::from_value(json!({
            "basicInfo": {"name": "Vex", "alignment": ""},
            "spellcasting": {"spellcastingAbility": ""}
        }))
        .unwrap();

        assert_eq!(doc.basic_info.name, "Vex");
        assert_eq!(doc.basic_info.alignment, None);
        assert_eq!(doc.spellcasting.spellcasting_ability, None);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["basicInfo"]["alignment"], "");
    }

    #[test]
    fn test_partial_payload_is_fully_formed() {
        let doc: CharacterDocument = serde_json::from_value(json!({
            "skills": {"stealth": {"proficient": true}},
            "spellcasting": {"spellSlots": {"3": {"max": 2}}}
        }))
        .unwrap();

        assert!(doc.skills.get(Skill::Stealth).proficient);
        assert!(!doc.skills.get(Skill::Arcana).proficient);
        assert_eq!(doc.abilities.strength, 10);
        assert_eq!(doc.spellcasting.slot(3), SlotInfo { max: 2, used: 0 });
        assert_eq!(doc.spellcasting.slot(9), SlotInfo::default());
        assert_eq!(doc.combat.max_hit_points, 8);
    }

    #[test]
    fn test_slot_created_on_first_write() {
        let mut casting = Spellcasting::default();
        assert!(casting.spell_slots.is_empty());
        casting.slot_mut(2).used = 1;
        assert_eq!(casting.spell_slots.len(), 1);
        assert_eq!(casting.slot(2), SlotInfo { max: 0, used: 1 });
        assert_eq!(casting.slot(2).available(), 0);
    }

    #[test]
    fn test_parse_ability_and_skill_names() {
        assert_eq!("dex".parse::<Ability>().unwrap(), Ability::Dexterity);
        assert_eq!("Wisdom".parse::<Ability>().unwrap(), Ability::Wisdom);
        assert!("luck".parse::<Ability>().is_err());

        assert_eq!("sleight of hand".parse::<Skill>().unwrap(), Skill::SleightOfHand);
        assert_eq!("animalHandling".parse::<Skill>().unwrap(), Skill::AnimalHandling);
        assert!("cooking".parse::<Skill>().is_err());
    }

    #[test]
    fn test_skill_abilities() {
        assert_eq!(Skill::Athletics.ability(), Ability::Strength);
        assert_eq!(Skill::Stealth.ability(), Ability::Dexterity);
        assert_eq!(Skill::Arcana.ability(), Ability::Intelligence);
        assert_eq!(Skill::Perception.ability(), Ability::Wisdom);
        assert_eq!(Skill::Persuasion.ability(), Ability::Charisma);
    }

    #[test]
    fn test_features_by_category() {
        let mut doc = CharacterDocument::default();
        doc.features.push(Feature {
            id: FeatureId::new(),
            name: "Second Wind".to_string(),
            source: "Fighter 1".to_string(),
            description: String::new(),
            category: FeatureCategory::Feature,
        });
        doc.features.push(Feature {
            id: FeatureId::new(),
            name: "Darkvision".to_string(),
            source: "Dwarf".to_string(),
            description: String::new(),
            category: FeatureCategory::Trait,
        });

        let traits: Vec<_> = doc.features_in(FeatureCategory::Trait).collect();
        assert_eq!(traits.len(), 1);
        assert_eq!(traits[0].name, "Darkvision");
    }

    #[test]
    fn test_id_parse_roundtrip() {
        let id = LocalId::new();
        let parsed: LocalId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<LocalId>().is_err());
    }
}
