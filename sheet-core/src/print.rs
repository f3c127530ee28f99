//! Printable character sheet.
//!
//! Lays the sheet out on A4 pages measured in millimetres, then emits each
//! page as plain text. Sections always appear in the same order: identity,
//! abilities, combat, saves, skills, equipment, currency, spellcasting,
//! features, personality, notes. Larger sections start a fresh page when
//! the current one is nearly full.

use crate::character::{Ability, CharacterDocument, Skill};
use crate::rules::{self, format_modifier};

const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;
const SMALL_LINE: f32 = 5.0;
const PAGE_HEIGHT: f32 = 297.0;
const PAGE_BOTTOM: f32 = PAGE_HEIGHT - MARGIN;
/// Text columns that fit the 175 mm printable width.
const WRAP_COLUMNS: usize = 90;
const COLUMN_WIDTH: usize = 44;

/// A rendered sheet, one `Vec` of lines per page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintedSheet {
    pub pages: Vec<Vec<String>>,
}

impl PrintedSheet {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Pages separated by form feeds.
    pub fn to_text(&self) -> String {
        self.pages
            .iter()
            .map(|page| page.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\x0c\n")
    }
}

struct Layout {
    pages: Vec<Vec<String>>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: MARGIN,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.y = MARGIN;
    }

    fn break_if_past(&mut self, threshold: f32) {
        if self.y > threshold {
            self.new_page();
        }
    }

    fn emit(&mut self, text: impl Into<String>, advance: f32) {
        if self.y > PAGE_BOTTOM {
            self.new_page();
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(text.into());
        }
        self.y += advance;
    }

    fn gap(&mut self, mm: f32) {
        self.y += mm;
    }

    fn section(&mut self, title: &str) {
        self.gap(2.0);
        if let Some(page) = self.pages.last_mut() {
            if !page.is_empty() {
                page.push(String::new());
            }
        }
        self.emit(title, LINE_HEIGHT);
    }

    fn wrapped(&mut self, text: &str, indent: &str, advance: f32) {
        let options = textwrap::Options::new(WRAP_COLUMNS)
            .initial_indent(indent)
            .subsequent_indent(indent);
        for line in textwrap::wrap(text, options) {
            self.emit(line.into_owned(), advance);
        }
    }

    fn finish(self) -> PrintedSheet {
        PrintedSheet { pages: self.pages }
    }
}

fn two_columns(left: &str, right: &str) -> String {
    format!("{left:<COLUMN_WIDTH$}{right}")
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

/// Lay out `doc` as printable pages.
pub fn render(doc: &CharacterDocument) -> PrintedSheet {
    let mut layout = Layout::new();
    let prof = rules::proficiency_bonus(doc.basic_info.level);
    let info = &doc.basic_info;

    // Identity
    let title = if info.name.trim().is_empty() {
        "Unnamed Character"
    } else {
        info.name.as_str()
    };
    layout.emit(title, 8.0);
    let subclass = if info.subclass.is_empty() {
        String::new()
    } else {
        format!(" ({})", info.subclass)
    };
    layout.emit(
        format!(
            "{} {}{} - Level {}",
            info.race, info.class_name, subclass, info.level
        ),
        SMALL_LINE,
    );
    let alignment = info.alignment.map(|a| a.name()).unwrap_or("-");
    layout.emit(
        format!(
            "Background: {}  |  Alignment: {}  |  XP: {}",
            or_dash(&info.background),
            alignment,
            info.experience_points
        ),
        8.0,
    );

    // Abilities
    layout.section("ABILITY SCORES");
    let labels: Vec<String> = Ability::all()
        .iter()
        .map(|a| format!("{:<10}", a.abbreviation()))
        .collect();
    let scores: Vec<String> = Ability::all()
        .iter()
        .map(|a| {
            let score = doc.abilities.get(*a);
            format!("{:<10}", format!("{score} ({})", format_modifier(rules::ability_modifier(score))))
        })
        .collect();
    layout.emit(labels.concat().trim_end().to_string(), SMALL_LINE);
    layout.emit(scores.concat().trim_end().to_string(), 7.0);

    // Combat
    layout.section("COMBAT");
    let combat = &doc.combat;
    layout.emit(
        format!(
            "AC: {}  |  Initiative: {}  |  Speed: {} ft",
            combat.armor_class,
            format_modifier(combat.initiative),
            combat.speed
        ),
        LINE_HEIGHT,
    );
    layout.emit(
        format!(
            "HP: {}/{}  |  Temp HP: {}  |  Hit Dice: {}",
            combat.current_hit_points,
            combat.max_hit_points,
            combat.temporary_hit_points,
            combat.hit_dice.total
        ),
        LINE_HEIGHT,
    );
    layout.emit(format!("Prof. Bonus: {}", format_modifier(prof)), 8.0);

    // Saving throws, two columns of three
    layout.section("SAVING THROWS");
    let saves: Vec<String> = Ability::all()
        .iter()
        .map(|a| {
            let entry = doc.saving_throws.get(*a);
            let bonus = rules::saving_throw_bonus(doc.abilities.get(*a), entry, prof);
            let mark = if entry.proficient { '●' } else { '○' };
            format!("{mark} {}: {}", a.abbreviation(), format_modifier(bonus))
        })
        .collect();
    for row in 0..3 {
        layout.emit(two_columns(&saves[row], &saves[row + 3]), LINE_HEIGHT);
    }
    layout.gap(4.0);

    // Skills, two columns of nine
    layout.section("SKILLS");
    let skills: Vec<String> = Skill::all()
        .iter()
        .map(|s| {
            let entry = doc.skills.get(*s);
            let bonus = rules::skill_bonus(doc.abilities.get(s.ability()), entry, prof);
            let mark = if entry.expertise {
                '◆'
            } else if entry.proficient {
                '●'
            } else {
                '○'
            };
            format!("{mark} {}: {}", s.name(), format_modifier(bonus))
        })
        .collect();
    for row in 0..9 {
        layout.emit(two_columns(&skills[row], &skills[row + 9]), LINE_HEIGHT);
    }
    layout.gap(6.0);

    layout.break_if_past(250.0);

    // Equipment
    if !doc.equipment.is_empty() {
        layout.section("EQUIPMENT");
        for item in &doc.equipment {
            let marker = if item.equipped { "[E]" } else { "   " };
            let weight = if item.weight > 0.0 {
                format!(" ({} lb)", item.weight)
            } else {
                String::new()
            };
            layout.emit(
                format!("{marker} {} x{}{weight}", item.name, item.quantity),
                LINE_HEIGHT,
            );
        }
        layout.gap(2.0);
    }

    // Currency
    layout.section("CURRENCY");
    let c = &doc.currency;
    layout.emit(
        format!(
            "CP: {}  SP: {}  EP: {}  GP: {}  PP: {}",
            c.copper, c.silver, c.electrum, c.gold, c.platinum
        ),
        8.0,
    );

    // Spellcasting
    let casting = &doc.spellcasting;
    if let Some(ability) = casting.spellcasting_ability {
        layout.break_if_past(220.0);
        layout.section("SPELLCASTING");
        layout.emit(
            format!(
                "Ability: {}  |  Spell Save DC: {}  |  Spell Attack: {}",
                ability.name(),
                casting.spell_save_dc,
                format_modifier(casting.spell_attack_bonus)
            ),
            LINE_HEIGHT,
        );

        let slots: Vec<String> = casting
            .spell_slots
            .iter()
            .filter(|(_, slot)| slot.max > 0)
            .map(|(level, slot)| format!("{level}: {}/{}", slot.available(), slot.max))
            .collect();
        if !slots.is_empty() {
            layout.emit(format!("Slots  {}", slots.join("  ")), LINE_HEIGHT);
        }

        if !casting.cantrips.is_empty() {
            layout.emit("Cantrips:", SMALL_LINE);
            for cantrip in &casting.cantrips {
                layout.emit(format!("    {}", cantrip.name), LINE_HEIGHT);
            }
        }
        if !casting.spells_known.is_empty() {
            layout.emit("Spells:", SMALL_LINE);
            for spell in &casting.spells_known {
                let prepared = if spell.prepared { "[P]" } else { "   " };
                layout.emit(
                    format!("    {prepared} Lvl {}: {}", spell.level, spell.name),
                    LINE_HEIGHT,
                );
            }
        }
        layout.gap(2.0);
    }

    // Features and traits
    if !doc.features.is_empty() {
        layout.break_if_past(220.0);
        layout.section("FEATURES & TRAITS");
        for feature in &doc.features {
            layout.break_if_past(270.0);
            let heading = if feature.source.is_empty() {
                feature.name.clone()
            } else {
                format!("{} ({})", feature.name, feature.source)
            };
            layout.emit(heading, SMALL_LINE);
            if !feature.description.trim().is_empty() {
                layout.wrapped(&feature.description, "  ", SMALL_LINE);
            }
            layout.gap(3.0);
        }
    }

    // Personality
    layout.break_if_past(230.0);
    layout.section("PERSONALITY");
    let personality = &doc.personality;
    for (label, value) in [
        ("Traits", &personality.traits),
        ("Ideals", &personality.ideals),
        ("Bonds", &personality.bonds),
        ("Flaws", &personality.flaws),
    ] {
        if !value.trim().is_empty() {
            layout.wrapped(&format!("{label}: {value}"), "", LINE_HEIGHT);
        }
    }

    // Notes
    if !doc.notes.trim().is_empty() {
        layout.break_if_past(220.0);
        layout.section("NOTES");
        for paragraph in doc.notes.lines() {
            if paragraph.trim().is_empty() {
                layout.emit("", SMALL_LINE);
            } else {
                layout.wrapped(paragraph, "", SMALL_LINE);
            }
        }
    }

    layout.finish()
}

/// Suggested file name, e.g. `Vex_Level5_Wizard.txt`.
pub fn print_file_name(doc: &CharacterDocument) -> String {
    let info = &doc.basic_info;
    let name = if info.name.trim().is_empty() {
        "Character".to_string()
    } else {
        info.name.split_whitespace().collect::<Vec<_>>().join("_")
    };
    let class = if info.class_name.trim().is_empty() {
        "Unknown".to_string()
    } else {
        info.class_name.split_whitespace().collect::<Vec<_>>().join("_")
    };
    format!("{name}_Level{}_{class}.txt", info.level)
}
