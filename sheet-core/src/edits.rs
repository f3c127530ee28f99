//! Validated edits on the open character.
//!
//! Each helper checks its input first. A rejected edit leaves the document
//! untouched and reports the refusal through its return value (`false` or
//! `None`) instead of an error.

use crate::character::{
    Ability, Alignment, Cantrip, Coin, EquipmentItem, Feature, FeatureCategory, FeatureId, ItemId,
    Proficiency, Skill, Spell, SpellId, MAX_ABILITY_SCORE, MAX_LEVEL, MIN_ABILITY_SCORE, MIN_LEVEL,
};
use crate::dice::HitDiceNotation;
use crate::store::CharacterStore;
use sheet_api::catalog::SpellOption;

/// Highest spell slot level.
pub const MAX_SPELL_LEVEL: u8 = 9;

/// Input for [`CharacterStore::add_item`].
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub quantity: u32,
    pub weight: f64,
    pub description: String,
}

impl NewItem {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: 1,
            ..Default::default()
        }
    }
}

/// Input for [`CharacterStore::add_spell`]. Level 0 adds a cantrip.
#[derive(Debug, Clone, Default)]
pub struct NewSpell {
    pub name: String,
    pub level: u8,
    pub school: String,
    pub casting_time: String,
    pub range: String,
    pub components: String,
    pub duration: String,
    pub description: String,
}

impl From<&SpellOption> for NewSpell {
    fn from(option: &SpellOption) -> Self {
        Self {
            name: option.name.clone(),
            level: option.level,
            school: option.school.clone(),
            casting_time: option.casting_time.clone(),
            range: option.range.clone(),
            components: option.components.clone(),
            duration: option.duration.clone(),
            description: String::new(),
        }
    }
}

/// Input for [`CharacterStore::add_feature`].
#[derive(Debug, Clone, Default)]
pub struct NewFeature {
    pub name: String,
    pub source: String,
    pub description: String,
    pub category: FeatureCategory,
}

fn valid_score(score: i32) -> bool {
    (MIN_ABILITY_SCORE..=MAX_ABILITY_SCORE).contains(&score)
}

fn valid_slot_level(level: u8) -> bool {
    (1..=MAX_SPELL_LEVEL).contains(&level)
}

impl CharacterStore {
    // ========================================================================
    // Identity and abilities
    // ========================================================================

    pub fn set_name(&mut self, name: &str) {
        let name = name.to_string();
        self.apply(|doc| doc.basic_info.name = name);
    }

    /// Set a score. Values outside 1-30 are refused, not clamped.
    pub fn set_ability(&mut self, ability: Ability, score: i32) -> bool {
        if !valid_score(score) {
            return false;
        }
        self.apply(|doc| doc.abilities.set(ability, score));
        true
    }

    /// Move a score by `delta`, refusing steps that leave 1-30.
    pub fn step_ability(&mut self, ability: Ability, delta: i32) -> bool {
        let score = self.doc().abilities.get(ability).saturating_add(delta);
        self.set_ability(ability, score)
    }

    pub fn set_level(&mut self, level: u32) -> bool {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
            return false;
        }
        self.apply(|doc| doc.basic_info.level = level);
        true
    }

    pub fn set_experience(&mut self, experience_points: i64) -> bool {
        let Ok(xp) = u32::try_from(experience_points) else {
            return false;
        };
        self.apply(|doc| doc.basic_info.experience_points = xp);
        true
    }

    pub fn set_alignment(&mut self, alignment: Option<Alignment>) {
        self.apply(|doc| doc.basic_info.alignment = alignment);
    }

    /// Advance a skill through none, proficient, expertise and back.
    pub fn cycle_skill(&mut self, skill: Skill) -> Proficiency {
        self.apply(|doc| doc.skills.get_mut(skill).cycle());
        self.doc().skills.get(skill).proficiency()
    }

    /// Flip save proficiency; returns the new state.
    pub fn toggle_saving_throw(&mut self, ability: Ability) -> bool {
        self.apply(|doc| {
            let entry = doc.saving_throws.get_mut(ability);
            entry.proficient = !entry.proficient;
        });
        self.doc().saving_throws.get(ability).proficient
    }

    // ========================================================================
    // Combat
    // ========================================================================

    /// Set hit dice notation such as `5d10` or `3d8+2d6`. Stored normalized.
    pub fn set_hit_dice_total(&mut self, notation: &str) -> bool {
        let Ok(parsed) = HitDiceNotation::parse(notation) else {
            return false;
        };
        let total = parsed.to_string();
        self.apply(|doc| doc.combat.hit_dice.total = total);
        true
    }

    /// Add one success or failure; returns the new tally.
    pub fn record_death_save(&mut self, success: bool) -> u32 {
        self.apply(|doc| {
            let saves = &mut doc.combat.death_saves;
            if success {
                saves.successes += 1;
            } else {
                saves.failures += 1;
            }
        });
        let saves = &self.doc().combat.death_saves;
        if success {
            saves.successes
        } else {
            saves.failures
        }
    }

    pub fn reset_death_saves(&mut self) {
        self.apply(|doc| doc.combat.death_saves = Default::default());
    }

    // ========================================================================
    // Equipment and currency
    // ========================================================================

    /// Append an item. Refuses a blank name, zero quantity or a negative
    /// weight.
    pub fn add_item(&mut self, item: NewItem) -> Option<ItemId> {
        let name = item.name.trim();
        if name.is_empty() || item.quantity < 1 || !(item.weight >= 0.0 && item.weight.is_finite()) {
            return None;
        }

        let id = ItemId::new();
        let entry = EquipmentItem {
            id,
            name: name.to_string(),
            quantity: item.quantity,
            weight: item.weight,
            description: item.description,
            equipped: false,
        };
        self.apply(|doc| doc.equipment.push(entry));
        Some(id)
    }

    pub fn remove_item(&mut self, id: ItemId) -> bool {
        if !self.doc().equipment.iter().any(|i| i.id == id) {
            return false;
        }
        self.apply(|doc| doc.equipment.retain(|i| i.id != id));
        true
    }

    /// Flip the equipped flag; `None` when no item has this id.
    pub fn toggle_equipped(&mut self, id: ItemId) -> Option<bool> {
        let equipped = !self.doc().equipment.iter().find(|i| i.id == id)?.equipped;
        self.apply(|doc| {
            if let Some(item) = doc.equipment.iter_mut().find(|i| i.id == id) {
                item.equipped = equipped;
            }
        });
        Some(equipped)
    }

    pub fn set_currency(&mut self, coin: Coin, amount: i64) -> bool {
        let Ok(amount) = u32::try_from(amount) else {
            return false;
        };
        self.apply(|doc| doc.currency.set(coin, amount));
        true
    }

    // ========================================================================
    // Spellcasting
    // ========================================================================

    /// Select or clear the casting ability. Clearing keeps the last DC and
    /// attack bonus.
    pub fn set_spellcasting_ability(&mut self, ability: Option<Ability>) {
        self.apply(|doc| doc.spellcasting.spellcasting_ability = ability);
    }

    /// Add a leveled spell, or a cantrip when `level` is 0.
    pub fn add_spell(&mut self, spell: NewSpell) -> Option<SpellId> {
        let name = spell.name.trim();
        if name.is_empty() || spell.level > MAX_SPELL_LEVEL {
            return None;
        }

        let id = SpellId::new();
        if spell.level == 0 {
            let cantrip = Cantrip {
                id,
                name: name.to_string(),
                school: spell.school,
                description: spell.description,
            };
            self.apply(|doc| doc.spellcasting.cantrips.push(cantrip));
        } else {
            let entry = Spell {
                id,
                name: name.to_string(),
                level: spell.level,
                school: spell.school,
                casting_time: spell.casting_time,
                range: spell.range,
                components: spell.components,
                duration: spell.duration,
                description: spell.description,
                prepared: false,
            };
            self.apply(|doc| doc.spellcasting.spells_known.push(entry));
        }
        Some(id)
    }

    /// Add a spell pre-filled from a reference catalog entry.
    pub fn add_catalog_spell(&mut self, option: &SpellOption) -> Option<SpellId> {
        self.add_spell(NewSpell::from(option))
    }

    /// Flip the prepared flag of a leveled spell.
    pub fn toggle_prepared(&mut self, id: SpellId) -> Option<bool> {
        let prepared = !self
            .doc()
            .spellcasting
            .spells_known
            .iter()
            .find(|s| s.id == id)?
            .prepared;
        self.apply(|doc| {
            if let Some(spell) = doc.spellcasting.spells_known.iter_mut().find(|s| s.id == id) {
                spell.prepared = prepared;
            }
        });
        Some(prepared)
    }

    /// Remove a spell or cantrip by id.
    pub fn remove_spell(&mut self, id: SpellId) -> bool {
        let casting = &self.doc().spellcasting;
        let known = casting.spells_known.iter().any(|s| s.id == id)
            || casting.cantrips.iter().any(|c| c.id == id);
        if !known {
            return false;
        }
        self.apply(|doc| {
            doc.spellcasting.spells_known.retain(|s| s.id != id);
            doc.spellcasting.cantrips.retain(|c| c.id != id);
        });
        true
    }

    /// Set the slot maximum. Expended slots above the new maximum are
    /// dropped to it.
    pub fn set_slot_max(&mut self, level: u8, max: u32) -> bool {
        if !valid_slot_level(level) {
            return false;
        }
        self.apply(|doc| {
            let slot = doc.spellcasting.slot_mut(level);
            slot.max = max;
            slot.used = slot.used.min(max);
        });
        true
    }

    /// Set expended slots; refused above the slot maximum.
    pub fn set_slot_used(&mut self, level: u8, used: u32) -> bool {
        if !valid_slot_level(level) || used > self.doc().spellcasting.slot(level).max {
            return false;
        }
        self.apply(|doc| doc.spellcasting.slot_mut(level).used = used);
        true
    }

    // ========================================================================
    // Features
    // ========================================================================

    pub fn add_feature(&mut self, feature: NewFeature) -> Option<FeatureId> {
        let name = feature.name.trim();
        if name.is_empty() {
            return None;
        }

        let id = FeatureId::new();
        let entry = Feature {
            id,
            name: name.to_string(),
            source: feature.source,
            description: feature.description,
            category: feature.category,
        };
        self.apply(|doc| doc.features.push(entry));
        Some(id)
    }

    pub fn remove_feature(&mut self, id: FeatureId) -> bool {
        if !self.doc().features.iter().any(|f| f.id == id) {
            return false;
        }
        self.apply(|doc| doc.features.retain(|f| f.id != id));
        true
    }
}
