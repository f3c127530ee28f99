//! D&D 5e derived statistics.
//!
//! Pure functions from base attributes to the numbers printed on a sheet.
//! [`recompute`] is the single place where derived document fields are
//! written; the record store calls it after every edit.

use crate::character::{Ability, CharacterDocument, SaveEntry, Skill, SkillEntry};

/// Ability modifier: floor((score - 10) / 2).
pub fn ability_modifier(score: i32) -> i32 {
    // Floor division so that 9 -> -1 and 1 -> -5.
    (score - 10).div_euclid(2)
}

/// Proficiency bonus: ceil(level / 4) + 1.
pub fn proficiency_bonus(level: u32) -> i32 {
    level.div_ceil(4) as i32 + 1
}

/// Skill bonus. Expertise doubles proficiency and supersedes the
/// proficient flag.
pub fn skill_bonus(score: i32, entry: SkillEntry, proficiency: i32) -> i32 {
    let modifier = ability_modifier(score);
    if entry.expertise {
        modifier + 2 * proficiency
    } else if entry.proficient {
        modifier + proficiency
    } else {
        modifier
    }
}

pub fn saving_throw_bonus(score: i32, entry: SaveEntry, proficiency: i32) -> i32 {
    let modifier = ability_modifier(score);
    if entry.proficient {
        modifier + proficiency
    } else {
        modifier
    }
}

pub fn spell_save_dc(score: i32, proficiency: i32) -> i32 {
    8 + proficiency + ability_modifier(score)
}

pub fn spell_attack_bonus(score: i32, proficiency: i32) -> i32 {
    proficiency + ability_modifier(score)
}

/// Rewrite every derived field of `doc` from its base attributes.
///
/// Spell save DC and attack bonus are only touched while a spellcasting
/// ability is selected; clearing the ability leaves the last values in place.
pub fn recompute(doc: &mut CharacterDocument) {
    let proficiency = proficiency_bonus(doc.basic_info.level);
    doc.proficiency_bonus = proficiency;

    if let Some(ability) = doc.spellcasting.spellcasting_ability {
        let score = doc.abilities.get(ability);
        doc.spellcasting.spell_save_dc = spell_save_dc(score, proficiency);
        doc.spellcasting.spell_attack_bonus = spell_attack_bonus(score, proficiency);
    }

    doc.combat.initiative = ability_modifier(doc.abilities.dexterity);
}

/// Bonus for every skill, in alphabetical order.
pub fn all_skill_bonuses(doc: &CharacterDocument) -> Vec<(Skill, i32)> {
    Skill::all()
        .into_iter()
        .map(|skill| {
            let score = doc.abilities.get(skill.ability());
            let bonus = skill_bonus(score, doc.skills.get(skill), doc.proficiency_bonus);
            (skill, bonus)
        })
        .collect()
}

/// Saving throw bonus for every ability, in sheet order.
pub fn all_saving_throws(doc: &CharacterDocument) -> Vec<(Ability, i32)> {
    Ability::all()
        .into_iter()
        .map(|ability| {
            let score = doc.abilities.get(ability);
            let bonus =
                saving_throw_bonus(score, doc.saving_throws.get(ability), doc.proficiency_bonus);
            (ability, bonus)
        })
        .collect()
}

/// Render a bonus with an explicit sign: `+3`, `+0`, `-1`.
pub fn format_modifier(value: i32) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_modifier() {
        assert_eq!(ability_modifier(10), 0);
        assert_eq!(ability_modifier(11), 0);
        assert_eq!(ability_modifier(1), -5);
        assert_eq!(ability_modifier(30), 10);
        assert_eq!(ability_modifier(16), 3);

        // Odd scores below 10
        assert_eq!(ability_modifier(9), -1);
        assert_eq!(ability_modifier(7), -2);
        assert_eq!(ability_modifier(3), -4);

        for score in -5..40 {
            let expected = ((score - 10) as f64 / 2.0).floor() as i32;
            assert_eq!(ability_modifier(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_proficiency_bonus_table() {
        for (levels, expected) in [(1..=4, 2), (5..=8, 3), (9..=12, 4), (13..=16, 5), (17..=20, 6)] {
            for level in levels {
                assert_eq!(proficiency_bonus(level), expected, "level {level}");
            }
        }
    }

    #[test]
    fn test_skill_bonus_by_training() {
        let none = SkillEntry::default();
        let proficient = SkillEntry {
            proficient: true,
            expertise: false,
        };
        let expertise = SkillEntry {
            proficient: true,
            expertise: true,
        };

        assert_eq!(skill_bonus(14, none, 3), 2);
        assert_eq!(skill_bonus(14, proficient, 3), 5);
        assert_eq!(skill_bonus(14, expertise, 3), 8);
    }

    #[test]
    fn test_saving_throw_bonus() {
        assert_eq!(saving_throw_bonus(8, SaveEntry { proficient: false }, 2), -1);
        assert_eq!(saving_throw_bonus(8, SaveEntry { proficient: true }, 2), 1);
    }

    #[test]
    fn test_new_document_derivations() {
        let mut doc = CharacterDocument::default();
        recompute(&mut doc);

        assert_eq!(doc.proficiency_bonus, 2);
        assert_eq!(doc.combat.initiative, 0);
        for ability in Ability::all() {
            assert_eq!(doc.abilities.modifier(ability), 0);
        }
        assert!(all_skill_bonuses(&doc).iter().all(|(_, b)| *b == 0));

        doc.abilities.dexterity = 16;
        recompute(&mut doc);
        assert_eq!(doc.combat.initiative, 3);

        doc.basic_info.level = 5;
        recompute(&mut doc);
        assert_eq!(doc.proficiency_bonus, 3);

        doc.abilities.wisdom = 14;
        doc.skills.get_mut(Skill::Perception).proficient = true;
        let bonuses = all_skill_bonuses(&doc);
        let perception = bonuses.iter().find(|(s, _)| *s == Skill::Perception).unwrap();
        assert_eq!(perception.1, 5);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut doc = CharacterDocument::default();
        doc.abilities.dexterity = 7;
        doc.basic_info.level = 11;
        doc.spellcasting.spellcasting_ability = Some(Ability::Charisma);
        doc.abilities.charisma = 17;
        // Stale derived values are overwritten.
        doc.combat.initiative = 99;

        recompute(&mut doc);
        let once = doc.clone();
        recompute(&mut doc);
        assert_eq!(doc, once);
        assert_eq!(doc.combat.initiative, -2);
    }

    #[test]
    fn test_spellcasting_derivations() {
        let mut doc = CharacterDocument::default();
        doc.basic_info.level = 5;
        doc.abilities.intelligence = 18;
        doc.spellcasting.spellcasting_ability = Some(Ability::Intelligence);
        recompute(&mut doc);

        assert_eq!(doc.spellcasting.spell_save_dc, 15);
        assert_eq!(doc.spellcasting.spell_attack_bonus, 7);

        // Clearing the ability leaves the previous values in place.
        doc.spellcasting.spellcasting_ability = None;
        doc.abilities.intelligence = 10;
        recompute(&mut doc);
        assert_eq!(doc.spellcasting.spell_save_dc, 15);
        assert_eq!(doc.spellcasting.spell_attack_bonus, 7);
    }

    #[test]
    fn test_all_saving_throws() {
        let mut doc = CharacterDocument::default();
        doc.abilities.constitution = 15;
        doc.saving_throws.get_mut(Ability::Constitution).proficient = true;
        recompute(&mut doc);

        let saves = all_saving_throws(&doc);
        assert_eq!(saves.len(), 6);
        assert_eq!(saves[0], (Ability::Strength, 0));
        assert_eq!(saves[2], (Ability::Constitution, 4));
    }

    #[test]
    fn test_format_modifier() {
        assert_eq!(format_modifier(3), "+3");
        assert_eq!(format_modifier(0), "+0");
        assert_eq!(format_modifier(-1), "-1");
    }
}
