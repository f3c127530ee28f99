//! Hit dice notation.
//!
//! A hit dice pool is written as `NdM`, with multiclass pools joined by `+`
//! (`3d10+2d6`). Flat modifiers are not part of hit dice notation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Invalid die size: {0}")]
    InvalidDieSize(u32),
    #[error("No dice specified")]
    NoDice,
}

/// Standard D&D die types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieType {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D4 => 4,
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
            DieType::D20 => 20,
            DieType::D100 => 100,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            4 => Some(DieType::D4),
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            20 => Some(DieType::D20),
            100 => Some(DieType::D100),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

/// A group of identical dice, e.g. the `3d10` in `3d10+2d6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DicePool {
    pub count: u32,
    pub die_type: DieType,
}

/// Parsed hit dice notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitDiceNotation {
    pub pools: Vec<DicePool>,
}

impl HitDiceNotation {
    /// Parse notation like `1d8`, `d10` or `3d10+2d6`.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let notation = notation.trim().to_lowercase();
        if notation.is_empty() {
            return Err(DiceError::NoDice);
        }

        let mut pools = Vec::new();
        for part in notation.split('+') {
            let part: String = part.chars().filter(|c| !c.is_whitespace()).collect();
            pools.push(Self::parse_pool(&part)?);
        }

        Ok(Self { pools })
    }

    fn parse_pool(s: &str) -> Result<DicePool, DiceError> {
        let d_pos = s
            .find('d')
            .ok_or_else(|| DiceError::InvalidNotation(s.to_string()))?;
        let count_str = &s[..d_pos];
        let sides_str = &s[d_pos + 1..];

        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(s.to_string()))?
        };
        if count == 0 {
            return Err(DiceError::InvalidNotation(s.to_string()));
        }

        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        let die_type = DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))?;

        Ok(DicePool { count, die_type })
    }

    /// Total number of dice across all pools.
    pub fn total_dice(&self) -> u32 {
        self.pools.iter().map(|p| p.count).sum()
    }
}

impl fmt::Display for HitDiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pool) in self.pools.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}{}", pool.count, pool.die_type)?;
        }
        Ok(())
    }
}

impl FromStr for HitDiceNotation {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
