//! # Validation Levels — Ternary Match Outcome
//!
//! A validator does not answer "yes or no". It answers how much of a value
//! matches a descriptor:
//!
//! | Level | Bits | Meaning |
//! |-------|------|---------|
//! | `None` | `0b00` | The value does not match. |
//! | `Full` | `0b01` | The value matches completely. |
//! | `Partial` | `0b10` | The outer shape matches, the contents do not (e.g. `[1, "2"]` against `list[int]`). |
//!
//! ## Combination Rules
//!
//! Levels combine bitwise:
//!
//! - **AND** (`&`) is intersection. Starting from `Full` and AND-ing the level
//!   of every part yields `Full` only when every part is `Full`; any other mix
//!   collapses to `None`. Container validators use this to decide between
//!   `Full` and `Partial`.
//! - **OR** (`|`) is union. `Full | Partial` produces the bit pattern `0b11`,
//!   which is not a level. OR therefore yields a [`LevelMask`], resolved with
//!   [`LevelMask::level`]: "contains Full" wins over "contains Partial".

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

/// The outcome of validating a value against a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum ValidationLevel {
    /// The value does not match the descriptor.
    None = 0,
    /// The value matches the descriptor completely.
    Full = 1,
    /// The value matches the outer shape but not all of its contents.
    Partial = 2,
}

impl ValidationLevel {
    /// Raw bit pattern of this level.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Returns true for [`ValidationLevel::Full`].
    pub const fn is_full(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Returns true for [`ValidationLevel::Partial`].
    pub const fn is_partial(self) -> bool {
        matches!(self, Self::Partial)
    }

    /// Returns true for anything but [`ValidationLevel::None`].
    pub const fn matches(self) -> bool {
        !matches!(self, Self::None)
    }

    /// AND-reduce the levels of every part of a container, starting from
    /// `Full`. Returns `Full` when every part is `Full` (including when there
    /// are no parts), otherwise `Partial`: the container itself already matched.
    pub fn all_parts<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = ValidationLevel>,
    {
        let reduced = parts
            .into_iter()
            .fold(ValidationLevel::Full, |acc, level| acc & level);
        if reduced.is_full() {
            Self::Full
        } else {
            Self::Partial
        }
    }

    /// OR-reduce the levels of alternative variants and resolve the mask.
    pub fn best_of<I>(variants: I) -> Self
    where
        I: IntoIterator<Item = ValidationLevel>,
    {
        variants
            .into_iter()
            .fold(LevelMask::EMPTY, |mask, level| mask | level)
            .level()
    }
}

impl From<bool> for ValidationLevel {
    fn from(matched: bool) -> Self {
        if matched {
            Self::Full
        } else {
            Self::None
        }
    }
}

impl fmt::Display for ValidationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "NONE",
            Self::Full => "FULL",
            Self::Partial => "PARTIAL",
        })
    }
}

impl BitAnd for ValidationLevel {
    type Output = ValidationLevel;

    /// Intersection. The result of AND-ing two levels is always a level:
    /// `0b01 & 0b10 == 0b00`.
    fn bitand(self, rhs: Self) -> Self::Output {
        match self.bits() & rhs.bits() {
            1 => Self::Full,
            2 => Self::Partial,
            _ => Self::None,
        }
    }
}

impl BitOr for ValidationLevel {
    type Output = LevelMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        LevelMask(self.bits() | rhs.bits())
    }
}

/// The union of several validation levels.
///
/// Holds the raw bits produced by OR-ing levels, including the `0b11` pattern
/// that no single level represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LevelMask(u8);

impl LevelMask {
    /// The mask with no bits set; the identity of OR.
    pub const EMPTY: LevelMask = LevelMask(0);

    /// Raw bits of the mask.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether some combined level was `Full`.
    pub const fn contains_full(self) -> bool {
        self.0 & ValidationLevel::Full.bits() != 0
    }

    /// Whether some combined level was `Partial`.
    pub const fn contains_partial(self) -> bool {
        self.0 & ValidationLevel::Partial.bits() != 0
    }

    /// Resolve the mask to a single level, preferring `Full` over `Partial`
    /// over `None`.
    pub const fn level(self) -> ValidationLevel {
        if self.contains_full() {
            ValidationLevel::Full
        } else if self.contains_partial() {
            ValidationLevel::Partial
        } else {
            ValidationLevel::None
        }
    }
}

impl BitOr<ValidationLevel> for LevelMask {
    type Output = LevelMask;

    fn bitor(self, rhs: ValidationLevel) -> Self::Output {
        LevelMask(self.0 | rhs.bits())
    }
}

impl From<ValidationLevel> for LevelMask {
    fn from(level: ValidationLevel) -> Self {
        LevelMask(level.bits())
    }
}
