//! Unit-aware quantities
//!
//! Scalar requirement values like `8 GB`, `512 MiB` or `2.5 GHz` normalize to
//! a magnitude in the category's base unit (bytes, hertz, or a raw count for
//! dimensionless values). Decimal SI prefixes (`kB` = 10^3 B) and binary IEC
//! prefixes (`KiB` = 2^10 B) are distinct and never conflated.
//!
//! Quantities only compare within one category; `partial_cmp` across
//! categories yields `None`, which the evaluator reports as a mismatch
//! rather than an error.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Unit Categories
// ============================================================================

/// The dimension a quantity is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitCategory {
    /// Storage size, base unit bytes.
    Size,
    /// Frequency, base unit hertz.
    Frequency,
    /// Dimensionless count (`cpu.cores`, `cpu.model`, ...), compared by raw value.
    Count,
}

impl UnitCategory {
    /// Symbol of the category's base unit (empty for counts).
    pub fn base_symbol(self) -> &'static str {
        match self {
            Self::Size => "B",
            Self::Frequency => "Hz",
            Self::Count => "",
        }
    }

    /// Human-readable category name, used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Frequency => "frequency",
            Self::Count => "count",
        }
    }
}

impl fmt::Display for UnitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Quantity
// ============================================================================

/// A numeric magnitude normalized to its category's base unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quantity {
    magnitude: f64,
    category: UnitCategory,
}

impl Quantity {
    /// A size quantity, in bytes.
    pub fn bytes(magnitude: f64) -> Self {
        Self {
            magnitude,
            category: UnitCategory::Size,
        }
    }

    /// A frequency quantity, in hertz.
    pub fn hertz(magnitude: f64) -> Self {
        Self {
            magnitude,
            category: UnitCategory::Frequency,
        }
    }

    /// A dimensionless count.
    pub fn count(magnitude: f64) -> Self {
        Self {
            magnitude,
            category: UnitCategory::Count,
        }
    }

    /// Magnitude in the category's base unit.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// The quantity's unit category.
    pub fn category(&self) -> UnitCategory {
        self.category
    }

    /// Reinterprets a dimensionless count as `category`'s base unit.
    ///
    /// Candidates commonly report plain numbers for unit-typed fields
    /// (`memory = 8000000000` meaning bytes); this is the safe coercion the
    /// evaluator applies before comparing.
    pub fn assume_category(self, category: UnitCategory) -> Self {
        match self.category {
            UnitCategory::Count => Self {
                magnitude: self.magnitude,
                category,
            },
            _ => self,
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category && self.magnitude == other.magnitude
    }
}

impl PartialOrd for Quantity {
    /// `None` across categories — incompatible units never compare.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.category == other.category {
            self.magnitude.partial_cmp(&other.magnitude)
        } else {
            None
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = self.category.base_symbol();
        if symbol.is_empty() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, symbol)
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Why a quantity token failed to parse.
///
/// The constraint parser wraps this into a
/// [`RequirementError::MalformedValue`](crate::error::RequirementError) with
/// the field path attached.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseQuantityError {
    /// Token was empty or all whitespace.
    #[error("empty value")]
    Empty,
    /// The leading numeric literal could not be parsed.
    #[error("invalid numeric literal '{0}'")]
    BadLiteral(String),
    /// The trailing unit symbol is not recognized.
    #[error("unrecognized unit '{0}'")]
    UnknownUnit(String),
}

impl FromStr for Quantity {
    type Err = ParseQuantityError;

    /// Parses `8`, `8.5 GB`, `512MiB`, `2.5 GHz` — unit glued or
    /// space-separated. Plain numbers are dimensionless.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ParseQuantityError::Empty);
        }

        let split = numeric_prefix_len(token);
        if split == 0 {
            return Err(ParseQuantityError::BadLiteral(token.to_string()));
        }
        let (literal, unit) = token.split_at(split);
        let magnitude: f64 = literal
            .parse()
            .map_err(|_| ParseQuantityError::BadLiteral(literal.to_string()))?;

        let unit = unit.trim();
        let (scale, category) = unit_scale(unit)
            .ok_or_else(|| ParseQuantityError::UnknownUnit(unit.to_string()))?;

        Ok(Self {
            magnitude: magnitude * scale,
            category,
        })
    }
}

/// Length of the leading numeric literal: sign, digits, decimal point and an
/// exponent when one actually follows.
fn numeric_prefix_len(token: &str) -> usize {
    let bytes = token.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    // `8e3` is a literal; `8 EB` is not an exponent.
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            i = j;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        }
    }
    i
}

/// Maps a unit symbol to (scale into base unit, category).
///
/// A fixed table rather than prefix arithmetic: the recognized set is small
/// and closed, and `MB` vs `MiB` must never be conflated.
fn unit_scale(unit: &str) -> Option<(f64, UnitCategory)> {
    const KI: f64 = 1024.0;
    let entry = match unit {
        "" => (1.0, UnitCategory::Count),

        // Decimal SI sizes
        "B" => (1.0, UnitCategory::Size),
        "kB" | "KB" => (1e3, UnitCategory::Size),
        "MB" => (1e6, UnitCategory::Size),
        "GB" => (1e9, UnitCategory::Size),
        "TB" => (1e12, UnitCategory::Size),
        "PB" => (1e15, UnitCategory::Size),

        // Binary IEC sizes
        "KiB" => (KI, UnitCategory::Size),
        "MiB" => (KI * KI, UnitCategory::Size),
        "GiB" => (KI * KI * KI, UnitCategory::Size),
        "TiB" => (KI * KI * KI * KI, UnitCategory::Size),
        "PiB" => (KI * KI * KI * KI * KI, UnitCategory::Size),

        // Frequencies
        "Hz" => (1.0, UnitCategory::Frequency),
        "kHz" | "KHz" => (1e3, UnitCategory::Frequency),
        "MHz" => (1e6, UnitCategory::Frequency),
        "GHz" => (1e9, UnitCategory::Frequency),
        "THz" => (1e12, UnitCategory::Frequency),

        _ => return None,
    };
    Some(entry)
}

// ============================================================================
// Tests
// ============================================================================
