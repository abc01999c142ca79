//! Records the engine reads from the store
//!
//! Every aggregate arrives fully populated: a unit carries its type and
//! aliases, a compound carries its component units, a packaging carries both
//! of its units. Converters never go back to the store for a relation.

use std::fmt;
use serde::{Serialize, Deserialize};
use gauge_core::{ConversionError, Number};
use crate::owner::Owner;

/// Free-form key/value bag attached to custom units and conversions
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A dimension family (length, mass, time, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitType {
    pub id: u64,
    /// Stable code (e.g., "length")
    pub code: String,
    pub name: String,
}

/// Alternate, case-insensitive name of a unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAlias {
    pub alias: String,
    #[serde(default)]
    pub is_preferred: bool,
}

/// A catalog unit with its conversion factor relative to its type's base unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: u64,
    /// The unit code (e.g., "km", "kg", "s"), unique within the catalog
    pub code: String,
    /// The unit name (e.g., "kilometre")
    pub name: String,
    /// Aliases in insertion order
    #[serde(default)]
    pub aliases: Vec<UnitAlias>,
    /// The dimension family this unit measures
    pub unit_type: Option<UnitType>,
    /// Whether this is the reference unit of its type
    #[serde(default)]
    pub is_base: bool,
    /// Factor to convert to the base unit (value_base = value * factor + offset)
    pub conversion_factor: Number,
    /// Offset for affine units like temperature
    #[serde(default)]
    pub offset: Number,
    /// Suggested result scale
    pub precision: Option<u32>,
}

impl Unit {
    /// Check if this unit has an offset (non-proportional conversion)
    pub fn has_offset(&self) -> bool {
        !self.offset.is_zero()
    }

    pub fn unit_type_id(&self) -> Option<u64> {
        self.unit_type.as_ref().map(|t| t.id)
    }

    /// Check if two units measure the same dimension family
    pub fn is_compatible(&self, other: &Unit) -> bool {
        match (self.unit_type_id(), other.unit_type_id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Convert a value from this unit to its base unit
    pub fn to_base(&self, value: &Number) -> Result<Number, ConversionError> {
        if self.conversion_factor.is_zero() {
            return Err(ConversionError::zero_factor(&self.code));
        }
        // value_base = value * factor + offset
        Ok(value.mul(&self.conversion_factor).add(&self.offset))
    }

    /// Convert a value from the base unit to this unit
    pub fn from_base(&self, base_value: &Number) -> Result<Number, ConversionError> {
        // value = (value_base - offset) / factor
        let shifted = base_value.sub(&self.offset);
        shifted.checked_div(&self.conversion_factor)
            .map_err(|_| ConversionError::zero_factor(&self.code))
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// Which traversals an override conversion allows, relative to its stored
/// source and target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// source -> target only
    Forward,
    /// target -> source only
    Reverse,
    /// either way
    Both,
}

impl Direction {
    pub fn allows_forward(self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }

    pub fn allows_reverse(self) -> bool {
        matches!(self, Direction::Reverse | Direction::Both)
    }
}

/// Registered override: `target = source * factor + offset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub id: u64,
    pub source_unit_id: u64,
    pub target_unit_id: u64,
    pub factor: Number,
    #[serde(default)]
    pub offset: Number,
    pub direction: Direction,
}

impl Conversion {
    /// Travel source -> target
    pub fn apply_forward(&self, value: &Number) -> Number {
        value.mul(&self.factor).add(&self.offset)
    }

    /// Travel target -> source
    pub fn apply_reverse(&self, value: &Number, source_code: &str) -> Result<Number, ConversionError> {
        value.sub(&self.offset)
            .checked_div(&self.factor)
            .map_err(|_| ConversionError::zero_conversion_factor(source_code))
    }
}

/// One `(unit, exponent)` factor of a compound unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundComponent {
    pub unit: Unit,
    pub exponent: i32,
}

/// A derived unit such as km/h (km^1 h^-1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundUnit {
    pub id: u64,
    pub name: String,
    pub symbol: String,
    /// Components in declaration order
    pub components: Vec<CompoundComponent>,
}

impl fmt::Display for CompoundUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// An owner-scoped unit outside the shared catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomUnit {
    pub id: u64,
    /// `None` means a global custom unit
    pub owner: Option<Owner>,
    pub code: String,
    pub name: String,
    pub symbol: Option<String>,
    pub unit_type_id: Option<u64>,
    pub conversion_factor: Number,
    #[serde(default)]
    pub offset: Number,
    pub precision: Option<u32>,
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub conversions: Vec<CustomConversion>,
}

impl CustomUnit {
    /// The stored conversion from this unit to `target_id`, if any
    pub fn conversion_to(&self, target_id: u64) -> Option<&CustomConversion> {
        self.conversions.iter().find(|c| c.target_custom_unit_id == target_id)
    }
}

/// Conversion from one custom unit to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomConversion {
    pub id: u64,
    pub custom_unit_id: u64,
    pub target_custom_unit_id: u64,
    pub factor: Number,
    #[serde(default)]
    pub offset: Number,
    pub is_linear: bool,
    /// Only honored when custom formulas are enabled
    pub formula: Option<String>,
    pub metadata: Option<Metadata>,
}

/// `quantity` base units make one package unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packaging {
    pub id: u64,
    pub base_unit: Unit,
    pub package_unit: Unit,
    pub quantity: Number,
}

impl Packaging {
    /// A zero quantity cannot express a relationship
    pub fn is_valid(&self) -> bool {
        !self.quantity.is_zero()
    }
}
