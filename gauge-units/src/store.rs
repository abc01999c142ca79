//! Repository boundary between the engine and whatever persists units

use thiserror::Error;
use gauge_core::{ConversionError, Number};
use crate::model::{CompoundUnit, Conversion, CustomUnit, Metadata, Packaging, Unit};
use crate::owner::Owner;

/// Failures reported by a store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("uniqueness constraint violated: {0}")]
    Conflict(String),

    #[error("referenced record is missing: {0}")]
    Integrity(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for ConversionError {
    fn from(err: StoreError) -> Self {
        ConversionError::store(err.to_string())
    }
}

/// Custom unit about to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomUnit {
    pub owner: Option<Owner>,
    pub code: String,
    pub name: String,
    pub symbol: Option<String>,
    pub unit_type_id: Option<u64>,
    pub conversion_factor: Number,
    pub offset: Number,
    pub precision: Option<u32>,
    pub metadata: Option<Metadata>,
}

/// Conversion about to be persisted alongside its [`NewCustomUnit`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomConversion {
    pub target_custom_unit_id: u64,
    pub factor: Number,
    pub offset: Number,
    pub is_linear: bool,
    pub formula: Option<String>,
    pub metadata: Option<Metadata>,
}

/// Read access to the unit catalog plus the one write the engine performs.
///
/// Lookups return fully populated aggregates. Name lookups receive a
/// trimmed, lower-cased needle.
pub trait UnitStore: Send + Sync {
    fn unit_by_id(&self, id: u64) -> StoreResult<Option<Unit>>;

    /// Case-insensitive match on code, then on aliases
    fn unit_by_name(&self, needle: &str) -> StoreResult<Option<Unit>>;

    /// The unit flagged `is_base` for a type
    fn base_unit(&self, unit_type_id: u64) -> StoreResult<Option<Unit>>;

    /// Overrides stored exactly as `source -> target`
    fn conversions_between(&self, source_unit_id: u64, target_unit_id: u64) -> StoreResult<Vec<Conversion>>;

    fn compound_by_id(&self, id: u64) -> StoreResult<Option<CompoundUnit>>;

    /// Case-insensitive match on name or symbol
    fn compound_by_name(&self, needle: &str) -> StoreResult<Option<CompoundUnit>>;

    fn packaging_by_id(&self, id: u64) -> StoreResult<Option<Packaging>>;

    fn packaging_between(&self, base_unit_id: u64, package_unit_id: u64) -> StoreResult<Option<Packaging>>;

    fn custom_unit_by_id(&self, id: u64) -> StoreResult<Option<CustomUnit>>;

    /// Exact code match within one owner scope (`None` is the global scope)
    fn custom_unit_by_code(&self, owner: Option<&Owner>, code: &str) -> StoreResult<Option<CustomUnit>>;

    /// Persist a custom unit and its conversions atomically.
    ///
    /// Either everything is stored or nothing is. A unit whose code already
    /// exists for the same owner fails with [`StoreError::Conflict`].
    fn insert_custom_unit(
        &self,
        unit: NewCustomUnit,
        conversions: Vec<NewCustomConversion>,
    ) -> StoreResult<CustomUnit>;
}
