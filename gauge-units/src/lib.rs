//! Gauge Units - Unit-of-Measure Conversion Engine
//!
//! Converts quantities between catalog units, compound units, owner-scoped
//! custom units and packaging multiples, using exact decimal arithmetic.
//!
//! Components:
//! - `AliasResolver`: identifier (id, code, alias) to unit, cached
//! - `UnitConverter`: simple units via base unit or registered override
//! - `CompoundUnitConverter`: derived units (km/h, m/s², ...) by signature
//! - `CustomUnitRegistrar`: owner-scoped units and their conversions
//! - `PackagingCalculator`: base units to packages and back
//! - `Engine`: all of the above over one store
//!
//! Storage sits behind the `UnitStore` trait; `MemoryStore` is the
//! in-process implementation and `Catalog` seeds it with common units.

mod model;
mod owner;
mod store;
mod memory;
mod catalog;
mod config;
mod resolver;
mod convert;
mod compound;
mod formula;
mod custom;
mod packaging;
mod engine;

pub use model::{
    CompoundComponent, CompoundUnit, Conversion, CustomConversion, CustomUnit, Direction,
    Metadata, Packaging, Unit, UnitAlias, UnitType,
};
pub use owner::{Owner, OwnerKind, OwnerRef};
pub use store::{NewCustomConversion, NewCustomUnit, StoreError, StoreResult, UnitStore};
pub use memory::{MemoryStore, NewUnit};
pub use catalog::Catalog;
pub use config::EngineConfig;
pub use resolver::{AliasResolver, ResolverCache};
pub use convert::UnitConverter;
pub use compound::{CompoundUnitConverter, Signature};
pub use formula::Formula;
pub use custom::{normalize_metadata, CustomUnitDraft, CustomUnitRegistrar};
pub use packaging::{PackagingCalculator, PackagingRef};
pub use engine::Engine;

pub use gauge_core::{codes, ConversionError, EngineError, IntoDecimal, Number, NumberError, ValidationError};
