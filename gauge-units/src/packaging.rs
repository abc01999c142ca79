//! Packaging multiples
//!
//! A packaging says how many base units make one package ("box of 12").
//! Conversion is a single multiplication or division by that quantity.

use std::sync::Arc;
use tracing::debug;
use gauge_core::{ConversionError, IntoDecimal, Number};
use crate::config::EngineConfig;
use crate::model::Packaging;
use crate::resolver::AliasResolver;
use crate::store::UnitStore;

/// A packaging named by primary key or handed over directly
#[derive(Debug, Clone, Copy)]
pub enum PackagingRef<'a> {
    Id(u64),
    Record(&'a Packaging),
}

impl From<u64> for PackagingRef<'_> {
    fn from(id: u64) -> Self {
        PackagingRef::Id(id)
    }
}

impl<'a> From<&'a Packaging> for PackagingRef<'a> {
    fn from(packaging: &'a Packaging) -> Self {
        PackagingRef::Record(packaging)
    }
}

/// Converts between base-unit counts and package counts
#[derive(Clone)]
pub struct PackagingCalculator {
    store: Arc<dyn UnitStore>,
    resolver: AliasResolver,
    config: EngineConfig,
}

impl PackagingCalculator {
    pub fn new(store: Arc<dyn UnitStore>, resolver: AliasResolver, config: EngineConfig) -> Self {
        PackagingCalculator { store, resolver, config }
    }

    /// Find the packaging between two units named by identifier
    pub fn resolve_packaging(&self, base: &str, package: &str) -> Result<Packaging, ConversionError> {
        let base_unit = self.resolver.resolve_or_fail(base)?;
        let package_unit = self.resolver.resolve_or_fail(package)?;

        match self.store.packaging_between(base_unit.id, package_unit.id)? {
            Some(packaging) if packaging.is_valid() => {
                debug!(packaging = packaging.id, base = %base_unit.code, package = %package_unit.code, "resolved packaging");
                Ok(packaging)
            }
            _ => Err(ConversionError::no_packaging(&base_unit.code, &package_unit.code)),
        }
    }

    /// `quantity` packages expressed in base units
    pub fn packages_to_base<'a, V, P>(
        &self,
        quantity: V,
        packaging: P,
        precision: Option<u32>,
    ) -> Result<Number, ConversionError>
    where
        V: IntoDecimal,
        P: Into<PackagingRef<'a>>,
    {
        let quantity = quantity.into_decimal()?;
        let packaging = self.load(packaging.into())?;
        let scale = precision.unwrap_or(self.config.default_precision);
        Ok(quantity.mul(&packaging.quantity).rescale(scale)?)
    }

    /// `quantity` base units expressed in packages
    pub fn base_to_packages<'a, V, P>(
        &self,
        quantity: V,
        packaging: P,
        precision: Option<u32>,
    ) -> Result<Number, ConversionError>
    where
        V: IntoDecimal,
        P: Into<PackagingRef<'a>>,
    {
        let quantity = quantity.into_decimal()?;
        let packaging = self.load(packaging.into())?;
        let scale = precision.unwrap_or(self.config.default_precision);
        let packages = quantity.checked_div(&packaging.quantity).map_err(|_| {
            ConversionError::no_packaging(&packaging.base_unit.code, &packaging.package_unit.code)
        })?;
        Ok(packages.rescale(scale)?)
    }

    fn load(&self, packaging: PackagingRef<'_>) -> Result<Packaging, ConversionError> {
        match packaging {
            PackagingRef::Record(record) => Ok(record.clone()),
            PackagingRef::Id(id) => self.store.packaging_by_id(id)?
                .ok_or_else(|| ConversionError::no_packaging_id(id)),
        }
    }
}
