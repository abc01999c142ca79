//! Compound (derived) unit conversion
//!
//! A compound such as km/h is a product of `unit^exponent` components. Two
//! compounds convert into each other when their dimensional signatures agree,
//! and the ratio is the product of component factors raised to their
//! exponents.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use gauge_core::{ConversionError, IntoDecimal, Number};
use crate::config::EngineConfig;
use crate::model::CompoundUnit;
use crate::store::UnitStore;

/// Net exponent per unit type code, with zero entries removed
pub type Signature = BTreeMap<String, i32>;

/// Converts quantities between compound units
#[derive(Clone)]
pub struct CompoundUnitConverter {
    store: Arc<dyn UnitStore>,
    config: EngineConfig,
}

impl CompoundUnitConverter {
    pub fn new(store: Arc<dyn UnitStore>, config: EngineConfig) -> Self {
        CompoundUnitConverter { store, config }
    }

    pub fn convert<V: IntoDecimal>(
        &self,
        value: V,
        from: &str,
        to: &str,
        precision: Option<u32>,
    ) -> Result<Number, ConversionError> {
        let value = value.into_decimal()?;
        let from = self.resolve_or_fail(from)?;
        let to = self.resolve_or_fail(to)?;
        let scale = self.determine_scale(&from, &to, precision);

        if from.id == to.id {
            return Ok(value.rescale(scale)?);
        }

        if self.signature(&from)? != self.signature(&to)? {
            return Err(ConversionError::dimension_mismatch(&from.symbol, &to.symbol));
        }

        let from_factor = self.compound_factor(&from)?;
        let to_factor = self.compound_factor(&to)?;
        let result = value.mul(&from_factor)
            .checked_div(&to_factor)
            .map_err(|_| ConversionError::zero_factor(&to.symbol))?;

        debug!(value = %value, from = %from.symbol, to = %to.symbol, scale, "converted compound");
        Ok(result.rescale(scale)?)
    }

    /// Look up by numeric id or by name/symbol
    pub fn resolve(&self, identifier: &str) -> Result<Option<CompoundUnit>, ConversionError> {
        let needle = identifier.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        if needle.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(id) = needle.parse::<u64>() {
                if let Some(compound) = self.store.compound_by_id(id)? {
                    return Ok(Some(compound));
                }
            }
        }
        Ok(self.store.compound_by_name(&needle)?)
    }

    pub fn resolve_or_fail(&self, identifier: &str) -> Result<CompoundUnit, ConversionError> {
        self.resolve(identifier)?
            .ok_or_else(|| ConversionError::compound_not_found(identifier))
    }

    /// Dimensional shape of a compound: summed exponents per unit type
    pub fn signature(&self, compound: &CompoundUnit) -> Result<Signature, ConversionError> {
        let mut signature = Signature::new();
        for component in &compound.components {
            let unit_type = component.unit.unit_type.as_ref().ok_or_else(|| {
                ConversionError::missing_component_type(&component.unit.code, &compound.symbol)
            })?;
            *signature.entry(unit_type.code.clone()).or_insert(0) += component.exponent;
        }
        signature.retain(|_, exponent| *exponent != 0);
        Ok(signature)
    }

    /// Product of `factor^exponent` over the components, relative to base units
    pub fn compound_factor(&self, compound: &CompoundUnit) -> Result<Number, ConversionError> {
        let mut factor = Number::one();
        for component in &compound.components {
            if component.exponent == 0 {
                continue;
            }
            let unit = &component.unit;
            if unit.unit_type.is_none() {
                return Err(ConversionError::missing_component_type(&unit.code, &compound.symbol));
            }
            if unit.conversion_factor.is_zero() {
                return Err(ConversionError::zero_factor(&unit.code));
            }
            factor = factor.mul(&unit.conversion_factor.checked_pow(component.exponent)?);
        }
        Ok(factor)
    }

    /// Explicit precision, else the finest component precision of either
    /// compound, else the default
    pub fn determine_scale(&self, from: &CompoundUnit, to: &CompoundUnit, precision: Option<u32>) -> u32 {
        precision
            .or_else(|| {
                from.components.iter()
                    .chain(to.components.iter())
                    .filter_map(|c| c.unit.precision)
                    .max()
            })
            .unwrap_or(self.config.default_precision)
    }
}
