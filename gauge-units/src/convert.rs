//! Simple unit conversion
//!
//! Two units of the same type convert through the type's base unit
//! (`value * factor + offset` there, the inverse on the way back) unless a
//! registered override covers the pair, in which case the override wins.

use std::sync::Arc;
use tracing::debug;
use gauge_core::{ConversionError, IntoDecimal, Number};
use crate::config::EngineConfig;
use crate::model::Unit;
use crate::resolver::AliasResolver;
use crate::store::UnitStore;

/// Converts quantities between catalog units
#[derive(Clone)]
pub struct UnitConverter {
    store: Arc<dyn UnitStore>,
    resolver: AliasResolver,
    config: EngineConfig,
}

impl UnitConverter {
    pub fn new(store: Arc<dyn UnitStore>, resolver: AliasResolver, config: EngineConfig) -> Self {
        UnitConverter { store, resolver, config }
    }

    /// Convert `value` from one unit to another, rounding once to the
    /// resolved scale
    pub fn convert<V: IntoDecimal>(
        &self,
        value: V,
        from: &str,
        to: &str,
        precision: Option<u32>,
    ) -> Result<Number, ConversionError> {
        let value = value.into_decimal()?;
        let from = self.resolver.resolve_or_fail(from)?;
        let to = self.resolver.resolve_or_fail(to)?;
        let scale = self.determine_scale(&from, &to, precision);

        if from.id == to.id {
            return Ok(value.rescale(scale)?);
        }

        for unit in [&from, &to] {
            if unit.unit_type.is_none() {
                return Err(ConversionError::missing_unit_type(&unit.code));
            }
        }
        if !from.is_compatible(&to) {
            return Err(ConversionError::type_mismatch(&from.code, &to.code));
        }

        let result = match self.apply_override(&value, &from, &to)? {
            Some(result) => result,
            None => {
                let base = self.convert_to_base(&value, &from)?;
                self.convert_from_base(&base, &to)?
            }
        };

        debug!(value = %value, from = %from.code, to = %to.code, scale, "converted");
        Ok(result.rescale(scale)?)
    }

    /// `value * factor + offset`
    pub fn convert_to_base(&self, value: &Number, unit: &Unit) -> Result<Number, ConversionError> {
        unit.to_base(value)
    }

    /// `(base - offset) / factor`; the unit's type must have a base unit
    pub fn convert_from_base(&self, base_value: &Number, unit: &Unit) -> Result<Number, ConversionError> {
        let unit_type = unit.unit_type.as_ref()
            .ok_or_else(|| ConversionError::missing_unit_type(&unit.code))?;
        if self.store.base_unit(unit_type.id)?.is_none() {
            return Err(ConversionError::no_base_unit(&unit_type.code));
        }
        unit.from_base(base_value)
    }

    /// Explicit precision, else the finer of the two units, else the default
    pub fn determine_scale(&self, from: &Unit, to: &Unit, precision: Option<u32>) -> u32 {
        precision
            .or(from.precision.max(to.precision))
            .unwrap_or(self.config.default_precision)
    }

    fn apply_override(&self, value: &Number, from: &Unit, to: &Unit) -> Result<Option<Number>, ConversionError> {
        let forward = self.store.conversions_between(from.id, to.id)?;
        if let Some(conversion) = forward.iter().find(|c| c.direction.allows_forward()) {
            debug!(conversion = conversion.id, from = %from.code, to = %to.code, "override applied forward");
            return Ok(Some(conversion.apply_forward(value)));
        }

        let reverse = self.store.conversions_between(to.id, from.id)?;
        if let Some(conversion) = reverse.iter().find(|c| c.direction.allows_reverse()) {
            debug!(conversion = conversion.id, from = %from.code, to = %to.code, "override applied in reverse");
            return conversion.apply_reverse(value, &to.code).map(Some);
        }

        Ok(None)
    }
}
