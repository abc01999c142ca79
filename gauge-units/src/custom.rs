//! Owner-scoped custom units
//!
//! Registration validates a draft, resolves the targets of its conversion
//! entries, and persists the unit with all its conversions in one store
//! call. Conversion entries arrive as loose JSON so callers can pass
//! whatever their form or import layer produced.

use std::sync::Arc;
use serde::{Serialize, Deserialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};
use gauge_core::{ConversionError, EngineError, IntoDecimal, Number, ValidationError};
use crate::config::EngineConfig;
use crate::formula::Formula;
use crate::model::{CustomConversion, CustomUnit, Metadata};
use crate::owner::{numeric_id, Owner, OwnerRef};
use crate::store::{NewCustomConversion, NewCustomUnit, StoreError, UnitStore};

/// Stored scale of custom conversion factors and offsets
const FACTOR_SCALE: u32 = 12;

fn default_factor() -> Number {
    Number::one()
}

/// Caller input for a new custom unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomUnitDraft {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub unit_type_id: Option<u64>,
    #[serde(default = "default_factor")]
    pub conversion_factor: Number,
    #[serde(default)]
    pub offset: Number,
    #[serde(default)]
    pub precision: Option<u32>,
    /// Objects are kept, arrays become index-keyed maps, anything else is dropped
    #[serde(default)]
    pub metadata: JsonValue,
}

impl CustomUnitDraft {
    pub fn new(code: &str, name: &str) -> Self {
        CustomUnitDraft {
            code: code.to_string(),
            name: name.to_string(),
            symbol: None,
            unit_type_id: None,
            conversion_factor: default_factor(),
            offset: Number::zero(),
            precision: None,
            metadata: JsonValue::Null,
        }
    }

    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = Some(symbol.to_string());
        self
    }

    pub fn with_unit_type(mut self, unit_type_id: u64) -> Self {
        self.unit_type_id = Some(unit_type_id);
        self
    }

    pub fn with_factor(mut self, factor: Number) -> Self {
        self.conversion_factor = factor;
        self
    }

    pub fn with_offset(mut self, offset: Number) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Coerce loose metadata into a map
pub fn normalize_metadata(value: &JsonValue) -> Option<Metadata> {
    match value {
        JsonValue::Object(map) => Some(map.clone()),
        JsonValue::Array(items) => Some(
            items.iter()
                .enumerate()
                .map(|(i, item)| (i.to_string(), item.clone()))
                .collect(),
        ),
        _ => None,
    }
}

/// A JSON number or numeric string as a decimal; absent or null gives `default`
fn decimal_field(entry: &serde_json::Map<String, JsonValue>, key: &str, default: Number) -> Result<Number, ConversionError> {
    match entry.get(key) {
        None | Some(JsonValue::Null) => Ok(default),
        Some(JsonValue::Number(n)) => Ok(Number::from_str(&n.to_string())?),
        Some(JsonValue::String(s)) => Ok(Number::from_str(s)?),
        Some(other) => Err(ConversionError::invalid_number(&other.to_string())),
    }
}

/// Registers custom units and converts between them
#[derive(Clone)]
pub struct CustomUnitRegistrar {
    store: Arc<dyn UnitStore>,
    config: EngineConfig,
}

impl CustomUnitRegistrar {
    pub fn new(store: Arc<dyn UnitStore>, config: EngineConfig) -> Self {
        CustomUnitRegistrar { store, config }
    }

    /// Validate and persist a custom unit with its conversions.
    ///
    /// Each conversion entry is a JSON object naming its target by `target`
    /// (a code, looked up in the owner's scope and then globally) or by
    /// `target_custom_unit_id`, plus optional `factor`, `offset`,
    /// `is_linear`, `formula` and `metadata`. Arrays are read as
    /// index-keyed maps. Scalar entries are ignored, as are entries that
    /// point back at the unit itself.
    pub fn register(
        &self,
        draft: CustomUnitDraft,
        owner: Option<OwnerRef>,
        conversions: &[JsonValue],
    ) -> Result<CustomUnit, EngineError> {
        let code = draft.code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyField { field: "code" }.into());
        }
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" }.into());
        }

        let owner = owner.map(|o| o.normalize());
        let metadata = normalize_metadata(&draft.metadata);

        if self.store.custom_unit_by_code(owner.as_ref(), code)
            .map_err(ConversionError::from)?
            .is_some()
        {
            return Err(ConversionError::duplicate_custom_unit(code).into());
        }

        if draft.conversion_factor.is_zero() {
            return Err(ConversionError::zero_factor(code).into());
        }

        let mut pending = Vec::with_capacity(conversions.len());
        for entry in conversions {
            if let Some(conversion) = self.prepare_conversion(entry, code, owner.as_ref())? {
                pending.push(conversion);
            }
        }

        let new_unit = NewCustomUnit {
            owner,
            code: code.to_string(),
            name: name.to_string(),
            symbol: draft.symbol,
            unit_type_id: draft.unit_type_id,
            conversion_factor: draft.conversion_factor,
            offset: draft.offset,
            precision: draft.precision,
            metadata,
        };

        let unit = match self.store.insert_custom_unit(new_unit, pending) {
            Ok(unit) => unit,
            Err(StoreError::Conflict(details)) => {
                warn!(code, details = %details, "custom unit registration lost a uniqueness race");
                return Err(ConversionError::duplicate_custom_unit(code).into());
            }
            Err(other) => return Err(ConversionError::from(other).into()),
        };

        info!(
            id = unit.id,
            code = %unit.code,
            owner = %unit.owner.map(|o| o.to_string()).unwrap_or_else(|| "global".to_string()),
            conversions = unit.conversions.len(),
            "registered custom unit"
        );
        Ok(unit)
    }

    fn prepare_conversion(
        &self,
        entry: &JsonValue,
        code: &str,
        owner: Option<&Owner>,
    ) -> Result<Option<NewCustomConversion>, ConversionError> {
        let Some(fields) = normalize_metadata(entry) else {
            debug!(entry = %entry, "skipping scalar conversion entry");
            return Ok(None);
        };

        let target_code = fields.get("target")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty());

        let target = match target_code {
            Some(target) if target == code => {
                debug!(code, "skipping conversion to itself");
                return Ok(None);
            }
            Some(target) => {
                let scoped = match owner {
                    Some(_) => self.store.custom_unit_by_code(owner, target)?,
                    None => None,
                };
                let found = match scoped {
                    Some(unit) => Some(unit),
                    None => self.store.custom_unit_by_code(None, target)?,
                };
                found.ok_or_else(|| ConversionError::custom_unit_not_found(target))?
            }
            None => {
                let raw = fields.get("target_custom_unit_id").cloned().unwrap_or(JsonValue::Null);
                let label = match &raw {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let found = match numeric_id(&raw) {
                    Some(id) => self.store.custom_unit_by_id(id)?,
                    None => None,
                };
                found.ok_or_else(|| ConversionError::custom_unit_not_found(&label))?
            }
        };

        let formula = fields.get("formula")
            .and_then(JsonValue::as_str)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        let is_linear = fields.get("is_linear")
            .and_then(JsonValue::as_bool)
            .unwrap_or(formula.is_none());
        let factor = decimal_field(&fields, "factor", Number::one())?.rescale(FACTOR_SCALE)?;
        let offset = decimal_field(&fields, "offset", Number::zero())?.rescale(FACTOR_SCALE)?;

        if is_linear && factor.is_zero() {
            return Err(ConversionError::zero_conversion_factor(&target.code));
        }
        if !is_linear {
            if let Some(source) = &formula {
                if !self.config.allow_custom_formulas {
                    return Err(ConversionError::formulas_disabled(&target.code));
                }
                Formula::parse(source)?;
            }
        }

        Ok(Some(NewCustomConversion {
            target_custom_unit_id: target.id,
            factor,
            offset,
            is_linear,
            formula,
            metadata: fields.get("metadata").and_then(normalize_metadata),
        }))
    }

    /// Convert between two custom units by id.
    ///
    /// A stored conversion from `from` to `to` applies directly (linear or
    /// formula). Failing that, a linear conversion stored the other way is
    /// inverted. Units sharing a unit type fall back to their own factors.
    pub fn convert<V: IntoDecimal>(
        &self,
        value: V,
        from_id: u64,
        to_id: u64,
        precision: Option<u32>,
    ) -> Result<Number, ConversionError> {
        let value = value.into_decimal()?;
        let from = self.custom_unit(from_id)?;
        let to = self.custom_unit(to_id)?;
        let scale = precision
            .or(from.precision.max(to.precision))
            .unwrap_or(self.config.default_precision);

        if from.id == to.id {
            return Ok(value.rescale(scale)?);
        }

        let result = if let Some(conversion) = from.conversion_to(to.id) {
            self.apply_forward(conversion, &value, &to.code)?
        } else if let Some(conversion) = to.conversion_to(from.id).filter(|c| c.is_linear) {
            value.sub(&conversion.offset)
                .checked_div(&conversion.factor)
                .map_err(|_| ConversionError::zero_conversion_factor(&from.code))?
        } else if from.unit_type_id.is_some() && from.unit_type_id == to.unit_type_id {
            let base = value.mul(&from.conversion_factor).add(&from.offset);
            base.sub(&to.offset)
                .checked_div(&to.conversion_factor)
                .map_err(|_| ConversionError::zero_factor(&to.code))?
        } else {
            return Err(ConversionError::no_custom_conversion(&from.code, &to.code));
        };

        debug!(value = %value, from = %from.code, to = %to.code, scale, "converted custom unit");
        Ok(result.rescale(scale)?)
    }

    fn custom_unit(&self, id: u64) -> Result<CustomUnit, ConversionError> {
        self.store.custom_unit_by_id(id)?
            .ok_or_else(|| ConversionError::custom_unit_not_found(&id.to_string()))
    }

    fn apply_forward(&self, conversion: &CustomConversion, value: &Number, target: &str) -> Result<Number, ConversionError> {
        match (&conversion.formula, conversion.is_linear) {
            (Some(source), false) => {
                if !self.config.allow_custom_formulas {
                    return Err(ConversionError::formulas_disabled(target));
                }
                Formula::parse(source)?.evaluate(value)
            }
            _ => Ok(value.mul(&conversion.factor).add(&conversion.offset)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use gauge_core::codes;
    use crate::memory::MemoryStore;
    use crate::owner::OwnerKind;

    fn num(s: &str) -> Number {
        Number::from_str(s).unwrap()
    }

    fn registrar(config: EngineConfig) -> (CustomUnitRegistrar, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CustomUnitRegistrar::new(store.clone(), config), store)
    }

    fn conversion_error(err: EngineError) -> ConversionError {
        err.as_conversion().cloned().expect("expected a conversion error")
    }

    #[test]
    fn test_register_minimal() {
        let (registrar, _) = registrar(EngineConfig::default());
        let unit = registrar.register(CustomUnitDraft::new(" crate ", "Crate"), None, &[]).unwrap();
        assert_eq!(unit.code, "crate");
        assert_eq!(unit.owner, None);
        assert_eq!(unit.conversion_factor, Number::one());
    }

    #[test]
    fn test_blank_code_or_name_is_validation_error() {
        let (registrar, _) = registrar(EngineConfig::default());
        let err = registrar.register(CustomUnitDraft::new("  ", "Crate"), None, &[]).unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyField { field: "code" }));

        let err = registrar.register(CustomUnitDraft::new("crate", ""), None, &[]).unwrap_err();
        assert_eq!(err.as_validation(), Some(&ValidationError::EmptyField { field: "name" }));
    }

    #[test]
    fn test_zero_factor_rejected() {
        let (registrar, store) = registrar(EngineConfig::default());
        let draft = CustomUnitDraft::new("void", "Void").with_factor(Number::zero());
        let err = conversion_error(registrar.register(draft, None, &[]).unwrap_err());
        assert!(err.is(codes::ZERO_FACTOR));
        assert_eq!(store.custom_unit_count().unwrap(), 0);
    }

    #[test]
    fn test_codes_are_scoped_by_owner() {
        let (registrar, _) = registrar(EngineConfig::default());
        let acme = OwnerRef::pair(OwnerKind::Company, 1);
        let globex = OwnerRef::pair(OwnerKind::Company, 2);

        registrar.register(CustomUnitDraft::new("pallet", "Pallet"), Some(acme.clone()), &[]).unwrap();
        registrar.register(CustomUnitDraft::new("pallet", "Pallet"), Some(globex), &[]).unwrap();
        registrar.register(CustomUnitDraft::new("pallet", "Pallet"), None, &[]).unwrap();

        let err = conversion_error(registrar.register(CustomUnitDraft::new("pallet", "Pallet"), Some(acme), &[]).unwrap_err());
        assert!(err.is(codes::DUPLICATE_CUSTOM_UNIT));
        assert_eq!(err.message, "Custom unit code 'pallet' already exists for this owner");
    }

    #[test]
    fn test_owner_record_normalization() {
        let (registrar, _) = registrar(EngineConfig::default());
        let owner = OwnerRef::record(OwnerKind::Warehouse, json!({"owner_id": "12"}));
        let unit = registrar.register(CustomUnitDraft::new("bin", "Bin"), Some(owner), &[]).unwrap();
        assert_eq!(unit.owner, Some(Owner::new(OwnerKind::Warehouse, 12)));
    }

    #[test]
    fn test_metadata_normalization() {
        assert_eq!(normalize_metadata(&json!("loose")), None);
        assert_eq!(normalize_metadata(&json!(null)), None);

        let map = normalize_metadata(&json!(["a", "b"])).unwrap();
        assert_eq!(map.get("1"), Some(&json!("b")));

        let (registrar, _) = registrar(EngineConfig::default());
        let draft = CustomUnitDraft::new("tote", "Tote").with_metadata(json!({"colour": "blue"}));
        let unit = registrar.register(draft, None, &[]).unwrap();
        assert_eq!(unit.metadata.unwrap().get("colour"), Some(&json!("blue")));
    }

    #[test]
    fn test_conversions_by_code_and_id() {
        let (registrar, _) = registrar(EngineConfig::default());
        let crate_unit = registrar.register(CustomUnitDraft::new("crate", "Crate"), None, &[]).unwrap();
        let bin = registrar.register(CustomUnitDraft::new("bin", "Bin"), None, &[]).unwrap();

        let pallet = registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[
                json!({"target": "crate", "factor": 40}),
                json!({"target_custom_unit_id": bin.id, "factor": "2.5", "metadata": {"note": "approx"}}),
                json!("not an entry"),
                json!(17),
            ],
        ).unwrap();

        assert_eq!(pallet.conversions.len(), 2);
        let to_crate = pallet.conversion_to(crate_unit.id).unwrap();
        assert_eq!(to_crate.factor.to_string(), "40.000000000000");
        assert!(to_crate.is_linear);
        let to_bin = pallet.conversion_to(bin.id).unwrap();
        assert_eq!(to_bin.factor, num("2.5"));
        assert!(to_bin.metadata.is_some());
    }

    #[test]
    fn test_target_lookup_prefers_owner_scope() {
        let (registrar, _) = registrar(EngineConfig::default());
        let acme = OwnerRef::pair(OwnerKind::Company, 1);
        registrar.register(CustomUnitDraft::new("crate", "Global crate"), None, &[]).unwrap();
        let scoped = registrar.register(CustomUnitDraft::new("crate", "Acme crate"), Some(acme.clone()), &[]).unwrap();

        let pallet = registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            Some(acme),
            &[json!({"target": "crate", "factor": 40})],
        ).unwrap();
        assert_eq!(pallet.conversions[0].target_custom_unit_id, scoped.id);
    }

    #[test]
    fn test_unknown_target_leaves_nothing_behind() {
        let (registrar, store) = registrar(EngineConfig::default());
        let err = conversion_error(registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "ghost", "factor": 2})],
        ).unwrap_err());
        assert!(err.is(codes::CUSTOM_UNIT_NOT_FOUND));
        assert_eq!(err.message, "Custom unit 'ghost' could not be found");
        assert_eq!(store.custom_unit_count().unwrap(), 0);
    }

    #[test]
    fn test_array_entry_is_not_skipped() {
        let (registrar, _) = registrar(EngineConfig::default());
        let err = conversion_error(registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!(["crate", 40])],
        ).unwrap_err());
        assert!(err.is(codes::CUSTOM_UNIT_NOT_FOUND));
    }

    #[test]
    fn test_self_reference_is_skipped() {
        let (registrar, _) = registrar(EngineConfig::default());
        let unit = registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "pallet", "factor": 1})],
        ).unwrap();
        assert!(unit.conversions.is_empty());
    }

    #[test]
    fn test_zero_conversion_factor() {
        let (registrar, _) = registrar(EngineConfig::default());
        registrar.register(CustomUnitDraft::new("crate", "Crate"), None, &[]).unwrap();
        let err = conversion_error(registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "crate", "factor": 0})],
        ).unwrap_err());
        assert!(err.is(codes::ZERO_FACTOR));
        assert_eq!(err.message, "Conversion to 'crate' specifies a zero factor");
    }

    #[test]
    fn test_factor_that_rounds_to_zero_is_rejected() {
        let (registrar, _) = registrar(EngineConfig::default());
        registrar.register(CustomUnitDraft::new("crate", "Crate"), None, &[]).unwrap();
        let err = conversion_error(registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "crate", "factor": "1e-13"})],
        ).unwrap_err());
        assert!(err.is(codes::ZERO_FACTOR));

        let pallet = registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "crate", "factor": "1e-12"})],
        ).unwrap();
        assert_eq!(pallet.conversions[0].factor, num("0.000000000001"));
    }

    #[test]
    fn test_formula_requires_flag() {
        let (registrar, _) = registrar(EngineConfig::default());
        registrar.register(CustomUnitDraft::new("crate", "Crate"), None, &[]).unwrap();
        let err = conversion_error(registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "crate", "is_linear": false, "formula": "value * 40"})],
        ).unwrap_err());
        assert!(err.is(codes::FORMULAS_DISABLED));
    }

    #[test]
    fn test_malformed_formula_rejected_up_front() {
        let (registrar, _) = registrar(EngineConfig::default().with_custom_formulas(true));
        registrar.register(CustomUnitDraft::new("crate", "Crate"), None, &[]).unwrap();
        let err = conversion_error(registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "crate", "formula": "value * rate"})],
        ).unwrap_err());
        assert!(err.is(codes::INVALID_FORMULA));
    }

    #[test]
    fn test_convert_forward_reverse_and_formula() {
        let (registrar, _) = registrar(EngineConfig::default().with_custom_formulas(true));
        let crate_unit = registrar.register(CustomUnitDraft::new("crate", "Crate"), None, &[]).unwrap();
        let pallet = registrar.register(
            CustomUnitDraft::new("pallet", "Pallet"),
            None,
            &[json!({"target": "crate", "factor": 40})],
        ).unwrap();
        let lot = registrar.register(
            CustomUnitDraft::new("lot", "Lot"),
            None,
            &[json!({"target": "crate", "formula": "value * 100 + 5"})],
        ).unwrap();

        let forward = registrar.convert(2, pallet.id, crate_unit.id, Some(0)).unwrap();
        assert_eq!(forward.to_string(), "80");
        let reverse = registrar.convert(100, crate_unit.id, pallet.id, Some(2)).unwrap();
        assert_eq!(reverse.to_string(), "2.50");
        let formula = registrar.convert(3, lot.id, crate_unit.id, None).unwrap();
        assert_eq!(formula.to_string(), "305.0000");
    }

    #[test]
    fn test_convert_through_shared_type() {
        let (registrar, _) = registrar(EngineConfig::default());
        let small = registrar.register(
            CustomUnitDraft::new("cup", "Cup").with_unit_type(3).with_factor(num("0.25")),
            None,
            &[],
        ).unwrap();
        let large = registrar.register(
            CustomUnitDraft::new("jug", "Jug").with_unit_type(3).with_factor(num("2")),
            None,
            &[],
        ).unwrap();
        assert_eq!(registrar.convert(16, small.id, large.id, Some(1)).unwrap().to_string(), "2.0");
    }

    #[test]
    fn test_convert_without_relationship() {
        let (registrar, _) = registrar(EngineConfig::default());
        let a = registrar.register(CustomUnitDraft::new("a", "A"), None, &[]).unwrap();
        let b = registrar.register(CustomUnitDraft::new("b", "B"), None, &[]).unwrap();
        let err = registrar.convert(1, a.id, b.id, None).unwrap_err();
        assert!(err.is(codes::NO_CUSTOM_CONVERSION));
        assert!(registrar.convert(1, a.id, 999, None).unwrap_err().is(codes::CUSTOM_UNIT_NOT_FOUND));
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let draft: CustomUnitDraft = serde_json::from_value(json!({"code": "tub", "name": "Tub"})).unwrap();
        assert_eq!(draft.conversion_factor, Number::one());
        assert_eq!(draft.metadata, JsonValue::Null);
    }
}
