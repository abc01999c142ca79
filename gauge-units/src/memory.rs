//! In-process store
//!
//! Keeps every table behind a single `RwLock`, so each write (including a
//! custom unit with all its conversions) is applied atomically.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use gauge_core::Number;
use crate::model::{
    CompoundComponent, CompoundUnit, Conversion, CustomConversion, CustomUnit, Direction,
    Packaging, Unit, UnitAlias, UnitType,
};
use crate::owner::Owner;
use crate::store::{NewCustomConversion, NewCustomUnit, StoreError, StoreResult, UnitStore};

/// Catalog unit about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewUnit {
    pub code: String,
    pub name: String,
    pub unit_type_id: Option<u64>,
    pub is_base: bool,
    pub conversion_factor: Number,
    pub offset: Number,
    pub precision: Option<u32>,
    pub aliases: Vec<UnitAlias>,
}

impl NewUnit {
    /// Create a proportional unit (no offset)
    pub fn new(code: &str, name: &str, unit_type_id: u64, conversion_factor: Number) -> Self {
        NewUnit {
            code: code.to_string(),
            name: name.to_string(),
            unit_type_id: Some(unit_type_id),
            is_base: false,
            conversion_factor,
            offset: Number::zero(),
            precision: None,
            aliases: Vec::new(),
        }
    }

    /// Mark as the base unit of its type
    pub fn base(mut self) -> Self {
        self.is_base = true;
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

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(UnitAlias { alias: alias.to_string(), is_preferred: false });
        self
    }

    pub fn with_preferred_alias(mut self, alias: &str) -> Self {
        self.aliases.push(UnitAlias { alias: alias.to_string(), is_preferred: true });
        self
    }

    /// Drop the unit type (records imported without one)
    pub fn without_type(mut self) -> Self {
        self.unit_type_id = None;
        self
    }
}

#[derive(Debug, Default)]
struct Sequences {
    unit_type: u64,
    unit: u64,
    conversion: u64,
    compound: u64,
    packaging: u64,
    custom_unit: u64,
    custom_conversion: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone)]
struct StoredCompound {
    id: u64,
    name: String,
    symbol: String,
    components: Vec<(u64, i32)>,
}

#[derive(Debug, Clone)]
struct StoredPackaging {
    id: u64,
    base_unit_id: u64,
    package_unit_id: u64,
    quantity: Number,
}

#[derive(Debug, Default)]
struct State {
    ids: Sequences,
    unit_types: BTreeMap<u64, UnitType>,
    units: BTreeMap<u64, Unit>,
    conversions: BTreeMap<u64, Conversion>,
    compounds: BTreeMap<u64, StoredCompound>,
    packagings: BTreeMap<u64, StoredPackaging>,
    custom_units: BTreeMap<u64, CustomUnit>,
    custom_conversions: BTreeMap<u64, CustomConversion>,
}

impl State {
    fn unit(&self, id: u64) -> StoreResult<Unit> {
        self.units.get(&id)
            .cloned()
            .ok_or_else(|| StoreError::Integrity(format!("unit #{}", id)))
    }

    fn assemble_compound(&self, stored: &StoredCompound) -> StoreResult<CompoundUnit> {
        let components = stored.components.iter()
            .map(|&(unit_id, exponent)| Ok(CompoundComponent { unit: self.unit(unit_id)?, exponent }))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(CompoundUnit {
            id: stored.id,
            name: stored.name.clone(),
            symbol: stored.symbol.clone(),
            components,
        })
    }

    fn assemble_packaging(&self, stored: &StoredPackaging) -> StoreResult<Packaging> {
        Ok(Packaging {
            id: stored.id,
            base_unit: self.unit(stored.base_unit_id)?,
            package_unit: self.unit(stored.package_unit_id)?,
            quantity: stored.quantity.clone(),
        })
    }

    fn assemble_custom(&self, unit: &CustomUnit) -> CustomUnit {
        let mut unit = unit.clone();
        unit.conversions = self.custom_conversions.values()
            .filter(|c| c.custom_unit_id == unit.id)
            .cloned()
            .collect();
        unit
    }
}

/// Thread-safe in-memory implementation of [`UnitStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state.read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state.write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    // ========== Administration ==========

    pub fn insert_unit_type(&self, code: &str, name: &str) -> StoreResult<UnitType> {
        let mut state = self.write()?;
        if state.unit_types.values().any(|t| t.code.eq_ignore_ascii_case(code)) {
            return Err(StoreError::Conflict(format!("unit type '{}'", code)));
        }
        let unit_type = UnitType {
            id: next(&mut state.ids.unit_type),
            code: code.to_string(),
            name: name.to_string(),
        };
        state.unit_types.insert(unit_type.id, unit_type.clone());
        Ok(unit_type)
    }

    pub fn unit_type_by_code(&self, code: &str) -> StoreResult<Option<UnitType>> {
        let state = self.read()?;
        Ok(state.unit_types.values().find(|t| t.code.eq_ignore_ascii_case(code)).cloned())
    }

    /// Insert a catalog unit.
    ///
    /// Codes are unique case-insensitively, a type has at most one base
    /// unit, and a unit has at most one preferred alias.
    pub fn insert_unit(&self, new: NewUnit) -> StoreResult<Unit> {
        let mut state = self.write()?;

        if state.units.values().any(|u| u.code.eq_ignore_ascii_case(&new.code)) {
            return Err(StoreError::Conflict(format!("unit code '{}'", new.code)));
        }
        if new.aliases.iter().filter(|a| a.is_preferred).count() > 1 {
            return Err(StoreError::Conflict(format!("unit '{}' has several preferred aliases", new.code)));
        }

        let unit_type = match new.unit_type_id {
            Some(type_id) => Some(state.unit_types.get(&type_id)
                .cloned()
                .ok_or_else(|| StoreError::Integrity(format!("unit type #{}", type_id)))?),
            None => None,
        };

        if new.is_base {
            let type_id = unit_type.as_ref()
                .map(|t| t.id)
                .ok_or_else(|| StoreError::Integrity(format!("base unit '{}' has no type", new.code)))?;
            if state.units.values().any(|u| u.is_base && u.unit_type_id() == Some(type_id)) {
                return Err(StoreError::Conflict(format!("type #{} already has a base unit", type_id)));
            }
        }

        let unit = Unit {
            id: next(&mut state.ids.unit),
            code: new.code,
            name: new.name,
            aliases: new.aliases,
            unit_type,
            is_base: new.is_base,
            conversion_factor: new.conversion_factor,
            offset: new.offset,
            precision: new.precision,
        };
        state.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    pub fn insert_conversion(
        &self,
        source_unit_id: u64,
        target_unit_id: u64,
        factor: Number,
        offset: Number,
        direction: Direction,
    ) -> StoreResult<Conversion> {
        let mut state = self.write()?;
        state.unit(source_unit_id)?;
        state.unit(target_unit_id)?;

        let conversion = Conversion {
            id: next(&mut state.ids.conversion),
            source_unit_id,
            target_unit_id,
            factor,
            offset,
            direction,
        };
        state.conversions.insert(conversion.id, conversion.clone());
        Ok(conversion)
    }

    pub fn insert_compound(&self, name: &str, symbol: &str, components: &[(u64, i32)]) -> StoreResult<CompoundUnit> {
        let mut state = self.write()?;
        for &(unit_id, _) in components {
            state.unit(unit_id)?;
        }
        let stored = StoredCompound {
            id: next(&mut state.ids.compound),
            name: name.to_string(),
            symbol: symbol.to_string(),
            components: components.to_vec(),
        };
        let compound = state.assemble_compound(&stored)?;
        state.compounds.insert(stored.id, stored);
        Ok(compound)
    }

    pub fn insert_packaging(&self, base_unit_id: u64, package_unit_id: u64, quantity: Number) -> StoreResult<Packaging> {
        let mut state = self.write()?;
        if state.packagings.values().any(|p| p.base_unit_id == base_unit_id && p.package_unit_id == package_unit_id) {
            return Err(StoreError::Conflict(format!(
                "packaging #{} -> #{}", base_unit_id, package_unit_id
            )));
        }
        let stored = StoredPackaging {
            id: next(&mut state.ids.packaging),
            base_unit_id,
            package_unit_id,
            quantity,
        };
        let packaging = state.assemble_packaging(&stored)?;
        state.packagings.insert(stored.id, stored);
        Ok(packaging)
    }

    pub fn custom_unit_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.custom_units.len())
    }

    pub fn custom_conversion_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.custom_conversions.len())
    }
}

impl UnitStore for MemoryStore {
    fn unit_by_id(&self, id: u64) -> StoreResult<Option<Unit>> {
        Ok(self.read()?.units.get(&id).cloned())
    }

    fn unit_by_name(&self, needle: &str) -> StoreResult<Option<Unit>> {
        let state = self.read()?;
        let by_code = state.units.values().find(|u| u.code.to_lowercase() == needle);
        let found = by_code.or_else(|| {
            state.units.values()
                .find(|u| u.aliases.iter().any(|a| a.alias.to_lowercase() == needle))
        });
        Ok(found.cloned())
    }

    fn base_unit(&self, unit_type_id: u64) -> StoreResult<Option<Unit>> {
        let state = self.read()?;
        Ok(state.units.values()
            .find(|u| u.is_base && u.unit_type_id() == Some(unit_type_id))
            .cloned())
    }

    fn conversions_between(&self, source_unit_id: u64, target_unit_id: u64) -> StoreResult<Vec<Conversion>> {
        let state = self.read()?;
        Ok(state.conversions.values()
            .filter(|c| c.source_unit_id == source_unit_id && c.target_unit_id == target_unit_id)
            .cloned()
            .collect())
    }

    fn compound_by_id(&self, id: u64) -> StoreResult<Option<CompoundUnit>> {
        let state = self.read()?;
        state.compounds.get(&id)
            .map(|stored| state.assemble_compound(stored))
            .transpose()
    }

    fn compound_by_name(&self, needle: &str) -> StoreResult<Option<CompoundUnit>> {
        let state = self.read()?;
        state.compounds.values()
            .find(|c| c.name.to_lowercase() == needle || c.symbol.to_lowercase() == needle)
            .map(|stored| state.assemble_compound(stored))
            .transpose()
    }

    fn packaging_by_id(&self, id: u64) -> StoreResult<Option<Packaging>> {
        let state = self.read()?;
        state.packagings.get(&id)
            .map(|stored| state.assemble_packaging(stored))
            .transpose()
    }

    fn packaging_between(&self, base_unit_id: u64, package_unit_id: u64) -> StoreResult<Option<Packaging>> {
        let state = self.read()?;
        state.packagings.values()
            .find(|p| p.base_unit_id == base_unit_id && p.package_unit_id == package_unit_id)
            .map(|stored| state.assemble_packaging(stored))
            .transpose()
    }

    fn custom_unit_by_id(&self, id: u64) -> StoreResult<Option<CustomUnit>> {
        let state = self.read()?;
        Ok(state.custom_units.get(&id).map(|u| state.assemble_custom(u)))
    }

    fn custom_unit_by_code(&self, owner: Option<&Owner>, code: &str) -> StoreResult<Option<CustomUnit>> {
        let state = self.read()?;
        Ok(state.custom_units.values()
            .find(|u| u.code == code && u.owner.as_ref() == owner)
            .map(|u| state.assemble_custom(u)))
    }

    fn insert_custom_unit(
        &self,
        unit: NewCustomUnit,
        conversions: Vec<NewCustomConversion>,
    ) -> StoreResult<CustomUnit> {
        let mut state = self.write()?;

        if state.custom_units.values().any(|u| u.code == unit.code && u.owner == unit.owner) {
            return Err(StoreError::Conflict(format!("custom unit code '{}'", unit.code)));
        }
        for conversion in &conversions {
            if !state.custom_units.contains_key(&conversion.target_custom_unit_id) {
                return Err(StoreError::Integrity(format!(
                    "custom unit #{}", conversion.target_custom_unit_id
                )));
            }
        }

        // Every check has passed; nothing below can fail.
        let id = next(&mut state.ids.custom_unit);
        for conversion in conversions {
            let record = CustomConversion {
                id: next(&mut state.ids.custom_conversion),
                custom_unit_id: id,
                target_custom_unit_id: conversion.target_custom_unit_id,
                factor: conversion.factor,
                offset: conversion.offset,
                is_linear: conversion.is_linear,
                formula: conversion.formula,
                metadata: conversion.metadata,
            };
            state.custom_conversions.insert(record.id, record);
        }

        let stored = CustomUnit {
            id,
            owner: unit.owner,
            code: unit.code,
            name: unit.name,
            symbol: unit.symbol,
            unit_type_id: unit.unit_type_id,
            conversion_factor: unit.conversion_factor,
            offset: unit.offset,
            precision: unit.precision,
            metadata: unit.metadata,
            conversions: Vec::new(),
        };
        let assembled = state.assemble_custom(&stored);
        state.custom_units.insert(id, stored);
        Ok(assembled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_length() -> (MemoryStore, UnitType) {
        let store = MemoryStore::new();
        let length = store.insert_unit_type("length", "Length").unwrap();
        (store, length)
    }

    fn new_custom(code: &str, owner: Option<Owner>) -> NewCustomUnit {
        NewCustomUnit {
            owner,
            code: code.to_string(),
            name: code.to_string(),
            symbol: None,
            unit_type_id: None,
            conversion_factor: Number::one(),
            offset: Number::zero(),
            precision: None,
            metadata: None,
        }
    }

    #[test]
    fn test_unit_lookup_by_code_and_alias() {
        let (store, length) = store_with_length();
        store.insert_unit(NewUnit::new("m", "metre", length.id, Number::one()).base().with_alias("Meter")).unwrap();

        assert_eq!(store.unit_by_name("m").unwrap().unwrap().code, "m");
        assert_eq!(store.unit_by_name("meter").unwrap().unwrap().code, "m");
        assert!(store.unit_by_name("yard").unwrap().is_none());
    }

    #[test]
    fn test_code_match_beats_alias_match() {
        let (store, length) = store_with_length();
        store.insert_unit(NewUnit::new("m", "metre", length.id, Number::one()).base().with_alias("mm")).unwrap();
        store.insert_unit(NewUnit::new("mm", "millimetre", length.id, Number::from_str("0.001").unwrap())).unwrap();

        assert_eq!(store.unit_by_name("mm").unwrap().unwrap().name, "millimetre");
    }

    #[test]
    fn test_single_base_unit_per_type() {
        let (store, length) = store_with_length();
        store.insert_unit(NewUnit::new("m", "metre", length.id, Number::one()).base()).unwrap();
        let err = store.insert_unit(NewUnit::new("ft", "foot", length.id, Number::one()).base()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_one_preferred_alias() {
        let (store, length) = store_with_length();
        let unit = NewUnit::new("m", "metre", length.id, Number::one())
            .with_preferred_alias("metre")
            .with_preferred_alias("meter");
        assert!(matches!(store.insert_unit(unit), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_unknown_unit_type_is_integrity_error() {
        let store = MemoryStore::new();
        let err = store.insert_unit(NewUnit::new("m", "metre", 99, Number::one())).unwrap_err();
        assert!(matches!(err, StoreError::Integrity(_)));
    }

    #[test]
    fn test_compound_is_assembled_with_units() {
        let (store, length) = store_with_length();
        let time = store.insert_unit_type("time", "Time").unwrap();
        let m = store.insert_unit(NewUnit::new("m", "metre", length.id, Number::one()).base()).unwrap();
        let s = store.insert_unit(NewUnit::new("s", "second", time.id, Number::one()).base()).unwrap();
        let compound = store.insert_compound("metre per second", "m/s", &[(m.id, 1), (s.id, -1)]).unwrap();

        let loaded = store.compound_by_name("m/s").unwrap().unwrap();
        assert_eq!(loaded, compound);
        assert_eq!(loaded.components[1].unit.code, "s");
        assert_eq!(loaded.components[1].exponent, -1);
    }

    #[test]
    fn test_custom_unit_codes_are_scoped_by_owner() {
        let store = MemoryStore::new();
        let acme = Owner::new(crate::owner::OwnerKind::Company, 1);
        let globex = Owner::new(crate::owner::OwnerKind::Company, 2);

        store.insert_custom_unit(new_custom("crate", Some(acme)), Vec::new()).unwrap();
        store.insert_custom_unit(new_custom("crate", Some(globex)), Vec::new()).unwrap();
        let err = store.insert_custom_unit(new_custom("crate", Some(acme)), Vec::new()).unwrap_err();

        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.custom_unit_by_code(Some(&acme), "crate").unwrap().is_some());
        assert!(store.custom_unit_by_code(None, "crate").unwrap().is_none());
    }

    #[test]
    fn test_custom_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        let dangling = NewCustomConversion {
            target_custom_unit_id: 404,
            factor: Number::one(),
            offset: Number::zero(),
            is_linear: true,
            formula: None,
            metadata: None,
        };
        let err = store.insert_custom_unit(new_custom("pallet", None), vec![dangling]).unwrap_err();

        assert!(matches!(err, StoreError::Integrity(_)));
        assert_eq!(store.custom_unit_count().unwrap(), 0);
        assert_eq!(store.custom_conversion_count().unwrap(), 0);
    }

    #[test]
    fn test_custom_conversions_are_attached() {
        let store = MemoryStore::new();
        let crate_unit = store.insert_custom_unit(new_custom("crate", None), Vec::new()).unwrap();
        let conversion = NewCustomConversion {
            target_custom_unit_id: crate_unit.id,
            factor: Number::from_i64(4),
            offset: Number::zero(),
            is_linear: true,
            formula: None,
            metadata: None,
        };
        let pallet = store.insert_custom_unit(new_custom("pallet", None), vec![conversion]).unwrap();

        assert_eq!(pallet.conversions.len(), 1);
        assert_eq!(pallet.conversion_to(crate_unit.id).unwrap().factor, Number::from_i64(4));
        let reloaded = store.custom_unit_by_id(pallet.id).unwrap().unwrap();
        assert_eq!(reloaded, pallet);
    }

    #[test]
    fn test_duplicate_packaging_pair_conflicts() {
        let store = MemoryStore::new();
        let count = store.insert_unit_type("count", "Count").unwrap();
        let pcs = store.insert_unit(NewUnit::new("pcs", "piece", count.id, Number::one()).base()).unwrap();
        let boxed = store.insert_unit(NewUnit::new("box", "box", count.id, Number::from_i64(12))).unwrap();

        store.insert_packaging(pcs.id, boxed.id, Number::from_i64(12)).unwrap();
        let err = store.insert_packaging(pcs.id, boxed.id, Number::from_i64(10)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
