//! Identifier to unit resolution
//!
//! Callers name units loosely: a primary key as digits, a code in any case,
//! or one of the unit's aliases. [`AliasResolver`] turns those into catalog
//! records and remembers successful lookups in a [`ResolverCache`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;
use gauge_core::ConversionError;
use crate::model::Unit;
use crate::store::UnitStore;

/// Shared, additive-only cache of resolved units keyed by normalized identifier.
///
/// Cloning the handle shares the underlying map. Entries are never evicted
/// on their own; use [`clear`](Self::clear) or [`invalidate`](Self::invalidate)
/// when the catalog changes.
#[derive(Debug, Clone, Default)]
pub struct ResolverCache {
    entries: Arc<RwLock<HashMap<String, Arc<Unit>>>>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<Unit>> {
        // A poisoned lock only means a writer panicked mid-insert; the map is still usable
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// Insert unless another thread got there first; returns the cached entry
    fn insert(&self, key: String, unit: Unit) -> Arc<Unit> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key).or_insert_with(|| Arc::new(unit)).clone()
    }

    pub fn invalidate(&self, identifier: &str) {
        let key = normalize(identifier);
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(&key);
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Resolves free-form identifiers to canonical units
#[derive(Clone)]
pub struct AliasResolver {
    store: Arc<dyn UnitStore>,
    cache: ResolverCache,
}

impl AliasResolver {
    pub fn new(store: Arc<dyn UnitStore>, cache: ResolverCache) -> Self {
        AliasResolver { store, cache }
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Resolve an identifier; blank input and unknown names give `None`.
    ///
    /// Digit-only input is tried as a primary key first and then as a code
    /// or alias. Everything else matches code and aliases case-insensitively.
    pub fn resolve(&self, identifier: &str) -> Result<Option<Arc<Unit>>, ConversionError> {
        let key = normalize(identifier);
        if key.is_empty() {
            return Ok(None);
        }

        if let Some(unit) = self.cache.get(&key) {
            return Ok(Some(unit));
        }

        let mut found = None;
        if is_numeric(&key) {
            if let Ok(id) = key.parse::<u64>() {
                found = self.store.unit_by_id(id)?;
            }
        }
        if found.is_none() {
            found = self.store.unit_by_name(&key)?;
        }

        match found {
            Some(unit) => {
                debug!(identifier = %key, unit = %unit.code, "resolved unit");
                Ok(Some(self.cache.insert(key, unit)))
            }
            None => {
                debug!(identifier = %key, "unit not found");
                Ok(None)
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but a miss is an error naming the raw input
    pub fn resolve_or_fail(&self, identifier: &str) -> Result<Arc<Unit>, ConversionError> {
        self.resolve(identifier)?
            .ok_or_else(|| ConversionError::unit_not_found(identifier))
    }

    /// Every name a unit answers to: code first, then aliases with the
    /// preferred one leading
    pub fn aliases_for(&self, unit: &Unit, include_code: bool) -> Vec<String> {
        let mut names = Vec::with_capacity(unit.aliases.len() + 1);
        if include_code {
            names.push(unit.code.clone());
        }
        names.extend(unit.aliases.iter().filter(|a| a.is_preferred).map(|a| a.alias.clone()));
        names.extend(unit.aliases.iter().filter(|a| !a.is_preferred).map(|a| a.alias.clone()));
        names
    }

    /// [`aliases_for`](Self::aliases_for) on a unit named by identifier
    pub fn aliases_for_identifier(&self, identifier: &str, include_code: bool) -> Result<Vec<String>, ConversionError> {
        let unit = self.resolve_or_fail(identifier)?;
        Ok(self.aliases_for(&unit, include_code))
    }
}
