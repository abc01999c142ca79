//! One-stop wiring of every converter over a shared store

use std::sync::Arc;
use crate::compound::CompoundUnitConverter;
use crate::config::EngineConfig;
use crate::convert::UnitConverter;
use crate::custom::CustomUnitRegistrar;
use crate::packaging::PackagingCalculator;
use crate::resolver::{AliasResolver, ResolverCache};
use crate::store::UnitStore;

/// All converters built over one store, one config and one resolver cache
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    resolver: AliasResolver,
    units: UnitConverter,
    compounds: CompoundUnitConverter,
    custom_units: CustomUnitRegistrar,
    packaging: PackagingCalculator,
}

impl Engine {
    pub fn new(store: Arc<dyn UnitStore>, config: EngineConfig) -> Self {
        Self::with_cache(store, config, ResolverCache::new())
    }

    /// Build with a caller-owned cache, e.g. one per tenant
    pub fn with_cache(store: Arc<dyn UnitStore>, config: EngineConfig, cache: ResolverCache) -> Self {
        let resolver = AliasResolver::new(store.clone(), cache);
        Engine {
            units: UnitConverter::new(store.clone(), resolver.clone(), config.clone()),
            compounds: CompoundUnitConverter::new(store.clone(), config.clone()),
            custom_units: CustomUnitRegistrar::new(store.clone(), config.clone()),
            packaging: PackagingCalculator::new(store, resolver.clone(), config.clone()),
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn resolver(&self) -> &AliasResolver {
        &self.resolver
    }

    pub fn units(&self) -> &UnitConverter {
        &self.units
    }

    pub fn compounds(&self) -> &CompoundUnitConverter {
        &self.compounds
    }

    pub fn custom_units(&self) -> &CustomUnitRegistrar {
        &self.custom_units
    }

    pub fn packaging(&self) -> &PackagingCalculator {
        &self.packaging
    }
}
