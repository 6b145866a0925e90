//! In-process module registry.
//!
//! Maps load addresses to factories that build a fresh [`LoadedUnit`] per
//! fetch, so every session gets its own module instance.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::ModuleDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::domain::{FetchError, LoadedUnit, RemoteModule};
use crate::ports::ModuleFetcher;

type UnitFactory = Arc<dyn Fn() -> LoadedUnit + Send + Sync>;

#[derive(Default)]
pub struct StaticModuleRegistry {
    units: RwLock<HashMap<String, UnitFactory>>,
}

impl StaticModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an arbitrary export table at `address`.
    pub fn register<F>(&self, address: impl Into<String>, factory: F)
    where
        F: Fn() -> LoadedUnit + Send + Sync + 'static,
    {
        self.units.write().insert(address.into(), Arc::new(factory));
    }

    /// Publish a module as the `default` export at `address`.
    pub fn register_module<M, F>(&self, address: impl Into<String>, factory: F)
    where
        M: RemoteModule + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        self.register(address, move || LoadedUnit::with_default(Arc::new(factory())));
    }

    pub fn unregister(&self, address: &str) -> bool {
        self.units.write().remove(address).is_some()
    }

    #[must_use]
    pub fn contains(&self, address: &str) -> bool {
        self.units.read().contains_key(address)
    }
}

#[async_trait]
impl ModuleFetcher for StaticModuleRegistry {
    async fn fetch(&self, descriptor: &ModuleDescriptor) -> Result<LoadedUnit, FetchError> {
        let factory = self
            .units
            .read()
            .get(&descriptor.load_address)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(descriptor.load_address.clone()))?;

        debug!(module = %descriptor.name, address = %descriptor.load_address, "Resolved module from registry");
        Ok(factory())
    }
}
