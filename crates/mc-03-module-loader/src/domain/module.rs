//! # Remote Module Contract
//!
//! Loaded code is an export table. The only export the loader relies on is
//! `default`, which must be a [`RemoteModule`]. The check happens once per
//! fetch and the validated module is cached in the session.

use serde_json::Value;
use shared_types::{Container, ModuleFailure};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::services::ModuleServices;

/// Name of the export that must hold the module.
pub const DEFAULT_EXPORT: &str = "default";

/// What a remote module must implement.
pub trait RemoteModule: Send + Sync {
    /// Render into `container`. Called at most once per mounted handle.
    fn mount(&self, container: &Container, services: &ModuleServices) -> Result<(), ModuleFailure>;

    /// Tear down whatever `mount` created.
    fn unmount(&self) -> Result<(), ModuleFailure>;

    /// New props from the host.
    fn update(&self, _props: &Value) -> Result<(), ModuleFailure> {
        Ok(())
    }
}

/// One entry of a loaded unit's export table.
#[derive(Clone)]
pub enum Export {
    Module(Arc<dyn RemoteModule>),
    Value(Value),
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(_) => f.write_str("Export::Module(..)"),
            Self::Value(v) => f.debug_tuple("Export::Value").field(v).finish(),
        }
    }
}

/// Code fetched from a load address.
#[derive(Debug, Clone, Default)]
pub struct LoadedUnit {
    exports: HashMap<String, Export>,
}

impl LoadedUnit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit whose `default` export is `module`.
    pub fn with_default(module: Arc<dyn RemoteModule>) -> Self {
        Self::new().export(DEFAULT_EXPORT, Export::Module(module))
    }

    #[must_use]
    pub fn export(mut self, name: impl Into<String>, export: Export) -> Self {
        self.exports.insert(name.into(), export);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Export> {
        self.exports.get(name)
    }

    /// Validate the contract and return the module.
    ///
    /// The error string says which part of the contract is missing.
    pub fn default_module(&self) -> Result<Arc<dyn RemoteModule>, String> {
        match self.exports.get(DEFAULT_EXPORT) {
            Some(Export::Module(module)) => Ok(Arc::clone(module)),
            Some(Export::Value(_)) => {
                Err("default export is not a module with mount/unmount".to_string())
            }
            None => Err("missing default export".to_string()),
        }
    }
}
