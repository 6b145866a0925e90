//! # Module Descriptor
//!
//! The already-validated manifest entry handed to the loader by the
//! manifest-resolution collaborator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identifies a remote module and where its code lives.
///
/// Immutable once loading begins: the loader clones it into the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    /// Unique module name.
    pub name: String,
    /// Resolvable load address (URI) of the module code.
    pub load_address: String,
    /// Names of the optional host services the module declares.
    #[serde(default)]
    pub required_capabilities: BTreeSet<String>,
}

impl ModuleDescriptor {
    /// Create a descriptor with no declared capabilities.
    pub fn new(name: impl Into<String>, load_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            load_address: load_address.into(),
            required_capabilities: BTreeSet::new(),
        }
    }

    /// Declare a capability.
    #[must_use]
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.insert(capability.into());
        self
    }

    /// Whether the module declared `capability`.
    #[must_use]
    pub fn requires(&self, capability: &str) -> bool {
        self.required_capabilities.contains(capability)
    }

    /// Two descriptors target the same session when name and address match.
    #[must_use]
    pub fn same_target(&self, other: &ModuleDescriptor) -> bool {
        self.name == other.name && self.load_address == other.load_address
    }
}
