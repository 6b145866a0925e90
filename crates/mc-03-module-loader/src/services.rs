//! # Services Handle
//!
//! What a mounted module receives: the event bus, a logger tagged with the
//! module name, and the optional host services its descriptor declared.
//! An undeclared or unprovided service is `None`.

use shared_bus::EventBus;
use shared_types::{
    capabilities, AuthService, ModalService, ModuleDescriptor, NotificationService,
};
use std::fmt;
use std::sync::Arc;

/// Optional services the host offers.
#[derive(Clone, Default)]
pub struct HostServices {
    pub auth: Option<Arc<dyn AuthService>>,
    pub notification: Option<Arc<dyn NotificationService>>,
    pub modal: Option<Arc<dyn ModalService>>,
}

impl fmt::Debug for HostServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostServices")
            .field("auth", &self.auth.is_some())
            .field("notification", &self.notification.is_some())
            .field("modal", &self.modal.is_some())
            .finish()
    }
}

/// Logger handed to a remote module.
#[derive(Debug, Clone)]
pub struct ModuleLogger {
    module: String,
}

impl ModuleLogger {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
        }
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(module = %self.module, "{}", message);
    }

    pub fn info(&self, message: &str) {
        tracing::info!(module = %self.module, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(module = %self.module, "{}", message);
    }

    pub fn error(&self, message: &str) {
        tracing::error!(module = %self.module, "{}", message);
    }
}

#[derive(Clone)]
pub struct ModuleServices {
    pub event_bus: Arc<EventBus>,
    pub logger: ModuleLogger,
    pub auth: Option<Arc<dyn AuthService>>,
    pub notification: Option<Arc<dyn NotificationService>>,
    pub modal: Option<Arc<dyn ModalService>>,
    module_name: String,
}

impl ModuleServices {
    /// Services for `descriptor`, filtered by its declared capabilities.
    pub fn for_module(
        descriptor: &ModuleDescriptor,
        event_bus: Arc<EventBus>,
        host: &HostServices,
    ) -> Self {
        let declared = |capability: &str| descriptor.requires(capability);

        Self {
            event_bus,
            logger: ModuleLogger::new(descriptor.name.clone()),
            auth: host.auth.clone().filter(|_| declared(capabilities::AUTH)),
            notification: host
                .notification
                .clone()
                .filter(|_| declared(capabilities::NOTIFICATION)),
            modal: host.modal.clone().filter(|_| declared(capabilities::MODAL)),
            module_name: descriptor.name.clone(),
        }
    }

    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Emit on the bus with this module as the source.
    pub fn emit(&self, topic: &str, payload: serde_json::Value) -> usize {
        self.event_bus.emit_from(&self.module_name, topic, payload)
    }
}

impl fmt::Debug for ModuleServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleServices")
            .field("module", &self.module_name)
            .field("auth", &self.auth.is_some())
            .field("notification", &self.notification.is_some())
            .field("modal", &self.modal.is_some())
            .finish()
    }
}
