//! # Host Context
//!
//! One explicit context per process owns the event bus, the error reporter
//! and the module loader. Every remote module mounted by the loader sees the
//! same bus and reporter through it.
//!
//! ## Initialization Order
//!
//! 1. Validate configuration
//! 2. Claim the process slot (a second live context is rejected)
//! 3. Event bus (`container` source)
//! 4. Error reporter, forwarding to the bus and host notifications
//! 5. Module loader, sharing the bus and reporter
//!
//! Dropping the context releases the slot.

use mc_01_error_reporter::ErrorReporter;
use mc_03_module_loader::{HostServices, ModuleFetcher, ModuleLoader};
use shared_bus::EventBus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, HostConfig};

/// Emitter identity of the host side of the bus.
pub const HOST_SOURCE: &str = "container";

static CONTEXT_ACTIVE: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("A host context is already active in this process")]
    AlreadyInitialized,

    #[error("Invalid host configuration: {0}")]
    Config(#[from] ConfigError),
}

pub struct HostContext {
    config: HostConfig,
    bus: Arc<EventBus>,
    reporter: Arc<ErrorReporter>,
    loader: ModuleLoader,
}

impl HostContext {
    /// Build the process-wide context.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid configuration, `AlreadyInitialized` while
    /// another context is alive.
    pub fn build(
        config: HostConfig,
        services: HostServices,
        fetcher: Arc<dyn ModuleFetcher>,
    ) -> Result<Self, ContextError> {
        config.validate()?;

        if CONTEXT_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ContextError::AlreadyInitialized);
        }

        let bus = Arc::new(EventBus::new(HOST_SOURCE));

        let mut reporter = ErrorReporter::builder(config.reporter.clone()).event_bus(Arc::clone(&bus));
        if let Some(auth) = &services.auth {
            reporter = reporter.auth(Arc::clone(auth));
        }
        if let Some(notification) = &services.notification {
            reporter = reporter.notifications(Arc::clone(notification));
        }
        let reporter = Arc::new(reporter.build());

        let loader = ModuleLoader::builder(fetcher, Arc::clone(&bus), Arc::clone(&reporter))
            .config(config.loader.clone())
            .host_services(services)
            .build();

        info!(
            session = %reporter.session_id(),
            max_retries = config.loader.max_retries,
            remote_logging = config.reporter.enable_remote_logging,
            "Host context initialized"
        );

        Ok(Self {
            config,
            bus,
            reporter,
            loader,
        })
    }

    /// Whether a context is alive in this process.
    #[must_use]
    pub fn is_active() -> bool {
        CONTEXT_ACTIVE.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    #[must_use]
    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    #[must_use]
    pub fn reporter(&self) -> Arc<ErrorReporter> {
        Arc::clone(&self.reporter)
    }

    #[must_use]
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Unload every mounted module.
    pub fn shutdown(&self) {
        let unloaded = self.loader.unload_all();
        info!(unloaded, "Host context shut down");
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        CONTEXT_ACTIVE.store(false, Ordering::Release);
        debug!("Host context released");
    }
}
