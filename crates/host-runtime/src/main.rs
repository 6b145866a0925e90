//! # Mosaic Host
//!
//! Demo host: mounts an in-process "greeter" module into a container, pushes
//! a props update, crashes it on purpose, recovers it, and shuts down.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Initialize logging and metrics
//! 3. Build the host context
//! 4. Load, update, crash, recover, unload

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::info;

use host_runtime::{HostConfig, HostContext};
use mc_03_module_loader::{HostServices, ModuleServices, RemoteModule, StaticModuleRegistry};
use mosaic_telemetry::{encode_metrics, init_telemetry};
use shared_bus::Event;
use shared_types::{Container, ContainerId, ModuleDescriptor, ModuleFailure};

const GREETER_ADDRESS: &str = "mem://greeter";

/// Renders a greeting and announces itself on the bus.
#[derive(Default)]
struct Greeter {
    container: Mutex<Option<Container>>,
}

impl RemoteModule for Greeter {
    fn mount(&self, container: &Container, services: &ModuleServices) -> Result<(), ModuleFailure> {
        container.render("<h1>Hello from greeter</h1>");
        *self.container.lock() = Some(container.clone());
        services.logger.info("mounted");
        services.emit("greeter:ready", json!({ "container": container.id() }));
        Ok(())
    }

    fn unmount(&self) -> Result<(), ModuleFailure> {
        *self.container.lock() = None;
        Ok(())
    }

    fn update(&self, props: &Value) -> Result<(), ModuleFailure> {
        let name = props
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ModuleFailure::type_mismatch("props.name is not a string"))?;
        if let Some(container) = self.container.lock().as_ref() {
            container.clear();
            container.render(format!("<h1>Hello, {name}</h1>"));
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = HostConfig::from_env();
    let _telemetry = init_telemetry(&config.telemetry).context("Failed to initialize telemetry")?;

    let registry = Arc::new(StaticModuleRegistry::new());
    registry.register_module(GREETER_ADDRESS, Greeter::default);

    let host = HostContext::build(config, HostServices::default(), registry)
        .context("Failed to build host context")?;

    let _events = host.bus().on("*", |event: &Event| {
        info!(topic = %event.event_type, source = %event.source, payload = %event.payload, "Bus event");
    });

    let container = Container::attached("main");
    let id = ContainerId::new("main");
    let outcome = host
        .loader()
        .load(ModuleDescriptor::new("greeter", GREETER_ADDRESS), container.clone(), None)
        .await
        .context("Failed to load greeter")?;
    info!(?outcome, content = ?container.content(), "Greeter loaded");

    host.loader()
        .update(&id, &json!({ "name": "Mosaic" }))
        .context("Failed to update greeter")?;
    info!(content = ?container.content(), "Greeter updated");

    // A bad update trips the isolation boundary; the host keeps running.
    if let Err(e) = host.loader().update(&id, &json!({ "name": 42 })) {
        info!(error = %e, "Greeter crashed");
    }
    if let Some(boundary) = host.loader().boundary(&id) {
        info!(view = ?boundary.view(), "Boundary state");
        boundary.retry().await;
        info!(view = ?boundary.view(), state = ?host.loader().state(&id), "Greeter recovered");
    }

    let summary = host.reporter().summary();
    info!(total = summary.total_errors, "Error summary");

    host.shutdown();

    if let Ok(metrics) = encode_metrics() {
        info!(bytes = metrics.len(), "Metrics snapshot encoded");
    }

    Ok(())
}
