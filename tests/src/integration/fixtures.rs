//! Shared host wiring for the scenarios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use mc_01_error_reporter::{ErrorReporter, InMemoryErrorSink, ReporterConfig};
use mc_03_module_loader::testing::{RecordingScheduler, ScriptedFetcher};
use mc_03_module_loader::{
    HostServices, LoaderConfig, ModuleLoader, ModuleServices, RemoteModule, StaticModuleRegistry,
};
use shared_bus::{Event, EventBus, Subscription};
use shared_types::{
    AuthService, AuthSession, Container, ModuleFailure, Notification, NotificationService,
};

pub const WIDGET_ADDRESS: &str = "https://cdn.example/widget.js";

/// What the widget observed while mounted.
#[derive(Default)]
pub struct Probe {
    pub mounts: AtomicUsize,
    pub unmounts: AtomicUsize,
    pub saw_auth: Mutex<Option<bool>>,
    pub saw_modal: Mutex<Option<bool>>,
}

impl Probe {
    pub fn mounts(&self) -> usize {
        self.mounts.load(Ordering::SeqCst)
    }

    pub fn unmounts(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }
}

/// Renders a counter; rejects a non-numeric `count` prop.
pub struct Widget {
    probe: Arc<Probe>,
    container: Mutex<Option<Container>>,
}

impl RemoteModule for Widget {
    fn mount(&self, container: &Container, services: &ModuleServices) -> Result<(), ModuleFailure> {
        self.probe.mounts.fetch_add(1, Ordering::SeqCst);
        *self.probe.saw_auth.lock() = Some(services.auth.is_some());
        *self.probe.saw_modal.lock() = Some(services.modal.is_some());

        container.render("<counter>0</counter>");
        *self.container.lock() = Some(container.clone());
        services.emit("widget:ready", json!({ "count": 0 }));
        Ok(())
    }

    fn unmount(&self) -> Result<(), ModuleFailure> {
        self.probe.unmounts.fetch_add(1, Ordering::SeqCst);
        *self.container.lock() = None;
        Ok(())
    }

    fn update(&self, props: &Value) -> Result<(), ModuleFailure> {
        let count = props
            .get("count")
            .and_then(Value::as_i64)
            .ok_or_else(|| ModuleFailure::type_mismatch("props.count is not a number"))?;
        if let Some(container) = self.container.lock().as_ref() {
            container.clear();
            container.render(format!("<counter>{count}</counter>"));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn seen(&self) -> Vec<Notification> {
        self.seen.lock().clone()
    }
}

impl NotificationService for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.lock().push(notification);
    }
}

pub struct SignedIn;

impl AuthService for SignedIn {
    fn session(&self) -> Option<AuthSession> {
        Some(AuthSession {
            user_id: "u-42".into(),
            username: "ada".into(),
            roles: vec!["admin".into()],
        })
    }
}

/// A fully wired host with recording doubles at the edges.
pub struct Host {
    pub bus: Arc<EventBus>,
    pub reporter: Arc<ErrorReporter>,
    pub loader: ModuleLoader,
    pub registry: Arc<StaticModuleRegistry>,
    pub fetcher: Arc<ScriptedFetcher>,
    pub scheduler: Arc<RecordingScheduler>,
    pub notifier: Arc<RecordingNotifier>,
    pub sink: Arc<InMemoryErrorSink>,
    pub probe: Arc<Probe>,
    events: Arc<Mutex<Vec<Event>>>,
    _subscription: Subscription,
}

impl Host {
    pub fn new() -> Self {
        Self::with_reporter_config(ReporterConfig::default())
    }

    pub fn with_reporter_config(config: ReporterConfig) -> Self {
        let probe = Arc::new(Probe::default());
        let registry = Arc::new(StaticModuleRegistry::new());
        {
            let probe = Arc::clone(&probe);
            registry.register_module(WIDGET_ADDRESS, move || Widget {
                probe: Arc::clone(&probe),
                container: Mutex::new(None),
            });
        }

        let bus = Arc::new(EventBus::new("container"));
        let notifier = Arc::new(RecordingNotifier::default());
        let sink = Arc::new(InMemoryErrorSink::new());
        let reporter = Arc::new(
            ErrorReporter::builder(config)
                .event_bus(Arc::clone(&bus))
                .notifications(notifier.clone())
                .auth(Arc::new(SignedIn))
                .sink(sink.clone())
                .build(),
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&events);
        let subscription = bus.on("*", move |event: &Event| recorder.lock().push(event.clone()));

        let fetcher = Arc::new(ScriptedFetcher::new(registry.clone()));
        let scheduler = Arc::new(RecordingScheduler::new());
        let loader = ModuleLoader::builder(fetcher.clone(), Arc::clone(&bus), Arc::clone(&reporter))
            .config(LoaderConfig::default())
            .scheduler(scheduler.clone())
            .host_services(HostServices {
                auth: Some(Arc::new(SignedIn)),
                notification: Some(notifier.clone()),
                modal: None,
            })
            .build();

        Self {
            bus,
            reporter,
            loader,
            registry,
            fetcher,
            scheduler,
            notifier,
            sink,
            probe,
            events,
            _subscription: subscription,
        }
    }

    /// Topics seen on the bus so far, in order.
    pub fn topics(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}
