//! # Module Loader Service
//!
//! Owns one [`LoadSession`](session::LoadSession) per container and drives it
//! through the load state machine.
//!
//! ## Concurrency
//!
//! The session map sits behind a mutex that is never held across an await
//! point or while module code, the error reporter or the event bus runs.
//! Every suspension (fetch, container wait, backoff) is followed by a check
//! that the same run still owns the session; if not, the result is dropped
//! and the load reports [`LoadOutcome::Abandoned`].

mod drive;
mod session;


pub use session::{ErrorCallback, SessionId};

use async_trait::async_trait;
use mc_01_error_reporter::{ErrorCategory, ErrorContext, ErrorReporter};
use mc_02_isolation_boundary::{IsolationBoundary, Recovery};
use mosaic_telemetry::{log_module_event, MODULES_MOUNTED};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared_bus::{topics, EventBus};
use shared_types::{Container, ContainerId, ModuleDescriptor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::adapters::TokioScheduler;
use crate::domain::{LoaderConfig, LoaderError, SessionState};
use crate::ports::{ModuleFetcher, Scheduler};
use crate::services::HostServices;
use session::{CancelToken, LoadSession, MountedHandle};

/// How a `load` or `manual_retry` call ended, short of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The module is mounted.
    Mounted(SessionId),
    /// A load for this session is already running; nothing was started.
    AlreadyInFlight,
    /// The same module is already mounted in this container.
    AlreadyMounted,
    /// The session was unloaded or restarted while this run was suspended.
    Abandoned,
}

pub(crate) struct LoaderInner {
    config: LoaderConfig,
    fetcher: Arc<dyn ModuleFetcher>,
    scheduler: Arc<dyn Scheduler>,
    bus: Arc<EventBus>,
    reporter: Arc<ErrorReporter>,
    host: HostServices,
    sessions: Mutex<HashMap<ContainerId, LoadSession>>,
    next_session: AtomicU64,
}

/// Cheap to clone; clones share sessions.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Arc<LoaderInner>,
}

pub struct ModuleLoaderBuilder {
    config: LoaderConfig,
    fetcher: Arc<dyn ModuleFetcher>,
    bus: Arc<EventBus>,
    reporter: Arc<ErrorReporter>,
    scheduler: Option<Arc<dyn Scheduler>>,
    host: HostServices,
}

impl ModuleLoaderBuilder {
    #[must_use]
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Timer source; tokio timers when not set.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    #[must_use]
    pub fn host_services(mut self, host: HostServices) -> Self {
        self.host = host;
        self
    }

    pub fn build(self) -> ModuleLoader {
        ModuleLoader {
            inner: Arc::new(LoaderInner {
                config: self.config,
                fetcher: self.fetcher,
                scheduler: self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler)),
                bus: self.bus,
                reporter: self.reporter,
                host: self.host,
                sessions: Mutex::new(HashMap::new()),
                next_session: AtomicU64::new(1),
            }),
        }
    }
}

impl ModuleLoader {
    pub fn builder(
        fetcher: Arc<dyn ModuleFetcher>,
        bus: Arc<EventBus>,
        reporter: Arc<ErrorReporter>,
    ) -> ModuleLoaderBuilder {
        ModuleLoaderBuilder {
            config: LoaderConfig::default(),
            fetcher,
            bus,
            reporter,
            scheduler: None,
            host: HostServices::default(),
        }
    }

    /// Load `descriptor` into `container` and drive the session until it is
    /// mounted, fails, or is abandoned.
    ///
    /// Returns without doing anything if a load for the same module is
    /// already running in this container, or the module is already mounted
    /// there. A different module in the container is unloaded first.
    ///
    /// # Errors
    ///
    /// The last attempt's error once retries are exhausted, or a
    /// non-retryable error immediately. `on_error` is called with it first.
    pub async fn load(
        &self,
        descriptor: ModuleDescriptor,
        container: Container,
        on_error: Option<ErrorCallback>,
    ) -> Result<LoadOutcome, LoaderError> {
        let container_id = container.id().clone();

        let replaces_other = {
            let sessions = self.inner.sessions.lock();
            match sessions.get(&container_id) {
                Some(existing) if existing.descriptor.same_target(&descriptor) => {
                    if let Some(outcome) = Self::short_circuit(existing.state) {
                        debug!(module = %descriptor.name, state = %existing.state, "Load request ignored");
                        return Ok(outcome);
                    }
                    false
                }
                Some(_) => true,
                None => false,
            }
        };

        if replaces_other {
            self.unload(&container_id);
        }

        let (id, listener) = {
            let mut sessions = self.inner.sessions.lock();
            let id = self.next_session_id();
            match sessions.get_mut(&container_id) {
                Some(session) if session.descriptor.same_target(&descriptor) => {
                    if let Some(outcome) = Self::short_circuit(session.state) {
                        return Ok(outcome);
                    }
                    session.restart(id);
                    session.descriptor = descriptor.clone();
                    session.container = container;
                    session.on_error = on_error;
                    session.boundary.reset();
                    (id, session.cancel.listener())
                }
                _ => {
                    let session = self.new_session(id, descriptor.clone(), container, on_error);
                    let listener = session.cancel.listener();
                    sessions.insert(container_id.clone(), session);
                    (id, listener)
                }
            }
        };

        log_module_event!(
            info,
            descriptor.name,
            "Loading module",
            address = %descriptor.load_address,
            container = %container_id
        );
        self.emit(topics::MODULE_LOADING, json!({ "name": descriptor.name }));

        self.drive(&container_id, id, listener).await
    }

    fn short_circuit(state: SessionState) -> Option<LoadOutcome> {
        match state {
            s if s.is_in_flight() => Some(LoadOutcome::AlreadyInFlight),
            SessionState::Unmounting => Some(LoadOutcome::AlreadyInFlight),
            SessionState::Mounted => Some(LoadOutcome::AlreadyMounted),
            _ => None,
        }
    }

    fn new_session(
        &self,
        id: SessionId,
        descriptor: ModuleDescriptor,
        container: Container,
        on_error: Option<ErrorCallback>,
    ) -> LoadSession {
        let container_id = container.id().clone();
        let boundary = IsolationBoundary::new(descriptor.name.clone(), Arc::clone(&self.inner.reporter))
            .with_context(
                ErrorContext::new()
                    .load_address(descriptor.load_address.clone())
                    .with("container", container_id.as_str()),
            );
        boundary.set_recovery(Arc::new(LoaderRecovery {
            loader: Arc::downgrade(&self.inner),
            container: container_id,
        }));

        LoadSession {
            id,
            descriptor,
            container,
            state: SessionState::Loading,
            retry_count: 0,
            module: None,
            handle: None,
            cancel: CancelToken::new(),
            boundary: Arc::new(boundary),
            on_error,
            last_error: None,
        }
    }

    /// Tear down the session in `container`.
    ///
    /// Cancels pending timers, unmounts a mounted module exactly once and
    /// leaves the session `Idle`. Returns whether a module was unmounted;
    /// `module:unloaded` is emitted only then.
    pub fn unload(&self, container: &ContainerId) -> bool {
        let (handle, id, name, address) = {
            let mut sessions = self.inner.sessions.lock();
            let Some(session) = sessions.get_mut(container) else {
                return false;
            };
            if session.state == SessionState::Unmounting {
                return false;
            }

            session.cancel.cancel();
            session.cancel = CancelToken::new();
            session.module = None;

            let handle = if session.state == SessionState::Mounted {
                session.state = SessionState::Unmounting;
                session.handle.take()
            } else {
                None
            };
            if handle.is_none() {
                session.state = SessionState::Idle;
            }

            (
                handle,
                session.id,
                session.descriptor.name.clone(),
                session.descriptor.load_address.clone(),
            )
        };

        let Some(handle) = handle else {
            debug!(module = %name, container = %container, "Unload of unmounted session");
            return false;
        };

        self.teardown(container, &name, &address, handle);

        if let Some(session) = self.inner.sessions.lock().get_mut(container) {
            if session.id == id && session.state == SessionState::Unmounting {
                session.state = SessionState::Idle;
            }
        }

        log_module_event!(info, name, "Module unloaded", container = %container);
        self.emit(topics::MODULE_UNLOADED, json!({ "name": name }));
        true
    }

    /// Restart the session from scratch with `retry_count` reset to 0.
    ///
    /// A module that is still mounted (for example after a crash) is
    /// unmounted first.
    ///
    /// # Errors
    ///
    /// `UnknownContainer` if the container has no session, otherwise as
    /// [`ModuleLoader::load`].
    pub async fn manual_retry(&self, container: &ContainerId) -> Result<LoadOutcome, LoaderError> {
        let (id, listener, handle, name, address, boundary) = {
            let mut sessions = self.inner.sessions.lock();
            let session = sessions
                .get_mut(container)
                .ok_or_else(|| LoaderError::UnknownContainer(container.clone()))?;
            if session.state.is_in_flight() || session.state == SessionState::Unmounting {
                return Ok(LoadOutcome::AlreadyInFlight);
            }

            let handle = session.handle.take();
            let id = self.next_session_id();
            session.restart(id);

            (
                id,
                session.cancel.listener(),
                handle,
                session.descriptor.name.clone(),
                session.descriptor.load_address.clone(),
                Arc::clone(&session.boundary),
            )
        };

        if let Some(handle) = handle {
            self.teardown(container, &name, &address, handle);
            self.emit(topics::MODULE_UNLOADED, json!({ "name": name }));
        }
        boundary.reset();

        log_module_event!(info, name, "Manual retry", container = %container);
        self.emit(topics::MODULE_LOADING, json!({ "name": name }));

        self.drive(container, id, listener).await
    }

    /// Pass new props to the mounted module through its isolation boundary.
    ///
    /// # Errors
    ///
    /// `NotMounted` without a mounted module; `Crashed` if the module fails
    /// now or had already crashed.
    pub fn update(&self, container: &ContainerId, props: &Value) -> Result<(), LoaderError> {
        let (module, boundary) = {
            let sessions = self.inner.sessions.lock();
            let session = sessions
                .get(container)
                .ok_or_else(|| LoaderError::UnknownContainer(container.clone()))?;
            let handle = session
                .handle
                .as_ref()
                .filter(|_| session.state == SessionState::Mounted)
                .ok_or_else(|| LoaderError::NotMounted(container.clone()))?;
            (handle.module(), Arc::clone(&session.boundary))
        };

        boundary.run(|| module.update(props))?;
        Ok(())
    }

    /// The host is removing `container`: unload and forget its session.
    pub fn remove_container(&self, container: &ContainerId) -> bool {
        self.unload(container);
        let removed = self.inner.sessions.lock().remove(container).is_some();
        if removed {
            debug!(container = %container, "Load session disposed");
        }
        removed
    }

    /// Unload every session. Returns how many mounted modules were torn down.
    pub fn unload_all(&self) -> usize {
        let containers: Vec<ContainerId> = self.inner.sessions.lock().keys().cloned().collect();
        containers
            .iter()
            .filter(|container| self.unload(container))
            .count()
    }

    #[must_use]
    pub fn state(&self, container: &ContainerId) -> Option<SessionState> {
        self.inner.sessions.lock().get(container).map(|s| s.state)
    }

    #[must_use]
    pub fn retry_count(&self, container: &ContainerId) -> Option<u32> {
        self.inner
            .sessions
            .lock()
            .get(container)
            .map(|s| s.retry_count)
    }

    /// Isolation boundary wrapping the module in `container`.
    #[must_use]
    pub fn boundary(&self, container: &ContainerId) -> Option<Arc<IsolationBoundary>> {
        self.inner
            .sessions
            .lock()
            .get(container)
            .map(|s| Arc::clone(&s.boundary))
    }

    /// Error of the most recent failed attempt in the current run.
    #[must_use]
    pub fn last_error(&self, container: &ContainerId) -> Option<LoaderError> {
        self.inner
            .sessions
            .lock()
            .get(container)
            .and_then(|s| s.last_error.clone())
    }

    #[must_use]
    pub fn session_id(&self, container: &ContainerId) -> Option<SessionId> {
        self.inner.sessions.lock().get(container).map(|s| s.id)
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.inner.config
    }

    fn next_session_id(&self) -> SessionId {
        SessionId(self.inner.next_session.fetch_add(1, Ordering::Relaxed))
    }

    fn emit(&self, topic: &str, payload: Value) {
        self.inner.bus.emit(topic, payload);
    }

    /// Unmount a handle taken out of its session. Failures are reported,
    /// never propagated.
    fn teardown(&self, container: &ContainerId, name: &str, address: &str, handle: MountedHandle) {
        if let Err(failure) = handle.unmount() {
            warn!(module = name, container = %container, error = %failure, "Error unmounting module");
            self.inner.reporter.report(
                name,
                &failure,
                ErrorCategory::Runtime,
                ErrorContext::new()
                    .load_address(address)
                    .with("container", container.as_str())
                    .with("phase", "unmount"),
            );
        }
        MODULES_MOUNTED.dec();
        info!(module = name, container = %container, "Module unmounted");
    }
}

/// Boundary recovery: re-run the owning session.
struct LoaderRecovery {
    loader: Weak<LoaderInner>,
    container: ContainerId,
}

#[async_trait]
impl Recovery for LoaderRecovery {
    async fn recover(&self) {
        let Some(inner) = self.loader.upgrade() else {
            return;
        };
        let loader = ModuleLoader { inner };
        if let Err(e) = loader.manual_retry(&self.container).await {
            warn!(container = %self.container, error = %e, "Recovery after crash failed");
        }
    }
}
