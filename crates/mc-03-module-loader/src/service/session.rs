//! Per-container load session bookkeeping.

use mc_02_isolation_boundary::{contain, IsolationBoundary};
use serde::{Deserialize, Serialize};
use shared_types::{Container, ModuleDescriptor, ModuleFailure};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::{LoaderError, RemoteModule, SessionState};

/// Identifies one run of a session. A new id is allocated every time a load
/// (re)starts, so completions from an older run can be recognized and
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Called once when a load gives up.
pub type ErrorCallback = Arc<dyn Fn(&LoaderError) + Send + Sync>;

/// Cancels the pending retry timer and mount-wait timeout of one run.
pub(crate) struct CancelToken {
    tx: watch::Sender<bool>,
}

impl CancelToken {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub(crate) fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub(crate) fn listener(&self) -> CancelListener {
        CancelListener {
            rx: self.tx.subscribe(),
        }
    }
}

pub(crate) struct CancelListener {
    rx: watch::Receiver<bool>,
}

impl CancelListener {
    /// Resolves once cancelled, or once the token is gone.
    pub(crate) async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// A module mounted into a container. Unmounting consumes the handle, so a
/// handle can only ever be torn down once.
pub(crate) struct MountedHandle {
    module: Arc<dyn RemoteModule>,
    container: Container,
}

impl MountedHandle {
    pub(crate) fn new(module: Arc<dyn RemoteModule>, container: Container) -> Self {
        Self { module, container }
    }

    pub(crate) fn module(&self) -> Arc<dyn RemoteModule> {
        Arc::clone(&self.module)
    }

    /// Best effort: the container is cleared even if the module fails.
    pub(crate) fn unmount(self) -> Result<(), ModuleFailure> {
        let result = contain(|| self.module.unmount());
        self.container.clear();
        result
    }
}

pub(crate) struct LoadSession {
    pub(crate) id: SessionId,
    pub(crate) descriptor: ModuleDescriptor,
    pub(crate) container: Container,
    pub(crate) state: SessionState,
    pub(crate) retry_count: u32,
    /// Validated module, cached so mount retries skip the fetch.
    pub(crate) module: Option<Arc<dyn RemoteModule>>,
    pub(crate) handle: Option<MountedHandle>,
    pub(crate) cancel: CancelToken,
    pub(crate) boundary: Arc<IsolationBoundary>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) last_error: Option<LoaderError>,
}

impl LoadSession {
    /// Start a new run: fresh id and timers, nothing cached.
    pub(crate) fn restart(&mut self, id: SessionId) {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.id = id;
        self.state = SessionState::Loading;
        self.retry_count = 0;
        self.module = None;
        self.last_error = None;
    }

    /// Whether `id` still owns this session and a load is running.
    pub(crate) fn is_current(&self, id: SessionId) -> bool {
        self.id == id && self.state.is_in_flight()
    }
}
