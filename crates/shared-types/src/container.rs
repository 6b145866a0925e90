//! # Containers
//!
//! A container is the host-owned region a remote module mounts into. The
//! host may hand a container to the loader before it is part of the live
//! tree, so attachment is observable and awaitable.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Identifier of a host container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

struct ContainerInner {
    id: ContainerId,
    attached: watch::Sender<bool>,
    content: Mutex<Vec<String>>,
}

/// Cloneable handle to a host container.
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Create a container that is not yet attached to the host tree.
    pub fn new(id: impl Into<String>) -> Self {
        let (attached, _) = watch::channel(false);
        Self {
            inner: Arc::new(ContainerInner {
                id: ContainerId::new(id),
                attached,
                content: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a container that is already live.
    pub fn attached(id: impl Into<String>) -> Self {
        let container = Self::new(id);
        container.attach();
        container
    }

    #[must_use]
    pub fn id(&self) -> &ContainerId {
        &self.inner.id
    }

    /// Mark the container as present in the host tree.
    pub fn attach(&self) {
        self.inner.attached.send_replace(true);
    }

    /// Remove the container from the host tree.
    pub fn detach(&self) {
        self.inner.attached.send_replace(false);
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        *self.inner.attached.borrow()
    }

    /// Resolve once the container is attached.
    pub async fn wait_attached(&self) {
        let mut receiver = self.inner.attached.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = receiver.wait_for(|attached| *attached).await;
    }

    /// Append a rendered fragment.
    pub fn render(&self, fragment: impl Into<String>) {
        self.inner.content.lock().push(fragment.into());
    }

    /// Drop everything rendered so far.
    pub fn clear(&self) {
        self.inner.content.lock().clear();
    }

    /// Snapshot of the rendered fragments.
    #[must_use]
    pub fn content(&self) -> Vec<String> {
        self.inner.content.lock().clone()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.content.lock().is_empty()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("attached", &self.is_attached())
            .finish()
    }
}
