//! Test doubles for the loader's ports.
//!
//! Available with the `test-utils` feature.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::ModuleDescriptor;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::{FetchError, LoadedUnit};
use crate::ports::{ModuleFetcher, Scheduler};

/// Records every requested delay and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().push(delay);
        tokio::task::yield_now().await;
    }
}

/// Wraps a fetcher with scripted failures, a pause gate and concurrency
/// accounting.
pub struct ScriptedFetcher {
    inner: Arc<dyn ModuleFetcher>,
    failures: Mutex<VecDeque<FetchError>>,
    gate: watch::Sender<bool>,
    fetches: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new(inner: Arc<dyn ModuleFetcher>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            inner,
            failures: Mutex::new(VecDeque::new()),
            gate,
            fetches: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Fail the next fetch with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().push_back(error);
    }

    /// Hold fetches until [`ScriptedFetcher::resume`].
    pub fn pause(&self) {
        self.gate.send_replace(false);
    }

    pub fn resume(&self) {
        self.gate.send_replace(true);
    }

    /// Fetches started so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were running at the same time.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModuleFetcher for ScriptedFetcher {
    async fn fetch(&self, descriptor: &ModuleDescriptor) -> Result<LoadedUnit, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let scripted = self.failures.lock().pop_front();
        let result = match scripted {
            Some(error) => Err(error),
            None => self.inner.fetch(descriptor).await,
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
