//! The load loop: attempt, record the failure, back off, try again.

use mc_01_error_reporter::ErrorContext;
use mc_02_isolation_boundary::contain;
use mosaic_telemetry::{
    log_module_event, module_span, HistogramTimer, MODULES_MOUNTED, MODULE_LOAD_ATTEMPTS,
    MODULE_LOAD_DURATION,
};
use serde_json::json;
use shared_bus::topics;
use shared_types::ContainerId;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use super::session::{CancelListener, ErrorCallback, LoadSession, MountedHandle, SessionId};
use super::{LoadOutcome, ModuleLoader};
use crate::domain::{LoaderError, SessionState};
use crate::services::ModuleServices;

enum Attempt {
    Mounted,
    Abandoned,
}

enum Next {
    Retry(Duration),
    GiveUp(Option<ErrorCallback>),
}

impl ModuleLoader {
    pub(super) async fn drive(
        &self,
        container: &ContainerId,
        id: SessionId,
        mut listener: CancelListener,
    ) -> Result<LoadOutcome, LoaderError> {
        let timer = HistogramTimer::new(&MODULE_LOAD_DURATION);
        let span = module_span!("module_load", container = %container, session = ?id);

        loop {
            let attempt = self
                .attempt(container, id, &mut listener)
                .instrument(span.clone())
                .await;
            let error = match attempt {
                Ok(Attempt::Mounted) => {
                    timer.observe();
                    return Ok(LoadOutcome::Mounted(id));
                }
                Ok(Attempt::Abandoned) => {
                    timer.discard();
                    return Ok(LoadOutcome::Abandoned);
                }
                Err(error) => error,
            };

            match self.record_failure(container, id, &error) {
                None => {
                    timer.discard();
                    return Ok(LoadOutcome::Abandoned);
                }
                Some(Next::GiveUp(on_error)) => {
                    timer.discard();
                    if let Some(on_error) = on_error {
                        on_error(&error);
                    }
                    return Err(error);
                }
                Some(Next::Retry(delay)) => {
                    tokio::select! {
                        biased;
                        _ = listener.cancelled() => {
                            timer.discard();
                            return Ok(LoadOutcome::Abandoned);
                        }
                        _ = self.inner.scheduler.sleep(delay) => {}
                    }

                    let resumed = self.with_current(container, id, |session| {
                        session.state = SessionState::Loading;
                    });
                    if resumed.is_none() {
                        timer.discard();
                        return Ok(LoadOutcome::Abandoned);
                    }
                }
            }
        }
    }

    /// One fetch-validate-mount pass.
    async fn attempt(
        &self,
        container_id: &ContainerId,
        id: SessionId,
        listener: &mut CancelListener,
    ) -> Result<Attempt, LoaderError> {
        let Some((descriptor, cached)) = self.with_current(container_id, id, |session| {
            session.state = SessionState::Loading;
            (session.descriptor.clone(), session.module.clone())
        }) else {
            return Ok(Attempt::Abandoned);
        };

        let module = match cached {
            Some(module) => module,
            None => {
                let unit = self
                    .inner
                    .fetcher
                    .fetch(&descriptor)
                    .await
                    .map_err(|source| LoaderError::Load {
                        module: descriptor.name.clone(),
                        address: descriptor.load_address.clone(),
                        source,
                    })?;

                let module = unit
                    .default_module()
                    .map_err(|reason| LoaderError::Contract {
                        module: descriptor.name.clone(),
                        reason,
                    })?;

                let cached = self.with_current(container_id, id, |session| {
                    session.module = Some(Arc::clone(&module));
                });
                if cached.is_none() {
                    return Ok(Attempt::Abandoned);
                }
                module
            }
        };

        let Some(container) = self.with_current(container_id, id, |session| {
            session.state = SessionState::Mounting;
            session.container.clone()
        }) else {
            return Ok(Attempt::Abandoned);
        };

        if !container.is_attached() {
            tokio::select! {
                biased;
                _ = listener.cancelled() => return Ok(Attempt::Abandoned),
                _ = container.wait_attached() => {}
                _ = self.inner.scheduler.sleep(self.inner.config.mount_timeout) => {
                    return Err(LoaderError::Timeout {
                        module: descriptor.name.clone(),
                        container: container_id.clone(),
                    });
                }
            }
            if self.with_current(container_id, id, |_| ()).is_none() {
                return Ok(Attempt::Abandoned);
            }
        }

        let services = ModuleServices::for_module(
            &descriptor,
            Arc::clone(&self.inner.bus),
            &self.inner.host,
        );
        contain(|| module.mount(&container, &services)).map_err(|failure| {
            LoaderError::Mount {
                module: descriptor.name.clone(),
                failure,
            }
        })?;

        let handle = MountedHandle::new(module, container);
        let orphan = {
            let mut sessions = self.inner.sessions.lock();
            match sessions.get_mut(container_id).filter(|s| s.is_current(id)) {
                Some(session) => {
                    session.handle = Some(handle);
                    session.state = SessionState::Mounted;
                    session.last_error = None;
                    None
                }
                None => Some(handle),
            }
        };

        MODULES_MOUNTED.inc();
        if let Some(handle) = orphan {
            // Unloaded while mount ran.
            self.teardown(container_id, &descriptor.name, &descriptor.load_address, handle);
            return Ok(Attempt::Abandoned);
        }

        MODULE_LOAD_ATTEMPTS.with_label_values(&["mounted"]).inc();
        log_module_event!(info, descriptor.name, "Module mounted", container = %container_id);
        self.emit(topics::MODULE_LOADED, json!({ "name": descriptor.name }));
        Ok(Attempt::Mounted)
    }

    /// Bookkeeping for a failed attempt. `None` when the run no longer owns
    /// the session.
    fn record_failure(
        &self,
        container: &ContainerId,
        id: SessionId,
        error: &LoaderError,
    ) -> Option<Next> {
        let max_retries = self.inner.config.max_retries;

        let (name, address, retry_count, next) = self.with_current(container, id, |session| {
            let retry_count = session.retry_count;
            session.last_error = Some(error.clone());

            let next = if error.is_retryable() && retry_count < max_retries {
                session.retry_count += 1;
                session.state = SessionState::RetryWait;
                Next::Retry(self.inner.config.backoff_delay(retry_count))
            } else {
                session.state = SessionState::Failed;
                Next::GiveUp(session.on_error.clone())
            };

            (
                session.descriptor.name.clone(),
                session.descriptor.load_address.clone(),
                retry_count,
                next,
            )
        })?;

        let attempt = retry_count + 1;
        self.emit(
            topics::MODULE_ERROR,
            json!({ "name": name, "attempt": attempt, "error": error.to_string() }),
        );
        self.inner.reporter.report(
            &name,
            &error.to_failure(),
            error.category(),
            ErrorContext::new()
                .load_address(address)
                .retry_count(retry_count)
                .with("container", container.as_str())
                .with("attempt", attempt),
        );

        match &next {
            Next::Retry(delay) => {
                MODULE_LOAD_ATTEMPTS.with_label_values(&["retry"]).inc();
                log_module_event!(
                    warn,
                    name,
                    "Module load failed, retrying",
                    attempt,
                    max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error
                );
            }
            Next::GiveUp(_) => {
                MODULE_LOAD_ATTEMPTS.with_label_values(&["failed"]).inc();
                log_module_event!(
                    error,
                    name,
                    "Module load failed",
                    attempt,
                    retryable = error.is_retryable(),
                    category = %error.category(),
                    error = %error
                );
            }
        }

        Some(next)
    }

    /// Run `f` on the session if run `id` still owns it.
    fn with_current<R>(
        &self,
        container: &ContainerId,
        id: SessionId,
        f: impl FnOnce(&mut LoadSession) -> R,
    ) -> Option<R> {
        let mut sessions = self.inner.sessions.lock();
        let session = sessions.get_mut(container)?;
        if !session.is_current(id) {
            return None;
        }
        Some(f(session))
    }
}
