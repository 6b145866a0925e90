//! # Load Flows
//!
//! Loader, reporter and bus together:
//!
//! 1. Transient fetch failures back off, then mount
//! 2. Lifecycle and report events interleave in a fixed order on the bus
//! 3. Mounted modules get only the services they declared
//! 4. Unloading a never-mounted session is a silent no-op

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use mc_01_error_reporter::{ErrorCategory, ReporterConfig};
    use mc_03_module_loader::{FetchError, LoadOutcome, SessionState};
    use shared_types::{capabilities, Container, ContainerId, ModuleDescriptor};

    use crate::integration::fixtures::{Host, WIDGET_ADDRESS};

    fn widget() -> ModuleDescriptor {
        ModuleDescriptor::new("widget", WIDGET_ADDRESS)
    }

    // =============================================================================
    // RETRY AND BACKOFF
    // =============================================================================

    #[tokio::test]
    async fn test_fetch_fails_twice_then_mounts() {
        let host = Host::new();
        // Distinct messages: identical ones would fall in the 5s throttle window.
        host.fetcher.fail_next(FetchError::Rejected("HTTP 503".into()));
        host.fetcher.fail_next(FetchError::Rejected("HTTP 502".into()));

        let outcome = host
            .loader
            .load(widget(), Container::attached("C"), None)
            .await
            .unwrap();

        assert!(matches!(outcome, LoadOutcome::Mounted(_)));
        assert_eq!(
            host.loader.state(&ContainerId::new("C")),
            Some(SessionState::Mounted)
        );

        let errors: Vec<_> = host
            .events()
            .into_iter()
            .filter(|e| e.event_type == "module:error")
            .collect();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].payload["attempt"], 1);
        assert_eq!(errors[1].payload["attempt"], 2);

        assert_eq!(
            host.scheduler.delays(),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );
        assert_eq!(host.reporter.summary().by_type(ErrorCategory::Load), 2);
    }

    #[tokio::test]
    async fn test_event_order_on_the_bus() {
        let host = Host::new();
        host.fetcher.fail_next(FetchError::Network("connection reset".into()));

        host.loader
            .load(widget(), Container::attached("C"), None)
            .await
            .unwrap();

        assert_eq!(
            host.topics(),
            vec![
                "module:loading",
                "module:error",
                "error:reported",
                "widget:ready",
                "module:loaded",
            ]
        );

        let ready = host
            .events()
            .into_iter()
            .find(|e| e.event_type == "widget:ready")
            .unwrap();
        assert_eq!(ready.source, "widget");

        let loaded = host
            .events()
            .into_iter()
            .find(|e| e.event_type == "module:loaded")
            .unwrap();
        assert_eq!(loaded.source, "container");
        assert_eq!(loaded.payload, json!({ "name": "widget" }));
    }

    #[tokio::test]
    async fn test_identical_failures_are_throttled_but_still_retried() {
        let host = Host::with_reporter_config(ReporterConfig::default());
        for _ in 0..4 {
            host.fetcher.fail_next(FetchError::Rejected("HTTP 503".into()));
        }

        let err = host
            .loader
            .load(widget(), Container::attached("C"), None)
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(host.fetcher.fetches(), 4);
        // One report inside the throttle window; every attempt still emits.
        assert_eq!(host.reporter.errors().len(), 1);
        let attempts = host
            .topics()
            .iter()
            .filter(|t| t.as_str() == "module:error")
            .count();
        assert_eq!(attempts, 4);
    }

    // =============================================================================
    // SERVICES
    // =============================================================================

    #[tokio::test]
    async fn test_services_follow_declared_capabilities() {
        let host = Host::new();
        let descriptor = widget()
            .with_capability(capabilities::AUTH)
            .with_capability(capabilities::MODAL);

        host.loader
            .load(descriptor, Container::attached("C"), None)
            .await
            .unwrap();

        // Auth declared and provided; modal declared but not provided.
        assert_eq!(*host.probe.saw_auth.lock(), Some(true));
        assert_eq!(*host.probe.saw_modal.lock(), Some(false));
    }

    #[tokio::test]
    async fn test_undeclared_services_are_withheld() {
        let host = Host::new();

        host.loader
            .load(widget(), Container::attached("C"), None)
            .await
            .unwrap();

        assert_eq!(*host.probe.saw_auth.lock(), Some(false));
    }

    // =============================================================================
    // UNLOAD
    // =============================================================================

    #[tokio::test]
    async fn test_unload_never_mounted_is_noop() {
        let host = Host::new();
        host.registry.unregister(WIDGET_ADDRESS);
        let _ = host
            .loader
            .load(widget(), Container::attached("C"), None)
            .await;
        let reports = host.reporter.errors().len();
        let events = host.topics().len();

        assert!(!host.loader.unload(&ContainerId::new("C")));

        assert_eq!(host.reporter.errors().len(), reports);
        assert_eq!(host.topics().len(), events);
        assert_eq!(host.probe.unmounts(), 0);
        assert_eq!(
            host.loader.state(&ContainerId::new("C")),
            Some(SessionState::Idle)
        );
    }

    #[tokio::test]
    async fn test_two_containers_are_independent() {
        let host = Host::new();
        let main = Container::attached("main");
        let side = Container::attached("side");

        host.loader.load(widget(), main.clone(), None).await.unwrap();
        host.loader.load(widget(), side.clone(), None).await.unwrap();
        assert_eq!(host.probe.mounts(), 2);

        host.loader.unload(main.id());

        assert!(main.is_empty());
        assert!(!side.is_empty());
        assert_eq!(host.loader.state(side.id()), Some(SessionState::Mounted));
    }
}
