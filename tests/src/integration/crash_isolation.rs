//! # Crash Isolation
//!
//! A module that fails after mounting is contained by its boundary: the
//! host keeps running, other containers are untouched, and the crash is
//! reported once.

#[cfg(test)]
mod tests {
    use serde_json::json;

    use mc_01_error_reporter::{ErrorCategory, Severity};
    use mc_02_isolation_boundary::BoundaryView;
    use mc_03_module_loader::{LoaderError, SessionState};
    use shared_types::{Container, ModuleDescriptor, NotificationLevel};

    use crate::integration::fixtures::{Host, WIDGET_ADDRESS};

    fn widget() -> ModuleDescriptor {
        ModuleDescriptor::new("widget", WIDGET_ADDRESS)
    }

    #[tokio::test]
    async fn test_update_crash_is_contained_and_reported_once() {
        let host = Host::new();
        let container = Container::attached("C");
        host.loader.load(widget(), container.clone(), None).await.unwrap();

        let err = host
            .loader
            .update(container.id(), &json!({ "count": "seven" }))
            .unwrap_err();
        assert!(matches!(err, LoaderError::Crashed(_)));

        let boundary = host.loader.boundary(container.id()).unwrap();
        assert_eq!(
            boundary.view(),
            BoundaryView::Crashed {
                message: "props.count is not a number".into()
            }
        );

        let reports = host.reporter.errors();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, ErrorCategory::Runtime);
        assert_eq!(reports[0].severity, Severity::Critical);
        assert_eq!(reports[0].error.name, "TypeError");
        assert_eq!(reports[0].context.actor_id.as_deref(), Some("u-42"));

        let notes = host.notifier.seen();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert_eq!(notes[0].title, "Critical Error");
    }

    #[tokio::test]
    async fn test_crash_leaves_other_containers_running() {
        let host = Host::new();
        let broken = Container::attached("broken");
        let healthy = Container::attached("healthy");
        host.loader.load(widget(), broken.clone(), None).await.unwrap();
        host.loader.load(widget(), healthy.clone(), None).await.unwrap();

        let _ = host.loader.update(broken.id(), &json!({}));

        host.loader
            .update(healthy.id(), &json!({ "count": 5 }))
            .unwrap();
        assert_eq!(healthy.content(), vec!["<counter>5</counter>".to_string()]);
        assert!(!host.loader.boundary(healthy.id()).unwrap().is_crashed());
    }

    #[tokio::test]
    async fn test_boundary_retry_remounts_fresh_instance() {
        let host = Host::new();
        let container = Container::attached("C");
        host.loader.load(widget(), container.clone(), None).await.unwrap();
        let _ = host.loader.update(container.id(), &json!({ "count": null }));

        host.loader.boundary(container.id()).unwrap().retry().await;

        assert_eq!(host.loader.state(container.id()), Some(SessionState::Mounted));
        assert_eq!(host.probe.mounts(), 2);
        assert_eq!(host.probe.unmounts(), 1);
        host.loader
            .update(container.id(), &json!({ "count": 1 }))
            .unwrap();
        assert_eq!(container.content(), vec!["<counter>1</counter>".to_string()]);
    }
}
