//! # Reporting
//!
//! Accepted reports reach the bus and the remote sink; the sink failing
//! never reaches the caller.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mc_01_error_reporter::{ErrorReport, ReporterConfig};
    use mc_03_module_loader::FetchError;
    use shared_types::{Container, ModuleDescriptor};

    use crate::integration::fixtures::{Host, WIDGET_ADDRESS};

    fn remote_config() -> ReporterConfig {
        ReporterConfig {
            enable_remote_logging: true,
            remote_endpoint: Some("https://logs.example/errors".into()),
            error_throttle_ms: 0,
            ..ReporterConfig::default()
        }
    }

    async fn drain() {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_reports_reach_sink_and_bus() {
        let host = Host::with_reporter_config(remote_config());
        host.fetcher.fail_next(FetchError::Network("connection refused".into()));

        host.loader
            .load(
                ModuleDescriptor::new("widget", WIDGET_ADDRESS),
                Container::attached("C"),
                None,
            )
            .await
            .unwrap();
        drain().await;

        let delivered = host.sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].source_module, "widget");
        assert_eq!(delivered[0].context.retry_count, Some(0));
        assert_eq!(
            delivered[0].context.load_address.as_deref(),
            Some(WIDGET_ADDRESS)
        );

        let on_bus = host
            .events()
            .into_iter()
            .find(|e| e.event_type == "error:reported")
            .unwrap();
        let report: ErrorReport = on_bus.payload_as().unwrap();
        assert_eq!(report.id, delivered[0].id);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_affect_loading() {
        let host = Host::with_reporter_config(remote_config());
        host.sink.set_failing(true);
        host.fetcher.fail_next(FetchError::Network("connection refused".into()));

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            host.loader.load(
                ModuleDescriptor::new("widget", WIDGET_ADDRESS),
                Container::attached("C"),
                None,
            ),
        )
        .await
        .unwrap();
        drain().await;

        assert!(result.is_ok());
        assert!(host.sink.delivered().is_empty());
        assert_eq!(host.reporter.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_capacity_drops_new_reports() {
        let host = Host::with_reporter_config(ReporterConfig {
            max_errors_per_session: 2,
            error_throttle_ms: 0,
            ..ReporterConfig::default()
        });
        for attempt in 0..4 {
            host.fetcher
                .fail_next(FetchError::Rejected(format!("HTTP 50{attempt}")));
        }

        let _ = host
            .loader
            .load(
                ModuleDescriptor::new("widget", WIDGET_ADDRESS),
                Container::attached("C"),
                None,
            )
            .await;

        let reports = host.reporter.errors();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].error.message.ends_with("HTTP 500"));
        assert!(reports[1].error.message.ends_with("HTTP 501"));
    }
}
