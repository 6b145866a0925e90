//! # Mosaic Benchmarks
//!
//! | Path | Claim | Target |
//! |------|-------|--------|
//! | Event bus dispatch | Synchronous fan-out in subscription order | < 1µs per handler |
//! | Error report intake | Throttle check and store under one lock | < 10µs per report |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mc_01_error_reporter::{ErrorCategory, ErrorContext, ErrorReporter, ReporterConfig};
use shared_bus::EventBus;
use shared_types::ModuleFailure;

// ============================================================================
// Event bus
// ============================================================================

fn bench_bus_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("event-bus");

    for subscribers in [1usize, 10, 100] {
        let bus = EventBus::new("bench");
        let hits = Arc::new(AtomicU64::new(0));
        let subscriptions: Vec<_> = (0..subscribers)
            .map(|_| {
                let hits = Arc::clone(&hits);
                bus.on("market:tick", move |_| {
                    hits.fetch_add(1, Ordering::Relaxed);
                })
            })
            .collect();

        let payload = json!({ "symbol": "ACME", "price": 12.5 });
        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("emit", subscribers),
            &subscribers,
            |b, _| b.iter(|| black_box(bus.emit("market:tick", payload.clone()))),
        );

        drop(subscriptions);
    }

    let bus = EventBus::new("bench");
    let _wildcard = bus.on("market:*", |_| {});
    group.bench_function("emit_namespace_match", |b| {
        b.iter(|| black_box(bus.emit("market:tick", json!(null))))
    });

    group.finish();
}

// ============================================================================
// Error reporter
// ============================================================================

fn bench_report_intake(c: &mut Criterion) {
    let mut group = c.benchmark_group("error-reporter");

    let reporter = ErrorReporter::new(ReporterConfig {
        max_errors_per_session: 10_000,
        error_throttle_ms: 0,
        enable_console_log: false,
        ..ReporterConfig::default()
    });
    let failure = ModuleFailure::other("render failed");
    let mut stored = 0usize;
    group.bench_function("report_accepted", |b| {
        b.iter(|| {
            stored += 1;
            if stored % 10_000 == 0 {
                reporter.clear();
            }
            black_box(reporter.report(
                "widget",
                &failure,
                ErrorCategory::Runtime,
                ErrorContext::new(),
            ))
        })
    });

    let throttled = ErrorReporter::new(ReporterConfig {
        enable_console_log: false,
        ..ReporterConfig::default()
    });
    throttled.report("widget", &failure, ErrorCategory::Runtime, ErrorContext::new());
    group.bench_function("report_throttled", |b| {
        b.iter(|| {
            black_box(throttled.report(
                "widget",
                &failure,
                ErrorCategory::Runtime,
                ErrorContext::new(),
            ))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_bus_dispatch, bench_report_intake);
criterion_main!(benches);
