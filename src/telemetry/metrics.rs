//! Metric instruments for graph-intake.
//!
//! Built from the globally-registered `MeterProvider`; without an OTLP
//! endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("graph-intake")
}

/// Counter: intake requests by result.
/// Labels: `result` ("created" | "duplicate" | "invalid" | "error").
pub fn intake_requests() -> Counter<u64> {
    meter()
        .u64_counter("graph_intake.intake.requests")
        .with_description("Number of graph creation requests handled")
        .build()
}

/// Counter: queue-level operations (create, send, read, archive).
/// Labels: `queue`, `operation`.
pub fn queue_operations() -> Counter<u64> {
    meter()
        .u64_counter("graph_intake.queue.operations")
        .with_description("Number of queue operations")
        .build()
}

/// Counter: records left behind because both the publish and the
/// compensating delete failed.
pub fn intake_orphaned() -> Counter<u64> {
    meter()
        .u64_counter("graph_intake.intake.orphaned")
        .with_description("Graph records registered without a work message")
        .build()
}

/// Histogram: operation duration in milliseconds.
/// Labels: `operation`.
pub fn operation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("graph_intake.operation.duration_ms")
        .with_description("Operation duration in milliseconds")
        .with_unit("ms")
        .build()
}
