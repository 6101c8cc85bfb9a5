//! Intake metrics, read back through an in-memory exporter.
//!
//! Installs a global meter provider, so it lives in its own test binary.

use std::sync::Arc;

use graph_intake::backend::{MemoryGraphStore, MemoryWorkQueue};
use graph_intake::intake::IntakeHandler;
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, SdkMeterProvider};

/// Total number of samples recorded in the duration histogram.
fn duration_samples(exporter: &InMemoryMetricExporter) -> u64 {
    let exported = exporter.get_finished_metrics().unwrap();
    let Some(resource_metrics) = exported.last() else {
        return 0;
    };
    resource_metrics
        .scope_metrics()
        .flat_map(|scope| scope.metrics())
        .filter(|metric| metric.name() == "graph_intake.operation.duration_ms")
        .map(|metric| match metric.data() {
            AggregatedMetrics::F64(MetricData::Histogram(histogram)) => histogram
                .data_points()
                .map(|point| point.count())
                .sum::<u64>(),
            _ => 0,
        })
        .sum()
}

#[tokio::test]
async fn every_request_outcome_is_timed() {
    let exporter = InMemoryMetricExporter::default();
    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter.clone())
        .build();
    opentelemetry::global::set_meter_provider(provider.clone());

    let handler = IntakeHandler::new(
        Arc::new(MemoryGraphStore::new()),
        Arc::new(MemoryWorkQueue::new()),
    );

    // Unparseable body, invalid name, accepted, duplicate.
    let bodies: [&[u8]; 4] = [
        b"{not json",
        br#"{"graphName":"bad name!","schema":{}}"#,
        br#"{"graphName":"Timed","schema":{}}"#,
        br#"{"graphName":"timed","schema":{}}"#,
    ];
    for body in bodies {
        let _ = handler.handle_body(body).await;
    }

    provider.force_flush().unwrap();
    assert_eq!(duration_samples(&exporter), 4);
}
