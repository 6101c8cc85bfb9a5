//! Span helpers for intake requests.

use tracing::Span;

/// Start a span for one register-and-enqueue invocation.
///
/// `graph.name` and `intake.outcome` are declared empty; the name is known
/// only after validation.
pub fn start_intake_span() -> Span {
    tracing::info_span!(
        "intake.register",
        "graph.name" = tracing::field::Empty,
        "intake.outcome" = tracing::field::Empty,
    )
}

pub fn record_graph_name(span: &Span, name: &str) {
    span.record("graph.name", name);
}

/// Record how the invocation ended.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("intake.outcome", outcome);
}
