//! Graph intake: validate a creation request, register the graph exactly
//! once, then hand it to the worker queue.
//!
//! The ordering is fixed: nothing touches the store until validation
//! passes, and nothing is published until the conditional insert has
//! succeeded. A duplicate name therefore never produces work.

use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use thiserror::Error;
use tracing::{Instrument, error, info, warn};

use crate::backend::{GraphStore, InsertOutcome, WorkQueue};
use crate::error::Error;
use crate::model::{CreateGraphRequest, GraphName, GraphRecord, GraphStatus, WorkMessage};
use crate::telemetry::intake::{record_graph_name, record_outcome, start_intake_span};
use crate::telemetry::metrics;

/// Why a request was rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("graphName is a required field which must made up of alphanumeric characters")]
    InvalidGraphName,

    #[error("schema is a required field")]
    MissingSchema,

    #[error("request body must be a JSON object: {0}")]
    MalformedBody(String),
}

/// Every way register-and-enqueue can fail.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("Graph {0} already exists. Graph names must be unique")]
    AlreadyExists(GraphName),

    #[error("{0}")]
    Backend(#[source] Error),
}

impl IntakeError {
    fn result_label(&self) -> &'static str {
        match self {
            IntakeError::Invalid(_) => "invalid",
            IntakeError::AlreadyExists(_) => "duplicate",
            IntakeError::Backend(_) => "error",
        }
    }
}

/// A request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub name: GraphName,
    pub schema: serde_json::Value,
}

/// An accepted registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registered {
    pub record: GraphRecord,
    /// Queue message id of the published work message.
    pub message_id: i64,
}

/// Parse a raw request body.
pub fn parse_request(body: &[u8]) -> Result<CreateGraphRequest, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

/// Check required fields and normalize the graph name.
pub fn validate(request: CreateGraphRequest) -> Result<ValidatedRequest, ValidationError> {
    let name = request
        .graph_name
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(GraphName::parse)
        .ok_or(ValidationError::InvalidGraphName)?;
    let schema = request.schema.ok_or(ValidationError::MissingSchema)?;
    Ok(ValidatedRequest { name, schema })
}

/// The intake handler. Cheap to clone; all clones share the collaborators.
#[derive(Clone)]
pub struct IntakeHandler {
    store: Arc<dyn GraphStore>,
    queue: Arc<dyn WorkQueue>,
}

impl IntakeHandler {
    pub fn new(store: Arc<dyn GraphStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Parse, validate and register a raw JSON body.
    pub async fn handle_body(&self, body: &[u8]) -> Result<Registered, IntakeError> {
        self.run(parse_request(body)).await
    }

    /// Validate a request and run register-and-enqueue.
    pub async fn register(&self, request: CreateGraphRequest) -> Result<Registered, IntakeError> {
        self.run(Ok(request)).await
    }

    /// One instrumented invocation: every request, including one whose body
    /// did not parse, gets a span, a counted outcome and a duration sample.
    async fn run(
        &self,
        parsed: Result<CreateGraphRequest, ValidationError>,
    ) -> Result<Registered, IntakeError> {
        let span = start_intake_span();
        let started = Instant::now();

        let result = async {
            let validated = parsed.and_then(validate).inspect_err(|e| {
                info!(reason = %e, "rejected graph request");
            })?;
            record_graph_name(&tracing::Span::current(), validated.name.as_str());
            self.register_validated(validated).await
        }
        .instrument(span.clone())
        .await;

        let label = match &result {
            Ok(_) => "created",
            Err(e) => e.result_label(),
        };
        record_outcome(&span, label);
        metrics::intake_requests().add(1, &[KeyValue::new("result", label)]);
        metrics::operation_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", "intake.register")],
        );

        result
    }

    async fn register_validated(
        &self,
        request: ValidatedRequest,
    ) -> Result<Registered, IntakeError> {
        let ValidatedRequest { name, schema } = request;
        let record = GraphRecord::queued(&name);

        match self.store.insert_if_absent(&record).await {
            Ok(InsertOutcome::Inserted) => {}
            Ok(InsertOutcome::AlreadyExists) => {
                info!(graph = %name, "graph already registered");
                return Err(IntakeError::AlreadyExists(name));
            }
            Err(e) => {
                error!(graph = %name, error = %e, "graph store insert failed");
                return Err(IntakeError::Backend(e));
            }
        }

        let message = WorkMessage {
            id: name.as_str().to_string(),
            schema,
            expected_status: record.current_state,
        };

        match self.queue.publish(&message).await {
            Ok(message_id) => {
                info!(graph = %name, message_id, "graph registered and queued");
                Ok(Registered { record, message_id })
            }
            Err(e) => {
                error!(graph = %name, error = %e, "work message publish failed");
                self.compensate(&name, record.current_state).await;
                Err(IntakeError::Backend(e))
            }
        }
    }

    /// Undo a registration whose work message was never published, so the
    /// caller can retry under the same name.
    ///
    /// Not airtight: a concurrent request for the same name may already have
    /// been told it exists, and a publish that committed before reporting an
    /// error leaves a message whose record this removes.
    async fn compensate(&self, name: &GraphName, status: GraphStatus) {
        match self.store.remove_if_status(name, status).await {
            Ok(true) => info!(graph = %name, "rolled back unqueued registration"),
            Ok(false) => warn!(graph = %name, "registration changed before rollback, left in place"),
            Err(e) => {
                metrics::intake_orphaned().add(1, &[]);
                error!(graph = %name, error = %e, "rollback failed, record has no work message");
            }
        }
    }

    /// Look up a graph by the name a client would submit.
    pub async fn lookup(&self, raw_name: &str) -> Result<Option<GraphRecord>, IntakeError> {
        let name = GraphName::parse(raw_name).ok_or(ValidationError::InvalidGraphName)?;
        self.store.get(&name).await.map_err(IntakeError::Backend)
    }

    /// Check that the graph store is reachable.
    pub async fn health(&self) -> Result<(), Error> {
        self.store.ping().await
    }
}
