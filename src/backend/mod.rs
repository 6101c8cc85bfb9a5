//! Collaborator seams for the intake handler.
//!
//! The handler only needs an atomic insert-if-absent on the graph store and
//! a publish on the work queue. Postgres/pgmq back both in production; the
//! in-memory versions serve local development and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{GraphName, GraphRecord, GraphStatus, WorkMessage};

pub use memory::{MemoryGraphStore, MemoryWorkQueue};
pub use postgres::{PgGraphStore, PgmqWorkQueue};

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Key-value store of graph records keyed by normalized name.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert `record` only if no record with its name exists. The check and
    /// the write must be one atomic operation.
    async fn insert_if_absent(&self, record: &GraphRecord) -> Result<InsertOutcome>;

    async fn get(&self, name: &GraphName) -> Result<Option<GraphRecord>>;

    /// Remove the record for `name` if it is still in `status`. Used to undo
    /// a registration whose work message never made it onto the queue.
    async fn remove_if_status(&self, name: &GraphName, status: GraphStatus) -> Result<bool>;

    /// Cheap reachability check for health endpoints.
    async fn ping(&self) -> Result<()>;
}

/// Destination for work messages consumed by the worker.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Publish a message; returns the queue's message id.
    async fn publish(&self, message: &WorkMessage) -> Result<i64>;
}
