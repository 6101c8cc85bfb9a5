//! Postgres graph table and pgmq work queue.

use std::sync::Arc;

use async_trait::async_trait;

use super::{GraphStore, InsertOutcome, WorkQueue};
use crate::config::IntakeConfig;
use crate::db::Db;
use crate::error::Result;
use crate::model::{GraphName, GraphRecord, GraphStatus, WorkMessage};

/// Graph store backed by a Postgres table.
#[derive(Clone)]
pub struct PgGraphStore {
    db: Arc<Db>,
    table: String,
}

impl PgGraphStore {
    pub fn new(db: Arc<Db>, config: &IntakeConfig) -> Self {
        Self {
            db,
            table: config.table_name.clone(),
        }
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn insert_if_absent(&self, record: &GraphRecord) -> Result<InsertOutcome> {
        if self.db.insert_graph_if_absent(&self.table, record).await? {
            Ok(InsertOutcome::Inserted)
        } else {
            Ok(InsertOutcome::AlreadyExists)
        }
    }

    async fn get(&self, name: &GraphName) -> Result<Option<GraphRecord>> {
        self.db.get_graph(&self.table, name.as_str()).await
    }

    async fn remove_if_status(&self, name: &GraphName, status: GraphStatus) -> Result<bool> {
        self.db
            .delete_graph_if_state(&self.table, name.as_str(), status)
            .await
    }

    async fn ping(&self) -> Result<()> {
        self.db.health_check().await
    }
}

/// Work queue backed by a pgmq queue.
#[derive(Clone)]
pub struct PgmqWorkQueue {
    db: Arc<Db>,
    queue: String,
}

impl PgmqWorkQueue {
    pub fn new(db: Arc<Db>, config: &IntakeConfig) -> Self {
        Self {
            db,
            queue: config.queue_name.clone(),
        }
    }
}

#[async_trait]
impl WorkQueue for PgmqWorkQueue {
    async fn publish(&self, message: &WorkMessage) -> Result<i64> {
        let payload = serde_json::to_value(message)?;
        self.db.send_to_queue(&self.queue, &payload).await
    }
}
