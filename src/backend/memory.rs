//! In-process store and queue. Nothing survives a restart.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{GraphStore, InsertOutcome, WorkQueue};
use crate::error::Result;
use crate::model::{GraphName, GraphRecord, GraphStatus, WorkMessage};

// Every critical section is a single map or vec operation, so a poisoned
// lock still guards consistent data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Graph records in a map. The entry check and insert happen under one lock.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    records: Mutex<HashMap<String, GraphRecord>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records.
    pub fn records(&self) -> Vec<GraphRecord> {
        lock(&self.records).values().cloned().collect()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn insert_if_absent(&self, record: &GraphRecord) -> Result<InsertOutcome> {
        let mut records = lock(&self.records);
        match records.entry(record.release_name.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn get(&self, name: &GraphName) -> Result<Option<GraphRecord>> {
        Ok(lock(&self.records).get(name.as_str()).cloned())
    }

    async fn remove_if_status(&self, name: &GraphName, status: GraphStatus) -> Result<bool> {
        let mut records = lock(&self.records);
        match records.get(name.as_str()) {
            Some(record) if record.current_state == status => {
                records.remove(name.as_str());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Published messages kept in send order.
#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    messages: Mutex<Vec<WorkMessage>>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far.
    pub fn messages(&self) -> Vec<WorkMessage> {
        lock(&self.messages).clone()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn publish(&self, message: &WorkMessage) -> Result<i64> {
        let mut messages = lock(&self.messages);
        messages.push(message.clone());
        Ok(messages.len() as i64)
    }
}
