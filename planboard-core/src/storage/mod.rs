pub mod memory;

use std::future::Future;

use crate::wire::{ColumnUpdate, LabelCreate, RemoteColumn, RemoteLabel, RemoteTask, TaskUpdate};

/// Abstract remote board store.
/// Implementations: RestStore (HTTP, in planboard-client), MemoryStore (in-process).
///
/// Every method is a single round-trip; callers decide ordering and
/// concurrency. Futures must be `Send` so the session can run them on
/// spawned tasks.
pub trait BoardStore: Send + Sync + 'static {
    fn list_columns(&self) -> impl Future<Output = Result<Vec<RemoteColumn>, StoreError>> + Send;

    fn create_column(
        &self,
        body: ColumnUpdate,
    ) -> impl Future<Output = Result<RemoteColumn, StoreError>> + Send;

    fn update_column(
        &self,
        column_id: u64,
        body: ColumnUpdate,
    ) -> impl Future<Output = Result<RemoteColumn, StoreError>> + Send;

    fn delete_column(&self, column_id: u64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn list_tasks(
        &self,
        column_id: u64,
    ) -> impl Future<Output = Result<Vec<RemoteTask>, StoreError>> + Send;

    fn create_task(
        &self,
        body: TaskUpdate,
    ) -> impl Future<Output = Result<RemoteTask, StoreError>> + Send;

    fn update_task(
        &self,
        task_id: u64,
        body: TaskUpdate,
    ) -> impl Future<Output = Result<RemoteTask, StoreError>> + Send;

    fn delete_task(&self, task_id: u64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn task_labels(
        &self,
        task_id: u64,
    ) -> impl Future<Output = Result<Vec<RemoteLabel>, StoreError>> + Send;

    /// Replace the task's whole label set.
    fn replace_task_labels(
        &self,
        task_id: u64,
        labels: Vec<LabelCreate>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{method} {path} returned HTTP {status}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
    },

    #[error("Malformed response from {path}: {message}")]
    Decode { path: String, message: String },
}
