/// In-process board store.
///
/// Behaves like the REST store: numeric IDs, `order` fields, cascade delete of
/// a column's tasks, label replacement. Every call is appended to a journal
/// so callers can check exactly which round-trips happened, and individual
/// call kinds can be made to fail.
use std::collections::{HashMap, HashSet};
use std::future::{ready, Future};
use std::sync::Mutex;

use super::{BoardStore, StoreError};
use crate::wire::{ColumnUpdate, LabelCreate, RemoteColumn, RemoteLabel, RemoteTask, TaskUpdate};

/// One recorded round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    ListColumns,
    CreateColumn(ColumnUpdate),
    UpdateColumn(u64, ColumnUpdate),
    DeleteColumn(u64),
    ListTasks(u64),
    CreateTask(TaskUpdate),
    UpdateTask(u64, TaskUpdate),
    DeleteTask(u64),
    TaskLabels(u64),
    ReplaceTaskLabels(u64, Vec<LabelCreate>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    ListColumns,
    CreateColumn,
    UpdateColumn,
    DeleteColumn,
    ListTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    TaskLabels,
    ReplaceTaskLabels,
}

impl StoreCall {
    pub fn kind(&self) -> CallKind {
        match self {
            StoreCall::ListColumns => CallKind::ListColumns,
            StoreCall::CreateColumn(_) => CallKind::CreateColumn,
            StoreCall::UpdateColumn(..) => CallKind::UpdateColumn,
            StoreCall::DeleteColumn(_) => CallKind::DeleteColumn,
            StoreCall::ListTasks(_) => CallKind::ListTasks,
            StoreCall::CreateTask(_) => CallKind::CreateTask,
            StoreCall::UpdateTask(..) => CallKind::UpdateTask,
            StoreCall::DeleteTask(_) => CallKind::DeleteTask,
            StoreCall::TaskLabels(_) => CallKind::TaskLabels,
            StoreCall::ReplaceTaskLabels(..) => CallKind::ReplaceTaskLabels,
        }
    }

    /// True for calls that change remote state.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            StoreCall::ListColumns | StoreCall::ListTasks(_) | StoreCall::TaskLabels(_)
        )
    }
}

#[derive(Default)]
struct Inner {
    columns: Vec<RemoteColumn>,
    tasks: Vec<RemoteTask>,
    labels: HashMap<u64, Vec<RemoteLabel>>,
    next_column_id: u64,
    next_task_id: u64,
    next_label_id: u64,
    journal: Vec<StoreCall>,
    failing: HashSet<CallKind>,
}

impl Inner {
    // Each resource has its own ID sequence, like separate tables.
    fn allocate_column_id(&mut self) -> u64 {
        self.next_column_id += 1;
        self.next_column_id
    }

    fn allocate_task_id(&mut self) -> u64 {
        self.next_task_id += 1;
        self.next_task_id
    }

    fn allocate_label_id(&mut self) -> u64 {
        self.next_label_id += 1;
        self.next_label_id
    }

    fn store_labels(&mut self, task_id: u64, labels: Vec<LabelCreate>) {
        let stored = labels
            .into_iter()
            .map(|l| RemoteLabel {
                id: self.allocate_label_id(),
                text: l.text,
                color: l.color,
            })
            .collect();
        self.labels.insert(task_id, stored);
    }

    /// Record the call and decide whether it should fail.
    fn admit(&mut self, call: StoreCall, method: &'static str, path: String) -> Result<(), StoreError> {
        let kind = call.kind();
        self.journal.push(call);
        if self.failing.contains(&kind) {
            log::debug!("[planboard.memory] injected failure for {} {}", method, path);
            return Err(StoreError::Status {
                method,
                path,
                status: 500,
            });
        }
        Ok(())
    }
}

fn not_found(method: &'static str, path: String) -> StoreError {
    StoreError::Status {
        method,
        path,
        status: 404,
    }
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// A small starter board: "To Do", "In Progress", "Done" with one task each.
    pub fn seeded() -> Self {
        let store = Self::new();
        let todo = store.seed_column("To Do", 1);
        let doing = store.seed_column("In Progress", 2);
        let done = store.seed_column("Done", 3);
        store.seed_task(todo, "Design UI", Some("Create mockups"), false);
        store.seed_task(doing, "Setup Database", Some("Configure PostgreSQL"), false);
        store.seed_task(done, "API Development", Some("Create endpoints"), true);
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a column directly, bypassing the journal. Returns its ID.
    pub fn seed_column(&self, title: &str, order: i64) -> u64 {
        let mut inner = self.lock();
        let id = inner.allocate_column_id();
        inner.columns.push(RemoteColumn {
            id,
            title: title.to_string(),
            order,
            created_at: None,
            updated_at: None,
        });
        id
    }

    /// Insert a task at the end of a column, bypassing the journal. Returns its ID.
    pub fn seed_task(&self, column_id: u64, title: &str, description: Option<&str>, completed: bool) -> u64 {
        let mut inner = self.lock();
        let id = inner.allocate_task_id();
        let order = inner.tasks.iter().filter(|t| t.column_id == column_id).count() as i64;
        inner.tasks.push(RemoteTask {
            id,
            title: title.to_string(),
            description: description.map(str::to_string),
            completed,
            order,
            column_id,
            created_at: None,
            updated_at: None,
        });
        id
    }

    pub fn seed_labels(&self, task_id: u64, labels: &[(&str, &str)]) {
        let labels = labels
            .iter()
            .map(|(text, color)| LabelCreate {
                text: text.to_string(),
                color: color.to_string(),
            })
            .collect();
        self.lock().store_labels(task_id, labels);
    }

    /// Make every future call of this kind fail with HTTP 500.
    pub fn fail_on(&self, kind: CallKind) {
        self.lock().failing.insert(kind);
    }

    pub fn journal(&self) -> Vec<StoreCall> {
        self.lock().journal.clone()
    }

    /// Journal entries that changed (or tried to change) remote state.
    pub fn writes(&self) -> Vec<StoreCall> {
        self.lock()
            .journal
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    pub fn column(&self, id: u64) -> Option<RemoteColumn> {
        self.lock().columns.iter().find(|c| c.id == id).cloned()
    }

    pub fn task(&self, id: u64) -> Option<RemoteTask> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn labels_of(&self, task_id: u64) -> Vec<RemoteLabel> {
        self.lock().labels.get(&task_id).cloned().unwrap_or_default()
    }

    fn do_list_columns(&self) -> Result<Vec<RemoteColumn>, StoreError> {
        let mut inner = self.lock();
        inner.admit(StoreCall::ListColumns, "GET", "/columns".to_string())?;
        let mut columns = inner.columns.clone();
        columns.sort_by_key(|c| c.order);
        Ok(columns)
    }

    fn do_create_column(&self, body: ColumnUpdate) -> Result<RemoteColumn, StoreError> {
        let mut inner = self.lock();
        inner.admit(StoreCall::CreateColumn(body.clone()), "POST", "/columns".to_string())?;
        let id = inner.allocate_column_id();
        let column = RemoteColumn {
            id,
            title: body.title,
            order: body.order.unwrap_or(0),
            created_at: None,
            updated_at: None,
        };
        inner.columns.push(column.clone());
        Ok(column)
    }

    fn do_update_column(&self, column_id: u64, body: ColumnUpdate) -> Result<RemoteColumn, StoreError> {
        let path = format!("/columns/{}", column_id);
        let mut inner = self.lock();
        inner.admit(StoreCall::UpdateColumn(column_id, body.clone()), "PUT", path.clone())?;
        let column = inner
            .columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| not_found("PUT", path))?;
        column.title = body.title;
        if let Some(order) = body.order {
            column.order = order;
        }
        Ok(column.clone())
    }

    fn do_delete_column(&self, column_id: u64) -> Result<(), StoreError> {
        let path = format!("/columns/{}", column_id);
        let mut inner = self.lock();
        inner.admit(StoreCall::DeleteColumn(column_id), "DELETE", path.clone())?;
        let before = inner.columns.len();
        inner.columns.retain(|c| c.id != column_id);
        if inner.columns.len() == before {
            return Err(not_found("DELETE", path));
        }
        let orphaned: Vec<u64> = inner
            .tasks
            .iter()
            .filter(|t| t.column_id == column_id)
            .map(|t| t.id)
            .collect();
        inner.tasks.retain(|t| t.column_id != column_id);
        for task_id in orphaned {
            inner.labels.remove(&task_id);
        }
        Ok(())
    }

    fn do_list_tasks(&self, column_id: u64) -> Result<Vec<RemoteTask>, StoreError> {
        let mut inner = self.lock();
        inner.admit(
            StoreCall::ListTasks(column_id),
            "GET",
            format!("/tasks?column_id={}", column_id),
        )?;
        let mut tasks: Vec<RemoteTask> = inner
            .tasks
            .iter()
            .filter(|t| t.column_id == column_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.order);
        Ok(tasks)
    }

    fn do_create_task(&self, body: TaskUpdate) -> Result<RemoteTask, StoreError> {
        let mut inner = self.lock();
        inner.admit(StoreCall::CreateTask(body.clone()), "POST", "/tasks".to_string())?;
        let column_id = body.column_id.unwrap_or_default();
        if !inner.columns.iter().any(|c| c.id == column_id) {
            return Err(not_found("POST", format!("/columns/{}", column_id)));
        }
        let id = inner.allocate_task_id();
        let task = RemoteTask {
            id,
            title: body.title.unwrap_or_default(),
            description: body.description,
            completed: body.completed.unwrap_or(false),
            order: body.order.unwrap_or(0),
            column_id,
            created_at: None,
            updated_at: None,
        };
        inner.tasks.push(task.clone());
        Ok(task)
    }

    fn do_update_task(&self, task_id: u64, body: TaskUpdate) -> Result<RemoteTask, StoreError> {
        let path = format!("/tasks/{}", task_id);
        let mut inner = self.lock();
        inner.admit(StoreCall::UpdateTask(task_id, body.clone()), "PUT", path.clone())?;
        let task = inner
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| not_found("PUT", path))?;
        if let Some(title) = body.title {
            task.title = title;
        }
        if let Some(description) = body.description {
            task.description = Some(description);
        }
        if let Some(completed) = body.completed {
            task.completed = completed;
        }
        if let Some(order) = body.order {
            task.order = order;
        }
        if let Some(column_id) = body.column_id {
            task.column_id = column_id;
        }
        let updated = task.clone();
        if let Some(labels) = body.labels {
            inner.store_labels(task_id, labels);
        }
        Ok(updated)
    }

    fn do_delete_task(&self, task_id: u64) -> Result<(), StoreError> {
        let path = format!("/tasks/{}", task_id);
        let mut inner = self.lock();
        inner.admit(StoreCall::DeleteTask(task_id), "DELETE", path.clone())?;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != task_id);
        if inner.tasks.len() == before {
            return Err(not_found("DELETE", path));
        }
        inner.labels.remove(&task_id);
        Ok(())
    }

    fn do_task_labels(&self, task_id: u64) -> Result<Vec<RemoteLabel>, StoreError> {
        let path = format!("/tasks/{}/labels", task_id);
        let mut inner = self.lock();
        inner.admit(StoreCall::TaskLabels(task_id), "GET", path.clone())?;
        if !inner.tasks.iter().any(|t| t.id == task_id) {
            return Err(not_found("GET", path));
        }
        Ok(inner.labels.get(&task_id).cloned().unwrap_or_default())
    }

    fn do_replace_task_labels(&self, task_id: u64, labels: Vec<LabelCreate>) -> Result<(), StoreError> {
        let path = format!("/tasks/{}/labels", task_id);
        let mut inner = self.lock();
        inner.admit(
            StoreCall::ReplaceTaskLabels(task_id, labels.clone()),
            "POST",
            path.clone(),
        )?;
        if !inner.tasks.iter().any(|t| t.id == task_id) {
            return Err(not_found("POST", path));
        }
        inner.store_labels(task_id, labels);
        Ok(())
    }
}

impl BoardStore for MemoryStore {
    fn list_columns(&self) -> impl Future<Output = Result<Vec<RemoteColumn>, StoreError>> + Send {
        ready(self.do_list_columns())
    }

    fn create_column(
        &self,
        body: ColumnUpdate,
    ) -> impl Future<Output = Result<RemoteColumn, StoreError>> + Send {
        ready(self.do_create_column(body))
    }

    fn update_column(
        &self,
        column_id: u64,
        body: ColumnUpdate,
    ) -> impl Future<Output = Result<RemoteColumn, StoreError>> + Send {
        ready(self.do_update_column(column_id, body))
    }

    fn delete_column(&self, column_id: u64) -> impl Future<Output = Result<(), StoreError>> + Send {
        ready(self.do_delete_column(column_id))
    }

    fn list_tasks(
        &self,
        column_id: u64,
    ) -> impl Future<Output = Result<Vec<RemoteTask>, StoreError>> + Send {
        ready(self.do_list_tasks(column_id))
    }

    fn create_task(
        &self,
        body: TaskUpdate,
    ) -> impl Future<Output = Result<RemoteTask, StoreError>> + Send {
        ready(self.do_create_task(body))
    }

    fn update_task(
        &self,
        task_id: u64,
        body: TaskUpdate,
    ) -> impl Future<Output = Result<RemoteTask, StoreError>> + Send {
        ready(self.do_update_task(task_id, body))
    }

    fn delete_task(&self, task_id: u64) -> impl Future<Output = Result<(), StoreError>> + Send {
        ready(self.do_delete_task(task_id))
    }

    fn task_labels(
        &self,
        task_id: u64,
    ) -> impl Future<Output = Result<Vec<RemoteLabel>, StoreError>> + Send {
        ready(self.do_task_labels(task_id))
    }

    fn replace_task_labels(
        &self,
        task_id: u64,
        labels: Vec<LabelCreate>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        ready(self.do_replace_task_labels(task_id, labels))
    }
}
