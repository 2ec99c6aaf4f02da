/// Board session: the single writer of the board cache.
///
/// Every mutation funnels through one actor task. Local read-modify-write
/// steps run synchronously inside the actor; remote calls run on spawned
/// tasks and report back as `Settled` messages on the same queue, so the
/// cache is only ever touched by the actor. Remote tails may overlap and
/// the last one applied wins.
///
/// What happens when a remote call fails is decided by
/// `MutationKind::policy()`: reload the board, notify, or only log.
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use planboard_core::board::{BoardError, BoardState};
use planboard_core::config::TerminalTitles;
use planboard_core::mutation::{FailurePolicy, MutationKind};
use planboard_core::reorder::{ColumnOrder, DragEvent, DragPlan, DropResult, TaskPlacement};
use planboard_core::storage::{BoardStore, StoreError};
use planboard_core::types::{Board, Label, SectionId, Task, TaskId};
use planboard_core::validate::{dedupe_labels, normalize_description, SectionName, Title};
use planboard_core::wire::{ColumnUpdate, LabelCreate, RemoteTask, TaskUpdate};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::events::{BoardEvent, Notice};

const EVENT_CAPACITY: usize = 256;
pub const LOAD_FAILED: &str = "Could not load the board";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Nothing is waiting for confirmation")]
    NothingPending,

    #[error("No section rename in progress")]
    NoRenameInProgress,

    #[error("Board session has shut down")]
    Closed,
}

/// Entity awaiting a delete confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    Task(TaskId),
    Section(SectionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: Title,
    pub description: Option<String>,
    pub labels: Vec<Label>,
}

/// Full replacement of a task's editable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Title,
    pub description: Option<String>,
    pub completed: bool,
    pub labels: Vec<Label>,
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Load { reply: Reply<()> },
    Snapshot { reply: oneshot::Sender<Board> },
    Drag { event: DragEvent, reply: Reply<()> },
    CreateTask { section: SectionId, task: NewTask, reply: Reply<()> },
    UpdateTask { task: TaskId, edit: TaskEdit, reply: Reply<()> },
    ToggleTask { task: TaskId, reply: Reply<()> },
    RequestDelete { target: DeleteTarget, reply: Reply<()> },
    ConfirmDelete { reply: Reply<DeleteTarget> },
    CancelDelete { reply: oneshot::Sender<Option<DeleteTarget>> },
    PendingDelete { reply: oneshot::Sender<Option<DeleteTarget>> },
    OpenTask { task: TaskId, reply: Reply<Task> },
    CloseTask { reply: oneshot::Sender<()> },
    SelectedTask { reply: oneshot::Sender<Option<Task>> },
    CreateSection { name: SectionName, reply: Reply<()> },
    BeginRename { section: SectionId, reply: Reply<String> },
    CancelRename { reply: oneshot::Sender<bool> },
    RenameSection { title: Title, reply: Reply<()> },
    Idle { reply: oneshot::Sender<()> },
}

/// Cache change to make once the store has confirmed a mutation.
enum Effect {
    AppendTask { section: SectionId, task: Task },
    ReplaceTask(Task),
    RemoveTask(TaskId),
    AppendSection { section: SectionId, title: String },
    RenameSection { section: SectionId, title: String },
    RemoveSection(SectionId),
    /// The cache was already written before the call went out.
    Applied,
}

enum Settled {
    Loaded {
        result: Result<BoardState, StoreError>,
        reply: Option<Reply<()>>,
    },
    Mutation {
        kind: MutationKind,
        result: Result<Effect, StoreError>,
    },
}

enum Msg {
    Command(Command),
    Settled(Settled),
}

pub struct BoardSession<S> {
    store: Arc<S>,
    state: BoardState,
    queue: mpsc::WeakUnboundedSender<Msg>,
    inbox: mpsc::UnboundedReceiver<Msg>,
    events: broadcast::Sender<BoardEvent>,
    busy: watch::Sender<bool>,
    in_flight: usize,
    blocking: usize,
    idle_waiters: Vec<oneshot::Sender<()>>,
    pending_delete: Option<DeleteTarget>,
    renaming: Option<SectionId>,
    selected: Option<Task>,
}

impl<S: BoardStore> BoardSession<S> {
    /// Start the actor on the current tokio runtime with an empty cache.
    /// Call `BoardHandle::load` to fill it.
    pub fn spawn(store: Arc<S>, titles: TerminalTitles) -> BoardHandle {
        let (queue, inbox) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (busy, busy_rx) = watch::channel(false);
        let session = Self {
            store,
            state: BoardState::new(titles),
            queue: queue.downgrade(),
            inbox,
            events: events.clone(),
            busy,
            in_flight: 0,
            blocking: 0,
            idle_waiters: Vec::new(),
            pending_delete: None,
            renaming: None,
            selected: None,
        };
        tokio::spawn(session.run());
        BoardHandle {
            queue,
            events,
            busy: busy_rx,
        }
    }

    async fn run(mut self) {
        log::debug!("[planboard.session] session started");
        while let Some(msg) = self.inbox.recv().await {
            match msg {
                Msg::Command(command) => self.handle(command),
                Msg::Settled(settled) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.settle(settled);
                }
            }
            if self.in_flight == 0 {
                for waiter in self.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }
        log::debug!("[planboard.session] session closed");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Load { reply } => self.start_load(Some(reply)),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            Command::Drag { event, reply } => {
                let _ = reply.send(self.drag(event));
            }
            Command::CreateTask {
                section,
                task,
                reply,
            } => {
                let _ = reply.send(self.create_task(section, task));
            }
            Command::UpdateTask { task, edit, reply } => {
                let _ = reply.send(self.update_task(task, edit));
            }
            Command::ToggleTask { task, reply } => {
                let _ = reply.send(self.toggle_task(task));
            }
            Command::RequestDelete { target, reply } => {
                let _ = reply.send(self.request_delete(target));
            }
            Command::ConfirmDelete { reply } => {
                let _ = reply.send(self.confirm_delete());
            }
            Command::CancelDelete { reply } => {
                let cancelled = self.pending_delete.take();
                if let Some(pending) = cancelled {
                    log::debug!("[planboard.session] delete of {:?} cancelled", pending);
                }
                let _ = reply.send(cancelled);
            }
            Command::PendingDelete { reply } => {
                let _ = reply.send(self.pending_delete);
            }
            Command::OpenTask { task, reply } => {
                let opened = self
                    .state
                    .task(task)
                    .cloned()
                    .ok_or(SessionError::Board(BoardError::TaskNotFound(task)));
                if let Ok(copy) = &opened {
                    self.selected = Some(copy.clone());
                }
                let _ = reply.send(opened);
            }
            Command::CloseTask { reply } => {
                self.selected = None;
                let _ = reply.send(());
            }
            Command::SelectedTask { reply } => {
                let _ = reply.send(self.selected.clone());
            }
            Command::CreateSection { name, reply } => {
                let _ = reply.send(self.create_section(name));
            }
            Command::BeginRename { section, reply } => {
                let seeded = self
                    .state
                    .column(section)
                    .map(|c| c.title.clone())
                    .ok_or(SessionError::Board(BoardError::SectionNotFound(section)));
                if seeded.is_ok() {
                    self.renaming = Some(section);
                }
                let _ = reply.send(seeded);
            }
            Command::CancelRename { reply } => {
                let _ = reply.send(self.renaming.take().is_some());
            }
            Command::RenameSection { title, reply } => {
                let _ = reply.send(self.rename_section(title));
            }
            Command::Idle { reply } => self.idle_waiters.push(reply),
        }
    }

    // ---- local steps ----

    fn drag(&mut self, event: DragEvent) -> Result<(), SessionError> {
        match self.state.plan_drag(&event)? {
            DragPlan::Noop => {
                log::debug!("[planboard.session] drop without movement ignored");
            }
            DragPlan::Columns(orders) => {
                self.changed();
                self.persist_column_order(orders);
            }
            DragPlan::Task(placement) => {
                self.sync_selected(placement.task);
                self.changed();
                self.persist_task_move(placement);
            }
        }
        Ok(())
    }

    fn persist_column_order(&mut self, orders: Vec<ColumnOrder>) {
        let store = self.store.clone();
        self.spawn_mutation(MutationKind::MoveSection, async move {
            let total = orders.len();
            let results = join_all(orders.into_iter().map(|o| {
                store.update_column(
                    o.section.remote(),
                    ColumnUpdate {
                        title: o.title,
                        order: Some(o.order as i64),
                    },
                )
            }))
            .await;
            let mut failures = results.into_iter().filter_map(Result::err);
            match failures.next() {
                None => Ok(Effect::Applied),
                Some(first) => {
                    log::warn!(
                        "[planboard.session] {} of {} column order updates failed",
                        1 + failures.count(),
                        total
                    );
                    Err(first)
                }
            }
        });
    }

    fn persist_task_move(&mut self, placement: TaskPlacement) {
        let store = self.store.clone();
        let body = TaskUpdate {
            title: Some(placement.title),
            description: Some(placement.description.unwrap_or_default()),
            completed: Some(placement.completed),
            order: Some(placement.order as i64),
            column_id: Some(placement.section.remote()),
            labels: None,
        };
        let task_id = placement.task.remote();
        self.spawn_mutation(MutationKind::MoveTask, async move {
            store.update_task(task_id, body).await.map(|_| Effect::Applied)
        });
    }

    fn create_task(&mut self, section: SectionId, new: NewTask) -> Result<(), SessionError> {
        let order = self.state.task_count(section)?;
        let title = new.title.into_string();
        let description = normalize_description(new.description.as_deref());
        let body = TaskUpdate {
            title: Some(title.clone()),
            description: description.clone(),
            completed: Some(false),
            order: Some(order as i64),
            column_id: Some(section.remote()),
            labels: None,
        };
        let labels = dedupe_labels(new.labels);
        let staged: Vec<LabelCreate> = labels.iter().map(LabelCreate::from).collect();
        let store = self.store.clone();
        self.spawn_mutation(MutationKind::CreateTask, async move {
            let created = store.create_task(body).await?;
            if !staged.is_empty() {
                store.replace_task_labels(created.id, staged).await?;
            }
            Ok(Effect::AppendTask {
                section,
                task: Task {
                    id: TaskId(created.id),
                    title,
                    description,
                    completed: false,
                    labels,
                },
            })
        });
        Ok(())
    }

    fn update_task(&mut self, task: TaskId, edit: TaskEdit) -> Result<(), SessionError> {
        let section = self
            .state
            .owner_of(task)
            .ok_or(BoardError::TaskNotFound(task))?;
        let updated = Task {
            id: task,
            title: edit.title.into_string(),
            description: normalize_description(edit.description.as_deref()),
            completed: edit.completed,
            labels: dedupe_labels(edit.labels),
        };
        // Labels always go out, so an empty list clears them remotely.
        let body = TaskUpdate {
            title: Some(updated.title.clone()),
            description: Some(updated.description.clone().unwrap_or_default()),
            completed: Some(updated.completed),
            order: None,
            column_id: Some(section.remote()),
            labels: Some(updated.labels.iter().map(LabelCreate::from).collect()),
        };
        let store = self.store.clone();
        self.spawn_mutation(MutationKind::UpdateTask, async move {
            store
                .update_task(task.remote(), body)
                .await
                .map(|_| Effect::ReplaceTask(updated))
        });
        Ok(())
    }

    fn toggle_task(&mut self, task: TaskId) -> Result<(), SessionError> {
        let section = self
            .state
            .owner_of(task)
            .ok_or(BoardError::TaskNotFound(task))?;
        let completed = !self
            .state
            .task(task)
            .ok_or(BoardError::TaskNotFound(task))?
            .completed;
        let toggled = self.state.set_completed(task, completed)?.clone();
        self.sync_selected(task);
        self.changed();

        let body = TaskUpdate {
            title: Some(toggled.title),
            description: Some(toggled.description.unwrap_or_default()),
            completed: Some(completed),
            column_id: Some(section.remote()),
            ..Default::default()
        };
        let store = self.store.clone();
        self.spawn_mutation(MutationKind::ToggleTask, async move {
            store
                .update_task(task.remote(), body)
                .await
                .map(|_| Effect::Applied)
        });
        Ok(())
    }

    fn request_delete(&mut self, pending: DeleteTarget) -> Result<(), SessionError> {
        match pending {
            DeleteTarget::Task(id) if self.state.task(id).is_none() => {
                return Err(BoardError::TaskNotFound(id).into())
            }
            DeleteTarget::Section(id) if self.state.column(id).is_none() => {
                return Err(BoardError::SectionNotFound(id).into())
            }
            _ => {}
        }
        log::debug!("[planboard.session] delete of {:?} awaiting confirmation", pending);
        self.pending_delete = Some(pending);
        Ok(())
    }

    fn confirm_delete(&mut self) -> Result<DeleteTarget, SessionError> {
        let target = self
            .pending_delete
            .take()
            .ok_or(SessionError::NothingPending)?;
        let store = self.store.clone();
        match target {
            DeleteTarget::Task(id) => self.spawn_mutation(MutationKind::DeleteTask, async move {
                store
                    .delete_task(id.remote())
                    .await
                    .map(|()| Effect::RemoveTask(id))
            }),
            DeleteTarget::Section(id) => {
                self.spawn_mutation(MutationKind::DeleteSection, async move {
                    store
                        .delete_column(id.remote())
                        .await
                        .map(|()| Effect::RemoveSection(id))
                })
            }
        }
        Ok(target)
    }

    fn create_section(&mut self, name: SectionName) -> Result<(), SessionError> {
        let title = name.as_str().to_string();
        let body = ColumnUpdate {
            title: title.clone(),
            order: Some(self.state.column_count() as i64),
        };
        let store = self.store.clone();
        self.spawn_mutation(MutationKind::CreateSection, async move {
            store.create_column(body).await.map(|created| Effect::AppendSection {
                section: SectionId(created.id),
                title,
            })
        });
        Ok(())
    }

    fn rename_section(&mut self, title: Title) -> Result<(), SessionError> {
        let section = self.renaming.ok_or(SessionError::NoRenameInProgress)?;
        let Some(order) = self.state.section_index(section) else {
            self.renaming = None;
            return Err(BoardError::SectionNotFound(section).into());
        };
        let title = title.into_string();
        let body = ColumnUpdate {
            title: title.clone(),
            order: Some(order as i64),
        };
        let store = self.store.clone();
        self.spawn_mutation(MutationKind::RenameSection, async move {
            store
                .update_column(section.remote(), body)
                .await
                .map(|_| Effect::RenameSection { section, title })
        });
        Ok(())
    }

    fn start_load(&mut self, reply: Option<Reply<()>>) {
        let store = self.store.clone();
        let titles = self.state.terminal_titles().clone();
        self.spawn_tail(false, async move {
            let result = fetch_board(store.as_ref(), titles).await;
            Settled::Loaded { result, reply }
        });
    }

    // ---- remote tails ----

    fn spawn_mutation<F>(&mut self, kind: MutationKind, call: F)
    where
        F: Future<Output = Result<Effect, StoreError>> + Send + 'static,
    {
        log::debug!("[planboard.session] {:?} dispatched", kind);
        self.spawn_tail(kind.is_blocking(), async move {
            Settled::Mutation {
                kind,
                result: call.await,
            }
        });
    }

    fn spawn_tail<F>(&mut self, blocking: bool, tail: F)
    where
        F: Future<Output = Settled> + Send + 'static,
    {
        let Some(queue) = self.queue.upgrade() else {
            // Every handle is gone: run the call, nobody is left to see the result.
            tokio::spawn(async move {
                let _ = tail.await;
            });
            return;
        };
        self.in_flight += 1;
        if blocking {
            self.blocking += 1;
            self.busy.send_replace(true);
        }
        tokio::spawn(async move {
            let settled = tail.await;
            let _ = queue.send(Msg::Settled(settled));
        });
    }

    fn settle(&mut self, settled: Settled) {
        match settled {
            Settled::Loaded { result, reply } => self.finish_load(result, reply),
            Settled::Mutation { kind, result } => {
                if kind.is_blocking() {
                    self.blocking = self.blocking.saturating_sub(1);
                    self.busy.send_replace(self.blocking > 0);
                }
                match result {
                    Ok(effect) => self.apply(kind, effect),
                    Err(e) => self.fail(kind, e),
                }
            }
        }
    }

    fn apply(&mut self, kind: MutationKind, effect: Effect) {
        let touches_cache = !matches!(effect, Effect::Applied);
        let outcome = match effect {
            Effect::Applied => Ok(()),
            Effect::AppendTask { section, task } => self.state.push_task(section, task),
            Effect::ReplaceTask(task) => {
                let id = task.id;
                let replaced = self.state.replace_task(task);
                self.sync_selected(id);
                replaced
            }
            Effect::RemoveTask(id) => {
                if self.selected.as_ref().is_some_and(|t| t.id == id) {
                    self.selected = None;
                }
                self.state.remove_task(id).map(drop)
            }
            Effect::AppendSection { section, title } => self.state.push_column(section, title),
            Effect::RenameSection { section, title } => {
                if self.renaming == Some(section) {
                    self.renaming = None;
                }
                self.state.rename_column(section, title)
            }
            Effect::RemoveSection(id) => self.state.remove_column(id).map(|removed| {
                if self
                    .selected
                    .as_ref()
                    .is_some_and(|t| removed.task_ids.contains(&t.id))
                {
                    self.selected = None;
                }
            }),
        };
        if let Err(e) = outcome {
            // The cache moved on while the call was in flight.
            log::warn!(
                "[planboard.session] {:?} confirmed remotely but not applied locally: {}",
                kind,
                e
            );
        }
        if touches_cache {
            self.changed();
        }
        if let Some(message) = kind.success_message() {
            self.notify(Notice::success(message));
        }
    }

    fn fail(&mut self, kind: MutationKind, error: StoreError) {
        log::warn!("[planboard.session] {:?} failed: {}", kind, error);
        if kind == MutationKind::RenameSection {
            self.renaming = None;
        }
        match kind.policy() {
            FailurePolicy::Reload => {
                self.notify(Notice::error(kind.failure_message()));
                self.start_load(None);
            }
            FailurePolicy::Notify => self.notify(Notice::error(kind.failure_message())),
            FailurePolicy::LogOnly => {}
        }
    }

    fn finish_load(&mut self, result: Result<BoardState, StoreError>, reply: Option<Reply<()>>) {
        let outcome = match result {
            Ok(state) => {
                log::info!(
                    "[planboard.session] board loaded: {} columns",
                    state.column_count()
                );
                self.state = state;
                if let Some(id) = self.selected.as_ref().map(|t| t.id) {
                    self.sync_selected(id);
                }
                if self
                    .renaming
                    .is_some_and(|section| self.state.column(section).is_none())
                {
                    self.renaming = None;
                }
                let vanished = match self.pending_delete {
                    Some(DeleteTarget::Task(id)) => self.state.task(id).is_none(),
                    Some(DeleteTarget::Section(id)) => self.state.column(id).is_none(),
                    None => false,
                };
                if vanished {
                    self.pending_delete = None;
                }
                self.changed();
                Ok(())
            }
            Err(e) => {
                log::error!("[planboard.session] board load failed: {}", e);
                self.notify(Notice::error(LOAD_FAILED));
                Err(SessionError::Store(e))
            }
        };
        if let Some(reply) = reply {
            let _ = reply.send(outcome);
        }
    }

    /// Refresh the detail view copy of `task`, closing it if the task is gone.
    fn sync_selected(&mut self, task: TaskId) {
        if self.selected.as_ref().is_some_and(|t| t.id == task) {
            self.selected = self.state.task(task).cloned();
        }
    }

    fn changed(&self) {
        let _ = self.events.send(BoardEvent::Changed);
    }

    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            log::warn!("[planboard.session] notice: {}", notice.message);
        } else {
            log::info!("[planboard.session] notice: {}", notice.message);
        }
        let _ = self.events.send(BoardEvent::Notice(notice));
    }
}

/// Columns, then every column's tasks, then every task's labels.
async fn fetch_board<S: BoardStore>(
    store: &S,
    titles: TerminalTitles,
) -> Result<BoardState, StoreError> {
    let columns = store.list_columns().await?;
    let listings = try_join_all(columns.iter().map(|c| store.list_tasks(c.id))).await?;
    let tasks_by_column: HashMap<u64, Vec<RemoteTask>> =
        columns.iter().map(|c| c.id).zip(listings).collect();

    let task_ids: Vec<u64> = tasks_by_column.values().flatten().map(|t| t.id).collect();
    let labels = try_join_all(task_ids.iter().map(|id| store.task_labels(*id))).await?;
    let labels_by_task = task_ids.into_iter().zip(labels).collect();

    Ok(BoardState::assemble(columns, tasks_by_column, labels_by_task, titles))
}

/// Cloneable front of a running `BoardSession`.
///
/// Mutating methods return once the local step is done; the remote call
/// continues in the background and reports through `subscribe()`. Use
/// `idle()` to wait for every outstanding call.
#[derive(Clone)]
pub struct BoardHandle {
    queue: mpsc::UnboundedSender<Msg>,
    events: broadcast::Sender<BoardEvent>,
    busy: watch::Receiver<bool>,
}

impl BoardHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.queue
            .send(Msg::Command(command(reply)))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    /// Rebuild the cache from the store. Resolves once the load has been
    /// applied; on failure the previous cache is kept.
    pub async fn load(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Load { reply }).await?
    }

    pub async fn snapshot(&self) -> Result<Board, SessionError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn drag(&self, event: DragEvent) -> Result<(), SessionError> {
        self.request(|reply| Command::Drag { event, reply }).await?
    }

    pub async fn drop_result(&self, raw: DropResult) -> Result<(), SessionError> {
        let event = DragEvent::try_from(raw)?;
        self.drag(event).await
    }

    pub async fn create_task(&self, section: SectionId, task: NewTask) -> Result<(), SessionError> {
        self.request(|reply| Command::CreateTask {
            section,
            task,
            reply,
        })
        .await?
    }

    pub async fn update_task(&self, task: TaskId, edit: TaskEdit) -> Result<(), SessionError> {
        self.request(|reply| Command::UpdateTask { task, edit, reply })
            .await?
    }

    pub async fn toggle_task(&self, task: TaskId) -> Result<(), SessionError> {
        self.request(|reply| Command::ToggleTask { task, reply }).await?
    }

    pub async fn request_task_delete(&self, task: TaskId) -> Result<(), SessionError> {
        self.request(|reply| Command::RequestDelete {
            target: DeleteTarget::Task(task),
            reply,
        })
        .await?
    }

    pub async fn request_section_delete(&self, section: SectionId) -> Result<(), SessionError> {
        self.request(|reply| Command::RequestDelete {
            target: DeleteTarget::Section(section),
            reply,
        })
        .await?
    }

    pub async fn confirm_delete(&self) -> Result<DeleteTarget, SessionError> {
        self.request(|reply| Command::ConfirmDelete { reply }).await?
    }

    pub async fn cancel_delete(&self) -> Result<Option<DeleteTarget>, SessionError> {
        self.request(|reply| Command::CancelDelete { reply }).await
    }

    pub async fn pending_delete(&self) -> Result<Option<DeleteTarget>, SessionError> {
        self.request(|reply| Command::PendingDelete { reply }).await
    }

    pub async fn open_task(&self, task: TaskId) -> Result<Task, SessionError> {
        self.request(|reply| Command::OpenTask { task, reply }).await?
    }

    pub async fn close_task(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::CloseTask { reply }).await
    }

    pub async fn selected_task(&self) -> Result<Option<Task>, SessionError> {
        self.request(|reply| Command::SelectedTask { reply }).await
    }

    pub async fn create_section(&self, name: SectionName) -> Result<(), SessionError> {
        self.request(|reply| Command::CreateSection { name, reply })
            .await?
    }

    /// Start editing a section title; returns the current title to seed
    /// the edit field.
    pub async fn begin_rename(&self, section: SectionId) -> Result<String, SessionError> {
        self.request(|reply| Command::BeginRename { section, reply })
            .await?
    }

    pub async fn cancel_rename(&self) -> Result<bool, SessionError> {
        self.request(|reply| Command::CancelRename { reply }).await
    }

    pub async fn rename_section(&self, title: Title) -> Result<(), SessionError> {
        self.request(|reply| Command::RenameSection { title, reply })
            .await?
    }

    /// Resolves once no remote call is in flight.
    pub async fn idle(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::Idle { reply }).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.events.subscribe()
    }

    /// Advisory "action in progress" flag.
    pub fn busy(&self) -> watch::Receiver<bool> {
        self.busy.clone()
    }
}
