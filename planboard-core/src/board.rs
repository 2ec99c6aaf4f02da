/// Board State Cache.
///
/// Columns and tasks live in flat maps keyed by ID; each column keeps the
/// ordered list of its task IDs, and an owner index maps every task back to
/// its column. Mutations touch only the entries involved.
use std::collections::HashMap;

use crate::config::TerminalTitles;
use crate::types::{Board, Column, ColumnKind, Label, SectionId, Task, TaskId};
use crate::wire::{RemoteColumn, RemoteLabel, RemoteTask};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("Section not found: {0}")]
    SectionNotFound(SectionId),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Task {0} already exists on the board")]
    DuplicateTask(TaskId),

    #[error("Section {0} already exists on the board")]
    DuplicateSection(SectionId),

    #[error("Index {index} out of range (0-{max})")]
    IndexOutOfRange { index: usize, max: usize },

    #[error("Stale drag: {dragged} is not at the reported source position")]
    StaleDrag { dragged: String },

    #[error("Invalid drop: {0}")]
    InvalidDrop(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub id: SectionId,
    pub title: String,
    pub kind: ColumnKind,
    pub task_ids: Vec<TaskId>,
}

#[derive(Debug, Clone, Default)]
pub struct BoardState {
    columns: HashMap<SectionId, ColumnEntry>,
    order: Vec<SectionId>,
    tasks: HashMap<TaskId, Task>,
    owners: HashMap<TaskId, SectionId>,
    titles: TerminalTitles,
}

impl BoardState {
    pub fn new(titles: TerminalTitles) -> Self {
        Self {
            titles,
            ..Default::default()
        }
    }

    /// Build the cache from what the remote store returned.
    ///
    /// Columns are sorted by their remote `order`, tasks likewise within each
    /// column. Tasks listed under a column they do not belong to, or listed
    /// twice, are dropped with a warning so every task keeps a single owner.
    pub fn assemble(
        mut columns: Vec<RemoteColumn>,
        mut tasks_by_column: HashMap<u64, Vec<RemoteTask>>,
        mut labels_by_task: HashMap<u64, Vec<RemoteLabel>>,
        titles: TerminalTitles,
    ) -> Self {
        columns.sort_by_key(|c| c.order);
        let mut state = Self::new(titles);

        for remote in columns {
            let section = SectionId(remote.id);
            if state.columns.contains_key(&section) {
                log::warn!("[planboard.board] duplicate column {} in listing, skipped", section);
                continue;
            }
            let kind = state.titles.classify(&remote.title);
            state.order.push(section);
            state.columns.insert(
                section,
                ColumnEntry {
                    id: section,
                    title: remote.title,
                    kind,
                    task_ids: Vec::new(),
                },
            );

            let mut tasks = tasks_by_column.remove(&remote.id).unwrap_or_default();
            tasks.sort_by_key(|t| t.order);
            for task in tasks {
                let task_id = TaskId(task.id);
                if task.column_id != remote.id || state.owners.contains_key(&task_id) {
                    log::warn!(
                        "[planboard.board] task {} listed under {} but owned by section-{}, skipped",
                        task_id,
                        section,
                        task.column_id
                    );
                    continue;
                }
                let labels = labels_by_task
                    .remove(&task.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Label::from)
                    .collect();
                state.insert_task_entry(
                    section,
                    Task {
                        id: task_id,
                        title: task.title,
                        description: task.description.filter(|d| !d.trim().is_empty()),
                        completed: task.completed,
                        labels,
                    },
                );
            }
        }
        state
    }

    pub fn terminal_titles(&self) -> &TerminalTitles {
        &self.titles
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.order.len()
    }

    pub fn section_order(&self) -> &[SectionId] {
        &self.order
    }

    pub fn column(&self, id: SectionId) -> Option<&ColumnEntry> {
        self.columns.get(&id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn owner_of(&self, id: TaskId) -> Option<SectionId> {
        self.owners.get(&id).copied()
    }

    pub fn task_count(&self, section: SectionId) -> Result<usize, BoardError> {
        self.column_entry(section).map(|c| c.task_ids.len())
    }

    /// Position of a section in the column sequence.
    pub fn section_index(&self, section: SectionId) -> Option<usize> {
        self.order.iter().position(|s| *s == section)
    }

    /// Position of a task within its owning column.
    pub fn task_index(&self, task: TaskId) -> Option<(SectionId, usize)> {
        let owner = self.owner_of(task)?;
        let index = self.columns.get(&owner)?.task_ids.iter().position(|t| *t == task)?;
        Some((owner, index))
    }

    /// Ordered copy of the board for rendering.
    pub fn snapshot(&self) -> Board {
        let columns = self
            .order
            .iter()
            .filter_map(|id| self.columns.get(id))
            .map(|entry| Column {
                id: entry.id,
                title: entry.title.clone(),
                kind: entry.kind,
                tasks: entry
                    .task_ids
                    .iter()
                    .filter_map(|t| self.tasks.get(t).cloned())
                    .collect(),
            })
            .collect();
        Board { columns }
    }

    pub fn push_column(&mut self, id: SectionId, title: String) -> Result<(), BoardError> {
        if self.columns.contains_key(&id) {
            return Err(BoardError::DuplicateSection(id));
        }
        let kind = self.titles.classify(&title);
        self.order.push(id);
        self.columns.insert(
            id,
            ColumnEntry {
                id,
                title,
                kind,
                task_ids: Vec::new(),
            },
        );
        Ok(())
    }

    /// Rename a column; its kind is re-derived from the new title.
    pub fn rename_column(&mut self, id: SectionId, title: String) -> Result<(), BoardError> {
        let kind = self.titles.classify(&title);
        let entry = self
            .columns
            .get_mut(&id)
            .ok_or(BoardError::SectionNotFound(id))?;
        entry.title = title;
        entry.kind = kind;
        Ok(())
    }

    /// Remove a column together with every task it owns.
    pub fn remove_column(&mut self, id: SectionId) -> Result<ColumnEntry, BoardError> {
        let entry = self
            .columns
            .remove(&id)
            .ok_or(BoardError::SectionNotFound(id))?;
        self.order.retain(|s| *s != id);
        for task in &entry.task_ids {
            self.tasks.remove(task);
            self.owners.remove(task);
        }
        Ok(entry)
    }

    /// Append a task at the end of a column.
    pub fn push_task(&mut self, section: SectionId, task: Task) -> Result<(), BoardError> {
        if self.tasks.contains_key(&task.id) {
            return Err(BoardError::DuplicateTask(task.id));
        }
        self.column_entry(section)?;
        self.insert_task_entry(section, task);
        Ok(())
    }

    /// Replace a task's fields in place, keeping its position and owner.
    pub fn replace_task(&mut self, task: Task) -> Result<(), BoardError> {
        let slot = self
            .tasks
            .get_mut(&task.id)
            .ok_or(BoardError::TaskNotFound(task.id))?;
        *slot = task;
        Ok(())
    }

    pub fn set_completed(&mut self, id: TaskId, completed: bool) -> Result<&Task, BoardError> {
        let task = self.tasks.get_mut(&id).ok_or(BoardError::TaskNotFound(id))?;
        task.completed = completed;
        Ok(task)
    }

    pub fn remove_task(&mut self, id: TaskId) -> Result<Task, BoardError> {
        let task = self.tasks.remove(&id).ok_or(BoardError::TaskNotFound(id))?;
        if let Some(owner) = self.owners.remove(&id) {
            if let Some(entry) = self.columns.get_mut(&owner) {
                entry.task_ids.retain(|t| *t != id);
            }
        }
        Ok(task)
    }

    /// Verify that every task has exactly one owner and appears exactly once
    /// across all column task lists. Returns a description of the first
    /// violation found.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.order.len() != self.columns.len() {
            return Err(format!(
                "column order lists {} sections but {} are stored",
                self.order.len(),
                self.columns.len()
            ));
        }
        let mut seen: HashMap<TaskId, SectionId> = HashMap::new();
        for section in &self.order {
            let entry = self
                .columns
                .get(section)
                .ok_or_else(|| format!("{} is ordered but not stored", section))?;
            for task in &entry.task_ids {
                if let Some(previous) = seen.insert(*task, *section) {
                    return Err(format!("{} appears in both {} and {}", task, previous, section));
                }
                if self.owners.get(task) != Some(section) {
                    return Err(format!("{} listed in {} but owner index disagrees", task, section));
                }
                if !self.tasks.contains_key(task) {
                    return Err(format!("{} listed in {} but not stored", task, section));
                }
            }
        }
        if seen.len() != self.tasks.len() {
            return Err(format!(
                "{} tasks stored but {} reachable from columns",
                self.tasks.len(),
                seen.len()
            ));
        }
        Ok(())
    }

    pub(crate) fn column_entry(&self, id: SectionId) -> Result<&ColumnEntry, BoardError> {
        self.columns.get(&id).ok_or(BoardError::SectionNotFound(id))
    }

    pub(crate) fn column_entry_mut(&mut self, id: SectionId) -> Result<&mut ColumnEntry, BoardError> {
        self.columns
            .get_mut(&id)
            .ok_or(BoardError::SectionNotFound(id))
    }

    pub(crate) fn order_mut(&mut self) -> &mut Vec<SectionId> {
        &mut self.order
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, BoardError> {
        self.tasks.get_mut(&id).ok_or(BoardError::TaskNotFound(id))
    }

    pub(crate) fn set_owner(&mut self, task: TaskId, section: SectionId) {
        self.owners.insert(task, section);
    }

    fn insert_task_entry(&mut self, section: SectionId, task: Task) {
        let id = task.id;
        if let Some(entry) = self.columns.get_mut(&section) {
            entry.task_ids.push(id);
        }
        self.owners.insert(id, section);
        self.tasks.insert(id, task);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn remote_column(id: u64, title: &str, order: i64) -> RemoteColumn {
        RemoteColumn {
            id,
            title: title.to_string(),
            order,
            created_at: None,
            updated_at: None,
        }
    }

    pub(crate) fn remote_task(id: u64, column_id: u64, order: i64, completed: bool) -> RemoteTask {
        RemoteTask {
            id,
            title: format!("Task {}", id),
            description: None,
            completed,
            order,
            column_id,
            created_at: None,
            updated_at: None,
        }
    }

    /// Columns given as (id, title, [task ids]); tasks in listed order.
    pub(crate) fn board_with(layout: &[(u64, &str, &[u64])]) -> BoardState {
        let columns = layout
            .iter()
            .enumerate()
            .map(|(i, (id, title, _))| remote_column(*id, title, i as i64))
            .collect();
        let tasks = layout
            .iter()
            .map(|(id, _, tasks)| {
                let listed = tasks
                    .iter()
                    .enumerate()
                    .map(|(i, t)| remote_task(*t, *id, i as i64, false))
                    .collect();
                (*id, listed)
            })
            .collect();
        BoardState::assemble(columns, tasks, HashMap::new(), TerminalTitles::default())
    }

    pub(crate) fn task_ids(state: &BoardState, section: u64) -> Vec<u64> {
        state
            .column(SectionId(section))
            .unwrap()
            .task_ids
            .iter()
            .map(|t| t.0)
            .collect()
    }

    #[test]
    fn test_assemble_sorts_by_remote_order() {
        let columns = vec![
            remote_column(1, "Done", 3),
            remote_column(2, "To Do", 1),
            remote_column(3, "Doing", 2),
        ];
        let mut tasks = HashMap::new();
        tasks.insert(2, vec![remote_task(11, 2, 5, false), remote_task(10, 2, 0, false)]);
        let mut labels = HashMap::new();
        labels.insert(
            10,
            vec![RemoteLabel {
                id: 77,
                text: "Bug".to_string(),
                color: "#F44336".to_string(),
            }],
        );

        let state = BoardState::assemble(columns, tasks, labels, TerminalTitles::default());
        let board = state.snapshot();
        let titles: Vec<&str> = board.columns.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["To Do", "Doing", "Done"]);
        assert_eq!(task_ids(&state, 2), vec![10, 11]);
        assert_eq!(board.columns[0].tasks[0].labels[0].id, "77");
        assert_eq!(board.columns[2].kind, ColumnKind::Done);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_assemble_drops_misfiled_and_duplicate_tasks() {
        let columns = vec![remote_column(1, "A", 0), remote_column(2, "B", 1)];
        let mut tasks = HashMap::new();
        tasks.insert(1, vec![remote_task(5, 1, 0, false), remote_task(6, 2, 1, false)]);
        tasks.insert(2, vec![remote_task(5, 2, 0, false)]);

        let state = BoardState::assemble(columns, tasks, HashMap::new(), TerminalTitles::default());
        assert_eq!(task_ids(&state, 1), vec![5]);
        assert!(task_ids(&state, 2).is_empty());
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_column_drops_its_tasks() {
        let mut state = board_with(&[(1, "A", &[10, 11]), (2, "B", &[12])]);
        let removed = state.remove_column(SectionId(1)).unwrap();
        assert_eq!(removed.task_ids.len(), 2);
        assert!(state.task(TaskId(10)).is_none());
        assert!(state.owner_of(TaskId(11)).is_none());
        assert_eq!(state.section_order(), &[SectionId(2)]);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_push_task_rejects_duplicates_and_unknown_sections() {
        let mut state = board_with(&[(1, "A", &[10])]);
        let task = state.task(TaskId(10)).unwrap().clone();
        assert_eq!(
            state.push_task(SectionId(1), task),
            Err(BoardError::DuplicateTask(TaskId(10)))
        );
        let fresh = Task {
            id: TaskId(99),
            title: "new".to_string(),
            description: None,
            completed: false,
            labels: Vec::new(),
        };
        assert_eq!(
            state.push_task(SectionId(5), fresh),
            Err(BoardError::SectionNotFound(SectionId(5)))
        );
    }

    #[test]
    fn test_rename_reclassifies_kind() {
        let mut state = board_with(&[(1, "Doing", &[])]);
        state.rename_column(SectionId(1), "Cancelled".to_string()).unwrap();
        assert_eq!(state.column(SectionId(1)).unwrap().kind, ColumnKind::Cancelled);
        state.rename_column(SectionId(1), "Parked".to_string()).unwrap();
        assert_eq!(state.column(SectionId(1)).unwrap().kind, ColumnKind::Normal);
    }

    #[test]
    fn test_remove_task_updates_owner_list() {
        let mut state = board_with(&[(1, "A", &[10, 11, 12])]);
        state.remove_task(TaskId(11)).unwrap();
        assert_eq!(task_ids(&state, 1), vec![10, 12]);
        assert_eq!(state.task_index(TaskId(12)), Some((SectionId(1), 1)));
        state.check_invariants().unwrap();
    }
}
