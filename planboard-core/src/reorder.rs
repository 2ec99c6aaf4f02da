/// Drag reconciliation: turn a finished drag gesture into a new ordering of
/// the cache plus the list of writes that persist it.
///
/// Column drags rewrite the `order` of every column (the store has no batch
/// reorder). Task drags persist only the moved task, after applying the
/// terminal-column completion rule.
use serde::{Deserialize, Serialize};

use crate::board::{BoardError, BoardState};
use crate::types::{SectionId, TaskId};

/// Container ID used for the column strip itself.
pub const BOARD_CONTAINER: &str = "board";

/// Raw drop result as reported by a drag-and-drop layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropResult {
    pub draggable_id: String,
    #[serde(rename = "type")]
    pub kind: DragKind,
    pub source: DropLocation,
    #[serde(default)]
    pub destination: Option<DropLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    Column,
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropLocation {
    pub droppable_id: String,
    pub index: usize,
}

/// A position inside a column's task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub section: SectionId,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragEvent {
    Column {
        section: SectionId,
        from: usize,
        to: Option<usize>,
    },
    Task {
        task: TaskId,
        from: Slot,
        to: Option<Slot>,
    },
}

impl DragEvent {
    /// Dropped outside any container, or back where it started.
    pub fn is_noop(&self) -> bool {
        match self {
            DragEvent::Column { from, to, .. } => to.is_none_or(|to| to == *from),
            DragEvent::Task { from, to, .. } => to.is_none_or(|to| to == *from),
        }
    }
}

impl TryFrom<DropResult> for DragEvent {
    type Error = BoardError;

    fn try_from(raw: DropResult) -> Result<Self, Self::Error> {
        let invalid = |what: String| BoardError::InvalidDrop(what);
        match raw.kind {
            DragKind::Column => {
                let section: SectionId = raw
                    .draggable_id
                    .parse()
                    .map_err(|_| invalid(format!("not a section id: {}", raw.draggable_id)))?;
                let check = |loc: &DropLocation| {
                    if loc.droppable_id == BOARD_CONTAINER {
                        Ok(loc.index)
                    } else {
                        Err(invalid(format!(
                            "columns can only be dropped on the board, not {}",
                            loc.droppable_id
                        )))
                    }
                };
                Ok(DragEvent::Column {
                    section,
                    from: check(&raw.source)?,
                    to: raw.destination.as_ref().map(check).transpose()?,
                })
            }
            DragKind::Task => {
                let task: TaskId = raw
                    .draggable_id
                    .parse()
                    .map_err(|_| invalid(format!("not a task id: {}", raw.draggable_id)))?;
                let slot = |loc: &DropLocation| {
                    loc.droppable_id
                        .parse::<SectionId>()
                        .map(|section| Slot {
                            section,
                            index: loc.index,
                        })
                        .map_err(|_| invalid(format!("not a section id: {}", loc.droppable_id)))
                };
                Ok(DragEvent::Task {
                    task,
                    from: slot(&raw.source)?,
                    to: raw.destination.as_ref().map(slot).transpose()?,
                })
            }
        }
    }
}

/// New `order` for one column after a column drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    pub section: SectionId,
    pub title: String,
    pub order: usize,
}

/// Full state of a moved task, as it must be written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlacement {
    pub task: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub section: SectionId,
    pub order: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPlan {
    Noop,
    Columns(Vec<ColumnOrder>),
    Task(TaskPlacement),
}

/// Move one element of `seq` from `from` to `to`, clamping `to` into range.
pub fn move_item<T>(seq: &mut Vec<T>, from: usize, to: usize) -> Option<usize> {
    if from >= seq.len() {
        return None;
    }
    let item = seq.remove(from);
    let to = to.min(seq.len());
    seq.insert(to, item);
    Some(to)
}

impl BoardState {
    /// Apply a drag to the cache and describe the writes that persist it.
    ///
    /// Nothing is mutated when the event is a no-op or when the dragged
    /// entity is not where the event says it started.
    pub fn plan_drag(&mut self, event: &DragEvent) -> Result<DragPlan, BoardError> {
        if event.is_noop() {
            return Ok(DragPlan::Noop);
        }
        match *event {
            DragEvent::Column { section, from, to } => {
                let to = to.unwrap_or(from);
                self.move_column(section, from, to)
            }
            DragEvent::Task { task, from, to } => match to {
                Some(to) => self.move_task(task, from, to).map(DragPlan::Task),
                None => Ok(DragPlan::Noop),
            },
        }
    }

    fn move_column(&mut self, section: SectionId, from: usize, to: usize) -> Result<DragPlan, BoardError> {
        let max = self.column_count().saturating_sub(1);
        match self.section_order().get(from) {
            None => return Err(BoardError::IndexOutOfRange { index: from, max }),
            Some(found) if *found != section => {
                return Err(BoardError::StaleDrag {
                    dragged: section.to_string(),
                })
            }
            Some(_) => {}
        }
        move_item(self.order_mut(), from, to);

        let plan = self
            .section_order()
            .iter()
            .enumerate()
            .filter_map(|(order, id)| {
                self.column(*id).map(|c| ColumnOrder {
                    section: *id,
                    title: c.title.clone(),
                    order,
                })
            })
            .collect();
        Ok(DragPlan::Columns(plan))
    }

    fn move_task(&mut self, task: TaskId, from: Slot, to: Slot) -> Result<TaskPlacement, BoardError> {
        let source = self.column_entry(from.section)?;
        match source.task_ids.get(from.index) {
            None => {
                return Err(BoardError::IndexOutOfRange {
                    index: from.index,
                    max: source.task_ids.len().saturating_sub(1),
                })
            }
            Some(found) if *found != task => {
                return Err(BoardError::StaleDrag {
                    dragged: task.to_string(),
                })
            }
            Some(_) => {}
        }
        let dest_kind = self.column_entry(to.section)?.kind;

        let order = if from.section == to.section {
            let entry = self.column_entry_mut(from.section)?;
            move_item(&mut entry.task_ids, from.index, to.index).unwrap_or(from.index)
        } else {
            let moved_id = self.column_entry_mut(from.section)?.task_ids.remove(from.index);
            let dest = self.column_entry_mut(to.section)?;
            let index = to.index.min(dest.task_ids.len());
            dest.task_ids.insert(index, moved_id);
            self.set_owner(moved_id, to.section);
            index
        };

        let moved = self.task_mut(task)?;
        moved.completed = dest_kind.is_terminal();

        Ok(TaskPlacement {
            task,
            title: moved.title.clone(),
            description: moved.description.clone(),
            completed: moved.completed,
            section: to.section,
            order,
        })
    }
}
