/// Remote-backed mutations and what happens when their network call fails.
///
/// Keeping the table in one place makes the consistency policy auditable:
/// structural changes reload the whole board on failure, edits notify the
/// user, and low-stakes optimistic writes only log.
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    CreateTask,
    UpdateTask,
    ToggleTask,
    DeleteTask,
    MoveTask,
    CreateSection,
    RenameSection,
    DeleteSection,
    MoveSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Show an error notice and rebuild the cache from the remote store.
    Reload,
    /// Show an error notice; the cache was not touched.
    Notify,
    /// Log only. The optimistic local state stays and may drift until the
    /// next reload.
    LogOnly,
}

impl MutationKind {
    pub const ALL: [MutationKind; 9] = [
        MutationKind::CreateTask,
        MutationKind::UpdateTask,
        MutationKind::ToggleTask,
        MutationKind::DeleteTask,
        MutationKind::MoveTask,
        MutationKind::CreateSection,
        MutationKind::RenameSection,
        MutationKind::DeleteSection,
        MutationKind::MoveSection,
    ];

    pub fn policy(self) -> FailurePolicy {
        match self {
            MutationKind::CreateTask
            | MutationKind::DeleteTask
            | MutationKind::MoveTask
            | MutationKind::CreateSection
            | MutationKind::DeleteSection => FailurePolicy::Reload,
            MutationKind::UpdateTask | MutationKind::RenameSection => FailurePolicy::Notify,
            MutationKind::ToggleTask | MutationKind::MoveSection => FailurePolicy::LogOnly,
        }
    }

    /// Whether the advisory "action in progress" indicator is raised while
    /// this mutation is in flight.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            MutationKind::CreateTask
                | MutationKind::UpdateTask
                | MutationKind::DeleteTask
                | MutationKind::CreateSection
                | MutationKind::RenameSection
                | MutationKind::DeleteSection
        )
    }

    /// Feedback shown once the store confirms. Drags and toggles are silent.
    pub fn success_message(self) -> Option<&'static str> {
        match self {
            MutationKind::CreateTask => Some("Task created"),
            MutationKind::UpdateTask => Some("Task updated"),
            MutationKind::DeleteTask => Some("Task deleted"),
            MutationKind::CreateSection => Some("Section created"),
            MutationKind::RenameSection => Some("Section renamed"),
            MutationKind::DeleteSection => Some("Section deleted"),
            MutationKind::ToggleTask | MutationKind::MoveTask | MutationKind::MoveSection => None,
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            MutationKind::CreateTask => "Could not create the task",
            MutationKind::UpdateTask => "Could not update the task",
            MutationKind::ToggleTask => "Could not update task completion",
            MutationKind::DeleteTask => "Could not delete the task",
            MutationKind::MoveTask => "Could not move the task",
            MutationKind::CreateSection => "Could not create the section",
            MutationKind::RenameSection => "Could not rename the section",
            MutationKind::DeleteSection => "Could not delete the section",
            MutationKind::MoveSection => "Could not save the section order",
        }
    }
}
