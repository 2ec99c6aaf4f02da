/// Configuration types shared between the core model and the client runtime.
use serde::{Deserialize, Serialize};

use crate::types::ColumnKind;

/// Column titles that mark a column as terminal.
///
/// Classification happens when a column is loaded, created or renamed; the
/// resulting [`ColumnKind`] is what the drag rule consults. Matching is on
/// the trimmed title, ASCII case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalTitles {
    #[serde(default = "default_done")]
    pub done: Vec<String>,
    #[serde(default = "default_cancelled")]
    pub cancelled: Vec<String>,
}

fn default_done() -> Vec<String> {
    vec!["Done".to_string()]
}

fn default_cancelled() -> Vec<String> {
    vec!["Cancelled".to_string()]
}

impl Default for TerminalTitles {
    fn default() -> Self {
        Self {
            done: default_done(),
            cancelled: default_cancelled(),
        }
    }
}

impl TerminalTitles {
    pub fn classify(&self, title: &str) -> ColumnKind {
        let title = title.trim();
        let matches = |names: &[String]| names.iter().any(|n| n.trim().eq_ignore_ascii_case(title));
        if matches(&self.done) {
            ColumnKind::Done
        } else if matches(&self.cancelled) {
            ColumnKind::Cancelled
        } else {
            ColumnKind::Normal
        }
    }
}
