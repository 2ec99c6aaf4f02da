use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

/// Client-side identifier of a column. Wraps the remote integer ID and
/// renders as `section-<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub u64);

/// Client-side identifier of a task. Wraps the remote integer ID and
/// renders as `task-<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed identifier: {0:?}")]
pub struct ParseIdError(pub String);

macro_rules! prefixed_id {
    ($ty:ident, $prefix:literal) => {
        impl $ty {
            pub const PREFIX: &'static str = $prefix;

            /// The remote store's numeric ID.
            pub fn remote(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl FromStr for $ty {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .strip_prefix($prefix)
                    .and_then(|n| n.parse::<u64>().ok())
                    .map($ty)
                    .ok_or_else(|| ParseIdError(s.to_string()))
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(d)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

prefixed_id!(SectionId, "section-");
prefixed_id!(TaskId, "task-");

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid hex color pattern"));

/// A label attached to a task. Tasks hold their own copy of each label's
/// fields, there is no shared label entity on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub text: String,
    pub color: String,
}

impl Label {
    pub fn new(id: impl Into<String>, text: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            color: color.into(),
        }
    }

    pub fn is_valid_color(color: &str) -> bool {
        HEX_COLOR.is_match(color)
    }

    /// Text color readable on top of this label's background.
    /// Uses the W3C brightness formula; anything brighter than 150 gets black text.
    pub fn contrast_color(&self) -> &'static str {
        let Some((r, g, b)) = parse_rgb(&self.color) else {
            return "#000000";
        };
        let brightness = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
        if brightness > 150 {
            "#000000"
        } else {
            "#ffffff"
        }
    }
}

fn parse_rgb(color: &str) -> Option<(u8, u8, u8)> {
    if !Label::is_valid_color(color) {
        return None;
    }
    let hex = &color[1..];
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Labels offered when creating or editing a task.
pub const LABEL_CATALOG: &[(&str, &str, &str)] = &[
    ("backend", "Backend", "#FF9800"),
    ("frontend", "Frontend", "#03A9F4"),
    ("design", "Design", "#9C27B0"),
    ("bug", "Bug", "#F44336"),
    ("feature", "Feature", "#4CAF50"),
    ("documentation", "Docs", "#795548"),
];

pub fn label_catalog() -> Vec<Label> {
    LABEL_CATALOG
        .iter()
        .map(|(id, text, color)| Label::new(*id, *text, *color))
        .collect()
}

/// Look up a catalog label by its id or display text (case-insensitive).
pub fn catalog_label(key: &str) -> Option<Label> {
    let key = key.trim();
    LABEL_CATALOG
        .iter()
        .find(|(id, text, _)| id.eq_ignore_ascii_case(key) || text.eq_ignore_ascii_case(key))
        .map(|(id, text, color)| Label::new(*id, *text, *color))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<Label>,
}

/// What a column means for task completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Normal,
    Done,
    Cancelled,
}

impl ColumnKind {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ColumnKind::Normal)
    }
}

/// Snapshot of a column with its tasks in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: SectionId,
    pub title: String,
    #[serde(default)]
    pub kind: ColumnKind,
    pub tasks: Vec<Task>,
}

/// Ordered snapshot of the whole board, as handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    /// First column whose title matches, trimmed and ignoring ASCII case.
    pub fn column_by_title(&self, title: &str) -> Option<&Column> {
        let title = title.trim();
        self.columns
            .iter()
            .find(|c| c.title.trim().eq_ignore_ascii_case(title))
    }

    /// Find a task and the column that currently owns it.
    pub fn find_task(&self, id: TaskId) -> Option<(&Column, &Task)> {
        self.columns
            .iter()
            .find_map(|col| col.tasks.iter().find(|t| t.id == id).map(|t| (col, t)))
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}
