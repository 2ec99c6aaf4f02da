/// Validated input for mutation operations.
///
/// Operations accept these types rather than raw strings, so an empty task
/// title or a too-short section name is stopped at the interaction boundary
/// and never reaches the network layer.
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::types::Label;

/// Minimum trimmed length (in characters) for a new section name.
pub const MIN_SECTION_NAME_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Section name must be at least {min} characters (got {got})")]
    SectionNameTooShort { min: usize, got: usize },
}

/// A non-empty, trimmed title. Used for tasks and for section renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Title(String);

impl Title {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name for a section being created: trimmed and at least
/// [`MIN_SECTION_NAME_CHARS`] characters long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SectionName(String);

impl SectionName {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        let got = trimmed.chars().count();
        if got < MIN_SECTION_NAME_CHARS {
            return Err(ValidationError::SectionNameTooShort {
                min: MIN_SECTION_NAME_CHARS,
                got,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Whether a create-section control should be enabled for this input.
    pub fn is_acceptable(raw: &str) -> bool {
        Self::parse(raw).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize an optional description: blank text means "no description".
pub fn normalize_description(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// Drop repeated labels (same id), keeping the first occurrence of each.
pub fn dedupe_labels(labels: Vec<Label>) -> Vec<Label> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(label.id.clone()))
        .collect()
}
