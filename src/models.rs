// Data models for TodoStore

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::record::Record;

/// Priority level of a todo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority: {} (expected low, medium or high)", other)),
        }
    }
}

/// A task in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub created_at: String,
    pub updated_at: String,
}

/// Checklist item owned by a single todo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Todo {
    /// Build a fresh, pending todo with no subtasks.
    ///
    /// `text` must already be trimmed and non-empty. Blank category and due
    /// date values are stored as absent.
    pub fn new(
        id: String,
        text: String,
        priority: Priority,
        category: Option<&str>,
        due_date: Option<&str>,
        now: &str,
    ) -> Self {
        Self {
            id,
            text,
            completed: false,
            priority,
            category: normalize_optional(category),
            due_date: normalize_optional(due_date),
            subtasks: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Merge a patch into this todo and refresh `updated_at`
    pub fn apply(&mut self, patch: TodoPatch, now: &str) {
        if let Some(text) = patch.text {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                self.text = trimmed.to_string();
            }
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = normalize_optional(category.as_deref());
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = normalize_optional(due_date.as_deref());
        }
        if let Some(subtasks) = patch.subtasks {
            self.subtasks = dedup_subtasks(&self.id, subtasks);
        }
        self.touch(now);
    }

    pub fn subtask(&self, subtask_id: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == subtask_id)
    }

    /// Number of completed subtasks
    pub fn subtasks_done(&self) -> usize {
        self.subtasks.iter().filter(|s| s.completed).count()
    }
}

impl Subtask {
    pub fn new(id: String, text: String, now: &str) -> Self {
        Self {
            id,
            text,
            completed: false,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Partial update for a todo. `None` leaves a field untouched.
///
/// `category` and `due_date` are doubly optional: `Some(None)` clears the
/// value, `Some(Some(..))` sets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub category: Option<Option<String>>,
    pub due_date: Option<Option<String>>,
    pub subtasks: Option<Vec<Subtask>>,
}

impl TodoPatch {
    /// Patch that only sets the completion flag
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

// Subtask ids stay unique within their parent; later duplicates are dropped
fn dedup_subtasks(todo_id: &str, subtasks: Vec<Subtask>) -> Vec<Subtask> {
    let mut seen = HashSet::new();
    subtasks
        .into_iter()
        .filter(|s| {
            let fresh = seen.insert(s.id.clone());
            if !fresh {
                warn!(todo_id, subtask_id = %s.id, "Dropping duplicate subtask id from patch");
            }
            fresh
        })
        .collect()
}
