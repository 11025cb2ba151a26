// Import and export of the whole todo list as a JSON document

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::Todo;
use crate::record::first_duplicate_id;

/// File name used for exports
pub const EXPORT_FILE_NAME: &str = "todos.json";

/// How strictly an import document is validated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Any invalid entry rejects the whole document
    #[default]
    Strict,
    /// Invalid entries are skipped, the rest are kept
    Lenient,
}

/// Pretty-printed JSON array of `todos`
pub fn export_document(todos: &[Todo]) -> Result<String> {
    serde_json::to_string_pretty(todos).context("Failed to serialize todos for export")
}

/// Write the export document as `todos.json` inside `dir`
pub fn write_export(dir: &Path, todos: &[Todo]) -> Result<PathBuf> {
    let document = export_document(todos)?;
    fs::create_dir_all(dir).context("Failed to create export directory")?;
    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, document).with_context(|| format!("Failed to write export file {:?}", path))?;
    debug!(path = ?path, count = todos.len(), "Wrote export");
    Ok(path)
}

/// Parse an import document into todos.
///
/// The top-level value must be a JSON array. Each element must deserialize as
/// a [`Todo`] with non-blank text, todo ids must be unique, and subtask ids
/// must be unique within their parent. In [`ImportMode::Strict`] the first
/// violation fails the whole document; in [`ImportMode::Lenient`] offending
/// entries are dropped with a warning.
pub fn parse_document(text: &str, mode: ImportMode) -> Result<Vec<Todo>> {
    let value: Value = serde_json::from_str(text).context("Document is not valid JSON")?;
    let Value::Array(items) = value else {
        return Err(eyre!("Invalid file format: top-level value is not an array"));
    };

    let mut todos = Vec::with_capacity(items.len());
    let mut seen_ids = HashSet::new();

    for (index, item) in items.into_iter().enumerate() {
        let checked = serde_json::from_value::<Todo>(item)
            .with_context(|| format!("Entry {} is not a valid todo", index))
            .and_then(|todo| validate_todo(&todo).map(|_| todo))
            .and_then(|todo| {
                if seen_ids.insert(todo.id.clone()) {
                    Ok(todo)
                } else {
                    Err(eyre!("Entry {} repeats todo id {}", index, todo.id))
                }
            });

        match (checked, mode) {
            (Ok(todo), _) => todos.push(todo),
            (Err(e), ImportMode::Strict) => return Err(e),
            (Err(e), ImportMode::Lenient) => {
                warn!(index, error = %e, "Skipping invalid todo entry");
            }
        }
    }

    Ok(todos)
}

fn validate_todo(todo: &Todo) -> Result<()> {
    if todo.id.trim().is_empty() {
        return Err(eyre!("Todo id cannot be empty"));
    }
    if todo.text.trim().is_empty() {
        return Err(eyre!("Todo {} has empty text", todo.id));
    }
    for subtask in &todo.subtasks {
        if subtask.id.trim().is_empty() {
            return Err(eyre!("Todo {} has a subtask with an empty id", todo.id));
        }
        if subtask.text.trim().is_empty() {
            return Err(eyre!("Subtask {} of todo {} has empty text", subtask.id, todo.id));
        }
    }
    if let Some(dup) = first_duplicate_id(&todo.subtasks) {
        return Err(eyre!("Todo {} repeats subtask id {}", todo.id, dup));
    }
    Ok(())
}
