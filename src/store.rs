// Todo store: in-memory source of truth with write-through persistence

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::filter::{FilterUpdate, TodoFilter, filter_todos};
use crate::ids::{IdSource, UuidV7};
use crate::models::{Priority, Subtask, Todo, TodoPatch};
use crate::notify::{NoticeKind, Notifier, TracingNotifier};
use crate::record::{self, Record};
use crate::stats::{self, Stats};
use crate::storage::Persistence;
use crate::transfer::{self, ImportMode};

/// Owns the ordered todo list and applies every mutation to it.
///
/// Each mutation runs to completion, bumps the generation counter and then
/// rewrites the whole slot. Expected conditions (blank text, unknown ids, bad
/// imports) are never errors: they are no-ops reported through return values
/// and the notifier.
pub struct TodoStore {
    todos: Vec<Todo>,
    filters: TodoFilter,
    persistence: Persistence,
    ids: Box<dyn IdSource>,
    clock: Box<dyn Clock>,
    notifier: Box<dyn Notifier>,
    import_mode: ImportMode,
    generation: u64,
}

impl TodoStore {
    /// Build a store over `persistence`, loading whatever it holds
    pub fn new(mut persistence: Persistence) -> Self {
        let todos = persistence.load();
        debug!(slot = persistence.key(), count = todos.len(), "Opened todo store");
        Self {
            todos,
            filters: TodoFilter::default(),
            persistence,
            ids: Box::new(UuidV7),
            clock: Box::new(SystemClock),
            notifier: Box::new(TracingNotifier),
            import_mode: ImportMode::default(),
            generation: 0,
        }
    }

    /// Open the backend described by `config` and load the store from it
    pub fn open(config: &Config) -> Result<Self> {
        let persistence = config
            .open_persistence()
            .with_context(|| format!("Failed to open todo storage in {:?}", config.data_dir))?;
        Ok(Self::new(persistence).with_import_mode(config.import_mode))
    }

    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    pub fn with_import_mode(mut self, mode: ImportMode) -> Self {
        self.import_mode = mode;
        self
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// All todos, unfiltered, in insertion order
    pub fn todos(&self) -> &[Todo] {
        &self.todos
    }

    pub fn get(&self, id: &str) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Counter bumped by every change to the store
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn filters(&self) -> &TodoFilter {
        &self.filters
    }

    /// Merge a partial update into the current filter
    pub fn set_filters(&mut self, update: FilterUpdate) {
        self.filters.apply(update);
    }

    pub fn reset_filters(&mut self) {
        self.filters = TodoFilter::default();
    }

    /// Todos passing the current filter
    pub fn visible_todos(&self) -> Vec<&Todo> {
        filter_todos(&self.todos, &self.filters)
    }

    /// Counts over the unfiltered store
    pub fn stats(&self) -> Stats {
        Stats::compute(&self.todos)
    }

    /// Distinct categories across all todos, sorted
    pub fn categories(&self) -> Vec<String> {
        stats::categories(&self.todos)
    }

    // ========================================================================
    // Todo mutations
    // ========================================================================

    /// Append a new pending todo. Returns its id, or `None` if `text` is blank.
    pub fn add_todo(
        &mut self,
        text: &str,
        priority: Priority,
        category: Option<&str>,
        due_date: Option<&str>,
    ) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            debug!("add_todo: rejecting blank text");
            return None;
        }

        let id = self.fresh_todo_id();
        let now = self.clock.now();
        let todo = Todo::new(id.clone(), text.to_string(), priority, category, due_date, &now);
        self.todos.push(todo);
        self.commit();

        info!(id = %id, "Added todo");
        Some(id)
    }

    /// Merge `patch` into the todo with `id`. Returns false if no todo matched.
    pub fn update_todo(&mut self, id: &str, patch: TodoPatch) -> bool {
        let now = self.clock.now();
        let Some(todo) = record::find_mut(&mut self.todos, id) else {
            debug!(id, "update_todo: no such todo");
            return false;
        };
        todo.apply(patch, &now);
        self.commit();
        true
    }

    /// Flip the completion flag of a todo
    pub fn toggle_todo(&mut self, id: &str) -> bool {
        match self.get(id).map(|t| t.completed) {
            Some(completed) => self.update_todo(id, TodoPatch::completion(!completed)),
            None => {
                debug!(id, "toggle_todo: no such todo");
                false
            }
        }
    }

    /// Remove a todo. Returns false if it did not exist.
    pub fn delete_todo(&mut self, id: &str) -> bool {
        let before = self.todos.len();
        self.todos.retain(|t| t.id != id);
        if self.todos.len() == before {
            debug!(id, "delete_todo: no such todo");
            return false;
        }
        self.commit();
        info!(id, "Deleted todo");
        true
    }

    // ========================================================================
    // Subtask mutations
    // ========================================================================

    /// Append a subtask to a todo. Returns the subtask id.
    pub fn add_subtask(&mut self, todo_id: &str, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            debug!(todo_id, "add_subtask: rejecting blank text");
            return None;
        }

        let now = self.clock.now();
        let ids = &self.ids;
        let Some(todo) = record::find_mut(&mut self.todos, todo_id) else {
            debug!(todo_id, "add_subtask: no such todo");
            return None;
        };

        let mut subtask_id = ids.next_id();
        while record::contains_id(&todo.subtasks, &subtask_id) {
            subtask_id = ids.next_id();
        }
        todo.subtasks.push(Subtask::new(subtask_id.clone(), text.to_string(), &now));
        todo.touch(&now);
        self.commit();

        debug!(todo_id, subtask_id = %subtask_id, "Added subtask");
        Some(subtask_id)
    }

    /// Flip a subtask's completion flag. The parent's own flag is untouched.
    pub fn toggle_subtask(&mut self, todo_id: &str, subtask_id: &str) -> bool {
        let now = self.clock.now();
        let Some(todo) = record::find_mut(&mut self.todos, todo_id) else {
            debug!(todo_id, "toggle_subtask: no such todo");
            return false;
        };
        let Some(subtask) = record::find_mut(&mut todo.subtasks, subtask_id) else {
            debug!(todo_id, subtask_id, "toggle_subtask: no such subtask");
            return false;
        };
        subtask.completed = !subtask.completed;
        subtask.touch(&now);
        todo.touch(&now);
        self.commit();
        true
    }

    pub fn delete_subtask(&mut self, todo_id: &str, subtask_id: &str) -> bool {
        let now = self.clock.now();
        let Some(todo) = record::find_mut(&mut self.todos, todo_id) else {
            debug!(todo_id, "delete_subtask: no such todo");
            return false;
        };
        let before = todo.subtasks.len();
        todo.subtasks.retain(|s| s.id != subtask_id);
        if todo.subtasks.len() == before {
            debug!(todo_id, subtask_id, "delete_subtask: no such subtask");
            return false;
        }
        todo.touch(&now);
        self.commit();
        true
    }

    // ========================================================================
    // Bulk actions
    // ========================================================================

    /// Mark every todo completed
    pub fn complete_all_todos(&mut self) {
        let now = self.clock.now();
        for todo in &mut self.todos {
            todo.completed = true;
            todo.touch(&now);
        }
        self.commit();
        info!(count = self.todos.len(), "Completed all todos");
        self.notifier.notify(NoticeKind::Success, "All todos marked as completed!");
    }

    /// Drop every completed todo. Returns how many were removed.
    pub fn clear_completed_todos(&mut self) -> usize {
        let before = self.todos.len();
        self.todos.retain(|t| !t.completed);
        let removed = before - self.todos.len();
        self.commit();
        info!(removed, "Cleared completed todos");
        self.notifier.notify(NoticeKind::Success, "Completed todos cleared!");
        removed
    }

    /// Categories are derived from todos, so this only normalizes the name.
    ///
    /// Returns the trimmed category, or `None` when blank. The category shows
    /// up in [`TodoStore::categories`] once a todo uses it.
    pub fn add_category(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        debug!(category = name, "New category");
        Some(name.to_string())
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    /// The unfiltered store as a pretty-printed JSON array
    pub fn export_document(&self) -> Option<String> {
        match transfer::export_document(&self.todos) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(error = ?e, "Failed to build export document");
                None
            }
        }
    }

    /// Write `todos.json` into `dir`. Returns the written path.
    pub fn export_todos(&self, dir: &Path) -> Option<PathBuf> {
        match transfer::write_export(dir, &self.todos) {
            Ok(path) => {
                info!(path = ?path, count = self.todos.len(), "Exported todos");
                self.notifier.notify(NoticeKind::Success, "Todos exported successfully!");
                Some(path)
            }
            Err(e) => {
                warn!(error = ?e, "Failed to export todos");
                self.notifier.notify(NoticeKind::Error, "Failed to export todos.");
                None
            }
        }
    }

    /// Replace the whole store with the todos in `document`.
    ///
    /// On any failure the store is left exactly as it was.
    pub fn import_todos(&mut self, document: &str) -> bool {
        match transfer::parse_document(document, self.import_mode) {
            Ok(todos) => {
                let count = todos.len();
                self.todos = todos;
                self.commit();
                info!(count, "Imported todos");
                self.notifier.notify(NoticeKind::Success, "Todos imported successfully!");
                true
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                warn!(error = %reason, "Rejected import");
                self.notifier.notify(
                    NoticeKind::Error,
                    &format!("Failed to import todos. Please check the file format. ({})", reason),
                );
                false
            }
        }
    }

    /// Read `path` and import its content
    pub fn import_file(&mut self, path: &Path) -> bool {
        match fs::read_to_string(path).with_context(|| format!("Failed to read import file {:?}", path)) {
            Ok(document) => self.import_todos(&document),
            Err(e) => {
                warn!(error = ?e, "Failed to read import file");
                self.notifier.notify(NoticeKind::Error, &format!("Failed to import todos: {:#}", e));
                false
            }
        }
    }

    /// Import only if nothing changed since `generation` was read.
    ///
    /// Guards against a slow import overwriting edits made while the document
    /// was being read.
    pub fn import_todos_if_unchanged(&mut self, document: &str, generation: u64) -> bool {
        if generation != self.generation {
            warn!(
                expected = generation,
                actual = self.generation,
                "Store changed during import, discarding"
            );
            self.notifier.notify(
                NoticeKind::Error,
                "Todos changed while the import was in progress; import discarded.",
            );
            return false;
        }
        self.import_todos(document)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn fresh_todo_id(&self) -> String {
        let mut id = self.ids.next_id();
        while record::contains_id(&self.todos, &id) {
            id = self.ids.next_id();
        }
        id
    }

    // Every mutation ends here: new generation, full rewrite of the slot
    fn commit(&mut self) {
        self.generation += 1;
        self.persistence.save(&self.todos);
    }
}
