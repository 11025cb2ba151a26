// Identity and timestamp behaviour shared by todos and subtasks

use std::collections::HashSet;

use crate::clock;
use crate::models::{Subtask, Todo};

/// Core trait for entities the store addresses by id
pub trait Record {
    /// Unique identifier for this record
    fn id(&self) -> &str;

    /// Creation timestamp (ISO 8601)
    fn created_at(&self) -> &str;

    /// Last modification timestamp (ISO 8601)
    fn updated_at(&self) -> &str;

    fn set_updated_at(&mut self, ts: String);

    /// Human-readable kind, used in log fields
    fn kind() -> &'static str
    where
        Self: Sized;

    /// Move `updated_at` forward to `now`.
    ///
    /// Never rolls back: if `now` is earlier than the stored value (clock
    /// skew), the stored value is kept.
    fn touch(&mut self, now: &str) {
        let floor = clock::later_of(self.created_at(), self.updated_at());
        let next = clock::later_of(&floor, now);
        self.set_updated_at(next);
    }
}

impl Record for Todo {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn set_updated_at(&mut self, ts: String) {
        self.updated_at = ts;
    }

    fn kind() -> &'static str {
        "todo"
    }
}

impl Record for Subtask {
    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> &str {
        &self.created_at
    }

    fn updated_at(&self) -> &str {
        &self.updated_at
    }

    fn set_updated_at(&mut self, ts: String) {
        self.updated_at = ts;
    }

    fn kind() -> &'static str {
        "subtask"
    }
}

/// Find a record by id
pub fn find_mut<'a, R: Record>(records: &'a mut [R], id: &str) -> Option<&'a mut R> {
    records.iter_mut().find(|r| r.id() == id)
}

pub fn contains_id<R: Record>(records: &[R], id: &str) -> bool {
    records.iter().any(|r| r.id() == id)
}

/// First id that appears more than once, if any
pub fn first_duplicate_id<R: Record>(records: &[R]) -> Option<&str> {
    let mut seen = HashSet::new();
    records.iter().map(|r| r.id()).find(|id| !seen.insert(*id))
}
