// Identifier generation

use std::cell::Cell;
use uuid::Uuid;

/// Produces a new unique string on each call
pub trait IdSource {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDs (v7)
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7;

impl IdSource for UuidV7 {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Predictable ids (`prefix-1`, `prefix-2`, ...), handy in tests and fixtures
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: Cell<u64>,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Cell::new(1),
        }
    }
}

impl IdSource for SequentialIds {
    fn next_id(&self) -> String {
        let n = self.next.get();
        self.next.set(n + 1);
        format!("{}-{}", self.prefix, n)
    }
}
