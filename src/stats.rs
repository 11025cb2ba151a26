// Aggregates derived from the unfiltered store

use std::collections::BTreeSet;

use crate::models::Todo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    /// Percent complete, 0..=100
    pub progress: u8,
}

impl Stats {
    pub fn compute(todos: &[Todo]) -> Self {
        let total = todos.len();
        let completed = todos.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
            progress: progress_percent(completed, total),
        }
    }
}

// round(100 * completed / total), halves rounded up
fn progress_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (completed * 200 + total) / (total * 2);
    pct.min(100) as u8
}

/// Distinct non-empty categories, sorted ascending
pub fn categories(todos: &[Todo]) -> Vec<String> {
    todos
        .iter()
        .filter_map(|t| t.category.as_deref())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
