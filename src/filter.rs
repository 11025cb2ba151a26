// Filter criteria for the todo view

use std::fmt;
use std::str::FromStr;

use crate::models::{Priority, Todo};

/// Narrows which todos are shown. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    /// Case-insensitive substring matched against text or category
    pub search: String,
    pub priority: PriorityFilter,
    pub category: CategoryFilter,
    pub status: StatusFilter,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

/// Partial change to the current filter; `None` keeps the existing value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterUpdate {
    pub search: Option<String>,
    pub priority: Option<PriorityFilter>,
    pub category: Option<CategoryFilter>,
    pub status: Option<StatusFilter>,
}

impl TodoFilter {
    /// A todo passes only if every clause matches
    pub fn matches(&self, todo: &Todo) -> bool {
        self.matches_search(todo)
            && self.matches_priority(todo)
            && self.matches_category(todo)
            && self.matches_status(todo)
    }

    fn matches_search(&self, todo: &Todo) -> bool {
        if self.search.is_empty() {
            return true;
        }
        let needle = self.search.to_lowercase();
        todo.text.to_lowercase().contains(&needle)
            || todo
                .category
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&needle))
    }

    fn matches_priority(&self, todo: &Todo) -> bool {
        match self.priority {
            PriorityFilter::All => true,
            PriorityFilter::Only(p) => todo.priority == p,
        }
    }

    fn matches_category(&self, todo: &Todo) -> bool {
        match &self.category {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => todo.category.as_deref() == Some(c.as_str()),
        }
    }

    fn matches_status(&self, todo: &Todo) -> bool {
        match self.status {
            StatusFilter::All => true,
            StatusFilter::Completed => todo.completed,
            StatusFilter::Pending => !todo.completed,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Merge a partial update into this filter
    pub fn apply(&mut self, update: FilterUpdate) {
        if let Some(search) = update.search {
            self.search = search;
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(category) = update.category {
            self.category = category;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
    }
}

/// Todos passing `filter`, in store order
pub fn filter_todos<'a>(todos: &'a [Todo], filter: &TodoFilter) -> Vec<&'a Todo> {
    todos.iter().filter(|t| filter.matches(t)).collect()
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PriorityFilter::All);
        }
        s.parse::<Priority>().map(PriorityFilter::Only)
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => write!(f, "all"),
            PriorityFilter::Only(p) => write!(f, "{}", p),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(CategoryFilter::All),
            other => Ok(CategoryFilter::Only(other.to_string())),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => write!(f, "all"),
            CategoryFilter::Only(c) => write!(f, "{}", c),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" => Ok(StatusFilter::Pending),
            other => Err(format!("unknown status: {} (expected all, completed or pending)", other)),
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => write!(f, "all"),
            StatusFilter::Completed => write!(f, "completed"),
            StatusFilter::Pending => write!(f, "pending"),
        }
    }
}
