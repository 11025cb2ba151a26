// User-facing notifications (fire-and-forget)

use colored::Colorize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeKind::Success => write!(f, "success"),
            NoticeKind::Error => write!(f, "error"),
        }
    }
}

/// Sink for success/error messages meant for the user
pub trait Notifier {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Routes notices into the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => info!(%kind, text = message, "notice"),
            NoticeKind::Error => warn!(%kind, text = message, "notice"),
        }
    }
}

/// Prints notices to stderr in colour
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Success => eprintln!("{} {}", "✓".green().bold(), message),
            NoticeKind::Error => eprintln!("{} {}", "✗".red().bold(), message.red()),
        }
    }
}

/// Keeps every notice in memory. Clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Rc<RefCell<Vec<(NoticeKind, String)>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<(NoticeKind, String)> {
        self.notices.borrow().clone()
    }

    pub fn last(&self) -> Option<(NoticeKind, String)> {
        self.notices.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.notices.borrow_mut().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        self.notices.borrow_mut().push((kind, message.to_string()));
    }
}
