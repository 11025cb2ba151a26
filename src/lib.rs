// TodoStore - Local todo list with filtering, stats and JSON import/export

pub mod clock;
pub mod config;
pub mod filter;
pub mod ids;
pub mod models;
pub mod notify;
pub mod record;
pub mod stats;
pub mod storage;
pub mod store;
pub mod transfer;

// Re-export main types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendKind, Config};
pub use filter::{CategoryFilter, FilterUpdate, PriorityFilter, StatusFilter, TodoFilter, filter_todos};
pub use ids::{IdSource, SequentialIds, UuidV7};
pub use models::{Priority, Subtask, Todo, TodoPatch};
pub use notify::{ConsoleNotifier, NoticeKind, Notifier, RecordingNotifier, TracingNotifier};
pub use record::Record;
pub use stats::Stats;
pub use storage::{FileSlots, MemorySlots, Persistence, SlotBackend, SqliteSlots};
pub use store::TodoStore;
pub use transfer::{EXPORT_FILE_NAME, ImportMode};
