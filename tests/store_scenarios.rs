// End-to-end behaviour of the todo store through its public API

use chrono::Duration;
use std::collections::HashSet;
use tempfile::TempDir;
use todostore::{
    CategoryFilter, FileSlots, FilterUpdate, ImportMode, ManualClock, MemorySlots, NoticeKind, Persistence, Priority,
    PriorityFilter, RecordingNotifier, SequentialIds, SqliteSlots, Stats, StatusFilter, TodoPatch, TodoStore, UuidV7,
};

fn memory_store() -> (TodoStore, ManualClock, RecordingNotifier) {
    let clock = ManualClock::epoch();
    let notifier = RecordingNotifier::new();
    let store = TodoStore::new(Persistence::with_default_slot(Box::new(MemorySlots::new())))
        .with_clock(clock.clone())
        .with_notifier(notifier.clone());
    (store, clock, notifier)
}

fn stats(total: usize, completed: usize, pending: usize, progress: u8) -> Stats {
    Stats {
        total,
        completed,
        pending,
        progress,
    }
}

#[test]
fn test_add_single_todo_to_empty_store() {
    let (mut store, _, _) = memory_store();
    store.add_todo("Buy milk", Priority::High, None, None).unwrap();

    assert_eq!(store.len(), 1);
    assert!(!store.todos()[0].completed);
    assert_eq!(store.stats(), stats(1, 0, 1, 0));
}

#[test]
fn test_complete_one_of_two() {
    let (mut store, _, _) = memory_store();
    let first = store.add_todo("first", Priority::Low, None, None).unwrap();
    store.add_todo("second", Priority::Low, None, None).unwrap();

    assert!(store.update_todo(&first, TodoPatch::completion(true)));
    assert_eq!(store.stats(), stats(2, 1, 1, 50));
}

#[test]
fn test_toggle_subtask_leaves_parent_pending() {
    let (mut store, clock, _) = memory_store();
    let id = store.add_todo("parent", Priority::Medium, None, None).unwrap();
    let sub = store.add_subtask(&id, "step 1").unwrap();
    let before = store.get(&id).unwrap().updated_at.clone();

    clock.advance(Duration::milliseconds(250));
    assert!(store.toggle_subtask(&id, &sub));

    let todo = store.get(&id).unwrap();
    assert!(todo.subtask(&sub).unwrap().completed);
    assert_ne!(todo.updated_at, before);
    assert!(!todo.completed);
}

#[test]
fn test_clear_completed_then_export() {
    let (mut store, _, _) = memory_store();
    let a = store.add_todo("a", Priority::Low, None, None).unwrap();
    let b = store.add_todo("b", Priority::Low, None, None).unwrap();
    let c = store.add_todo("c", Priority::Low, None, None).unwrap();
    store.update_todo(&a, TodoPatch::completion(true));
    store.update_todo(&c, TodoPatch::completion(true));

    assert_eq!(store.clear_completed_todos(), 2);
    assert_eq!(store.len(), 1);
    assert_eq!(store.todos()[0].id, b);

    let doc = store.export_document().unwrap();
    let (mut other, _, _) = memory_store();
    assert!(other.import_todos(&doc));
    assert_eq!(other.stats().total, 1);
}

#[test]
fn test_ids_unique_across_many_adds() {
    let (store, _, _) = memory_store();
    let mut store = store.with_ids(UuidV7);

    let mut todo_ids = HashSet::new();
    for i in 0..50 {
        let id = store.add_todo(&format!("todo {}", i), Priority::Low, None, None).unwrap();
        assert!(todo_ids.insert(id.clone()));
        let mut sub_ids = HashSet::new();
        for j in 0..5 {
            let sub = store.add_subtask(&id, &format!("step {}", j)).unwrap();
            assert!(sub_ids.insert(sub));
        }
    }
    assert_eq!(store.len(), 50);
}

#[test]
fn test_unknown_ids_leave_store_byte_identical() {
    let (mut store, clock, _) = memory_store();
    let id = store.add_todo("keep", Priority::High, Some("Work"), None).unwrap();
    store.add_subtask(&id, "child").unwrap();

    let snapshot = store.export_document().unwrap();
    let raw = store.persistence().raw();
    clock.advance(Duration::seconds(10));

    assert!(!store.update_todo("ghost", TodoPatch::completion(true)));
    assert!(!store.delete_todo("ghost"));
    assert!(!store.toggle_subtask("ghost", "ghost"));
    assert!(!store.toggle_subtask(&id, "ghost"));
    assert!(!store.delete_subtask("ghost", "ghost"));
    assert!(!store.delete_subtask(&id, "ghost"));

    assert_eq!(store.export_document().unwrap(), snapshot);
    assert_eq!(store.persistence().raw(), raw);
}

#[test]
fn test_timestamps_never_go_backwards() {
    let (mut store, clock, _) = memory_store();
    let id = store.add_todo("task", Priority::Low, None, None).unwrap();
    let sub = store.add_subtask(&id, "child").unwrap();

    clock.advance(Duration::seconds(30));
    store.toggle_subtask(&id, &sub);
    let after_forward = store.get(&id).unwrap().updated_at.clone();

    // Clock jumps back an hour
    clock.advance(Duration::hours(-1));
    store.update_todo(&id, TodoPatch::completion(true));
    store.toggle_subtask(&id, &sub);
    store.complete_all_todos();

    let todo = store.get(&id).unwrap();
    assert_eq!(todo.updated_at, after_forward);
    assert!(todo.updated_at >= todo.created_at);
    let subtask = todo.subtask(&sub).unwrap();
    assert!(subtask.updated_at >= subtask.created_at);
}

#[test]
fn test_export_import_round_trip() {
    let (mut store, clock, _) = memory_store();
    let a = store.add_todo("Plan trip", Priority::High, Some("Travel"), Some("2025-06-01")).unwrap();
    store.add_subtask(&a, "Book flights").unwrap();
    clock.advance(Duration::seconds(1));
    let b = store.add_todo("Pay rent", Priority::Medium, None, None).unwrap();
    store.update_todo(&b, TodoPatch::completion(true));

    let doc = store.export_document().unwrap();
    let (mut restored, _, _) = memory_store();
    assert!(restored.import_todos(&doc));
    assert_eq!(restored.todos(), store.todos());
    assert_eq!(restored.categories(), store.categories());
}

#[test]
fn test_bad_imports_leave_store_unchanged() {
    let (mut store, _, notifier) = memory_store();
    store.add_todo("precious", Priority::High, None, None).unwrap();
    let before = store.todos().to_vec();
    let raw = store.persistence().raw();

    for bad in ["not json", "{}", "null", "[{\"id\":1}]"] {
        notifier.clear();
        assert!(!store.import_todos(bad), "accepted {:?}", bad);
        assert_eq!(store.todos(), before.as_slice());
        assert_eq!(store.persistence().raw(), raw);
        assert_eq!(notifier.last().unwrap().0, NoticeKind::Error);
    }
}

#[test]
fn test_lenient_import_keeps_good_entries() {
    let (store, _, _) = memory_store();
    let mut store = store.with_import_mode(ImportMode::Lenient);
    let doc = r#"[
        {"id":"a","text":"good","completed":true,"priority":"high","createdAt":"2025-01-01T00:00:00.000Z","updatedAt":"2025-01-01T00:00:00.000Z"},
        {"id":"b","text":"bad","completed":"yes","priority":"high","createdAt":"2025-01-01T00:00:00.000Z","updatedAt":"2025-01-01T00:00:00.000Z"}
    ]"#;
    assert!(store.import_todos(doc));
    assert_eq!(store.len(), 1);
    assert_eq!(store.stats(), stats(1, 1, 0, 100));
}

#[test]
fn test_filtered_view_and_categories() {
    let (mut store, _, _) = memory_store();
    store.add_todo("Buy milk", Priority::High, Some("Groceries"), None);
    let report = store.add_todo("Write report", Priority::Medium, Some("Work"), None).unwrap();
    store.add_todo("Stretch", Priority::Low, None, None);
    store.toggle_todo(&report);

    store.set_filters(FilterUpdate {
        category: Some(CategoryFilter::Only("Work".to_string())),
        ..FilterUpdate::default()
    });
    assert_eq!(store.visible_todos().len(), 1);

    store.set_filters(FilterUpdate {
        category: Some(CategoryFilter::All),
        priority: Some(PriorityFilter::Only(Priority::High)),
        status: Some(StatusFilter::Pending),
        ..FilterUpdate::default()
    });
    let visible: Vec<_> = store.visible_todos().iter().map(|t| t.text.clone()).collect();
    assert_eq!(visible, vec!["Buy milk"]);

    store.set_filters(FilterUpdate {
        search: Some("GROC".to_string()),
        priority: Some(PriorityFilter::All),
        status: Some(StatusFilter::All),
        ..FilterUpdate::default()
    });
    assert_eq!(store.visible_todos().len(), 1);

    // Categories and stats ignore the filter
    assert_eq!(store.categories(), vec!["Groceries", "Work"]);
    assert_eq!(store.stats(), stats(3, 1, 2, 33));
}

#[test]
fn test_stale_import_is_rejected() {
    let (mut store, _, _) = memory_store();
    let doc = r#"[{"id":"x","text":"imported","completed":false,"priority":"low","createdAt":"2025-01-01T00:00:00.000Z","updatedAt":"2025-01-01T00:00:00.000Z"}]"#;

    let started_at = store.generation();
    store.add_todo("edited while reading", Priority::Low, None, None);

    assert!(!store.import_todos_if_unchanged(doc, started_at));
    assert_eq!(store.todos()[0].text, "edited while reading");

    // Plain import is last-write-wins
    assert!(store.import_todos(doc));
    assert_eq!(store.todos()[0].id, "x");
}

#[test]
fn test_state_survives_reopen_on_each_backend() {
    let temp = TempDir::new().unwrap();

    let open_file = || Persistence::with_default_slot(Box::new(FileSlots::open(temp.path().join("files")).unwrap()));
    let db_path = temp.path().join("todostore.db");
    let open_sqlite = || Persistence::with_default_slot(Box::new(SqliteSlots::open(&db_path).unwrap()));

    let openers: [&dyn Fn() -> Persistence; 2] = [&open_file, &open_sqlite];
    for open in openers {
        let id = {
            let mut store = TodoStore::new(open()).with_ids(SequentialIds::new("t"));
            let id = store.add_todo("survive", Priority::Medium, Some("Ops"), None).unwrap();
            store.add_subtask(&id, "check").unwrap();
            store.add_todo("gone", Priority::Low, None, None).unwrap();
            store.complete_all_todos();
            store.update_todo(&id, TodoPatch::completion(false));
            store.clear_completed_todos();
            id
        };

        let store = TodoStore::new(open());
        assert_eq!(store.len(), 1);
        let todo = store.get(&id).unwrap();
        assert_eq!(todo.text, "survive");
        assert_eq!(todo.subtasks.len(), 1);
        assert_eq!(store.categories(), vec!["Ops"]);
    }
}

#[test]
fn test_import_file_and_export_to_disk() {
    let temp = TempDir::new().unwrap();
    let (mut store, _, _) = memory_store();
    store.add_todo("on disk", Priority::Low, None, None).unwrap();

    let path = store.export_todos(temp.path()).unwrap();
    assert!(path.ends_with("todos.json"));

    let (mut other, _, notifier) = memory_store();
    assert!(other.import_file(&path));
    assert_eq!(other.todos(), store.todos());
    assert_eq!(
        notifier.last(),
        Some((NoticeKind::Success, "Todos imported successfully!".to_string()))
    );
}
