use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, eyre};
use std::path::PathBuf;
use todostore::{
    CategoryFilter, Config, ConsoleNotifier, FilterUpdate, ImportMode, Priority, PriorityFilter, StatusFilter, Todo,
    TodoPatch, TodoStore,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - Local todo list with filtering, stats and JSON import/export")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Config file (default: $TODOSTORE_CONFIG, then the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a todo
    Add {
        text: String,

        #[arg(short, long, default_value = "medium")]
        priority: Priority,

        #[arg(short, long)]
        category: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
    },

    /// List todos matching the given filters
    List(ListArgs),

    /// Show one todo with its subtasks
    Show { id: String },

    /// Toggle a todo between pending and completed
    Toggle { id: String },

    /// Change fields of a todo
    Edit(EditArgs),

    /// Delete a todo
    Rm { id: String },

    /// Manage subtasks
    Sub {
        #[command(subcommand)]
        action: SubCommands,
    },

    /// Mark every todo completed
    CompleteAll,

    /// Delete every completed todo
    ClearCompleted,

    /// Show totals and progress
    Stats,

    /// List categories in use
    Categories,

    /// Write todos.json into a directory
    Export {
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Replace all todos with the content of a JSON file
    Import {
        file: PathBuf,

        /// Skip invalid entries instead of rejecting the file
        #[arg(long)]
        lenient: bool,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Text or category substring (case-insensitive)
    #[arg(short, long)]
    search: Option<String>,

    #[arg(short, long)]
    priority: Option<PriorityFilter>,

    #[arg(short, long)]
    category: Option<CategoryFilter>,

    #[arg(long)]
    status: Option<StatusFilter>,
}

#[derive(Args)]
struct EditArgs {
    id: String,

    #[arg(long)]
    text: Option<String>,

    #[arg(short, long)]
    priority: Option<Priority>,

    #[arg(short, long, conflicts_with = "clear_category")]
    category: Option<String>,

    #[arg(long)]
    clear_category: bool,

    #[arg(long, conflicts_with = "clear_due")]
    due: Option<String>,

    #[arg(long)]
    clear_due: bool,
}

#[derive(Subcommand)]
enum SubCommands {
    /// Add a subtask to a todo
    Add { todo_id: String, text: String },

    /// Toggle a subtask
    Toggle { todo_id: String, subtask_id: String },

    /// Delete a subtask
    Rm { todo_id: String, subtask_id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    // Setup tracing: RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut store = TodoStore::open(&config)?.with_notifier(ConsoleNotifier);

    match cli.command {
        Commands::Add {
            text,
            priority,
            category,
            due,
        } => {
            let id = store
                .add_todo(&text, priority, category.as_deref(), due.as_deref())
                .ok_or_else(|| eyre!("Todo text cannot be empty"))?;
            println!("Added {}", id.dimmed());
        }
        Commands::List(args) => {
            store.set_filters(FilterUpdate {
                search: args.search,
                priority: args.priority,
                category: args.category,
                status: args.status,
            });
            let visible = store.visible_todos();
            if visible.is_empty() {
                println!("No todos");
            }
            for todo in visible {
                print_todo(todo);
            }
        }
        Commands::Show { id } => {
            let todo = store.get(&id).ok_or_else(|| not_found(&id))?;
            print_todo(todo);
            println!("    created {}  updated {}", todo.created_at, todo.updated_at);
            for sub in &todo.subtasks {
                let mark = if sub.completed { "[x]".green() } else { "[ ]".normal() };
                println!("    {} {} {}", mark, sub.text, sub.id.dimmed());
            }
        }
        Commands::Toggle { id } => {
            if !store.toggle_todo(&id) {
                return Err(not_found(&id));
            }
        }
        Commands::Edit(args) => {
            let patch = TodoPatch {
                text: args.text,
                priority: args.priority,
                category: if args.clear_category {
                    Some(None)
                } else {
                    args.category.map(Some)
                },
                due_date: if args.clear_due { Some(None) } else { args.due.map(Some) },
                ..TodoPatch::default()
            };
            if patch.is_empty() {
                return Err(eyre!("Nothing to change"));
            }
            if !store.update_todo(&args.id, patch) {
                return Err(not_found(&args.id));
            }
        }
        Commands::Rm { id } => {
            if !store.delete_todo(&id) {
                return Err(not_found(&id));
            }
        }
        Commands::Sub { action } => match action {
            SubCommands::Add { todo_id, text } => {
                let id = store
                    .add_subtask(&todo_id, &text)
                    .ok_or_else(|| eyre!("Subtask not added (unknown todo {} or empty text)", todo_id))?;
                println!("Added subtask {}", id.dimmed());
            }
            SubCommands::Toggle { todo_id, subtask_id } => {
                if !store.toggle_subtask(&todo_id, &subtask_id) {
                    return Err(eyre!("No subtask {} on todo {}", subtask_id, todo_id));
                }
            }
            SubCommands::Rm { todo_id, subtask_id } => {
                if !store.delete_subtask(&todo_id, &subtask_id) {
                    return Err(eyre!("No subtask {} on todo {}", subtask_id, todo_id));
                }
            }
        },
        Commands::CompleteAll => store.complete_all_todos(),
        Commands::ClearCompleted => {
            let removed = store.clear_completed_todos();
            println!("Removed {} todo(s)", removed);
        }
        Commands::Stats => {
            let stats = store.stats();
            println!("Total:     {}", stats.total);
            println!("Completed: {}", stats.completed.to_string().green());
            println!("Pending:   {}", stats.pending.to_string().yellow());
            println!("Progress:  {}%", stats.progress);
        }
        Commands::Categories => {
            for category in store.categories() {
                println!("{}", category);
            }
        }
        Commands::Export { dir } => {
            store.export_todos(&dir).ok_or_else(|| eyre!("Export failed"))?;
        }
        Commands::Import { file, lenient } => {
            if lenient {
                store = store.with_import_mode(ImportMode::Lenient);
            }
            if !store.import_file(&file) {
                return Err(eyre!("Import failed"));
            }
        }
    }

    Ok(())
}

fn not_found(id: &str) -> eyre::Report {
    eyre!("No todo with id {}", id)
}

fn print_todo(todo: &Todo) {
    let mark = if todo.completed { "[x]".green() } else { "[ ]".normal() };
    let priority = match todo.priority {
        Priority::High => "high".red(),
        Priority::Medium => "medium".yellow(),
        Priority::Low => "low".blue(),
    };
    let mut line = format!("{} {} {}", mark, todo.text, priority);
    if let Some(category) = &todo.category {
        line.push_str(&format!(" #{}", category.cyan()));
    }
    if let Some(due) = &todo.due_date {
        line.push_str(&format!(" due {}", due));
    }
    if !todo.subtasks.is_empty() {
        line.push_str(&format!(" [{}/{}]", todo.subtasks_done(), todo.subtasks.len()));
    }
    println!("{}  {}", line, todo.id.dimmed());
}
