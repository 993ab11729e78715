use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use memo_todo_api::api::{self, AppState};
use memo_todo_api::client::{self, NewMemo, NewTask, TaskStatus, UpdateMemo, UpdateTask};
use memo_todo_api::clock::SystemClock;
use memo_todo_api::config::Config;
use memo_todo_api::storage::Patch;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// The address to bind to
        #[arg(short, long, default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
        /// Directory holding memos.json and todos.json
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory served under /static
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Client commands
    Client {
        /// The base URL of the API
        #[arg(long, default_value = memo_todo_api::BASE_URL)]
        url: String,
        #[command(subcommand)]
        command: ClientCommands,
    },
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Memo related commands
    Memos {
        #[command(subcommand)]
        command: MemoCommands,
    },
    /// Todo related commands
    Todos {
        #[command(subcommand)]
        command: TodoCommands,
    },
}

#[derive(Subcommand)]
enum MemoCommands {
    /// Get all memos, or one memo by id
    Get {
        #[arg(long)]
        id: Option<String>,
    },
    /// Create a new memo
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        /// May be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Update fields of an existing memo
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Replaces all tags; may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Remove all tags
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,
    },
    /// Delete a memo
    Delete { id: String },
    /// Search titles, contents and tags
    Search { query: String },
}

#[derive(Subcommand)]
enum TodoCommands {
    /// Get all todos, or one todo by id
    Get {
        #[arg(long)]
        id: Option<String>,
    },
    /// Create a new todo
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        due_date: Option<NaiveDate>,
        /// HH:MM
        #[arg(long)]
        due_time: Option<String>,
    },
    /// Update fields of an existing todo
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due_date: Option<NaiveDate>,
        #[arg(long)]
        due_time: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Delete a todo
    Delete { id: String },
    /// Flip the completed flag of a todo
    Toggle { id: String },
    /// List todos by status (completed or pending)
    Filter {
        #[arg(long)]
        status: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn patch_from<T>(value: Option<T>) -> Patch<T> {
    value.map(Patch::Value).unwrap_or_default()
}

async fn serve(addr: SocketAddr, config: Config) -> anyhow::Result<()> {
    let state = AppState::open(&config, Arc::new(SystemClock))
        .await
        .with_context(|| format!("Failed to open data directory {}", config.data_dir.display()))?;

    let app = api::create_router(state, &config.static_dir);

    info!(
        "Starting server on {} (data: {}, static: {})",
        addr,
        config.data_dir.display(),
        config.static_dir.display()
    );
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_memos(url: &str, command: MemoCommands) -> anyhow::Result<()> {
    match command {
        MemoCommands::Get { id: Some(id) } => print_json(&client::fetch_memo(url, &id).await?),
        MemoCommands::Get { id: None } => print_json(&client::fetch_memos(url).await?),
        MemoCommands::Create {
            title,
            content,
            tags,
        } => {
            let memo = client::create_memo(
                url,
                NewMemo {
                    title,
                    content,
                    tags: Some(tags),
                },
            )
            .await?;
            print_json(&memo)
        }
        MemoCommands::Update {
            id,
            title,
            content,
            tags,
            clear_tags,
        } => {
            let tags = if clear_tags {
                Patch::Null
            } else if tags.is_empty() {
                Patch::Absent
            } else {
                Patch::Value(tags)
            };
            let memo = client::update_memo(
                url,
                &id,
                UpdateMemo {
                    title,
                    content,
                    tags,
                },
            )
            .await?;
            print_json(&memo)
        }
        MemoCommands::Delete { id } => {
            client::delete_memo(url, &id).await?;
            println!("Deleted memo {id}");
            Ok(())
        }
        MemoCommands::Search { query } => print_json(&client::search_memos(url, &query).await?),
    }
}

async fn run_todos(url: &str, command: TodoCommands) -> anyhow::Result<()> {
    match command {
        TodoCommands::Get { id: Some(id) } => print_json(&client::fetch_task(url, &id).await?),
        TodoCommands::Get { id: None } => print_json(&client::fetch_tasks(url).await?),
        TodoCommands::Create {
            title,
            description,
            due_date,
            due_time,
        } => {
            let task = client::create_task(
                url,
                NewTask {
                    title,
                    description,
                    due_date,
                    due_time,
                },
            )
            .await?;
            print_json(&task)
        }
        TodoCommands::Update {
            id,
            title,
            description,
            due_date,
            due_time,
            completed,
        } => {
            let changes = UpdateTask {
                title,
                description: patch_from(description),
                due_date: patch_from(due_date),
                due_time: patch_from(due_time),
                completed,
            };
            print_json(&client::update_task(url, &id, changes).await?)
        }
        TodoCommands::Delete { id } => {
            client::delete_task(url, &id).await?;
            println!("Deleted todo {id}");
            Ok(())
        }
        TodoCommands::Toggle { id } => print_json(&client::toggle_task(url, &id).await?),
        TodoCommands::Filter { status } => {
            let status = status
                .map(|s| s.parse::<TaskStatus>())
                .transpose()?;
            print_json(&client::filter_tasks(url, status).await?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            addr,
            data_dir,
            static_dir,
        } => {
            let config = Config::from_env().with_overrides(data_dir, static_dir);
            serve(addr, config).await
        }
        Commands::Client { url, command } => match command {
            ClientCommands::Memos { command } => run_memos(&url, command).await,
            ClientCommands::Todos { command } => run_todos(&url, command).await,
        },
    }
}
