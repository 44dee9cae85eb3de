use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use providers::gemini::{GeminiClient, GeminiConfig};
use providers::github::GithubClient;
use providers::CompletionProvider;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use storage::LocalStore;
use vault_core::config::{self, AppConfig};
use vault_core::notify::Notifier;
use vault_core::vault::Vault;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let state_dir = resolve_state_dir(cli.state_dir.as_deref(), &cfg);
    let local = LocalStore::open(&state_dir)?;

    // These two only touch local state; no remote credential needed.
    match &cli.command {
        Commands::ConfigSet { key, value } => return run_config_set(&local, key, value),
        Commands::Notifications { json } => return run_notifications(&local, *json),
        _ => {}
    }

    let stored = local.load_settings()?;
    let resolved = config::resolve(&cfg, &stored)?;
    let client = Arc::new(GithubClient::new(resolved.github.clone()));
    let notifier = Notifier::new(
        resolved.webhook_url.as_deref(),
        Some(local),
        resolved.actor.clone(),
    );
    let vault = Vault::new(client.clone(), notifier);

    match cli.command {
        Commands::Stats { json } => run_stats(&vault, json).await,
        Commands::Files { json } => run_files(&vault, json).await,
        Commands::Cat { path, fresh } => {
            print!("{}", vault.read_file(&path, fresh).await?);
            Ok(())
        }
        Commands::Put {
            path,
            content,
            message,
        } => run_put(&vault, &path, content, message).await,
        Commands::Todos {
            json,
            project,
            pending,
        } => run_todos(&vault, json, project.as_deref(), pending).await,
        Commands::TodoAdd { task, project } => {
            let path = vault.add_todo(&project, &task).await?;
            println!("added to {path}");
            Ok(())
        }
        Commands::TodoToggle { index } => run_todo_toggle(&vault, index).await,
        Commands::TodoDelete { index } => run_todo_delete(&vault, index).await,
        Commands::Memos { json } => run_memos(&vault, json).await,
        Commands::MemoAdd { text } => {
            vault.add_memo(&text).await?;
            println!("memo added");
            Ok(())
        }
        Commands::MemoDelete { index } => run_memo_delete(&vault, index).await,
        Commands::Note { text } => {
            let path = vault.add_quick_note(&text).await?;
            println!("noted in {path}");
            Ok(())
        }
        Commands::Search { keyword, json } => run_search(&vault, &keyword, json).await,
        Commands::Health { json } => run_health(&vault, json).await,
        Commands::Commits { n, json } => run_commits(&vault, n, json).await,
        Commands::Ask { prompt, context } => {
            run_ask(&vault, resolved.gemini, &prompt, context.as_deref()).await
        }
        Commands::Sync => {
            client.dispatch_sync("vault-sync").await?;
            println!("sync dispatched");
            Ok(())
        }
        Commands::ClearCache => {
            vault.clear_cache();
            println!("cache cleared");
            Ok(())
        }
        Commands::ConfigSet { .. } | Commands::Notifications { .. } => unreachable!(),
    }
}

#[derive(Parser)]
#[command(name = "vaultctl")]
#[command(about = "Remote control for a Git-hosted knowledge vault", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Directory for settings and the notification log
    #[arg(long)]
    state_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Vault-wide file counts and total size
    Stats {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List markdown files in the vault
    Files {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one file's decoded content
    Cat {
        path: String,
        /// Bypass every cache layer
        #[arg(long)]
        fresh: bool,
    },
    /// Create or update a file with literal content or stdin
    Put {
        path: String,
        /// Literal content; reads stdin when omitted
        #[arg(long)]
        content: Option<String>,
        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List tasks across project files and the root index
    Todos {
        /// Output JSON
        #[arg(long)]
        json: bool,
        /// Filter by project name
        #[arg(long)]
        project: Option<String>,
        /// Only open tasks
        #[arg(long)]
        pending: bool,
    },
    /// Append a new open task
    TodoAdd {
        task: String,
        /// Project name; `Home` targets the root index
        #[arg(long, default_value = "Home")]
        project: String,
    },
    /// Toggle a task by its index in `todos` output
    TodoToggle { index: usize },
    /// Delete a task by its index in `todos` output
    TodoDelete { index: usize },
    /// List memo entries
    Memos {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Append a timestamped memo
    MemoAdd { text: String },
    /// Delete a memo by its index in `memos` output
    MemoDelete { index: usize },
    /// Append a quick note to today's daily file
    Note { text: String },
    /// Filename-first keyword search
    Search {
        keyword: String,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Rule-based vault health score
    Health {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Recent commit activity
    Commits {
        /// Number of commits
        #[arg(short, long, default_value_t = 10)]
        n: u32,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the AI assistant, optionally with a vault file as context
    Ask {
        prompt: String,
        /// Vault path whose content is passed as context
        #[arg(long)]
        context: Option<String>,
    },
    /// Trigger the remote sync workflow
    Sync,
    /// Drop every cached response
    ClearCache,
    /// Show the local notification log
    Notifications {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Persist a settings value (token|repo|ai-key|webhook|user)
    ConfigSet { key: String, value: String },
}

fn resolve_state_dir(flag: Option<&str>, cfg: &AppConfig) -> PathBuf {
    if let Some(dir) = flag {
        return PathBuf::from(dir);
    }
    if let Some(dir) = cfg.local.state_dir.as_deref().filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".vault-dashboard"),
        None => PathBuf::from(".vault-dashboard"),
    }
}

fn run_config_set(local: &LocalStore, key: &str, value: &str) -> Result<()> {
    let mut settings = local.load_settings()?;
    match key {
        "token" => settings.token = value.to_string(),
        "repo" => settings.repo = value.to_string(),
        "ai-key" => settings.ai_key = value.to_string(),
        "webhook" => settings.webhook_url = value.to_string(),
        "user" => settings.user_name = value.to_string(),
        other => bail!("unknown settings key: {other} (expected token|repo|ai-key|webhook|user)"),
    }
    local.save_settings(&settings)?;
    println!("saved {key}");
    Ok(())
}

fn run_notifications(local: &LocalStore, json: bool) -> Result<()> {
    let log = local.notifications()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }
    if log.is_empty() {
        println!("no notifications");
    }
    for n in log {
        println!("{}  {}  {}", n.time, n.title, n.detail);
    }
    Ok(())
}

async fn run_stats(vault: &Vault, json: bool) -> Result<()> {
    let stats = vault.get_stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("notes     {}", stats.total);
    println!("projects  {}", stats.projects);
    println!("daily     {}", stats.dailies);
    println!("knowledge {}", stats.knowledge);
    println!("weekly    {}", stats.weekly);
    println!("size      {} bytes", stats.total_size);
    Ok(())
}

async fn run_files(vault: &Vault, json: bool) -> Result<()> {
    let files = vault.list_md_files().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }
    for f in files {
        println!("{:>8}  {}", f.size, f.path);
    }
    Ok(())
}

async fn run_put(
    vault: &Vault,
    path: &str,
    content: Option<String>,
    message: Option<String>,
) -> Result<()> {
    let content = match content {
        Some(c) => c,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading content from stdin")?;
            buf
        }
    };
    vault
        .write_file(path, &content, message.as_deref().unwrap_or(""))
        .await?;
    println!("wrote {path}");
    Ok(())
}

async fn run_todos(
    vault: &Vault,
    json: bool,
    project: Option<&str>,
    pending: bool,
) -> Result<()> {
    let todos = vault.get_todos().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&todos)?);
        return Ok(());
    }
    let mut open = 0;
    let mut done = 0;
    for (i, t) in todos.iter().enumerate() {
        if t.done {
            done += 1;
        } else {
            open += 1;
        }
        if pending && t.done {
            continue;
        }
        if let Some(p) = project {
            if t.project != p {
                continue;
            }
        }
        let mark = if t.done { "[x]" } else { "[ ]" };
        println!("[{i:>3}] {mark} ({}) {}", t.project, t.task);
    }
    println!("{open} open | {done} done");
    Ok(())
}

async fn run_todo_toggle(vault: &Vault, index: usize) -> Result<()> {
    let todos = vault.get_todos().await?;
    let item = todos
        .get(index)
        .with_context(|| format!("no task at index {index} (0..{})", todos.len()))?;
    vault.toggle_todo(item).await?;
    let state = if item.done { "reopened" } else { "done" };
    println!("{state}: {}", item.task);
    Ok(())
}

async fn run_todo_delete(vault: &Vault, index: usize) -> Result<()> {
    let todos = vault.get_todos().await?;
    let item = todos
        .get(index)
        .with_context(|| format!("no task at index {index} (0..{})", todos.len()))?;
    vault.delete_todo(item).await?;
    println!("deleted: {}", item.task);
    Ok(())
}

async fn run_memos(vault: &Vault, json: bool) -> Result<()> {
    let memos = vault.list_memos().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&memos)?);
        return Ok(());
    }
    if memos.is_empty() {
        println!("no memos yet");
    }
    for (i, m) in memos.iter().enumerate() {
        if m.timestamp.is_empty() {
            println!("[{i:>3}] {}", m.text);
        } else {
            println!("[{i:>3}] {}  {}", m.timestamp, m.text);
        }
    }
    Ok(())
}

async fn run_memo_delete(vault: &Vault, index: usize) -> Result<()> {
    let memos = vault.list_memos().await?;
    let entry = memos
        .get(index)
        .with_context(|| format!("no memo at index {index} (0..{})", memos.len()))?;
    vault.delete_memo(entry).await?;
    println!("memo done: {}", entry.text);
    Ok(())
}

async fn run_search(vault: &Vault, keyword: &str, json: bool) -> Result<()> {
    let hits = vault.search(keyword).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    for hit in hits {
        println!("{}\n    {}", hit.file, hit.preview);
    }
    Ok(())
}

async fn run_health(vault: &Vault, json: bool) -> Result<()> {
    let report = vault.health_check().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("score: {}/100", report.score);
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    for (folder, count) in &report.folders {
        println!("  {count:>4}  {folder}");
    }
    Ok(())
}

async fn run_commits(vault: &Vault, n: u32, json: bool) -> Result<()> {
    let commits = vault.get_commits(n).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&commits)?);
        return Ok(());
    }
    for c in commits {
        let short = c.sha.chars().take(7).collect::<String>();
        let first_line = c.message.split('\n').next().unwrap_or("");
        println!("{short}  {}  {}  {first_line}", c.date, c.author);
    }
    Ok(())
}

async fn run_ask(
    vault: &Vault,
    gemini: Option<GeminiConfig>,
    prompt: &str,
    context_path: Option<&str>,
) -> Result<()> {
    let cfg = gemini.context("no AI key configured; set ai.key or run `config-set ai-key ...`")?;
    let context = match context_path {
        Some(path) => Some(vault.read_file(path, false).await?),
        None => None,
    };
    let client = GeminiClient::new(cfg);
    let reply = client.ask(prompt, context.as_deref()).await?;
    println!("{reply}");
    Ok(())
}
