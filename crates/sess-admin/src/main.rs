//! sess-admin: session store maintenance binary
//!
//! Usage:
//!   sess-admin init            - Create the session table if needed
//!   sess-admin count           - Print the number of stored rows
//!   sess-admin get <sid>       - Print a live session as JSON
//!   sess-admin destroy <sid>   - Delete a session
//!   sess-admin sweep           - Delete expired rows once
//!   sess-admin watch           - Delete expired rows periodically until Ctrl+C
//!   sess-admin --help          - Show help

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use sess_core::session::spawn_cleanup_task;
use sess_core::{Config, SqliteStore, SqliteStoreOptions};
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Init,
    Count,
    Get(String),
    Destroy(String),
    Sweep,
    Watch,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(msg) => {
            eprintln!("{}", msg);
            print_help();
            std::process::exit(2);
        }
    };

    match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            println!("sess-admin {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
        )
        .init();

    // Load .env file
    dotenvy::dotenv().ok();

    let config = Config::load()
        .map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    let store = open_store(&config)?;

    match command {
        Command::Init => {
            tracing::info!("Session table '{}' is ready", store.table_name());
        }
        Command::Count => {
            println!("{}", store.count()?);
        }
        Command::Get(sid) => match store.get(&sid)? {
            Some(session) => println!("{}", serde_json::to_string_pretty(&session)?),
            None => println!("no session"),
        },
        Command::Destroy(sid) => {
            let removed = store.destroy(&sid)?;
            tracing::info!("Destroyed {} row(s) for session {}", removed, sid);
        }
        Command::Sweep => {
            let removed = store.clear_expired()?;
            println!("{}", removed);
        }
        Command::Watch => {
            run_watch(config, store).await?;
        }
        Command::Help | Command::Version => {}
    }

    Ok(())
}

/// Open the configured database and build the store over it
fn open_store(config: &Config) -> anyhow::Result<SqliteStore> {
    let db_path = &config.store.db_path;
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::debug!("Opening session database at: {}", db_path);
    let conn = Connection::open(db_path)?;
    let options = SqliteStoreOptions::from_config(&config.store, Arc::new(Mutex::new(conn)));

    SqliteStore::new(options)
        .map_err(|e| anyhow::anyhow!("Failed to create session store: {}", e))
}

/// Run the cleanup task until Ctrl+C
async fn run_watch(config: Config, store: SqliteStore) -> anyhow::Result<()> {
    if !config.cleanup.enabled {
        tracing::warn!("Cleanup is disabled; set [cleanup] enabled = true or SESSION_CLEANUP_ENABLED=true");
        return Ok(());
    }

    let interval_secs = config.cleanup.interval_secs;
    let handle = spawn_cleanup_task(Arc::new(store), interval_secs);

    tracing::info!("Sweeping expired sessions every {}s", interval_secs);
    tracing::info!("Press Ctrl+C to exit");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");
    handle.abort();

    Ok(())
}

/// Parse command line arguments
fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut iter = args.iter().map(String::as_str);

    let command = match iter.next() {
        None | Some("--help") | Some("-h") => Command::Help,
        Some("--version") | Some("-v") => Command::Version,
        Some("init") => Command::Init,
        Some("count") => Command::Count,
        Some("sweep") => Command::Sweep,
        Some("watch") => Command::Watch,
        Some("get") => Command::Get(required_sid(iter.next(), "get")?),
        Some("destroy") => Command::Destroy(required_sid(iter.next(), "destroy")?),
        Some(other) => return Err(format!("Unknown command: {}", other)),
    };

    if let Some(extra) = iter.next() {
        return Err(format!("Unexpected argument: {}", extra));
    }

    Ok(command)
}

fn required_sid(arg: Option<&str>, command: &str) -> Result<String, String> {
    match arg {
        Some(sid) if !sid.is_empty() => Ok(sid.to_string()),
        _ => Err(format!("`{}` requires a session id", command)),
    }
}

/// Print help message
fn print_help() {
    println!("sess-admin - session store maintenance");
    println!();
    println!("Usage:");
    println!("  sess-admin init            Create the session table if needed");
    println!("  sess-admin count           Print the number of stored rows (expired included)");
    println!("  sess-admin get <sid>       Print a live session as JSON");
    println!("  sess-admin destroy <sid>   Delete a session");
    println!("  sess-admin sweep           Delete expired rows once");
    println!("  sess-admin watch           Delete expired rows periodically until Ctrl+C");
    println!("  sess-admin --help          Show this help message");
    println!("  sess-admin --version       Show version");
    println!();
    println!("Configuration is read from ./sess-store.toml when present.");
    println!();
    println!("Environment Variables:");
    println!("  SESSION_DB_PATH            SQLite database path (default: data/sessions.db)");
    println!("  SESSION_TABLE              Session table name (default: sessions)");
    println!("  SESSION_DEFAULT_MAX_AGE    Default max-age in seconds (default: 86400)");
    println!("  SESSION_CLEANUP_ENABLED    Allow `watch` to sweep (default: false)");
    println!("  SESSION_CLEANUP_INTERVAL   Sweep interval for `watch` in seconds (default: 900)");
}
