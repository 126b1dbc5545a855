//! `conductor` - broadcast one prompt to several chat sessions and collect
//! every reply.
//!
//! Runs the full protocol in process against simulated ChatGPT and Claude
//! pages and prints the workflow result as JSON.

use anyhow::{Context, Result};
use clap::Parser;
use conductor_lib::config::ConductorConfig;
use conductor_lib::local_test::{LocalTestMode, SimulatedBehaviour};
use conductor_lib::messaging::Notification;
use conductor_lib::registry::TargetId;
use conductor_lib::store::{InMemoryResultStore, ResultStore, SqliteResultStore};
use conductor_lib::{logging, WorkflowRequest};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Hosts the simulated sessions are opened on, per target.
const SIMULATED_HOSTS: &[(&str, &str)] = &[("chatgpt", "chatgpt.com"), ("claude", "claude.ai")];

#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Prompt to broadcast
    #[arg(required_unless_present = "last")]
    prompt: Option<String>,

    /// Platforms to send the prompt to
    #[arg(short, long, value_delimiter = ',', default_value = "chatgpt,claude")]
    targets: Vec<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the response deadline in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Platforms to leave without an open session
    #[arg(long, value_delimiter = ',')]
    skip: Vec<String>,

    /// Base simulated generation time in milliseconds
    #[arg(long, default_value_t = 1500)]
    generation_ms: u64,

    /// Print the last persisted result and exit
    #[arg(long)]
    last: bool,
}

fn open_store(config: &ConductorConfig) -> Arc<dyn ResultStore> {
    let Some(path) = config.resolved_database_path() else {
        warn!("no data directory available, results will not persist");
        return Arc::new(InMemoryResultStore::new());
    };

    match SqliteResultStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to open result store, results will not persist"
            );
            Arc::new(InMemoryResultStore::new())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        ConductorConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.await_timeout_ms = timeout_ms;
    }
    logging::init(&config.log_level);

    let store = open_store(&config);

    if cli.last {
        let last = store.load_last().context("Failed to read the last result")?;
        println!("{}", serde_json::to_string_pretty(&last)?);
        return Ok(());
    }

    let prompt = cli.prompt.unwrap_or_default();
    let local = LocalTestMode::new(config, store);

    for (target, host) in SIMULATED_HOSTS {
        if cli.skip.iter().any(|s| s == target) {
            info!(platform = %target, "leaving platform without a session");
            continue;
        }
        let behaviour = SimulatedBehaviour::echo_with_jitter(
            Duration::from_millis(cli.generation_ms),
            Duration::from_millis(cli.generation_ms / 2),
        );
        local
            .open_session(host, behaviour)
            .await
            .with_context(|| format!("Failed to open simulated session on {}", host))?;
    }

    let mut updates = local.coordinator().subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(Notification::StatusUpdate { message }) => eprintln!("{}", message),
                // The final result follows every status line.
                Ok(Notification::WorkflowUpdate(_)) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "status output fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let targets = cli.targets.into_iter().map(TargetId::from);
    let result = local
        .coordinator()
        .run_workflow(WorkflowRequest::new(prompt, targets))
        .await;

    printer.await.context("Status printer failed")?;
    local.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
