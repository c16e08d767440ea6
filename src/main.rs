use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::mpsc;

use agent_marker::commands::{self, Command, Notification, NotificationLevel};
use agent_marker::tmux::{PaneWatcher, TmuxClient};
use agent_marker::{Config, CreationMetadata, HostEvent, Orchestrator};

#[derive(Parser, Debug)]
#[command(name = "agent-marker", version, about = "Mark AI agent terminals for other processes")]
struct Cli {
    /// Config file (defaults to <config dir>/agent-marker/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding marker files (defaults to the temp directory)
    #[arg(long, global = true)]
    marker_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Watch tmux panes and keep markers in sync until Ctrl-C
    Watch,
    /// Classify the active tmux pane and mark it if it is an agent
    Detect,
    /// Create a marker for the active tmux pane
    Mark,
    /// Show all marker files
    Status,
    /// Exit 0 if the process has an agent marker, 1 otherwise
    Query { pid: u32 },
    /// Remove all marker files
    Sweep,
    /// Classify a terminal name without touching any marker
    Classify {
        name: String,
        /// Name override given at creation time
        #[arg(long)]
        override_name: Option<String>,
        /// Creation environment, KEY=VALUE
        #[arg(long = "env", value_parser = parse_env_pair)]
        env: Vec<(String, String)>,
    },
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.marker_dir {
        config.marker_dir = Some(dir);
    }
    let orchestrator = Orchestrator::from_config(&config);

    match cli.command {
        Cmd::Watch => {
            watch(orchestrator, &config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Detect => run_command(&orchestrator, Command::DetectActive).await,
        Cmd::Mark => run_command(&orchestrator, Command::CreateMarker).await,
        Cmd::Status => run_command(&orchestrator, Command::ShowStatus).await,
        Cmd::Query { pid } => {
            let record = orchestrator.store().read(pid).await?;
            match record {
                Some(record) => {
                    println!("{}", serde_json::to_string(&record)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => Ok(ExitCode::from(1)),
            }
        }
        Cmd::Sweep => {
            let removed = orchestrator
                .store()
                .remove_all()
                .await
                .context("Failed to sweep marker files")?;
            println!("Removed {removed} marker file(s)");
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Classify {
            name,
            override_name,
            env,
        } => {
            let metadata = (override_name.is_some() || !env.is_empty()).then(|| CreationMetadata {
                name: override_name,
                env: (!env.is_empty()).then(|| env.into_iter().collect()),
            });
            let is_agent = orchestrator.classifier().classify(&name, metadata.as_ref());
            println!("{}", if is_agent { "agent" } else { "standard" });
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_command(orchestrator: &Orchestrator, command: Command) -> Result<ExitCode> {
    let client = TmuxClient::new();
    let pane = if client.is_server_running().await {
        client.active_pane().await?
    } else {
        None
    };
    let active = match pane {
        Some(pane) => {
            let env = client.session_env(&pane.session_name).await.ok();
            pane.into_terminal(env)
        }
        None => None,
    };

    let notification = commands::execute(orchestrator, command, active.as_ref()).await;
    Ok(report(&notification))
}

fn report(notification: &Notification) -> ExitCode {
    match notification.level {
        NotificationLevel::Info => {
            println!("{notification}");
            ExitCode::SUCCESS
        }
        NotificationLevel::Warning => {
            eprintln!("Warning: {notification}");
            ExitCode::SUCCESS
        }
        NotificationLevel::Error => {
            eprintln!("Error: {notification}");
            ExitCode::FAILURE
        }
    }
}

async fn watch(orchestrator: Orchestrator, config: &Config) -> Result<()> {
    // Purge orphans and adopt existing panes before any event is handled
    let mut watcher = PaneWatcher::new(TmuxClient::new());
    let existing = watcher.snapshot().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to list existing tmux panes");
        Vec::new()
    });
    orchestrator.startup(existing).await;
    tracing::info!(
        dir = %orchestrator.store().dir().display(),
        "agent marker watcher started"
    );

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<HostEvent>();

    // Spawn tmux poller
    let tmux_tx = tx.clone();
    let poll_interval = config.poll_interval();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(poll_interval).await;
            match watcher.poll().await {
                Ok(events) => {
                    for event in events {
                        let _ = tmux_tx.send(event);
                    }
                }
                Err(e) => {
                    let _ = tmux_tx.send(HostEvent::Error(format!("Tmux: {}", e)));
                }
            }
        }
    });

    // Spawn shutdown handler
    let signal_tx = tx;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_tx.send(HostEvent::Shutdown);
        }
    });

    // Main event loop
    while let Some(event) = rx.recv().await {
        if orchestrator.handle_event(event) {
            break;
        }
    }

    orchestrator.shutdown().await;
    Ok(())
}
