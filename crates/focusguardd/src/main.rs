//! focusguardd - The focusguard background service
//!
//! This is the main entry point for the focusguardd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Enforcement state machine
//! - Host adapter (NDJSON over stdio)
//! - Evaluation wake-ups and periodic housekeeping
//!
//! Subcommands other than `run` perform one policy operation against the
//! store and exit.

mod host;
mod wake;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use focusguard_config::{Config, load_config_or_default};
use focusguard_core::{Enforcer, EvaluationScheduler, Monitor, PolicyService, execute_actions};
use focusguard_host_api::{HostAdapter, HostEvent};
use focusguard_store::{BlockRepository, JsonFileStore, Store};
use focusguard_util::{Clock, ResourceId, SystemClock, default_config_path, format_millis};
use host::StdioHost;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wake::TokioWakeScheduler;

/// focusguardd - Focus enforcement service
#[derive(Parser, Debug)]
#[command(name = "focusguardd")]
#[command(about = "Blocks distracting applications on a schedule", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/focusguard/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set FOCUSGUARD_DATA_DIR env var)
    #[arg(short, long, env = "FOCUSGUARD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the enforcement service (default)
    Run,
    /// Print what is blocked right now
    Status,
    /// List running timers
    Timers,
    /// Grant an emergency bypass for a resource (`*` pauses every timer)
    Bypass { resource: String },
    /// Start a focus timer blocking the given resources
    Focus {
        minutes: i64,
        #[arg(required = true)]
        resources: Vec<String>,
    },
    /// Start a pomodoro focus or break timer
    Pomodoro {
        #[arg(value_enum)]
        phase: PomodoroPhase,
        minutes: i64,
    },
    /// Replace all block rules with the JSON array in a file
    Rules { path: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PomodoroPhase {
    Focus,
    Break,
}

/// Main service state
struct Service {
    config: Config,
    repository: BlockRepository,
    clock: Arc<dyn Clock>,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        let config = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(config_path = %args.config.display(), "Configuration loaded");

        let data_dir = args
            .data_dir
            .clone()
            .unwrap_or_else(|| config.service.data_dir.clone());
        let store_path = data_dir.join(&config.service.store_file);

        let store: Arc<dyn Store> = Arc::new(
            JsonFileStore::open(&store_path)
                .with_context(|| format!("Failed to open store {:?}", store_path))?,
        );

        info!(store_path = %store_path.display(), "Store initialized");

        Ok(Self {
            config,
            repository: BlockRepository::new(store),
            clock: Arc::new(SystemClock),
        })
    }

    fn policy(&self) -> PolicyService {
        PolicyService::new(self.repository.clone(), self.config.bypass.clone())
    }

    async fn run(self) -> Result<()> {
        let host = Arc::new(StdioHost::new(
            self.config.enforcement.home_resource.clone(),
            self.clock.clone(),
        ));
        let mut enforcer = Enforcer::new(
            self.repository.clone(),
            self.config.enforcement.clone(),
            host.capabilities().clone(),
        );

        let (wake_tx, mut wake_rx) = mpsc::unbounded_channel();
        let wake = Arc::new(TokioWakeScheduler::new(self.clock.clone(), wake_tx));
        let monitor = Monitor::new(
            self.repository.clone(),
            EvaluationScheduler::new(self.repository.clone(), wake),
        );

        // Boot pass: prune and arm the first wake-up
        if let Err(e) = monitor.run_once(self.clock.now_millis()) {
            error!(error = %e, "Initial housekeeping failed");
        }

        let _reader = host.start_reader();
        let mut host_events = host
            .subscribe()
            .context("Host event receiver already taken")?;

        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

        let period = self.config.monitor.interval;
        let mut monitor_timer =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        info!("Service running");

        loop {
            let now = self.clock.now_millis();
            let deadline = enforcer.next_deadline(now).map(|at| {
                tokio::time::Instant::now() + Duration::from_millis((at - now).max(0) as u64)
            });

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                Some(event) = host_events.recv() => {
                    if event == HostEvent::Closed {
                        info!("Host event source closed");
                        break;
                    }
                    let actions = enforcer.handle_event(&event);
                    execute_actions(host.as_ref(), &mut enforcer, actions).await;
                }

                // Pending go-home, termination or overlay dismissal
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)), if deadline.is_some() => {
                    let actions = enforcer.tick(self.clock.now_millis());
                    execute_actions(host.as_ref(), &mut enforcer, actions).await;
                }

                Some(at) = wake_rx.recv() => {
                    info!(at = %format_millis(at), "Scheduled evaluation");
                    if let Err(e) = monitor.scheduler().reschedule(self.clock.now_millis()) {
                        warn!(error = %e, "Failed to reschedule evaluation");
                    }
                }

                _ = monitor_timer.tick() => {
                    if let Err(e) = monitor.run_once(self.clock.now_millis()) {
                        warn!(error = %e, "Housekeeping failed");
                    }
                }
            }
        }

        // Flush anything already due so a block in progress is completed
        let actions = enforcer.tick(self.clock.now_millis());
        execute_actions(host.as_ref(), &mut enforcer, actions).await;

        info!("Shutdown complete");
        Ok(())
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_command(service: &Service, command: Command) -> Result<()> {
    let policy = service.policy();
    let now = service.clock.now_millis();

    match command {
        Command::Run => anyhow::bail!("run is not a one-shot command"),
        Command::Status => print_json(&policy.block_status(now)?),
        Command::Timers => print_json(&policy.active_timers(now)?),
        Command::Bypass { resource } => match policy.grant_emergency_bypass(&resource, now)? {
            Some(bypass) => {
                println!(
                    "Bypass granted for {} until {}",
                    bypass.resource_id(),
                    format_millis(bypass.expires_at_millis())
                );
                Ok(())
            }
            None => anyhow::bail!("Bypass refused"),
        },
        Command::Focus { minutes, resources } => {
            let resources = resources.into_iter().map(ResourceId::from).collect();
            match policy.start_focus_timer(minutes, resources, now)? {
                Some(timer) => {
                    println!("Timer {} started", timer.id());
                    Ok(())
                }
                None => anyhow::bail!("Timer refused"),
            }
        }
        Command::Pomodoro { phase, minutes } => {
            let timer = match phase {
                PomodoroPhase::Focus => policy.start_pomodoro_focus(minutes, now)?,
                PomodoroPhase::Break => policy.start_pomodoro_break(minutes, now)?,
            };
            match timer {
                Some(timer) => {
                    println!("Timer {} started", timer.id());
                    Ok(())
                }
                None => anyhow::bail!("Timer refused"),
            }
        }
        Command::Rules { path } => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read rules from {:?}", path))?;
            if !policy.save_block_rules_json(&json, now)? {
                anyhow::bail!("Rules rejected");
            }
            println!("Rules saved");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries host output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "focusguardd starting");

    let service = Service::new(&args)?;
    match args.command {
        None | Some(Command::Run) => service.run().await,
        Some(command) => run_command(&service, command),
    }
}
