use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use taskwheel_core::TaskwheelConfig;
use taskwheel_scheduler::{
    AuditLog, Command as SchedulerCommand, Executor, ScheduleStore, SchedulerEngine,
    SchedulerHandle, SchedulerService,
};

/// Persistent recurring-trigger script scheduler.
#[derive(Parser)]
#[command(name = "taskwheel", version, about)]
struct Cli {
    /// Path to taskwheel.toml (default: ~/.taskwheel/taskwheel.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Run the scheduler daemon until interrupted.
    Run,
    /// Register a schedule. The anchor datetime must match `YYYY-MM-DD HH:MM`.
    Add {
        /// Daily, Weekly or Monthly.
        frequency: String,
        /// Anchor datetime, e.g. "2024-06-01 09:30".
        datetime: String,
        /// Script to execute when the schedule fires.
        script: String,
    },
    /// Print the persisted schedules.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskwheel=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = TaskwheelConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({e}), using defaults");
        TaskwheelConfig::default()
    });

    match cli.command {
        CliCommand::Run => run_daemon(config).await,
        CliCommand::Add {
            frequency,
            datetime,
            script,
        } => add_schedule(config, frequency, datetime, script).await,
        CliCommand::List => list_schedules(config),
    }
}

/// Wire store + audit + executor + engine into a service and its handle.
fn build_core(config: &TaskwheelConfig) -> anyhow::Result<(SchedulerService, SchedulerHandle, SchedulerEngine)> {
    let audit = AuditLog::open(&config.audit.path)
        .with_context(|| format!("opening audit log {}", config.audit.path))?;
    let store = ScheduleStore::new(&config.store.path);
    let engine = SchedulerEngine::new(Duration::from_secs(config.engine.idle_poll_secs));
    let handle = engine.handle();
    let executor = Executor::new(audit.clone());
    let service = SchedulerService::new(store, audit, executor, handle.clone());
    Ok((service, handle, engine))
}

async fn run_daemon(config: TaskwheelConfig) -> anyhow::Result<()> {
    let (service, handle, engine) = build_core(&config)?;

    let activated = service.startup_reload();
    info!(count = activated, "schedules reactivated from store");

    // The command channel is the only way front-ends reach scheduling.
    let (command_tx, command_rx) = mpsc::channel::<SchedulerCommand>(32);
    tokio::spawn(service.run_commands(command_rx));
    tokio::spawn(engine.run());

    info!(store = %config.store.path, "taskwheel daemon running — ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    // Stop scheduling new fires; in-flight scripts are not waited on.
    handle.shutdown(false).await;
    drop(command_tx);
    info!("taskwheel daemon stopped");
    Ok(())
}

async fn add_schedule(
    config: TaskwheelConfig,
    frequency: String,
    datetime: String,
    script: String,
) -> anyhow::Result<()> {
    let (service, _handle, _engine) = build_core(&config)?;

    // Same seam as any UI: the submission travels the command channel.
    let (command_tx, command_rx) = mpsc::channel::<SchedulerCommand>(1);
    let worker = tokio::spawn(service.run_commands(command_rx));

    let (reply_tx, reply_rx) = oneshot::channel();
    command_tx
        .send(SchedulerCommand::Submit {
            frequency: frequency.clone(),
            datetime: datetime.clone(),
            filepath: script.clone(),
            reply: reply_tx,
        })
        .await
        .context("scheduler command loop is gone")?;
    reply_rx.await.context("no reply from scheduler")??;

    drop(command_tx);
    worker.await?;

    println!("Scheduled {script} ({frequency} from {datetime}).");
    println!("The job becomes live the next time `taskwheel run` starts.");
    Ok(())
}

fn list_schedules(config: TaskwheelConfig) -> anyhow::Result<()> {
    let store = ScheduleStore::new(&config.store.path);
    let outcome = store
        .load_all()
        .with_context(|| format!("reading {}", config.store.path))?;

    if outcome.entries.is_empty() && outcome.skipped.is_empty() {
        println!("No schedules registered.");
        return Ok(());
    }
    for entry in &outcome.entries {
        println!(
            "{:<8} {}  {}",
            entry.frequency.to_string(),
            entry.datetime,
            entry.filepath
        );
    }
    for skipped in &outcome.skipped {
        println!("invalid: {} ({})", skipped.raw, skipped.reason);
    }
    Ok(())
}
