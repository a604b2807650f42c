//! armadad — the Armada orchestrator daemon.
//!
//! Single binary that assembles one orchestrator process:
//! - Versioned state store (redb, or in-memory for throwaway runs)
//! - In-process event bus
//! - Job coordinator subscribed to the job / heartbeat / schedule topics
//! - Drift-detection and schedule pollers on a timer
//!
//! Any number of armadad processes may point at the same store and bus
//! transport; coordination happens entirely through heartbeat leases and
//! success markers.
//!
//! # Usage
//!
//! ```text
//! armadad standalone --data-dir /var/lib/armada --fleet fleet.toml
//! ```

mod fleet;
mod subscriptions;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use armada_bus::{EventBus, InMemoryBus};
use armada_client::{ControlPlane, MemoryControlPlane};
use armada_jobs::{JobCoordinator, JobsConfig, JobsPoller};
use armada_state::{RedbStateStore, StateStore};

use fleet::FleetConfig;

#[derive(Parser)]
#[command(name = "armadad", about = "Armada orchestrator daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single orchestrator process with an in-process bus and a
    /// fleet file seeding the control plane.
    Standalone {
        /// Data directory for the persistent state store.
        #[arg(long, default_value = "/var/lib/armada")]
        data_dir: PathBuf,

        /// Use an ephemeral in-memory state store instead of redb-on-disk.
        #[arg(long)]
        in_memory: bool,

        /// fleet.toml with jobs properties and seeded desired state.
        #[arg(long)]
        fleet: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,armadad=debug,armada=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Standalone {
            data_dir,
            in_memory,
            fleet,
        } => run_standalone(data_dir, in_memory, fleet).await,
    }
}

async fn run_standalone(
    data_dir: PathBuf,
    in_memory: bool,
    fleet_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!("armada daemon starting in standalone mode");

    let fleet = match &fleet_path {
        Some(path) => FleetConfig::from_file(path)?,
        None => FleetConfig::default(),
    };
    let jobs_config = JobsConfig::from_properties(&fleet.jobs)?;
    if !jobs_config.enabled() {
        info!("neither poll.enabled nor schedule.enabled is set; pollers will idle");
    }

    // ── State store ────────────────────────────────────────────

    let state: Arc<dyn StateStore> = if in_memory {
        info!("using in-memory state store");
        Arc::new(RedbStateStore::open_in_memory()?)
    } else {
        std::fs::create_dir_all(&data_dir)?;
        let db_path = data_dir.join("armada.redb");
        let store = RedbStateStore::open(&db_path)?;
        info!(path = ?db_path, "state store opened");
        Arc::new(store)
    };

    // ── Bus and control plane ──────────────────────────────────

    let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());

    let control_plane = Arc::new(MemoryControlPlane::new());
    for seed in &fleet.solutions {
        control_plane
            .put_solution(seed.namespace(), seed.spec())
            .await;
    }
    for instance in &fleet.instances {
        control_plane.put_instance(instance.clone()).await;
    }
    for target in &fleet.targets {
        control_plane.put_target(target.clone()).await;
    }
    info!(
        instances = fleet.instances.len(),
        targets = fleet.targets.len(),
        solutions = fleet.solutions.len(),
        "control plane seeded"
    );
    let client: Arc<dyn ControlPlane> = control_plane;

    // ── Coordinator and pollers ────────────────────────────────

    let coordinator = Arc::new(JobCoordinator::new(state.clone(), client.clone()));
    let poller = JobsPoller::new(state, client, bus.clone(), jobs_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let job_loop = tokio::spawn(subscriptions::run_job_loop(
        bus.clone(),
        coordinator.clone(),
        shutdown_rx.clone(),
    ));
    let heartbeat_loop = tokio::spawn(subscriptions::run_heartbeat_loop(
        bus.clone(),
        coordinator.clone(),
        shutdown_rx.clone(),
    ));
    let schedule_loop = tokio::spawn(subscriptions::run_schedule_loop(
        bus.clone(),
        coordinator,
        shutdown_rx.clone(),
    ));
    let poller_loop = tokio::spawn(async move { poller.run(shutdown_rx).await });

    info!("armada daemon running; ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    info!("shutting down");
    shutdown_tx.send(true)?;
    let _ = tokio::join!(job_loop, heartbeat_loop, schedule_loop, poller_loop);
    info!("armada daemon stopped");
    Ok(())
}
