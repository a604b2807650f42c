//! Bus subscription loops — one task per consumed topic.
//!
//! Delivery contract: job events that come back `Delayed` are republished
//! after a short pause (a Delete waiting out an in-flight Update), hard
//! errors are logged and dropped — the bus redelivers and the pollers
//! re-issue, so there is no retry bookkeeping here.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, warn};

use armada_bus::{BusEvent, EventBus, Topic};
use armada_jobs::{JobCoordinator, JobOutcome};

/// How long a delayed delete waits before going around again.
const REPUBLISH_DELAY: Duration = Duration::from_secs(5);

/// Consume the `job` topic until shutdown.
pub async fn run_job_loop(
    bus: Arc<dyn EventBus>,
    coordinator: Arc<JobCoordinator>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rx = bus.subscribe(Topic::Job);
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(BusEvent::Job { kind, namespace, job }) => {
                    match coordinator
                        .handle_job_event(kind, namespace.as_deref(), &job)
                        .await
                    {
                        Ok(JobOutcome::Delayed) => {
                            let bus = bus.clone();
                            tokio::spawn(async move {
                                tokio::time::sleep(REPUBLISH_DELAY).await;
                                if let Err(e) =
                                    bus.publish(BusEvent::Job { kind, namespace, job })
                                {
                                    warn!(error = %e, "delayed job republish failed");
                                }
                            });
                        }
                        Ok(outcome) => debug!(?outcome, "job event handled"),
                        Err(e) => warn!(error = %e, "job event failed"),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    // The next drift tick re-issues anything that mattered.
                    warn!(missed, "job subscriber lagged")
                }
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

/// Consume the `heartbeat` topic until shutdown.
pub async fn run_heartbeat_loop(
    bus: Arc<dyn EventBus>,
    coordinator: Arc<JobCoordinator>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rx = bus.subscribe(Topic::HeartBeat);
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(BusEvent::HeartBeat { job_id, namespace, action, job_action, time }) => {
                    if let Err(e) = coordinator.handle_heartbeat_event(
                        namespace.as_deref(),
                        &job_id,
                        action,
                        job_action,
                        time,
                    ) {
                        warn!(%job_id, error = %e, "heartbeat event failed");
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => warn!(missed, "heartbeat subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}

/// Consume the `schedule` topic until shutdown.
pub async fn run_schedule_loop(
    bus: Arc<dyn EventBus>,
    coordinator: Arc<JobCoordinator>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rx = bus.subscribe(Topic::Schedule);
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Ok(BusEvent::Schedule(activation)) => {
                    if let Err(e) = coordinator.handle_schedule_event(&activation) {
                        warn!(
                            campaign = %activation.campaign,
                            error = %e,
                            "schedule event failed"
                        );
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => warn!(missed, "schedule subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
            _ = shutdown.changed() => break,
        }
    }
}
