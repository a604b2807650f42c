//! Drift-detection and schedule pollers — the loops that originate work.
//!
//! Each tick is single-threaded and ticks of one poller never overlap; if a
//! deployment of this process violates that, the coordinator's lease check
//! is what keeps the resulting duplicate publishes safe. Multiple processes
//! running these pollers against the same store and bus is the normal case.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use armada_bus::{BusEvent, EventBus};
use armada_client::ControlPlane;
use armada_core::{ActivationSpec, JobAction, JobSpec, LastSuccessTime, ObjectKind};
use armada_state::StateStore;

use crate::config::JobsConfig;
use crate::error::JobsResult;
use crate::keys;

/// Fallback tick cadence when drift polling is disabled but schedules
/// still need scanning.
const DEFAULT_TICK: std::time::Duration = std::time::Duration::from_secs(30);

/// Periodically re-queues drifted objects and fires due schedules.
pub struct JobsPoller {
    state: Arc<dyn StateStore>,
    client: Arc<dyn ControlPlane>,
    bus: Arc<dyn EventBus>,
    config: JobsConfig,
}

impl JobsPoller {
    pub fn new(
        state: Arc<dyn StateStore>,
        client: Arc<dyn ControlPlane>,
        bus: Arc<dyn EventBus>,
        config: JobsConfig,
    ) -> Self {
        Self {
            state,
            client,
            bus,
            config,
        }
    }

    /// One drift-detection pass. Returns the number of jobs published.
    ///
    /// Every instance and target across all namespaces whose success marker
    /// is absent, unreadable, or older than the configured interval gets a
    /// Job Update event. A zero interval disables the pass entirely.
    /// Inventory fetch errors abort the whole poll; marker read errors on a
    /// single object fail toward re-reconciliation.
    pub async fn poll_objects(&self) -> JobsResult<usize> {
        if self.config.interval.is_zero() {
            return Ok(0);
        }
        let max_age = TimeDelta::seconds(self.config.interval.as_secs() as i64);
        let mut published = 0;

        let instances = self.client.list_instances("").await?;
        for instance in instances {
            let namespace = keys::namespace_or_default(Some(instance.namespace.as_str()));
            let marker_key = keys::success_marker_key(ObjectKind::Instance, &instance.name);
            if self.needs_publish(namespace, &marker_key, max_age) {
                self.bus.publish(BusEvent::job(
                    ObjectKind::Instance,
                    Some(namespace),
                    JobSpec::new(&instance.name, JobAction::Update),
                ))?;
                published += 1;
            }
        }

        let targets = self.client.list_targets("").await?;
        for target in targets {
            let namespace = keys::namespace_or_default(Some(target.namespace.as_str()));
            let marker_key = keys::success_marker_key(ObjectKind::Target, &target.name);
            if self.needs_publish(namespace, &marker_key, max_age) {
                self.bus.publish(BusEvent::job(
                    ObjectKind::Target,
                    Some(namespace),
                    JobSpec::new(&target.name, JobAction::Update),
                ))?;
                published += 1;
            }
        }

        debug!(published, "drift poll finished");
        Ok(published)
    }

    /// Whether an object's marker says it needs another reconcile. Any
    /// trouble reading or parsing the marker counts as yes.
    fn needs_publish(&self, namespace: &str, marker_key: &str, max_age: TimeDelta) -> bool {
        let entry = match self.state.get(marker_key, &keys::marker_partition(namespace)) {
            Ok(entry) => entry,
            Err(e) => {
                if !e.is_not_found() {
                    warn!(%marker_key, error = %e, "marker read failed, re-queueing");
                }
                return true;
            }
        };
        match serde_json::from_value::<LastSuccessTime>(entry.body) {
            Ok(marker) => Utc::now().signed_duration_since(marker.time) > max_age,
            Err(e) => {
                warn!(%marker_key, error = %e, "marker unparsable, re-queueing");
                true
            }
        }
    }

    /// One schedule pass. Returns the number of activations fired.
    ///
    /// Lists all parked activations fleet-wide; a corrupt or unevaluable
    /// entry is skipped so it can never block the rest. A due activation
    /// has its schedule cleared, is published as a trigger, and then its
    /// record is deleted — a crash between publish and delete re-fires it,
    /// which downstream consumers absorb by deduping on
    /// (campaign, activation).
    pub fn poll_schedules(&self) -> JobsResult<usize> {
        let (entries, _) = self.state.list(&keys::activation_partition(""))?;
        let now = Utc::now();
        let mut fired = 0;

        for entry in entries {
            let activation: ActivationSpec = match serde_json::from_value(entry.body) {
                Ok(activation) => activation,
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "skipping unparsable activation");
                    continue;
                }
            };
            let due = match activation.should_fire_now(now) {
                Ok(due) => due,
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "skipping unevaluable schedule");
                    continue;
                }
            };
            if !due {
                continue;
            }

            let mut trigger = activation.clone();
            trigger.schedule = None;
            self.bus.publish(BusEvent::Trigger(trigger))?;

            let partition = keys::activation_partition(keys::namespace_or_default(Some(
                activation.namespace.as_str(),
            )));
            if let Err(e) = self.state.delete(&entry.id, &partition) {
                if !e.is_not_found() {
                    // Left in place: the next tick re-fires, consumers dedupe.
                    warn!(id = %entry.id, error = %e, "fired activation not deleted");
                }
            }
            info!(id = %entry.id, campaign = %activation.campaign, "activation fired");
            fired += 1;
        }
        Ok(fired)
    }

    /// One full tick, honoring the enable flags. A drift-poll error skips
    /// the schedule pass, mirroring the per-tick all-or-nothing contract.
    pub async fn poll(&self) -> JobsResult<()> {
        if self.config.poll_enabled {
            self.poll_objects().await?;
        }
        if self.config.schedule_enabled {
            self.poll_schedules()?;
        }
        Ok(())
    }

    /// Run the tick loop until the shutdown signal flips.
    ///
    /// Tick errors are logged, not fatal — the next tick retries from
    /// scratch.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let tick = if self.config.interval.is_zero() {
            DEFAULT_TICK
        } else {
            self.config.interval
        };
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(tick_secs = tick.as_secs(), "jobs poller starting");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.poll().await {
                        warn!(error = %e, "poll tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("jobs poller shutting down");
                    break;
                }
            }
        }
    }
}
