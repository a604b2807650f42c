//! The job coordinator — decides whether work runs, and drives it.
//!
//! Per job the state machine is:
//!
//! ```text
//! Received → lease check → proceed | delay | skip
//!   (proceed) → fetch desired → build request → remote reconcile
//!     → success: mark LastSuccessTime   failure: surface the error
//! ```
//!
//! The lease check is what makes at-least-once event delivery safe: any
//! number of processes can receive the same job, but a fresh heartbeat from
//! any worker means the object is already being handled. Errors propagate
//! unchanged to the caller — redelivery, the next drift tick, and lease
//! expiry are the only retry mechanisms.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use serde_json::json;
use tracing::{debug, info, warn};

use armada_client::ControlPlane;
use armada_core::{
    match_targets, ActivationSpec, DeploymentRequest, HeartBeat, JobAction, JobSpec,
    LastSuccessTime, ObjectKind, SolutionSpec,
};
use armada_state::{StateEntry, StateStore};

use crate::error::{JobError, JobsResult};
use crate::keys;

/// Outcome of the lease check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseDecision {
    /// No live lease — run the job now.
    Proceed,
    /// A fresh Update lease holds the object and this job is a Delete:
    /// retry later rather than race the in-flight update.
    Delay,
    /// A fresh lease holds the object — this delivery is a duplicate and is
    /// dropped, not retried.
    Skip,
}

/// What happened to a handled job event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// The caller should republish the job for a later retry.
    Delayed,
    Skipped,
}

/// Consumes job, heartbeat, and schedule events against the shared store.
pub struct JobCoordinator {
    state: Arc<dyn StateStore>,
    client: Arc<dyn ControlPlane>,
}

impl JobCoordinator {
    pub fn new(state: Arc<dyn StateStore>, client: Arc<dyn ControlPlane>) -> Self {
        Self { state, client }
    }

    /// Decide whether a job should run now, wait, or be dropped.
    ///
    /// Reads the heartbeat lease for the job's object:
    /// - no record → proceed (no contention);
    /// - record unparsable → proceed (fail open toward progress rather than
    ///   fail closed toward deadlock);
    /// - record older than the lease TTL → proceed (stale-lease recovery
    ///   after a crashed worker);
    /// - fresh Update lease vs. incoming Delete → delay;
    /// - fresh lease otherwise → skip.
    pub fn delay_or_skip_job(
        &self,
        namespace: &str,
        kind: ObjectKind,
        job: &JobSpec,
    ) -> JobsResult<LeaseDecision> {
        let key = keys::heartbeat_key(kind, &job.id);
        let entry = match self.state.get(&key, &keys::lease_partition(namespace)) {
            Ok(entry) => entry,
            Err(e) if e.is_not_found() => return Ok(LeaseDecision::Proceed),
            Err(e) => return Err(e.into()),
        };

        let heartbeat: HeartBeat = match serde_json::from_value(entry.body) {
            Ok(hb) => hb,
            Err(e) => {
                warn!(%key, error = %e, "unparsable heartbeat treated as absent");
                return Ok(LeaseDecision::Proceed);
            }
        };

        let age = Utc::now().signed_duration_since(heartbeat.time);
        if age > TimeDelta::seconds(keys::LEASE_TTL.as_secs() as i64) {
            debug!(%key, age_secs = age.num_seconds(), "lease expired, proceeding");
            return Ok(LeaseDecision::Proceed);
        }

        if job.action == JobAction::Delete && heartbeat.action == JobAction::Update {
            return Ok(LeaseDecision::Delay);
        }
        Ok(LeaseDecision::Skip)
    }

    /// Handle one job event end to end.
    ///
    /// On `Delayed` the caller republishes the event; on `Skipped` the event
    /// is dropped. Hard errors are returned unchanged — there is no internal
    /// retry.
    pub async fn handle_job_event(
        &self,
        kind: ObjectKind,
        namespace: Option<&str>,
        job: &JobSpec,
    ) -> JobsResult<JobOutcome> {
        let namespace = keys::namespace_or_default(namespace);

        match self.delay_or_skip_job(namespace, kind, job)? {
            LeaseDecision::Delay => {
                info!(id = %job.id, %kind, "job delayed by in-flight update");
                return Ok(JobOutcome::Delayed);
            }
            LeaseDecision::Skip => {
                debug!(id = %job.id, %kind, "duplicate job skipped");
                return Ok(JobOutcome::Skipped);
            }
            LeaseDecision::Proceed => {}
        }

        match kind {
            ObjectKind::Instance => self.reconcile_instance(namespace, job).await?,
            ObjectKind::Target => self.reconcile_target(namespace, job).await?,
            ObjectKind::Deployment => self.reconcile_deployment(namespace, job).await?,
        }

        info!(id = %job.id, %kind, action = ?job.action, "job completed");
        Ok(JobOutcome::Completed)
    }

    async fn reconcile_instance(&self, namespace: &str, job: &JobSpec) -> JobsResult<()> {
        let instance = self.client.get_instance(namespace, &job.id).await?;

        // A solution that no longer exists must not block instance teardown;
        // reconcile against an empty component set instead.
        let solution = match self.client.get_solution(namespace, &instance.solution).await {
            Ok(solution) => solution,
            Err(e) if e.is_not_found() => SolutionSpec {
                name: instance.solution.clone(),
                components: Vec::new(),
            },
            Err(e) => return Err(e.into()),
        };

        let targets = self.client.list_targets(namespace).await?;
        let candidates = match_targets(&instance, &targets);
        let request = DeploymentRequest::for_instance(&instance, &solution, &candidates);

        self.run_reconcile(namespace, ObjectKind::Instance, job, &request)
            .await
    }

    async fn reconcile_target(&self, namespace: &str, job: &JobSpec) -> JobsResult<()> {
        let target = self.client.get_target(namespace, &job.id).await?;
        let request = DeploymentRequest::for_target(&target);
        self.run_reconcile(namespace, ObjectKind::Target, job, &request)
            .await
    }

    /// Deployment jobs carry their serialized request in `job.data`.
    async fn reconcile_deployment(&self, namespace: &str, job: &JobSpec) -> JobsResult<()> {
        let data = job
            .data
            .as_ref()
            .ok_or_else(|| JobError::BadRequest("deployment job carries no data".into()))?;
        let request: DeploymentRequest = serde_json::from_value(data.clone())
            .map_err(|e| JobError::BadRequest(format!("deployment job data is malformed: {e}")))?;
        self.run_reconcile(namespace, ObjectKind::Deployment, job, &request)
            .await
    }

    /// Invoke the remote reconcile and maintain the success marker.
    async fn run_reconcile(
        &self,
        namespace: &str,
        kind: ObjectKind,
        job: &JobSpec,
        request: &DeploymentRequest,
    ) -> JobsResult<()> {
        let is_delete = job.action == JobAction::Delete;
        self.client.reconcile(request, is_delete).await?;

        let marker_key = keys::success_marker_key(kind, &job.id);
        let partition = keys::marker_partition(namespace);

        match job.action {
            JobAction::Update => {
                let marker = LastSuccessTime { time: Utc::now() };
                self.state.upsert(
                    StateEntry::new(&marker_key, json!(marker)),
                    &partition,
                )?;
            }
            JobAction::Delete => {
                // The remote object goes first; marker presence means "not
                // yet confirmed deleted", so a failed external delete leaves
                // it for the retry.
                match kind {
                    ObjectKind::Instance => {
                        self.client.delete_instance(namespace, &job.id).await?;
                    }
                    ObjectKind::Target => {
                        self.client.delete_target(namespace, &job.id).await?;
                    }
                    ObjectKind::Deployment => {}
                }
                if let Err(e) = self.state.delete(&marker_key, &partition) {
                    if !e.is_not_found() {
                        return Err(e.into());
                    }
                }
            }
        }
        Ok(())
    }

    /// Handle a heartbeat event: Update renews the lease, Delete releases
    /// it (already-absent is not an error).
    pub fn handle_heartbeat_event(
        &self,
        namespace: Option<&str>,
        job_id: &str,
        action: JobAction,
        job_action: JobAction,
        time: chrono::DateTime<Utc>,
    ) -> JobsResult<()> {
        let namespace = keys::namespace_or_default(namespace);
        // Worker heartbeats run under the object's own identity, so the
        // plain key applies to every kind; target jobs embed the
        // target-runtime prefix in their job id.
        let key = format!("h_{job_id}");
        let partition = keys::lease_partition(namespace);

        match action {
            JobAction::Update => {
                let heartbeat = HeartBeat {
                    job_id: job_id.to_string(),
                    action: job_action,
                    time,
                };
                self.state
                    .upsert(StateEntry::new(&key, json!(heartbeat)), &partition)?;
                debug!(%key, "lease renewed");
            }
            JobAction::Delete => {
                if let Err(e) = self.state.delete(&key, &partition) {
                    if !e.is_not_found() {
                        return Err(e.into());
                    }
                }
                debug!(%key, "lease released");
            }
        }
        Ok(())
    }

    /// Park a deferred activation until its schedule fires.
    pub fn handle_schedule_event(&self, activation: &ActivationSpec) -> JobsResult<()> {
        let mut record = activation.clone();
        if record.registered_at.is_none() {
            record.registered_at = Some(Utc::now());
        }

        let key = keys::activation_key(&record.campaign, &record.activation);
        let partition = keys::activation_partition(keys::namespace_or_default(Some(
            record.namespace.as_str(),
        )));
        self.state
            .upsert(StateEntry::new(&key, json!(record)), &partition)?;
        info!(%key, campaign = %record.campaign, "activation parked");
        Ok(())
    }
}
