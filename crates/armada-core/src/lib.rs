//! armada-core — domain types for the Armada fleet orchestrator.
//!
//! Defines the desired-state model (solutions, instances, targets), the
//! deployment plan builder, and the transient records carried on the event
//! bus or persisted in the state store (jobs, heartbeat leases, success
//! markers, scheduled activations).
//!
//! Everything in this crate is pure data plus total functions over it: no
//! I/O, no clocks. Callers pass `now` explicitly where time matters, which
//! keeps planning and schedule evaluation deterministic and testable.

pub mod component;
pub mod job;
pub mod objects;
pub mod plan;
pub mod schedule;

pub use component::{ComponentResult, ComponentSpec, ComponentStep, ResultStatus, StepAction};
pub use job::{HeartBeat, JobAction, JobSpec, LastSuccessTime, ObjectKind};
pub use objects::{
    match_targets, DeploymentRequest, InstanceSpec, SolutionSpec, TargetSelector, TargetSpec,
};
pub use plan::{DeploymentPlan, DeploymentStep};
pub use schedule::{ActivationSpec, ScheduleError};
