//! armada-jobs — job coordination and the loops that originate work.
//!
//! The pieces, in data-flow order:
//!
//! ```text
//! JobsPoller (drift tick)  ──┐
//! JobsPoller (schedule tick) ├──▶ job / trigger events on the bus
//! external producers        ──┘
//!            │
//!            ▼
//! JobCoordinator ── lease check ──▶ proceed | delay | skip
//!            │ (proceed)
//!            ▼
//! fetch desired state ▶ build DeploymentRequest ▶ remote reconcile
//!            │
//!            ▼
//! success marker / heartbeat records in the shared state store
//! ```
//!
//! Correctness under many concurrent orchestrator processes rests on two
//! assumptions only: the bus is at-least-once (duplicates tolerated, never
//! deduplicated here), and the heartbeat lease is a soft TTL-expiring
//! mutual-exclusion hint — never a hard lock. Nothing here retries with
//! backoff; retry is emergent from bus redelivery, the next drift tick, and
//! lease expiry.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod keys;
pub mod poller;

pub use config::JobsConfig;
pub use coordinator::{JobCoordinator, JobOutcome, LeaseDecision};
pub use error::{JobError, JobsResult};
pub use poller::JobsPoller;
