//! Bus topics and their typed payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use armada_core::{ActivationSpec, JobAction, JobSpec, ObjectKind};

/// The closed set of bus topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Job,
    HeartBeat,
    Schedule,
    Trigger,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Job => "job",
            Topic::HeartBeat => "heartbeat",
            Topic::Schedule => "schedule",
            Topic::Trigger => "trigger",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event, tagged by topic. Constructing a variant is the validation
/// boundary — there is no untyped body to decode downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "topic", rename_all = "lowercase")]
pub enum BusEvent {
    /// A unit of reconciliation work for one object.
    Job {
        kind: ObjectKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        job: JobSpec,
    },
    /// Lease renewal (`action: Update`) or release (`action: Delete`) for a
    /// job a worker is acting on. `job_action` is the action of that job.
    HeartBeat {
        job_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        action: JobAction,
        job_action: JobAction,
        time: DateTime<Utc>,
    },
    /// Park a deferred activation until its schedule fires.
    Schedule(ActivationSpec),
    /// A parked activation whose schedule fired; `schedule` is cleared.
    Trigger(ActivationSpec),
}

impl BusEvent {
    /// The topic this event is published on.
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::Job { .. } => Topic::Job,
            BusEvent::HeartBeat { .. } => Topic::HeartBeat,
            BusEvent::Schedule(_) => Topic::Schedule,
            BusEvent::Trigger(_) => Topic::Trigger,
        }
    }

    /// Shorthand for a job event.
    pub fn job(kind: ObjectKind, namespace: Option<&str>, job: JobSpec) -> Self {
        BusEvent::Job {
            kind,
            namespace: namespace.map(str::to_string),
            job,
        }
    }
}
