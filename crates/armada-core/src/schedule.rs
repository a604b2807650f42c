//! Scheduled activations — deferred campaign work with a cron-style firing
//! rule.
//!
//! An activation carrying a schedule expression is parked in the persistent
//! store partition until the schedule poller finds it due, publishes a
//! trigger event, and removes it. Firing is at-least-once: a crash between
//! publish and delete re-fires the activation, and downstream trigger
//! consumers dedupe on (campaign, activation).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Schedule parse/evaluation failures.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule expression {expression:?}: {reason}")]
    Parse { expression: String, reason: String },
}

/// A campaign activation, optionally deferred by a cron-style schedule.
///
/// Stored under `sch_<campaign>-<activation>`; also the payload of the
/// `schedule` and `trigger` bus topics (with `schedule` cleared on trigger).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivationSpec {
    pub campaign: String,
    pub activation: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Cron expression (seconds-resolution, 6 fields). Empty/absent means
    /// the activation is immediate and never parked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// When the coordinator parked this activation; the anchor for firing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<DateTime<Utc>>,
}

impl ActivationSpec {
    /// The cron expression, if one is set and non-empty.
    pub fn schedule_expression(&self) -> Option<&str> {
        self.schedule.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether the schedule is due at `now`.
    ///
    /// Due means at least one cron occurrence lies in `(registered_at, now]`.
    /// Without a registration anchor nothing has been parked yet, so nothing
    /// is due. `now` is a parameter so evaluation stays deterministic.
    pub fn should_fire_now(&self, now: DateTime<Utc>) -> Result<bool, ScheduleError> {
        let Some(expression) = self.schedule_expression() else {
            return Ok(false);
        };
        let Some(anchor) = self.registered_at else {
            return Ok(false);
        };

        let schedule = Schedule::from_str(expression).map_err(|e| ScheduleError::Parse {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(schedule
            .after(&anchor)
            .next()
            .is_some_and(|occurrence| occurrence <= now))
    }
}
