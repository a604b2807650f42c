//! Jobs configuration, parsed from string-typed key/value properties.
//!
//! Keys: `poll.enabled`, `schedule.enabled` (booleans as strings),
//! `interval` (seconds; zero or absent disables drift polling), and
//! optional `user` / `password` credentials for the control-plane API.

use std::collections::HashMap;
use std::time::Duration;

use armada_client::Credentials;

use crate::error::{JobError, JobsResult};

/// Typed view of the jobs properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobsConfig {
    pub poll_enabled: bool,
    pub schedule_enabled: bool,
    /// Objects whose success marker is older than this get re-queued. Zero
    /// disables drift polling entirely — the defensive default, so a
    /// misconfigured process cannot cause an event storm.
    pub interval: Duration,
    pub credentials: Credentials,
}

impl JobsConfig {
    /// Parse from string properties. Invalid values are `BadConfig` and
    /// fatal to initialization.
    pub fn from_properties(properties: &HashMap<String, String>) -> JobsResult<Self> {
        let interval_secs = match properties.get("interval") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                JobError::BadConfig(format!("interval {raw:?} is not a whole number of seconds"))
            })?,
            None => 0,
        };

        Ok(Self {
            poll_enabled: parse_flag(properties, "poll.enabled")?,
            schedule_enabled: parse_flag(properties, "schedule.enabled")?,
            interval: Duration::from_secs(interval_secs),
            credentials: Credentials {
                user: properties.get("user").cloned().unwrap_or_default(),
                password: properties.get("password").cloned().unwrap_or_default(),
            },
        })
    }

    /// Whether this process runs any poller at all.
    pub fn enabled(&self) -> bool {
        self.poll_enabled || self.schedule_enabled
    }
}

fn parse_flag(properties: &HashMap<String, String>, key: &str) -> JobsResult<bool> {
    match properties.get(key).map(|v| v.trim()) {
        None | Some("") | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(other) => Err(JobError::BadConfig(format!(
            "{key} must be \"true\" or \"false\", got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_are_disabled() {
        let config = JobsConfig::from_properties(&HashMap::new()).unwrap();
        assert!(!config.poll_enabled);
        assert!(!config.schedule_enabled);
        assert!(config.interval.is_zero());
        assert!(!config.enabled());
    }

    #[test]
    fn full_configuration_parses() {
        let config = JobsConfig::from_properties(&props(&[
            ("poll.enabled", "true"),
            ("schedule.enabled", "true"),
            ("interval", "15"),
            ("user", "orchestrator"),
            ("password", "s3cret"),
        ]))
        .unwrap();
        assert!(config.poll_enabled);
        assert!(config.schedule_enabled);
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.credentials.user, "orchestrator");
        assert!(config.enabled());
    }

    #[test]
    fn bad_interval_is_bad_config() {
        let err =
            JobsConfig::from_properties(&props(&[("interval", "soon")])).unwrap_err();
        assert!(matches!(err, JobError::BadConfig(_)));
    }

    #[test]
    fn bad_flag_is_bad_config() {
        let err =
            JobsConfig::from_properties(&props(&[("poll.enabled", "yes")])).unwrap_err();
        assert!(matches!(err, JobError::BadConfig(_)));
    }
}
