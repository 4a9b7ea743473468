// Copyright (C) 2026 The clicktrack authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use crate::scheduler::{
    Timing, DEFAULT_POLL_INTERVAL, DEFAULT_SCHEDULE_AHEAD, DEFAULT_START_DELAY,
};

use super::error::ConfigError;

/// A YAML representation of the tick loop timing.
#[derive(Deserialize, Clone, Default)]
pub(super) struct Scheduler {
    /// The recurring wake-up period (default: 15ms).
    poll_interval: Option<String>,

    /// The width of the look-ahead window (default: 100ms). Must be at
    /// least the poll interval or beats would be queued late.
    schedule_ahead: Option<String>,

    /// The offset of the first beat after a start (default: 50ms).
    start_delay: Option<String>,
}

impl Scheduler {
    /// Produces the validated timing knobs.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        let poll_interval =
            parse_duration("scheduler.poll_interval", &self.poll_interval, DEFAULT_POLL_INTERVAL)?;
        let schedule_ahead = parse_duration(
            "scheduler.schedule_ahead",
            &self.schedule_ahead,
            DEFAULT_SCHEDULE_AHEAD,
        )?;
        let start_delay =
            parse_duration("scheduler.start_delay", &self.start_delay, DEFAULT_START_DELAY)?;

        if poll_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "scheduler.poll_interval".to_string(),
                reason: "must be nonzero".to_string(),
            });
        }
        if schedule_ahead < poll_interval {
            return Err(ConfigError::Invalid {
                field: "scheduler.schedule_ahead".to_string(),
                reason: "must be at least the poll interval".to_string(),
            });
        }

        Ok(Timing {
            poll_interval,
            schedule_ahead,
            start_delay,
        })
    }
}

/// Parses an optional duration string, falling back to the given default.
fn parse_duration(
    field: &str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => DurationString::from_string(value.clone())
            .map(Into::into)
            .map_err(|e| ConfigError::Invalid {
                field: field.to_string(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let timing = Scheduler::default().timing().expect("failed to get timing");
        assert_eq!(DEFAULT_POLL_INTERVAL, timing.poll_interval);
        assert_eq!(DEFAULT_SCHEDULE_AHEAD, timing.schedule_ahead);
        assert_eq!(DEFAULT_START_DELAY, timing.start_delay);
    }

    #[test]
    fn test_parses_suffixed_durations() {
        let scheduler = Scheduler {
            poll_interval: Some("25ms".to_string()),
            schedule_ahead: Some("200ms".to_string()),
            start_delay: Some("100ms".to_string()),
        };
        let timing = scheduler.timing().expect("failed to get timing");
        assert_eq!(Duration::from_millis(25), timing.poll_interval);
        assert_eq!(Duration::from_millis(200), timing.schedule_ahead);
        assert_eq!(Duration::from_millis(100), timing.start_delay);
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let scheduler = Scheduler {
            poll_interval: Some("0ms".to_string()),
            schedule_ahead: None,
            start_delay: None,
        };
        assert!(matches!(
            scheduler.timing(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_rejects_window_narrower_than_poll() {
        let scheduler = Scheduler {
            poll_interval: Some("50ms".to_string()),
            schedule_ahead: Some("20ms".to_string()),
            start_delay: None,
        };
        assert!(matches!(
            scheduler.timing(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_duration() {
        let scheduler = Scheduler {
            poll_interval: Some("soon".to_string()),
            schedule_ahead: None,
            start_delay: None,
        };
        assert!(matches!(
            scheduler.timing(),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
