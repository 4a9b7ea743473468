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
use std::{
    error::Error,
    fmt,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tracing::debug;

/// The clock backing a mock device. Runtime mocks track wall time so the
/// scheduler behaves normally; test mocks are advanced by hand.
enum Clock {
    Monotonic(Instant),
    Manual(Mutex<Duration>),
}

/// A mock device. Doesn't actually make any sound, but keeps a faithful
/// clock and records every click scheduled against it.
#[derive(Clone)]
pub struct Device {
    name: String,
    clock: Arc<Clock>,
    clicks: Arc<Mutex<Vec<Duration>>>,
}

impl Device {
    /// Gets the given mock device, clocked by wall time.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            clock: Arc::new(Clock::Monotonic(Instant::now())),
            clicks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Gets a mock device whose clock only moves through `advance`.
    #[cfg(test)]
    pub fn manual(name: &str) -> Device {
        Device {
            name: name.to_string(),
            clock: Arc::new(Clock::Manual(Mutex::new(Duration::ZERO))),
            clicks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Moves a manual clock forward.
    #[cfg(test)]
    pub fn advance(&self, by: Duration) {
        match self.clock.as_ref() {
            Clock::Manual(clock) => {
                let mut clock = clock.lock().expect("Error getting lock");
                *clock += by;
            }
            Clock::Monotonic(_) => panic!("advance called on a wall clock mock"),
        }
    }

    /// Returns every click scheduled so far, in scheduling order.
    #[cfg(test)]
    pub fn clicks(&self) -> Vec<Duration> {
        self.clicks.lock().expect("Error getting lock").clone()
    }

    /// Returns the number of clicks scheduled so far.
    #[cfg(test)]
    pub fn click_count(&self) -> usize {
        self.clicks.lock().expect("Error getting lock").len()
    }
}

impl crate::audio::Device for Device {
    fn now(&self) -> Duration {
        match self.clock.as_ref() {
            Clock::Monotonic(start) => start.elapsed(),
            Clock::Manual(clock) => *clock.lock().expect("Error getting lock"),
        }
    }

    fn schedule_click(&self, at: Duration) {
        debug!(device = self.name, at = format!("{:?}", at), "Click scheduled (mock).");
        self.clicks.lock().expect("Error getting lock").push(at);
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
