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
use std::{error::Error, fmt, sync::Arc, time::Duration};

use crate::config;

pub mod cpal;
pub mod mock;

/// The audio backend the scheduler talks to. A device provides a monotonic
/// high resolution clock and accepts click timestamps against that clock.
pub trait Device: fmt::Display + Send + Sync {
    /// The current position of the device's audio clock. Monotonic for the
    /// lifetime of the device.
    fn now(&self) -> Duration;

    /// Queues a percussive click at the given clock position. Fire and
    /// forget: a click in the past plays immediately, and a click that can
    /// no longer be delivered is dropped silently.
    fn schedule_click(&self, at: Duration);

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<Box<dyn Device>>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets a device with the configured name.
pub fn get_device(config: &config::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let name = config.device();
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(cpal::Device::get(config)?))
}
