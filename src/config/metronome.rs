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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;

use crate::scheduler::Timing;
use crate::tempo::DEFAULT_BPM;

use super::audio::Audio;
use super::error::ConfigError;
use super::scheduler::Scheduler;

/// The configuration for the metronome. Every section is optional; an
/// absent config file behaves the same as an empty one.
#[derive(Deserialize, Default)]
pub(super) struct Metronome {
    /// The audio output and click voice.
    audio: Option<Audio>,
    /// The starting tempo.
    bpm: Option<u32>,
    /// The tick loop timing.
    scheduler: Option<Scheduler>,
}

impl Metronome {
    /// Parse a metronome configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Metronome, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Metronome>()?)
    }

    /// Returns the audio configuration.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_else(|| Audio::new("default"))
    }

    /// Returns the starting tempo.
    pub fn bpm(&self) -> u32 {
        self.bpm.unwrap_or(DEFAULT_BPM)
    }

    /// Returns the validated tick loop timing.
    pub fn timing(&self) -> Result<Timing, ConfigError> {
        match &self.scheduler {
            Some(scheduler) => scheduler.timing(),
            None => Ok(Timing::default()),
        }
    }
}
