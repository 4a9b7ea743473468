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
use std::{error::Error, time::Duration};

use duration_string::DurationString;
use serde::Deserialize;

const DEFAULT_CLICK_FREQUENCY: f32 = 1000.0;
const DEFAULT_CLICK_GAIN: f32 = 0.5;
const DEFAULT_CLICK_DURATION: Duration = Duration::from_millis(10);

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone)]
pub struct Audio {
    /// The audio device. Names starting with "mock" resolve to a silent
    /// mock device.
    device: String,

    /// The frequency of the click voice in Hz (default: 1000).
    click_frequency: Option<f32>,

    /// The gain of the click voice (default: 0.5).
    click_gain: Option<f32>,

    /// The length of the click voice (default: 10ms).
    click_duration: Option<String>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            click_frequency: None,
            click_gain: None,
            click_duration: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the click frequency in Hz.
    pub fn click_frequency(&self) -> f32 {
        self.click_frequency.unwrap_or(DEFAULT_CLICK_FREQUENCY)
    }

    /// Returns the click gain, clamped to [0, 1].
    pub fn click_gain(&self) -> f32 {
        self.click_gain.unwrap_or(DEFAULT_CLICK_GAIN).clamp(0.0, 1.0)
    }

    /// Returns the click duration from the configuration.
    pub fn click_duration(&self) -> Result<Duration, Box<dyn Error>> {
        match &self.click_duration {
            Some(click_duration) => Ok(DurationString::from_string(click_duration.clone())?.into()),
            None => Ok(DEFAULT_CLICK_DURATION),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let audio = Audio::new("default");
        assert_eq!("default", audio.device());
        assert_eq!(1000.0, audio.click_frequency());
        assert_eq!(0.5, audio.click_gain());
        assert_eq!(
            Duration::from_millis(10),
            audio.click_duration().expect("failed to parse duration")
        );
    }

    #[test]
    fn test_click_duration_parses_suffixed_values() {
        let audio = Audio {
            device: "default".to_string(),
            click_frequency: None,
            click_gain: None,
            click_duration: Some("25ms".to_string()),
        };
        assert_eq!(
            Duration::from_millis(25),
            audio.click_duration().expect("failed to parse duration")
        );

        let audio = Audio {
            device: "default".to_string(),
            click_frequency: None,
            click_gain: None,
            click_duration: Some("not-a-duration".to_string()),
        };
        assert!(audio.click_duration().is_err());
    }

    #[test]
    fn test_click_gain_is_clamped() {
        let audio = Audio {
            device: "default".to_string(),
            click_frequency: None,
            click_gain: Some(7.5),
            click_duration: None,
        };
        assert_eq!(1.0, audio.click_gain());
    }
}
