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
use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::controller::keyboard;
use crate::engine::Engine;
use crate::tempo::TempoState;

use self::metronome::Metronome;

pub mod audio;
mod error;
mod metronome;
mod scheduler;

pub use self::audio::Audio;
pub use self::error::ConfigError;

/// Initializes the engine and controller from the given config file and
/// returns the controller. When no path is given, built-in defaults apply.
/// The controller owns the engine, which can be waited on until it exits.
/// Realistically, the controller is not expected to exit.
pub fn init_engine_and_controller(
    config_path: Option<&Path>,
) -> Result<crate::controller::Controller, Box<dyn Error>> {
    let config = match config_path {
        Some(config_path) => Metronome::deserialize(config_path)?,
        None => Metronome::default(),
    };

    let audio_config = config.audio();
    let (device, audio_available) = match crate::audio::get_device(&audio_config) {
        Ok(device) => (device, true),
        Err(e) => {
            warn!(
                err = e.to_string(),
                device = audio_config.device(),
                "No usable audio output; the metronome will run silent."
            );
            let device: Arc<dyn crate::audio::Device> =
                Arc::new(crate::audio::mock::Device::get("silent"));
            (device, false)
        }
    };

    let tempo = Arc::new(Mutex::new(TempoState::new(config.bpm())));
    let engine = Engine::new(device, tempo, config.timing()?, audio_available);
    let controller =
        crate::controller::Controller::new(engine, Arc::new(keyboard::Driver::new()))?;
    Ok(controller)
}
