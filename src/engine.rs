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
    thread,
};

use tracing::{debug, info, span, warn, Level, Span};

use crate::{
    audio,
    playsync::CancelHandle,
    scheduler::{Scheduler, Timing},
    tempo::TempoState,
};

struct TickHandles {
    join: thread::JoinHandle<()>,
    cancel: CancelHandle,
}

/// A snapshot of the state the UI layer renders. The engine publishes plain
/// data; how it is presented is up to the caller.
pub struct DisplayState {
    pub bpm: u32,
    pub running: bool,
    pub mute_percent: u8,
    pub audio_available: bool,
    pub hint: &'static str,
}

impl fmt::Display for DisplayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bpm | {} | mute {}%{}",
            self.bpm,
            if self.running { "running" } else { "stopped" },
            self.mute_percent,
            if self.audio_available {
                ""
            } else {
                " | no audio output"
            }
        )
    }
}

/// Drives the metronome: applies commands to the tempo state and owns the
/// scheduler's tick loop while running.
pub struct Engine {
    /// The device clicks play through.
    device: Arc<dyn audio::Device>,
    /// The shared tempo and mute state.
    tempo: Arc<Mutex<TempoState>>,
    /// The tick loop timing knobs.
    timing: Timing,
    /// False when the engine fell back to a silent device.
    audio_available: bool,
    /// The running tick loop. There is at most one at a time, and it is
    /// exclusively owned here.
    ticker: Mutex<Option<TickHandles>>,
    /// The logging span.
    span: Span,
}

impl Engine {
    /// Creates a new engine. The metronome starts stopped.
    pub fn new(
        device: Arc<dyn audio::Device>,
        tempo: Arc<Mutex<TempoState>>,
        timing: Timing,
        audio_available: bool,
    ) -> Engine {
        Engine {
            device,
            tempo,
            timing,
            audio_available,
            ticker: Mutex::new(None),
            span: span!(Level::INFO, "engine"),
        }
    }

    /// Starts the metronome if stopped, stops it if running. Stopping is
    /// synchronous: once this returns no further tick fires.
    pub fn toggle(&self) -> Result<(), Box<dyn Error>> {
        let _enter = self.span.enter();

        let mut ticker = self.ticker.lock().expect("Error getting lock");
        match ticker.take() {
            Some(handles) => {
                handles.cancel.cancel();
                if handles.join.join().is_err() {
                    return Err("Error while joining scheduler thread!".into());
                }
                self.tempo
                    .lock()
                    .expect("Error getting lock")
                    .set_running(false);
                info!("Metronome stopped.");
            }
            None => {
                let bpm = {
                    let mut tempo = self.tempo.lock().expect("Error getting lock");
                    tempo.set_running(true);
                    tempo.bpm()
                };

                let mut scheduler =
                    Scheduler::new(self.device.clone(), self.tempo.clone(), self.timing.schedule_ahead);
                scheduler.prime(self.timing.start_delay);

                let cancel = CancelHandle::new();
                let join = {
                    let cancel = cancel.clone();
                    let poll_interval = self.timing.poll_interval;
                    thread::spawn(move || scheduler.run(poll_interval, cancel))
                };
                *ticker = Some(TickHandles { join, cancel });

                info!(bpm, audible = self.audio_available, "Metronome started.");
            }
        }
        Ok(())
    }

    /// Records a tap against the audio clock. Ignored while stopped.
    pub fn tap(&self) -> Result<(), Box<dyn Error>> {
        let _enter = self.span.enter();

        let mut tempo = self.tempo.lock().expect("Error getting lock");
        if !tempo.is_running() {
            debug!("Ignoring tap; metronome is stopped.");
            return Ok(());
        }

        match tempo.record_tap(self.device.now()) {
            Some(bpm) => info!(bpm, "Tap tempo set."),
            None => info!("Tap anchored; tap again to set the tempo."),
        }
        Ok(())
    }

    /// Halves the tempo. Ignored while stopped.
    pub fn halve(&self) -> Result<(), Box<dyn Error>> {
        let _enter = self.span.enter();

        let mut tempo = self.tempo.lock().expect("Error getting lock");
        if !tempo.is_running() {
            debug!("Ignoring half; metronome is stopped.");
            return Ok(());
        }

        let bpm = tempo.halve();
        info!(bpm, "Tempo halved.");
        Ok(())
    }

    /// Doubles the tempo. Ignored while stopped.
    pub fn double(&self) -> Result<(), Box<dyn Error>> {
        let _enter = self.span.enter();

        let mut tempo = self.tempo.lock().expect("Error getting lock");
        if !tempo.is_running() {
            debug!("Ignoring double; metronome is stopped.");
            return Ok(());
        }

        let bpm = tempo.double();
        info!(bpm, "Tempo doubled.");
        Ok(())
    }

    /// Sets the chance that a beat is silenced. Allowed whether or not the
    /// metronome is running; it applies from the next scheduled beat.
    pub fn set_mute_percent(&self, percent: u8) -> Result<(), Box<dyn Error>> {
        let _enter = self.span.enter();

        let mut tempo = self.tempo.lock().expect("Error getting lock");
        if tempo.set_mute_percent(percent) {
            info!(percent, "Mute chance set.");
        } else {
            warn!(percent, "Ignoring out of range mute percentage.");
        }
        Ok(())
    }

    /// Returns the state the UI renders.
    pub fn display(&self) -> DisplayState {
        let tempo = self.tempo.lock().expect("Error getting lock");
        DisplayState {
            bpm: tempo.bpm(),
            running: tempo.is_running(),
            mute_percent: tempo.mute_percent(),
            audio_available: self.audio_available,
            hint: if !tempo.is_running() {
                "toggle to start"
            } else if tempo.tap_pending() {
                "tap again to set the tempo"
            } else {
                "tap, half, double, mute <percent>"
            },
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Ok(mut ticker) = self.ticker.lock() {
            if let Some(handles) = ticker.take() {
                handles.cancel.cancel();
                let _ = handles.join.join();
            }
        }
    }
}
