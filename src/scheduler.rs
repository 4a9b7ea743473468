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
    sync::{Arc, Mutex},
    time::Duration,
};

use tracing::{span, Level};

use crate::{audio, playsync::CancelHandle, tempo::TempoState};

/// How often the tick loop wakes up to fill the look-ahead window.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(15);
/// How far ahead of the audio clock beats are queued. Must stay wider than
/// the worst case wake-up jitter or beats become audible late.
pub const DEFAULT_SCHEDULE_AHEAD: Duration = Duration::from_millis(100);
/// Offset applied to the first beat after a start so it is never scheduled
/// in the past.
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(50);

/// The timing knobs for the tick loop.
#[derive(Clone, Copy)]
pub struct Timing {
    /// The recurring wake-up period.
    pub poll_interval: Duration,
    /// The width of the look-ahead window.
    pub schedule_ahead: Duration,
    /// The offset of the first beat after a start.
    pub start_delay: Duration,
}

impl Default for Timing {
    fn default() -> Timing {
        Timing {
            poll_interval: DEFAULT_POLL_INTERVAL,
            schedule_ahead: DEFAULT_SCHEDULE_AHEAD,
            start_delay: DEFAULT_START_DELAY,
        }
    }
}

/// Translates the current tempo into precisely timestamped clicks. The
/// recurring wake-up only decides when to queue; the timestamps themselves
/// come from the audio clock, which the device honors exactly. That keeps
/// wake-up jitter out of the audible beat spacing as long as the window is
/// wider than the jitter.
pub struct Scheduler {
    /// The device clicks are scheduled against.
    device: Arc<dyn audio::Device>,
    /// The tempo the beat spacing is read from on every beat.
    tempo: Arc<Mutex<TempoState>>,
    /// The audio clock position of the next unplayed beat.
    next_beat: Duration,
    /// The width of the look-ahead window.
    schedule_ahead: Duration,
}

impl Scheduler {
    /// Creates a scheduler. The cursor starts unprimed; call `prime` before
    /// the first tick.
    pub fn new(
        device: Arc<dyn audio::Device>,
        tempo: Arc<Mutex<TempoState>>,
        schedule_ahead: Duration,
    ) -> Scheduler {
        Scheduler {
            device,
            tempo,
            next_beat: Duration::ZERO,
            schedule_ahead,
        }
    }

    /// Places the first beat slightly after the current clock position.
    pub fn prime(&mut self, start_delay: Duration) {
        self.next_beat = self.device.now() + start_delay;
    }

    /// Fills the look-ahead window: queues every beat that falls before
    /// now + schedule_ahead and advances the cursor one beat interval at a
    /// time. After a delayed wake-up this emits exactly the number of whole
    /// intervals that elapsed. A muted beat still advances the cursor so
    /// the grid stays intact.
    pub fn on_tick(&mut self) {
        let horizon = self.device.now() + self.schedule_ahead;
        while self.next_beat < horizon {
            let (interval, muted) = {
                let tempo = self.tempo.lock().expect("Error getting lock");
                (tempo.beat_interval(), tempo.should_mute_beat())
            };
            if !muted {
                self.device.schedule_click(self.next_beat);
            }
            self.next_beat += interval;
        }
    }

    /// Runs the tick loop until cancelled. The cancel handle's timed wait
    /// is the poll sleep, so cancellation takes effect without waiting out
    /// the interval.
    pub fn run(mut self, poll_interval: Duration, cancel_handle: CancelHandle) {
        let span = span!(Level::INFO, "scheduler");
        let _enter = span.enter();

        loop {
            self.on_tick();
            if cancel_handle.wait_timeout(poll_interval) {
                return;
            }
        }
    }
}
