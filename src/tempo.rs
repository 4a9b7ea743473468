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

use rand::Rng;

/// The lowest tempo the metronome will run at.
pub const MIN_BPM: u32 = 1;
/// The highest tempo the metronome will run at.
pub const MAX_BPM: u32 = 300;
/// Tap tempo entry clamps to a narrower floor so that a slow pair of taps
/// doesn't drop the metronome to a crawl.
pub const MIN_TAP_BPM: u32 = 30;
/// The tempo used when no configuration specifies one.
pub const DEFAULT_BPM: u32 = 40;

/// Derives a tempo from the spacing of a tap pair. The result is not
/// clamped; callers apply the range appropriate to their operation.
pub fn calculate_bpm(interval: Duration) -> u32 {
    (60_000.0 / (interval.as_secs_f64() * 1000.0)).round() as u32
}

/// The tempo and mute state of the metronome. Holds the current bpm, the
/// running flag, the mute probability, and the in-progress tap pair. All
/// mutation happens through the engine; the scheduler only reads.
pub struct TempoState {
    /// Beats per minute, always within [MIN_BPM, MAX_BPM].
    bpm: u32,
    /// Whether the metronome is currently producing beats.
    is_running: bool,
    /// The chance that any given beat is silenced, in [0, 1].
    mute_probability: f64,
    /// The audio clock position of the first tap of a pair, present only
    /// while a pair is half entered.
    tap_anchor: Option<Duration>,
}

impl TempoState {
    /// Creates the tempo state with the given starting bpm, clamped to the
    /// valid range. The metronome starts stopped with muting disabled.
    pub fn new(bpm: u32) -> TempoState {
        TempoState {
            bpm: bpm.clamp(MIN_BPM, MAX_BPM),
            is_running: false,
            mute_probability: 0.0,
            tap_anchor: None,
        }
    }

    /// Returns the current tempo.
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Returns true if the metronome is running.
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Marks the metronome running or stopped. Stopping abandons any half
    /// entered tap pair.
    pub fn set_running(&mut self, running: bool) {
        self.is_running = running;
        if !running {
            self.tap_anchor = None;
        }
    }

    /// The spacing between consecutive beats at the current tempo.
    pub fn beat_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.bpm as f64)
    }

    /// Halves the tempo, clamped to the valid range.
    pub fn halve(&mut self) -> u32 {
        self.bpm = ((self.bpm as f64 / 2.0).round() as u32).clamp(MIN_BPM, MAX_BPM);
        self.bpm
    }

    /// Doubles the tempo, clamped to the valid range.
    pub fn double(&mut self) -> u32 {
        self.bpm = self.bpm.saturating_mul(2).clamp(MIN_BPM, MAX_BPM);
        self.bpm
    }

    /// Records a tap at the given audio clock position. The first tap of a
    /// pair anchors; the second derives the tempo from the spacing and
    /// returns it. A zero-length interval restarts the pair rather than
    /// computing a nonsense tempo.
    pub fn record_tap(&mut self, now: Duration) -> Option<u32> {
        match self.tap_anchor.take() {
            None => {
                self.tap_anchor = Some(now);
                None
            }
            Some(anchor) if now <= anchor => {
                self.tap_anchor = Some(now);
                None
            }
            Some(anchor) => {
                self.bpm = calculate_bpm(now - anchor).clamp(MIN_TAP_BPM, MAX_BPM);
                Some(self.bpm)
            }
        }
    }

    /// Returns true if the first tap of a pair has been recorded and the
    /// second is still awaited.
    pub fn tap_pending(&self) -> bool {
        self.tap_anchor.is_some()
    }

    /// Sets the mute chance from an integer percentage. Out of range values
    /// are rejected without touching the state; returns whether the value
    /// was accepted.
    pub fn set_mute_percent(&mut self, percent: u8) -> bool {
        if percent > 100 {
            return false;
        }
        self.mute_probability = f64::from(percent) / 100.0;
        true
    }

    /// Returns the mute chance as an integer percentage.
    pub fn mute_percent(&self) -> u8 {
        (self.mute_probability * 100.0).round() as u8
    }

    /// Draws whether the next beat should be silenced. Each draw is
    /// independent; there is no memory between beats.
    pub fn should_mute_beat(&self) -> bool {
        self.mute_probability > 0.0 && rand::thread_rng().gen::<f64>() < self.mute_probability
    }
}
