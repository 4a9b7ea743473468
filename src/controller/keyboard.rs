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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;

const TOGGLE: &str = "toggle";
const TAP: &str = "tap";
const HALF: &str = "half";
const DOUBLE: &str = "double";
const MUTE: &str = "mute";

/// A controller that drives the metronome from the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    fn monitor_io<R, W>(
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<(), io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({}, {}, {}, {}, {} <0-100>): ",
            TOGGLE, TAP, HALF, DOUBLE, MUTE,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        reader.read_line(&mut input)?;

        let input = input.trim().to_lowercase();
        let mut words = input.split_whitespace();

        match (words.next(), words.next(), words.next()) {
            (Some(TOGGLE), None, None) => events_tx.blocking_send(Event::Toggle),
            (Some(TAP), None, None) => events_tx.blocking_send(Event::Tap),
            (Some(HALF), None, None) => events_tx.blocking_send(Event::Half),
            (Some(DOUBLE), None, None) => events_tx.blocking_send(Event::Double),
            (Some(MUTE), Some(value), None) => match value.parse::<u8>() {
                Ok(percent) if percent <= 100 => events_tx.blocking_send(Event::Mute(percent)),
                _ => {
                    warn!(input = value, "Mute percentage must be a whole number from 0 to 100");
                    Ok(())
                }
            },
            _ => {
                warn!(input = input.as_str(), "Unrecognized input");
                Ok(())
            }
        }
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(())
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            loop {
                Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())?;
            }
        })
    }
}
