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
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Level};

use crate::engine::Engine;

pub mod keyboard;

/// Controller events that will trigger behavior in the engine.
#[derive(Debug, PartialEq)]
pub enum Event {
    /// Starts the metronome if stopped, stops it if running.
    Toggle,

    /// Records one tap of a tap tempo pair. Ignored while stopped.
    Tap,

    /// Halves the current tempo. Ignored while stopped.
    Half,

    /// Doubles the current tempo. Ignored while stopped.
    Double,

    /// Sets the chance, as an integer percentage, that a beat is silenced.
    Mute(u8),
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls a metronome engine.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(engine: Engine, driver: Arc<dyn Driver>) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(async move { Controller::trigger_events(engine, driver).await }),
        })
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers engine events by watching the driver and getting events from it.
    async fn trigger_events(engine: Engine, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(status = %engine.display(), "Controller started.");

        loop {
            if let Some(event) = events_rx.recv().await {
                info!(event = format!("{:?}", event), "Received event.");

                if let Err(e) = match event {
                    Event::Toggle => engine.toggle(),
                    Event::Tap => engine.tap(),
                    Event::Half => engine.halve(),
                    Event::Double => engine.double(),
                    Event::Mute(percent) => engine.set_mute_percent(percent),
                } {
                    error!("Error talking to engine: {}", e);
                } else {
                    let state = engine.display();
                    info!(status = %state, hint = state.hint, "State updated.");
                }
            } else {
                info!("Controller closing.");
                if let Err(e) = join_handle.await {
                    error!("Error waiting for event monitor to stop: {}", e);
                }
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        io,
        sync::{Arc, Barrier, Mutex},
        time::Duration,
    };

    use tokio::{sync::mpsc::Sender, task::JoinHandle};

    use crate::{
        audio::mock,
        engine::Engine,
        scheduler::Timing,
        tempo::{TempoState, DEFAULT_BPM},
        test::eventually,
    };

    use super::{Driver, Event};

    #[derive(Debug)]
    enum TestEvent {
        Unset,
        Toggle,
        Tap,
        Half,
        Double,
        Mute(u8),
        Close,
    }

    struct TestDriver {
        current_event: Arc<Mutex<TestEvent>>,
        barrier: Arc<Barrier>,
    }

    impl TestDriver {
        /// Creates a new test driver which is explicitly controlled by the next_event function.
        fn new(current_event: TestEvent) -> TestDriver {
            let current_event = Arc::new(Mutex::new(current_event));
            let barrier = Arc::new(Barrier::new(2));
            TestDriver {
                current_event,
                barrier,
            }
        }

        /// Signals the next event to the monitor thread.
        fn next_event(&self, event: TestEvent) {
            {
                let mut current_event = self.current_event.lock().expect("failed to get lock");
                *current_event = event;
            }
            // Wait until the thread goes to receive the event.
            self.barrier.wait();
            // Wait until the thread has locked the mutex.
            self.barrier.wait();
        }
    }

    impl Driver for TestDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let barrier = self.barrier.clone();
            let current_event = self.current_event.clone();
            let result: JoinHandle<Result<(), io::Error>> =
                tokio::task::spawn_blocking(move || {
                    loop {
                        // Wait for next event to set the current event.
                        barrier.wait();
                        let current_event = current_event.lock().expect("failed to get lock");
                        // Let next event know that we got the event.
                        barrier.wait();
                        match *current_event {
                            TestEvent::Unset => panic!("current event should not be unset"),
                            TestEvent::Toggle => {
                                assert!(events_tx.blocking_send(Event::Toggle).is_ok())
                            }
                            TestEvent::Tap => {
                                assert!(events_tx.blocking_send(Event::Tap).is_ok())
                            }
                            TestEvent::Half => {
                                assert!(events_tx.blocking_send(Event::Half).is_ok())
                            }
                            TestEvent::Double => {
                                assert!(events_tx.blocking_send(Event::Double).is_ok())
                            }
                            TestEvent::Mute(percent) => {
                                assert!(events_tx.blocking_send(Event::Mute(percent)).is_ok())
                            }
                            TestEvent::Close => return Ok(()),
                        }
                    }
                });
            result
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() -> Result<(), Box<dyn Error>> {
        let driver = Arc::new(TestDriver::new(TestEvent::Unset));
        let device = Arc::new(mock::Device::manual("mock-device"));
        let tempo = Arc::new(Mutex::new(TempoState::new(DEFAULT_BPM)));
        let engine = Engine::new(device.clone(), tempo.clone(), Timing::default(), true);
        let mut controller = super::Controller::new(engine, driver.clone())?;

        let bpm = || tempo.lock().expect("failed to get lock").bpm();
        let running = || tempo.lock().expect("failed to get lock").is_running();

        // Tempo commands are ignored until the metronome starts.
        driver.next_event(TestEvent::Double);
        driver.next_event(TestEvent::Toggle);
        eventually(running, "Metronome never started");
        assert_eq!(DEFAULT_BPM, bpm());
        eventually(|| device.click_count() > 0, "No clicks were ever scheduled");

        driver.next_event(TestEvent::Double);
        eventually(|| bpm() == 80, "Tempo never doubled");
        driver.next_event(TestEvent::Half);
        eventually(|| bpm() == 40, "Tempo never halved");

        driver.next_event(TestEvent::Mute(100));
        eventually(
            || tempo.lock().expect("failed to get lock").mute_percent() == 100,
            "Mute chance never took",
        );
        driver.next_event(TestEvent::Mute(0));

        // A tap pair 500ms apart on the audio clock lands on 120 bpm.
        driver.next_event(TestEvent::Tap);
        eventually(
            || tempo.lock().expect("failed to get lock").tap_pending(),
            "Tap never anchored",
        );
        device.advance(Duration::from_millis(500));
        driver.next_event(TestEvent::Tap);
        eventually(|| bpm() == 120, "Tap tempo never took");

        driver.next_event(TestEvent::Toggle);
        eventually(|| !running(), "Metronome never stopped");

        driver.next_event(TestEvent::Close);
        assert!(
            controller.join().await.is_ok(),
            "Error waiting for controller",
        );

        Ok(())
    }
}
