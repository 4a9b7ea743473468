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
mod audio;
mod config;
mod controller;
mod engine;
mod playsync;
mod scheduler;
mod tempo;
#[cfg(test)]
mod test;

use clap::{crate_version, Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

const SAMPLE_CONFIG: &str = r#"# The audio output and click voice.
audio:
  device: default
  click_frequency: 1000.0
  click_gain: 0.5
  click_duration: 10ms

# The starting tempo.
bpm: 40

# Look-ahead scheduling. The schedule_ahead window must stay wider than the
# wake-up jitter of the host or beats will be queued late.
scheduler:
  poll_interval: 15ms
  schedule_ahead: 100ms
  start_delay: 50ms
"#;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "A practice metronome."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output devices.
    Devices {},
    /// Starts the metronome, reading commands from the keyboard.
    Start {
        /// The path to the metronome config. Built-in defaults apply when omitted.
        config_path: Option<String>,
    },
    /// Prints a sample configuration file to stdout.
    Config {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start { config_path } => {
            let config_path = config_path.map(PathBuf::from);
            config::init_engine_and_controller(config_path.as_deref())?
                .join()
                .await?;
        }
        Commands::Config {} => {
            println!("{}", SAMPLE_CONFIG)
        }
    }

    Ok(())
}
