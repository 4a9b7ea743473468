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
    f32::consts::PI,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info};

use crate::config;

/// A small wrapper around a cpal::Device. The device renders scheduled
/// clicks into a continuous output stream and exposes the stream's frame
/// counter as the audio clock.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of output channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The underlying cpal device.
    device: cpal::Device,
    /// The sample rate the output stream runs at.
    sample_rate: u32,
    /// Frames rendered so far. The audio clock derives from this.
    frames: Arc<AtomicU64>,
    /// Sends click start positions (in frames) into the output callback.
    /// Absent until the output stream has been started.
    click_tx: Option<crossbeam_channel::Sender<u64>>,
    /// Signals the output thread to wind down.
    shutdown_tx: Option<crossbeam_channel::Sender<()>>,
    /// Handle to the output thread (keeps the stream alive).
    output_thread: Option<thread::JoinHandle<()>>,
}

/// A click currently being mixed into the output.
struct Voice {
    /// Frame offset within the next buffer at which the click starts.
    /// Nonzero only for the first buffer the voice renders into.
    offset: usize,
    /// Position within the click waveform.
    pos: usize,
}

/// Mixes scheduled clicks into output buffers. Lives inside the stream
/// callback; all state is owned by the audio thread.
struct ClickRenderer {
    /// The synthesized click waveform.
    wave: Vec<f32>,
    /// Receives click start positions from schedule_click.
    click_rx: crossbeam_channel::Receiver<u64>,
    /// Clicks not yet due within a rendered buffer.
    pending: Vec<u64>,
    /// Clicks currently sounding.
    voices: Vec<Voice>,
    /// Shared frame counter, advanced after every buffer.
    frames: Arc<AtomicU64>,
    /// Number of interleaved output channels.
    channels: usize,
}

impl ClickRenderer {
    fn new(
        wave: Vec<f32>,
        click_rx: crossbeam_channel::Receiver<u64>,
        frames: Arc<AtomicU64>,
        channels: usize,
    ) -> ClickRenderer {
        ClickRenderer {
            wave,
            click_rx,
            pending: Vec::new(),
            voices: Vec::new(),
            frames,
            channels,
        }
    }

    /// Renders one buffer of output. Clicks due within the buffer start at
    /// their exact frame; clicks already past due start at the top of the
    /// buffer.
    fn render(&mut self, data: &mut [f32]) {
        while let Ok(at) = self.click_rx.try_recv() {
            self.pending.push(at);
        }

        data.fill(0.0);
        let start = self.frames.load(Ordering::Acquire);
        let buffer_frames = data.len() / self.channels;
        let end = start + buffer_frames as u64;

        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i] < end {
                let at = self.pending.swap_remove(i);
                self.voices.push(Voice {
                    offset: at.saturating_sub(start) as usize,
                    pos: 0,
                });
            } else {
                i += 1;
            }
        }

        for voice in self.voices.iter_mut() {
            let mut frame = voice.offset;
            while frame < buffer_frames && voice.pos < self.wave.len() {
                let sample = self.wave[voice.pos];
                let base = frame * self.channels;
                for channel in 0..self.channels {
                    data[base + channel] += sample;
                }
                voice.pos += 1;
                frame += 1;
            }
            voice.offset = 0;
        }
        self.voices.retain(|voice| voice.pos < self.wave.len());

        self.frames.store(end, Ordering::Release);
    }
}

/// Synthesizes the click waveform: a short sine burst with an exponential
/// decay envelope.
fn generate_click(sample_rate: f32, frequency: f32, gain: f32, duration: Duration) -> Vec<f32> {
    let num_samples = (duration.as_secs_f32() * sample_rate) as usize;
    let phase_increment = 2.0 * PI * frequency / sample_rate;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / num_samples as f32;
            let envelope = (-t * 8.0).exp();
            (i as f32 * phase_increment).sin() * envelope * gain
        })
        .collect()
}

impl Device {
    /// Lists cpal devices and produces the Device trait.
    pub fn list() -> Result<Vec<Box<dyn crate::audio::Device>>, Box<dyn Error>> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|device| {
                let device: Box<dyn crate::audio::Device> = Box::new(device);
                device
            })
            .collect())
    }

    /// Lists cpal output devices. The returned devices have not started
    /// their output streams yet.
    fn list_cpal_devices() -> Result<Vec<Device>, Box<dyn Error>> {
        let mut devices: Vec<Device> = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };

                let mut max_channels = 0;
                let mut sample_rate = 44100;
                for output_config in output_configs {
                    if max_channels < output_config.channels() {
                        max_channels = output_config.channels();
                    }
                    sample_rate = output_config.max_sample_rate();
                }

                if max_channels > 0 {
                    devices.push(Device {
                        name: device.name()?,
                        max_channels,
                        host_id,
                        device,
                        sample_rate,
                        frames: Arc::new(AtomicU64::new(0)),
                        click_tx: None,
                        shutdown_tx: None,
                        output_thread: None,
                    })
                }
            }
        }

        devices.sort_by_key(|device| device.name.to_string());
        Ok(devices)
    }

    /// Gets the given cpal device and starts its output stream.
    pub fn get(config: &config::Audio) -> Result<Device, Box<dyn Error>> {
        let name = config.device();
        let mut device = if name == "default" {
            Device::default_device()?
        } else {
            match Device::list_cpal_devices()?
                .into_iter()
                .find(|device| device.name.trim() == name)
            {
                Some(device) => device,
                None => return Err(format!("no device found with name {}", name).into()),
            }
        };

        device.start_output(config)?;
        Ok(device)
    }

    /// Gets the default output device of the default host.
    fn default_device() -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(device) => device,
            None => return Err("no default output device available".into()),
        };

        let mut max_channels = 0;
        for output_config in device.supported_output_configs()? {
            if max_channels < output_config.channels() {
                max_channels = output_config.channels();
            }
        }

        Ok(Device {
            name: device.name()?,
            max_channels,
            host_id: host.id(),
            device,
            sample_rate: 44100,
            frames: Arc::new(AtomicU64::new(0)),
            click_tx: None,
            shutdown_tx: None,
            output_thread: None,
        })
    }

    /// Starts the output thread that creates and manages the cpal stream.
    /// The stream itself is created inside the thread since it cannot move
    /// between threads.
    fn start_output(&mut self, config: &config::Audio) -> Result<(), Box<dyn Error>> {
        let output_config = self.device.default_output_config()?;
        self.sample_rate = output_config.sample_rate();

        let wave = generate_click(
            self.sample_rate as f32,
            config.click_frequency(),
            config.click_gain(),
            config.click_duration()?,
        );

        let (click_tx, click_rx) = crossbeam_channel::unbounded();
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

        let device = self.device.clone();
        let frames = self.frames.clone();
        let stream_config = cpal::StreamConfig {
            channels: output_config.channels(),
            sample_rate: output_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };
        let sample_format = output_config.sample_format();
        let channels = output_config.channels() as usize;

        let output_thread = thread::spawn(move || {
            let mut renderer = ClickRenderer::new(wave, click_rx, frames, channels);

            let stream_result = match sample_format {
                cpal::SampleFormat::F32 => device.build_output_stream(
                    &stream_config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        renderer.render(data);
                    },
                    |err| error!("cpal output stream error: {}", err),
                    None,
                ),
                cpal::SampleFormat::I16 => {
                    let mut scratch: Vec<f32> = Vec::new();
                    device.build_output_stream(
                        &stream_config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            scratch.resize(data.len(), 0.0);
                            renderer.render(&mut scratch);
                            for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
                                *dst = cpal::Sample::from_sample(src);
                            }
                        },
                        |err| error!("cpal output stream error: {}", err),
                        None,
                    )
                }
                other => {
                    error!(format = format!("{:?}", other), "Unsupported sample format");
                    return;
                }
            };

            match stream_result {
                Ok(stream) => {
                    if let Err(e) = stream.play() {
                        error!("Failed to start cpal stream: {}", e);
                        return;
                    }
                    info!("cpal output stream started.");

                    // Keep the stream alive until shutdown.
                    let _ = shutdown_rx.recv();
                }
                Err(e) => {
                    error!("Failed to create cpal stream: {}", e);
                }
            }
        });

        self.click_tx = Some(click_tx);
        self.shutdown_tx = Some(shutdown_tx);
        self.output_thread = Some(output_thread);
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(thread) = self.output_thread.take() {
            let _ = thread.join();
        }
    }
}

impl crate::audio::Device for Device {
    fn now(&self) -> Duration {
        Duration::from_secs_f64(self.frames.load(Ordering::Acquire) as f64 / self.sample_rate as f64)
    }

    fn schedule_click(&self, at: Duration) {
        let frame = (at.as_secs_f64() * self.sample_rate as f64).round() as u64;
        if let Some(click_tx) = &self.click_tx {
            // Best effort; if the stream is gone the click is dropped.
            let _ = click_tx.send(frame);
        }
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<crate::audio::mock::Device>, Box<dyn Error>> {
        Err("cpal devices cannot be converted to mocks".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_click_shape() {
        let wave = generate_click(48000.0, 1000.0, 0.5, Duration::from_millis(10));

        // 10ms at 48kHz.
        assert_eq!(480, wave.len());

        // The envelope decays: the loudest sample is near the front.
        let peak = wave.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        assert!(peak > 0.2 && peak <= 0.5);
        let tail_peak = wave[wave.len() - 48..]
            .iter()
            .map(|s| s.abs())
            .fold(0.0f32, f32::max);
        assert!(tail_peak < peak / 4.0);
    }

    #[test]
    fn test_renderer_places_click_at_exact_frame() {
        let frames = Arc::new(AtomicU64::new(0));
        let (click_tx, click_rx) = crossbeam_channel::unbounded();
        let mut renderer = ClickRenderer::new(vec![1.0, 0.5], click_rx, frames.clone(), 1);

        click_tx.send(3).expect("failed to send");
        let mut data = vec![0.0f32; 8];
        renderer.render(&mut data);

        assert_eq!(vec![0.0, 0.0, 0.0, 1.0, 0.5, 0.0, 0.0, 0.0], data);
        assert_eq!(8, frames.load(Ordering::Acquire));
    }

    #[test]
    fn test_renderer_click_spans_buffers() {
        let frames = Arc::new(AtomicU64::new(0));
        let (click_tx, click_rx) = crossbeam_channel::unbounded();
        let mut renderer = ClickRenderer::new(vec![1.0, 0.75, 0.5, 0.25], click_rx, frames, 2);

        // Starts at frame 2 of a 4 frame stereo buffer, finishing in the next.
        click_tx.send(2).expect("failed to send");
        let mut data = vec![0.0f32; 8];
        renderer.render(&mut data);
        assert_eq!(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.75, 0.75], data);

        renderer.render(&mut data);
        assert_eq!(vec![0.5, 0.5, 0.25, 0.25, 0.0, 0.0, 0.0, 0.0], data);
    }

    #[test]
    fn test_renderer_holds_clicks_until_due() {
        let frames = Arc::new(AtomicU64::new(0));
        let (click_tx, click_rx) = crossbeam_channel::unbounded();
        let mut renderer = ClickRenderer::new(vec![1.0], click_rx, frames, 1);

        click_tx.send(6).expect("failed to send");
        let mut data = vec![0.0f32; 4];

        renderer.render(&mut data);
        assert_eq!(vec![0.0; 4], data);

        renderer.render(&mut data);
        assert_eq!(vec![0.0, 0.0, 1.0, 0.0], data);
    }

    #[test]
    fn test_renderer_plays_late_click_immediately() {
        let frames = Arc::new(AtomicU64::new(0));
        let (click_tx, click_rx) = crossbeam_channel::unbounded();
        let mut renderer = ClickRenderer::new(vec![1.0], click_rx, frames, 1);

        // Advance past the click's frame before it is delivered.
        let mut data = vec![0.0f32; 4];
        renderer.render(&mut data);

        click_tx.send(1).expect("failed to send");
        renderer.render(&mut data);
        assert_eq!(vec![1.0, 0.0, 0.0, 0.0], data);
    }
}
