//! # Audio Device Module
//!
//! This module handles real-time audio input and output using CPAL
//! (Cross-Platform Audio Library).
//!
//! Every stream is owned by a dedicated worker thread. The thread builds the
//! stream, reports success or failure back to the caller, and then parks
//! until it is told to shut down. Dropping a [`StreamWorker`] signals the
//! thread and joins it, so the device is released before the drop returns.
//!
//! ## Features
//! - Default device selection for capture and playback
//! - Closest-rate 32-bit float configuration lookup
//! - Mono downmix of captured frames
//! - Synchronous acquire and release

use crate::error::{DeviceAccessError, Direction};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};
use crossbeam_channel::Sender;
use std::thread::{self, JoinHandle};

/// Number of captured blocks buffered between the device callback and the
/// consumer before new blocks are dropped.
pub const CAPTURE_QUEUE_DEPTH: usize = 256;

/// Negotiated stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to a worker thread that owns a live CPAL stream.
#[derive(Debug)]
pub struct StreamWorker {
    format: StreamFormat,
    shutdown_tx: Sender<()>,
    thread_handle: Option<JoinHandle<()>>,
}

impl StreamWorker {
    pub fn format(&self) -> StreamFormat {
        self.format
    }
}

impl Drop for StreamWorker {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                log::error!("[AUDIO] Stream worker panicked during shutdown");
            }
        }
    }
}

/// Spawns a worker thread that builds a stream with `build` and keeps it
/// alive until the returned handle is dropped.
fn spawn_stream_worker<B>(name: &str, build: B) -> Result<StreamWorker, DeviceAccessError>
where
    B: FnOnce() -> Result<(cpal::Stream, StreamFormat), DeviceAccessError> + Send + 'static,
{
    let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    let thread_name = name.to_string();

    let thread_handle = thread::Builder::new().name(thread_name.clone()).spawn(move || {
        let stream = match build() {
            Ok((stream, format)) => {
                let _ = ready_tx.send(Ok(format));
                stream
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };

        // Blocks until a shutdown signal arrives or the handle is dropped.
        let _ = shutdown_rx.recv();

        log::debug!("[{}] Stopping stream", thread_name);
        if let Err(e) = stream.pause() {
            log::warn!("[{}] Error pausing stream: {}", thread_name, e);
        }
        drop(stream);
    })?;

    match ready_rx.recv() {
        Ok(Ok(format)) => Ok(StreamWorker {
            format,
            shutdown_tx,
            thread_handle: Some(thread_handle),
        }),
        Ok(Err(e)) => {
            let _ = thread_handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = thread_handle.join();
            Err(DeviceAccessError::WorkerLost)
        }
    }
}

/// Starts audio capture from the default input device.
///
/// Captured frames are downmixed to mono and sent to `sender` one callback
/// block at a time. Blocks are dropped if the consumer falls behind.
///
/// # Arguments
/// * `sender` - Channel for the mono sample blocks
/// * `target_rate` - Preferred sample rate in Hz
///
/// # Returns
/// * `Ok(worker)` - Running capture; drop it to release the microphone
/// * `Err(e)` - No device, no usable format, or the stream failed to start
pub fn start_audio_capture(
    sender: Sender<Vec<f32>>,
    target_rate: u32,
) -> Result<StreamWorker, DeviceAccessError> {
    spawn_stream_worker("audio-capture", move || {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(DeviceAccessError::NoDevice(Direction::Input))?;

        log::info!(
            "[AUDIO] Using audio input device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        let configs = device.supported_input_configs()?.collect::<Vec<_>>();
        let supported = find_supported_config(configs, target_rate)
            .ok_or(DeviceAccessError::UnsupportedFormat(Direction::Input))?;

        let format = StreamFormat {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
        };
        log::info!(
            "[AUDIO] Selected capture format: {} Hz, {} channel(s)",
            format.sample_rate,
            format.channels
        );

        let channels = format.channels.max(1) as usize;
        let config: cpal::StreamConfig = supported.into();
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let block = downmix(data, channels);
                let _ = sender.try_send(block);
            },
            |err| log::error!("[AUDIO] An error occurred on the input stream: {}", err),
            None,
        )?;
        stream.play()?;

        Ok((stream, format))
    })
}

/// Starts playback on the default output device.
///
/// `make_render` is called once on the worker thread with the negotiated
/// format and returns the callback that fills each interleaved output block.
///
/// # Returns
/// * `Ok(worker)` - Running playback; drop it to release the device
/// * `Err(e)` - No device, no usable format, or the stream failed to start
pub fn start_audio_output<M, R>(make_render: M) -> Result<StreamWorker, DeviceAccessError>
where
    M: FnOnce(StreamFormat) -> R + Send + 'static,
    R: FnMut(&mut [f32]) + Send + 'static,
{
    spawn_stream_worker("audio-output", move || {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DeviceAccessError::NoDevice(Direction::Output))?;

        log::info!(
            "[AUDIO] Using audio output device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        let supported = find_output_config(&device)?;
        let format = StreamFormat {
            sample_rate: supported.sample_rate().0,
            channels: supported.channels(),
        };

        let mut render = make_render(format);
        let config: cpal::StreamConfig = supported.into();
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| render(data),
            |err| log::error!("[AUDIO] An error occurred on the output stream: {}", err),
            None,
        )?;
        stream.play()?;

        Ok((stream, format))
    })
}

/// Averages interleaved frames down to one channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Finds the best supported capture configuration for the target rate.
///
/// Only 32-bit float formats are considered. Mono is preferred, then the
/// range closest to `target_rate`; the rate is clamped into that range.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfig> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| {
            let min = c.min_sample_rate().0;
            let max = c.max_sample_rate().0;
            let rate_diff = if target_rate < min {
                min - target_rate
            } else if target_rate > max {
                target_rate - max
            } else {
                0
            };
            (c.channels() != 1, rate_diff)
        })
        .map(|c| {
            let rate = target_rate.clamp(c.min_sample_rate().0, c.max_sample_rate().0);
            c.with_sample_rate(cpal::SampleRate(rate))
        })
}

/// Picks a 32-bit float output configuration, preferring the device default.
fn find_output_config(device: &cpal::Device) -> Result<SupportedStreamConfig, DeviceAccessError> {
    let default = device.default_output_config()?;
    if default.sample_format() == SampleFormat::F32 {
        return Ok(default);
    }

    let preferred_rate = default.sample_rate().0;
    device
        .supported_output_configs()?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .min_by_key(|c| c.channels().abs_diff(default.channels()))
        .map(|c| {
            let rate = preferred_rate.clamp(c.min_sample_rate().0, c.max_sample_rate().0);
            c.with_sample_rate(cpal::SampleRate(rate))
        })
        .ok_or(DeviceAccessError::UnsupportedFormat(Direction::Output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_stereo_frames() {
        let stereo = [1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_leaves_mono_untouched() {
        let mono = [0.1, 0.2, 0.3];
        assert_eq!(downmix(&mono, 1), mono.to_vec());
    }

    #[test]
    fn failed_build_is_reported_and_joined() {
        let result = spawn_stream_worker("test-worker", || {
            Err(DeviceAccessError::NoDevice(Direction::Input))
        });
        assert!(matches!(
            result,
            Err(DeviceAccessError::NoDevice(Direction::Input))
        ));
    }
}
