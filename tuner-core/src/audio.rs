//! # Audio Capture Module
//!
//! This module handles real-time microphone capture using CPAL (Cross-Platform Audio Library).
//! It is the only part of the crate that touches a device; everything
//! downstream sees plain [`AudioFrame`]s through the [`FrameSource`] trait.
//!
//! ## Features
//! - Automatic default input device selection
//! - f32 input format, closest sample rate to the requested one
//! - Multi-channel input downmixed to mono
//! - Overlapping frames via [`SlidingWindow`], delivered over a bounded channel

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, TrySendError};
use tracing::{info, warn};

use crate::error::{Result, TunerError};
use crate::frame::AudioFrame;
use crate::source::{FrameSource, SlidingWindow};

/// Frames waiting for the frame loop. Older frames are dropped when full.
const FRAME_QUEUE: usize = 4;

/// How the capture stream should be set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Preferred sample rate in Hz; the device may only get close.
    pub sample_rate: u32,
    /// Samples per analysis frame
    pub frame_size: usize,
    /// New samples between consecutive frames
    pub hop_size: usize,
}

/// A running input stream. Dropping it stops capture.
pub struct Capture {
    stream: Option<cpal::Stream>,
    frames: Receiver<AudioFrame>,
    sample_rate: u32,
}

impl std::fmt::Debug for Capture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capture")
            .field("active", &self.is_active())
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks an f32 configuration near `settings.sample_rate`
/// 3. Installs a callback that downmixes to mono and slices overlapping frames
///
/// # Arguments
/// * `settings` - Requested sample rate and frame geometry
///
/// # Returns
/// * `Ok(capture)` - Running capture handle, usable as a [`FrameSource`]
/// * `Err(e)` - No device, no usable format, or the stream could not start
pub fn start_audio_capture(settings: &CaptureSettings) -> Result<Capture> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(TunerError::NoInputDevice)?;

    let device_name = device.name()?;
    info!(device = %device_name, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config =
        find_supported_config(configs, settings.sample_rate).ok_or(TunerError::NoSupportedConfig)?;

    let sample_rate = cpal::SampleRate(clamp_rate(&supported_config, settings.sample_rate));
    let config = supported_config.with_sample_rate(sample_rate);
    let channels = config.channels().max(1) as usize;
    let sample_rate_val = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    info!(
        sample_rate = sample_rate_val,
        channels,
        frame_size = settings.frame_size,
        hop_size = settings.hop_size,
        "selected input format"
    );

    let (frame_tx, frame_rx) = crossbeam_channel::bounded(FRAME_QUEUE);
    let mut window = SlidingWindow::new(settings.frame_size, settings.hop_size);
    let mut mono = Vec::new();

    let err_fn = |err| warn!("an error occurred on the audio stream: {}", err);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            downmix(data, channels, &mut mono);
            window.push(&mono, |samples| {
                let frame = AudioFrame::new(samples.to_vec(), sample_rate_val);
                // A full queue means the frame loop is behind; it only wants the newest frame anyway.
                if let Err(TrySendError::Disconnected(_)) = frame_tx.try_send(frame) {
                    warn!("frame receiver dropped while capture is running");
                }
            });
        },
        err_fn,
        None,
    )?;

    stream.play()?;
    info!("audio capture started");

    Ok(Capture {
        stream: Some(stream),
        frames: frame_rx,
        sample_rate: sample_rate_val,
    })
}

impl Capture {
    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Pauses and releases the stream. Calling it twice is a no-op.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream.pause()?;
            info!("audio capture stopped");
        }
        Ok(())
    }
}

impl FrameSource for Capture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Drains the queue and keeps only the newest frame.
    fn next_frame(&mut self) -> Option<AudioFrame> {
        self.frames.try_iter().last()
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("error pausing stream on drop: {}", e);
        }
    }
}

/// Finds the best supported input configuration for the target sample rate.
///
/// Only 32-bit float configurations qualify. Fewer channels win first, then
/// the configuration whose rate range lies closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| (c.channels(), rate_distance(c, target_rate)))
}

fn rate_distance(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    clamp_rate(config, target_rate).abs_diff(target_rate)
}

/// The supported rate nearest to `target_rate`.
fn clamp_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}

/// Averages interleaved channels into `out`.
fn downmix(data: &[f32], channels: usize, out: &mut Vec<f32>) {
    out.clear();
    if channels <= 1 {
        out.extend_from_slice(data);
        return;
    }
    out.extend(
        data.chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let mut out = Vec::new();
        downmix(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 2, &mut out);
        assert_eq!(out, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn downmix_passes_mono_through() {
        let mut out = vec![9.0];
        downmix(&[0.1, 0.2], 1, &mut out);
        assert_eq!(out, vec![0.1, 0.2]);
    }
}
