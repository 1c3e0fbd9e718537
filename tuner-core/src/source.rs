//! # Frame Source Module
//!
//! The pull side of the capture pipeline. A [`FrameSource`] hands out the
//! most recent fixed-size frame whenever the frame loop asks for one; the
//! loop itself never blocks on a source.

use std::f64::consts::TAU;

use crate::frame::AudioFrame;

/// Anything that can supply time-domain frames at a constant sample rate.
pub trait FrameSource {
    /// Sample rate in Hz, constant for the lifetime of the source.
    fn sample_rate(&self) -> u32;

    /// Returns the newest frame, or `None` if no new frame is ready yet.
    fn next_frame(&mut self) -> Option<AudioFrame>;
}

/// Turns arbitrary-sized sample blocks into overlapping fixed-size windows.
///
/// Once `frame_size` samples are buffered, a window is emitted and the oldest
/// `hop_size` samples are dropped, so consecutive windows overlap by
/// `frame_size - hop_size` samples.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    frame_size: usize,
    hop_size: usize,
    buffer: Vec<f32>,
}

impl SlidingWindow {
    /// `hop_size` is clamped to `1..=frame_size`.
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let frame_size = frame_size.max(1);
        Self {
            frame_size,
            hop_size: hop_size.clamp(1, frame_size),
            buffer: Vec::with_capacity(frame_size * 2),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Appends `samples` and calls `emit` once per completed window.
    pub fn push(&mut self, samples: &[f32], mut emit: impl FnMut(&[f32])) {
        self.buffer.extend_from_slice(samples);

        while self.buffer.len() >= self.frame_size {
            emit(&self.buffer[..self.frame_size]);
            self.buffer.drain(..self.hop_size);
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Deterministic sine generator. Every call to `next_frame` advances the
/// signal by `hop_size` samples, like a live source ticking once per hop.
#[derive(Debug, Clone)]
pub struct SineSource {
    frequency: f32,
    amplitude: f32,
    sample_rate: u32,
    frame_size: usize,
    hop_size: usize,
    position: u64,
}

impl SineSource {
    pub fn new(
        frequency: f32,
        amplitude: f32,
        sample_rate: u32,
        frame_size: usize,
        hop_size: usize,
    ) -> Self {
        Self {
            frequency,
            amplitude,
            sample_rate,
            frame_size,
            hop_size,
            position: 0,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Changes pitch without a phase reset at the current position.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }

    fn sample(&self, index: u64) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        let t = index as f64 / self.sample_rate as f64;
        (self.amplitude as f64 * (TAU * self.frequency as f64 * t).sin()) as f32
    }
}

impl FrameSource for SineSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_frame(&mut self) -> Option<AudioFrame> {
        let start = self.position;
        let samples = (0..self.frame_size as u64)
            .map(|i| self.sample(start + i))
            .collect();
        self.position += self.hop_size as u64;
        Some(AudioFrame::new(samples, self.sample_rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_waits_for_a_full_frame() {
        let mut window = SlidingWindow::new(4, 2);
        let mut frames = Vec::new();
        window.push(&[1.0, 2.0, 3.0], |f| frames.push(f.to_vec()));
        assert!(frames.is_empty());

        window.push(&[4.0], |f| frames.push(f.to_vec()));
        assert_eq!(frames, vec![vec![1.0, 2.0, 3.0, 4.0]]);
    }

    #[test]
    fn windows_overlap_by_frame_minus_hop() {
        let mut window = SlidingWindow::new(4, 2);
        let mut frames = Vec::new();
        let samples: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        window.push(&samples, |f| frames.push(f.to_vec()));
        assert_eq!(
            frames,
            vec![
                vec![1.0, 2.0, 3.0, 4.0],
                vec![3.0, 4.0, 5.0, 6.0],
                vec![5.0, 6.0, 7.0, 8.0],
            ]
        );
    }

    #[test]
    fn hop_is_clamped_to_frame_size() {
        let window = SlidingWindow::new(4, 100);
        assert_eq!(window.hop_size(), 4);
        assert_eq!(SlidingWindow::new(4, 0).hop_size(), 1);
    }

    #[test]
    fn sine_source_advances_by_hop() {
        let mut source = SineSource::new(100.0, 1.0, 8000, 16, 4);
        let first = source.next_frame().unwrap();
        let second = source.next_frame().unwrap();
        assert_eq!(first.len(), 16);
        assert_eq!(first.sample_rate(), 8000);
        assert_eq!(&first.samples()[4..], &second.samples()[..12]);
    }
}
