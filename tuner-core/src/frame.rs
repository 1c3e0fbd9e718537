//! # Audio Frame Module
//!
//! A single time-domain snapshot handed from a frame source to the pitch
//! estimator once per scheduling tick.

use std::time::Duration;

/// An immutable block of mono samples (roughly in `[-1, 1]`) plus the rate
/// they were captured at.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Capture sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Wall-clock span covered by the frame. Zero when the sample rate is zero.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Root-mean-square energy of the frame; `0.0` for an empty frame.
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }
}

pub(crate) fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_has_zero_energy() {
        let frame = AudioFrame::new(vec![], 44100);
        assert!(frame.is_empty());
        assert_eq!(frame.rms(), 0.0);
        assert_eq!(frame.duration(), Duration::ZERO);
    }

    #[test]
    fn rms_of_constant_signal_is_its_magnitude() {
        let frame = AudioFrame::new(vec![-0.5; 64], 48000);
        assert!((frame.rms() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn duration_follows_sample_rate() {
        let frame = AudioFrame::new(vec![0.0; 44100], 44100);
        assert_eq!(frame.duration(), Duration::from_secs(1));
        assert_eq!(AudioFrame::new(vec![0.0; 10], 0).duration(), Duration::ZERO);
    }
}
