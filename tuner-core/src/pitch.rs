//! # Pitch Detection Module
//!
//! This module estimates the fundamental frequency of a monophonic signal
//! (plucked strings, voice) from one time-domain frame.
//!
//! ## Algorithm
//! - RMS noise gate to reject silence
//! - Edge trimming of quiet lead-in / lead-out samples
//! - Raw (non-normalized) autocorrelation over the 60–1000 Hz lag range
//! - Peak picking against the running best correlation
//! - Parabolic interpolation for sub-sample accuracy
//!
//! The estimator is a pure function: it never fails and never panics, every
//! abnormal input resolves to [`PitchEstimate::NoPitch`].

use crate::frame::{rms, AudioFrame};

/// Frames quieter than this RMS level are treated as silence.
pub const SILENCE_RMS: f32 = 0.01;

/// Amplitude below which edge samples are considered quiet enough to cut at.
pub const TRIM_THRESHOLD: f32 = 0.2;

/// Lowest frequency searched, in Hz. Sets the longest lag.
pub const MIN_FREQUENCY: u32 = 60;

/// Highest frequency searched, in Hz. Sets the shortest lag.
pub const MAX_FREQUENCY: u32 = 1000;

/// A local peak counts as periodicity when it reaches this share of the best
/// correlation seen so far.
pub const PEAK_RATIO: f32 = 0.9;

/// Outcome of a single estimation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PitchEstimate {
    /// Silence, or no detectable periodicity.
    #[default]
    NoPitch,
    /// Fundamental frequency in Hz. Always finite and positive.
    Frequency(f32),
}

impl PitchEstimate {
    /// Wraps a computed frequency, collapsing non-finite or non-positive
    /// values to [`PitchEstimate::NoPitch`].
    pub fn from_frequency(frequency: f32) -> Self {
        if frequency.is_finite() && frequency > 0.0 {
            Self::Frequency(frequency)
        } else {
            Self::NoPitch
        }
    }

    pub fn frequency(self) -> Option<f32> {
        match self {
            Self::Frequency(f) => Some(f),
            Self::NoPitch => None,
        }
    }

    pub fn is_pitched(self) -> bool {
        matches!(self, Self::Frequency(_))
    }
}

/// Estimates the fundamental frequency of a frame by autocorrelation.
///
/// This function:
/// 1. Gates the frame on RMS energy ([`SILENCE_RMS`])
/// 2. Trims quiet samples off both edges ([`TRIM_THRESHOLD`])
/// 3. Autocorrelates the trimmed window
/// 4. Picks the strongest lag between `sample_rate / 1000` and `sample_rate / 60`
/// 5. Refines that lag with parabolic interpolation
///
/// # Arguments
/// * `frame` - Time-domain samples and their sample rate
///
/// # Returns
/// * `PitchEstimate::Frequency(hz)` - Detected fundamental
/// * `PitchEstimate::NoPitch` - Silence, degenerate input, or no periodicity
pub fn estimate(frame: &AudioFrame) -> PitchEstimate {
    let sample_rate = frame.sample_rate();
    let signal = frame.samples();

    if sample_rate == 0 || signal.len() < 2 {
        return PitchEstimate::NoPitch;
    }

    // --- Noise Gate ---
    if rms(signal) < SILENCE_RMS {
        return PitchEstimate::NoPitch;
    }

    let window = trim_edges(signal, TRIM_THRESHOLD);
    if window.len() < 2 {
        return PitchEstimate::NoPitch;
    }

    let min_lag = (sample_rate / MAX_FREQUENCY) as usize;
    let max_lag = ((sample_rate / MIN_FREQUENCY) as usize).min(window.len() - 1);
    if min_lag > max_lag {
        return PitchEstimate::NoPitch;
    }

    // The search reads one lag past `max_lag` as a right-hand neighbour.
    let autocorr = autocorrelate(window, max_lag + 1);

    match find_best_lag(&autocorr, min_lag, max_lag) {
        Some(lag) => {
            let period = refine_period(&autocorr, lag);
            PitchEstimate::from_frequency(sample_rate as f32 / period)
        }
        None => PitchEstimate::NoPitch,
    }
}

/// Cuts the frame down to the span between the first quiet sample from the
/// front and the first quiet sample from the back.
///
/// Both scans only look at the first half of the frame from their side. When
/// no quiet sample is found the start stays at 0 and the end at `len - 1`.
/// The end bound is exclusive.
fn trim_edges(signal: &[f32], threshold: f32) -> &[f32] {
    let len = signal.len();
    if len == 0 {
        return signal;
    }
    let half = len.div_ceil(2);

    let start = (0..half)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(0);
    let end = (1..half)
        .map(|i| len - i)
        .find(|&i| signal[i].abs() < threshold)
        .unwrap_or(len - 1);

    if start >= end {
        return &[];
    }
    &signal[start..end]
}

/// Computes `sum(signal[i] * signal[i + lag])` for every lag up to and
/// including `max_lag` (or the window length, whichever is shorter).
fn autocorrelate(signal: &[f32], max_lag: usize) -> Vec<f32> {
    let lags = signal.len().min(max_lag + 1);
    (0..lags)
        .map(|lag| {
            signal[..signal.len() - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Lags outside the computed range read as zero correlation.
fn correlation_at(autocorr: &[f32], lag: usize) -> f32 {
    autocorr.get(lag).copied().unwrap_or(0.0)
}

/// Returns the lag with the highest correlation in `min_lag..=max_lag`, but
/// only if at least one lag in that range is a local peak above
/// [`PEAK_RATIO`] of the best correlation seen *up to that lag*.
///
/// The peak test runs against the running maximum, so an early modest peak
/// can validate a later, larger non-peak maximum.
fn find_best_lag(autocorr: &[f32], min_lag: usize, max_lag: usize) -> Option<usize> {
    let mut best_offset = None;
    let mut best_correlation = 0.0_f32;
    let mut found_peak = false;

    for lag in min_lag..=max_lag {
        let correlation = correlation_at(autocorr, lag);
        if correlation > best_correlation {
            best_correlation = correlation;
            best_offset = Some(lag);
        }

        let previous = lag.checked_sub(1).map_or(0.0, |l| correlation_at(autocorr, l));
        let next = correlation_at(autocorr, lag + 1);
        if correlation > previous
            && correlation > next
            && correlation > PEAK_RATIO * best_correlation
        {
            found_peak = true;
        }
    }

    match best_offset {
        Some(lag) if lag > 0 && found_peak => Some(lag),
        _ => None,
    }
}

/// Fits a parabola through the correlation at `lag - 1`, `lag`, `lag + 1`
/// and returns the fractional lag of its vertex. `lag` must be non-zero.
fn refine_period(autocorr: &[f32], lag: usize) -> f32 {
    let x0 = correlation_at(autocorr, lag - 1);
    let x1 = correlation_at(autocorr, lag);
    let x2 = correlation_at(autocorr, lag + 1);

    let a = x0 - 2.0 * x1 + x2;
    let b = (x2 - x0) / 2.0;
    let shift = if a != 0.0 { -b / (2.0 * a) } else { 0.0 };

    lag as f32 + shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    const SAMPLE_RATE: u32 = 44100;
    const FRAME_SIZE: usize = 16384;

    fn sine(frequency: f32, amplitude: f32, len: usize) -> AudioFrame {
        let samples = (0..len)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        AudioFrame::new(samples, SAMPLE_RATE)
    }

    #[test]
    fn silence_has_no_pitch() {
        let frame = AudioFrame::new(vec![0.0; FRAME_SIZE], SAMPLE_RATE);
        assert_eq!(estimate(&frame), PitchEstimate::NoPitch);
    }

    #[test]
    fn quiet_sine_is_gated() {
        // RMS of a sine is amplitude / sqrt(2), well under the gate here.
        let frame = sine(220.0, 0.01, FRAME_SIZE);
        assert!(frame.rms() < SILENCE_RMS);
        assert_eq!(estimate(&frame), PitchEstimate::NoPitch);
    }

    #[test]
    fn degenerate_frames_have_no_pitch() {
        assert_eq!(estimate(&AudioFrame::new(vec![], SAMPLE_RATE)), PitchEstimate::NoPitch);
        assert_eq!(estimate(&AudioFrame::new(vec![0.9], SAMPLE_RATE)), PitchEstimate::NoPitch);
        assert_eq!(
            estimate(&AudioFrame::new(vec![0.5, -0.5], SAMPLE_RATE)),
            PitchEstimate::NoPitch
        );

        let no_rate = AudioFrame::new(sine(440.0, 0.8, FRAME_SIZE).samples().to_vec(), 0);
        assert_eq!(estimate(&no_rate), PitchEstimate::NoPitch);
    }

    #[test]
    fn constant_offset_has_no_periodicity() {
        let frame = AudioFrame::new(vec![0.5; 4096], SAMPLE_RATE);
        assert_eq!(estimate(&frame), PitchEstimate::NoPitch);
    }

    #[test]
    fn pure_sines_are_detected_within_one_percent() {
        for &expected in &[60.0, 82.41, 110.0, 196.0, 329.63, 440.0, 700.0, 1000.0] {
            let detected = estimate(&sine(expected, 0.8, FRAME_SIZE))
                .frequency()
                .unwrap_or_else(|| panic!("no pitch detected for {expected} Hz"));
            let error = (detected - expected).abs() / expected;
            assert!(
                error < 0.01,
                "expected {expected} Hz, detected {detected} Hz ({:.3}% off)",
                error * 100.0
            );
        }
    }

    #[test]
    fn from_frequency_rejects_invalid_values() {
        assert_eq!(PitchEstimate::from_frequency(f32::NAN), PitchEstimate::NoPitch);
        assert_eq!(PitchEstimate::from_frequency(f32::INFINITY), PitchEstimate::NoPitch);
        assert_eq!(PitchEstimate::from_frequency(0.0), PitchEstimate::NoPitch);
        assert_eq!(PitchEstimate::from_frequency(-3.0), PitchEstimate::NoPitch);
        assert_eq!(PitchEstimate::from_frequency(82.4).frequency(), Some(82.4));
    }

    #[test]
    fn trim_cuts_at_first_quiet_sample_from_each_side() {
        let signal = [0.9, 0.1, 0.5, 0.7, 0.6, 0.05, 0.8];
        // Forward scan stops at index 1, backward scan at index 5 (exclusive).
        assert_eq!(trim_edges(&signal, 0.2), &[0.1, 0.5, 0.7, 0.6]);
    }

    #[test]
    fn trim_keeps_bounds_when_edges_are_loud() {
        let signal = [0.9, 0.8, 0.7, 0.6, 0.5];
        // The end bound defaults to len - 1 and stays exclusive.
        assert_eq!(trim_edges(&signal, 0.2), &[0.9, 0.8, 0.7, 0.6]);
    }

    #[test]
    fn autocorrelation_stops_at_requested_lag() {
        let autocorr = autocorrelate(&[1.0, 2.0, 3.0], 1);
        assert_eq!(autocorr, vec![14.0, 8.0]);
        assert_eq!(autocorrelate(&[1.0, 2.0, 3.0], 10).len(), 3);
    }

    #[test]
    fn monotonic_correlation_has_no_peak() {
        let autocorr = [10.0, 9.0, 8.0, 7.0, 6.0, 5.0];
        assert_eq!(find_best_lag(&autocorr, 1, 4), None);
    }

    #[test]
    fn early_peak_validates_later_non_peak_maximum() {
        // Lag 2 is a local peak against the running best (5.0); lag 5 holds
        // the global maximum but is not itself a peak.
        let autocorr = [10.0, 1.0, 5.0, 2.0, 3.0, 20.0, 25.0];
        assert_eq!(find_best_lag(&autocorr, 1, 5), Some(5));
    }

    #[test]
    fn lag_zero_is_never_returned() {
        let autocorr = [5.0, 1.0, 3.0, 1.0];
        assert_eq!(find_best_lag(&autocorr, 0, 2), None);
    }

    #[test]
    fn parabolic_refinement() {
        // Symmetric neighbours put the vertex on the lag itself.
        assert_eq!(refine_period(&[1.0, 3.0, 1.0], 1), 1.0);
        // A heavier right neighbour pulls the vertex right.
        assert!(refine_period(&[1.0, 3.0, 2.0], 1) > 1.0);
        // A missing right neighbour reads as zero and pulls it left.
        assert!(refine_period(&[2.0, 3.0], 1) < 1.0);
    }
}
