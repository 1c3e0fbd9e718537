//! # Musical Tuning Module
//!
//! Turns a noisy stream of pitch estimates into a stable musical reading.
//!
//! ## Features
//! - Exponential smoothing of the detected frequency
//! - Nearest chromatic note in equal temperament (A4 = 440 Hz by default)
//! - Cent deviation against the nearest note or a fixed string target
//! - Needle angle for a ±50 cent meter
//! - English (C, D, E...) or solfège (Do, Ré, Mi...) note names

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TunerError};
use crate::pitch::PitchEstimate;

/// Weight given to each new estimate by the moving average.
pub const SMOOTHING_WEIGHT: f32 = 0.15;

/// Weight kept from the previous smoothed value.
const SMOOTHING_RETAIN: f32 = 0.85;

/// Default concert pitch for A4 in Hz.
pub const DEFAULT_REFERENCE_PITCH: f32 = 440.0;

/// Cent deviation at which the needle reaches full deflection.
pub const NEEDLE_RANGE_CENTS: f32 = 50.0;

/// Needle deflection in degrees at [`NEEDLE_RANGE_CENTS`].
pub const NEEDLE_MAX_ANGLE: f32 = 45.0;

const ENGLISH_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const SOLFEGE_NAMES: [&str; 12] = [
    "Do", "Do#", "Ré", "Ré#", "Mi", "Fa", "Fa#", "Sol", "Sol#", "La", "La#", "Si",
];

/// Standard six-string guitar tuning, low E to high E.
static STANDARD_GUITAR: Lazy<Vec<StringTarget>> = Lazy::new(|| {
    [
        ("E2", 82.4069),
        ("A2", 110.0000),
        ("D3", 146.8324),
        ("G3", 195.9977),
        ("B3", 246.9417),
        ("E4", 329.6276),
    ]
    .into_iter()
    .map(|(name, frequency)| StringTarget::new(name, frequency))
    .collect()
});

/// Returns the six standard guitar string targets (EADGBE).
pub fn standard_guitar() -> Vec<StringTarget> {
    STANDARD_GUITAR.clone()
}

/// Naming convention for the twelve pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteNaming {
    #[default]
    English,
    Solfege,
}

impl NoteNaming {
    /// Name of pitch class `index` (0 = C / Do). Wraps modulo 12.
    pub fn pitch_class(self, index: usize) -> &'static str {
        let names = match self {
            Self::English => &ENGLISH_NAMES,
            Self::Solfege => &SOLFEGE_NAMES,
        };
        names[index % 12]
    }
}

impl FromStr for NoteNaming {
    type Err = TunerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "english" => Ok(Self::English),
            "solfege" | "solfège" => Ok(Self::Solfege),
            other => Err(TunerError::InvalidConfig(format!(
                "unknown note naming '{other}' (expected 'english' or 'solfege')"
            ))),
        }
    }
}

/// A named fixed reference pitch, e.g. one string of an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringTarget {
    pub name: String,
    /// Target frequency in Hz
    pub frequency: f32,
}

impl StringTarget {
    pub fn new(name: impl Into<String>, frequency: f32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// What the tuner measures cents against.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TuningTarget {
    /// Nearest chromatic note.
    #[default]
    Auto,
    /// A fixed string pitch.
    Fixed(StringTarget),
}

impl TuningTarget {
    /// Resolves `auto` or the name of one of `targets` (case-insensitive).
    pub fn parse(name: &str, targets: &[StringTarget]) -> Result<Self> {
        if name.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        targets
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| Self::Fixed(t.clone()))
            .ok_or_else(|| TunerError::UnknownTarget(name.to_string()))
    }
}

impl fmt::Display for TuningTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(t) => write!(f, "{} ({:.2} Hz)", t.name, t.frequency),
        }
    }
}

/// The nearest equal-tempered note to some frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// MIDI note number (69 = A4). May be negative for sub-audio input.
    pub midi: i32,
    /// Pitch class plus octave, e.g. "A2" or "La2".
    pub name: String,
    /// Exact equal-tempered frequency of the note in Hz
    pub exact_frequency: f32,
    /// Deviation of the input from `exact_frequency`
    pub cents: f32,
}

/// Finds the nearest chromatic note to `frequency`.
///
/// # Arguments
/// * `frequency` - Input frequency in Hz
/// * `reference_pitch` - Frequency of A4 in Hz
/// * `naming` - Note naming convention
///
/// # Returns
/// * `Some(note)` - Nearest note and the cent deviation from it
/// * `None` - `frequency` or `reference_pitch` is non-finite or not positive
pub fn frequency_to_note(frequency: f32, reference_pitch: f32, naming: NoteNaming) -> Option<Note> {
    let valid = |f: f32| f.is_finite() && f > 0.0;
    if !valid(frequency) || !valid(reference_pitch) {
        return None;
    }

    // Round half up, not half away from zero.
    let semitones = (12.0 * (frequency / reference_pitch).log2() + 0.5).floor() as i32;
    let midi = semitones + 69;
    let pitch_class = midi.rem_euclid(12) as usize;
    let octave = midi.div_euclid(12) - 1;
    let exact_frequency = reference_pitch * 2.0_f32.powf(semitones as f32 / 12.0);

    Some(Note {
        midi,
        name: format!("{}{}", naming.pitch_class(pitch_class), octave),
        exact_frequency,
        cents: cents_between(frequency, exact_frequency),
    })
}

/// Calculates the deviation from a target frequency in cents.
///
/// - 100 cents = 1 semitone
/// - 1200 cents = 1 octave
/// - Positive values are sharp, negative values are flat
pub fn cents_between(frequency: f32, target_frequency: f32) -> f32 {
    1200.0 * (frequency / target_frequency).log2()
}

/// Maps cents onto the meter: clamped to ±50 cents, scaled to ±45°.
pub fn cents_to_needle_angle(cents: f32) -> f32 {
    cents.clamp(-NEEDLE_RANGE_CENTS, NEEDLE_RANGE_CENTS) / NEEDLE_RANGE_CENTS * NEEDLE_MAX_ANGLE
}

/// Exponential moving average of the detected frequency.
///
/// Starts unset. The first estimate seeds it; later estimates are blended in
/// with [`SMOOTHING_WEIGHT`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SmoothingState {
    value: Option<f32>,
}

impl SmoothingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current smoothed frequency, `None` while unset.
    pub fn current(&self) -> Option<f32> {
        self.value
    }

    pub fn is_unset(&self) -> bool {
        self.value.is_none()
    }

    /// Folds a new estimate in and returns the smoothed frequency.
    pub fn update(&mut self, frequency: f32) -> f32 {
        let next = match self.value {
            Some(current) => current * SMOOTHING_RETAIN + frequency * SMOOTHING_WEIGHT,
            None => frequency,
        };
        self.value = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

/// One frame's musical reading, unrounded. Rounding happens in `Display`.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningReading {
    /// Note name in auto mode, target name in fixed mode.
    pub label: String,
    /// Smoothed frequency in Hz
    pub frequency: f32,
    /// Signed deviation in cents, not clamped
    pub cents: f32,
    /// Needle rotation in degrees, within ±[`NEEDLE_MAX_ANGLE`]
    pub needle_angle: f32,
}

impl TuningReading {
    pub fn new(label: impl Into<String>, frequency: f32, cents: f32) -> Self {
        Self {
            label: label.into(),
            frequency,
            cents,
            needle_angle: cents_to_needle_angle(cents),
        }
    }

    /// True when the reading is within `tolerance` cents of the target.
    pub fn is_in_tune(&self, tolerance: f32) -> bool {
        self.cents.abs() <= tolerance
    }
}

impl fmt::Display for TuningReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<5} {:>8.2} Hz {:>6.1} cts",
            self.label, self.frequency, self.cents
        )
    }
}

/// What the renderer shows for one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TunerOutput {
    /// Waiting placeholder: no label, no frequency, needle centred.
    #[default]
    Idle,
    Reading(TuningReading),
}

impl TunerOutput {
    pub fn reading(&self) -> Option<&TuningReading> {
        match self {
            Self::Reading(r) => Some(r),
            Self::Idle => None,
        }
    }

    pub fn needle_angle(&self) -> f32 {
        self.reading().map_or(0.0, |r| r.needle_angle)
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for TunerOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reading(r) => fmt::Display::fmt(r, f),
            Self::Idle => write!(f, "{:<5} {:>8} Hz {:>6} cts", "--", "--", "--"),
        }
    }
}

/// Reads `frequency` against `target` without touching any smoothing state.
///
/// Returns [`TunerOutput::Idle`] when the cents value cannot be computed
/// (non-positive frequency or target).
pub fn read_frequency(
    frequency: f32,
    target: &TuningTarget,
    reference_pitch: f32,
    naming: NoteNaming,
) -> TunerOutput {
    let reading = match target {
        TuningTarget::Auto => frequency_to_note(frequency, reference_pitch, naming)
            .map(|note| TuningReading::new(note.name, frequency, note.cents)),
        TuningTarget::Fixed(t) => {
            let cents = cents_between(frequency, t.frequency);
            cents
                .is_finite()
                .then(|| TuningReading::new(t.name.clone(), frequency, cents))
        }
    };
    reading.map_or(TunerOutput::Idle, TunerOutput::Reading)
}

/// Smooths pitch estimates and maps them to readings for the current target.
///
/// Owns its [`SmoothingState`]; the state resets whenever the target changes
/// or [`TuningMapper::reset`] is called.
#[derive(Debug, Clone)]
pub struct TuningMapper {
    state: SmoothingState,
    target: TuningTarget,
    reference_pitch: f32,
    naming: NoteNaming,
}

impl Default for TuningMapper {
    fn default() -> Self {
        Self::new(TuningTarget::Auto, DEFAULT_REFERENCE_PITCH, NoteNaming::default())
    }
}

impl TuningMapper {
    pub fn new(target: TuningTarget, reference_pitch: f32, naming: NoteNaming) -> Self {
        Self {
            state: SmoothingState::new(),
            target,
            reference_pitch,
            naming,
        }
    }

    pub fn target(&self) -> &TuningTarget {
        &self.target
    }

    pub fn naming(&self) -> NoteNaming {
        self.naming
    }

    pub fn reference_pitch(&self) -> f32 {
        self.reference_pitch
    }

    pub fn smoothed_frequency(&self) -> Option<f32> {
        self.state.current()
    }

    /// Switches target. Smoothing restarts if the target actually changed.
    pub fn set_target(&mut self, target: TuningTarget) {
        if target != self.target {
            debug!(from = %self.target, to = %target, "tuning target changed, resetting smoothing");
            self.target = target;
            self.state.reset();
        }
    }

    /// Forgets the smoothed frequency, e.g. when capture stops.
    pub fn reset(&mut self) {
        if !self.state.is_unset() {
            debug!("smoothing state reset");
        }
        self.state.reset();
    }

    /// Processes one frame's estimate.
    ///
    /// A missing pitch leaves the smoothed frequency as it was, so a short
    /// dropout keeps showing the last reading. Output is `Idle` only while
    /// nothing has been smoothed yet.
    pub fn process(&mut self, raw: PitchEstimate) -> TunerOutput {
        let smoothed = match raw.frequency() {
            Some(frequency) => Some(self.state.update(frequency)),
            None => self.state.current(),
        };

        match smoothed {
            Some(frequency) => {
                read_frequency(frequency, &self.target, self.reference_pitch, self.naming)
            }
            None => TunerOutput::Idle,
        }
    }
}
