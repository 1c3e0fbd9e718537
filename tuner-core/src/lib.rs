// tuner-core/src/lib.rs

//! The core logic for the instrument tuner.
//! This crate is responsible for pitch estimation, smoothing, and mapping a
//! frequency onto a musical reading. Apart from the optional live capture in
//! [`audio`], it is completely headless and does no I/O.
//!
//! The per-frame pipeline is
//! [`AudioFrame`] → [`pitch::estimate`] → [`TuningMapper::process`] → [`TunerOutput`],
//! wrapped by [`TunerSession`] for a frame loop.

pub mod audio;
pub mod config;
pub mod error;
pub mod frame;
pub mod pitch;
pub mod session;
pub mod source;
pub mod tuning;

pub use audio::{start_audio_capture, Capture, CaptureSettings};
pub use config::TunerConfig;
pub use error::{Result, TunerError};
pub use frame::AudioFrame;
pub use pitch::{estimate, PitchEstimate};
pub use session::TunerSession;
pub use source::{FrameSource, SineSource, SlidingWindow};
pub use tuning::{
    NoteNaming, SmoothingState, StringTarget, TunerOutput, TuningMapper, TuningReading,
    TuningTarget,
};
