//! # Tuner Session Module
//!
//! One independent tuner: a [`TuningMapper`] plus a running flag, driven one
//! frame at a time by whatever scheduler owns the frame loop. The session
//! holds no device; capture is started and stopped alongside it.

use tracing::{debug, info, trace};

use crate::config::TunerConfig;
use crate::error::Result;
use crate::frame::AudioFrame;
use crate::pitch::{self, PitchEstimate};
use crate::source::FrameSource;
use crate::tuning::{TunerOutput, TuningMapper, TuningTarget};

#[derive(Debug, Clone, Default)]
pub struct TunerSession {
    mapper: TuningMapper,
    running: bool,
    frames_processed: u64,
}

impl TunerSession {
    /// A stopped session around `mapper`.
    pub fn new(mapper: TuningMapper) -> Self {
        Self {
            mapper,
            running: false,
            frames_processed: 0,
        }
    }

    pub fn from_config(config: &TunerConfig) -> Result<Self> {
        Ok(Self::new(config.mapper()?))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn target(&self) -> &TuningTarget {
        self.mapper.target()
    }

    pub fn mapper(&self) -> &TuningMapper {
        &self.mapper
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Begins accepting frames with fresh smoothing.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.mapper.reset();
        self.running = true;
        info!(tuning_target = %self.mapper.target(), "tuner session started");
    }

    /// Stops accepting frames and forgets the smoothed frequency.
    ///
    /// Returns the `Idle` output the renderer should show.
    pub fn stop(&mut self) -> TunerOutput {
        if self.running {
            info!(frames = self.frames_processed, "tuner session stopped");
        }
        self.running = false;
        self.mapper.reset();
        TunerOutput::Idle
    }

    /// Selects a new target; a real change restarts smoothing.
    pub fn set_target(&mut self, target: TuningTarget) {
        self.mapper.set_target(target);
    }

    /// Estimates the pitch of one frame and maps it to a reading.
    ///
    /// A stopped session ignores the frame and stays `Idle`.
    pub fn step(&mut self, frame: &AudioFrame) -> TunerOutput {
        if !self.running {
            return TunerOutput::Idle;
        }
        self.frames_processed += 1;

        let raw = pitch::estimate(frame);
        if let PitchEstimate::Frequency(f) = raw {
            trace!(frequency = f, rms = frame.rms(), "pitch estimate");
        }
        self.mapper.process(raw)
    }

    /// Pulls the newest frame from `source` and steps on it.
    ///
    /// Returns `None` when the source has nothing new, in which case the
    /// renderer should keep showing the previous output.
    pub fn poll<S: FrameSource + ?Sized>(&mut self, source: &mut S) -> Option<TunerOutput> {
        let frame = source.next_frame()?;
        if frame.sample_rate() != source.sample_rate() {
            debug!(
                frame_rate = frame.sample_rate(),
                source_rate = source.sample_rate(),
                "frame sample rate differs from source"
            );
        }
        Some(self.step(&frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SineSource;

    fn running_session() -> TunerSession {
        let mut session = TunerSession::from_config(&TunerConfig::default()).unwrap();
        session.start();
        session
    }

    #[test]
    fn stopped_session_is_idle() {
        let mut session = TunerSession::default();
        let mut source = SineSource::new(110.0, 0.8, 44100, 16384, 2048);
        assert_eq!(session.poll(&mut source), Some(TunerOutput::Idle));
        assert_eq!(session.frames_processed(), 0);
    }

    #[test]
    fn stop_resets_smoothing() {
        let mut session = running_session();
        let mut source = SineSource::new(110.0, 0.8, 44100, 16384, 2048);
        assert!(session.poll(&mut source).unwrap().reading().is_some());

        assert_eq!(session.stop(), TunerOutput::Idle);
        assert!(!session.is_running());
        assert_eq!(session.mapper().smoothed_frequency(), None);

        session.start();
        let silent = AudioFrame::new(vec![0.0; 16384], 44100);
        assert_eq!(session.step(&silent), TunerOutput::Idle);
    }

    #[test]
    fn silence_after_a_note_keeps_the_reading() {
        let mut session = running_session();
        let mut source = SineSource::new(220.0, 0.8, 44100, 16384, 2048);
        let note = session.poll(&mut source).unwrap();

        let silent = AudioFrame::new(vec![0.0; 16384], 44100);
        assert_eq!(session.step(&silent), note);
        assert_eq!(session.frames_processed(), 2);
    }
}
