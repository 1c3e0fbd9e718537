//! # Error Module
//!
//! Errors that can cross the `tuner-core` boundary. Only the device layer and
//! the configuration layer produce them: pitch estimation and tuning never
//! fail, they collapse abnormal input to `NoPitch` / `Idle` instead.

use std::path::PathBuf;

/// Result alias carrying [`TunerError`].
pub type Result<T> = std::result::Result<T, TunerError>;

#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// The host reports no default input device.
    #[error("no input device available")]
    NoInputDevice,
    /// The device exposes no mono f32 input configuration.
    #[error("no suitable f32 mono input format found")]
    NoSupportedConfig,
    /// Querying or configuring the device failed (permission denied, device unplugged...).
    #[error("audio device error: {0}")]
    Device(String),
    /// Building, starting or stopping the input stream failed.
    #[error("audio stream error: {0}")]
    Stream(String),
    /// Reading or writing a configuration file failed.
    #[error("could not access config file {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A configuration file is not valid JSON for [`crate::config::TunerConfig`].
    #[error("malformed config: {0}")]
    ConfigFormat(#[from] serde_json::Error),
    /// A configuration value is out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A target name matched neither `auto` nor any configured string.
    #[error("unknown tuning target '{0}'")]
    UnknownTarget(String),
}

impl From<cpal::DevicesError> for TunerError {
    fn from(err: cpal::DevicesError) -> Self {
        Self::Device(err.to_string())
    }
}

impl From<cpal::DeviceNameError> for TunerError {
    fn from(err: cpal::DeviceNameError) -> Self {
        Self::Device(err.to_string())
    }
}

impl From<cpal::SupportedStreamConfigsError> for TunerError {
    fn from(err: cpal::SupportedStreamConfigsError) -> Self {
        Self::Device(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for TunerError {
    fn from(err: cpal::BuildStreamError) -> Self {
        Self::Stream(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for TunerError {
    fn from(err: cpal::PlayStreamError) -> Self {
        Self::Stream(err.to_string())
    }
}

impl From<cpal::PauseStreamError> for TunerError {
    fn from(err: cpal::PauseStreamError) -> Self {
        Self::Stream(err.to_string())
    }
}
