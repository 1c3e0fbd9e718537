//! # Configuration Module
//!
//! Tuner settings, persisted as JSON. Every field is optional in the file;
//! missing fields take their defaults.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audio::CaptureSettings;
use crate::error::{Result, TunerError};
use crate::tuning::{
    standard_guitar, NoteNaming, StringTarget, TuningMapper, TuningTarget,
    DEFAULT_REFERENCE_PITCH,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Preferred capture sample rate in Hz
    pub sample_rate: u32,
    /// Samples per analysis frame. Must cover a few periods of the lowest
    /// note: 16384 samples at 44.1 kHz reach down to 60 Hz.
    pub frame_size: usize,
    /// New samples between frames
    pub hop_size: usize,
    /// A4 in Hz
    pub reference_pitch: f32,
    pub naming: NoteNaming,
    /// Fixed targets selectable by name
    pub targets: Vec<StringTarget>,
    /// Initial target: `auto` or one of `targets`
    pub target: String,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            frame_size: 16384,
            hop_size: 2048,
            reference_pitch: DEFAULT_REFERENCE_PITCH,
            naming: NoteNaming::English,
            targets: standard_guitar(),
            target: "auto".to_string(),
        }
    }
}

impl TunerConfig {
    /// Loads and validates a configuration file.
    ///
    /// # Arguments
    /// * `path` - JSON file to read (e.g., "tuner.json")
    ///
    /// # Returns
    /// * `Ok(TunerConfig)` - Parsed and validated configuration
    /// * `Err(TunerError)` - I/O, JSON, or validation error
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let io_err = |source| TunerError::Config {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let mut data = String::new();
        file.read_to_string(&mut data).map_err(io_err)?;

        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let io_err = |source| TunerError::Config {
            path: path.to_path_buf(),
            source,
        };

        let json_string = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path).map_err(io_err)?;
        file.write_all(json_string.as_bytes()).map_err(io_err)?;
        Ok(())
    }

    /// Checks ranges and that `target` names a known target.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(TunerError::InvalidConfig(msg));

        if self.sample_rate == 0 {
            return invalid("sample_rate must be positive".into());
        }
        if self.frame_size < 2 {
            return invalid(format!("frame_size must be at least 2, got {}", self.frame_size));
        }
        if self.hop_size == 0 || self.hop_size > self.frame_size {
            return invalid(format!(
                "hop_size must be within 1..={}, got {}",
                self.frame_size, self.hop_size
            ));
        }
        if !(self.reference_pitch.is_finite() && self.reference_pitch > 0.0) {
            return invalid(format!("reference_pitch must be positive, got {}", self.reference_pitch));
        }
        for t in &self.targets {
            if t.name.trim().is_empty() || t.name.eq_ignore_ascii_case("auto") {
                return invalid(format!("'{}' is not a usable target name", t.name));
            }
            if !(t.frequency.is_finite() && t.frequency > 0.0) {
                return invalid(format!("target {} has invalid frequency {}", t.name, t.frequency));
            }
        }
        self.initial_target().map(|_| ())
    }

    /// Resolves [`TunerConfig::target`] against the configured targets.
    pub fn initial_target(&self) -> Result<TuningTarget> {
        TuningTarget::parse(&self.target, &self.targets)
    }

    /// Resolves any target name against the configured targets.
    pub fn resolve_target(&self, name: &str) -> Result<TuningTarget> {
        TuningTarget::parse(name, &self.targets)
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            sample_rate: self.sample_rate,
            frame_size: self.frame_size,
            hop_size: self.hop_size,
        }
    }

    /// A fresh mapper for the initial target.
    pub fn mapper(&self) -> Result<TuningMapper> {
        Ok(TuningMapper::new(
            self.initial_target()?,
            self.reference_pitch,
            self.naming,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tuner-core-{}-{}", std::process::id(), name))
    }

    #[test]
    fn defaults_are_valid() {
        let config = TunerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.targets.len(), 6);
        assert_eq!(config.initial_target().unwrap(), TuningTarget::Auto);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: TunerConfig =
            serde_json::from_str(r#"{ "naming": "solfege", "target": "E2" }"#).unwrap();
        assert_eq!(config.naming, NoteNaming::Solfege);
        assert_eq!(config.frame_size, 16384);
        assert!(matches!(config.initial_target().unwrap(), TuningTarget::Fixed(t) if t.name == "E2"));
    }

    #[test]
    fn save_then_load() {
        let path = temp_path("save_then_load.json");
        let mut config = TunerConfig::default();
        config.reference_pitch = 442.0;
        config.targets.push(StringTarget::new("D2", 73.4162));
        config.target = "D2".into();

        config.save(&path).unwrap();
        let loaded = TunerConfig::load(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = TunerConfig::load(temp_path("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, TunerError::Config { .. }));
    }

    #[test]
    fn load_reports_malformed_json() {
        let path = temp_path("malformed.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = TunerConfig::load(&path).unwrap_err();
        let _ = std::fs::remove_file(&path);
        assert!(matches!(err, TunerError::ConfigFormat(_)));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let bad = [
            TunerConfig { sample_rate: 0, ..Default::default() },
            TunerConfig { frame_size: 1, ..Default::default() },
            TunerConfig { hop_size: 0, ..Default::default() },
            TunerConfig { hop_size: 20000, ..Default::default() },
            TunerConfig { reference_pitch: f32::NAN, ..Default::default() },
            TunerConfig { targets: vec![StringTarget::new("low", -1.0)], ..Default::default() },
            TunerConfig { targets: vec![StringTarget::new("Auto", 100.0)], ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(TunerError::InvalidConfig(_))),
                "{config:?} should be rejected"
            );
        }

        let unknown = TunerConfig { target: "Z9".into(), ..Default::default() };
        assert!(matches!(unknown.validate(), Err(TunerError::UnknownTarget(_))));
    }
}
