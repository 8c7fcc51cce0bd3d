// src/config.rs
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Rejected configuration. The pipeline refuses to start with any of these.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("window size must be at least 2 frames, got {0}")]
    WindowTooSmall(usize),
    #[error("min valid frames must be between 2 and the window size ({window}), got {got}")]
    MinValidFrames { got: usize, window: usize },
    #[error("mouth hold frames must be at least 1")]
    ZeroHoldFrames,
    #[error("{name} must be a finite value > 0, got {value}")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{name} must be a finite value >= 0, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
}

/// Thresholds and timings for gesture recognition. Fixed at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Capacity N of the rolling landmark window.
    pub window_size: usize,
    pub min_valid_frames: usize,
    /// Frames below this hand confidence are ignored for classification.
    pub min_confidence: f64,
    /// Net normalized centroid travel needed for a wave.
    pub wave_displacement: f64,
    /// Per-step movement below this is treated as jitter.
    pub step_noise: f64,
    /// Share of non-jitter steps that must agree with the wave direction.
    pub min_direction_consistency: f64,
    pub mouth_radius: f64,
    pub mouth_hold_frames: u32,
    /// Vertical margin used by the finger-to-mouth hand pose heuristic.
    pub pose_margin: f64,
    /// Fingertip must be above this y for the pose heuristic (0 = top of frame).
    pub mouth_zone_max_y: f64,
    /// Consecutive hand-lost ticks tolerated before the window is dropped.
    pub max_gap_ticks: u32,
    pub priming_timeout_secs: f64,
    pub cooldown_secs: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            window_size: 12,
            min_valid_frames: 5,
            min_confidence: 0.5,
            wave_displacement: 0.12,
            step_noise: 0.01,
            min_direction_consistency: 0.5,
            mouth_radius: 0.08,
            mouth_hold_frames: 3,
            pose_margin: 0.05,
            mouth_zone_max_y: 0.5,
            max_gap_ticks: 5,
            priming_timeout_secs: 5.0,
            cooldown_secs: 1.5,
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < 2 {
            return Err(ConfigError::WindowTooSmall(self.window_size));
        }
        if self.min_valid_frames < 2 || self.min_valid_frames > self.window_size {
            return Err(ConfigError::MinValidFrames {
                got: self.min_valid_frames,
                window: self.window_size,
            });
        }
        if self.mouth_hold_frames == 0 {
            return Err(ConfigError::ZeroHoldFrames);
        }

        positive("wave_displacement", self.wave_displacement)?;
        positive("mouth_radius", self.mouth_radius)?;
        positive("priming_timeout_secs", self.priming_timeout_secs)?;
        non_negative("cooldown_secs", self.cooldown_secs)?;
        non_negative("step_noise", self.step_noise)?;
        non_negative("pose_margin", self.pose_margin)?;

        unit("min_confidence", self.min_confidence)?;
        unit("min_direction_consistency", self.min_direction_consistency)?;
        unit("mouth_zone_max_y", self.mouth_zone_max_y)?;
        Ok(())
    }

    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read gesture config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid gesture config {}", path.display()))?;
        config.validate()
            .with_context(|| format!("Rejected gesture config {}", path.display()))?;
        info!("Loaded gesture config from {}", path.display());
        Ok(config)
    }

    /// Explicit path if given, else the per-user config file if present, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            other => {
                debug!("No gesture config at {:?}, using defaults", other);
                Ok(Self::default())
            }
        }
    }
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { name, value })
    }
}

fn unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfUnitRange { name, value })
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "gesturereader", "gesture_reader")
        .map(|dirs| dirs.config_dir().join("gesture.json"))
}

/// Where landmarks come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    Camera { index: u32, detector: String },
    Simulated,
    Replay(PathBuf),
}

/// Application-level settings assembled from the command line.
#[derive(Debug, Clone)]
pub struct ReaderSettings {
    pub pdf_path: Option<PathBuf>,
    pub width: f32,
    pub height: f32,
    pub source: SourceKind,
    pub show_webcam: bool,
    pub render_dpi: u32,
    pub page_cache_size: usize,
    pub config_path: Option<PathBuf>,
    pub record_path: Option<PathBuf>,
    pub trace_path: Option<PathBuf>,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            pdf_path: None,
            width: 1200.0,
            height: 800.0,
            source: SourceKind::Camera {
                index: 0,
                detector: "mediapipe-hands".to_string(),
            },
            show_webcam: true,
            render_dpi: 144,
            page_cache_size: 8,
            config_path: None,
            record_path: None,
            trace_path: None,
        }
    }
}

impl ReaderSettings {
    pub const USAGE: &'static str = "Usage: gesture_reader [PDF] [--width N] [--height N] [--config FILE] \
[--replay FILE | --simulate | --camera N --detector CMD] [--record FILE] [--trace FILE] [--no-webcam]";

    /// Parse command-line arguments (without the program name).
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut settings = Self::default();
        let mut camera_index = 0;
        let mut detector = match &settings.source {
            SourceKind::Camera { detector, .. } => detector.clone(),
            _ => String::new(),
        };
        let mut explicit_source = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .with_context(|| format!("{} needs a value\n{}", flag, Self::USAGE))
            };
            match arg.as_str() {
                "--width" => settings.width = parse_number(&arg, &value(&arg)?)?,
                "--height" => settings.height = parse_number(&arg, &value(&arg)?)?,
                "--config" => settings.config_path = Some(PathBuf::from(value(&arg)?)),
                "--replay" => explicit_source = Some(SourceKind::Replay(PathBuf::from(value(&arg)?))),
                "--simulate" => explicit_source = Some(SourceKind::Simulated),
                "--camera" => camera_index = parse_number(&arg, &value(&arg)?)?,
                "--detector" => detector = value(&arg)?,
                "--record" => settings.record_path = Some(PathBuf::from(value(&arg)?)),
                "--trace" => settings.trace_path = Some(PathBuf::from(value(&arg)?)),
                "--no-webcam" => settings.show_webcam = false,
                flag if flag.starts_with("--") => {
                    anyhow::bail!("Unknown option {}\n{}", flag, Self::USAGE)
                }
                _ if settings.pdf_path.is_none() => settings.pdf_path = Some(PathBuf::from(&arg)),
                _ => anyhow::bail!("Unexpected argument {}\n{}", arg, Self::USAGE),
            }
        }

        settings.source = explicit_source.unwrap_or(SourceKind::Camera {
            index: camera_index,
            detector,
        });
        if settings.width < 400.0 || settings.height < 300.0 {
            anyhow::bail!("Window must be at least 400x300, got {}x{}", settings.width, settings.height);
        }
        Ok(settings)
    }
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("{} expects a number, got {:?}", flag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_arguments_means_camera_and_dialog() {
        let settings = ReaderSettings::from_args(Vec::new()).unwrap();
        assert!(settings.pdf_path.is_none());
        assert_eq!(settings.width, 1200.0);
        assert_eq!(
            settings.source,
            SourceKind::Camera { index: 0, detector: "mediapipe-hands".to_string() }
        );
    }

    #[test]
    fn parses_flags_and_pdf() {
        let settings = ReaderSettings::from_args(args(&[
            "book.pdf", "--width", "1400", "--camera", "2", "--detector", "python3 hands.py",
            "--trace", "trace.csv", "--no-webcam",
        ]))
        .unwrap();
        assert_eq!(settings.pdf_path, Some(PathBuf::from("book.pdf")));
        assert_eq!(settings.width, 1400.0);
        assert_eq!(
            settings.source,
            SourceKind::Camera { index: 2, detector: "python3 hands.py".to_string() }
        );
        assert_eq!(settings.trace_path, Some(PathBuf::from("trace.csv")));
        assert!(!settings.show_webcam);
    }

    #[test]
    fn replay_and_simulate_replace_camera() {
        let settings = ReaderSettings::from_args(args(&["--replay", "run.jsonl", "b.pdf"])).unwrap();
        assert_eq!(settings.source, SourceKind::Replay(PathBuf::from("run.jsonl")));
        let settings = ReaderSettings::from_args(args(&["--simulate"])).unwrap();
        assert_eq!(settings.source, SourceKind::Simulated);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(ReaderSettings::from_args(args(&["--width"])).is_err());
        assert!(ReaderSettings::from_args(args(&["--width", "wide"])).is_err());
        assert!(ReaderSettings::from_args(args(&["--bogus"])).is_err());
        assert!(ReaderSettings::from_args(args(&["a.pdf", "b.pdf"])).is_err());
        assert!(ReaderSettings::from_args(args(&["--height", "100"])).is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(GestureConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_window_and_timeouts() {
        let mut config = GestureConfig::default();
        config.window_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::WindowTooSmall(0)));

        let mut config = GestureConfig::default();
        config.priming_timeout_secs = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive { name: "priming_timeout_secs", .. })
        ));

        let mut config = GestureConfig::default();
        config.cooldown_secs = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Negative { .. })));

        let mut config = GestureConfig::default();
        config.min_valid_frames = config.window_size + 1;
        assert!(matches!(config.validate(), Err(ConfigError::MinValidFrames { .. })));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: GestureConfig =
            serde_json::from_str(r#"{ "window_size": 10, "cooldown_secs": 2.0 }"#).unwrap();
        assert_eq!(config.window_size, 10);
        assert_eq!(config.cooldown_secs, 2.0);
        assert_eq!(config.mouth_radius, GestureConfig::default().mouth_radius);
    }

    #[test]
    fn load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!("gesture_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{ "window_size": 1 }"#).unwrap();
        assert!(GestureConfig::load(&path).is_err());
        let _ = std::fs::remove_file(&path);
    }
}
