// src/source.rs - Landmark sources: camera + detector, simulation, recorded replay, no-hand fallback
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use image::DynamicImage;
use tracing::{info, warn};

use crate::config::SourceKind;
use crate::mediapipe_bridge::MediaPipeWrapper;
use crate::tracking::{HandSimulator, HandTracker, LandmarkFrame, PerformanceMetrics};
use crate::video::WebcamCapture;

/// One capture tick: landmarks plus the camera image for the preview, if any.
#[derive(Clone)]
pub struct CapturedFrame {
    pub landmarks: LandmarkFrame,
    pub preview: Option<DynamicImage>,
}

pub trait LandmarkSource {
    /// `Ok(None)` means the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>>;

    fn name(&self) -> &str;

    /// Live sources block until the next frame exists. Others are paced by
    /// the caller according to frame timestamps.
    fn is_live(&self) -> bool {
        false
    }

    fn metrics(&self) -> Option<PerformanceMetrics> {
        None
    }
}

pub struct CameraSource {
    camera: WebcamCapture,
    detector: MediaPipeWrapper,
    tracker: HandTracker,
    metrics: PerformanceMetrics,
    started: Instant,
}

impl CameraSource {
    pub fn new(camera: WebcamCapture, detector: MediaPipeWrapper) -> Self {
        Self {
            camera,
            detector,
            tracker: HandTracker::new(),
            metrics: PerformanceMetrics::default(),
            started: Instant::now(),
        }
    }
}

impl LandmarkSource for CameraSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        let image = self.camera.read_frame()?;
        let timestamp = self.started.elapsed().as_secs_f64();

        let start = Instant::now();
        let output = self.detector.process_image(&image)?;
        let landmarks = self.tracker.frame_from_detection(&output, timestamp);
        self.metrics.record(start.elapsed().as_secs_f32(), landmarks.hand.is_some());

        Ok(Some(CapturedFrame { landmarks, preview: Some(image) }))
    }

    fn name(&self) -> &str {
        "camera"
    }

    fn is_live(&self) -> bool {
        true
    }

    fn metrics(&self) -> Option<PerformanceMetrics> {
        Some(self.metrics.clone())
    }
}

pub struct SimulatedSource {
    simulator: HandSimulator,
}

impl SimulatedSource {
    pub fn new(fps: f64) -> Self {
        info!("Using simulated hand motion at {} fps", fps);
        Self { simulator: HandSimulator::new(fps) }
    }
}

impl LandmarkSource for SimulatedSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        Ok(Some(CapturedFrame {
            landmarks: self.simulator.next_frame(),
            preview: None,
        }))
    }

    fn name(&self) -> &str {
        "simulation"
    }
}

/// Stand-in when hand detection cannot run. Every frame reports no hand,
/// so the gate never sees a gesture. Keeps the camera preview if the
/// camera itself opened.
pub struct NoHandSource {
    camera: Option<WebcamCapture>,
    name: String,
    fps: f64,
    frame_index: u64,
    started: Instant,
}

impl NoHandSource {
    pub fn new(camera: Option<WebcamCapture>, reason: &str, fps: f64) -> Self {
        let name = match camera {
            Some(_) => format!("camera preview only, {}", reason),
            None => format!("no input, {}", reason),
        };
        Self {
            camera,
            name,
            fps,
            frame_index: 0,
            started: Instant::now(),
        }
    }
}

impl LandmarkSource for NoHandSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        let (timestamp, preview) = match self.camera.as_mut() {
            Some(camera) => {
                let image = camera.read_frame()?;
                (self.started.elapsed().as_secs_f64(), Some(image))
            }
            None => (self.frame_index as f64 / self.fps, None),
        };
        self.frame_index += 1;
        Ok(Some(CapturedFrame {
            landmarks: LandmarkFrame::no_hand(timestamp),
            preview,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_live(&self) -> bool {
        self.camera.is_some()
    }
}

/// Plays back a JSON-lines landmark recording, one `LandmarkFrame` per line.
pub struct ReplaySource {
    path: PathBuf,
    lines: std::io::Lines<BufReader<File>>,
    line_number: usize,
}

impl ReplaySource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Failed to open landmark recording {}", path.display()))?;
        info!("Replaying landmarks from {}", path.display());
        Ok(Self {
            path,
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }
}

impl Iterator for ReplaySource {
    type Item = Result<LandmarkFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<LandmarkFrame>(&line).with_context(|| {
                format!("{}:{}: malformed landmark frame", self.path.display(), self.line_number)
            });
            return Some(parsed);
        }
    }
}

impl LandmarkSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
        match self.next() {
            None => {
                info!("Replay of {} finished after {} lines", self.path.display(), self.line_number);
                Ok(None)
            }
            Some(frame) => Ok(Some(CapturedFrame { landmarks: frame?, preview: None })),
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Frame rate of the simulated hand, matching the camera request.
pub const SIMULATION_FPS: f64 = 30.0;

/// Build the configured source. Without a working camera or detector the
/// reader keeps running on a source that never reports a hand; only
/// `--simulate` produces scripted gestures.
pub fn open_source(kind: &SourceKind) -> Result<Box<dyn LandmarkSource>> {
    match kind {
        SourceKind::Camera { index, detector } => Ok(open_camera(*index, detector)),
        SourceKind::Simulated => Ok(Box::new(SimulatedSource::new(SIMULATION_FPS))),
        SourceKind::Replay(path) => Ok(Box::new(ReplaySource::open(path)?)),
    }
}

fn open_camera(index: u32, detector_command: &str) -> Box<dyn LandmarkSource> {
    let camera = match WebcamCapture::open(index, true) {
        Ok(camera) => camera,
        Err(e) => {
            warn!("Camera unavailable ({:#}), gestures disabled", e);
            return Box::new(NoHandSource::new(None, "camera unavailable", SIMULATION_FPS));
        }
    };
    match MediaPipeWrapper::new(detector_command) {
        Ok(detector) => Box::new(CameraSource::new(camera, detector)),
        Err(e) => {
            warn!("Hand detector '{}' unavailable ({:#}), gestures disabled", detector_command, e);
            Box::new(NoHandSource::new(Some(camera), "detector unavailable", SIMULATION_FPS))
        }
    }
}
