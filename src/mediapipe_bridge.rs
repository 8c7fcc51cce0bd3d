// src/mediapipe_bridge.rs - Hand/face landmark detector running as a helper process
//
// Protocol, one exchange per frame:
//   -> "<width> <height>\n" followed by width*height*3 bytes of RGB
//   <- one JSON line: {"hands":[{"landmarks":[[x,y,z],...],"score":0.9}],"face_anchor":[x,y]}
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectedHand {
    pub landmarks: Vec<[f64; 3]>,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DetectorOutput {
    #[serde(default)]
    pub hands: Vec<DetectedHand>,
    #[serde(default)]
    pub face_anchor: Option<[f64; 2]>,
}

impl DetectorOutput {
    pub fn parse(line: &str) -> Result<Self> {
        serde_json::from_str(line.trim()).context("Malformed detector output")
    }
}

pub struct MediaPipeWrapper {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl MediaPipeWrapper {
    /// Spawn the detector. `command` is split on whitespace into program and arguments.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next().ok_or_else(|| anyhow!("Empty detector command"))?;

        let mut child = Command::new(program)
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start landmark detector `{}`", command))?;

        let stdin = child.stdin.take().ok_or_else(|| anyhow!("Detector stdin unavailable"))?;
        let stdout = child.stdout.take().ok_or_else(|| anyhow!("Detector stdout unavailable"))?;
        info!("Landmark detector `{}` started (pid {})", command, child.id());

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            line: String::new(),
        })
    }

    pub fn process_image(&mut self, frame: &DynamicImage) -> Result<DetectorOutput> {
        let rgb = frame.to_rgb8();
        let (width, height) = rgb.dimensions();

        writeln!(self.stdin, "{} {}", width, height).context("Detector closed its input")?;
        self.stdin.write_all(rgb.as_raw()).context("Detector closed its input")?;
        self.stdin.flush()?;

        self.line.clear();
        let read = self.stdout.read_line(&mut self.line).context("Failed to read detector output")?;
        if read == 0 {
            return Err(anyhow!("Landmark detector exited"));
        }
        let output = DetectorOutput::parse(&self.line)?;
        debug!("Detector returned {} hand(s)", output.hands.len());
        Ok(output)
    }
}

impl Drop for MediaPipeWrapper {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop landmark detector: {}", e);
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_detector_line() {
        let line = r#"{"hands":[{"landmarks":[[0.1,0.2,0.0],[0.3,0.4,-0.1]],"score":0.87}],"face_anchor":[0.5,0.35]}"#;
        let output = DetectorOutput::parse(line).unwrap();
        assert_eq!(output.hands.len(), 1);
        assert_eq!(output.hands[0].landmarks[1], [0.3, 0.4, -0.1]);
        assert_eq!(output.hands[0].score, 0.87);
        assert_eq!(output.face_anchor, Some([0.5, 0.35]));
    }

    #[test]
    fn missing_fields_default_to_nothing_seen() {
        let output = DetectorOutput::parse("{}\n").unwrap();
        assert!(output.hands.is_empty());
        assert!(output.face_anchor.is_none());

        let output = DetectorOutput::parse(r#"{"face_anchor":null}"#).unwrap();
        assert!(output.face_anchor.is_none());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(DetectorOutput::parse("not json").is_err());
    }

    #[test]
    fn missing_program_fails_to_start() {
        assert!(MediaPipeWrapper::new("").is_err());
        assert!(MediaPipeWrapper::new("definitely-not-a-real-detector-binary-4f2a").is_err());
    }
}
