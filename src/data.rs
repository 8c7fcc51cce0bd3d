// src/data.rs - Diagnostic exports: gesture trace CSV and landmark recordings
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::pipeline::TickOutcome;
use crate::gate::GateState;
use crate::tracking::LandmarkFrame;

#[derive(Debug, Serialize)]
struct TraceRecord {
    frame: u64,
    timestamp: f64,
    event: &'static str,
    strength: f64,
    state: &'static str,
    primed_until: Option<f64>,
    cooldown_until: Option<f64>,
    command: Option<&'static str>,
}

/// Appends one CSV row per pipeline tick. Write-only; nothing reads it back.
pub struct GestureTraceExporter {
    path: PathBuf,
    writer: Writer<File>,
    frames: u64,
    commands: u64,
}

impl GestureTraceExporter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)
            .with_context(|| format!("Failed to create trace file {}", path.display()))?;
        info!("Writing gesture trace to {}", path.display());
        Ok(Self {
            path,
            writer: Writer::from_writer(file),
            frames: 0,
            commands: 0,
        })
    }

    /// `<dir>/gesture_trace_<date>_<time>.csv`
    pub fn in_directory(dir: impl AsRef<Path>) -> Result<Self> {
        let name = format!("gesture_trace_{}.csv", Local::now().format("%Y%m%d_%H%M%S"));
        Self::create(dir.as_ref().join(name))
    }

    /// A directory gets a timestamped file inside it; anything else is the file itself.
    pub fn for_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::in_directory(path)
        } else {
            Self::create(path)
        }
    }

    pub fn add_tick(&mut self, outcome: &TickOutcome, state: GateState) -> Result<()> {
        let record = TraceRecord {
            frame: self.frames,
            timestamp: outcome.event.timestamp,
            event: outcome.event.kind.as_str(),
            strength: outcome.event.strength,
            state: state.label(),
            primed_until: state.priming_deadline(),
            cooldown_until: state.cooldown_deadline(),
            command: outcome.command.map(|c| c.as_str()),
        };
        self.writer.serialize(record)?;
        self.frames += 1;
        if outcome.command.is_some() {
            self.commands += 1;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        info!(
            "Gesture trace {}: {} ticks, {} page turns",
            self.path.display(),
            self.frames,
            self.commands
        );
        Ok(self.path)
    }
}

/// Writes captured landmark frames as JSON lines, replayable as a source.
pub struct LandmarkRecorder {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: u64,
}

impl LandmarkRecorder {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create landmark recording {}", path.display()))?;
        info!("Recording landmarks to {}", path.display());
        Ok(Self { path, writer: BufWriter::new(file), frames: 0 })
    }

    pub fn record(&mut self, frame: &LandmarkFrame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.frames += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<PathBuf> {
        self.writer.flush()?;
        info!("Recorded {} landmark frames to {}", self.frames, self.path.display());
        Ok(self.path)
    }
}
