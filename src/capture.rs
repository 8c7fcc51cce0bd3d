// src/capture.rs - Background capture thread handing frames to the UI thread
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{error, info, warn};

use crate::data::LandmarkRecorder;
use crate::source::{CapturedFrame, LandmarkSource};
use crate::tracking::PerformanceMetrics;

/// Single-slot mailbox. A new frame replaces an unconsumed one, so the
/// consumer always sees the latest observation and never falls behind.
#[derive(Default)]
pub struct LatestFrame {
    slot: Mutex<Option<CapturedFrame>>,
    dropped: AtomicU64,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, frame: CapturedFrame) {
        let mut slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.replace(frame).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn take(&self) -> Option<CapturedFrame> {
        match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStatus {
    Starting,
    Running(String),
    Finished,
    Failed(String),
}

/// Shared between the capture thread and the UI.
pub struct CaptureShared {
    pub latest: LatestFrame,
    stop: AtomicBool,
    status: Mutex<CaptureStatus>,
    metrics: Mutex<Option<PerformanceMetrics>>,
}

impl CaptureShared {
    fn new() -> Self {
        Self {
            latest: LatestFrame::new(),
            stop: AtomicBool::new(false),
            status: Mutex::new(CaptureStatus::Starting),
            metrics: Mutex::new(None),
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
            .lock()
            .map(|s| s.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }

    fn set_status(&self, status: CaptureStatus) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }

    pub fn metrics(&self) -> Option<PerformanceMetrics> {
        self.metrics.lock().ok().and_then(|m| m.clone())
    }
}

pub struct CaptureHandle {
    shared: Arc<CaptureShared>,
    thread: Option<JoinHandle<()>>,
}

impl CaptureHandle {
    /// Starts capturing. The source is built on the capture thread because
    /// camera handles cannot move between threads.
    pub fn spawn<F>(open_source: F, recorder: Option<LandmarkRecorder>) -> Self
    where
        F: FnOnce() -> Result<Box<dyn LandmarkSource>> + Send + 'static,
    {
        let shared = Arc::new(CaptureShared::new());
        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("capture".to_string())
            .spawn(move || run_capture(open_source, recorder, &thread_shared));

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to start capture thread: {}", e);
                shared.set_status(CaptureStatus::Failed(e.to_string()));
                None
            }
        };
        Self { shared, thread }
    }

    pub fn shared(&self) -> &CaptureShared {
        &self.shared
    }

    pub fn take_latest(&mut self) -> Option<CapturedFrame> {
        let frame = self.shared.latest.take();
        if self.thread.as_ref().is_some_and(|t| t.is_finished()) {
            self.join();
        }
        frame
    }

    pub fn stop(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked");
                self.shared
                    .set_status(CaptureStatus::Failed("capture thread panicked".to_string()));
            }
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture<F>(open_source: F, mut recorder: Option<LandmarkRecorder>, shared: &CaptureShared)
where
    F: FnOnce() -> Result<Box<dyn LandmarkSource>>,
{
    let mut source = match open_source() {
        Ok(source) => source,
        Err(e) => {
            error!("Failed to open landmark source: {:#}", e);
            shared.set_status(CaptureStatus::Failed(format!("{:#}", e)));
            return;
        }
    };
    info!("Capture running from {}", source.name());
    shared.set_status(CaptureStatus::Running(source.name().to_string()));

    let started = Instant::now();
    let mut first_timestamp = None;

    while !shared.stop.load(Ordering::Relaxed) {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                shared.set_status(CaptureStatus::Finished);
                break;
            }
            Err(e) => {
                error!("Capture failed: {:#}", e);
                shared.set_status(CaptureStatus::Failed(format!("{:#}", e)));
                break;
            }
        };

        if !source.is_live() {
            // Replay at the recorded speed.
            let t = frame.landmarks.timestamp;
            let origin = *first_timestamp.get_or_insert(t);
            let due = Duration::try_from_secs_f64((t - origin).max(0.0)).unwrap_or(Duration::MAX);
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                thread::sleep(wait.min(Duration::from_secs(1)));
            }
        }

        let record_error = recorder
            .as_mut()
            .and_then(|r| r.record(&frame.landmarks).err());
        if let Some(e) = record_error {
            warn!("Landmark recording stopped: {:#}", e);
            recorder = None;
        }

        if let Some(metrics) = source.metrics() {
            if let Ok(mut m) = shared.metrics.lock() {
                *m = Some(metrics);
            }
        }
        shared.latest.put(frame);
    }

    if let Some(recorder) = recorder {
        if let Err(e) = recorder.finish() {
            warn!("Failed to finish landmark recording: {:#}", e);
        }
    }
    info!("Capture stopped, {} stale frame(s) dropped", shared.latest.dropped());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ReplaySource, SimulatedSource};
    use crate::tracking::LandmarkFrame;

    fn frame(t: f64) -> CapturedFrame {
        CapturedFrame { landmarks: LandmarkFrame::no_hand(t), preview: None }
    }

    #[test]
    fn mailbox_keeps_only_latest() {
        let latest = LatestFrame::new();
        assert!(latest.take().is_none());
        latest.put(frame(1.0));
        latest.put(frame(2.0));
        latest.put(frame(3.0));
        assert_eq!(latest.dropped(), 2);
        assert_eq!(latest.take().map(|f| f.landmarks.timestamp), Some(3.0));
        assert!(latest.take().is_none());
    }

    #[test]
    fn capture_thread_delivers_and_stops() {
        let mut handle = CaptureHandle::spawn(
            || Ok(Box::new(SimulatedSource::new(60.0)) as Box<dyn LandmarkSource>),
            None,
        );
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut got = None;
        while got.is_none() && Instant::now() < deadline {
            got = handle.take_latest();
            thread::sleep(Duration::from_millis(5));
        }
        assert!(got.is_some());
        assert_eq!(handle.shared().status(), CaptureStatus::Running("simulation".to_string()));
        handle.stop();
    }

    struct PanickingSource;

    impl LandmarkSource for PanickingSource {
        fn next_frame(&mut self) -> Result<Option<CapturedFrame>> {
            panic!("detector crashed");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn wait_for(handle: &mut CaptureHandle, done: impl Fn(&CaptureStatus) -> bool) -> CaptureStatus {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            handle.take_latest();
            let status = handle.shared().status();
            if done(&status) || Instant::now() >= deadline {
                return status;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn panicking_source_is_reported_as_failed() {
        let mut handle = CaptureHandle::spawn(
            || Ok(Box::new(PanickingSource) as Box<dyn LandmarkSource>),
            None,
        );
        let status = wait_for(&mut handle, |s| matches!(s, CaptureStatus::Failed(_)));
        assert_eq!(status, CaptureStatus::Failed("capture thread panicked".to_string()));
        handle.stop();
    }

    #[test]
    fn replay_with_huge_timestamps_still_finishes() {
        let path = std::env::temp_dir().join(format!("huge_{}.jsonl", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{\"timestamp\":0.0}\n{\"timestamp\":1e300}\n").unwrap();
        let replay_path = path.clone();
        let mut handle = CaptureHandle::spawn(
            move || Ok(Box::new(ReplaySource::open(&replay_path)?) as Box<dyn LandmarkSource>),
            None,
        );
        let status = wait_for(&mut handle, |s| *s == CaptureStatus::Finished);
        assert_eq!(status, CaptureStatus::Finished);
        handle.stop();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn failing_source_reports_status() {
        let mut handle = CaptureHandle::spawn(|| Err(anyhow::anyhow!("no camera")), None);
        handle.stop();
        assert!(matches!(handle.shared().status(), CaptureStatus::Failed(msg) if msg.contains("no camera")));
    }
}
