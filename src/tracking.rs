// src/tracking.rs - Hand landmark frames and hand selection
use std::collections::VecDeque;

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use crate::mediapipe_bridge::DetectorOutput;

// MediaPipe hand landmark indices
pub const WRIST: usize = 0;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_TIP: usize = 12;
pub const RING_TIP: usize = 16;
pub const PINKY_TIP: usize = 20;
pub const HAND_LANDMARK_COUNT: usize = 21;

/// One tracked hand: up to 21 normalized keypoints plus detector confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandPose {
    pub landmarks: Vec<Vector3<f64>>,
    pub confidence: f64,
}

impl HandPose {
    pub fn new(landmarks: Vec<Vector3<f64>>, confidence: f64) -> Self {
        Self { landmarks, confidence }
    }

    pub fn landmark(&self, index: usize) -> Option<&Vector3<f64>> {
        self.landmarks.get(index)
    }

    /// Mean of all keypoints in the image plane.
    pub fn centroid(&self) -> Option<Vector2<f64>> {
        if self.landmarks.is_empty() {
            return None;
        }
        let sum = self.landmarks.iter().fold(Vector2::zeros(), |acc, lm| acc + lm.xy());
        Some(sum / self.landmarks.len() as f64)
    }

    pub fn is_complete(&self) -> bool {
        self.landmarks.len() >= HAND_LANDMARK_COUNT
    }
}

/// Everything the landmark source observed in one capture tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Seconds since the session started.
    pub timestamp: f64,
    #[serde(default)]
    pub hand: Option<HandPose>,
    /// Mouth reference point, when a face detector supplies one.
    #[serde(default)]
    pub face_anchor: Option<Vector2<f64>>,
}

impl LandmarkFrame {
    pub fn no_hand(timestamp: f64) -> Self {
        Self { timestamp, hand: None, face_anchor: None }
    }

    pub fn with_hand(timestamp: f64, hand: HandPose) -> Self {
        Self { timestamp, hand: Some(hand), face_anchor: None }
    }

    pub fn with_face_anchor(mut self, anchor: Vector2<f64>) -> Self {
        self.face_anchor = Some(anchor);
        self
    }
}

#[derive(Clone, Debug)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    pub hand_visible_ratio: f32,
    frame_times: VecDeque<f32>,
    visibility: VecDeque<bool>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            hand_visible_ratio: 0.0,
            frame_times: VecDeque::with_capacity(30),
            visibility: VecDeque::with_capacity(30),
        }
    }
}

impl PerformanceMetrics {
    pub fn record(&mut self, processing_secs: f32, hand_visible: bool) {
        self.frame_times.push_front(processing_secs);
        if self.frame_times.len() > 30 {
            self.frame_times.pop_back();
        }
        self.visibility.push_front(hand_visible);
        if self.visibility.len() > 30 {
            self.visibility.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
        self.hand_visible_ratio = self.visibility.iter().filter(|v| **v).count() as f32
            / self.visibility.len() as f32;
    }
}

/// Turns raw detector output into a `LandmarkFrame`, keeping only the most
/// confident hand.
#[derive(Default)]
pub struct HandTracker {
    frames_seen: u64,
    frames_with_hand: u64,
}

impl HandTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_from_detection(&mut self, output: &DetectorOutput, timestamp: f64) -> LandmarkFrame {
        self.frames_seen += 1;

        let best = output
            .hands
            .iter()
            .filter(|hand| hand.score.is_finite() && !hand.landmarks.is_empty())
            .max_by(|a, b| a.score.total_cmp(&b.score));

        let hand = best.and_then(|detected| {
            let landmarks: Vec<Vector3<f64>> = detected
                .landmarks
                .iter()
                .take(HAND_LANDMARK_COUNT)
                .map(|lm| Vector3::new(lm[0], lm[1], lm[2]))
                .collect();
            // A single NaN would poison the centroid; drop the hand instead.
            if landmarks.iter().any(|lm| !lm.iter().all(|c| c.is_finite())) {
                return None;
            }
            Some(HandPose::new(landmarks, detected.score.clamp(0.0, 1.0)))
        });

        if hand.is_some() {
            self.frames_with_hand += 1;
        }

        LandmarkFrame {
            timestamp,
            hand,
            face_anchor: output
                .face_anchor
                .filter(|p| p[0].is_finite() && p[1].is_finite())
                .map(|p| Vector2::new(p[0], p[1])),
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn frames_with_hand(&self) -> u64 {
        self.frames_with_hand
    }
}

/// Synthetic MediaPipe-shaped hand centred at (`cx`, `cy`). With
/// `index_raised` the index finger points up and the others are curled,
/// which is the finger-to-mouth pose.
pub fn synthetic_hand(cx: f64, cy: f64, index_raised: bool) -> Vec<Vector3<f64>> {
    let mut landmarks = Vec::with_capacity(HAND_LANDMARK_COUNT);
    landmarks.push(Vector3::new(cx, cy + 0.1, 0.0));

    for finger in 0..5 {
        let x = cx + (finger as f64 - 2.0) * 0.03;
        for joint in 1..=4 {
            let k = joint as f64;
            let y = match (finger, index_raised) {
                (1, true) => cy + 0.05 - k * 0.045,
                (_, true) => match joint {
                    1 => cy + 0.015,
                    2 => cy - 0.01,
                    3 => cy + 0.01,
                    _ => cy + 0.03,
                },
                (_, false) => cy + 0.05 - k * 0.035,
            };
            landmarks.push(Vector3::new(x, y, 0.0));
        }
    }
    landmarks
}

/// Scripted hand motion for running without a camera: touch the mouth,
/// sweep right, drift back, touch the mouth, sweep left, drift back.
pub struct HandSimulator {
    sim_time: f64,
    dt: f64,
}

const SIM_HALF_CYCLE: f64 = 4.0;

impl HandSimulator {
    pub fn new(fps: f64) -> Self {
        Self { sim_time: 0.0, dt: 1.0 / fps.max(1.0) }
    }

    pub fn next_frame(&mut self) -> LandmarkFrame {
        let t = self.sim_time;
        self.sim_time += self.dt;

        let cycle = t % (2.0 * SIM_HALF_CYCLE);
        let (phase, direction) = if cycle < SIM_HALF_CYCLE {
            (cycle, 1.0)
        } else {
            (cycle - SIM_HALF_CYCLE, -1.0)
        };

        let rest_y = 0.7;
        let (cx, cy, raised) = match phase {
            p if p < 0.3 => return LandmarkFrame::no_hand(t),
            p if p < 0.8 => (0.5, rest_y, false),
            p if p < 1.8 => (0.5, 0.4, true),
            p if p < 2.1 => (0.5, rest_y, false),
            p if p < 2.6 => (0.5 + direction * 0.3 * (p - 2.1) / 0.5, rest_y, false),
            p => (0.8 - 0.3 * (p - 2.6) / 1.4, rest_y, false),
        };
        let cx = if direction < 0.0 && phase >= 2.6 { 1.0 - cx } else { cx };

        LandmarkFrame::with_hand(t, HandPose::new(synthetic_hand(cx, cy, raised), 0.9))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mediapipe_bridge::DetectedHand;

    #[test]
    fn centroid_of_uniform_hand_is_its_x() {
        let hand = HandPose::new(vec![Vector3::new(0.3, 0.2, 0.0); 21], 0.9);
        let c = hand.centroid().unwrap();
        assert!((c.x - 0.3).abs() < 1e-12);
        assert!((c.y - 0.2).abs() < 1e-12);
        assert!(HandPose::new(vec![], 0.9).centroid().is_none());
    }

    #[test]
    fn tracker_keeps_most_confident_hand() {
        let mut tracker = HandTracker::new();
        let output = DetectorOutput {
            hands: vec![
                DetectedHand { landmarks: vec![[0.1, 0.1, 0.0]; 21], score: 0.6 },
                DetectedHand { landmarks: vec![[0.7, 0.4, 0.0]; 21], score: 0.95 },
            ],
            face_anchor: Some([0.5, 0.3]),
        };
        let frame = tracker.frame_from_detection(&output, 1.25);
        let hand = frame.hand.unwrap();
        assert_eq!(hand.confidence, 0.95);
        assert_eq!(hand.landmarks[0].x, 0.7);
        assert_eq!(frame.face_anchor, Some(Vector2::new(0.5, 0.3)));
        assert_eq!(frame.timestamp, 1.25);
        assert_eq!(tracker.frames_with_hand(), 1);
    }

    #[test]
    fn tracker_drops_non_finite_hand() {
        let mut tracker = HandTracker::new();
        let mut landmarks = vec![[0.5, 0.5, 0.0]; 21];
        landmarks[3][0] = f64::NAN;
        let output = DetectorOutput {
            hands: vec![DetectedHand { landmarks, score: 0.9 }],
            face_anchor: None,
        };
        assert!(tracker.frame_from_detection(&output, 0.0).hand.is_none());
        assert_eq!(tracker.frames_seen(), 1);
        assert_eq!(tracker.frames_with_hand(), 0);
    }

    #[test]
    fn synthetic_poses_have_expected_shape() {
        let raised = synthetic_hand(0.5, 0.4, true);
        assert_eq!(raised.len(), HAND_LANDMARK_COUNT);
        assert!(raised[INDEX_TIP].y < raised[INDEX_PIP].y - 0.05);
        assert!(raised[INDEX_TIP].y < raised[MIDDLE_TIP].y - 0.05);

        let open = synthetic_hand(0.5, 0.7, false);
        assert!((open[INDEX_TIP].y - open[MIDDLE_TIP].y).abs() < 1e-12);
    }

    #[test]
    fn simulator_starts_without_hand_and_advances_time() {
        let mut sim = HandSimulator::new(30.0);
        let first = sim.next_frame();
        assert!(first.hand.is_none());
        let frames: Vec<_> = (0..60).map(|_| sim.next_frame()).collect();
        assert!(frames.windows(2).all(|w| w[1].timestamp > w[0].timestamp));
        assert!(frames.iter().any(|f| f.hand.is_some()));
    }

    #[test]
    fn performance_metrics_average() {
        let mut metrics = PerformanceMetrics::default();
        metrics.record(0.02, true);
        metrics.record(0.04, false);
        assert!((metrics.avg_processing_time - 0.03).abs() < 1e-6);
        assert!((metrics.hand_visible_ratio - 0.5).abs() < 1e-6);
    }
}
