// src/classifier.rs - Raw gesture classification over the rolling window
use nalgebra::Vector2;
use serde::Serialize;
use tracing::debug;

use crate::config::{ConfigError, GestureConfig};
use crate::tracking::{HandPose, LandmarkFrame, INDEX_PIP, INDEX_TIP, MIDDLE_TIP, PINKY_TIP, RING_TIP};
use crate::window::{GestureWindow, WindowSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum GestureKind {
    WaveLeft,
    WaveRight,
    MouthTouch,
    None,
}

impl GestureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaveLeft => "wave-left",
            Self::WaveRight => "wave-right",
            Self::MouthTouch => "mouth-touch",
            Self::None => "none",
        }
    }
}

/// Exactly one of these is produced per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawGestureEvent {
    pub kind: GestureKind,
    pub timestamp: f64,
    /// Wave: absolute displacement. Mouth touch: how deep inside the zone (0..1).
    pub strength: f64,
}

impl RawGestureEvent {
    pub fn none(timestamp: f64) -> Self {
        Self { kind: GestureKind::None, timestamp, strength: 0.0 }
    }
}

pub struct GestureClassifier {
    config: GestureConfig,
    window: GestureWindow,
    mouth_hold: u32,
    lost_ticks: u32,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let window = GestureWindow::new(config.window_size);
        Ok(Self {
            config,
            window,
            mouth_hold: 0,
            lost_ticks: 0,
        })
    }

    pub fn window(&self) -> &GestureWindow {
        &self.window
    }

    pub fn mouth_hold(&self) -> u32 {
        self.mouth_hold
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.mouth_hold = 0;
        self.lost_ticks = 0;
    }

    /// Fold one frame into the window and classify.
    pub fn classify(&mut self, frame: &LandmarkFrame) -> RawGestureEvent {
        let t = frame.timestamp;

        // A hand without landmarks counts as a lost hand.
        let observed = frame.hand.as_ref().and_then(|h| h.centroid().map(|c| (h, c)));
        let Some((hand, centroid)) = observed else {
            return self.hand_lost(t);
        };
        self.lost_ticks = 0;

        self.window.push(WindowSample::Hand {
            timestamp: t,
            centroid,
            confidence: hand.confidence,
        });

        let confident = hand.confidence >= self.config.min_confidence;

        // Mouth proximity takes priority over any wave in the same tick.
        let mouth = if confident { self.mouth_proximity(hand, frame.face_anchor) } else { None };
        match mouth {
            Some(depth) => {
                self.mouth_hold = self.mouth_hold.saturating_add(1);
                // Motion away from the mouth is measured from scratch.
                self.window.clear();
                if self.mouth_hold >= self.config.mouth_hold_frames {
                    return RawGestureEvent {
                        kind: GestureKind::MouthTouch,
                        timestamp: t,
                        strength: depth,
                    };
                }
                return RawGestureEvent::none(t);
            }
            None => self.mouth_hold = 0,
        }

        match self.detect_wave() {
            Some((kind, displacement)) => {
                debug!("{} detected, displacement {:.3}", kind.as_str(), displacement);
                self.window.clear();
                RawGestureEvent { kind, timestamp: t, strength: displacement.abs() }
            }
            None => RawGestureEvent::none(t),
        }
    }

    fn hand_lost(&mut self, t: f64) -> RawGestureEvent {
        self.mouth_hold = 0;
        self.lost_ticks = self.lost_ticks.saturating_add(1);
        if self.lost_ticks > self.config.max_gap_ticks {
            if !self.window.is_empty() {
                debug!("Hand lost for {} ticks, dropping window", self.lost_ticks);
            }
            self.window.clear();
        } else {
            self.window.push(WindowSample::Lost { timestamp: t });
        }
        RawGestureEvent::none(t)
    }

    /// Depth inside the mouth zone in 0..1, or `None` if outside.
    fn mouth_proximity(&self, hand: &HandPose, face_anchor: Option<Vector2<f64>>) -> Option<f64> {
        let tip = hand.landmark(INDEX_TIP)?.xy();

        if let Some(anchor) = face_anchor {
            let distance = (tip - anchor).norm();
            return (distance < self.config.mouth_radius)
                .then(|| 1.0 - distance / self.config.mouth_radius);
        }

        // No face reference: fall back to the finger-to-mouth hand shape.
        if !hand.is_complete() {
            return None;
        }
        let margin = self.config.pose_margin;
        let tip_y = tip.y;
        let pip_y = hand.landmarks[INDEX_PIP].y;
        let index_extended = tip_y < pip_y - margin;
        let index_highest = [MIDDLE_TIP, RING_TIP, PINKY_TIP]
            .iter()
            .all(|&i| tip_y < hand.landmarks[i].y - margin);
        let near_mouth_height = tip_y < self.config.mouth_zone_max_y;

        (index_extended && index_highest && near_mouth_height)
            .then(|| (1.0 - tip_y / self.config.mouth_zone_max_y).clamp(0.0, 1.0))
    }

    fn detect_wave(&self) -> Option<(GestureKind, f64)> {
        let min_confidence = self.config.min_confidence;
        let xs: Vec<f64> = self.window.valid_centroids(min_confidence).map(|c| c.x).collect();
        if xs.len() < self.config.min_valid_frames.max(2) {
            return None;
        }

        let displacement = xs[xs.len() - 1] - xs[0];
        let threshold = self.config.wave_displacement;
        let kind = if displacement > threshold {
            GestureKind::WaveRight
        } else if displacement < -threshold {
            GestureKind::WaveLeft
        } else {
            return None;
        };

        let (mut with, mut against) = (0usize, 0usize);
        for pair in xs.windows(2) {
            let step = pair[1] - pair[0];
            if step.abs() <= self.config.step_noise {
                continue;
            }
            if step.signum() == displacement.signum() {
                with += 1;
            } else {
                against += 1;
            }
        }
        let moving = with + against;
        if moving == 0 {
            return None;
        }
        let consistency = with as f64 / moving as f64;
        if consistency < self.config.min_direction_consistency {
            debug!(
                "Rejected {} with consistency {:.2}",
                kind.as_str(),
                consistency
            );
            return None;
        }

        Some((kind, displacement))
    }
}
