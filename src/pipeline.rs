// src/pipeline.rs - One tick: landmarks -> raw gesture -> gated command
use crate::classifier::{GestureClassifier, RawGestureEvent};
use crate::config::{ConfigError, GestureConfig};
use crate::gate::{GateState, GestureGate, PageTurnCommand};
use crate::tracking::LandmarkFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub event: RawGestureEvent,
    pub command: Option<PageTurnCommand>,
}

/// Read-only view for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSnapshot {
    pub last_event: RawGestureEvent,
    pub state: GateState,
    pub primed_remaining: Option<f64>,
    pub cooldown_remaining: Option<f64>,
    pub window_len: usize,
    pub window_capacity: usize,
    pub mouth_hold: u32,
}

pub struct GesturePipeline {
    classifier: GestureClassifier,
    gate: GestureGate,
    last_event: RawGestureEvent,
}

impl GesturePipeline {
    pub fn new(config: GestureConfig) -> Result<Self, ConfigError> {
        let gate = GestureGate::new(config.priming_timeout_secs, config.cooldown_secs)?;
        Ok(Self {
            classifier: GestureClassifier::new(config)?,
            gate,
            last_event: RawGestureEvent::none(0.0),
        })
    }

    pub fn tick(&mut self, frame: &LandmarkFrame) -> TickOutcome {
        let event = self.classifier.classify(frame);
        let command = self.gate.step(&event);
        self.last_event = event;
        TickOutcome { event, command }
    }

    pub fn state(&self) -> GateState {
        self.gate.state()
    }

    pub fn snapshot(&self) -> GestureSnapshot {
        let now = self.last_event.timestamp;
        let state = self.gate.state();
        GestureSnapshot {
            last_event: self.last_event,
            state,
            primed_remaining: state.priming_deadline().map(|d| (d - now).max(0.0)),
            cooldown_remaining: state.cooldown_deadline().map(|d| (d - now).max(0.0)),
            window_len: self.classifier.window().len(),
            window_capacity: self.classifier.window().capacity(),
            mouth_hold: self.classifier.mouth_hold(),
        }
    }

    /// Drop all gesture state, e.g. after the landmark source is switched.
    pub fn reset(&mut self) {
        self.classifier.reset();
        self.gate.reset();
        self.last_event = RawGestureEvent::none(self.last_event.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::GestureKind;
    use crate::tracking::{synthetic_hand, HandPose};

    #[test]
    fn rejects_invalid_config() {
        let config = GestureConfig { window_size: 0, ..GestureConfig::default() };
        assert!(matches!(GesturePipeline::new(config), Err(ConfigError::WindowTooSmall(0))));
        let config = GestureConfig { priming_timeout_secs: 0.0, ..GestureConfig::default() };
        assert!(GesturePipeline::new(config).is_err());
    }

    #[test]
    fn prime_then_sweep_emits_next() {
        let mut pipeline = GesturePipeline::new(GestureConfig::default()).unwrap();
        let mut t = 0.0;
        let mut commands = Vec::new();

        for _ in 0..5 {
            let hand = HandPose::new(synthetic_hand(0.5, 0.4, true), 0.9);
            commands.extend(pipeline.tick(&LandmarkFrame::with_hand(t, hand)).command);
            t += 1.0 / 30.0;
        }
        assert!(pipeline.state().is_primed());
        assert_eq!(pipeline.snapshot().last_event.kind, GestureKind::MouthTouch);

        for i in 0..12 {
            let x = 0.4 + 0.03 * i as f64;
            let hand = HandPose::new(synthetic_hand(x, 0.7, false), 0.9);
            commands.extend(pipeline.tick(&LandmarkFrame::with_hand(t, hand)).command);
            t += 1.0 / 30.0;
        }
        assert_eq!(commands, vec![PageTurnCommand::Next]);
        let snapshot = pipeline.snapshot();
        assert!(snapshot.state.is_cooling_down());
        assert!(snapshot.cooldown_remaining.unwrap() > 0.0);
        assert!(snapshot.primed_remaining.is_none());
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut pipeline = GesturePipeline::new(GestureConfig::default()).unwrap();
        let hand = HandPose::new(synthetic_hand(0.5, 0.4, true), 0.9);
        for i in 0..4 {
            pipeline.tick(&LandmarkFrame::with_hand(i as f64 * 0.03, hand.clone()));
        }
        assert!(pipeline.state().is_primed());
        pipeline.reset();
        assert_eq!(pipeline.state(), GateState::Idle);
        assert_eq!(pipeline.snapshot().window_len, 0);
    }
}
