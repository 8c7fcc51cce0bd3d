//! End-to-end gesture behaviour through the public library API.

use gesture_reader::classifier::{GestureClassifier, GestureKind, RawGestureEvent};
use gesture_reader::config::{ConfigError, GestureConfig};
use gesture_reader::gate::{GateState, GestureGate, PageTurnCommand};
use gesture_reader::navigator::PageNavigator;
use gesture_reader::pipeline::GesturePipeline;
use gesture_reader::source::{LandmarkSource, SimulatedSource};
use gesture_reader::tracking::{synthetic_hand, HandPose, LandmarkFrame};

fn event(kind: GestureKind, timestamp: f64) -> RawGestureEvent {
    RawGestureEvent { kind, timestamp, strength: 1.0 }
}

fn hand_at(t: f64, x: f64, confidence: f64) -> LandmarkFrame {
    LandmarkFrame::with_hand(t, HandPose::new(synthetic_hand(x, 0.7, false), confidence))
}

#[test]
fn monotonic_sweep_to_the_right_is_a_right_wave() {
    let config = GestureConfig {
        window_size: 10,
        wave_displacement: 0.2,
        ..GestureConfig::default()
    };
    let mut classifier = GestureClassifier::new(config).unwrap();
    let kinds: Vec<GestureKind> = (0..10)
        .map(|i| classifier.classify(&hand_at(i as f64 / 30.0, 0.3 * i as f64 / 9.0, 0.9)).kind)
        .collect();
    assert!(kinds.contains(&GestureKind::WaveRight));
    assert!(!kinds.contains(&GestureKind::WaveLeft));
}

#[test]
fn primed_left_wave_turns_back() {
    let mut gate = GestureGate::new(3.0, 2.0).unwrap();
    assert_eq!(gate.step(&event(GestureKind::MouthTouch, 10.0)), None);
    assert_eq!(
        gate.step(&event(GestureKind::WaveLeft, 11.0)),
        Some(PageTurnCommand::Previous)
    );
    assert!(!gate.state().is_primed());
    assert!(gate.state().is_cooling_down());
}

#[test]
fn wave_without_priming_does_nothing() {
    let mut gate = GestureGate::new(3.0, 2.0).unwrap();
    assert_eq!(gate.step(&event(GestureKind::WaveRight, 1.0)), None);
    assert_eq!(gate.state(), GateState::Idle);
}

#[test]
fn repriming_inside_cooldown_is_suppressed() {
    let mut gate = GestureGate::new(3.0, 2.0).unwrap();
    gate.step(&event(GestureKind::MouthTouch, 0.0));
    assert_eq!(gate.step(&event(GestureKind::WaveRight, 0.5)), Some(PageTurnCommand::Next));
    gate.step(&event(GestureKind::MouthTouch, 1.0));
    assert_eq!(gate.step(&event(GestureKind::WaveRight, 1.25)), None);
    assert!(gate.state().is_primed());
}

#[test]
fn expired_priming_ignores_late_wave() {
    let mut gate = GestureGate::new(3.0, 2.0).unwrap();
    gate.step(&event(GestureKind::MouthTouch, 0.0));
    assert_eq!(gate.step(&event(GestureKind::WaveRight, 4.0)), None);
    assert!(!gate.state().is_primed());
}

#[test]
fn idle_ticks_only_change_state_by_expiry() {
    let mut gate = GestureGate::new(3.0, 2.0).unwrap();
    gate.step(&event(GestureKind::MouthTouch, 0.0));
    gate.step(&event(GestureKind::WaveRight, 0.5));
    gate.step(&event(GestureKind::MouthTouch, 1.0));
    let primed_cooling = gate.state();

    let mut t = 1.0;
    while t < 2.5 {
        gate.step(&event(GestureKind::None, t));
        assert_eq!(gate.state(), primed_cooling);
        t += 0.125;
    }
    gate.step(&event(GestureKind::None, 2.5));
    assert_eq!(gate.state(), GateState::Primed { expires_at: 4.0 });
    gate.step(&event(GestureKind::None, 4.0));
    assert_eq!(gate.state(), GateState::Idle);
}

/// Drives the scripted simulation and checks the gate's guarantees on the
/// real classifier output rather than hand-written events.
#[test]
fn simulated_session_turns_both_ways_and_respects_the_gate() {
    let config = GestureConfig::default();
    let mut pipeline = GesturePipeline::new(config).unwrap();
    let mut navigator = PageNavigator::new(20);
    let mut source = SimulatedSource::new(30.0);

    let mut commands = Vec::new();
    let mut touched_since_last_command = false;
    for _ in 0..(16 * 30) {
        let frame = source.next_frame().unwrap().unwrap().landmarks;
        let cooldown_before = pipeline.state().cooldown_deadline();
        let outcome = pipeline.tick(&frame);

        if outcome.event.kind == GestureKind::MouthTouch {
            touched_since_last_command = true;
        }
        if let Some(command) = outcome.command {
            assert!(touched_since_last_command, "command without a mouth touch before it");
            if let Some(until) = cooldown_before {
                assert!(frame.timestamp >= until, "command during cooldown");
            }
            touched_since_last_command = false;
            navigator.apply(command);
            commands.push(command);
        }
    }

    assert!(commands.contains(&PageTurnCommand::Next));
    assert!(commands.contains(&PageTurnCommand::Previous));
    // The script alternates right and left sweeps, so the book ends near the start.
    assert!(navigator.current() <= 2);
}

#[test]
fn turning_past_the_end_stays_on_the_last_spread() {
    let mut navigator = PageNavigator::new(3);
    assert!(navigator.apply(PageTurnCommand::Next));
    assert!(!navigator.apply(PageTurnCommand::Next));
    assert_eq!(navigator.spread().page_numbers(), (Some(2), Some(3)));
}

#[test]
fn every_entry_point_rejects_bad_thresholds() {
    let bad = GestureConfig { min_valid_frames: 0, ..GestureConfig::default() };
    assert!(matches!(
        GestureClassifier::new(bad.clone()),
        Err(ConfigError::MinValidFrames { got: 0, .. })
    ));
    assert!(GesturePipeline::new(bad).is_err());
    assert!(GestureGate::new(-3.0, 2.0).is_err());
    assert!(GestureGate::new(3.0, -2.0).is_err());
}

const KINDS: [GestureKind; 4] = [
    GestureKind::None,
    GestureKind::MouthTouch,
    GestureKind::WaveLeft,
    GestureKind::WaveRight,
];

/// Runs one event sequence and checks the gate's guarantees after every step.
fn check_sequence(kinds: &[GestureKind], spacing: f64, timeout: f64, cooldown: f64) {
    let mut gate = GestureGate::new(timeout, cooldown).unwrap();
    let mut touched_since_last_command = false;

    for (i, &kind) in kinds.iter().enumerate() {
        let now = 100.0 + i as f64 * spacing;
        let before = gate.state();
        let command = gate.step(&event(kind, now));
        let after = gate.state();

        if kind == GestureKind::MouthTouch {
            touched_since_last_command = true;
        }
        if command.is_some() {
            assert!(touched_since_last_command, "{:?}: command without a mouth touch", kinds);
            assert!(
                before.cooldown_deadline().map_or(true, |until| now >= until),
                "{:?}: command during cooldown at t={}",
                kinds,
                now
            );
            touched_since_last_command = false;
        }
        if kind == GestureKind::None {
            assert_eq!(command, None);
            let live = |deadline: Option<f64>| deadline.filter(|&d| now < d);
            assert_eq!(after.priming_deadline(), live(before.priming_deadline()), "{:?}", kinds);
            assert_eq!(after.cooldown_deadline(), live(before.cooldown_deadline()), "{:?}", kinds);
        }
    }
}

#[test]
fn gate_guarantees_hold_for_every_short_sequence() {
    const LENGTH: u32 = 7;
    let timings = [(3.0, 2.0), (5.0, 1.5), (1.0, 0.0)];
    let spacings = [0.25, 0.7, 1.6];

    for (timeout, cooldown) in timings {
        for spacing in spacings {
            // Each prefix of a length-7 sequence is checked step by step,
            // so this covers every shorter sequence too.
            for code in 0..4usize.pow(LENGTH) {
                let kinds: Vec<GestureKind> = (0..LENGTH)
                    .map(|digit| KINDS[(code / 4usize.pow(digit)) % 4])
                    .collect();
                check_sequence(&kinds, spacing, timeout, cooldown);
            }
        }
    }
}
