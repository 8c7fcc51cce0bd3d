// src/gate.rs - Priming / cooldown gate between raw gestures and page turns
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{GestureKind, RawGestureEvent};
use crate::config::{self, ConfigError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageTurnCommand {
    Next,
    Previous,
}

impl PageTurnCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
        }
    }
}

/// The product of "primed" and "cooling down", one variant per combination.
/// Deadlines are absolute timestamps in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateState {
    Idle,
    Primed { expires_at: f64 },
    CoolingDown { until: f64 },
    PrimedCoolingDown { expires_at: f64, until: f64 },
}

impl GateState {
    pub fn is_primed(&self) -> bool {
        matches!(self, GateState::Primed { .. } | GateState::PrimedCoolingDown { .. })
    }

    pub fn is_cooling_down(&self) -> bool {
        matches!(self, GateState::CoolingDown { .. } | GateState::PrimedCoolingDown { .. })
    }

    pub fn priming_deadline(&self) -> Option<f64> {
        match *self {
            GateState::Primed { expires_at } | GateState::PrimedCoolingDown { expires_at, .. } => {
                Some(expires_at)
            }
            _ => None,
        }
    }

    pub fn cooldown_deadline(&self) -> Option<f64> {
        match *self {
            GateState::CoolingDown { until } | GateState::PrimedCoolingDown { until, .. } => {
                Some(until)
            }
            _ => None,
        }
    }

    fn from_parts(priming: Option<f64>, cooldown: Option<f64>) -> Self {
        match (priming, cooldown) {
            (None, None) => GateState::Idle,
            (Some(expires_at), None) => GateState::Primed { expires_at },
            (None, Some(until)) => GateState::CoolingDown { until },
            (Some(expires_at), Some(until)) => GateState::PrimedCoolingDown { expires_at, until },
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GateState::Idle => "idle",
            GateState::Primed { .. } => "primed",
            GateState::CoolingDown { .. } => "cooldown",
            GateState::PrimedCoolingDown { .. } => "primed+cooldown",
        }
    }
}

/// Pure reducer: (state, event, time) -> (state, optional command).
pub struct GestureGate {
    state: GateState,
    priming_timeout: f64,
    cooldown: f64,
}

impl GestureGate {
    pub fn new(priming_timeout_secs: f64, cooldown_secs: f64) -> Result<Self, ConfigError> {
        config::positive("priming_timeout_secs", priming_timeout_secs)?;
        config::non_negative("cooldown_secs", cooldown_secs)?;
        Ok(Self {
            state: GateState::Idle,
            priming_timeout: priming_timeout_secs,
            cooldown: cooldown_secs,
        })
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = GateState::Idle;
    }

    /// Advance one tick. Returns at most one command.
    pub fn step(&mut self, event: &RawGestureEvent) -> Option<PageTurnCommand> {
        let now = event.timestamp;

        // Deadlines are checked before the event so a stale priming is never used.
        let mut priming = self.state.priming_deadline().filter(|&deadline| now < deadline);
        let mut cooldown = self.state.cooldown_deadline().filter(|&deadline| now < deadline);
        if self.state.is_primed() && priming.is_none() {
            debug!("Priming expired at t={:.2}", now);
        }

        let mut command = None;
        match event.kind {
            GestureKind::MouthTouch => {
                // Priming is allowed during cooldown.
                if priming.is_none() {
                    info!("Primed at t={:.2}", now);
                }
                priming = Some(now + self.priming_timeout);
            }
            GestureKind::WaveRight | GestureKind::WaveLeft => {
                if priming.is_some() && cooldown.is_none() {
                    let cmd = if event.kind == GestureKind::WaveRight {
                        PageTurnCommand::Next
                    } else {
                        PageTurnCommand::Previous
                    };
                    info!("Page turn {} at t={:.2}", cmd.as_str(), now);
                    priming = None;
                    cooldown = Some(now + self.cooldown);
                    command = Some(cmd);
                } else if priming.is_some() {
                    debug!("{} suppressed by cooldown", event.kind.as_str());
                } else {
                    debug!("{} ignored, not primed", event.kind.as_str());
                }
            }
            GestureKind::None => {}
        }

        self.state = GateState::from_parts(priming, cooldown);
        command
    }
}
