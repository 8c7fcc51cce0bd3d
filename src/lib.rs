//! Gesture-controlled PDF book reader.
//!
//! Hand landmarks from a webcam (or a simulation, or a recording) flow through
//! a [`pipeline::GesturePipeline`] once per frame: the classifier turns a rolling
//! window of landmarks into raw gestures, and the gate only lets a wave turn the
//! page after a finger-to-mouth touch has primed it, followed by a cooldown.

pub mod app;
pub mod capture;
pub mod classifier;
pub mod config;
pub mod data;
pub mod gate;
pub mod mediapipe_bridge;
pub mod navigator;
pub mod pdf;
pub mod pipeline;
pub mod source;
pub mod tracking;
pub mod ui;
pub mod video;
pub mod window;
