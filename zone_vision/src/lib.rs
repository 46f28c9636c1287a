// THEORY:
// This file is the main entry point for the `zone_vision` library crate. It
// defines the public API handed to whatever drives the engine: a GUI, the
// `zone_console` binary, or a test harness.
//
// The engine answers one question for every frame: which calibrated colors
// occupy which of the N horizontal zones of the image. `DetectionPipeline`
// computes and publishes that answer, `VisionService` keeps it running over a
// frame source on a worker thread, and `ControlSession` maps the line-oriented
// control vocabulary onto both. The leaf stages live in `core_modules` and are
// public so that each can be used and tested in isolation.

pub mod control;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod service;

pub use control::{ControlCommand, ControlReply, ControlSession};
pub use core_modules::calibration_store::{CalibrationStore, LoadReport};
pub use core_modules::color_profile::{Bound, CalibrationSet, ColorProfile, DisplayTag};
pub use core_modules::command_encoder::encode;
pub use core_modules::frame::Frame;
pub use core_modules::frame_source::{FrameSource, ImageSequenceSource, StaticFrameSource};
pub use core_modules::pixel::Channel;
pub use core_modules::transport::{Framing, Transport, WriterTransport};
pub use core_modules::zone_classifier::{BoundaryRule, ZoneLayout};
pub use error::{Result, VisionError};
pub use pipeline::{DetectionPipeline, DetectionSnapshot, PipelineConfig, ZoneResult};
pub use service::{ServiceState, VisionService};
