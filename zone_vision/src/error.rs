//! Error types for the zone vision engine.

use thiserror::Error;

/// Errors surfaced by the detection, calibration and command paths.
///
/// A frame source returning no frame is not represented here: the worker skips
/// that iteration silently.
#[derive(Debug, Error)]
pub enum VisionError {
    /// A query or threshold edit named a color that is not calibrated.
    #[error("unknown color: {0}")]
    UnknownColor(String),

    /// A calibration entry could not be used.
    #[error("invalid calibration data for {color}: {reason}")]
    InvalidCalibrationData {
        /// The color the entry belongs to, or `<file>` for the whole record.
        color: String,
        /// Why the entry was rejected.
        reason: String,
    },

    /// A threshold edit was out of the channel range or inverted the bounds.
    #[error("invalid threshold for {color}: {reason}")]
    InvalidThreshold {
        /// The color being edited.
        color: String,
        /// Why the edit was rejected.
        reason: String,
    },

    /// The wire message was encoded but could not be sent.
    #[error("transport write failed: {0}")]
    TransportWriteFailure(#[source] std::io::Error),

    /// The capture resource could not be acquired.
    #[error("frame source unavailable: {0}")]
    FrameSourceUnavailable(String),

    /// Frame buffer and dimensions disagree.
    #[error("invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame {
        /// Expected buffer length.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },

    /// A control line did not parse.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// A configuration value is unusable.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl VisionError {
    /// Creates an `InvalidCalibrationData` error.
    pub fn calibration(color: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCalibrationData {
            color: color.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidThreshold` error.
    pub fn threshold(color: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidThreshold {
            color: color.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, VisionError>;
