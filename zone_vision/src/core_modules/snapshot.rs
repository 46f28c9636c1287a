// THEORY:
// A `DetectionSnapshot` is the complete result for one processed frame. It is
// built in full by the worker and only then published, wrapped in an `Arc`, so
// a reader holding one sees a single frame's results in their entirety. Nothing
// in a snapshot is ever mutated after publication; the next frame produces a
// new snapshot that supersedes it.

use crate::core_modules::color_mask::BinaryMask;
use crate::core_modules::frame::Frame;
use crate::core_modules::region::Region;
use crate::core_modules::zone_classifier::ZoneResult;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which profiles were evaluated for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetectionMode {
    /// Every profile in the calibration set.
    #[default]
    All,
    /// Only the named profile, with its raw mask retained.
    Preview(String),
}

impl DetectionMode {
    pub fn from_active(active: Option<&str>) -> Self {
        match active {
            Some(name) => DetectionMode::Preview(name.to_string()),
            None => DetectionMode::All,
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, DetectionMode::Preview(_))
    }
}

/// Per-color outcome for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColorDetection {
    pub zones: ZoneResult,
    pub regions: Vec<Region>,
}

/// The latest frame's per-color zone map.
#[derive(Debug, Clone, Default)]
pub struct DetectionSnapshot {
    /// Sequence number of the source frame.
    pub sequence: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub zone_count: u32,
    pub mode: DetectionMode,
    pub detections: BTreeMap<String, ColorDetection>,
    /// The unfiltered threshold mask, present only in preview mode.
    pub preview_mask: Option<BinaryMask>,
    /// The frame the snapshot was computed from; `None` before the first frame.
    pub frame: Option<Arc<Frame>>,
}

impl DetectionSnapshot {
    /// The snapshot published before any frame has been processed.
    pub fn empty(zone_count: u32) -> Self {
        Self {
            zone_count,
            ..Self::default()
        }
    }

    /// Zones for `color`; empty when the color was not evaluated or not seen.
    pub fn zones(&self, color: &str) -> &[u32] {
        self.detections
            .get(color)
            .map(|d| d.zones.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_frame(&self) -> bool {
        self.frame.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_colors_read_as_not_detected() {
        let mut snapshot = DetectionSnapshot::empty(3);
        snapshot.detections.insert(
            "Red".into(),
            ColorDetection {
                zones: vec![0, 2],
                regions: Vec::new(),
            },
        );
        assert_eq!(snapshot.zones("Red"), [0, 2]);
        assert!(snapshot.zones("Blue").is_empty());
        assert!(!snapshot.has_frame());
    }

    #[test]
    fn mode_follows_active_color() {
        assert_eq!(DetectionMode::from_active(None), DetectionMode::All);
        assert!(DetectionMode::from_active(Some("Green")).is_preview());
    }
}
