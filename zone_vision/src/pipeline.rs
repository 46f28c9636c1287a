// THEORY:
// The `pipeline` module is the top-level detection API. It runs the per-frame
// stack ColorMask -> RegionExtractor -> ZoneClassifier for every calibrated
// color (or for a single color in calibration preview) and publishes the result
// as one immutable `DetectionSnapshot`.
//
// Key architectural principles:
// 1.  **Single Writer, Many Readers**: The latest snapshot, the calibration set
//     and the active preview color each live in a `tokio::sync::watch` channel
//     holding an `Arc`. Publishing swaps the `Arc` under the channel's lock;
//     readers clone the `Arc` out and never hold the lock while they work.
// 2.  **Whole-Frame Consistency**: A frame reads the calibration `Arc` once
//     before it starts. An edit landing mid-frame is seen by the next frame in
//     full, never by half of this one.
// 3.  **Copy-On-Write Edits**: A threshold edit clones the set only if a frame
//     still holds the old one (`Arc::make_mut`), then replaces one profile as a
//     single value, so a profile's lower/upper pair never tears.
// 4.  **Latest Wins**: Each publish replaces the previous snapshot. Nothing is
//     queued; a reader that was slow simply sees a newer frame.

use crate::core_modules::color_mask::{compute_mask, threshold};
use crate::core_modules::color_profile::{Bound, CalibrationSet, ColorProfile};
use crate::core_modules::frame::{Frame, HsvFrame};
use crate::core_modules::pixel::{Byte, Channel};
use crate::core_modules::region_extractor::{DEFAULT_MIN_AREA, extract_regions};
use crate::core_modules::zone_classifier::{BoundaryRule, DEFAULT_ZONE_COUNT, ZoneLayout};
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::snapshot::{ColorDetection, DetectionMode, DetectionSnapshot};
pub use crate::core_modules::zone_classifier::ZoneResult;

/// Tunable behavior of the detection pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of equal horizontal zones. Must be at least 1.
    pub zone_count: u32,
    /// Smallest component, in pixels, that counts as a detection.
    pub min_region_area: usize,
    /// Which zone a center exactly on a zone edge joins.
    pub boundary_rule: BoundaryRule,
    /// How long the worker sleeps after an iteration with no frame.
    pub idle_backoff_ms: u64,
    /// Emit a debug summary every this many frames; 0 disables it.
    pub frames_per_log: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            zone_count: DEFAULT_ZONE_COUNT,
            min_region_area: DEFAULT_MIN_AREA,
            boundary_rule: BoundaryRule::Floor,
            idle_backoff_ms: 5,
            frames_per_log: 30,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.zone_count == 0 {
            return Err(VisionError::InvalidConfig("zone_count must be at least 1".into()));
        }
        Ok(())
    }

    pub fn layout(&self, frame_width: u32) -> ZoneLayout {
        ZoneLayout::new(frame_width, self.zone_count, self.boundary_rule)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

/// Runs detection for one frame against an explicit calibration set.
///
/// With `active` set, only that profile is evaluated and its raw mask is kept.
/// An `active` name that is not in `calibration` evaluates nothing.
pub fn detect(
    frame: Arc<Frame>,
    calibration: &CalibrationSet,
    active: Option<&str>,
    config: &PipelineConfig,
) -> DetectionSnapshot {
    // Stage 1: Color Space Conversion, shared by every profile.
    let hsv = HsvFrame::from_frame(&frame);
    let layout = config.layout(frame.width());

    let profiles: Vec<&ColorProfile> = match active {
        Some(name) => calibration.get(name).into_iter().collect(),
        None => calibration.iter().collect(),
    };

    let detections: BTreeMap<String, ColorDetection> = profiles
        .into_iter()
        .map(|profile| {
            let detection = detect_color(&hsv, profile, &layout, config.min_region_area);
            (profile.name().to_string(), detection)
        })
        .collect();

    let preview_mask = active
        .and_then(|name| calibration.get(name))
        .map(|profile| threshold(&hsv, profile));

    DetectionSnapshot {
        sequence: frame.sequence,
        frame_width: frame.width(),
        frame_height: frame.height(),
        zone_count: layout.zone_count,
        mode: DetectionMode::from_active(active),
        detections,
        preview_mask,
        frame: Some(frame),
    }
}

/// Mask, regions and zones for one profile on an already converted frame.
pub fn detect_color(
    hsv: &HsvFrame,
    profile: &ColorProfile,
    layout: &ZoneLayout,
    min_region_area: usize,
) -> ColorDetection {
    // Stage 2: Threshold and Noise Filtering
    let mask = compute_mask(hsv, profile);
    // Stage 3: Spatial Grouping
    let regions = extract_regions(&mask, min_region_area);
    // Stage 4: Zone Mapping
    let zones = layout.classify(&regions);
    ColorDetection { zones, regions }
}

/// The shared detection state: calibration in, snapshots out.
#[derive(Debug)]
pub struct DetectionPipeline {
    config: PipelineConfig,
    calibration: watch::Sender<Arc<CalibrationSet>>,
    active_color: watch::Sender<Option<String>>,
    snapshot: watch::Sender<Arc<DetectionSnapshot>>,
    frames_processed: AtomicU64,
}

impl DetectionPipeline {
    /// A pipeline starting from the built-in default profiles.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_calibration(config, CalibrationSet::defaults())
    }

    pub fn with_calibration(config: PipelineConfig, calibration: CalibrationSet) -> Result<Self> {
        config.validate()?;
        let empty = DetectionSnapshot::empty(config.zone_count);
        Ok(Self {
            calibration: watch::Sender::new(Arc::new(calibration)),
            active_color: watch::Sender::new(None),
            snapshot: watch::Sender::new(Arc::new(empty)),
            frames_processed: AtomicU64::new(0),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs one frame and publishes its snapshot.
    pub fn process_frame(&self, frame: Frame) -> Arc<DetectionSnapshot> {
        let calibration = self.calibration();
        let active = self.active_color();

        let snapshot = Arc::new(detect(
            Arc::new(frame),
            &calibration,
            active.as_deref(),
            &self.config,
        ));
        self.snapshot.send_replace(Arc::clone(&snapshot));

        let processed = self.frames_processed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.config.frames_per_log > 0 && processed % self.config.frames_per_log == 0 {
            let summary: Vec<String> = snapshot
                .detections
                .iter()
                .filter(|(_, d)| !d.zones.is_empty())
                .map(|(color, d)| format!("{color}={:?}", d.zones))
                .collect();
            debug!(frames = processed, sequence = snapshot.sequence, ?summary, "detections");
        }
        snapshot
    }

    /// The most recent snapshot.
    pub fn snapshot(&self) -> Arc<DetectionSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// A receiver notified on every published snapshot.
    pub fn subscribe_snapshots(&self) -> watch::Receiver<Arc<DetectionSnapshot>> {
        self.snapshot.subscribe()
    }

    /// Zones where `color` was seen in the latest frame.
    ///
    /// During calibration preview of another color the snapshot holds no
    /// detection for `color`, so it is evaluated against the snapshot's frame
    /// with the current calibration.
    pub fn query(&self, color: &str) -> Result<ZoneResult> {
        let calibration = self.calibration();
        let profile = calibration.require(color)?;
        let snapshot = self.snapshot();
        if let Some(detection) = snapshot.detections.get(color) {
            return Ok(detection.zones.clone());
        }

        let Some(frame) = &snapshot.frame else {
            return Ok(ZoneResult::new());
        };
        let hsv = HsvFrame::from_frame(frame);
        let layout = self.config.layout(frame.width());
        let detection = detect_color(&hsv, profile, &layout, self.config.min_region_area);
        debug!(color, sequence = snapshot.sequence, zones = ?detection.zones, "off-preview query");
        Ok(detection.zones)
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed.load(Ordering::Relaxed)
    }

    /// The calibration the next frame will use.
    pub fn calibration(&self) -> Arc<CalibrationSet> {
        self.calibration.borrow().clone()
    }

    /// Swaps in a whole calibration set, e.g. after a load.
    pub fn replace_calibration(&self, calibration: CalibrationSet) {
        info!(profiles = calibration.len(), "calibration replaced");
        self.calibration.send_replace(Arc::new(calibration));
    }

    /// Edits one channel of one bound of a calibrated color.
    ///
    /// Returns the updated profile. The set is unchanged on error.
    pub fn set_threshold(
        &self,
        color: &str,
        bound: Bound,
        channel: Channel,
        value: Byte,
    ) -> Result<ColorProfile> {
        let mut outcome = Err(VisionError::UnknownColor(color.to_string()));
        self.calibration.send_if_modified(|set| {
            match set.require(color).and_then(|p| p.with_threshold(bound, channel, value)) {
                Ok(updated) => {
                    outcome = Ok(updated.clone());
                    Arc::make_mut(set).insert(updated);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        });

        if let Ok(profile) = &outcome {
            debug!(
                color,
                %bound,
                %channel,
                value,
                lower = ?profile.lower(),
                upper = ?profile.upper(),
                "threshold updated"
            );
        }
        outcome
    }

    /// Enters calibration preview for `color`, or returns to full detection.
    pub fn set_active_color(&self, color: Option<&str>) -> Result<()> {
        if let Some(name) = color {
            self.calibration().require(name)?;
        }
        info!(active = ?color, "active color changed");
        self.active_color.send_replace(color.map(str::to_string));
        Ok(())
    }

    pub fn active_color(&self) -> Option<String> {
        self.active_color.borrow().clone()
    }
}
