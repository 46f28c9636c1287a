//! Console configuration: an optional JSON file overlaid by command-line flags.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use zone_vision::core_modules::calibration_store::DEFAULT_CALIBRATION_FILE;
use zone_vision::{BoundaryRule, Framing, PipelineConfig};

/// Transport target meaning "write messages to standard output".
pub const STDOUT_TARGET: &str = "stdout";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Where calibration is loaded from and saved to.
    pub calibration_path: PathBuf,
    /// Directory of frames replayed as the capture source.
    pub frame_dir: PathBuf,
    /// Restart from the first frame after the last.
    pub looping: bool,
    /// `stdout`, or a path such as a serial device node.
    pub transport: String,
    /// Terminate each outbound message with a newline.
    pub newline: bool,
    /// Begin processing as soon as the console starts.
    pub autostart: bool,
    pub pipeline: PipelineConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            calibration_path: PathBuf::from(DEFAULT_CALIBRATION_FILE),
            frame_dir: PathBuf::from("frames"),
            looping: true,
            transport: STDOUT_TARGET.to_string(),
            newline: true,
            autostart: false,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// Flag values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub calibration_path: Option<PathBuf>,
    pub frame_dir: Option<PathBuf>,
    pub once: bool,
    pub transport: Option<String>,
    pub raw: bool,
    pub autostart: bool,
    pub zone_count: Option<u32>,
    pub min_region_area: Option<usize>,
    pub boundary_rule: Option<BoundaryRule>,
}

impl ConsoleConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(path) = overrides.calibration_path {
            self.calibration_path = path;
        }
        if let Some(dir) = overrides.frame_dir {
            self.frame_dir = dir;
        }
        if overrides.once {
            self.looping = false;
        }
        if let Some(target) = overrides.transport {
            self.transport = target;
        }
        if overrides.raw {
            self.newline = false;
        }
        if overrides.autostart {
            self.autostart = true;
        }
        if let Some(count) = overrides.zone_count {
            self.pipeline.zone_count = count;
        }
        if let Some(area) = overrides.min_region_area {
            self.pipeline.min_region_area = area;
        }
        if let Some(rule) = overrides.boundary_rule {
            self.pipeline.boundary_rule = rule;
        }
    }

    pub fn framing(&self) -> Framing {
        if self.newline {
            Framing::Newline
        } else {
            Framing::Raw
        }
    }

    pub fn writes_to_stdout(&self) -> bool {
        self.transport == STDOUT_TARGET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_fill_in_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.json");
        std::fs::write(
            &path,
            r#"{
                "transport": "/dev/ttyACM0",
                "pipeline": {"zone_count": 4, "boundary_rule": "ceil"}
            }"#,
        )
        .unwrap();

        let config = ConsoleConfig::from_file(&path).unwrap();
        assert_eq!(config.transport, "/dev/ttyACM0");
        assert_eq!(config.pipeline.zone_count, 4);
        assert_eq!(config.pipeline.boundary_rule, BoundaryRule::Ceil);
        assert_eq!(config.pipeline.min_region_area, 300);
        assert_eq!(config.calibration_path, PathBuf::from("calibration.json"));
        assert!(config.looping);
        assert!(!config.writes_to_stdout());
    }

    #[test]
    fn flags_override_file_values() {
        let mut config = ConsoleConfig::default();
        config.apply(Overrides {
            frame_dir: Some(PathBuf::from("captures")),
            once: true,
            raw: true,
            zone_count: Some(4),
            min_region_area: Some(800),
            ..Overrides::default()
        });

        assert_eq!(config.frame_dir, PathBuf::from("captures"));
        assert!(!config.looping);
        assert_eq!(config.framing(), Framing::Raw);
        assert_eq!(config.pipeline.zone_count, 4);
        assert_eq!(config.pipeline.min_region_area, 800);
        assert!(config.writes_to_stdout());
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("console.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ConsoleConfig::from_file(&path).is_err());
    }
}
