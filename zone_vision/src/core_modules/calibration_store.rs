// THEORY:
// The `CalibrationStore` persists the threshold half of each `ColorProfile` so a
// calibration session survives restarts. The file is a JSON object keyed by
// color name:
//
//     { "Red": { "lower": [0, 120, 70], "upper": [10, 255, 255] }, ... }
//
// Key architectural principles:
// 1.  **Merge onto Defaults**: Loading never produces a set with fewer colors
//     than the defaults. Each entry is validated on its own; a bad entry keeps
//     that color's default and is reported, the rest of the file still applies.
//     Names that are not part of the default set are ignored.
// 2.  **Never Fail the Load**: A missing, unreadable, or malformed file yields
//     the defaults plus a report. Only `save` returns errors.
// 3.  **Atomic Replace**: `save` writes a sibling temporary file and renames it
//     over the destination, so readers see the old file or the new one.
// 4.  **Stable Output**: Keys are written in name order with fixed field names,
//     so saving a set that was just loaded reproduces the same bytes.

use crate::core_modules::color_profile::{Bounds, CalibrationSet};
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default file name used when no path is configured.
pub const DEFAULT_CALIBRATION_FILE: &str = "calibration.json";

/// Marker used as the color of file-level problems.
const FILE_SCOPE: &str = "<file>";

/// On-disk shape of one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProfile {
    lower: Bounds,
    upper: Bounds,
}

/// The outcome of a load: the merged set and everything that was skipped.
#[derive(Debug)]
pub struct LoadReport {
    /// Defaults overlaid with every valid entry from the source.
    pub set: CalibrationSet,
    /// Entries (or the whole file) that were rejected; each kept its default.
    pub rejected: Vec<VisionError>,
    /// Entry names that are not calibrated colors.
    pub ignored: Vec<String>,
    /// Whether a source file existed at all.
    pub source_found: bool,
}

impl LoadReport {
    fn defaults_only(defaults: &CalibrationSet, source_found: bool) -> Self {
        Self {
            set: defaults.clone(),
            rejected: Vec::new(),
            ignored: Vec::new(),
            source_found,
        }
    }

    /// True when every entry in the source was applied.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Loads and saves calibration sets at a fixed path.
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
    defaults: CalibrationSet,
}

impl CalibrationStore {
    /// A store backed by `path` that falls back to the built-in defaults.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_defaults(path, CalibrationSet::defaults())
    }

    pub fn with_defaults(path: impl Into<PathBuf>, defaults: CalibrationSet) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &CalibrationSet {
        &self.defaults
    }

    /// Reads the file and merges it onto the defaults.
    pub fn load(&self) -> LoadReport {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no calibration file, using defaults");
                return LoadReport::defaults_only(&self.defaults, false);
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "calibration file unreadable, using defaults"
                );
                let mut report = LoadReport::defaults_only(&self.defaults, true);
                report
                    .rejected
                    .push(VisionError::calibration(FILE_SCOPE, e.to_string()));
                return report;
            }
        };

        let report = parse_calibration(&text, &self.defaults);
        info!(
            path = %self.path.display(),
            applied = report.set.len(),
            rejected = report.rejected.len(),
            ignored = report.ignored.len(),
            "calibration loaded"
        );
        report
    }

    /// Writes the full set, replacing the destination atomically.
    pub fn save(&self, set: &CalibrationSet) -> Result<()> {
        let text = render_calibration(set)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut staging = tempfile::NamedTempFile::new_in(&dir)?;
        staging.write_all(text.as_bytes())?;
        staging.as_file().sync_all()?;
        staging
            .persist(&self.path)
            .map_err(|e| VisionError::Io(e.error))?;

        info!(path = %self.path.display(), colors = set.len(), "calibration saved");
        Ok(())
    }
}

/// Serializes a set into the file format.
pub fn render_calibration(set: &CalibrationSet) -> Result<String> {
    let stored: BTreeMap<&str, StoredProfile> = set
        .iter()
        .map(|profile| {
            (
                profile.name(),
                StoredProfile {
                    lower: profile.lower(),
                    upper: profile.upper(),
                },
            )
        })
        .collect();
    let mut text = serde_json::to_string_pretty(&stored)?;
    text.push('\n');
    Ok(text)
}

/// Parses file contents and merges valid entries onto `defaults`.
pub fn parse_calibration(text: &str, defaults: &CalibrationSet) -> LoadReport {
    let mut report = LoadReport::defaults_only(defaults, true);

    let root: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "calibration file is not valid JSON, using defaults");
            report
                .rejected
                .push(VisionError::calibration(FILE_SCOPE, e.to_string()));
            return report;
        }
    };
    let Value::Object(entries) = root else {
        warn!("calibration file is not an object, using defaults");
        report
            .rejected
            .push(VisionError::calibration(FILE_SCOPE, "top level is not an object"));
        return report;
    };

    for (name, entry) in entries {
        let Some(default) = defaults.get(&name) else {
            debug!(color = %name, "ignoring uncalibrated color in file");
            report.ignored.push(name);
            continue;
        };

        let parsed = parse_entry(&entry).and_then(|(lower, upper)| {
            default
                .with_bounds(lower, upper)
                .map_err(|e| match e {
                    VisionError::InvalidCalibrationData { reason, .. } => reason,
                    other => other.to_string(),
                })
        });

        match parsed {
            Ok(profile) => {
                report.set.insert(profile);
            }
            Err(reason) => {
                warn!(color = %name, %reason, "rejected calibration entry, keeping default");
                report.rejected.push(VisionError::calibration(name, reason));
            }
        }
    }

    report
}

/// Accepts `{"lower": [..], "upper": [..]}` and the older `[[..], [..]]` pair form.
fn parse_entry(entry: &Value) -> std::result::Result<(Bounds, Bounds), String> {
    match entry {
        Value::Object(fields) => {
            let lower = fields.get("lower").ok_or("missing 'lower'")?;
            let upper = fields.get("upper").ok_or("missing 'upper'")?;
            Ok((parse_bounds("lower", lower)?, parse_bounds("upper", upper)?))
        }
        Value::Array(pair) if pair.len() == 2 => {
            Ok((parse_bounds("lower", &pair[0])?, parse_bounds("upper", &pair[1])?))
        }
        _ => Err("entry is not an object with 'lower' and 'upper'".to_string()),
    }
}

fn parse_bounds(field: &str, value: &Value) -> std::result::Result<Bounds, String> {
    let Value::Array(items) = value else {
        return Err(format!("'{field}' is not an array"));
    };
    if items.len() != 3 {
        return Err(format!("'{field}' has {} channels, expected 3", items.len()));
    }
    let mut bounds = [0u8; 3];
    for (slot, item) in bounds.iter_mut().zip(items) {
        let channel = item
            .as_u64()
            .ok_or_else(|| format!("'{field}' contains non-integer {item}"))?;
        *slot = u8::try_from(channel)
            .map_err(|_| format!("'{field}' value {channel} exceeds 255"))?;
    }
    Ok(bounds)
}
