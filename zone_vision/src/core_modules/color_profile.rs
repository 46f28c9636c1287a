// THEORY:
// The `color_profile` module holds the calibrated knowledge of what each named
// color looks like in HSV. A `ColorProfile` is a named, range-checked pair of
// per-channel bounds; a `CalibrationSet` is the keyed collection of profiles the
// pipeline evaluates every frame.
//
// Key architectural principles:
// 1.  **Valid by Construction**: A profile can only be built or edited through
//     functions that check every channel against its range and keep
//     `lower <= upper`. Code downstream never re-validates.
// 2.  **Whole-Pair Edits**: Editing one bound produces a new profile value that
//     replaces the old one in a single assignment. A reader holding the set
//     sees either the old pair or the new pair, never a mix.
// 3.  **Stable Order**: The set is a `BTreeMap`, so iteration (and therefore
//     snapshots and saved files) is ordered by name.

use crate::core_modules::pixel::{Byte, Channel, HsvPixel};
use crate::error::{Result, VisionError};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-channel bound triple in `[h, s, v]` order.
pub type Bounds = [Byte; 3];

/// RGB color used to draw a profile's detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayTag(pub [Byte; 3]);

/// Which side of a profile's range an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

impl FromStr for Bound {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lower" | "low" | "min" => Ok(Bound::Lower),
            "upper" | "high" | "max" => Ok(Bound::Upper),
            other => Err(format!("unknown bound '{other}'")),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Lower => f.write_str("lower"),
            Bound::Upper => f.write_str("upper"),
        }
    }
}

/// A named HSV threshold range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorProfile {
    name: String,
    lower: Bounds,
    upper: Bounds,
    display: DisplayTag,
}

impl ColorProfile {
    /// Builds a profile, rejecting out-of-range or inverted bounds.
    pub fn new(
        name: impl Into<String>,
        lower: Bounds,
        upper: Bounds,
        display: DisplayTag,
    ) -> Result<Self> {
        let name = name.into();
        check_bounds(&lower, &upper).map_err(|reason| VisionError::calibration(&name, reason))?;
        Ok(Self {
            name,
            lower,
            upper,
            display,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> Bounds {
        self.lower
    }

    pub fn upper(&self) -> Bounds {
        self.upper
    }

    pub fn display(&self) -> DisplayTag {
        self.display
    }

    /// True iff every channel of `pixel` lies inside `[lower, upper]`.
    #[inline]
    pub fn contains(&self, pixel: &HsvPixel) -> bool {
        let hsv = pixel.to_array();
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }

    /// Returns a copy with `value` written into one channel of one bound.
    pub fn with_threshold(&self, bound: Bound, channel: Channel, value: Byte) -> Result<Self> {
        let (mut lower, mut upper) = (self.lower, self.upper);
        match bound {
            Bound::Lower => lower[channel.index()] = value,
            Bound::Upper => upper[channel.index()] = value,
        }
        check_bounds(&lower, &upper)
            .map_err(|reason| VisionError::threshold(&self.name, reason))?;
        Ok(Self {
            name: self.name.clone(),
            lower,
            upper,
            display: self.display,
        })
    }

    /// Returns a copy with both bounds replaced, keeping name and display tag.
    pub fn with_bounds(&self, lower: Bounds, upper: Bounds) -> Result<Self> {
        ColorProfile::new(self.name.clone(), lower, upper, self.display)
    }
}

/// Checks channel ranges and ordering; returns a human-readable reason on failure.
pub(crate) fn check_bounds(lower: &Bounds, upper: &Bounds) -> std::result::Result<(), String> {
    for channel in Channel::ALL {
        let i = channel.index();
        let max = channel.max();
        if lower[i] > max {
            return Err(format!("lower {channel} = {} exceeds {max}", lower[i]));
        }
        if upper[i] > max {
            return Err(format!("upper {channel} = {} exceeds {max}", upper[i]));
        }
        if lower[i] > upper[i] {
            return Err(format!(
                "lower {channel} = {} is above upper {channel} = {}",
                lower[i], upper[i]
            ));
        }
    }
    Ok(())
}

/// The keyed collection of profiles evaluated each frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalibrationSet {
    profiles: BTreeMap<String, ColorProfile>,
}

impl CalibrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in profiles used at start-up and as per-entry fallback.
    pub fn defaults() -> Self {
        let table: [(&str, Bounds, Bounds, [Byte; 3]); 4] = [
            ("Red", [0, 120, 70], [10, 255, 255], [255, 0, 0]),
            ("Green", [36, 50, 70], [89, 255, 255], [0, 255, 0]),
            ("Blue", [94, 80, 2], [126, 255, 255], [0, 0, 255]),
            ("Yellow", [15, 150, 150], [35, 255, 255], [255, 255, 0]),
        ];
        let mut set = Self::new();
        for (name, lower, upper, display) in table {
            set.profiles.insert(
                name.to_string(),
                ColorProfile {
                    name: name.to_string(),
                    lower,
                    upper,
                    display: DisplayTag(display),
                },
            );
        }
        set
    }

    /// Inserts or replaces a profile by its name.
    pub fn insert(&mut self, profile: ColorProfile) -> Option<ColorProfile> {
        self.profiles.insert(profile.name.clone(), profile)
    }

    pub fn get(&self, name: &str) -> Option<&ColorProfile> {
        self.profiles.get(name)
    }

    /// Like `get`, but reports `UnknownColor`.
    pub fn require(&self, name: &str) -> Result<&ColorProfile> {
        self.get(name)
            .ok_or_else(|| VisionError::UnknownColor(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColorProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Edits one channel of one bound of a named profile.
    ///
    /// The set is left untouched when the color is unknown or the edit is invalid.
    pub fn set_threshold(
        &mut self,
        color: &str,
        bound: Bound,
        channel: Channel,
        value: Byte,
    ) -> Result<()> {
        let updated = self.require(color)?.with_threshold(bound, channel, value)?;
        self.insert(updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red() -> ColorProfile {
        ColorProfile::new("Red", [0, 120, 70], [10, 255, 255], DisplayTag([255, 0, 0])).unwrap()
    }

    #[test]
    fn bounds_are_range_checked() {
        assert!(ColorProfile::new("X", [0, 0, 0], [179, 255, 255], DisplayTag([0; 3])).is_ok());
        assert!(ColorProfile::new("X", [0, 0, 0], [180, 255, 255], DisplayTag([0; 3])).is_err());
        assert!(ColorProfile::new("X", [20, 0, 0], [10, 255, 255], DisplayTag([0; 3])).is_err());
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let profile = red();
        assert!(profile.contains(&HsvPixel::new(0, 120, 70)));
        assert!(profile.contains(&HsvPixel::new(10, 255, 255)));
        assert!(!profile.contains(&HsvPixel::new(11, 200, 200)));
        assert!(!profile.contains(&HsvPixel::new(5, 119, 200)));
    }

    #[test]
    fn threshold_edit_replaces_only_the_target_channel() {
        let mut set = CalibrationSet::defaults();
        set.set_threshold("Red", Bound::Upper, Channel::Hue, 15).unwrap();
        let profile = set.get("Red").unwrap();
        assert_eq!(profile.upper(), [15, 255, 255]);
        assert_eq!(profile.lower(), [0, 120, 70]);
        assert_eq!(profile.display(), DisplayTag([255, 0, 0]));
    }

    #[test]
    fn invalid_edits_leave_the_set_unchanged() {
        let mut set = CalibrationSet::defaults();
        let before = set.clone();

        assert!(matches!(
            set.set_threshold("Magenta", Bound::Lower, Channel::Hue, 1),
            Err(VisionError::UnknownColor(_))
        ));
        assert!(matches!(
            set.set_threshold("Red", Bound::Lower, Channel::Hue, 50),
            Err(VisionError::InvalidThreshold { .. })
        ));
        assert!(matches!(
            set.set_threshold("Red", Bound::Upper, Channel::Hue, 200),
            Err(VisionError::InvalidThreshold { .. })
        ));
        assert_eq!(set, before);
    }

    #[test]
    fn defaults_are_ordered_by_name() {
        let names: Vec<_> = CalibrationSet::defaults().names().map(str::to_owned).collect();
        assert_eq!(names, ["Blue", "Green", "Red", "Yellow"]);
    }
}
