// THEORY (Single-Pixel Color Conversion):
// The `pixel` module is the most fundamental unit of the detection pipeline. It
// converts one RGB pixel into the working color space (HSV) and knows nothing
// about neighbors in space or time. Everything that needs more than one pixel
// (masks, morphology, regions) lives in higher modules.
//
// Conventions follow the 8-bit HSV layout that calibration files are written in:
// - Hue:        degrees / 2, rounded, in 0..=179 (so the full wheel fits a byte)
// - Saturation: chroma / value scaled to 0..=255
// - Value:      max(R, G, B) in 0..=255
//
// Hue is computed with integer numerators and a single rounding step so that the
// same RGB triple always lands on the same hue byte.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type Byte = u8;
pub type Hue = u8;
pub type Saturation = u8;
pub type Value = u8;

/// Largest hue byte; hue wraps at 180.
pub const HUE_MAX: Byte = 179;
/// Largest saturation/value byte.
pub const SV_MAX: Byte = 255;

/// One of the three HSV channels a threshold applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Hue,
    Saturation,
    Value,
}

impl Channel {
    /// All channels in storage order (the order of bound arrays on disk).
    pub const ALL: [Channel; 3] = [Channel::Hue, Channel::Saturation, Channel::Value];

    /// Position of this channel inside a `[u8; 3]` bound.
    pub fn index(self) -> usize {
        match self {
            Channel::Hue => 0,
            Channel::Saturation => 1,
            Channel::Value => 2,
        }
    }

    /// Largest valid value for this channel.
    pub fn max(self) -> Byte {
        match self {
            Channel::Hue => HUE_MAX,
            Channel::Saturation | Channel::Value => SV_MAX,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Hue => "h",
            Channel::Saturation => "s",
            Channel::Value => "v",
        };
        f.write_str(name)
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "h" | "hue" => Ok(Channel::Hue),
            "s" | "sat" | "saturation" => Ok(Channel::Saturation),
            "v" | "val" | "value" => Ok(Channel::Value),
            other => Err(format!("unknown channel '{other}'")),
        }
    }
}

/// A single pixel in the working color space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HsvPixel {
    /// Hue byte (0-179).
    pub hue: Hue,
    /// Saturation byte (0-255).
    pub saturation: Saturation,
    /// Value byte (0-255).
    pub value: Value,
}

impl HsvPixel {
    pub fn new(hue: Hue, saturation: Saturation, value: Value) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Converts an RGB triple.
    pub fn from_rgb(red: Byte, green: Byte, blue: Byte) -> Self {
        let (r, g, b) = (red as i32, green as i32, blue as i32);
        let maximum = r.max(g).max(b);
        let minimum = r.min(g).min(b);
        let chroma = maximum - minimum;

        let saturation = if maximum == 0 {
            0
        } else {
            div_round(chroma * SV_MAX as i32, maximum)
        };

        let hue = if chroma == 0 {
            0
        } else {
            // Numerator in half-degrees * chroma: each sextant spans 30 hue bytes.
            let numerator = if maximum == r {
                (g - b) * 30
            } else if maximum == g {
                (b - r) * 30 + 60 * chroma
            } else {
                (r - g) * 30 + 120 * chroma
            };
            let mut hue = div_round(numerator, chroma);
            if hue < 0 {
                hue += 180;
            }
            if hue >= 180 {
                hue -= 180;
            }
            hue
        };

        Self {
            hue: hue as Hue,
            saturation: saturation as Saturation,
            value: maximum as Value,
        }
    }

    /// Reads the given channel.
    #[inline]
    pub fn channel(&self, channel: Channel) -> Byte {
        match channel {
            Channel::Hue => self.hue,
            Channel::Saturation => self.saturation,
            Channel::Value => self.value,
        }
    }

    /// Channels as a `[h, s, v]` array in storage order.
    #[inline]
    pub fn to_array(self) -> [Byte; 3] {
        [self.hue, self.saturation, self.value]
    }
}

impl From<[Byte; 3]> for HsvPixel {
    fn from(rgb: [Byte; 3]) -> Self {
        HsvPixel::from_rgb(rgb[0], rgb[1], rgb[2])
    }
}

/// Integer division rounded half away from zero.
#[inline]
fn div_round(numerator: i32, denominator: i32) -> i32 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        -((-numerator + half) / denominator)
    }
}
