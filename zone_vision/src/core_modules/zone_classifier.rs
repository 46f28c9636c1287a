// THEORY:
// The `ZoneClassifier` reduces a list of regions to the coarse horizontal
// position a controller can act on. The frame width is split into `zone_count`
// equal contiguous bands, and each region votes for the band holding its
// horizontal center.
//
// Every band is `W / N` pixels wide in integer arithmetic and the zone index is
// `cx / (W / N)`. When `W` is not a multiple of `N` the leftover columns on the
// right join the last band, since indices are clamped into `[0, N - 1]`. The
// markers drawn by the overlay are the same `k * (W / N)` edges. Which band a
// center lying exactly on an edge joins is governed by the `BoundaryRule`.

use crate::core_modules::region::Region;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Default number of zones.
pub const DEFAULT_ZONE_COUNT: u32 = 3;

/// Ordered, deduplicated zone indices where a color was seen.
pub type ZoneResult = Vec<u32>;

/// Tie-break for a center exactly on the edge between two zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryRule {
    /// The edge belongs to the zone that starts there (floor division).
    #[default]
    Floor,
    /// The edge belongs to the zone that ends there.
    Ceil,
}

impl FromStr for BoundaryRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "floor" => Ok(BoundaryRule::Floor),
            "ceil" => Ok(BoundaryRule::Ceil),
            other => Err(format!("unknown boundary rule '{other}' (expected floor or ceil)")),
        }
    }
}

/// Geometry of the zone split for one frame width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneLayout {
    pub frame_width: u32,
    pub zone_count: u32,
    pub boundary_rule: BoundaryRule,
}

impl ZoneLayout {
    pub fn new(frame_width: u32, zone_count: u32, boundary_rule: BoundaryRule) -> Self {
        Self {
            frame_width,
            zone_count: zone_count.max(1),
            boundary_rule,
        }
    }

    /// Width of every band, `W / N` rounded down. Never zero.
    pub fn zone_width(&self) -> u32 {
        (self.frame_width / self.zone_count).max(1)
    }

    /// Zone index for a horizontal center.
    pub fn zone_of(&self, center_x: u32) -> u32 {
        let width = self.zone_width();
        let zone = match self.boundary_rule {
            BoundaryRule::Floor => center_x / width,
            BoundaryRule::Ceil => center_x.div_ceil(width).saturating_sub(1),
        };
        zone.min(self.zone_count - 1)
    }

    /// Interior zone edges `k * (W / N)` for `k = 1..N`.
    pub fn boundaries(&self) -> Vec<u32> {
        let width = self.zone_width() as u64;
        (1..self.zone_count as u64)
            .map(|k| (k * width).min(self.frame_width as u64) as u32)
            .collect()
    }

    /// Distinct zones touched by any region, ascending.
    pub fn classify(&self, regions: &[Region]) -> ZoneResult {
        regions
            .iter()
            .map(|region| self.zone_of(region.center_x()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Free-function form of [`ZoneLayout::classify`] with the default tie-break.
pub fn classify(regions: &[Region], frame_width: u32, zone_count: u32) -> ZoneResult {
    ZoneLayout::new(frame_width, zone_count, BoundaryRule::Floor).classify(regions)
}
