//! Distance-based detail selection
//!
//! Maps a horizontal distance from the player to the detail level a cell at
//! that distance should be generated and drawn at. Detail 0 is one cell per
//! block; each level above it doubles the cell width.
//!
//! The mapping starts at `draw_resolution` near the player and grows either
//! linearly (`HorizontalQuality::Lowest`) or logarithmically with the
//! quality's base. Everything at or past the render distance uses the
//! coarsest level.

use serde::{Deserialize, Serialize};

use crate::core::config::LodConfig;
use crate::core::types::{CHUNK_WIDTH, MAX_DETAIL};

/// Blocks per distance unit at `horizontal_scale = 1`
pub const BASE_DISTANCE_UNIT: f64 = 16.0;

/// Coarsest detail the policy hands out
pub const COARSEST_DETAIL: u8 = MAX_DETAIL - 1;

/// How quickly detail falls off with distance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HorizontalQuality {
    /// Linear falloff
    Lowest,
    Low,
    Medium,
    High,
}

impl HorizontalQuality {
    /// Base of the logarithmic falloff; 1.0 means linear
    pub fn quadratic_base(self) -> f64 {
        match self {
            HorizontalQuality::Lowest => 1.0,
            HorizontalQuality::Low => 1.5,
            HorizontalQuality::Medium => 2.0,
            HorizontalQuality::High => 2.2,
        }
    }
}

/// How many vertical segments a column keeps at each detail level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerticalQuality {
    Low,
    Medium,
    High,
}

impl VerticalQuality {
    /// Segments per column, indexed by detail level
    pub fn max_vertical_data(self) -> &'static [usize; MAX_DETAIL as usize] {
        match self {
            VerticalQuality::Low => &[4, 2, 2, 2, 2, 1, 1, 1, 1, 1],
            VerticalQuality::Medium => &[6, 4, 3, 2, 2, 1, 1, 1, 1, 1],
            VerticalQuality::High => &[8, 6, 4, 2, 2, 2, 2, 1, 1, 1],
        }
    }

    /// Segments per column at `detail`
    pub fn vertical_size(self, detail: u8) -> usize {
        let table = self.max_vertical_data();
        table[(detail as usize).min(table.len() - 1)]
    }

    /// Directory name used by the region store
    pub fn name(self) -> &'static str {
        match self {
            VerticalQuality::Low => "low",
            VerticalQuality::Medium => "medium",
            VerticalQuality::High => "high",
        }
    }
}

/// Distance to detail mapping built from a [`LodConfig`]
#[derive(Clone, Debug, PartialEq)]
pub struct DetailPolicy {
    pub horizontal_quality: HorizontalQuality,
    pub vertical_quality: VerticalQuality,
    /// Finest level generated or drawn
    pub min_detail: u8,
    /// Width of the first detail band, in blocks
    pub distance_unit: f64,
    /// Render distance in blocks
    pub max_distance: f64,
    /// Target detail at or above which a whole region is one cell
    pub fast_mode_switch: Option<u8>,
}

impl DetailPolicy {
    pub fn from_config(config: &LodConfig) -> Self {
        Self {
            horizontal_quality: config.horizontal_quality,
            vertical_quality: config.vertical_quality,
            min_detail: config.draw_resolution.min(COARSEST_DETAIL),
            distance_unit: BASE_DISTANCE_UNIT * config.horizontal_scale.max(1) as f64,
            max_distance: (config.render_distance_chunks as i32 * CHUNK_WIDTH * 2) as f64,
            fast_mode_switch: config.fast_mode_switch,
        }
    }

    /// Detail level for a cell `distance` blocks from the player.
    ///
    /// # Returns
    /// A level in `min_detail..=COARSEST_DETAIL`. NaN and negative
    /// distances map to `min_detail`; anything at or past `max_distance`
    /// maps to `COARSEST_DETAIL`.
    pub fn detail_from_distance(&self, distance: f64) -> u8 {
        if distance.is_nan() || distance <= 0.0 {
            return self.min_detail;
        }
        if distance >= self.max_distance {
            return COARSEST_DETAIL;
        }

        let ratio = distance / self.distance_unit;
        let base = self.horizontal_quality.quadratic_base();
        let steps = if base <= 1.0 {
            ratio.floor()
        } else if ratio < 1.0 {
            0.0
        } else {
            // Exact band starts must not round down a level
            (ratio.ln() / base.ln() + 1e-9).floor()
        };

        let detail = self.min_detail as f64 + steps;
        detail.clamp(self.min_detail as f64, COARSEST_DETAIL as f64) as u8
    }

    /// Nearest distance at which `detail` is selected.
    pub fn distance_from_detail(&self, detail: u8) -> f64 {
        if detail <= self.min_detail {
            return 0.0;
        }
        let steps = (detail - self.min_detail) as f64;
        let base = self.horizontal_quality.quadratic_base();
        let distance = if base <= 1.0 {
            steps * self.distance_unit
        } else {
            self.distance_unit * base.powf(steps)
        };
        distance.min(self.max_distance)
    }

    /// Finest level a region whose nearest point is `distance` away still
    /// needs. One level of slack below the selected detail avoids re-growing
    /// a region the player only moved slightly towards.
    pub fn cut_detail(&self, distance: f64) -> u8 {
        self.detail_from_distance(distance)
            .saturating_sub(1)
            .max(self.min_detail)
    }

    /// Segments per column at `detail`
    pub fn vertical_size(&self, detail: u8) -> usize {
        self.vertical_quality.vertical_size(detail)
    }

    /// True if a region targeted at `detail` is drawn as one cell
    pub fn is_giant_block(&self, detail: u8) -> bool {
        self.fast_mode_switch.is_some_and(|switch| detail >= switch)
    }
}

impl Default for DetailPolicy {
    fn default() -> Self {
        Self::from_config(&LodConfig::default())
    }
}
