//! Axis-aligned rectangles on the horizontal plane

use crate::core::types::{DVec2, RegionPos, REGION_WIDTH};

/// Horizontal footprint of a cell or region, in block coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellRect {
    pub min: DVec2,
    pub max: DVec2,
}

impl CellRect {
    /// Footprint of cell `(x, z)` at `detail`
    pub fn from_cell(detail: u8, x: i32, z: i32) -> Self {
        let width = (1i64 << detail) as f64;
        let min = DVec2::new(x as f64 * width, z as f64 * width);
        Self { min, max: min + DVec2::splat(width) }
    }

    /// Footprint of a whole region
    pub fn from_region(pos: RegionPos) -> Self {
        let min = pos.min_block().as_dvec2();
        Self { min, max: min + DVec2::splat(REGION_WIDTH as f64) }
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    /// Distance from `p` to the nearest point of the rectangle; 0 inside
    pub fn min_distance(&self, p: DVec2) -> f64 {
        p.clamp(self.min, self.max).distance(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cell() {
        let r = CellRect::from_cell(4, 2, -1);
        assert_eq!(r.min, DVec2::new(32.0, -16.0));
        assert_eq!(r.max, DVec2::new(48.0, 0.0));
        assert_eq!(r.center(), DVec2::new(40.0, -8.0));
    }

    #[test]
    fn test_region_matches_root_cell() {
        let pos = RegionPos::new(-2, 3);
        assert_eq!(CellRect::from_region(pos), CellRect::from_cell(9, -2, 3));
    }

    #[test]
    fn test_min_distance() {
        let r = CellRect { min: DVec2::ZERO, max: DVec2::splat(10.0) };
        assert_eq!(r.min_distance(DVec2::new(5.0, 5.0)), 0.0);
        assert_eq!(r.min_distance(DVec2::new(15.0, 5.0)), 5.0);
        assert_eq!(r.min_distance(DVec2::new(13.0, 14.0)), 5.0);
        // Edges count as inside
        assert_eq!(r.min_distance(DVec2::new(10.0, 0.0)), 0.0);
    }
}
