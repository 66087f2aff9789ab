//! Core type aliases and re-exports

pub use glam::{DVec2, IVec2};

/// Standard Result type for the engine
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Side length of a region in blocks.
pub const REGION_WIDTH: i32 = 512;

/// Detail level of a whole region (coarsest level).
pub const REGION_DETAIL_LEVEL: u8 = 9;

/// Detail level of a single block (finest level).

/// Number of detail levels a region can hold.
pub const MAX_DETAIL: u8 = REGION_DETAIL_LEVEL + 1;

/// Number of blocks in a chunk side, used by render distances.
pub const CHUNK_WIDTH: i32 = 16;

/// Integer coordinate of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionPos {
    pub x: i32,
    pub z: i32,
}

impl RegionPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Region containing the given block coordinate.
    pub fn from_block(block_x: i32, block_z: i32) -> Self {
        Self {
            x: block_x.div_euclid(REGION_WIDTH),
            z: block_z.div_euclid(REGION_WIDTH),
        }
    }

    /// Region containing the cell `(x, z)` of the given detail level.
    pub fn from_cell(detail: u8, x: i32, z: i32) -> Self {
        let shift = REGION_DETAIL_LEVEL - detail;
        Self { x: x >> shift, z: z >> shift }
    }

    /// Block coordinate of the region's minimum corner.
    pub fn min_block(&self) -> IVec2 {
        IVec2::new(self.x * REGION_WIDTH, self.z * REGION_WIDTH)
    }

    pub fn offset(&self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }
}

impl From<IVec2> for RegionPos {
    fn from(v: IVec2) -> Self {
        Self { x: v.x, z: v.y }
    }
}

/// Number of cells along one side of a region at `detail`.
#[inline]
pub fn cells_per_region(detail: u8) -> i32 {
    1 << (REGION_DETAIL_LEVEL - detail)
}

/// Converts a cell index from one detail level to another.
///
/// Going coarser divides (flooring toward negative infinity), going finer
/// returns the minimum-corner child.
#[inline]
pub fn convert_cell(from: u8, value: i32, to: u8) -> i32 {
    if to >= from {
        value >> (to - from)
    } else {
        value << (from - to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_from_block() {
        assert_eq!(RegionPos::from_block(0, 0), RegionPos::new(0, 0));
        assert_eq!(RegionPos::from_block(511, 512), RegionPos::new(0, 1));
        assert_eq!(RegionPos::from_block(-1, -512), RegionPos::new(-1, -1));
        assert_eq!(RegionPos::from_block(-513, 0), RegionPos::new(-2, 0));
    }

    #[test]
    fn test_region_from_cell() {
        // Detail 4 cells are 16 blocks wide, 32 per region
        assert_eq!(RegionPos::from_cell(4, 31, 32), RegionPos::new(0, 1));
        assert_eq!(RegionPos::from_cell(4, -1, 0), RegionPos::new(-1, 0));
        assert_eq!(RegionPos::from_cell(REGION_DETAIL_LEVEL, 3, -2), RegionPos::new(3, -2));
    }

    #[test]
    fn test_convert_cell() {
        assert_eq!(convert_cell(0, 100, 4), 6);
        assert_eq!(convert_cell(0, -1, 4), -1);
        assert_eq!(convert_cell(4, 6, 0), 96);
        assert_eq!(convert_cell(3, 5, 3), 5);
    }

    #[test]
    fn test_cells_per_region() {
        assert_eq!(cells_per_region(REGION_DETAIL_LEVEL), 1);
        assert_eq!(cells_per_region(0), 512);
    }
}
