//! Bounded position lists for generation and rendering
//!
//! Both containers are filled by walking a region's quadtree and keep the
//! cells nearest to the player. With sorting enabled they hold their
//! entries in ascending distance and a closer cell displaces the farthest
//! one once full; without sorting they simply stop accepting.

use serde::{Deserialize, Serialize};

use crate::core::types::{cells_per_region, convert_cell, DVec2, RegionPos, MAX_DETAIL, REGION_DETAIL_LEVEL};
use crate::math::CellRect;

/// A cell with its distance to the player
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenPos {
    pub detail: u8,
    pub x: i32,
    pub z: i32,
    /// Distance from the player to the nearest point of the cell
    pub distance: f64,
}

impl GenPos {
    /// Compute the distance of cell `(detail, x, z)` to `player`
    pub fn new(detail: u8, x: i32, z: i32, player: DVec2) -> Self {
        let distance = CellRect::from_cell(detail, x, z).min_distance(player);
        Self { detail, x, z, distance }
    }
}

/// Ordering of near against far generation work
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenerationPriority {
    /// Finish nearby detail before anything far away
    NearFirst,
    /// Coarse overview of far cells, fine detail near the player
    Balanced,
    /// Coarse overview everywhere first
    FarFirst,
}

impl GenerationPriority {
    /// Detail level from which a request counts as "far"
    pub fn far_min_detail(self) -> u8 {
        match self {
            GenerationPriority::NearFirst => 10,
            GenerationPriority::Balanced => 4,
            GenerationPriority::FarFirst => 0,
        }
    }

    /// True if a node at `detail` with missing data is requested itself
    /// instead of descending to its children.
    pub fn coarse_first(self, detail: u8) -> bool {
        match self {
            GenerationPriority::NearFirst => false,
            GenerationPriority::Balanced => detail >= self.far_min_detail(),
            GenerationPriority::FarFirst => true,
        }
    }
}

/// Insert into a capacity-bounded list.
///
/// Sorted lists keep ascending distance; equal distances keep insertion
/// order. Returns whether the position was kept.
fn insert_bounded(list: &mut Vec<GenPos>, capacity: usize, pos: GenPos, sort: bool) -> bool {
    if capacity == 0 || pos.distance.is_nan() {
        return false;
    }
    if !sort {
        if list.len() < capacity {
            list.push(pos);
            return true;
        }
        return false;
    }

    let index = list.partition_point(|p| p.distance <= pos.distance);
    if index >= capacity {
        return false;
    }
    if list.len() == capacity {
        list.pop();
    }
    list.insert(index, pos);
    true
}

fn has_room(list: &[GenPos], capacity: usize, distance: f64, sort: bool) -> bool {
    if list.len() < capacity {
        return true;
    }
    sort && list.last().is_some_and(|worst| distance < worst.distance)
}

/// Cells that need generating, split into near and far lists.
#[derive(Clone, Debug)]
pub struct PosToGenerate {
    near: Vec<GenPos>,
    far: Vec<GenPos>,
    near_capacity: usize,
    far_capacity: usize,
    far_min_detail: u8,
    player: DVec2,
    sort: bool,
}

impl PosToGenerate {
    /// Create empty lists.
    ///
    /// # Arguments
    /// * `near_capacity` - Max cells finer than `far_min_detail`
    /// * `far_capacity` - Max cells at or above `far_min_detail`
    /// * `far_min_detail` - Detail at which a request counts as far
    /// * `player` - Block position distances are measured from
    /// * `sort` - Keep the nearest cells instead of the first ones
    pub fn new(near_capacity: usize, far_capacity: usize, far_min_detail: u8, player: DVec2, sort: bool) -> Self {
        Self {
            near: Vec::with_capacity(near_capacity),
            far: Vec::with_capacity(far_capacity),
            near_capacity,
            far_capacity,
            far_min_detail,
            player,
            sort,
        }
    }

    /// Same configuration, no entries
    pub fn empty_like(&self) -> Self {
        Self::new(self.near_capacity, self.far_capacity, self.far_min_detail, self.player, self.sort)
    }

    pub fn player(&self) -> DVec2 {
        self.player
    }

    /// Offer cell `(detail, x, z)`; returns whether it was kept
    pub fn add(&mut self, detail: u8, x: i32, z: i32) -> bool {
        self.add_pos(GenPos::new(detail, x, z, self.player))
    }

    /// Offer a position whose distance is already known
    pub fn add_pos(&mut self, pos: GenPos) -> bool {
        if pos.detail < self.far_min_detail {
            insert_bounded(&mut self.near, self.near_capacity, pos, self.sort)
        } else {
            insert_bounded(&mut self.far, self.far_capacity, pos, self.sort)
        }
    }

    /// True if some cell at `distance` could still be kept by either list
    pub fn can_accept(&self, distance: f64) -> bool {
        has_room(&self.near, self.near_capacity, distance, self.sort)
            || (self.far_min_detail < MAX_DETAIL && has_room(&self.far, self.far_capacity, distance, self.sort))
    }

    pub fn near(&self) -> &[GenPos] {
        &self.near
    }

    pub fn far(&self) -> &[GenPos] {
        &self.far
    }

    pub fn len(&self) -> usize {
        self.near.len() + self.far.len()
    }

    pub fn is_empty(&self) -> bool {
        self.near.is_empty() && self.far.is_empty()
    }

    pub fn clear(&mut self) {
        self.near.clear();
        self.far.clear();
    }

    /// Near entries, then far entries
    pub fn iter(&self) -> impl Iterator<Item = &GenPos> {
        self.near.iter().chain(self.far.iter())
    }
}

/// Coverage bits for one detail level of a region
#[derive(Clone, Debug)]
struct Occupancy {
    size: usize,
    /// Some covered cell lies inside this cell
    touched: Vec<u64>,
    /// This exact cell was added
    covered: Vec<u64>,
}

impl Occupancy {
    fn new(detail: u8) -> Self {
        let size = cells_per_region(detail) as usize;
        let words = (size * size).div_ceil(64);
        Self { size, touched: vec![0; words], covered: vec![0; words] }
    }

    fn bit(&self, x: usize, z: usize) -> (usize, u64) {
        debug_assert!(x < self.size && z < self.size);
        let index = x * self.size + z;
        (index / 64, 1u64 << (index % 64))
    }

    fn clear(&mut self) {
        self.touched.fill(0);
        self.covered.fill(0);
    }
}

/// Cells to draw for one region.
///
/// Coverage is tracked per detail level from `min_detail` up to the region
/// cell, so an overlap check costs one lookup per level above the cell.
#[derive(Clone, Debug)]
pub struct PosToRender {
    positions: Vec<GenPos>,
    capacity: usize,
    min_detail: u8,
    region: RegionPos,
    player: DVec2,
    sort: bool,
    levels: Vec<Occupancy>,
}

impl PosToRender {
    pub fn new(capacity: usize, min_detail: u8, region: RegionPos, player: DVec2, sort: bool) -> Self {
        let min_detail = min_detail.min(REGION_DETAIL_LEVEL);
        Self {
            positions: Vec::new(),
            capacity,
            min_detail,
            region,
            player,
            sort,
            levels: (min_detail..=REGION_DETAIL_LEVEL).map(Occupancy::new).collect(),
        }
    }

    pub fn region(&self) -> RegionPos {
        self.region
    }

    pub fn min_detail(&self) -> u8 {
        self.min_detail
    }

    pub fn player(&self) -> DVec2 {
        self.player
    }

    /// Occupancy level and bit of world cell `(x, z)` at `detail`
    fn slot(&self, detail: u8, x: i32, z: i32) -> (usize, usize, u64) {
        let cells = cells_per_region(detail);
        let local_x = (x - self.region.x * cells) as usize;
        let local_z = (z - self.region.z * cells) as usize;
        let level = (detail - self.min_detail) as usize;
        let (word, mask) = self.levels[level].bit(local_x, local_z);
        (level, word, mask)
    }

    /// True if any part of cell `(detail, x, z)` is already covered
    pub fn contains(&self, detail: u8, x: i32, z: i32) -> bool {
        assert!(detail >= self.min_detail, "detail {} below render resolution {}", detail, self.min_detail);
        let (level, word, mask) = self.slot(detail, x, z);
        if self.levels[level].touched[word] & mask != 0 {
            return true;
        }
        // Covered by an added ancestor
        ((detail + 1)..=REGION_DETAIL_LEVEL).any(|up| {
            let (level, word, mask) = self.slot(up, convert_cell(detail, x, up), convert_cell(detail, z, up));
            self.levels[level].covered[word] & mask != 0
        })
    }

    /// Offer cell `(detail, x, z)`; returns whether it was kept
    pub fn add(&mut self, detail: u8, x: i32, z: i32) -> bool {
        let pos = GenPos::new(detail, x, z, self.player);
        let was_full = self.positions.len() == self.capacity;
        if !insert_bounded(&mut self.positions, self.capacity, pos, self.sort) {
            return false;
        }
        if was_full {
            // The farthest entry was displaced
            self.levels.iter_mut().for_each(Occupancy::clear);
            for i in 0..self.positions.len() {
                let p = self.positions[i];
                self.mark(p.detail, p.x, p.z);
            }
        } else {
            self.mark(detail, x, z);
        }
        true
    }

    fn mark(&mut self, detail: u8, x: i32, z: i32) {
        assert!(detail >= self.min_detail, "detail {} below render resolution {}", detail, self.min_detail);
        let (level, word, mask) = self.slot(detail, x, z);
        self.levels[level].covered[word] |= mask;
        for up in detail..=REGION_DETAIL_LEVEL {
            let (level, word, mask) = self.slot(up, convert_cell(detail, x, up), convert_cell(detail, z, up));
            self.levels[level].touched[word] |= mask;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenPos> {
        self.positions.iter()
    }

    pub fn positions(&self) -> &[GenPos] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
