//! One region: a quadtree of level containers
//!
//! A [`Region`] covers 512×512 blocks and owns one [`LevelContainer`] per
//! materialized detail level, from `min_detail_level` (finest) up to the
//! region level 9 (one cell). Coordinates passed to a region are world cell
//! indices at the given detail; the region converts them to local indices
//! and panics on cells it does not contain.
//!
//! Writers must hold a [`WriteLease`] for the whole duration of a write.
//! Maintenance sweeps skip regions with an active lease instead of
//! blocking on them.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::core::types::{cells_per_region, RegionPos, REGION_DETAIL_LEVEL, MAX_DETAIL};
use crate::lod::data_point::{DataPoint, GenerationMode};
use crate::lod::level_container::LevelContainer;
use crate::math::CellRect;
use crate::streaming::lod::{DetailPolicy, VerticalQuality};
use crate::streaming::priority::{GenPos, GenerationPriority, PosToGenerate, PosToRender};

/// Child cell offsets in traversal order
const CHILD_OFFSETS: [(i32, i32); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// Materialized levels of a region
#[derive(Debug)]
pub struct Levels {
    min_detail: u8,
    containers: [Option<LevelContainer>; MAX_DETAIL as usize],
}

impl Levels {
    pub fn min_detail(&self) -> u8 {
        self.min_detail
    }

    /// Container at `detail`; panics below the minimum detail
    pub fn container(&self, detail: u8) -> &LevelContainer {
        assert!(
            detail >= self.min_detail && detail <= REGION_DETAIL_LEVEL,
            "detail {} is not materialized (minimum {})",
            detail,
            self.min_detail
        );
        match &self.containers[detail as usize] {
            Some(container) => container,
            None => panic!("container missing for materialized detail {}", detail),
        }
    }

    fn container_mut(&mut self, detail: u8) -> &mut LevelContainer {
        assert!(
            detail >= self.min_detail && detail <= REGION_DETAIL_LEVEL,
            "detail {} is not materialized (minimum {})",
            detail,
            self.min_detail
        );
        match &mut self.containers[detail as usize] {
            Some(container) => container,
            None => panic!("container missing for materialized detail {}", detail),
        }
    }

    /// Rebuild cell `(x, z)` of `detail` from the level below.
    ///
    /// With `keep_better` a stored column of higher priority survives;
    /// otherwise the synthesized column replaces it.
    fn rebuild(&mut self, detail: u8, x: usize, z: usize, keep_better: bool) -> bool {
        let (lower, upper) = self.containers.split_at_mut(detail as usize);
        match (lower[detail as usize - 1].as_ref(), upper[0].as_mut()) {
            (Some(child), Some(parent)) if keep_better => parent.merge_from_children(child, x, z),
            (Some(child), Some(parent)) => parent.replace_from_children(child, x, z),
            _ => false,
        }
    }

    /// Materialized containers, finest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LevelContainer> {
        self.containers.iter().flatten()
    }
}

/// RAII marker for an in-flight write.
///
/// Holding a lease keeps the region's writer count above zero so cut and
/// expansion leave it alone.
#[derive(Debug)]
pub struct WriteLease<'a> {
    region: &'a Region,
}

impl WriteLease<'_> {
    pub fn region(&self) -> &Region {
        self.region
    }
}

impl Drop for WriteLease<'_> {
    fn drop(&mut self) {
        self.region.writers.fetch_sub(1, Ordering::AcqRel);
    }
}

/// LOD data for one region
#[derive(Debug)]
pub struct Region {
    pos: RegionPos,
    vertical_quality: VerticalQuality,
    min_y: i32,
    levels: RwLock<Levels>,
    need_saving: AtomicBool,
    need_regen_buffer: AtomicBool,
    need_recheck_gen_point: AtomicBool,
    writers: AtomicUsize,
}

impl Region {
    /// Create an empty region with levels `min_detail..=9`.
    ///
    /// # Arguments
    /// * `pos` - Region coordinate
    /// * `min_detail` - Finest level to materialize
    /// * `vertical_quality` - Segments per column for each level
    /// * `min_y` - World minimum Y heights are relative to
    pub fn new(pos: RegionPos, min_detail: u8, vertical_quality: VerticalQuality, min_y: i32) -> Self {
        let min_detail = min_detail.min(REGION_DETAIL_LEVEL);
        let containers = std::array::from_fn(|detail| {
            let detail = detail as u8;
            (detail >= min_detail && detail <= REGION_DETAIL_LEVEL)
                .then(|| LevelContainer::new(detail, vertical_quality.vertical_size(detail)))
        });
        Self::with_levels(pos, vertical_quality, min_y, Levels { min_detail, containers })
    }

    /// Rebuild a region from loaded containers.
    ///
    /// `containers` must form a contiguous run of levels ending at 9.
    pub fn from_containers(
        pos: RegionPos,
        vertical_quality: VerticalQuality,
        min_y: i32,
        containers: Vec<LevelContainer>,
    ) -> Self {
        let mut slots: [Option<LevelContainer>; MAX_DETAIL as usize] = Default::default();
        let mut min_detail = REGION_DETAIL_LEVEL;
        for container in containers {
            min_detail = min_detail.min(container.detail_level());
            let detail = container.detail_level() as usize;
            slots[detail] = Some(container);
        }
        assert!(
            (min_detail..=REGION_DETAIL_LEVEL).all(|d| slots[d as usize].is_some()),
            "loaded levels for region {:?} are not contiguous",
            pos
        );
        Self::with_levels(pos, vertical_quality, min_y, Levels { min_detail, containers: slots })
    }

    fn with_levels(pos: RegionPos, vertical_quality: VerticalQuality, min_y: i32, levels: Levels) -> Self {
        Self {
            pos,
            vertical_quality,
            min_y,
            levels: RwLock::new(levels),
            need_saving: AtomicBool::new(false),
            need_regen_buffer: AtomicBool::new(true),
            need_recheck_gen_point: AtomicBool::new(true),
            writers: AtomicUsize::new(0),
        }
    }

    pub fn pos(&self) -> RegionPos {
        self.pos
    }

    pub fn vertical_quality(&self) -> VerticalQuality {
        self.vertical_quality
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn min_detail_level(&self) -> u8 {
        self.levels.read().unwrap().min_detail
    }

    /// Run `f` with read access to every materialized level
    pub fn with_levels_read<T>(&self, f: impl FnOnce(&Levels) -> T) -> T {
        f(&self.levels.read().unwrap())
    }

    // --- Flags ---

    /// Start a write; the lease must live until the write is finished
    pub fn begin_write(&self) -> WriteLease<'_> {
        self.writers.fetch_add(1, Ordering::AcqRel);
        WriteLease { region: self }
    }

    pub fn is_being_written(&self) -> bool {
        self.writers.load(Ordering::Acquire) > 0
    }

    pub fn needs_saving(&self) -> bool {
        self.need_saving.load(Ordering::Acquire)
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_need_saving(&self) -> bool {
        self.need_saving.swap(false, Ordering::AcqRel)
    }

    /// Mark dirty again, e.g. after a failed save
    pub fn mark_need_saving(&self) {
        self.need_saving.store(true, Ordering::Release);
    }

    pub fn needs_regen_buffer(&self) -> bool {
        self.need_regen_buffer.load(Ordering::Acquire)
    }

    /// Clear the render-buffer flag, returning whether it was set
    pub fn take_need_regen_buffer(&self) -> bool {
        self.need_regen_buffer.swap(false, Ordering::AcqRel)
    }

    pub fn needs_recheck_gen_point(&self) -> bool {
        self.need_recheck_gen_point.load(Ordering::Acquire)
    }

    /// Clear the generation recheck flag, returning whether it was set
    pub fn take_need_recheck_gen_point(&self) -> bool {
        self.need_recheck_gen_point.swap(false, Ordering::AcqRel)
    }

    fn assert_writer(&self) {
        assert!(
            self.is_being_written(),
            "region {:?} written without a write lease",
            self.pos
        );
    }

    fn mark_changed(&self) {
        self.need_saving.store(true, Ordering::Release);
        self.need_regen_buffer.store(true, Ordering::Release);
        self.need_recheck_gen_point.store(true, Ordering::Release);
    }

    // --- Addressing ---

    /// Region-local index of world cell `(x, z)` at `detail`
    fn local(&self, detail: u8, x: i32, z: i32) -> (usize, usize) {
        let cells = cells_per_region(detail);
        let (lx, lz) = (x - self.pos.x * cells, z - self.pos.z * cells);
        assert!(
            (0..cells).contains(&lx) && (0..cells).contains(&lz),
            "cell ({}, {}) at detail {} is outside region {:?}",
            x,
            z,
            detail,
            self.pos
        );
        (lx as usize, lz as usize)
    }

    // --- Reads ---

    pub fn get(&self, detail: u8, x: i32, z: i32, v: usize) -> DataPoint {
        let (lx, lz) = self.local(detail, x, z);
        self.levels.read().unwrap().container(detail).get(lx, lz, v)
    }

    /// Copy of the column at world cell `(x, z)`
    pub fn column(&self, detail: u8, x: i32, z: i32) -> Vec<DataPoint> {
        let (lx, lz) = self.local(detail, x, z);
        self.levels.read().unwrap().container(detail).column(lx, lz).to_vec()
    }

    pub fn exists(&self, detail: u8, x: i32, z: i32) -> bool {
        let (lx, lz) = self.local(detail, x, z);
        self.levels.read().unwrap().container(detail).exists(lx, lz)
    }

    /// True if the cell exists and was generated at least as completely as
    /// `required`
    pub fn does_data_exist(&self, detail: u8, x: i32, z: i32, required: GenerationMode) -> bool {
        let (lx, lz) = self.local(detail, x, z);
        let levels = self.levels.read().unwrap();
        data_exists(levels.container(detail), lx, lz, required)
    }

    /// True if every column of the finest materialized level exists
    pub fn is_fully_generated(&self) -> bool {
        let levels = self.levels.read().unwrap();
        levels.container(levels.min_detail).all_exist()
    }

    /// Bytes held by all materialized containers
    pub fn memory_bytes(&self) -> usize {
        self.levels.read().unwrap().iter().map(LevelContainer::memory_bytes).sum()
    }

    // --- Writes ---

    /// Overwrite one column.
    pub fn write_column(&self, detail: u8, x: i32, z: i32, column: &[DataPoint]) -> bool {
        self.assert_writer();
        let (lx, lz) = self.local(detail, x, z);
        let mut levels = self.levels.write().unwrap();
        if detail < levels.min_detail {
            log::debug!("dropping column below minimum detail {} in {:?}", levels.min_detail, self.pos);
            return false;
        }
        levels.container_mut(detail).write_column(lx, lz, column);
        self.mark_changed();
        true
    }

    /// Merge one column by priority; see [`LevelContainer::merge_column`].
    pub fn merge_column(&self, detail: u8, x: i32, z: i32, column: &[DataPoint], override_equal: bool) -> bool {
        self.assert_writer();
        let (lx, lz) = self.local(detail, x, z);
        let mut levels = self.levels.write().unwrap();
        if detail < levels.min_detail {
            log::debug!("dropping column below minimum detail {} in {:?}", levels.min_detail, self.pos);
            return false;
        }
        let changed = levels.container_mut(detail).merge_column(lx, lz, column, override_equal);
        if changed {
            self.mark_changed();
        }
        changed
    }

    /// Merge a rectangle of columns; see [`LevelContainer::merge_area`].
    pub fn merge_area(
        &self,
        detail: u8,
        x: i32,
        z: i32,
        width_x: usize,
        width_z: usize,
        columns: &[DataPoint],
        override_equal: bool,
    ) -> bool {
        self.assert_writer();
        if width_x == 0 || width_z == 0 {
            return false;
        }
        let (lx, lz) = self.local(detail, x, z);
        // Far corner must be inside the region too
        self.local(detail, x + width_x as i32 - 1, z + width_z as i32 - 1);

        let mut levels = self.levels.write().unwrap();
        if detail < levels.min_detail {
            log::debug!("dropping area below minimum detail {} in {:?}", levels.min_detail, self.pos);
            return false;
        }
        let changed = levels
            .container_mut(detail)
            .merge_area(lx, lz, width_x, width_z, columns, override_equal);
        if changed {
            self.mark_changed();
        }
        changed
    }

    /// Propagate a write at `(detail, x, z)` to the other levels.
    ///
    /// The written cell is merged with finer data when a finer level exists,
    /// keeping whichever has priority. Every ancestor up to the region level
    /// is then replaced by the synthesis of the level below it, so no coarser
    /// cell keeps a generation mode above what its children hold.
    pub fn update_area(&self, detail: u8, x: i32, z: i32) {
        self.assert_writer();
        let (lx, lz) = self.local(detail, x, z);
        let mut levels = self.levels.write().unwrap();
        if detail < levels.min_detail {
            return;
        }

        let mut changed = false;
        if detail > levels.min_detail {
            changed |= levels.rebuild(detail, lx, lz, true);
        }
        for level in (detail + 1)..=REGION_DETAIL_LEVEL {
            let shift = level - detail;
            changed |= levels.rebuild(level, lx >> shift, lz >> shift, false);
        }

        if changed {
            self.mark_changed();
        }
    }

    // --- Structure ---

    /// Discard every level finer than `target`.
    ///
    /// No-op when `target` is not above the current minimum.
    pub fn cut(&self, target: u8) {
        let target = target.min(REGION_DETAIL_LEVEL);
        let mut levels = self.levels.write().unwrap();
        if target <= levels.min_detail {
            return;
        }
        for detail in levels.min_detail..target {
            levels.containers[detail as usize] = None;
        }
        log::debug!("region {:?} cut {} -> {}", self.pos, levels.min_detail, target);
        levels.min_detail = target;
    }

    /// Materialize empty levels down to `target`.
    ///
    /// No-op when `target` is not below the current minimum. New levels
    /// start empty and fill as generation writes arrive.
    pub fn grow(&self, target: u8) {
        let mut levels = self.levels.write().unwrap();
        if target >= levels.min_detail {
            return;
        }
        for detail in target..levels.min_detail {
            let vertical_size = self.vertical_quality.vertical_size(detail);
            levels.containers[detail as usize] = Some(LevelContainer::new(detail, vertical_size));
        }
        log::debug!("region {:?} grown {} -> {}", self.pos, levels.min_detail, target);
        levels.min_detail = target;
        self.need_recheck_gen_point.store(true, Ordering::Release);
    }

    // --- Selection ---

    /// Collect cells of this region that need generating.
    ///
    /// Walks the quadtree from the region cell. A node at or below its
    /// distance-implied detail is requested when its data is missing or
    /// was generated less completely than `required`. Coarser nodes
    /// descend, except that `priority` may request a node with missing
    /// data directly to get a coarse overview first.
    pub fn positions_to_generate(
        &self,
        out: &mut PosToGenerate,
        required: GenerationMode,
        priority: GenerationPriority,
        policy: &DetailPolicy,
    ) {
        let levels = self.levels.read().unwrap();
        let floor = levels.min_detail.max(policy.min_detail);
        let walk = GenerateWalk { region: self, levels: &levels, floor, required, priority, policy };
        walk.visit(out, REGION_DETAIL_LEVEL, self.pos.x, self.pos.z);
    }

    /// Collect cells of this region to draw.
    ///
    /// Regions far enough to hit the fast-mode switch are drawn as their
    /// single region cell. Otherwise the walk descends while finer data is
    /// wanted; where the four children are incomplete it either draws the
    /// coarser cell or, with `require_correct_detail`, leaves the area out.
    pub fn positions_to_render(&self, out: &mut PosToRender, require_correct_detail: bool, policy: &DetailPolicy) {
        let levels = self.levels.read().unwrap();
        let player = out.player();
        let root = (REGION_DETAIL_LEVEL, self.pos.x, self.pos.z);

        let region_distance = CellRect::from_region(self.pos).min_distance(player);
        if policy.is_giant_block(policy.detail_from_distance(region_distance)) {
            if levels.container(REGION_DETAIL_LEVEL).exists(0, 0) {
                out.add(root.0, root.1, root.2);
            }
            return;
        }

        let floor = levels.min_detail.max(out.min_detail());
        let walk = RenderWalk { region: self, levels: &levels, floor, require_correct_detail, policy };
        walk.visit(out, root.0, root.1, root.2);
    }
}

fn data_exists(container: &LevelContainer, x: usize, z: usize, required: GenerationMode) -> bool {
    let first = container.get(x, z, 0);
    first.exists() && first.generation_mode() >= required.complexity()
}

struct GenerateWalk<'a> {
    region: &'a Region,
    levels: &'a Levels,
    floor: u8,
    required: GenerationMode,
    priority: GenerationPriority,
    policy: &'a DetailPolicy,
}

impl GenerateWalk<'_> {
    fn visit(&self, out: &mut PosToGenerate, detail: u8, x: i32, z: i32) {
        let distance = CellRect::from_cell(detail, x, z).min_distance(out.player());
        // Children are never closer than their parent
        if !out.can_accept(distance) {
            return;
        }

        let target = self.policy.detail_from_distance(distance).max(self.floor);
        let (lx, lz) = self.region.local(detail, x, z);
        let has_data = data_exists(self.levels.container(detail), lx, lz, self.required);

        if detail <= target {
            if !has_data {
                out.add_pos(GenPos { detail, x, z, distance });
            }
            return;
        }
        if !has_data && self.priority.coarse_first(detail) {
            out.add_pos(GenPos { detail, x, z, distance });
            return;
        }
        for (dx, dz) in CHILD_OFFSETS {
            self.visit(out, detail - 1, x * 2 + dx, z * 2 + dz);
        }
    }
}

struct RenderWalk<'a> {
    region: &'a Region,
    levels: &'a Levels,
    floor: u8,
    require_correct_detail: bool,
    policy: &'a DetailPolicy,
}

impl RenderWalk<'_> {
    fn visit(&self, out: &mut PosToRender, detail: u8, x: i32, z: i32) {
        if out.contains(detail, x, z) {
            return;
        }
        let distance = CellRect::from_cell(detail, x, z).min_distance(out.player());
        let target = self.policy.detail_from_distance(distance).max(self.floor);
        let (lx, lz) = self.region.local(detail, x, z);
        let exists = self.levels.container(detail).exists(lx, lz);

        if detail <= target {
            if exists {
                out.add(detail, x, z);
            }
            return;
        }

        let children = self.levels.container(detail - 1);
        let complete = CHILD_OFFSETS
            .iter()
            .all(|&(dx, dz)| children.exists(lx * 2 + dx as usize, lz * 2 + dz as usize));
        if complete {
            for (dx, dz) in CHILD_OFFSETS {
                self.visit(out, detail - 1, x * 2 + dx, z * 2 + dz);
            }
        } else if !self.require_correct_detail && exists {
            out.add(detail, x, z);
        }
    }
}
