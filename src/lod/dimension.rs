//! Movable window of regions around the player
//!
//! A [`Dimension`] keeps the regions near the player in a ring buffer
//! addressed by region coordinate modulo the window width, so re-centering
//! only evicts the regions that fell out of the window. Evicted regions
//! with unsaved changes are flushed to the [`RegionStore`] first.
//!
//! Cut and expansion sweeps run on the maintenance worker. Each is
//! single-flight: a request while the previous sweep still runs is ignored.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use rayon::prelude::*;

use crate::core::config::LodConfig;
use crate::core::types::{DVec2, IVec2, RegionPos, Result, REGION_WIDTH};
use crate::lod::data_point::{DataPoint, GenerationMode};
use crate::lod::region::Region;
use crate::math::CellRect;
use crate::streaming::budget::{MemoryBudget, MemorySampler};
use crate::streaming::disk_io::RegionStore;
use crate::streaming::lod::DetailPolicy;
use crate::streaming::priority::{GenerationPriority, PosToGenerate, PosToRender};
use crate::streaming::worker::MaintenanceWorker;

/// Above this many dirty regions generation is restricted to near cells
pub const NEAR_FIRST_DIRTY_REGIONS: usize = 12;

/// Above this many dirty regions nothing new is handed out
pub const MAX_DIRTY_REGIONS: usize = 16;

/// Region coordinates in a square of `radius` around the origin, center
/// first, then ring by ring.
///
/// Each ring starts at its `(-r, -r)` corner and walks clockwise.
pub fn spiral_offsets(radius: i32) -> Vec<IVec2> {
    let radius = radius.max(0);
    let side = (2 * radius + 1) as usize;
    let mut offsets = Vec::with_capacity(side * side);
    offsets.push(IVec2::ZERO);
    for r in 1..=radius {
        for x in -r..=r {
            offsets.push(IVec2::new(x, -r));
        }
        for z in (-r + 1)..=r {
            offsets.push(IVec2::new(r, z));
        }
        for x in (-r..r).rev() {
            offsets.push(IVec2::new(x, r));
        }
        for z in ((-r + 1)..r).rev() {
            offsets.push(IVec2::new(-r, z));
        }
    }
    offsets
}

/// Window width in regions needed to cover `max_distance` blocks; always
/// odd and at least 3
pub fn grid_width_for(max_distance: f64) -> usize {
    let radius = (max_distance / REGION_WIDTH as f64).ceil().max(1.0) as usize;
    2 * radius + 1
}

/// Ring buffer of region slots centered on one region
#[derive(Debug)]
pub struct RegionGrid {
    width: usize,
    center: RegionPos,
    slots: Vec<Option<Arc<Region>>>,
}

impl RegionGrid {
    /// Create an empty window; `width` is rounded up to an odd number >= 3
    pub fn new(width: usize, center: RegionPos) -> Self {
        let width = (width.max(3)) | 1;
        Self {
            width,
            center,
            slots: vec![None; width * width],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Regions from the center to the window edge
    pub fn radius(&self) -> i32 {
        (self.width / 2) as i32
    }

    pub fn center(&self) -> RegionPos {
        self.center
    }

    pub fn in_window(&self, pos: RegionPos) -> bool {
        let radius = self.radius();
        (pos.x - self.center.x).abs() <= radius && (pos.z - self.center.z).abs() <= radius
    }

    fn index(&self, pos: RegionPos) -> Option<usize> {
        if !self.in_window(pos) {
            return None;
        }
        let w = self.width as i32;
        Some((pos.x.rem_euclid(w) * w + pos.z.rem_euclid(w)) as usize)
    }

    pub fn get(&self, pos: RegionPos) -> Option<Arc<Region>> {
        self.index(pos).and_then(|i| self.slots[i].clone())
    }

    /// Store `region` unless its slot is taken; returns the region now in
    /// the slot, or `None` outside the window.
    pub fn insert_if_absent(&mut self, region: Arc<Region>) -> Option<Arc<Region>> {
        let index = self.index(region.pos())?;
        Some(self.slots[index].get_or_insert(region).clone())
    }

    /// Move the window, returning the regions that left it
    pub fn recenter(&mut self, center: RegionPos) -> Vec<Arc<Region>> {
        self.center = center;
        let radius = self.radius();
        let mut evicted = Vec::new();
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|region| {
                let pos = region.pos();
                (pos.x - center.x).abs() > radius || (pos.z - center.z).abs() > radius
            }) {
                evicted.extend(slot.take());
            }
        }
        evicted
    }

    /// Remove every region
    pub fn drain(&mut self) -> Vec<Arc<Region>> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    /// Window positions in spiral order from the center
    pub fn spiral_positions(&self) -> Vec<RegionPos> {
        spiral_offsets(self.radius())
            .into_iter()
            .map(|o| self.center.offset(o.x, o.y))
            .collect()
    }

    /// Loaded regions in spiral order from the center
    pub fn spiral_regions(&self) -> Vec<Arc<Region>> {
        self.spiral_positions().into_iter().filter_map(|pos| self.get(pos)).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resets a single-flight flag when the sweep ends
struct SweepGuard(Arc<AtomicBool>);

impl SweepGuard {
    fn try_begin(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SweepGuard(flag.clone()))
    }
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State shared with maintenance jobs
struct Shared {
    config: RwLock<LodConfig>,
    policy: RwLock<DetailPolicy>,
    grid: RwLock<RegionGrid>,
    /// Regions that left the window while a write was in flight
    evicted: Mutex<Vec<Arc<Region>>>,
    player: RwLock<DVec2>,
    store: Arc<dyn RegionStore>,
    budget: Arc<MemoryBudget>,
    sampler: Arc<dyn MemorySampler>,
    cutting: Arc<AtomicBool>,
    expanding: Arc<AtomicBool>,
}

impl Shared {
    fn policy(&self) -> DetailPolicy {
        self.policy.read().unwrap().clone()
    }

    fn regions(&self) -> Vec<Arc<Region>> {
        self.grid.read().unwrap().spiral_regions()
    }

    fn loaded_bytes(&self) -> usize {
        self.regions().iter().map(|r| r.memory_bytes()).sum()
    }

    fn save(&self, region: &Region) {
        if let Err(e) = self.store.save_region(region) {
            log::error!("Failed to save region {:?}: {}", region.pos(), e);
            region.mark_need_saving();
        }
    }

    /// Hold on to a region outside the window until its writes finish
    fn defer_eviction(&self, region: Arc<Region>) {
        let mut evicted = self.evicted.lock().unwrap();
        if !evicted.iter().any(|r| Arc::ptr_eq(r, &region)) {
            log::debug!("Deferring flush of region {:?} until its write finishes", region.pos());
            evicted.push(region);
        }
    }

    /// Deferred regions whose writes have finished, removed from the list
    fn settled_evictions(&self) -> Vec<Arc<Region>> {
        let mut evicted = self.evicted.lock().unwrap();
        let (busy, settled): (Vec<_>, Vec<_>) = evicted.drain(..).partition(|r| r.is_being_written());
        *evicted = busy;
        settled
    }

    /// Deferred region at `pos` with the current layout, taken back into use
    fn reclaim_evicted(&self, pos: RegionPos) -> Option<Arc<Region>> {
        let (quality, min_y) = {
            let config = self.config.read().unwrap();
            (config.vertical_quality, config.world_min_y)
        };
        let mut evicted = self.evicted.lock().unwrap();
        let index = evicted
            .iter()
            .position(|r| r.pos() == pos && r.vertical_quality() == quality && r.min_y() == min_y)?;
        Some(evicted.swap_remove(index))
    }

    /// Loaded regions plus settled deferred ones
    fn flushable_regions(&self) -> Vec<Arc<Region>> {
        let mut regions = self.regions();
        regions.extend(self.settled_evictions());
        regions
    }

    fn dirty_count(&self) -> usize {
        let deferred = self.evicted.lock().unwrap().iter().filter(|r| r.needs_saving()).count();
        deferred + self.regions().iter().filter(|r| r.needs_saving()).count()
    }

    /// Save every dirty region on the calling thread
    fn save_dirty_now(&self) -> usize {
        let mut saved = 0;
        for region in self.flushable_regions() {
            if region.take_need_saving() {
                self.save(&region);
                saved += 1;
            }
        }
        saved
    }

    /// Target detail for a region with `player` at the given position
    fn region_detail(&self, pos: RegionPos, player: DVec2, policy: &DetailPolicy) -> u8 {
        policy.detail_from_distance(CellRect::from_region(pos).min_distance(player))
    }

    /// Deferred region at `pos` if there is one, else load or create it
    fn reclaim_or_load(&self, pos: RegionPos, detail: u8) -> Arc<Region> {
        match self.reclaim_evicted(pos) {
            Some(region) => {
                region.grow(detail);
                region
            }
            None => Arc::new(self.load_or_create(pos, detail)),
        }
    }

    fn load_or_create(&self, pos: RegionPos, detail: u8) -> Region {
        let config = self.config.read().unwrap();
        match self
            .store
            .load_region(pos, config.vertical_quality, detail, config.world_min_y)
        {
            Ok(Some(region)) => {
                region.grow(detail);
                region
            }
            Ok(None) => Region::new(pos, detail, config.vertical_quality, config.world_min_y),
            Err(e) => {
                log::warn!("Failed to load region {:?}, starting empty: {}", pos, e);
                Region::new(pos, detail, config.vertical_quality, config.world_min_y)
            }
        }
    }

    fn cut_regions(&self, player: DVec2) -> usize {
        let policy = self.policy();
        let mut cut = 0;
        for region in self.regions() {
            if region.needs_saving() || region.is_being_written() {
                continue;
            }
            let distance = CellRect::from_region(region.pos()).min_distance(player);
            let target = policy.cut_detail(distance);
            if region.min_detail_level() < target {
                let before = region.memory_bytes();
                region.cut(target);
                self.budget.remove(before.saturating_sub(region.memory_bytes()));
                cut += 1;
            }
        }
        if cut > 0 {
            log::debug!("Cut {} regions ({} bytes loaded)", cut, self.budget.used());
        }
        cut
    }

    fn expand_or_load_regions(&self, player: DVec2) -> usize {
        let policy = self.policy();
        let thresholds = self.config.read().unwrap().ram;
        let positions = self.grid.read().unwrap().spiral_positions();
        self.budget.set_used(self.loaded_bytes());

        let mut expanded = 0;
        for pos in positions {
            let target = self.region_detail(pos, player, &policy);
            let existing = self.grid.read().unwrap().get(pos);
            if let Some(region) = &existing {
                if region.is_being_written() || region.min_detail_level() <= target {
                    continue;
                }
            }

            if self.sampler.sample().is_low(&thresholds) {
                let saved = self.save_dirty_now();
                log::info!(
                    "Low memory: pausing region expansion ({} bytes loaded, {} regions flushed)",
                    self.budget.used(),
                    saved
                );
                return expanded;
            }

            match existing {
                Some(region) => {
                    let before = region.memory_bytes();
                    region.grow(target);
                    self.budget.add(region.memory_bytes().saturating_sub(before));
                }
                None => {
                    let region = self.reclaim_or_load(pos, target);
                    let bytes = region.memory_bytes();
                    let inserted = self.grid.write().unwrap().insert_if_absent(region.clone());
                    match inserted {
                        Some(stored) if Arc::ptr_eq(&stored, &region) => self.budget.add(bytes),
                        // Created meanwhile by a writer, or the window moved away
                        _ => continue,
                    }
                }
            }
            expanded += 1;
        }
        if expanded > 0 {
            log::debug!("Expanded {} regions ({} bytes loaded)", expanded, self.budget.used());
        }
        expanded
    }
}

/// Regions around the player plus the machinery to keep them in shape
pub struct Dimension {
    shared: Arc<Shared>,
    worker: Mutex<MaintenanceWorker>,
}

impl std::fmt::Debug for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let grid = self.shared.grid.read().unwrap();
        f.debug_struct("Dimension")
            .field("center", &grid.center())
            .field("width", &grid.width())
            .field("regions", &grid.len())
            .finish()
    }
}

impl Dimension {
    /// Create a dimension with the budget from `config` as memory sampler
    pub fn new(config: LodConfig, store: Arc<dyn RegionStore>) -> Result<Self> {
        let budget = Arc::new(MemoryBudget::new(config.memory_budget_mb));
        Self::with_sampler(config, store, budget.clone(), budget)
    }

    /// Create a dimension with an explicit memory sampler
    pub fn with_sampler(
        config: LodConfig,
        store: Arc<dyn RegionStore>,
        budget: Arc<MemoryBudget>,
        sampler: Arc<dyn MemorySampler>,
    ) -> Result<Self> {
        config.validate()?;
        let policy = DetailPolicy::from_config(&config);
        let grid = RegionGrid::new(grid_width_for(policy.max_distance), RegionPos::default());
        log::info!(
            "Dimension window {}x{} regions, render distance {} blocks",
            grid.width(),
            grid.width(),
            policy.max_distance
        );
        Ok(Self {
            shared: Arc::new(Shared {
                config: RwLock::new(config),
                policy: RwLock::new(policy),
                grid: RwLock::new(grid),
                evicted: Mutex::new(Vec::new()),
                player: RwLock::new(DVec2::ZERO),
                store,
                budget,
                sampler,
                cutting: Arc::new(AtomicBool::new(false)),
                expanding: Arc::new(AtomicBool::new(false)),
            }),
            worker: Mutex::new(MaintenanceWorker::new()?),
        })
    }

    pub fn policy(&self) -> DetailPolicy {
        self.shared.policy()
    }

    pub fn config(&self) -> LodConfig {
        self.shared.config.read().unwrap().clone()
    }

    pub fn budget(&self) -> &MemoryBudget {
        &self.shared.budget
    }

    pub fn center(&self) -> RegionPos {
        self.shared.grid.read().unwrap().center()
    }

    pub fn grid_width(&self) -> usize {
        self.shared.grid.read().unwrap().width()
    }

    /// Last player position passed to [`update_player`](Self::update_player)
    pub fn player(&self) -> DVec2 {
        *self.shared.player.read().unwrap()
    }

    // --- Window ---

    /// Re-center the window on `center`.
    ///
    /// Regions leaving the window are dropped; dirty ones are saved on the
    /// maintenance worker first. Regions with a write in flight are kept
    /// aside and saved by the next [`save_dirty`](Self::save_dirty) or
    /// [`shutdown`](Self::shutdown) after the write ends. Returns the number
    /// of evicted regions.
    pub fn move_to(&self, center: RegionPos) -> usize {
        let evicted = self.shared.grid.write().unwrap().recenter(center);
        let count = evicted.len();
        let mut flushed = 0;
        for region in evicted {
            self.shared.budget.remove(region.memory_bytes());
            if region.is_being_written() {
                self.shared.defer_eviction(region);
            } else if region.take_need_saving() {
                flushed += 1;
                let shared = self.shared.clone();
                let worker = self.worker.lock().unwrap();
                let queued = worker.spawn(move || shared.save(&region));
                if !queued {
                    log::error!("Evicted region could not be queued for saving");
                }
            }
        }
        if count > 0 {
            log::info!("Moved window to {:?}: evicted {} regions, flushing {}", center, count, flushed);
        }
        count
    }

    /// Shift the window by whole regions
    pub fn move_by(&self, dx: i32, dz: i32) -> usize {
        self.move_to(self.center().offset(dx, dz))
    }

    /// Record the player's block position and follow it with the window
    pub fn update_player(&self, player: DVec2) -> usize {
        *self.shared.player.write().unwrap() = player;
        let center = RegionPos::from_block(player.x.floor() as i32, player.y.floor() as i32);
        if center != self.center() {
            self.move_to(center)
        } else {
            0
        }
    }

    // --- Region access ---

    pub fn region(&self, pos: RegionPos) -> Option<Arc<Region>> {
        self.shared.grid.read().unwrap().get(pos)
    }

    pub fn region_at_block(&self, x: i32, z: i32) -> Option<Arc<Region>> {
        self.region(RegionPos::from_block(x, z))
    }

    /// Region at `pos`, loading or creating it if missing.
    ///
    /// New regions start at the detail the last player position needs.
    /// Returns `None` outside the window.
    pub fn get_or_create_region(&self, pos: RegionPos) -> Option<Arc<Region>> {
        {
            let grid = self.shared.grid.read().unwrap();
            if !grid.in_window(pos) {
                return None;
            }
            if let Some(region) = grid.get(pos) {
                return Some(region);
            }
        }
        let policy = self.shared.policy();
        let detail = self.shared.region_detail(pos, self.player(), &policy);
        let region = self.shared.reclaim_or_load(pos, detail);
        let stored = self.shared.grid.write().unwrap().insert_if_absent(region.clone())?;
        if Arc::ptr_eq(&stored, &region) {
            self.shared.budget.add(region.memory_bytes());
        }
        Some(stored)
    }

    /// Number of regions in the window
    pub fn region_count(&self) -> usize {
        self.shared.grid.read().unwrap().len()
    }

    /// Bytes held by all loaded regions
    pub fn loaded_bytes(&self) -> usize {
        self.shared.loaded_bytes()
    }

    /// Regions waiting to be saved, including evicted ones still in use
    pub fn dirty_region_count(&self) -> usize {
        self.shared.dirty_count()
    }

    // --- Writes ---

    /// Merge a generated column and propagate it through the region.
    ///
    /// Returns whether anything changed. Columns outside the window or below
    /// the region's current minimum detail are dropped.
    pub fn write_column(&self, detail: u8, x: i32, z: i32, column: &[DataPoint], override_equal: bool) -> bool {
        let pos = RegionPos::from_cell(detail, x, z);
        let Some(region) = self.get_or_create_region(pos) else {
            log::debug!("Dropping column ({}, {}, {}) outside the window", detail, x, z);
            return false;
        };
        let lease = region.begin_write();
        let changed = region.merge_column(detail, x, z, column, override_equal);
        if changed {
            region.update_area(detail, x, z);
        }
        drop(lease);

        // The window may have moved away while writing
        let in_grid = self.region(pos).is_some_and(|r| Arc::ptr_eq(&r, &region));
        if changed && !in_grid {
            self.shared.defer_eviction(region);
        }
        changed
    }

    // --- Maintenance ---

    /// Discard detail distant regions no longer need, on the calling thread.
    ///
    /// Dirty regions and regions being written are skipped. Returns the
    /// number of regions cut, or `None` if a cut is already running.
    pub fn cut_regions(&self, player: DVec2) -> Option<usize> {
        let _guard = SweepGuard::try_begin(&self.shared.cutting)?;
        Some(self.shared.cut_regions(player))
    }

    /// Queue a cut sweep; returns false if one is already running
    pub fn cut_regions_async(&self, player: DVec2) -> bool {
        let Some(guard) = SweepGuard::try_begin(&self.shared.cutting) else {
            return false;
        };
        let shared = self.shared.clone();
        self.worker.lock().unwrap().spawn(move || {
            let _guard = guard;
            shared.cut_regions(player);
        })
    }

    /// Load missing regions and grow loaded ones, on the calling thread.
    ///
    /// Stops early when memory runs low. Returns the number of regions
    /// loaded or grown, or `None` if an expansion is already running.
    pub fn expand_or_load_regions(&self, player: DVec2) -> Option<usize> {
        let _guard = SweepGuard::try_begin(&self.shared.expanding)?;
        Some(self.shared.expand_or_load_regions(player))
    }

    /// Queue an expansion sweep; returns false if one is already running
    pub fn expand_or_load_regions_async(&self, player: DVec2) -> bool {
        let Some(guard) = SweepGuard::try_begin(&self.shared.expanding) else {
            return false;
        };
        let shared = self.shared.clone();
        self.worker.lock().unwrap().spawn(move || {
            let _guard = guard;
            shared.expand_or_load_regions(player);
        })
    }

    /// Save every dirty region.
    ///
    /// With `blocking` the saves run on the calling thread and are complete
    /// on return; otherwise they are queued on the maintenance worker.
    /// Returns the number of regions saved or queued.
    pub fn save_dirty(&self, blocking: bool) -> usize {
        if blocking {
            return self.shared.save_dirty_now();
        }
        let mut queued = 0;
        let worker = self.worker.lock().unwrap();
        for region in self.shared.flushable_regions() {
            if region.take_need_saving() {
                let shared = self.shared.clone();
                if worker.spawn(move || shared.save(&region)) {
                    queued += 1;
                }
            }
        }
        queued
    }

    /// Block until queued maintenance work is done or `timeout` passes
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        self.worker.lock().unwrap().wait_idle(timeout)
    }

    /// Drain the maintenance worker, then save all dirty regions.
    ///
    /// Returns whether the worker drained within `timeout`; dirty regions
    /// are saved either way.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let drained = self.worker.lock().unwrap().shutdown(timeout);
        let saved = self.shared.save_dirty_now();
        let busy = self.shared.evicted.lock().unwrap().len();
        if busy > 0 {
            log::warn!("{} evicted regions still being written at shutdown", busy);
        }
        log::info!("Dimension shut down, saved {} regions", saved);
        drained
    }

    /// Apply a new configuration.
    ///
    /// A change of vertical quality, world height or window size flushes
    /// and drops every region so they reload with the new layout.
    pub fn update_policy(&self, config: LodConfig) -> Result<()> {
        config.validate()?;
        let policy = DetailPolicy::from_config(&config);
        let width = grid_width_for(policy.max_distance);

        let relayout = {
            let old = self.shared.config.read().unwrap();
            old.vertical_quality != config.vertical_quality
                || old.world_min_y != config.world_min_y
                || self.grid_width() != width
        };
        if relayout {
            let saved = self.shared.save_dirty_now();
            let mut grid = self.shared.grid.write().unwrap();
            let center = grid.center();
            for region in grid.drain() {
                if region.is_being_written() || region.needs_saving() {
                    self.shared.defer_eviction(region);
                }
            }
            *grid = RegionGrid::new(width, center);
            log::info!("Region layout changed: dropped all regions after saving {}", saved);
        }

        *self.shared.policy.write().unwrap() = policy;
        *self.shared.config.write().unwrap() = config;
        self.shared.budget.set_used(self.shared.loaded_bytes());
        Ok(())
    }

    // --- Queries ---

    /// Cells that need generating, nearest first.
    ///
    /// At most `budget` positions are returned. When many regions wait for
    /// saving the request is narrowed to near cells, and past
    /// [`MAX_DIRTY_REGIONS`] nothing is returned.
    pub fn positions_to_generate(
        &self,
        player: DVec2,
        budget: usize,
        required: GenerationMode,
        priority: GenerationPriority,
    ) -> PosToGenerate {
        let dirty = self.dirty_region_count();
        let priority = if dirty > NEAR_FIRST_DIRTY_REGIONS {
            GenerationPriority::NearFirst
        } else {
            priority
        };
        let (near, far) = match priority {
            GenerationPriority::NearFirst => (budget, 0),
            GenerationPriority::FarFirst => (0, budget),
            GenerationPriority::Balanced => (budget - budget / 2, budget / 2),
        };
        let template = PosToGenerate::new(near, far, priority.far_min_detail(), player, true);
        if dirty > MAX_DIRTY_REGIONS {
            log::debug!("{} dirty regions, holding back generation", dirty);
            return template;
        }

        let policy = self.policy();
        self.shared
            .regions()
            .par_iter()
            .fold(
                || template.empty_like(),
                |mut out, region| {
                    region.positions_to_generate(&mut out, required, priority, &policy);
                    out
                },
            )
            .reduce(
                || template.empty_like(),
                |mut a, b| {
                    for pos in b.iter() {
                        a.add_pos(*pos);
                    }
                    a
                },
            )
    }

    /// Cells to draw, one list per loaded region in spiral order
    pub fn positions_to_render(&self, player: DVec2, require_correct_detail: bool) -> Vec<PosToRender> {
        let policy = self.policy();
        self.shared
            .regions()
            .par_iter()
            .map(|region| {
                let mut out = PosToRender::new(usize::MAX, policy.min_detail, region.pos(), player, true);
                region.positions_to_render(&mut out, require_correct_detail, &policy);
                out
            })
            .collect()
    }
}

impl Drop for Dimension {
    fn drop(&mut self) {
        let dirty = self.dirty_region_count();
        if dirty > 0 {
            log::warn!("Dimension dropped with {} unsaved regions", dirty);
        }
    }
}
