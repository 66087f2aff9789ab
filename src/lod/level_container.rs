//! Per-detail-level storage of one region
//!
//! A [`LevelContainer`] holds a `size × size` grid of columns for a single
//! detail level, each column being `vertical_size` [`DataPoint`]s stored
//! top to bottom. Data is kept flat in one `Vec` indexed as
//! `(x * size + z) * vertical_size + v` so a whole container can be written
//! to disk as one slice.

use crate::core::{Error, Result, REGION_DETAIL_LEVEL};
use crate::lod::data_point::{compare_priority, patch_legacy_layout, shift_vertical, DataPoint};
use crate::lod::vertical_merge::merge_columns;

/// Container format written by [`LevelContainer::serialize`]
pub const CONTAINER_VERSION: u8 = 8;

/// Oldest container format still readable
pub const OLDEST_READABLE_VERSION: u8 = 6;

/// Grid of columns for one detail level of one region.
#[derive(Clone, PartialEq, Eq)]
pub struct LevelContainer {
    detail_level: u8,
    size: usize,
    vertical_size: usize,
    data: Vec<DataPoint>,
}

impl std::fmt::Debug for LevelContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelContainer")
            .field("detail_level", &self.detail_level)
            .field("size", &self.size)
            .field("vertical_size", &self.vertical_size)
            .field("data", &format_args!("<{} entries>", self.data.len()))
            .finish()
    }
}

impl LevelContainer {
    /// Create an empty container.
    ///
    /// # Arguments
    /// * `detail_level` - 0 (one cell per block) to 9 (one cell per region)
    /// * `vertical_size` - segments per column, at least 1
    pub fn new(detail_level: u8, vertical_size: usize) -> Self {
        assert!(detail_level <= REGION_DETAIL_LEVEL, "detail level {} out of range", detail_level);
        assert!(vertical_size > 0, "vertical size must be at least 1");
        let size = 1usize << (REGION_DETAIL_LEVEL - detail_level);
        Self {
            detail_level,
            size,
            vertical_size,
            data: vec![DataPoint::EMPTY; size * size * vertical_size],
        }
    }

    pub fn detail_level(&self) -> u8 {
        self.detail_level
    }

    /// Cells along one side
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn vertical_size(&self) -> usize {
        self.vertical_size
    }

    #[inline]
    fn index(&self, x: usize, z: usize) -> usize {
        debug_assert!(x < self.size && z < self.size, "cell ({}, {}) outside {}x{}", x, z, self.size, self.size);
        (x * self.size + z) * self.vertical_size
    }

    /// Entry `v` of the column at region-local `(x, z)`
    pub fn get(&self, x: usize, z: usize, v: usize) -> DataPoint {
        self.data[self.index(x, z) + v]
    }

    /// Whole column, top to bottom
    pub fn column(&self, x: usize, z: usize) -> &[DataPoint] {
        let start = self.index(x, z);
        &self.data[start..start + self.vertical_size]
    }

    /// True if the column's first entry exists
    pub fn exists(&self, x: usize, z: usize) -> bool {
        self.data[self.index(x, z)].exists()
    }

    /// True if every column of the container exists
    pub fn all_exist(&self) -> bool {
        self.data.iter().step_by(self.vertical_size).all(|p| p.exists())
    }

    pub fn clear(&mut self, x: usize, z: usize) {
        let start = self.index(x, z);
        self.data[start..start + self.vertical_size].fill(DataPoint::EMPTY);
    }

    /// Overwrite a single entry.
    pub fn set(&mut self, x: usize, z: usize, v: usize, point: DataPoint) {
        let index = self.index(x, z) + v;
        self.data[index] = point;
    }

    /// Overwrite a column unconditionally.
    ///
    /// Copies `min(column.len(), vertical_size)` entries and pads the rest
    /// with [`DataPoint::EMPTY`].
    pub fn write_column(&mut self, x: usize, z: usize, column: &[DataPoint]) {
        let start = self.index(x, z);
        let slots = &mut self.data[start..start + self.vertical_size];
        let copied = column.len().min(slots.len());
        slots[..copied].copy_from_slice(&column[..copied]);
        slots[copied..].fill(DataPoint::EMPTY);
    }

    /// Write a column if it has at least the priority of the stored one.
    ///
    /// The candidate replaces the stored column when its first entry has
    /// strictly higher priority, or equal priority with `override_equal`.
    /// Returns whether a write happened.
    pub fn merge_column(&mut self, x: usize, z: usize, column: &[DataPoint], override_equal: bool) -> bool {
        let candidate = column.first().copied().unwrap_or(DataPoint::EMPTY);
        let stored = self.data[self.index(x, z)];
        let ordering = compare_priority(candidate, stored);
        if ordering.is_gt() || (override_equal && ordering.is_eq()) {
            self.write_column(x, z, column);
            true
        } else {
            false
        }
    }

    /// [`merge_column`](Self::merge_column) over a rectangle of cells.
    ///
    /// `columns` holds `width_x * width_z` columns laid out as
    /// `(dx * width_z + dz) * stride`, where the stride is
    /// `columns.len() / (width_x * width_z)`. Returns whether any cell
    /// changed.
    pub fn merge_area(
        &mut self,
        x: usize,
        z: usize,
        width_x: usize,
        width_z: usize,
        columns: &[DataPoint],
        override_equal: bool,
    ) -> bool {
        let cells = width_x * width_z;
        if cells == 0 {
            return false;
        }
        assert!(
            columns.len() % cells == 0 && !columns.is_empty(),
            "{} entries do not divide into {} columns",
            columns.len(),
            cells
        );
        let stride = columns.len() / cells;

        let mut changed = false;
        for dx in 0..width_x {
            for dz in 0..width_z {
                let start = (dx * width_z + dz) * stride;
                changed |= self.merge_column(x + dx, z + dz, &columns[start..start + stride], override_equal);
            }
        }
        changed
    }

    /// The 2×2 block of `child` columns below cell `(x, z)`
    fn child_columns<'a>(&self, child: &'a LevelContainer, x: usize, z: usize) -> [&'a [DataPoint]; 4] {
        assert_eq!(
            child.detail_level + 1,
            self.detail_level,
            "synthesizing detail {} from detail {}",
            self.detail_level,
            child.detail_level
        );
        let (cx, cz) = (x * 2, z * 2);
        [
            child.column(cx, cz),
            child.column(cx, cz + 1),
            child.column(cx + 1, cz),
            child.column(cx + 1, cz + 1),
        ]
    }

    /// Rebuild the column at `(x, z)` from the 2×2 block of `child` below it.
    ///
    /// Returns whether the resulting column exists.
    pub fn synthesize_from(&mut self, child: &LevelContainer, x: usize, z: usize) -> bool {
        let merged = merge_columns(self.child_columns(child, x, z), self.vertical_size);
        let exists = merged[0].exists();
        self.write_column(x, z, &merged);
        exists
    }

    /// Rebuild from `child` without discarding better data.
    ///
    /// Skipped when none of the four children exist. Otherwise the
    /// synthesized column is stored through
    /// [`merge_column`](Self::merge_column) with `override_equal`, so a stored
    /// column of strictly higher priority survives. Returns whether the cell
    /// changed.
    pub fn merge_from_children(&mut self, child: &LevelContainer, x: usize, z: usize) -> bool {
        let children = self.child_columns(child, x, z);
        if !children.iter().any(|column| column[0].exists()) {
            return false;
        }
        let merged = merge_columns(children, self.vertical_size);
        if self.column(x, z) == merged.as_slice() {
            return false;
        }
        self.merge_column(x, z, &merged, true)
    }

    /// Replace the column at `(x, z)` with the synthesis of its children.
    ///
    /// Unlike [`merge_from_children`](Self::merge_from_children) the stored
    /// column is overwritten regardless of priority, so the result never
    /// claims more completeness than the children hold. Returns whether the
    /// cell changed.
    pub fn replace_from_children(&mut self, child: &LevelContainer, x: usize, z: usize) -> bool {
        let merged = merge_columns(self.child_columns(child, x, z), self.vertical_size);
        if self.column(x, z) == merged.as_slice() {
            return false;
        }
        self.write_column(x, z, &merged);
        true
    }

    /// Heap bytes held by the entries
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<DataPoint>()
    }

    /// Encode in the current format.
    ///
    /// `vertical_offset` is the world minimum Y the heights are relative to.
    pub fn serialize(&self, vertical_offset: i16) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(4 + self.memory_bytes());
        bytes.push(self.detail_level);
        bytes.push(self.vertical_size as u8);
        bytes.extend_from_slice(&vertical_offset.to_le_bytes());

        #[cfg(target_endian = "little")]
        bytes.extend_from_slice(bytemuck::cast_slice(&self.data));
        #[cfg(not(target_endian = "little"))]
        for point in &self.data {
            bytes.extend_from_slice(&point.raw().to_le_bytes());
        }

        bytes
    }

    /// Decode a container written with `version`.
    ///
    /// The stored vertical size must equal `expected_vertical`. Heights are
    /// shifted from the stored world minimum Y to `live_min_y`. Also returns
    /// whether every column of the decoded container exists.
    pub fn deserialize(
        bytes: &[u8],
        expected_detail: u8,
        expected_vertical: usize,
        version: u8,
        live_min_y: i32,
    ) -> Result<(Self, bool)> {
        if bytes.len() < 2 {
            return Err(Error::Truncated { needed: 2, found: bytes.len() });
        }

        let detail_level = bytes[0];
        if detail_level != expected_detail {
            return Err(Error::DetailMismatch { expected: expected_detail, found: detail_level });
        }
        if detail_level > REGION_DETAIL_LEVEL {
            return Err(Error::Corrupt(format!("detail level {}", detail_level)));
        }
        let vertical_size = bytes[1] as usize;
        if vertical_size != expected_vertical {
            return Err(Error::Corrupt(format!(
                "vertical size {} where {} was expected",
                vertical_size, expected_vertical
            )));
        }

        let (stored_offset, header_len) = match version {
            6 => (0i32, 2usize),
            7 => {
                let raw = read_array::<4>(bytes, 2)?;
                (i32::from_le_bytes(raw), 6)
            }
            8 => {
                let raw = read_array::<2>(bytes, 2)?;
                (i16::from_le_bytes(raw) as i32, 4)
            }
            other => return Err(Error::UnsupportedVersion(other)),
        };

        let size = 1usize << (REGION_DETAIL_LEVEL - detail_level);
        let needed = header_len + size * size * vertical_size * 8;
        if bytes.len() < needed {
            return Err(Error::Truncated { needed, found: bytes.len() });
        }
        let mut container = LevelContainer::new(detail_level, vertical_size);

        for (slot, chunk) in container.data.iter_mut().zip(bytes[header_len..needed].chunks_exact(8)) {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            *slot = DataPoint::from_raw(u64::from_le_bytes(word));
        }

        if version == 6 {
            for entry in container.data.iter_mut() {
                *entry = patch_legacy_layout(*entry);
            }
        }
        shift_vertical(&mut container.data, stored_offset - live_min_y);

        let complete = container.all_exist();
        Ok((container, complete))
    }
}

fn read_array<const N: usize>(bytes: &[u8], at: usize) -> Result<[u8; N]> {
    let slice = bytes
        .get(at..at + N)
        .ok_or(Error::Truncated { needed: at + N, found: bytes.len() })?;
    let mut out = [0u8; N];
    out.copy_from_slice(slice);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::data_point::pack_argb;

    fn seg(depth: u16, height: u16, mode: u8) -> DataPoint {
        DataPoint::new(height, depth, pack_argb(255, 90, 140, 60), 15, 0, mode)
    }

    /// Build a legacy container byte stream by hand
    fn encode_with_header(container: &LevelContainer, header: &[u8], legacy_swap: bool) -> Vec<u8> {
        let mut bytes = vec![container.detail_level(), container.vertical_size() as u8];
        bytes.extend_from_slice(header);
        for point in &container.data {
            let raw = if legacy_swap && point.has_geometry() {
                // Height in the depth slot and vice versa
                point.with_vertical(point.depth(), point.height()).raw()
            } else {
                point.raw()
            };
            bytes.extend_from_slice(&raw.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_new_dimensions() {
        let c = LevelContainer::new(9, 1);
        assert_eq!(c.size(), 1);
        let c = LevelContainer::new(6, 2);
        assert_eq!(c.size(), 8);
        assert_eq!(c.memory_bytes(), 8 * 8 * 2 * 8);
        assert!(!c.exists(3, 3));
        assert!(!c.all_exist());
    }

    #[test]
    fn test_write_column_pads_and_truncates() {
        let mut c = LevelContainer::new(8, 3);
        c.write_column(1, 0, &[seg(0, 10, 3)]);
        assert_eq!(c.column(1, 0), &[seg(0, 10, 3), DataPoint::EMPTY, DataPoint::EMPTY]);

        c.write_column(1, 0, &[seg(40, 50, 3), seg(20, 30, 3), seg(0, 10, 3), seg(0, 1, 3)]);
        assert_eq!(c.column(1, 0).len(), 3);
        assert_eq!(c.get(1, 0, 2), seg(0, 10, 3));
        assert!(!c.exists(0, 1));

        c.clear(1, 0);
        assert!(!c.exists(1, 0));
    }

    #[test]
    fn test_merge_column_priority() {
        let mut c = LevelContainer::new(9, 1);
        assert!(c.merge_column(0, 0, &[seg(0, 10, 3)], false));
        // Equal priority needs override
        assert!(!c.merge_column(0, 0, &[seg(0, 20, 3)], false));
        assert_eq!(c.get(0, 0, 0).height(), 10);
        assert!(c.merge_column(0, 0, &[seg(0, 20, 3)], true));
        assert_eq!(c.get(0, 0, 0).height(), 20);
        // Lower mode never wins
        assert!(!c.merge_column(0, 0, &[seg(0, 30, 2)], true));
        // Higher mode always wins
        assert!(c.merge_column(0, 0, &[seg(0, 40, 4)], false));
        assert_eq!(c.get(0, 0, 0).height(), 40);
        // Empty never replaces existing data
        assert!(!c.merge_column(0, 0, &[], true));
    }

    #[test]
    fn test_merge_column_idempotent() {
        let mut c = LevelContainer::new(7, 2);
        let column = [seg(60, 80, 4), seg(0, 30, 4)];
        c.merge_column(2, 3, &column, true);
        let once = c.clone();
        c.merge_column(2, 3, &column, true);
        assert_eq!(c, once);
        c.merge_column(2, 3, &column, false);
        assert_eq!(c, once);
    }

    #[test]
    fn test_merge_column_order_independent() {
        let surface = [seg(0, 10, 3)];
        let full = [seg(0, 50, 5)];

        let mut a = LevelContainer::new(8, 1);
        a.merge_column(1, 0, &surface, false);
        a.merge_column(1, 0, &full, false);
        let mut b = LevelContainer::new(8, 1);
        b.merge_column(1, 0, &full, false);
        b.merge_column(1, 0, &surface, false);
        assert_eq!(a, b);
        assert_eq!(a.get(1, 0, 0).height(), 50);

        // Equal modes keep whichever arrived first
        let other_surface = [seg(0, 20, 3)];
        let mut c = LevelContainer::new(8, 1);
        c.merge_column(1, 1, &surface, false);
        c.merge_column(1, 1, &other_surface, false);
        assert_eq!(c.get(1, 1, 0).height(), 10);
        let mut d = LevelContainer::new(8, 1);
        d.merge_column(1, 1, &other_surface, false);
        d.merge_column(1, 1, &surface, false);
        assert_eq!(d.get(1, 1, 0).height(), 20);
    }

    #[test]
    fn test_merge_area_matches_per_cell_merge() {
        let mut area = LevelContainer::new(6, 2);
        area.write_column(2, 2, &[seg(0, 5, 5)]);
        let mut single = area.clone();

        let (width_x, width_z) = (3usize, 2usize);
        let mut columns = Vec::new();
        for dx in 0..width_x {
            for dz in 0..width_z {
                let h = (10 * dx + dz) as u16 + 1;
                columns.push(seg(0, h, 3));
                columns.push(DataPoint::EMPTY);
            }
        }

        let changed = area.merge_area(1, 2, width_x, width_z, &columns, false);
        let mut single_changed = false;
        for dx in 0..width_x {
            for dz in 0..width_z {
                let start = (dx * width_z + dz) * 2;
                single_changed |= single.merge_column(1 + dx, 2 + dz, &columns[start..start + 2], false);
            }
        }

        assert!(changed);
        assert_eq!(changed, single_changed);
        assert_eq!(area, single);
        // The higher-mode cell at (2, 2) survived
        assert_eq!(area.get(2, 2, 0), seg(0, 5, 5));
        assert_eq!(area.get(3, 3, 0).height(), 22);
    }

    #[test]
    fn test_synthesize_from_children() {
        let mut child = LevelContainer::new(5, 2);
        let mut parent = LevelContainer::new(6, 2);

        assert!(!parent.synthesize_from(&child, 1, 1));
        assert!(!parent.exists(1, 1));

        child.write_column(2, 2, &[seg(100, 120, 4), seg(0, 40, 4)]);
        child.write_column(2, 3, &[seg(0, 60, 4)]);
        child.write_column(3, 2, &[DataPoint::void(4)]);
        child.write_column(3, 3, &[seg(110, 130, 4)]);

        assert!(parent.synthesize_from(&child, 1, 1));
        let top = parent.get(1, 1, 0);
        let bottom = parent.get(1, 1, 1);
        assert_eq!((top.depth(), top.height()), (100, 130));
        assert_eq!((bottom.depth(), bottom.height()), (0, 60));
        assert_eq!(top.generation_mode(), 4);
    }

    #[test]
    fn test_synthesize_ignores_child_placement() {
        let columns = [
            vec![seg(100, 120, 4), seg(0, 40, 4)],
            vec![seg(0, 60, 3)],
            vec![DataPoint::void(5)],
            vec![seg(110, 130, 4), seg(70, 72, 4)],
        ];
        let placements = [[0, 1, 2, 3], [3, 1, 0, 2], [2, 3, 1, 0], [1, 0, 3, 2]];

        let mut results = Vec::new();
        for placement in placements {
            let mut child = LevelContainer::new(0, 2);
            child.write_column(0, 0, &columns[placement[0]]);
            child.write_column(0, 1, &columns[placement[1]]);
            child.write_column(1, 0, &columns[placement[2]]);
            child.write_column(1, 1, &columns[placement[3]]);
            let mut parent = LevelContainer::new(1, 2);
            parent.synthesize_from(&child, 0, 0);
            results.push(parent.column(0, 0).to_vec());
        }
        assert!(results.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_merge_from_children_keeps_better_data() {
        let mut child = LevelContainer::new(8, 1);
        let mut parent = LevelContainer::new(9, 1);

        // Nothing below: untouched
        parent.write_column(0, 0, &[seg(0, 100, 4)]);
        assert!(!parent.merge_from_children(&child, 0, 0));
        assert_eq!(parent.get(0, 0, 0), seg(0, 100, 4));

        // One child present: synthesized mode is None, stored data wins
        child.write_column(0, 0, &[seg(0, 50, 4)]);
        assert!(!parent.merge_from_children(&child, 0, 0));
        assert_eq!(parent.get(0, 0, 0), seg(0, 100, 4));

        // All children at the same mode replace it
        for (x, z) in [(0, 1), (1, 0), (1, 1)] {
            child.write_column(x, z, &[seg(0, 50, 4)]);
        }
        assert!(parent.merge_from_children(&child, 0, 0));
        assert_eq!(parent.get(0, 0, 0).height(), 50);
        // Unchanged input reports no change
        assert!(!parent.merge_from_children(&child, 0, 0));
    }

    #[test]
    #[should_panic]
    fn test_synthesize_wrong_level_panics() {
        let child = LevelContainer::new(3, 1);
        let mut parent = LevelContainer::new(5, 1);
        parent.synthesize_from(&child, 0, 0);
    }

    #[test]
    fn test_serialize_current_roundtrip() {
        let mut c = LevelContainer::new(8, 2);
        c.write_column(0, 1, &[seg(70, 90, 4), seg(10, 20, 4)]);
        c.write_column(1, 1, &[DataPoint::void(2)]);

        let bytes = c.serialize(-64);
        assert_eq!(bytes[0], 8);
        assert_eq!(bytes[1], 2);
        assert_eq!(&bytes[2..4], &(-64i16).to_le_bytes());
        assert_eq!(bytes.len(), 4 + 2 * 2 * 2 * 8);

        let (decoded, complete) = LevelContainer::deserialize(&bytes, 8, 2, CONTAINER_VERSION, -64).unwrap();
        assert_eq!(decoded, c);
        assert!(!complete);
    }

    #[test]
    fn test_deserialize_reports_complete() {
        let mut c = LevelContainer::new(8, 1);
        for x in 0..2 {
            for z in 0..2 {
                c.write_column(x, z, &[seg(0, 8, 3)]);
            }
        }
        let (_, complete) = LevelContainer::deserialize(&c.serialize(0), 8, 1, CONTAINER_VERSION, 0).unwrap();
        assert!(complete);
    }

    #[test]
    fn test_deserialize_shifts_to_live_min_y() {
        let mut c = LevelContainer::new(9, 1);
        c.write_column(0, 0, &[seg(64, 128, 4)]);
        // Stored against y = 0, loaded into a world starting at y = -64
        let (decoded, _) = LevelContainer::deserialize(&c.serialize(0), 9, 1, CONTAINER_VERSION, -64).unwrap();
        assert_eq!(decoded.get(0, 0, 0).depth(), 128);
        assert_eq!(decoded.get(0, 0, 0).height(), 192);
    }

    #[test]
    fn test_deserialize_version_7() {
        let mut c = LevelContainer::new(9, 1);
        c.write_column(0, 0, &[seg(10, 20, 4)]);
        let bytes = encode_with_header(&c, &(-64i32).to_le_bytes(), false);
        let (decoded, complete) = LevelContainer::deserialize(&bytes, 9, 1, 7, -64).unwrap();
        assert_eq!(decoded, c);
        assert!(complete);
    }

    #[test]
    fn test_deserialize_version_6_patches_layout() {
        let mut c = LevelContainer::new(9, 2);
        c.write_column(0, 0, &[seg(30, 50, 4), DataPoint::void(1)]);
        let bytes = encode_with_header(&c, &[], true);
        let (decoded, _) = LevelContainer::deserialize(&bytes, 9, 2, 6, 0).unwrap();
        assert_eq!(decoded, c);
    }

    #[test]
    fn test_current_version_is_not_patched() {
        let mut c = LevelContainer::new(9, 1);
        c.write_column(0, 0, &[seg(30, 50, 4)]);
        let (decoded, _) = LevelContainer::deserialize(&c.serialize(0), 9, 1, 8, 0).unwrap();
        assert_eq!(decoded.get(0, 0, 0).height(), 50);
        assert_eq!(decoded.get(0, 0, 0).depth(), 30);
    }

    #[test]
    fn test_deserialize_checks_length_before_allocating() {
        // A detail 0 header claiming 255 segments per column
        let result = LevelContainer::deserialize(&[0, 255, 0, 0], 0, 255, 8, 0);
        match result {
            Err(Error::Truncated { needed, found }) => {
                assert_eq!(needed, 4 + 512 * 512 * 255 * 8);
                assert_eq!(found, 4);
            }
            other => panic!("unexpected {:?}", other.map(|(c, _)| c.size())),
        }
        assert!(matches!(
            LevelContainer::deserialize(&[0, 255, 0, 0], 0, 4, 8, 0),
            Err(Error::Corrupt(_))
        ));
    }

    #[test]
    fn test_deserialize_errors() {
        let c = LevelContainer::new(8, 1);
        let bytes = c.serialize(0);

        assert!(matches!(
            LevelContainer::deserialize(&bytes, 7, 1, 8, 0),
            Err(Error::DetailMismatch { expected: 7, found: 8 })
        ));
        assert!(matches!(
            LevelContainer::deserialize(&bytes, 8, 1, 9, 0),
            Err(Error::UnsupportedVersion(9))
        ));
        assert!(matches!(
            LevelContainer::deserialize(&bytes[..bytes.len() - 1], 8, 1, 8, 0),
            Err(Error::Truncated { .. })
        ));
        assert!(matches!(LevelContainer::deserialize(&bytes[..1], 8, 1, 8, 0), Err(Error::Truncated { .. })));
        assert!(matches!(
            LevelContainer::deserialize(&[8, 0, 0, 0], 8, 1, 8, 0),
            Err(Error::Corrupt(_))
        ));
        assert!(LevelContainer::deserialize(&bytes, 7, 1, 8, 0).unwrap_err().is_decode());
        assert!(matches!(
            LevelContainer::deserialize(&bytes, 8, 2, 8, 0),
            Err(Error::Corrupt(_))
        ));
    }
}
