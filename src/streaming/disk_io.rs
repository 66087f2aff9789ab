//! Region serialization and disk I/O
//!
//! Each materialized level of a region is stored as its own file so a
//! region can be loaded down to any detail without reading finer levels.
//! A file is one version byte followed by the LZ4-compressed container.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::error::Error;
use crate::core::types::{RegionPos, Result, REGION_DETAIL_LEVEL};
use crate::lod::level_container::{LevelContainer, CONTAINER_VERSION, OLDEST_READABLE_VERSION};
use crate::lod::region::Region;
use crate::streaming::lod::VerticalQuality;

/// Persistent storage for regions.
///
/// Implementations must be shareable between the caller's thread and the
/// maintenance worker.
pub trait RegionStore: Send + Sync {
    /// Write every materialized level of `region`.
    fn save_region(&self, region: &Region) -> Result<()>;

    /// Read a region with levels from 9 down to at most `min_detail`.
    ///
    /// Loading stops at the first missing or undecodable level. Returns
    /// `None` when not even the region level is stored.
    fn load_region(
        &self,
        pos: RegionPos,
        quality: VerticalQuality,
        min_detail: u8,
        world_min_y: i32,
    ) -> Result<Option<Region>>;
}

/// Compress a container for storage
pub fn compress_container(container: &LevelContainer, world_min_y: i32) -> Vec<u8> {
    let serialized = container.serialize(world_min_y as i16);
    let compressed = lz4_flex::compress_prepend_size(&serialized);
    let mut bytes = Vec::with_capacity(1 + compressed.len());
    bytes.push(CONTAINER_VERSION);
    bytes.extend_from_slice(&compressed);
    bytes
}

/// Decompress and deserialize a stored container
pub fn decompress_container(
    data: &[u8],
    expected_detail: u8,
    quality: VerticalQuality,
    live_min_y: i32,
) -> Result<LevelContainer> {
    let (&version, compressed) = data
        .split_first()
        .ok_or(Error::Truncated { needed: 1, found: 0 })?;
    if !(OLDEST_READABLE_VERSION..=CONTAINER_VERSION).contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }
    let decompressed = lz4_flex::decompress_size_prepended(compressed)
        .map_err(|e| Error::Compression(format!("LZ4 decompression failed: {}", e)))?;
    let expected_vertical = quality.vertical_size(expected_detail);
    let (container, _) =
        LevelContainer::deserialize(&decompressed, expected_detail, expected_vertical, version, live_min_y)?;
    Ok(container)
}

/// Serialize every level of a region, coarsest first
fn encode_region(region: &Region) -> Vec<(u8, Vec<u8>)> {
    region.with_levels_read(|levels| {
        levels
            .iter()
            .rev()
            .map(|container| (container.detail_level(), compress_container(container, region.min_y())))
            .collect()
    })
}

/// Rebuild a region from per-level bytes fetched by `read`.
fn decode_region(
    pos: RegionPos,
    quality: VerticalQuality,
    min_detail: u8,
    world_min_y: i32,
    mut read: impl FnMut(u8) -> Result<Option<Vec<u8>>>,
) -> Result<Option<Region>> {
    let mut containers = Vec::new();
    for detail in (min_detail.min(REGION_DETAIL_LEVEL)..=REGION_DETAIL_LEVEL).rev() {
        let Some(bytes) = read(detail)? else {
            break;
        };
        match decompress_container(&bytes, detail, quality, world_min_y) {
            Ok(container) => containers.push(container),
            Err(e) if e.is_decode() => {
                log::warn!("Discarding level {} of region {:?}: {}", detail, pos, e);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    if containers.is_empty() {
        return Ok(None);
    }
    Ok(Some(Region::from_containers(pos, quality, world_min_y, containers)))
}

/// One file per region level under a base directory
#[derive(Debug, Clone)]
pub struct RegionFileStore {
    base_dir: PathBuf,
}

impl RegionFileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the file path for one level of a region
    pub fn level_path(&self, quality: VerticalQuality, detail: u8, pos: RegionPos) -> PathBuf {
        // Format: base_dir/{quality}/detail-{d}/r.{x}.{z}.lod
        self.base_dir
            .join(quality.name())
            .join(format!("detail-{}", detail))
            .join(format!("r.{}.{}.lod", pos.x, pos.z))
    }

    /// Check if the region level of `pos` is stored
    pub fn region_exists(&self, quality: VerticalQuality, pos: RegionPos) -> bool {
        self.level_path(quality, REGION_DETAIL_LEVEL, pos).exists()
    }

    /// Delete every stored level of a region
    pub fn delete_region(&self, quality: VerticalQuality, pos: RegionPos) -> Result<()> {
        for detail in 0..=REGION_DETAIL_LEVEL {
            let path = self.level_path(quality, detail, pos);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Write through a temporary file so readers never see a partial file
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("lod.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

impl RegionStore for RegionFileStore {
    fn save_region(&self, region: &Region) -> Result<()> {
        let quality = region.vertical_quality();
        let encoded = encode_region(region);
        let total: usize = encoded.iter().map(|(_, bytes)| bytes.len()).sum();
        for (detail, bytes) in encoded {
            write_atomic(&self.level_path(quality, detail, region.pos()), &bytes)?;
        }
        log::trace!("Saved region {:?} ({} bytes)", region.pos(), total);
        Ok(())
    }

    fn load_region(
        &self,
        pos: RegionPos,
        quality: VerticalQuality,
        min_detail: u8,
        world_min_y: i32,
    ) -> Result<Option<Region>> {
        decode_region(pos, quality, min_detail, world_min_y, |detail| {
            match std::fs::read(self.level_path(quality, detail, pos)) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}

type LevelKey = (VerticalQuality, u8, RegionPos);

/// In-memory store using the on-disk encoding
#[derive(Debug, Default)]
pub struct MemoryStore {
    levels: Mutex<HashMap<LevelKey, Vec<u8>>>,
    saves: Mutex<HashMap<RegionPos, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of times `pos` was saved
    pub fn save_count(&self, pos: RegionPos) -> usize {
        self.saves.lock().unwrap().get(&pos).copied().unwrap_or(0)
    }

    /// Total number of saves
    pub fn total_saves(&self) -> usize {
        self.saves.lock().unwrap().values().sum()
    }

    /// Replace the stored bytes of one level
    pub fn put_raw(&self, quality: VerticalQuality, detail: u8, pos: RegionPos, bytes: Vec<u8>) {
        self.levels.lock().unwrap().insert((quality, detail, pos), bytes);
    }

    pub fn contains(&self, quality: VerticalQuality, detail: u8, pos: RegionPos) -> bool {
        self.levels.lock().unwrap().contains_key(&(quality, detail, pos))
    }
}

impl RegionStore for MemoryStore {
    fn save_region(&self, region: &Region) -> Result<()> {
        let quality = region.vertical_quality();
        let encoded = encode_region(region);
        let mut levels = self.levels.lock().unwrap();
        for (detail, bytes) in encoded {
            levels.insert((quality, detail, region.pos()), bytes);
        }
        *self.saves.lock().unwrap().entry(region.pos()).or_insert(0) += 1;
        Ok(())
    }

    fn load_region(
        &self,
        pos: RegionPos,
        quality: VerticalQuality,
        min_detail: u8,
        world_min_y: i32,
    ) -> Result<Option<Region>> {
        let levels = self.levels.lock().unwrap();
        decode_region(pos, quality, min_detail, world_min_y, |detail| {
            Ok(levels.get(&(quality, detail, pos)).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::data_point::{pack_argb, DataPoint, GenerationMode};

    fn sample_region(pos: RegionPos, min_detail: u8) -> Region {
        let region = Region::new(pos, min_detail, VerticalQuality::Medium, -64);
        let point = DataPoint::new(120, 60, pack_argb(255, 10, 200, 30), 15, 2, GenerationMode::Surface.complexity());
        {
            let _lease = region.begin_write();
            let cells = crate::core::types::cells_per_region(min_detail);
            region.write_column(min_detail, pos.x * cells + 1, pos.z * cells, &[point]);
            region.update_area(min_detail, pos.x * cells + 1, pos.z * cells);
        }
        region
    }

    fn assert_same_levels(a: &Region, b: &Region) {
        assert_eq!(a.min_detail_level(), b.min_detail_level());
        let left: Vec<LevelContainer> = a.with_levels_read(|l| l.iter().cloned().collect());
        let right: Vec<LevelContainer> = b.with_levels_read(|l| l.iter().cloned().collect());
        assert_eq!(left, right);
    }

    #[test]
    fn test_level_path() {
        let store = RegionFileStore::new("/tmp/lod");
        let path = store.level_path(VerticalQuality::High, 4, RegionPos::new(5, -3));
        assert_eq!(path, PathBuf::from("/tmp/lod/high/detail-4/r.5.-3.lod"));
    }

    #[test]
    fn test_compress_decompress_container() {
        let mut container = LevelContainer::new(6, 1);
        let point = DataPoint::new(90, 10, pack_argb(255, 1, 2, 3), 15, 0, 3);
        container.write_column(2, 5, &[point]);

        let bytes = compress_container(&container, -64);
        assert_eq!(bytes[0], CONTAINER_VERSION);
        let decoded = decompress_container(&bytes, 6, VerticalQuality::Medium, -64).unwrap();
        assert_eq!(decoded, container);

        // Empty containers should compress well
        assert!(bytes.len() < container.memory_bytes());
    }

    #[test]
    fn test_decompress_errors() {
        let container = LevelContainer::new(9, 1);
        let mut bytes = compress_container(&container, 0);

        let medium = VerticalQuality::Medium;
        assert!(matches!(decompress_container(&[], 9, medium, 0), Err(Error::Truncated { .. })));
        assert!(matches!(decompress_container(&bytes, 8, medium, 0), Err(Error::DetailMismatch { .. })));
        // Stored under a different vertical quality
        let wide = compress_container(&LevelContainer::new(9, 7), 0);
        assert!(matches!(decompress_container(&wide, 9, medium, 0), Err(Error::Corrupt(_))));

        bytes.truncate(4);
        assert!(decompress_container(&bytes, 9, medium, 0).unwrap_err().is_decode());

        let mut future = compress_container(&container, 0);
        future[0] = CONTAINER_VERSION + 1;
        assert!(matches!(decompress_container(&future, 9, medium, 0), Err(Error::UnsupportedVersion(_))));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionFileStore::new(dir.path());
        let pos = RegionPos::new(-2, 7);
        let region = sample_region(pos, 6);

        store.save_region(&region).unwrap();
        assert!(store.region_exists(VerticalQuality::Medium, pos));
        assert!(!store.region_exists(VerticalQuality::Low, pos));

        let loaded = store
            .load_region(pos, VerticalQuality::Medium, 6, -64)
            .unwrap()
            .expect("region not found");
        assert_same_levels(&loaded, &region);
        assert!(!loaded.needs_saving());

        // Temporary files are renamed away
        let leftovers = std::fs::read_dir(store.level_path(VerticalQuality::Medium, 6, pos).parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_load_stops_at_requested_detail() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionFileStore::new(dir.path());
        let pos = RegionPos::new(0, 0);
        store.save_region(&sample_region(pos, 5)).unwrap();

        let loaded = store.load_region(pos, VerticalQuality::Medium, 7, -64).unwrap().unwrap();
        assert_eq!(loaded.min_detail_level(), 7);
    }

    #[test]
    fn test_load_missing_region() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionFileStore::new(dir.path());
        let result = store.load_region(RegionPos::new(9, 9), VerticalQuality::Low, 0, 0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_corrupt_level_stops_descent() {
        let store = MemoryStore::new();
        let pos = RegionPos::new(1, 1);
        store.save_region(&sample_region(pos, 6)).unwrap();
        store.put_raw(VerticalQuality::Medium, 7, pos, vec![CONTAINER_VERSION, 1, 2, 3]);

        let loaded = store.load_region(pos, VerticalQuality::Medium, 6, -64).unwrap().unwrap();
        assert_eq!(loaded.min_detail_level(), 8);

        store.put_raw(VerticalQuality::Medium, 9, pos, Vec::new());
        assert!(store.load_region(pos, VerticalQuality::Medium, 6, -64).unwrap().is_none());
    }

    #[test]
    fn test_delete_region() {
        let dir = tempfile::tempdir().unwrap();
        let store = RegionFileStore::new(dir.path());
        let pos = RegionPos::new(3, 3);
        store.save_region(&sample_region(pos, 8)).unwrap();
        store.delete_region(VerticalQuality::Medium, pos).unwrap();
        assert!(!store.region_exists(VerticalQuality::Medium, pos));
        // Deleting twice is fine
        store.delete_region(VerticalQuality::Medium, pos).unwrap();
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let store = MemoryStore::new();
        let pos = RegionPos::new(0, 1);
        let region = sample_region(pos, 8);
        assert_eq!(store.save_count(pos), 0);
        store.save_region(&region).unwrap();
        store.save_region(&region).unwrap();
        assert_eq!(store.save_count(pos), 2);
        assert_eq!(store.total_saves(), 2);
        assert!(store.contains(VerticalQuality::Medium, 9, pos));

        let loaded = store.load_region(pos, VerticalQuality::Medium, 8, -64).unwrap().unwrap();
        assert_same_levels(&loaded, &region);
    }
}
