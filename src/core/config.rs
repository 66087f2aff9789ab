//! Engine configuration
//!
//! Every tunable the LOD core reads lives here. The core never caches values
//! derived from a config across a change; `Dimension::update_policy` is the
//! refresh point.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::{Result, REGION_DETAIL_LEVEL};
use crate::lod::data_point::GenerationMode;
use crate::streaming::lod::{HorizontalQuality, VerticalQuality};
use crate::streaming::priority::GenerationPriority;

/// Free-memory thresholds below which expansion pauses.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RamThresholds {
    /// Minimum free bytes required before expanding another region
    pub min_free_bytes: usize,
    /// Minimum free fraction of the budget (0.0-1.0)
    pub min_free_fraction: f32,
}

impl Default for RamThresholds {
    fn default() -> Self {
        Self {
            min_free_bytes: 64 * 1024 * 1024,
            min_free_fraction: 0.05,
        }
    }
}

/// Configuration for the LOD engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Shape of the distance -> detail curve
    pub horizontal_quality: HorizontalQuality,
    /// Number of vertical segments kept per column
    pub vertical_quality: VerticalQuality,
    /// Multiplier on the 16-block distance unit
    pub horizontal_scale: u32,
    /// LOD render distance in chunks
    pub render_distance_chunks: u32,
    /// Finest detail level generated and drawn
    pub draw_resolution: u8,
    /// Near/far generation ordering
    pub generation_priority: GenerationPriority,
    /// Generation completeness a cell needs before it counts as generated
    pub generation_mode: GenerationMode,
    /// Target detail at or above which a region is drawn as one block
    pub fast_mode_switch: Option<u8>,
    /// Free-memory thresholds for expansion
    pub ram: RamThresholds,
    /// Memory budget for materialized containers, in megabytes
    pub memory_budget_mb: usize,
    /// World minimum Y; heights are stored relative to this
    pub world_min_y: i32,
    /// Maximum positions handed to the generator per query
    pub max_generation_requests: usize,
    /// Root directory for region files
    pub save_dir: PathBuf,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            horizontal_quality: HorizontalQuality::Medium,
            vertical_quality: VerticalQuality::Medium,
            horizontal_scale: 4,
            render_distance_chunks: 64,
            draw_resolution: 0,
            generation_priority: GenerationPriority::Balanced,
            generation_mode: GenerationMode::Features,
            fast_mode_switch: Some(8),
            ram: RamThresholds::default(),
            memory_budget_mb: 1024,
            world_min_y: -64,
            max_generation_requests: 64,
            save_dir: PathBuf::from("lod_data"),
        }
    }
}

impl LodConfig {
    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.render_distance_chunks == 0 {
            return Err(Error::Config("render_distance_chunks must be positive".into()));
        }
        if self.horizontal_scale == 0 {
            return Err(Error::Config("horizontal_scale must be positive".into()));
        }
        if self.draw_resolution > REGION_DETAIL_LEVEL {
            return Err(Error::Config(format!(
                "draw_resolution {} exceeds region detail {}",
                self.draw_resolution, REGION_DETAIL_LEVEL
            )));
        }
        if let Some(switch) = self.fast_mode_switch {
            if switch > REGION_DETAIL_LEVEL {
                return Err(Error::Config(format!("fast_mode_switch {} out of range", switch)));
            }
        }
        if self.max_generation_requests == 0 {
            return Err(Error::Config("max_generation_requests must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.ram.min_free_fraction) {
            return Err(Error::Config("ram.min_free_fraction must be within 0..=1".into()));
        }
        Ok(())
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(LodConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = LodConfig { render_distance_chunks: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = LodConfig { draw_resolution: 12, ..Default::default() };
        assert!(config.validate().is_err());

        let config = LodConfig { fast_mode_switch: Some(10), ..Default::default() };
        assert!(config.validate().is_err());

        let config = LodConfig { max_generation_requests: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/lod.json");
        let config = LodConfig {
            render_distance_chunks: 32,
            vertical_quality: VerticalQuality::High,
            generation_priority: GenerationPriority::FarFirst,
            ..Default::default()
        };

        config.save_sync(&path).unwrap();
        let loaded = LodConfig::load_sync(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "render_distance_chunks": 12 }"#).unwrap();

        let loaded = LodConfig::load_sync(&path).unwrap();
        assert_eq!(loaded.render_distance_chunks, 12);
        assert_eq!(loaded.horizontal_quality, HorizontalQuality::Medium);
    }
}
