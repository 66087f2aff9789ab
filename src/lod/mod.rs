//! LOD data model
//!
//! Packed column segments, per-detail containers, regions and the
//! dimension-wide window of regions.

pub mod data_point;
pub mod vertical_merge;
pub mod level_container;
pub mod region;
pub mod dimension;

pub use data_point::{DataPoint, GenerationMode};
pub use level_container::LevelContainer;
pub use region::{Region, WriteLease};
pub use dimension::{Dimension, RegionGrid, spiral_offsets};
