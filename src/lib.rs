//! lodtree - distance-based level of detail storage for voxel terrain

pub mod core;
pub mod math;
pub mod lod;
pub mod streaming;
