//! Region streaming: detail policy, selection, persistence and maintenance

pub mod disk_io;
pub mod priority;
pub mod budget;
pub mod lod;
pub mod worker;

pub use disk_io::{
    RegionStore, RegionFileStore, MemoryStore,
    compress_container, decompress_container,
};
pub use priority::{GenPos, GenerationPriority, PosToGenerate, PosToRender};
pub use budget::{MemoryBudget, MemorySample, MemorySampler};
pub use lod::{DetailPolicy, HorizontalQuality, VerticalQuality};
pub use worker::MaintenanceWorker;
