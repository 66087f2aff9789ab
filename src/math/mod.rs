//! Mathematical utilities and data structures

pub mod rect;

pub use rect::CellRect;
