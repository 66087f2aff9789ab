//! Bit-packed column entry
//!
//! A [`DataPoint`] describes one vertical segment of an LOD column in a
//! single 64-bit word. It is a plain value: copying, hashing and equality are
//! integer operations, and "empty" / "void" / "normal" are distinguished by
//! the two flag bits rather than by type.
//!
//! Layout (bit 0 = least significant):
//!
//! | bits  | field           |
//! |-------|-----------------|
//! | 0     | exists          |
//! | 1     | void            |
//! | 2-4   | generation mode |
//! | 5-16  | depth           |
//! | 17-28 | height          |
//! | 29-32 | sky light       |
//! | 33-36 | block light     |
//! | 37-44 | blue            |
//! | 45-52 | green           |
//! | 53-60 | red             |
//! | 61-63 | alpha (>> 5)    |
//!
//! Height and depth are relative to the world minimum Y. A segment covers
//! `[depth, height)`.

use std::cmp::Ordering;
use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EXISTS_SHIFT: u32 = 0;
pub const VOID_SHIFT: u32 = 1;
pub const GEN_MODE_SHIFT: u32 = 2;
pub const DEPTH_SHIFT: u32 = 5;
pub const HEIGHT_SHIFT: u32 = 17;
pub const SKY_LIGHT_SHIFT: u32 = 29;
pub const BLOCK_LIGHT_SHIFT: u32 = 33;
pub const BLUE_SHIFT: u32 = 37;
pub const GREEN_SHIFT: u32 = 45;
pub const RED_SHIFT: u32 = 53;
pub const ALPHA_SHIFT: u32 = 61;

pub const FLAG_MASK: u64 = 0x1;
pub const GEN_MODE_MASK: u64 = 0x7;
pub const VERTICAL_MASK: u64 = 0xFFF;
pub const LIGHT_MASK: u64 = 0xF;
pub const COLOR_MASK: u64 = 0xFF;
pub const ALPHA_MASK: u64 = 0x7;

/// Alpha keeps only its top three bits.
pub const ALPHA_DOWNSIZE_SHIFT: u32 = 5;

/// Number of representable vertical positions.
pub const WORLD_HEIGHT: u16 = 4096;

/// Largest storable relative height or depth.
pub const MAX_VERTICAL: u16 = WORLD_HEIGHT - 1;

// Version 6 files stored height and depth in each other's slots.
const LEGACY_HEIGHT_SHIFT: u32 = DEPTH_SHIFT;
const LEGACY_DEPTH_SHIFT: u32 = HEIGHT_SHIFT;

/// How a data point was produced. Higher values are more complete and more
/// expensive to generate.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Nothing generated
    #[default]
    None = 0,
    /// Biome colors only, flat height
    BiomeOnly = 1,
    /// Biome colors with a simulated height
    BiomeOnlySimulateHeight = 2,
    /// Real surface blocks
    Surface = 3,
    /// Surface plus features (trees, structures)
    Features = 4,
    /// Full world generation
    Full = 5,
}

impl GenerationMode {
    pub const ALL: [GenerationMode; 6] = [
        GenerationMode::None,
        GenerationMode::BiomeOnly,
        GenerationMode::BiomeOnlySimulateHeight,
        GenerationMode::Surface,
        GenerationMode::Features,
        GenerationMode::Full,
    ];

    /// Stored 3-bit value
    pub fn complexity(self) -> u8 {
        self as u8
    }

    /// Mode for a stored value; unknown values saturate to `Full`.
    pub fn from_complexity(value: u8) -> Self {
        match value {
            0 => GenerationMode::None,
            1 => GenerationMode::BiomeOnly,
            2 => GenerationMode::BiomeOnlySimulateHeight,
            3 => GenerationMode::Surface,
            4 => GenerationMode::Features,
            _ => GenerationMode::Full,
        }
    }
}

/// An input that does not fit its bit field.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{field} value {value} does not fit in {bits} bits")]
pub struct FieldOverflow {
    pub field: &'static str,
    pub value: u32,
    pub bits: u32,
}

/// Pack 8-bit channels into an ARGB word.
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split an ARGB word into `(a, r, g, b)`.
#[inline]
pub fn unpack_argb(color: u32) -> (u8, u8, u8, u8) {
    ((color >> 24) as u8, (color >> 16) as u8, (color >> 8) as u8, color as u8)
}

/// Expand a stored 3-bit alpha back to 8 bits by bit replication.
#[inline]
fn expand_alpha(stored: u8) -> u8 {
    (stored << 5) | (stored << 2) | (stored >> 1)
}

/// One packed column segment.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct DataPoint(u64);

impl DataPoint {
    /// No information at all
    pub const EMPTY: DataPoint = DataPoint(0);

    /// Encode a normal (non-void) segment.
    ///
    /// Out-of-range inputs are masked to their field width. Debug builds log
    /// a warning when that masking drops information; use [`try_new`]
    /// to reject such inputs instead.
    ///
    /// [`try_new`]: DataPoint::try_new
    pub fn new(
        height: u16,
        depth: u16,
        color: u32,
        light_sky: u8,
        light_block: u8,
        generation_mode: u8,
    ) -> Self {
        #[cfg(debug_assertions)]
        if let Err(overflow) = check_fields(height, depth, light_sky, light_block, generation_mode) {
            log::warn!("data point input masked: {}", overflow);
        }

        let (a, r, g, b) = unpack_argb(color);
        let mut raw = FLAG_MASK << EXISTS_SHIFT;
        raw |= (generation_mode as u64 & GEN_MODE_MASK) << GEN_MODE_SHIFT;
        raw |= (depth as u64 & VERTICAL_MASK) << DEPTH_SHIFT;
        raw |= (height as u64 & VERTICAL_MASK) << HEIGHT_SHIFT;
        raw |= (light_sky as u64 & LIGHT_MASK) << SKY_LIGHT_SHIFT;
        raw |= (light_block as u64 & LIGHT_MASK) << BLOCK_LIGHT_SHIFT;
        raw |= (b as u64 & COLOR_MASK) << BLUE_SHIFT;
        raw |= (g as u64 & COLOR_MASK) << GREEN_SHIFT;
        raw |= (r as u64 & COLOR_MASK) << RED_SHIFT;
        raw |= ((a >> ALPHA_DOWNSIZE_SHIFT) as u64 & ALPHA_MASK) << ALPHA_SHIFT;
        DataPoint(raw)
    }

    /// Encode a segment, rejecting any field that would be masked.
    pub fn try_new(
        height: u16,
        depth: u16,
        color: u32,
        light_sky: u8,
        light_block: u8,
        generation_mode: u8,
    ) -> Result<Self, FieldOverflow> {
        check_fields(height, depth, light_sky, light_block, generation_mode)?;
        Ok(Self::new(height, depth, color, light_sky, light_block, generation_mode))
    }

    /// Known-empty column (air, ocean surface without depth) tagged only
    /// with how it was generated.
    pub fn void(generation_mode: u8) -> Self {
        DataPoint(
            FLAG_MASK << EXISTS_SHIFT
                | FLAG_MASK << VOID_SHIFT
                | (generation_mode as u64 & GEN_MODE_MASK) << GEN_MODE_SHIFT,
        )
    }

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        DataPoint(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn exists(self) -> bool {
        (self.0 >> EXISTS_SHIFT) & FLAG_MASK == 1
    }

    #[inline]
    pub fn is_void(self) -> bool {
        (self.0 >> VOID_SHIFT) & FLAG_MASK == 1
    }

    #[inline]
    pub fn generation_mode(self) -> u8 {
        ((self.0 >> GEN_MODE_SHIFT) & GEN_MODE_MASK) as u8
    }

    #[inline]
    pub fn height(self) -> u16 {
        ((self.0 >> HEIGHT_SHIFT) & VERTICAL_MASK) as u16
    }

    #[inline]
    pub fn depth(self) -> u16 {
        ((self.0 >> DEPTH_SHIFT) & VERTICAL_MASK) as u16
    }

    #[inline]
    pub fn light_sky(self) -> u8 {
        ((self.0 >> SKY_LIGHT_SHIFT) & LIGHT_MASK) as u8
    }

    #[inline]
    pub fn light_block(self) -> u8 {
        ((self.0 >> BLOCK_LIGHT_SHIFT) & LIGHT_MASK) as u8
    }

    #[inline]
    pub fn alpha(self) -> u8 {
        expand_alpha(((self.0 >> ALPHA_SHIFT) & ALPHA_MASK) as u8)
    }

    #[inline]
    pub fn red(self) -> u8 {
        ((self.0 >> RED_SHIFT) & COLOR_MASK) as u8
    }

    #[inline]
    pub fn green(self) -> u8 {
        ((self.0 >> GREEN_SHIFT) & COLOR_MASK) as u8
    }

    #[inline]
    pub fn blue(self) -> u8 {
        ((self.0 >> BLUE_SHIFT) & COLOR_MASK) as u8
    }

    /// ARGB color with the alpha expanded back to 8 bits
    pub fn color(self) -> u32 {
        pack_argb(self.alpha(), self.red(), self.green(), self.blue())
    }

    /// Same data with a different generation mode
    pub fn with_generation_mode(self, generation_mode: u8) -> Self {
        let cleared = self.0 & !(GEN_MODE_MASK << GEN_MODE_SHIFT);
        DataPoint(cleared | (generation_mode as u64 & GEN_MODE_MASK) << GEN_MODE_SHIFT)
    }

    /// Same data with different vertical bounds
    pub fn with_vertical(self, height: u16, depth: u16) -> Self {
        let cleared = self.0 & !(VERTICAL_MASK << HEIGHT_SHIFT | VERTICAL_MASK << DEPTH_SHIFT);
        DataPoint(
            cleared
                | (height as u64 & VERTICAL_MASK) << HEIGHT_SHIFT
                | (depth as u64 & VERTICAL_MASK) << DEPTH_SHIFT,
        )
    }

    /// Existing, non-void segment with geometry
    #[inline]
    pub fn has_geometry(self) -> bool {
        self.exists() && !self.is_void()
    }
}

impl fmt::Debug for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.exists() {
            return f.write_str("DataPoint(EMPTY)");
        }
        if self.is_void() {
            return write!(f, "DataPoint(VOID, gen={})", self.generation_mode());
        }
        f.debug_struct("DataPoint")
            .field("height", &self.height())
            .field("depth", &self.depth())
            .field("color", &format_args!("{:#010x}", self.color()))
            .field("sky", &self.light_sky())
            .field("block", &self.light_block())
            .field("gen", &self.generation_mode())
            .finish()
    }
}

fn check_fields(
    height: u16,
    depth: u16,
    light_sky: u8,
    light_block: u8,
    generation_mode: u8,
) -> Result<(), FieldOverflow> {
    let checks: [(&'static str, u32, u64, u32); 5] = [
        ("height", height as u32, VERTICAL_MASK, 12),
        ("depth", depth as u32, VERTICAL_MASK, 12),
        ("light_sky", light_sky as u32, LIGHT_MASK, 4),
        ("light_block", light_block as u32, LIGHT_MASK, 4),
        ("generation_mode", generation_mode as u32, GEN_MODE_MASK, 3),
    ];
    for (field, value, mask, bits) in checks {
        if value as u64 > mask {
            return Err(FieldOverflow { field, value, bits });
        }
    }
    Ok(())
}

/// Priority order used when deciding whether new data replaces old data.
///
/// Higher generation mode wins; on a tie an existing entry beats a
/// non-existing one; anything else is equal.
pub fn compare_priority(a: DataPoint, b: DataPoint) -> Ordering {
    a.generation_mode()
        .cmp(&b.generation_mode())
        .then_with(|| a.exists().cmp(&b.exists()))
}

/// Move every segment by `delta` blocks.
///
/// Used when data was stored against a different world minimum Y. Results
/// are clamped to the storable range. Empty and void entries are untouched.
pub fn shift_vertical(entries: &mut [DataPoint], delta: i32) {
    if delta == 0 {
        return;
    }
    let clamp = |v: u16| (v as i32 + delta).clamp(0, MAX_VERTICAL as i32) as u16;
    for entry in entries.iter_mut().filter(|e| e.has_geometry()) {
        *entry = entry.with_vertical(clamp(entry.height()), clamp(entry.depth()));
    }
}

/// Rewrite an entry stored with the version-6 field order.
pub fn patch_legacy_layout(entry: DataPoint) -> DataPoint {
    if !entry.has_geometry() {
        return entry;
    }
    let raw = entry.raw();
    let height = ((raw >> LEGACY_HEIGHT_SHIFT) & VERTICAL_MASK) as u16;
    let depth = ((raw >> LEGACY_DEPTH_SHIFT) & VERTICAL_MASK) as u16;
    entry.with_vertical(height, depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataPoint {
        DataPoint::new(200, 64, pack_argb(255, 10, 120, 250), 15, 3, GenerationMode::Surface.complexity())
    }

    #[test]
    fn test_size() {
        assert_eq!(std::mem::size_of::<DataPoint>(), 8);
    }

    #[test]
    fn test_roundtrip() {
        let heights = [(1u16, 0u16), (200, 64), (4095, 4094), (320, 319)];
        for (height, depth) in heights {
            for alpha in [0u8, 255] {
                for mode in GenerationMode::ALL {
                    let color = pack_argb(alpha, 1, 128, 255);
                    let p = DataPoint::new(height, depth, color, 12, 7, mode.complexity());
                    assert!(p.exists());
                    assert!(!p.is_void());
                    assert_eq!(p.height(), height);
                    assert_eq!(p.depth(), depth);
                    assert_eq!(p.color(), color);
                    assert_eq!(p.light_sky(), 12);
                    assert_eq!(p.light_block(), 7);
                    assert_eq!(p.generation_mode(), mode.complexity());
                }
            }
        }
    }

    #[test]
    fn test_alpha_quantization() {
        // Only the top three bits survive; expansion replicates them
        let p = DataPoint::new(10, 0, pack_argb(0b1010_0000, 0, 0, 0), 0, 0, 1);
        assert_eq!(p.alpha(), 0b1011_0110);
        let p = DataPoint::new(10, 0, pack_argb(0b0001_1111, 0, 0, 0), 0, 0, 1);
        assert_eq!(p.alpha(), 0);
    }

    #[test]
    fn test_empty_and_void() {
        assert!(!DataPoint::EMPTY.exists());
        assert!(!DataPoint::EMPTY.is_void());
        assert_eq!(DataPoint::default(), DataPoint::EMPTY);

        let v = DataPoint::void(GenerationMode::Features.complexity());
        assert!(v.exists());
        assert!(v.is_void());
        assert!(!v.has_geometry());
        assert_eq!(v.generation_mode(), 4);
        assert_eq!(v.height(), 0);
        assert_eq!(v.color(), 0);
    }

    #[test]
    fn test_masking_wraps() {
        let p = DataPoint::new(4096 + 5, 4096, 0, 16, 17, 8);
        assert_eq!(p.height(), 5);
        assert_eq!(p.depth(), 0);
        assert_eq!(p.light_sky(), 0);
        assert_eq!(p.light_block(), 1);
        assert_eq!(p.generation_mode(), 0);
        assert!(p.exists());
    }

    #[test]
    fn test_try_new_flags_overflow() {
        let err = DataPoint::try_new(5000, 0, 0, 0, 0, 0).unwrap_err();
        assert_eq!(err.field, "height");
        assert_eq!(err.bits, 12);
        assert!(DataPoint::try_new(10, 0, 0, 0, 0, 9).is_err());
        assert!(DataPoint::try_new(4095, 0, u32::MAX, 15, 15, 7).is_ok());
    }

    #[test]
    fn test_compare_priority() {
        let low = DataPoint::new(10, 0, 0, 0, 0, 1);
        let high = DataPoint::new(5, 0, 0, 0, 0, 4);
        assert_eq!(compare_priority(high, low), Ordering::Greater);
        assert_eq!(compare_priority(low, high), Ordering::Less);
        assert_eq!(compare_priority(low, low), Ordering::Equal);

        // Same mode: existing beats empty
        let none = DataPoint::new(10, 0, 0, 0, 0, 0);
        assert_eq!(compare_priority(none, DataPoint::EMPTY), Ordering::Greater);
        assert_eq!(compare_priority(DataPoint::EMPTY, DataPoint::EMPTY), Ordering::Equal);

        // Void competes on mode like any other entry
        let void = DataPoint::void(4);
        assert_eq!(compare_priority(void, high), Ordering::Equal);
    }

    #[test]
    fn test_with_helpers() {
        let p = sample();
        let q = p.with_generation_mode(5);
        assert_eq!(q.generation_mode(), 5);
        assert_eq!(q.height(), p.height());
        assert_eq!(q.color(), p.color());

        let r = p.with_vertical(300, 100);
        assert_eq!(r.height(), 300);
        assert_eq!(r.depth(), 100);
        assert_eq!(r.light_sky(), p.light_sky());
    }

    #[test]
    fn test_shift_vertical() {
        let mut entries = [sample(), DataPoint::void(2), DataPoint::EMPTY];
        let before = entries;

        shift_vertical(&mut entries, 0);
        assert_eq!(entries, before);

        shift_vertical(&mut entries, 64);
        assert_eq!(entries[0].height(), 264);
        assert_eq!(entries[0].depth(), 128);
        assert_eq!(entries[1], before[1]);
        assert_eq!(entries[2], before[2]);

        shift_vertical(&mut entries, -1000);
        assert_eq!(entries[0].height(), 0);
        assert_eq!(entries[0].depth(), 0);
    }

    #[test]
    fn test_patch_legacy_layout() {
        let current = sample();
        // Build the legacy word by swapping the two vertical fields
        let legacy = current.with_vertical(current.depth(), current.height());
        assert_eq!(patch_legacy_layout(legacy), current);

        assert_eq!(patch_legacy_layout(DataPoint::EMPTY), DataPoint::EMPTY);
        assert_eq!(patch_legacy_layout(DataPoint::void(3)), DataPoint::void(3));
    }

    #[test]
    fn test_generation_mode_conversion() {
        for mode in GenerationMode::ALL {
            assert_eq!(GenerationMode::from_complexity(mode.complexity()), mode);
        }
        assert_eq!(GenerationMode::from_complexity(7), GenerationMode::Full);
        assert!(GenerationMode::Full > GenerationMode::Surface);
    }
}
