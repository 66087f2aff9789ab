//! Vertical simplification of four child columns into one parent column
//!
//! The parent must represent the union of its children's solid segments
//! with at most `max_vertical` segments:
//!
//! 1. collect every `[depth, height)` interval of every child,
//! 2. union them (touching or overlapping intervals join, gaps never do),
//! 3. while too many remain, close the smallest gap,
//! 4. blend each surviving interval from the topmost overlapping segment of
//!    every child.
//!
//! Colors blend with a quadratic mean, light with a truncating arithmetic
//! mean, and the generation mode is the lowest of the four children. The
//! result depends only on the set of children, not on their order.

use crate::lod::data_point::{pack_argb, DataPoint};

/// Segments of one column, stopping at the first non-existing slot.
fn existing(column: &[DataPoint]) -> impl Iterator<Item = DataPoint> + '_ {
    column.iter().copied().take_while(|p| p.exists())
}

/// Lowest generation mode in a child column; a missing child counts as
/// never generated.
fn floor_mode(column: &[DataPoint]) -> u8 {
    existing(column).map(DataPoint::generation_mode).min().unwrap_or(0)
}

/// Union of intervals: sorted, disjoint, separated by real gaps.
pub fn union_intervals(mut intervals: Vec<(u16, u16)>) -> Vec<(u16, u16)> {
    intervals.sort_unstable();
    let mut merged: Vec<(u16, u16)> = Vec::with_capacity(intervals.len());
    for (depth, height) in intervals {
        if let Some(last) = merged.last_mut() {
            if depth <= last.1 {
                last.1 = last.1.max(height);
                continue;
            }
        }
        merged.push((depth, height));
    }
    merged
}

/// Close the smallest gaps until at most `max_count` intervals remain.
///
/// On equal gaps the lowest pair closes first.
pub fn coalesce_intervals(intervals: &mut Vec<(u16, u16)>, max_count: usize) {
    let max_count = max_count.max(1);
    while intervals.len() > max_count {
        let smallest = intervals
            .windows(2)
            .enumerate()
            .map(|(i, pair)| (pair[1].0 - pair[0].1, i))
            .min();
        let Some((_, i)) = smallest else { break };
        intervals[i].1 = intervals[i + 1].1;
        intervals.remove(i + 1);
    }
}

/// Build the parent column for four children.
///
/// The returned column has exactly `max_vertical` slots, ordered top to
/// bottom and padded with [`DataPoint::EMPTY`].
pub fn merge_columns(children: [&[DataPoint]; 4], max_vertical: usize) -> Vec<DataPoint> {
    let max_vertical = max_vertical.max(1);
    let mut out = vec![DataPoint::EMPTY; max_vertical];

    let mut any_exists = false;
    let mut intervals = Vec::new();
    for child in children {
        for point in existing(child) {
            any_exists = true;
            if !point.is_void() && point.height() > point.depth() {
                intervals.push((point.depth(), point.height()));
            }
        }
    }

    if !any_exists {
        return out;
    }

    let column_mode = children.iter().map(|c| floor_mode(c)).min().unwrap_or(0);
    if intervals.is_empty() {
        out[0] = DataPoint::void(column_mode);
        return out;
    }

    let mut merged = union_intervals(intervals);
    coalesce_intervals(&mut merged, max_vertical);

    for (slot, &(low, high)) in merged.iter().rev().enumerate() {
        out[slot] = blend_interval(&children, low, high);
    }
    out
}

fn blend_interval(children: &[&[DataPoint]; 4], low: u16, high: u16) -> DataPoint {
    let mut count = 0u64;
    let (mut a2, mut r2, mut g2, mut b2) = (0u64, 0u64, 0u64, 0u64);
    let (mut sky, mut block) = (0u64, 0u64);
    let mut mode = u8::MAX;

    for child in children {
        let top = existing(child)
            .filter(|p| p.has_geometry() && p.depth() < high && p.height() > low)
            .max_by_key(|p| p.height());

        match top {
            Some(p) => {
                count += 1;
                a2 += (p.alpha() as u64).pow(2);
                r2 += (p.red() as u64).pow(2);
                g2 += (p.green() as u64).pow(2);
                b2 += (p.blue() as u64).pow(2);
                sky += p.light_sky() as u64;
                block += p.light_block() as u64;
                mode = mode.min(p.generation_mode());
            }
            None => mode = mode.min(floor_mode(child)),
        }
    }

    // Every merged interval contains at least one child segment
    let count = count.max(1);
    let quadratic = |sum: u64| ((sum as f64 / count as f64).sqrt().round() as u64).min(255) as u8;
    let color = pack_argb(quadratic(a2), quadratic(r2), quadratic(g2), quadratic(b2));

    DataPoint::new(
        high,
        low,
        color,
        (sky / count) as u8,
        (block / count) as u8,
        mode.min(7),
    )
}
