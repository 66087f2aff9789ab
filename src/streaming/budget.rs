//! Memory budget for materialized LOD data
//!
//! Tracks how many bytes of level containers are held in memory against a
//! fixed budget. Expansion samples the free memory before materializing
//! another region and backs off when it falls below [`RamThresholds`].

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::config::RamThresholds;

/// Free and total memory at one point in time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemorySample {
    pub free_bytes: usize,
    pub total_bytes: usize,
}

impl MemorySample {
    /// Fraction of the total that is free (1.0 when the total is unknown)
    pub fn free_fraction(&self) -> f32 {
        if self.total_bytes == 0 {
            return 1.0;
        }
        self.free_bytes as f32 / self.total_bytes as f32
    }

    /// True if memory is below either threshold
    pub fn is_low(&self, thresholds: &RamThresholds) -> bool {
        self.free_bytes < thresholds.min_free_bytes || self.free_fraction() < thresholds.min_free_fraction
    }
}

/// Source of memory samples.
///
/// [`MemoryBudget`] is the default; tests substitute fixed samples.
pub trait MemorySampler: Send + Sync {
    fn sample(&self) -> MemorySample;
}

/// Memory budget manager
///
/// Usage is updated from any thread; values saturate instead of wrapping.
#[derive(Debug)]
pub struct MemoryBudget {
    /// Maximum memory allowed (bytes)
    budget_bytes: usize,
    /// Currently used memory (bytes)
    used_bytes: AtomicUsize,
}

impl MemoryBudget {
    /// Create a new memory budget
    ///
    /// # Arguments
    /// * `budget_mb` - Maximum memory in megabytes
    pub fn new(budget_mb: usize) -> Self {
        Self::from_bytes(budget_mb * 1024 * 1024)
    }

    pub fn from_bytes(budget_bytes: usize) -> Self {
        Self {
            budget_bytes,
            used_bytes: AtomicUsize::new(0),
        }
    }

    // --- Tracking methods ---

    /// Add memory usage
    pub fn add(&self, bytes: usize) {
        let _ = self
            .used_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| Some(used.saturating_add(bytes)));
    }

    /// Remove memory usage
    pub fn remove(&self, bytes: usize) {
        let _ = self
            .used_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| Some(used.saturating_sub(bytes)));
    }

    /// Replace the tracked usage with a freshly computed total
    pub fn set_used(&self, bytes: usize) {
        self.used_bytes.store(bytes, Ordering::Release);
    }

    // --- Query methods ---

    pub fn budget(&self) -> usize {
        self.budget_bytes
    }

    /// Get current memory usage in bytes
    pub fn used(&self) -> usize {
        self.used_bytes.load(Ordering::Acquire)
    }

    /// Get available memory in bytes
    pub fn available(&self) -> usize {
        self.budget_bytes.saturating_sub(self.used())
    }

}

impl MemorySampler for MemoryBudget {
    fn sample(&self) -> MemorySample {
        MemorySample {
            free_bytes: self.available(),
            total_bytes: self.budget_bytes,
        }
    }
}
