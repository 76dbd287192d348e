//! Memory accounting for component storage.
//!
//! [`CountingResource`] is a [`MemoryResource`] that forwards to the global allocator and keeps
//! running totals. Install it on the pools a benchmark cares about:
//!
//! ```rust,ignore
//! let counter = Arc::new(CountingResource::default());
//! runtime.set_memory_resource::<Position>(counter.clone());
//! // ... run the scenario ...
//! println!("{}", counter.stats());
//! ```

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::atomic::{AtomicU64, Ordering},
};

use strata::ecs::storage::{MemoryResource, SystemResource};

/// Memory statistics captured during a benchmark run.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    /// Total bytes allocated during the measurement.
    pub bytes_allocated: u64,
    /// Total number of allocations.
    pub allocation_count: u64,
    /// Peak live bytes.
    pub peak_bytes: u64,
}

impl MemoryStats {
    /// Calculate bytes per entity for a given entity count.
    pub fn bytes_per_entity(&self, entity_count: usize) -> f64 {
        if entity_count == 0 {
            0.0
        } else {
            self.bytes_allocated as f64 / entity_count as f64
        }
    }

    /// Calculate allocations per entity for a given entity count.
    pub fn allocations_per_entity(&self, entity_count: usize) -> f64 {
        if entity_count == 0 {
            0.0
        } else {
            self.allocation_count as f64 / entity_count as f64
        }
    }
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "allocated: {} bytes ({} allocs), peak: {} bytes",
            self.bytes_allocated, self.allocation_count, self.peak_bytes
        )
    }
}

/// Global allocator wrapper that counts what component columns request.
#[derive(Debug, Default)]
pub struct CountingResource {
    bytes_allocated: AtomicU64,
    allocation_count: AtomicU64,
    live_bytes: AtomicU64,
    peak_bytes: AtomicU64,
}

impl CountingResource {
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            bytes_allocated: self.bytes_allocated.load(Ordering::Relaxed),
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            peak_bytes: self.peak_bytes.load(Ordering::Relaxed),
        }
    }

    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(Ordering::Relaxed)
    }
}

impl MemoryResource for CountingResource {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        let size = layout.size() as u64;
        self.bytes_allocated.fetch_add(size, Ordering::Relaxed);
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        let live = self.live_bytes.fetch_add(size, Ordering::Relaxed) + size;
        self.peak_bytes.fetch_max(live, Ordering::Relaxed);
        SystemResource.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live_bytes
            .fetch_sub(layout.size() as u64, Ordering::Relaxed);
        unsafe { SystemResource.deallocate(ptr, layout) }
    }
}

/// Run `f` against a fresh counter and return its result with the counter's totals.
pub fn measure_memory<F, R>(f: F) -> (R, MemoryStats)
where
    F: FnOnce(&std::sync::Arc<CountingResource>) -> R,
{
    let counter = std::sync::Arc::new(CountingResource::default());
    let result = f(&counter);
    (result, counter.stats())
}
