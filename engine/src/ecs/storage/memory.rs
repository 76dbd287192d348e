//! Pluggable memory resources for component columns.
//!
//! Every [`Column`](super::column::Column) allocates through an `Arc<dyn MemoryResource>`. The
//! default is [`SystemResource`], which forwards to the global allocator. A pool can be switched
//! to another resource at run time (for example an arena, or an instrumented allocator in tests)
//! and its existing values are moved into memory obtained from the new resource.
//!
//! # Contract
//!
//! - `allocate` returns memory fitting `layout`, or calls [`alloc::handle_alloc_error`].
//! - `deallocate` is only called with a pointer and layout previously returned by the same
//!   resource's `allocate`.
//! - Columns never call either for zero-sized layouts.

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
    sync::Arc,
};

/// An allocator that component columns obtain their memory from.
pub trait MemoryResource: Send + Sync {
    /// Allocate a block that fits `layout`.
    fn allocate(&self, layout: Layout) -> NonNull<u8>;

    /// Return a block previously obtained from [`MemoryResource::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this resource with the same `layout`, and
    /// must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator as a memory resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResource;

impl MemoryResource for SystemResource {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        debug_assert!(layout.size() > 0, "zero sized allocation");
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => ptr,
            None => alloc::handle_alloc_error(layout),
        }
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// A shared handle to the default resource.
#[inline]
pub fn system_resource() -> Arc<dyn MemoryResource> {
    Arc::new(SystemResource)
}
