//! Shared bookkeeping behind [SharedHandle](crate::SharedHandle) and
//! [WeakHandle](crate::WeakHandle).
//!
//! A control block holds the resource, its deleter, and a single status word
//! packing the strong count (low bits) and the weak count (high bits).
//! Keeping both counts in one word lets "no references of any kind" be seen
//! in one load, and lets an upgrade check liveness and take a strong
//! reference in one compare-and-swap.
//!
//! Counts only change through the CAS loops below, and only the handle types
//! call them. Every loop computes the new count with an overflow or
//! underflow check *before* publishing, so a count is never stored out of
//! range; an out-of-range count is a broken invariant and panics.

use alloc::boxed::Box;
use core::{
    cell::UnsafeCell,
    ptr::NonNull,
    sync::atomic::{
        AtomicUsize, fence,
        Ordering::{AcqRel, Acquire, Relaxed, Release},
    },
};
use log::debug;

use crate::{config, deleter::Deleter, tracking};

/// Strong reference count bit field mask.
#[cfg(target_pointer_width = "64")]
pub(crate) const STRONG_COUNT_MASK: usize = 0x0000_0000_FFFF_FFFF;
#[cfg(target_pointer_width = "32")]
pub(crate) const STRONG_COUNT_MASK: usize = 0x0000_FFFF;

/// Number of trailing bits before the weak reference count bit field.
#[cfg(target_pointer_width = "64")]
pub(crate) const WEAK_COUNT_SHIFT: u32 = 32;
#[cfg(target_pointer_width = "32")]
pub(crate) const WEAK_COUNT_SHIFT: u32 = 16;

/// Weak reference count bit field mask.
pub(crate) const WEAK_COUNT_MASK: usize = !STRONG_COUNT_MASK;

/// Maximum number of strong references to one resource.
///
/// 2^32 - 1 on 64-bit targets, but only 65535 on 32-bit targets. Cloning
/// past the limit panics.
pub const STRONG_COUNT_MAX: usize = STRONG_COUNT_MASK;

/// Maximum number of weak references to one resource. One slot of the bit
/// field is reserved for the releasing strong reference, which turns into a
/// weak reference while the deleter runs.
pub const WEAK_COUNT_MAX: usize = (WEAK_COUNT_MASK >> WEAK_COUNT_SHIFT) - 1;

/// Status of a freshly created block: one strong reference.
const STATUS_INIT: usize = 1;

#[inline]
const fn strong_of(status: usize) -> usize {
    status & STRONG_COUNT_MASK
}

#[inline]
const fn weak_of(status: usize) -> usize {
    (status & WEAK_COUNT_MASK) >> WEAK_COUNT_SHIFT
}

#[inline]
const fn with_strong(status: usize, strong: usize) -> usize {
    (status & !STRONG_COUNT_MASK) | strong
}

#[inline]
const fn with_weak(status: usize, weak: usize) -> usize {
    (status & !WEAK_COUNT_MASK) | weak << WEAK_COUNT_SHIFT
}

struct Payload<H, D> {
    resource: H,
    deleter: D,
}

pub(crate) struct ControlBlock<H, D> {
    /// Packed strong and weak reference counts.
    status: AtomicUsize,
    /// Resource and deleter; taken by the reference that drops the strong
    /// count to zero, and untouched otherwise.
    payload: UnsafeCell<Option<Payload<H, D>>>,
}

impl<H, D> ControlBlock<H, D> {
    /// Allocate a block owning `resource`, with one strong reference held by
    /// the caller.
    pub(crate) fn new(resource: H, deleter: D) -> NonNull<ControlBlock<H, D>> {
        let block = Box::new(ControlBlock {
            status: AtomicUsize::new(STATUS_INIT),
            payload: UnsafeCell::new(Some(Payload { resource, deleter })),
        });
        tracking::record_create();
        NonNull::from(Box::leak(block))
    }

    pub(crate) fn strong_count(&self) -> usize {
        strong_of(self.status.load(Acquire))
    }

    pub(crate) fn weak_count(&self) -> usize {
        weak_of(self.status.load(Acquire))
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.strong_count() != 0
    }

    /// Get the owned resource.
    ///
    /// The function is marked as **unsafe** because **the caller must hold a
    /// strong reference for as long as the returned borrow lives.**
    pub(crate) unsafe fn resource(&self) -> Option<&H> {
        unsafe { (*self.payload.get()).as_ref().map(|payload| &payload.resource) }
    }

    /// Get the deleter.
    ///
    /// The function is marked as **unsafe** because **the caller must hold a
    /// strong reference for as long as the returned borrow lives.**
    pub(crate) unsafe fn deleter(&self) -> Option<&D> {
        unsafe { (*self.payload.get()).as_ref().map(|payload| &payload.deleter) }
    }

    /// Take an additional strong reference. The caller already holds one.
    pub(crate) fn acquire_strong(&self) {
        // Relaxed: the caller's own reference keeps the block alive.
        let mut old_status = self.status.load(Relaxed);
        loop {
            let old_strong = strong_of(old_status);
            debug_assert!(old_strong != 0, "strong reference taken from a dead block");
            let new_strong = old_strong + 1;
            if new_strong > STRONG_COUNT_MAX {
                panic!("strong count overflow");
            }
            let new_status = with_strong(old_status, new_strong);
            match self
                .status
                .compare_exchange_weak(old_status, new_status, Relaxed, Relaxed)
            {
                Ok(_) => return,
                Err(status) => old_status = status,
            }
        }
    }

    /// Take a strong reference if the resource is still alive. The caller
    /// holds a weak reference.
    pub(crate) fn try_acquire_strong(&self) -> bool {
        let mut old_status = self.status.load(Relaxed);
        loop {
            let old_strong = strong_of(old_status);
            if old_strong == 0 {
                return false;
            }
            let new_strong = old_strong + 1;
            if new_strong > STRONG_COUNT_MAX {
                panic!("strong count overflow");
            }
            let new_status = with_strong(old_status, new_strong);
            // Acquire on success: synchronize with the releases of earlier owners.
            match self
                .status
                .compare_exchange_weak(old_status, new_status, Acquire, Relaxed)
            {
                Ok(_) => return true,
                Err(status) => old_status = status,
            }
        }
    }

    /// Take an additional weak reference. The caller holds a strong or weak
    /// reference.
    pub(crate) fn acquire_weak(&self) {
        let mut old_status = self.status.load(Relaxed);
        loop {
            let new_weak = weak_of(old_status) + 1;
            if new_weak > WEAK_COUNT_MAX {
                panic!("weak count overflow");
            }
            let new_status = with_weak(old_status, new_weak);
            match self
                .status
                .compare_exchange_weak(old_status, new_status, Relaxed, Relaxed)
            {
                Ok(_) => return,
                Err(status) => old_status = status,
            }
        }
    }

    /// Drop a weak reference, deallocating the block if it was the last
    /// reference of any kind.
    ///
    /// The function is marked as **unsafe** because **`this` must be a live
    /// block on which the caller holds a weak reference, which it gives up.**
    pub(crate) unsafe fn release_weak(this: NonNull<ControlBlock<H, D>>) {
        let block = unsafe { this.as_ref() };
        let mut old_status = block.status.load(Relaxed);
        loop {
            let new_weak = match weak_of(old_status).checked_sub(1) {
                Some(weak) => weak,
                None => panic!("weak count underflow"),
            };
            let new_status = with_weak(old_status, new_weak);
            match block
                .status
                .compare_exchange_weak(old_status, new_status, Release, Relaxed)
            {
                Ok(_) => {
                    if new_status == 0 {
                        // Synchronize with every earlier release before freeing.
                        fence(Acquire);
                        unsafe { Self::dealloc(this) };
                    }
                    return;
                }
                Err(status) => old_status = status,
            }
        }
    }

    /// Free the block.
    ///
    /// The function is marked as **unsafe** because **no reference of any
    /// kind may remain.**
    unsafe fn dealloc(this: NonNull<ControlBlock<H, D>>) {
        drop(unsafe { Box::from_raw(this.as_ptr()) });
        tracking::record_free();
    }

    /// Remove the payload.
    ///
    /// The function is marked as **unsafe** because **the caller must be the
    /// reference that dropped the strong count to zero.**
    unsafe fn take_payload(&self) -> Option<Payload<H, D>> {
        unsafe { (*self.payload.get()).take() }
    }
}

impl<H, D: Deleter<H>> ControlBlock<H, D> {
    /// Drop a strong reference.
    ///
    /// Returns [None] if other strong references remain. Otherwise the
    /// resource has been handed to the deleter and its outcome is returned.
    ///
    /// The block is freed right away when no weak reference exists. When weak
    /// references exist, the caller's strong reference becomes a temporary
    /// weak one in the same CAS that zeroes the strong count, so the block
    /// outlives the deleter even if every observer drops concurrently.
    ///
    /// The function is marked as **unsafe** because **`this` must be a live
    /// block on which the caller holds a strong reference, which it gives
    /// up.**
    pub(crate) unsafe fn release_strong(
        this: NonNull<ControlBlock<H, D>>,
    ) -> Option<Result<(), D::Error>> {
        let block = unsafe { this.as_ref() };
        let mut old_status = block.status.load(Relaxed);
        loop {
            let new_strong = match strong_of(old_status).checked_sub(1) {
                Some(strong) => strong,
                None => panic!("strong count underflow"),
            };
            if new_strong != 0 {
                let new_status = with_strong(old_status, new_strong);
                match block
                    .status
                    .compare_exchange_weak(old_status, new_status, Release, Relaxed)
                {
                    Ok(_) => return None,
                    Err(status) => old_status = status,
                }
                continue;
            }
            let old_weak = weak_of(old_status);
            if old_weak == 0 {
                match block
                    .status
                    .compare_exchange_weak(old_status, 0, Release, Relaxed)
                {
                    Ok(_) => {
                        // Sole reference of any kind: nobody else can reach the block.
                        fence(Acquire);
                        let payload = unsafe { block.take_payload() };
                        unsafe { Self::dealloc(this) };
                        return Some(Self::run_deleter(this, payload));
                    }
                    Err(status) => old_status = status,
                }
                continue;
            }
            let new_status = with_weak(with_strong(old_status, 0), old_weak + 1);
            match block
                .status
                .compare_exchange_weak(old_status, new_status, AcqRel, Relaxed)
            {
                Ok(_) => {
                    let _temporary = WeakGuard(this);
                    let payload = unsafe { block.take_payload() };
                    return Some(Self::run_deleter(this, payload));
                }
                Err(status) => old_status = status,
            }
        }
    }

    /// Hand the payload to its deleter. `this` is only used for logging and
    /// may already be freed.
    fn run_deleter(
        this: NonNull<ControlBlock<H, D>>,
        payload: Option<Payload<H, D>>,
    ) -> Result<(), D::Error> {
        let Some(Payload {
            resource,
            mut deleter,
        }) = payload
        else {
            return Ok(());
        };
        tracking::record_release();
        if config::releases_logged() {
            debug!("releasing shared resource of control block {:p}", this);
        }
        deleter.release(resource)
    }
}

/// Weak reference dropped on scope exit, including unwinding out of a
/// panicking deleter.
struct WeakGuard<H, D>(NonNull<ControlBlock<H, D>>);

impl<H, D> Drop for WeakGuard<H, D> {
    fn drop(&mut self) {
        unsafe { ControlBlock::release_weak(self.0) };
    }
}
