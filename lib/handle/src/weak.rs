//! Non-owning observation of a shared resource.

use core::{fmt::Debug, marker::PhantomData, ptr::NonNull};

use crate::{control::ControlBlock, deleter::Deleter, error::HandleError, shared::SharedHandle};

/// Observer of a resource owned by [SharedHandle]s.
///
/// A [WeakHandle] keeps the control block alive but not the resource. Call
/// [WeakHandle::upgrade] to get a strong handle; it returns [None] once every
/// strong owner has gone. **Consumers must handle the [None] case
/// explicitly.**
pub struct WeakHandle<H, D: Deleter<H>> {
    block: Option<NonNull<ControlBlock<H, D>>>,
    marker: PhantomData<ControlBlock<H, D>>,
}

unsafe impl<H: Send + Sync, D: Deleter<H> + Send> Send for WeakHandle<H, D> {}
unsafe impl<H: Send + Sync, D: Deleter<H> + Send> Sync for WeakHandle<H, D> {}

impl<H, D: Deleter<H>> WeakHandle<H, D> {
    /// Create an observer of nothing; it never upgrades.
    pub const fn new() -> Self {
        WeakHandle {
            block: None,
            marker: PhantomData,
        }
    }

    /// Adopt a weak reference.
    ///
    /// The function is marked as **unsafe** because **the caller must have
    /// already acquired the weak reference this handle will give up.**
    pub(crate) unsafe fn from_block(block: NonNull<ControlBlock<H, D>>) -> Self {
        WeakHandle {
            block: Some(block),
            marker: PhantomData,
        }
    }

    fn control(&self) -> Option<&ControlBlock<H, D>> {
        // Our weak reference keeps the block, not the resource, alive.
        self.block.map(|block| unsafe { &*block.as_ptr() })
    }

    /// Attempt to take a strong reference to the resource.
    ///
    /// Liveness is checked and the strong count raised in one atomic step,
    /// so a resource whose last owner is concurrently going away is never
    /// handed out.
    pub fn upgrade(&self) -> Option<SharedHandle<H, D>> {
        let block = self.block?;
        if unsafe { block.as_ref() }.try_acquire_strong() {
            Some(unsafe { SharedHandle::from_block(block) })
        } else {
            None
        }
    }

    /// Like [WeakHandle::upgrade], reporting a released resource as
    /// [HandleError::Expired].
    pub fn try_upgrade(&self) -> Result<SharedHandle<H, D>, HandleError> {
        self.upgrade().ok_or(HandleError::Expired)
    }

    /// Check whether the resource has been released, or was never observed.
    pub fn expired(&self) -> bool {
        !self.control().is_some_and(ControlBlock::is_alive)
    }

    /// Get the number of strong references to the observed resource.
    pub fn use_count(&self) -> usize {
        self.control().map_or(0, ControlBlock::strong_count)
    }

    /// Get the number of weak references to the observed resource.
    pub fn weak_count(&self) -> usize {
        self.control().map_or(0, ControlBlock::weak_count)
    }

    /// Stop observing.
    pub fn reset(&mut self) {
        if let Some(block) = self.block.take() {
            unsafe { ControlBlock::release_weak(block) };
        }
    }
}

impl<H, D: Deleter<H>> From<&SharedHandle<H, D>> for WeakHandle<H, D> {
    fn from(shared: &SharedHandle<H, D>) -> Self {
        shared.downgrade()
    }
}

impl<H, D: Deleter<H>> Clone for WeakHandle<H, D> {
    fn clone(&self) -> Self {
        if let Some(control) = self.control() {
            control.acquire_weak();
        }
        WeakHandle {
            block: self.block,
            marker: PhantomData,
        }
    }
}

impl<H, D: Deleter<H>> Default for WeakHandle<H, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H, D: Deleter<H>> Debug for WeakHandle<H, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WeakHandle")
            .field("use_count", &self.use_count())
            .field("weak_count", &self.weak_count())
            .finish()
    }
}

impl<H, D: Deleter<H>> Drop for WeakHandle<H, D> {
    fn drop(&mut self) {
        self.reset();
    }
}
