//! Reference-counted ownership of one resource.

use alloc::{boxed::Box, vec::Vec};
use core::{fmt::Debug, marker::PhantomData, mem, ops::Deref, ptr::NonNull};
use log::error;

use crate::{
    control::ControlBlock,
    deleter::{ArrayDeleter, BoxDeleter, Deleter},
    error::HandleError,
    resource::{ArrayPtr, HeapPtr, Pointee},
    unique::UniqueHandle,
    weak::WeakHandle,
};

/// Co-owner of a resource, released when the last co-owner goes away.
///
/// Every [SharedHandle] to one resource points at the same control block.
/// Cloning takes another strong reference; dropping, [SharedHandle::reset]
/// or [SharedHandle::replace] gives one up, and giving up the last one hands
/// the resource to the deleter exactly once.
///
/// A [SharedHandle] can be sent to and shared between threads when the
/// resource is `Send + Sync` and the deleter is `Send`: the last owner may
/// release the resource on any thread. Mutating the pointed-to value is not
/// synchronized by the handle.
pub struct SharedHandle<H, D: Deleter<H>> {
    block: Option<NonNull<ControlBlock<H, D>>>,
    marker: PhantomData<ControlBlock<H, D>>,
}

unsafe impl<H: Send + Sync, D: Deleter<H> + Send> Send for SharedHandle<H, D> {}
unsafe impl<H: Send + Sync, D: Deleter<H> + Send> Sync for SharedHandle<H, D> {}

impl<H, D: Deleter<H>> SharedHandle<H, D> {
    /// Take ownership of `resource`, to be released through `deleter` once
    /// the last clone of the handle goes away.
    pub fn new(resource: H, deleter: D) -> Self {
        SharedHandle {
            block: Some(ControlBlock::new(resource, deleter)),
            marker: PhantomData,
        }
    }

    /// Create a handle that owns nothing.
    pub const fn empty() -> Self {
        SharedHandle {
            block: None,
            marker: PhantomData,
        }
    }

    /// Adopt a strong reference.
    ///
    /// The function is marked as **unsafe** because **the caller must have
    /// already acquired the strong reference this handle will give up.**
    pub(crate) unsafe fn from_block(block: NonNull<ControlBlock<H, D>>) -> Self {
        SharedHandle {
            block: Some(block),
            marker: PhantomData,
        }
    }

    fn control(&self) -> Option<&ControlBlock<H, D>> {
        // Our strong reference keeps the block alive as long as `self`.
        self.block.map(|block| unsafe { &*block.as_ptr() })
    }

    /// Get the owned resource without giving up ownership.
    pub fn get(&self) -> Option<&H> {
        self.control()
            .and_then(|control| unsafe { control.resource() })
    }

    /// Get the deleter the resource will be released with.
    pub fn deleter(&self) -> Option<&D>
    where
        D: Sync,
    {
        self.control()
            .and_then(|control| unsafe { control.deleter() })
    }

    /// Check whether the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.block.is_none()
    }

    /// Get the number of strong references to the resource, or 0 if empty.
    ///
    /// Diagnostic only: other threads may change it right after it is read.
    pub fn use_count(&self) -> usize {
        self.control().map_or(0, ControlBlock::strong_count)
    }

    /// Get the number of weak references to the resource, or 0 if empty.
    pub fn weak_count(&self) -> usize {
        self.control().map_or(0, ControlBlock::weak_count)
    }

    /// Check whether two handles share one control block. Two empty handles
    /// share nothing and compare equal.
    pub fn same_owner(&self, other: &SharedHandle<H, D>) -> bool {
        self.block == other.block
    }

    /// Create a non-owning observer of the resource.
    pub fn downgrade(&self) -> WeakHandle<H, D> {
        match self.block {
            Some(block) => {
                unsafe { block.as_ref() }.acquire_weak();
                unsafe { WeakHandle::from_block(block) }
            }
            None => WeakHandle::new(),
        }
    }

    /// Give up this strong reference and leave the handle empty, releasing
    /// the resource if this was the last one.
    ///
    /// The handle is cleared before the count drops, so a failing deleter
    /// leaves it empty; the failure is returned and not retried.
    pub fn reset(&mut self) -> Result<(), D::Error> {
        match self.block.take() {
            Some(block) => unsafe { ControlBlock::release_strong(block) }.unwrap_or(Ok(())),
            None => Ok(()),
        }
    }

    /// Start owning `resource` under a fresh control block, then give up the
    /// previous strong reference.
    pub fn replace(&mut self, resource: H, deleter: D) -> Result<(), D::Error> {
        let fresh = ControlBlock::new(resource, deleter);
        match mem::replace(&mut self.block, Some(fresh)) {
            Some(block) => unsafe { ControlBlock::release_strong(block) }.unwrap_or(Ok(())),
            None => Ok(()),
        }
    }

    /// Move the strong reference out, leaving this handle empty.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }
}

impl<H: Pointee, D: Deleter<H>> SharedHandle<H, D> {
    /// Borrow the pointed-to value, failing if the handle is empty.
    pub fn try_deref(&self) -> Result<&H::Target, HandleError> {
        match self.get() {
            Some(resource) => Ok(unsafe { &*resource.as_ptr() }),
            None => Err(HandleError::UseAfterEmpty),
        }
    }
}

impl<T> SharedHandle<HeapPtr<T>, BoxDeleter> {
    /// Move `value` to the heap and share it.
    pub fn boxed(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized> SharedHandle<HeapPtr<T>, BoxDeleter> {
    /// Share the contents of `value`.
    pub fn from_box(value: Box<T>) -> Self {
        UniqueHandle::from_box(value).into_shared()
    }
}

impl<T> SharedHandle<ArrayPtr<T>, ArrayDeleter> {
    /// Share the elements of `values` as one contiguous array.
    pub fn array(values: Vec<T>) -> Self {
        SharedHandle::new(ArrayPtr::from_vec(values), ArrayDeleter)
    }

    /// Borrow the elements, or [None] if the handle is empty.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.get().map(ArrayPtr::as_slice)
    }
}

impl<H, D: Deleter<H>> From<UniqueHandle<H, D>> for SharedHandle<H, D> {
    fn from(unique: UniqueHandle<H, D>) -> Self {
        match unique.into_parts() {
            (Some(resource), deleter) => SharedHandle::new(resource, deleter),
            (None, _) => SharedHandle::empty(),
        }
    }
}

impl<H, D: Deleter<H>> Clone for SharedHandle<H, D> {
    fn clone(&self) -> Self {
        if let Some(control) = self.control() {
            control.acquire_strong();
        }
        SharedHandle {
            block: self.block,
            marker: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.same_owner(source) {
            return;
        }
        // The source count is raised before the old block is released.
        *self = source.clone();
    }
}

impl<H, D: Deleter<H>> Default for SharedHandle<H, D> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<H: Pointee, D: Deleter<H>> Deref for SharedHandle<H, D> {
    type Target = H::Target;

    fn deref(&self) -> &H::Target {
        match self.try_deref() {
            Ok(target) => target,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<H: Debug, D: Deleter<H>> Debug for SharedHandle<H, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedHandle")
            .field("resource", &self.get())
            .field("use_count", &self.use_count())
            .finish()
    }
}

impl<H, D: Deleter<H>> Drop for SharedHandle<H, D> {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            if let Some(Err(err)) = unsafe { ControlBlock::release_strong(block) } {
                error!("failed to release shared resource: {:?}", err);
            }
        }
    }
}
