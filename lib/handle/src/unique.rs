//! Exclusive ownership of one resource.

use alloc::{boxed::Box, vec::Vec};
use core::{
    fmt::Debug,
    mem::{self, ManuallyDrop},
    ops::{Deref, DerefMut},
    ptr,
};
use log::error;

use crate::{
    deleter::{ArrayDeleter, BoxDeleter, Deleter},
    error::HandleError,
    resource::{ArrayPtr, HeapPtr, Pointee},
    shared::SharedHandle,
};

/// Sole owner of a resource, released through its deleter when dropped.
///
/// A [UniqueHandle] is either *owning* or *empty*. It cannot be cloned;
/// moving it moves the ownership. Assigning over an owning handle with `=`
/// drops the old value first, which releases its resource through its own
/// deleter; [UniqueHandle::assign] does the same and reports the outcome.
///
/// The deleter stays with the handle across [UniqueHandle::release] and
/// [UniqueHandle::reset], the same way a handle keeps one release policy for
/// every resource it is given.
pub struct UniqueHandle<H, D: Deleter<H>> {
    resource: Option<H>,
    deleter: D,
}

impl<H, D: Deleter<H>> UniqueHandle<H, D> {
    /// Take ownership of `resource`, to be released through `deleter`.
    ///
    /// Nothing else may own `resource`. That is the caller's responsibility
    /// and is not checked.
    pub fn new(resource: H, deleter: D) -> Self {
        UniqueHandle {
            resource: Some(resource),
            deleter,
        }
    }

    /// Create an empty handle that will release future resources through
    /// `deleter`.
    pub fn empty_with(deleter: D) -> Self {
        UniqueHandle {
            resource: None,
            deleter,
        }
    }

    /// Create an empty handle with a default deleter.
    pub fn empty() -> Self
    where
        D: Default,
    {
        Self::empty_with(D::default())
    }

    /// Get the owned resource without giving up ownership.
    pub fn get(&self) -> Option<&H> {
        self.resource.as_ref()
    }

    /// Check whether the handle owns nothing.
    pub fn is_empty(&self) -> bool {
        self.resource.is_none()
    }

    /// Get the deleter.
    pub fn deleter(&self) -> &D {
        &self.deleter
    }

    /// Get the deleter mutably.
    pub fn deleter_mut(&mut self) -> &mut D {
        &mut self.deleter
    }

    /// Give up ownership without releasing; the caller becomes responsible
    /// for the returned resource.
    pub fn release(&mut self) -> Option<H> {
        self.resource.take()
    }

    /// Replace the owned resource with `resource` (or nothing), then release
    /// the old one.
    ///
    /// The handle already holds the new value when the deleter runs, so a
    /// failing deleter leaves it consistent and a later drop can never
    /// release the old resource a second time. The failure is returned and
    /// not retried.
    ///
    /// `resource` must not be the resource the handle already owns.
    pub fn reset(&mut self, resource: Option<H>) -> Result<(), D::Error> {
        match mem::replace(&mut self.resource, resource) {
            Some(old) => self.deleter.release(old),
            None => Ok(()),
        }
    }

    /// Move-assign: take over `source`'s resource and deleter, then release
    /// the previously owned resource through the previous deleter.
    pub fn assign(&mut self, source: UniqueHandle<H, D>) -> Result<(), D::Error> {
        let (resource, deleter) = source.into_parts();
        let old_resource = mem::replace(&mut self.resource, resource);
        let mut old_deleter = mem::replace(&mut self.deleter, deleter);
        match old_resource {
            Some(old) => old_deleter.release(old),
            None => Ok(()),
        }
    }

    /// Exchange the contents of two handles.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Split the handle into its resource and deleter without releasing.
    pub fn into_parts(self) -> (Option<H>, D) {
        let mut this = ManuallyDrop::new(self);
        let resource = this.resource.take();
        // The handle is never dropped, so the deleter is moved out exactly once.
        let deleter = unsafe { ptr::read(&this.deleter) };
        (resource, deleter)
    }

    /// Promote to shared ownership. An empty handle promotes to an empty
    /// [SharedHandle].
    pub fn into_shared(self) -> SharedHandle<H, D> {
        SharedHandle::from(self)
    }
}

impl<H: Pointee, D: Deleter<H>> UniqueHandle<H, D> {
    /// Borrow the pointed-to value, failing if the handle is empty.
    pub fn try_deref(&self) -> Result<&H::Target, HandleError> {
        match &self.resource {
            Some(resource) => Ok(unsafe { &*resource.as_ptr() }),
            None => Err(HandleError::UseAfterEmpty),
        }
    }

    /// Mutably borrow the pointed-to value, failing if the handle is empty.
    pub fn try_deref_mut(&mut self) -> Result<&mut H::Target, HandleError> {
        match &mut self.resource {
            Some(resource) => Ok(unsafe { &mut *resource.as_ptr() }),
            None => Err(HandleError::UseAfterEmpty),
        }
    }
}

impl<T> UniqueHandle<HeapPtr<T>, BoxDeleter> {
    /// Move `value` to the heap and own it.
    pub fn boxed(value: T) -> Self {
        Self::from_box(Box::new(value))
    }
}

impl<T: ?Sized> UniqueHandle<HeapPtr<T>, BoxDeleter> {
    /// Own the contents of `value`.
    pub fn from_box(value: Box<T>) -> Self {
        UniqueHandle::new(HeapPtr::from_box(value), BoxDeleter)
    }
}

impl<T> UniqueHandle<ArrayPtr<T>, ArrayDeleter> {
    /// Own the elements of `values` as one contiguous array.
    pub fn array(values: Vec<T>) -> Self {
        UniqueHandle::new(ArrayPtr::from_vec(values), ArrayDeleter)
    }

    /// Borrow the elements, or [None] if the handle is empty.
    pub fn as_slice(&self) -> Option<&[T]> {
        self.resource.as_ref().map(ArrayPtr::as_slice)
    }

    /// Mutably borrow the elements, or [None] if the handle is empty.
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        self.resource.as_mut().map(ArrayPtr::as_mut_slice)
    }
}

impl<H, D: Deleter<H> + Default> Default for UniqueHandle<H, D> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<H: Pointee, D: Deleter<H>> Deref for UniqueHandle<H, D> {
    type Target = H::Target;

    fn deref(&self) -> &H::Target {
        match self.try_deref() {
            Ok(target) => target,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<H: Pointee, D: Deleter<H>> DerefMut for UniqueHandle<H, D> {
    fn deref_mut(&mut self) -> &mut H::Target {
        match self.try_deref_mut() {
            Ok(target) => target,
            Err(err) => panic!("{}", err),
        }
    }
}

impl<H: Debug, D: Deleter<H>> Debug for UniqueHandle<H, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UniqueHandle")
            .field("resource", &self.resource)
            .finish()
    }
}

impl<H, D: Deleter<H>> Drop for UniqueHandle<H, D> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            if let Err(err) = self.deleter.release(resource) {
                error!("failed to release exclusively owned resource: {:?}", err);
            }
        }
    }
}
