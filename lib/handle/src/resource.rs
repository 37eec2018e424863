//! Raw resource types for heap memory.
//!
//! The handles in this crate treat their resource as an opaque value. The
//! types here are the memory-backed resources the crate knows how to
//! dereference:
//! - [HeapPtr<T>] is the address of a single value (or a fat slice) leaked
//!   from a [Box].
//! - [ArrayPtr<T>] is the address and count of N contiguous values leaked
//!   from a [Vec], released by [ArrayDeleter](crate::deleter::ArrayDeleter)
//!   as one array rather than as a single value.
//!
//! Neither type is [Clone]: holding one means holding the allocation, so two
//! owning handles can never be built from one address in safe code.

use alloc::{boxed::Box, vec::Vec};
use core::{
    fmt::Debug,
    hash::{Hash, Hasher},
    ptr::{self, NonNull},
    slice,
};

/// A resource that can be dereferenced by the handle holding it.
///
/// # Safety
///
/// [Pointee::as_ptr] must return a pointer that is valid for reads for as
/// long as the implementor is alive, and valid for writes while the
/// implementor is exclusively borrowed. No other value may alias it mutably.
pub unsafe trait Pointee {
    /// The type the resource points to.
    type Target: ?Sized;

    /// Get the address of the pointed-to value.
    fn as_ptr(&self) -> *mut Self::Target;
}

/// Owned address of a heap allocated value.
///
/// Dropping a [HeapPtr] leaks the value; hand it to a
/// [BoxDeleter](crate::deleter::BoxDeleter) to free it.
pub struct HeapPtr<T: ?Sized> {
    ptr: NonNull<T>,
}

unsafe impl<T: ?Sized + Send> Send for HeapPtr<T> {}
unsafe impl<T: ?Sized + Sync> Sync for HeapPtr<T> {}

impl<T> HeapPtr<T> {
    /// Move `value` to the heap and take its address.
    pub fn new(value: T) -> HeapPtr<T> {
        HeapPtr::from_box(Box::new(value))
    }
}

impl<T: ?Sized> HeapPtr<T> {
    /// Leak `value` and take its address.
    pub fn from_box(value: Box<T>) -> HeapPtr<T> {
        HeapPtr {
            ptr: NonNull::from(Box::leak(value)),
        }
    }

    /// Adopt a raw address.
    ///
    /// The function is marked as **unsafe** because **`ptr` must come from
    /// [Box::into_raw] and must not be owned by anything else.**
    pub const unsafe fn from_raw(ptr: NonNull<T>) -> HeapPtr<T> {
        HeapPtr { ptr }
    }

    /// Give up ownership of the allocation and return its address.
    pub fn into_raw(self) -> NonNull<T> {
        self.ptr
    }

    /// Rebuild the [Box] the address was leaked from.
    pub fn into_box(self) -> Box<T> {
        // Only `from_box` and `from_raw` create the address.
        unsafe { Box::from_raw(self.ptr.as_ptr()) }
    }

    /// Get the numeric address.
    pub fn addr(&self) -> usize {
        self.ptr.cast::<u8>().as_ptr() as usize
    }
}

unsafe impl<T: ?Sized> Pointee for HeapPtr<T> {
    type Target = T;

    fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }
}

impl<T: ?Sized> PartialEq for HeapPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl<T: ?Sized> Eq for HeapPtr<T> {}

impl<T: ?Sized> Hash for HeapPtr<T> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.addr().hash(state);
    }
}

impl<T: ?Sized> Debug for HeapPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("HeapPtr({:#x})", self.addr()))
    }
}

/// Owned address and length of a run of contiguous heap values.
///
/// Dropping an [ArrayPtr] leaks the elements; hand it to an
/// [ArrayDeleter](crate::deleter::ArrayDeleter) to free them.
pub struct ArrayPtr<T> {
    ptr: NonNull<T>,
    len: usize,
}

unsafe impl<T: Send> Send for ArrayPtr<T> {}
unsafe impl<T: Sync> Sync for ArrayPtr<T> {}

impl<T> ArrayPtr<T> {
    /// Leak the elements of `values` as one allocation.
    pub fn from_vec(values: Vec<T>) -> ArrayPtr<T> {
        let boxed = values.into_boxed_slice();
        let len = boxed.len();
        let ptr = NonNull::from(Box::leak(boxed)).cast::<T>();
        ArrayPtr { ptr, len }
    }

    /// Adopt a raw address and element count.
    ///
    /// The function is marked as **unsafe** because **`ptr` and `len` must
    /// describe a leaked `Box<[T]>` that nothing else owns.**
    pub const unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> ArrayPtr<T> {
        ArrayPtr { ptr, len }
    }

    /// Give up ownership of the elements and return the address of the
    /// first one with the element count.
    pub fn into_raw_parts(self) -> (NonNull<T>, usize) {
        (self.ptr, self.len)
    }

    /// Rebuild the boxed slice the elements were leaked from.
    pub fn into_boxed_slice(self) -> Box<[T]> {
        let elements = ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len);
        // Only `from_vec` and `from_raw_parts` create the pair.
        unsafe { Box::from_raw(elements) }
    }

    /// Get the number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the numeric address of the first element.
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Borrow the elements.
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutably borrow the elements.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

unsafe impl<T> Pointee for ArrayPtr<T> {
    type Target = [T];

    fn as_ptr(&self) -> *mut [T] {
        ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

impl<T> PartialEq for ArrayPtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.len == other.len
    }
}

impl<T> Eq for ArrayPtr<T> {}

impl<T> Debug for ArrayPtr<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("ArrayPtr({:#x}; {})", self.addr(), self.len))
    }
}
