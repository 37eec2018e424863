//! Release capabilities for owned resources.
//!
//! A [Deleter<H>] is handed a resource of type `H` exactly once, when the
//! last owner lets go of it. The handles never look inside the resource and
//! never decide how it is released; single-object versus array release, file
//! descriptor closing or lock unlocking is entirely the deleter's business.
//!
//! Deleters provided here:
//! - [BoxDeleter]: frees a [HeapPtr] as the single [Box] it was leaked from.
//! - [ArrayDeleter]: frees an [ArrayPtr] as one array of elements.
//! - [FnDeleter]: runs a closure.
//! - [NoopDeleter]: drops the resource value and does nothing else.
//!
//! A boxed `dyn Deleter` is itself a deleter, which lets the release logic be
//! picked at wrap time rather than by the static type of the handle.

use alloc::boxed::Box;
use core::{convert::Infallible, fmt::Debug};

use crate::resource::{ArrayPtr, HeapPtr};

/// Releases a resource of type `H`.
pub trait Deleter<H> {
    /// Failure reported by [Deleter::release].
    type Error: Debug;

    /// Release `resource`.
    ///
    /// Called at most once per resource. A failure is reported to whoever
    /// triggered the release and is never retried; the resource is
    /// considered gone either way.
    fn release(&mut self, resource: H) -> Result<(), Self::Error>;
}

/// A deleter whose release logic is chosen at runtime.
pub type DynDeleter<H, E> = Box<dyn Deleter<H, Error = E> + Send>;

impl<H, D: Deleter<H> + ?Sized> Deleter<H> for Box<D> {
    type Error = D::Error;

    fn release(&mut self, resource: H) -> Result<(), D::Error> {
        (**self).release(resource)
    }
}

/// Frees a [HeapPtr] through the [Box] it was leaked from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoxDeleter;

impl<T: ?Sized> Deleter<HeapPtr<T>> for BoxDeleter {
    type Error = Infallible;

    fn release(&mut self, resource: HeapPtr<T>) -> Result<(), Infallible> {
        drop(resource.into_box());
        Ok(())
    }
}

/// Frees an [ArrayPtr] as one run of contiguous elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArrayDeleter;

impl<T> Deleter<ArrayPtr<T>> for ArrayDeleter {
    type Error = Infallible;

    fn release(&mut self, resource: ArrayPtr<T>) -> Result<(), Infallible> {
        drop(resource.into_boxed_slice());
        Ok(())
    }
}

/// Releases resources by calling a closure.
#[derive(Debug, Clone, Copy)]
pub struct FnDeleter<F> {
    inner: F,
}

impl<F> FnDeleter<F> {
    /// Wrap `release` as a deleter.
    pub const fn new(release: F) -> FnDeleter<F> {
        FnDeleter { inner: release }
    }
}

impl<H, F, E> Deleter<H> for FnDeleter<F>
where
    F: FnMut(H) -> Result<(), E>,
    E: Debug,
{
    type Error = E;

    fn release(&mut self, resource: H) -> Result<(), E> {
        (self.inner)(resource)
    }
}

/// Releases nothing beyond dropping the resource value itself.
///
/// Suitable for borrowed or static resources that a handle only tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopDeleter;

impl<H> Deleter<H> for NoopDeleter {
    type Error = Infallible;

    fn release(&mut self, resource: H) -> Result<(), Infallible> {
        drop(resource);
        Ok(())
    }
}
