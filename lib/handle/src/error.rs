//! Errors reported by handle accessors.

use thiserror::Error;

/// An access through a handle that cannot be satisfied.
///
/// Release failures are not part of this type: they are reported through the
/// deleter's own [`Deleter::Error`](crate::deleter::Deleter::Error).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// The handle owns no resource.
    #[error("null access: dereferenced an empty handle")]
    UseAfterEmpty,
    /// The observed resource has already been released.
    #[error("the observed resource has already been released")]
    Expired,
}
