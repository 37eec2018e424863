//! Ownership handles over externally acquired resources.
//!
//! The caller acquires a resource (a heap address, a file descriptor, a lock,
//! any value naming something that must be given back) and wraps it together
//! with a [Deleter] that knows how to give it back. The handles guarantee the
//! deleter runs exactly once per resource, or never if ownership is
//! explicitly released.
//!
//! Provide three handle types:
//! - [UniqueHandle<H, D>] owns a resource exclusively. It cannot be cloned;
//!   moving it moves the ownership.
//! - [SharedHandle<H, D>] co-owns a resource through a reference counted
//!   control block. The last strong owner to go away releases it, from
//!   whichever thread that happens on.
//! - [WeakHandle<H, D>] observes a shared resource without keeping it alive.
//!   Call [WeakHandle::upgrade] to attempt to get a [SharedHandle]; it
//!   returns [None] once the strong owners have dropped the resource.
//!
//! Conversions only go in one direction each:
//! - [UniqueHandle] → [SharedHandle] with [UniqueHandle::into_shared] (or
//!   [From]); shared ownership never turns back into exclusive ownership.
//! - [SharedHandle] → [WeakHandle] with [SharedHandle::downgrade].
//! - [WeakHandle] → [SharedHandle] with [WeakHandle::upgrade], only while
//!   the resource is alive.
//!
//! Key guarantees and semantics:
//! - A handle clears its own reference before the deleter runs. A failing
//!   deleter is reported once and never invoked again for that resource.
//!   Explicit paths ([UniqueHandle::reset], [SharedHandle::reset], ...)
//!   return the failure; drop paths log it at error level.
//! - Reference counts change only through atomic compare-and-swap loops and
//!   never go negative; overflow and underflow are fatal and panic.
//! - Concurrent clone, drop, downgrade and upgrade of shared and weak handles
//!   are safe. Concurrent mutation of the pointed-to value is not managed.
//!
//! Diagnostics are steered by a process-wide [HandleConfig]: control block
//! accounting and leak checks live in [tracking].

#![cfg_attr(not(test), no_std)]
extern crate alloc;

#[macro_use]
mod macros;

pub mod config;
mod control;
pub mod deleter;
pub mod error;
pub mod resource;
pub mod shared;
pub mod tracking;
pub mod unique;
pub mod weak;

pub use config::{
    ConfigError, HandleConfig, HandleConfigBuilder, LeakStrategy, config_generation,
    config_snapshot, install_config,
};
pub use control::{STRONG_COUNT_MAX, WEAK_COUNT_MAX};
pub use deleter::{ArrayDeleter, BoxDeleter, Deleter, DynDeleter, FnDeleter, NoopDeleter};
pub use error::HandleError;
pub use resource::{ArrayPtr, HeapPtr, Pointee};
pub use shared::SharedHandle;
pub use tracking::{BlockStats, LeakError, block_stats, leak_check, reset_block_stats};
pub use unique::UniqueHandle;
pub use weak::WeakHandle;
