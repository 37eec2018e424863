//! Live control block accounting.
//!
//! When [HandleConfig::track_blocks](crate::config::HandleConfig) is set,
//! every control block creation, resource release and block deallocation is
//! counted. [leak_check] compares the counts and applies the configured
//! [LeakStrategy].
//!
//! Counting only happens while tracking is enabled, so toggling it with
//! blocks alive skews the numbers; reset them with [reset_block_stats] after
//! installing a new configuration.

use core::sync::atomic::{AtomicUsize, Ordering};
use log::warn;
use thiserror::Error;

use crate::config::{self, LeakStrategy};

static CREATED: AtomicUsize = AtomicUsize::new(0);
static RELEASED: AtomicUsize = AtomicUsize::new(0);
static FREED: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of the control block counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockStats {
    /// Control blocks created.
    pub created: usize,
    /// Resources released through a control block.
    pub released: usize,
    /// Control blocks deallocated.
    pub freed: usize,
    /// Control blocks not yet deallocated.
    pub live: usize,
}

/// Control blocks outlived the point where they were expected to be gone.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{live} control blocks still alive ({created} created, {freed} freed)")]
pub struct LeakError {
    /// Control blocks not yet deallocated.
    pub live: usize,
    /// Control blocks created.
    pub created: usize,
    /// Control blocks deallocated.
    pub freed: usize,
}

impl From<BlockStats> for LeakError {
    fn from(stats: BlockStats) -> Self {
        LeakError {
            live: stats.live,
            created: stats.created,
            freed: stats.freed,
        }
    }
}

pub(crate) fn record_create() {
    if config::tracking_enabled() {
        CREATED.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn record_release() {
    if config::tracking_enabled() {
        RELEASED.fetch_add(1, Ordering::Relaxed);
    }
}

pub(crate) fn record_free() {
    if config::tracking_enabled() {
        FREED.fetch_add(1, Ordering::Relaxed);
    }
}

/// Get the current counters.
pub fn block_stats() -> BlockStats {
    let created = CREATED.load(Ordering::Relaxed);
    let released = RELEASED.load(Ordering::Relaxed);
    let freed = FREED.load(Ordering::Relaxed);
    BlockStats {
        created,
        released,
        freed,
        live: created.saturating_sub(freed),
    }
}

/// Zero all counters.
pub fn reset_block_stats() {
    CREATED.store(0, Ordering::Relaxed);
    RELEASED.store(0, Ordering::Relaxed);
    FREED.store(0, Ordering::Relaxed);
}

/// Check for control blocks that are still alive.
///
/// Returns the counters when nothing is alive, or when the configured
/// strategy tolerates it.
///
/// # Panics
///
/// Panics if blocks are alive and the strategy is [LeakStrategy::Panic].
pub fn leak_check() -> Result<BlockStats, LeakError> {
    let stats = block_stats();
    if stats.live == 0 {
        return Ok(stats);
    }
    match config::config_snapshot().leak_strategy {
        LeakStrategy::Ignore => Ok(stats),
        LeakStrategy::Warn => {
            warn!("{}", LeakError::from(stats));
            Ok(stats)
        }
        LeakStrategy::Deny => Err(stats.into()),
        LeakStrategy::Panic => panic!("{}", LeakError::from(stats)),
    }
}
