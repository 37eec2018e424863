//! Process-wide handle configuration.
//!
//! The configuration only steers diagnostics: whether control blocks are
//! counted, what [leak_check](crate::tracking::leak_check) does when blocks
//! remain alive, and whether releases are logged. Ownership semantics never
//! depend on it.
//!
//! The current configuration lives behind a [spin::RwLock] so it can be
//! installed from any thread without the standard library. The count paths
//! never take that lock; they read atomic mirrors of the flags instead.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::RwLock;
use thiserror::Error;

/// What a leak check does when control blocks are still alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeakStrategy {
    /// Report nothing.
    Ignore,
    /// Log a warning.
    #[default]
    Warn,
    /// Return an error to the caller.
    Deny,
    /// Panic.
    Panic,
}

/// Diagnostic settings shared by every handle in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleConfig {
    /// Count control block creations, releases and deallocations.
    pub track_blocks: bool,
    /// Behavior of a leak check that finds live control blocks.
    pub leak_strategy: LeakStrategy,
    /// Emit a debug record every time a shared resource is released.
    pub log_releases: bool,
}

impl HandleConfig {
    /// The default configuration: no tracking, warn on leaks, quiet releases.
    pub const fn new() -> HandleConfig {
        HandleConfig {
            track_blocks: false,
            leak_strategy: LeakStrategy::Warn,
            log_releases: false,
        }
    }

    /// Start building a configuration from the defaults.
    pub fn builder() -> HandleConfigBuilder {
        HandleConfigBuilder::new()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self.leak_strategy {
            LeakStrategy::Deny | LeakStrategy::Panic if !self.track_blocks => Err(
                ConfigError::Invalid("a failing leak strategy requires track_blocks"),
            ),
            _ => Ok(()),
        }
    }
}

impl Default for HandleConfig {
    fn default() -> Self {
        HandleConfig::new()
    }
}

/// Validating builder for [HandleConfig].
#[derive(Debug, Clone)]
pub struct HandleConfigBuilder {
    inner: HandleConfig,
}

impl HandleConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self {
            inner: HandleConfig::new(),
        }
    }

    /// Set [HandleConfig::track_blocks].
    pub fn track_blocks(mut self, enabled: bool) -> Self {
        self.inner.track_blocks = enabled;
        self
    }

    /// Set [HandleConfig::leak_strategy].
    pub fn leak_strategy(mut self, strategy: LeakStrategy) -> Self {
        self.inner.leak_strategy = strategy;
        self
    }

    /// Set [HandleConfig::log_releases].
    pub fn log_releases(mut self, enabled: bool) -> Self {
        self.inner.log_releases = enabled;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<HandleConfig, ConfigError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

impl Default for HandleConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configuration that cannot be installed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The settings contradict each other.
    #[error("invalid handle configuration: {0}")]
    Invalid(&'static str),
}

static CONFIG: RwLock<HandleConfig> = RwLock::new(HandleConfig::new());
static GENERATION: AtomicUsize = AtomicUsize::new(0);
static TRACK_BLOCKS: AtomicBool = AtomicBool::new(false);
static LOG_RELEASES: AtomicBool = AtomicBool::new(false);

/// Validate `config` and make it the process-wide configuration.
pub fn install_config(config: HandleConfig) -> Result<(), ConfigError> {
    config.validate()?;
    {
        let mut guard = CONFIG.write();
        *guard = config;
        TRACK_BLOCKS.store(config.track_blocks, Ordering::Relaxed);
        LOG_RELEASES.store(config.log_releases, Ordering::Relaxed);
    }
    GENERATION.fetch_add(1, Ordering::Relaxed);
    debug_ex!("installed handle configuration {:?}", config);
    Ok(())
}

/// Get a copy of the current configuration.
pub fn config_snapshot() -> HandleConfig {
    *CONFIG.read()
}

/// Get the number of configurations installed so far.
pub fn config_generation() -> usize {
    GENERATION.load(Ordering::Relaxed)
}

pub(crate) fn tracking_enabled() -> bool {
    TRACK_BLOCKS.load(Ordering::Relaxed)
}

pub(crate) fn releases_logged() -> bool {
    LOG_RELEASES.load(Ordering::Relaxed)
}
