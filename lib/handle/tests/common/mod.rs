#![allow(dead_code)]

use handle::Deleter;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};

/// Record of every resource id released by the deleters it hands out.
#[derive(Clone, Default)]
pub struct Ledger {
    released: Arc<Mutex<Vec<u32>>>,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub fn deleter(&self) -> RecordingDeleter {
        RecordingDeleter {
            ledger: self.clone(),
        }
    }

    pub fn failing_deleter(&self) -> FailingDeleter {
        FailingDeleter {
            ledger: self.clone(),
        }
    }

    pub fn panicking_deleter(&self) -> PanickingDeleter {
        PanickingDeleter {
            ledger: self.clone(),
        }
    }

    pub fn released(&self) -> Vec<u32> {
        self.released.lock().unwrap().clone()
    }

    pub fn count(&self, id: u32) -> usize {
        self.released
            .lock()
            .unwrap()
            .iter()
            .filter(|released| **released == id)
            .count()
    }

    pub fn total(&self) -> usize {
        self.released.lock().unwrap().len()
    }

    fn record(&self, id: u32) {
        self.released.lock().unwrap().push(id);
    }
}

/// Records each released id in its ledger.
pub struct RecordingDeleter {
    ledger: Ledger,
}

impl Deleter<u32> for RecordingDeleter {
    type Error = Infallible;

    fn release(&mut self, resource: u32) -> Result<(), Infallible> {
        self.ledger.record(resource);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseFailure(pub u32);

/// Records each released id, then reports a failure for it.
pub struct FailingDeleter {
    ledger: Ledger,
}

impl Deleter<u32> for FailingDeleter {
    type Error = ReleaseFailure;

    fn release(&mut self, resource: u32) -> Result<(), ReleaseFailure> {
        self.ledger.record(resource);
        Err(ReleaseFailure(resource))
    }
}

/// Records each released id, then panics.
pub struct PanickingDeleter {
    ledger: Ledger,
}

impl Deleter<u32> for PanickingDeleter {
    type Error = Infallible;

    fn release(&mut self, resource: u32) -> Result<(), Infallible> {
        self.ledger.record(resource);
        panic!("deleter panicked releasing {}", resource);
    }
}

/// Value whose drops are counted, for checking heap deleters.
pub struct DropCounter {
    drops: Arc<Mutex<usize>>,
}

impl DropCounter {
    pub fn new(drops: &Arc<Mutex<usize>>) -> DropCounter {
        DropCounter {
            drops: drops.clone(),
        }
    }
}

impl Drop for DropCounter {
    fn drop(&mut self) {
        *self.drops.lock().unwrap() += 1;
    }
}
