mod common;

use common::Ledger;
use handle::{HandleConfig, SharedHandle, UniqueHandle, config_snapshot, install_config};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, MutexGuard, Once};

struct CaptureLogger;

static RECORDS: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());
static INIT: Once = Once::new();
static SERIAL: Mutex<()> = Mutex::new(());

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        RECORDS
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;

/// Install the capturing logger and take exclusive use of it.
fn capture() -> MutexGuard<'static, ()> {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    let guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    RECORDS.lock().unwrap().clear();
    guard
}

fn records_at(level: Level) -> Vec<String> {
    RECORDS
        .lock()
        .unwrap()
        .iter()
        .filter(|(record_level, _)| *record_level == level)
        .map(|(_, message)| message.clone())
        .collect()
}

#[test]
fn test_unique_drop_failure_is_logged() {
    let _guard = capture();
    let ledger = Ledger::new();
    drop(UniqueHandle::new(1, ledger.failing_deleter()));
    assert_eq!(ledger.released(), vec![1]);
    let errors = records_at(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ReleaseFailure(1)"));
}

#[test]
fn test_shared_drop_failure_is_logged_once() {
    let _guard = capture();
    let ledger = Ledger::new();
    let shared = SharedHandle::new(2, ledger.failing_deleter());
    let weak = shared.downgrade();
    let copy = shared.clone();
    drop(shared);
    assert!(records_at(Level::Error).is_empty());
    drop(copy);
    drop(weak);
    assert_eq!(ledger.released(), vec![2]);
    let errors = records_at(Level::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ReleaseFailure(2)"));
}

#[test]
fn test_explicit_reset_failure_is_not_logged() {
    let _guard = capture();
    let ledger = Ledger::new();
    let mut unique = UniqueHandle::new(3, ledger.failing_deleter());
    assert!(unique.reset(None).is_err());
    let mut shared = SharedHandle::new(4, ledger.failing_deleter());
    assert!(shared.reset().is_err());
    drop(unique);
    drop(shared);
    assert_eq!(ledger.released(), vec![3, 4]);
    assert!(records_at(Level::Error).is_empty());
}

#[test]
fn test_release_logging_follows_config() {
    let _guard = capture();
    let previous = config_snapshot();
    let ledger = Ledger::new();

    drop(SharedHandle::new(5, ledger.deleter()));
    let quiet = records_at(Level::Debug)
        .iter()
        .filter(|message| message.starts_with("releasing shared resource"))
        .count();
    assert_eq!(quiet, 0);

    install_config(HandleConfig::builder().log_releases(true).build().unwrap()).unwrap();
    drop(SharedHandle::new(6, ledger.deleter()));
    let logged = records_at(Level::Debug)
        .iter()
        .filter(|message| message.starts_with("releasing shared resource"))
        .count();
    install_config(previous).unwrap();
    assert_eq!(logged, 1);
}
