mod common;

use common::Ledger;
use handle::SharedHandle;
use rstest::rstest;
use std::sync::Barrier;
use std::thread;

#[rstest]
#[case(2)]
#[case(4)]
#[case(8)]
fn test_concurrent_clone_and_drop(#[case] threads: usize) {
    let ledger = Ledger::new();
    let shared = SharedHandle::new(1, ledger.deleter());
    let barrier = Barrier::new(threads);
    thread::scope(|scope| {
        for _ in 0..threads {
            let local = shared.clone();
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                for _ in 0..1000 {
                    let copy = local.clone();
                    let weak = copy.downgrade();
                    drop(copy);
                    assert!(weak.upgrade().is_some());
                }
            });
        }
    });
    assert_eq!(shared.use_count(), 1);
    assert_eq!(shared.weak_count(), 0);
    assert_eq!(ledger.total(), 0);
    drop(shared);
    assert_eq!(ledger.released(), vec![1]);
}

#[rstest]
#[case(2)]
#[case(8)]
fn test_last_owner_on_any_thread_releases_once(#[case] threads: usize) {
    for round in 0..100 {
        let ledger = Ledger::new();
        let shared = SharedHandle::new(round, ledger.deleter());
        let barrier = Barrier::new(threads);
        thread::scope(|scope| {
            for _ in 0..threads {
                let local = shared.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    drop(local);
                });
            }
            drop(shared);
        });
        assert_eq!(ledger.released(), vec![round]);
    }
}

#[rstest]
#[case(2)]
#[case(8)]
fn test_upgrade_races_final_release(#[case] threads: usize) {
    for round in 0..100 {
        let ledger = Ledger::new();
        let shared = SharedHandle::new(round, ledger.deleter());
        let weak = shared.downgrade();
        let barrier = Barrier::new(threads + 1);
        thread::scope(|scope| {
            for _ in 0..threads {
                let weak = weak.clone();
                let barrier = &barrier;
                scope.spawn(move || {
                    barrier.wait();
                    if let Some(upgraded) = weak.upgrade() {
                        assert_eq!(upgraded.get(), Some(&round));
                    }
                });
            }
            barrier.wait();
            drop(shared);
        });
        assert!(weak.expired());
        assert!(weak.upgrade().is_none());
        assert_eq!(ledger.released(), vec![round]);
    }
}

#[test]
fn test_weak_handles_dropped_across_threads() {
    let ledger = Ledger::new();
    let shared = SharedHandle::new(7, ledger.deleter());
    let weaks: Vec<_> = (0..16).map(|_| shared.downgrade()).collect();
    thread::scope(|scope| {
        for weak in weaks {
            scope.spawn(move || drop(weak));
        }
        scope.spawn(move || drop(shared));
    });
    assert_eq!(ledger.released(), vec![7]);
}
