mod common;

use common::{Ledger, ReleaseFailure};
use handle::{ArrayPtr, HandleError, SharedHandle, UniqueHandle};
use rstest::rstest;
use std::panic::{AssertUnwindSafe, catch_unwind};

#[test]
fn test_shared_new() {
    let ledger = Ledger::new();
    let handle = SharedHandle::new(1, ledger.deleter());
    assert_eq!(handle.get(), Some(&1));
    assert_eq!(handle.use_count(), 1);
    assert_eq!(handle.weak_count(), 0);
    drop(handle);
    assert_eq!(ledger.released(), vec![1]);
}

#[test]
fn test_shared_empty() {
    let handle = SharedHandle::<u32, common::RecordingDeleter>::empty();
    assert!(handle.is_empty());
    assert_eq!(handle.get(), None);
    assert_eq!(handle.use_count(), 0);
    assert!(handle.downgrade().expired());
    let other = SharedHandle::<u32, common::RecordingDeleter>::default();
    assert!(handle.same_owner(&other));
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(64)]
fn test_shared_clone_raises_and_restores_count(#[case] copies: usize) {
    let ledger = Ledger::new();
    let handle = SharedHandle::new(2, ledger.deleter());
    let before = handle.use_count();
    let clones: Vec<_> = (0..copies).map(|_| handle.clone()).collect();
    assert_eq!(handle.use_count(), before + copies);
    assert!(clones.iter().all(|clone| clone.same_owner(&handle)));
    drop(clones);
    assert_eq!(handle.use_count(), before);
    assert_eq!(ledger.total(), 0);
}

#[test]
fn test_shared_two_owners_release_once() {
    let ledger = Ledger::new();
    let a = SharedHandle::new(3, ledger.deleter());
    assert_eq!(a.use_count(), 1);
    let b = a.clone();
    assert_eq!(b.use_count(), 2);
    drop(a);
    assert_eq!(b.use_count(), 1);
    assert_eq!(ledger.total(), 0);
    drop(b);
    assert_eq!(ledger.released(), vec![3]);
}

#[test]
fn test_shared_self_clone_assign() {
    let ledger = Ledger::new();
    let mut handle = SharedHandle::new(4, ledger.deleter());
    handle = handle.clone();
    assert_eq!(handle.use_count(), 1);
    let alias = handle.clone();
    handle.clone_from(&alias);
    assert_eq!(handle.use_count(), 2);
    drop(alias);
    assert_eq!(ledger.total(), 0);
    drop(handle);
    assert_eq!(ledger.released(), vec![4]);
}

#[test]
fn test_shared_clone_from_other_block() {
    let ledger = Ledger::new();
    let mut target = SharedHandle::new(5, ledger.deleter());
    let source = SharedHandle::new(6, ledger.deleter());
    target.clone_from(&source);
    assert_eq!(ledger.released(), vec![5]);
    assert!(target.same_owner(&source));
    assert_eq!(source.use_count(), 2);
}

#[test]
fn test_shared_move_keeps_count() {
    let ledger = Ledger::new();
    let mut first = SharedHandle::new(7, ledger.deleter());
    let copy = first.clone();
    let second = first.take();
    assert!(first.is_empty());
    assert_eq!(second.use_count(), 2);
    let third = second;
    assert_eq!(third.use_count(), 2);
    drop(copy);
    drop(third);
    assert_eq!(ledger.released(), vec![7]);
}

#[test]
fn test_shared_reset() {
    let ledger = Ledger::new();
    let mut handle = SharedHandle::new(8, ledger.deleter());
    let other = handle.clone();
    handle.reset().unwrap();
    assert!(handle.is_empty());
    assert_eq!(other.use_count(), 1);
    assert_eq!(ledger.total(), 0);
    handle.reset().unwrap();
    drop(other);
    assert_eq!(ledger.released(), vec![8]);
}

#[test]
fn test_shared_replace_releases_old_only() {
    let ledger = Ledger::new();
    let mut handle = SharedHandle::new(10, ledger.deleter());
    handle.replace(20, ledger.deleter()).unwrap();
    assert_eq!(ledger.released(), vec![10]);
    assert_eq!(handle.get(), Some(&20));
    assert_eq!(handle.use_count(), 1);
    drop(handle);
    assert_eq!(ledger.released(), vec![10, 20]);
}

#[test]
fn test_shared_reset_failure_leaves_empty() {
    let ledger = Ledger::new();
    let mut handle = SharedHandle::new(11, ledger.failing_deleter());
    assert_eq!(handle.reset(), Err(ReleaseFailure(11)));
    assert!(handle.is_empty());
    assert_eq!(handle.reset(), Ok(()));
    drop(handle);
    assert_eq!(ledger.released(), vec![11]);
}

#[test]
fn test_shared_panicking_deleter_with_observer() {
    let ledger = Ledger::new();
    let shared = SharedHandle::new(1, ledger.panicking_deleter());
    let weak = shared.downgrade();
    assert!(catch_unwind(AssertUnwindSafe(|| drop(shared))).is_err());
    assert_eq!(ledger.released(), vec![1]);
    assert!(weak.expired());
    assert!(weak.upgrade().is_none());
    assert_eq!(weak.weak_count(), 1);
    drop(weak);
    assert_eq!(ledger.released(), vec![1]);
}

#[test]
fn test_shared_panicking_deleter_last_reference() {
    let ledger = Ledger::new();
    let mut shared = SharedHandle::new(2, ledger.panicking_deleter());
    let copy = shared.clone();
    drop(copy);
    assert!(catch_unwind(AssertUnwindSafe(|| shared.reset())).is_err());
    assert!(shared.is_empty());
    assert_eq!(shared.reset(), Ok(()));
    drop(shared);
    assert_eq!(ledger.released(), vec![2]);
}

#[test]
fn test_shared_promote_unique() {
    let ledger = Ledger::new();
    let unique = UniqueHandle::new(12, ledger.deleter());
    let shared = SharedHandle::from(unique);
    assert_eq!(shared.get(), Some(&12));
    assert_eq!(shared.use_count(), 1);
    let copy = shared.clone();
    drop(shared);
    drop(copy);
    assert_eq!(ledger.released(), vec![12]);
}

#[test]
fn test_shared_promote_empty_unique() {
    let ledger = Ledger::new();
    let shared = UniqueHandle::<u32, _>::empty_with(ledger.deleter()).into_shared();
    assert!(shared.is_empty());
    drop(shared);
    assert_eq!(ledger.total(), 0);
}

#[test]
fn test_shared_boxed_deref() {
    let handle = SharedHandle::boxed(vec![1, 2, 3]);
    let copy = handle.clone();
    assert_eq!(copy.len(), 3);
    assert_eq!(handle.try_deref().map(|values| values[1]), Ok(2));
    assert_eq!(handle.get().map(|ptr| ptr.addr()), copy.get().map(|ptr| ptr.addr()));
}

#[test]
fn test_shared_empty_try_deref() {
    let mut handle = SharedHandle::boxed(5u8);
    handle.reset().unwrap();
    assert_eq!(handle.try_deref(), Err(HandleError::UseAfterEmpty));
}

#[test]
#[should_panic(expected = "null access")]
fn test_shared_empty_deref_panics() {
    let mut handle = SharedHandle::boxed(5u8);
    handle.reset().unwrap();
    let value: u8 = *handle;
    assert_eq!(value, 5);
}

#[test]
fn test_shared_array() {
    let handle = UniqueHandle::array(vec![4, 5, 6]).into_shared();
    let copy = handle.clone();
    assert_eq!(copy.as_slice(), Some(&[4, 5, 6][..]));
    assert_eq!(handle.get().map(ArrayPtr::len), Some(3));
    assert_eq!(handle.iter().sum::<i32>(), 15);
    let fresh = SharedHandle::array(Vec::<u8>::new());
    assert_eq!(fresh.as_slice(), Some(&[][..]));
}

#[test]
fn test_shared_debug() {
    let ledger = Ledger::new();
    let handle = SharedHandle::new(13, ledger.deleter());
    let _copy = handle.clone();
    assert_eq!(
        format!("{:?}", handle),
        "SharedHandle { resource: Some(13), use_count: 2 }"
    );
}
