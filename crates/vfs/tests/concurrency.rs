mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{init_tracing, mounted, url, RecordingResolver, TestContext};
use vfs::cache::{BoundedStore, BoundedStoreConfig};
use vfs::prelude::*;

const WRITERS: usize = 4;
const READERS: usize = 8;
const ROUNDS: usize = 500;

/// Writers mount and unmount their own context over and over while
/// readers resolve paths below every writer's mount point. A reader only
/// ever sees an owning context or the default, and each writer observes
/// its own put and remove as soon as the call returns.
fn hammer(cache: Arc<ContextCache>) {
    let barrier = Arc::new(Barrier::new(WRITERS + READERS));
    let writers_done = Arc::new(AtomicBool::new(false));

    // a permanent parent mount that readers fall back to
    let parent = TestContext::new("file:///mounts");
    cache.put_context(mounted(&parent)).unwrap();

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let cache = cache.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            let root = format!("file:///mounts/w{writer}");
            let probe = url(&format!("{root}/probe"));
            barrier.wait();
            for _ in 0..ROUNDS {
                let context = mounted(&TestContext::new(&root));
                cache.put_context(context.clone()).unwrap();
                let seen = cache.find_context(&probe).unwrap();
                assert_eq!(seen.root_uri().as_str(), root);

                assert!(cache.remove_context(&context).unwrap());
                let seen = cache.find_context(&probe).unwrap();
                assert_eq!(seen.root_uri().as_str(), "file:///mounts");
            }
        }));
    }

    for reader in 0..READERS {
        let cache = cache.clone();
        let barrier = barrier.clone();
        let writers_done = writers_done.clone();
        handles.push(thread::spawn(move || {
            let target = url(&format!(
                "file:///mounts/w{}/deep/file.txt",
                reader % WRITERS
            ));
            let owner = format!("file:///mounts/w{}", reader % WRITERS);
            barrier.wait();
            while !writers_done.load(Ordering::Acquire) {
                let file = cache.get_file(&target).unwrap();
                let uri = file.uri().as_str();
                assert!(
                    uri == owner || uri == "file:///mounts",
                    "resolved through a context that does not own the path: {uri}"
                );
            }
        }));
    }

    let mut handles = handles.into_iter();
    for handle in handles.by_ref().take(WRITERS) {
        handle.join().unwrap();
    }
    writers_done.store(true, Ordering::Release);
    for handle in handles {
        handle.join().unwrap();
    }

    // only the parent is left once every writer unmounted
    assert_eq!(cache.size(), 1);
    let stats = cache.stats();
    assert_eq!(stats.inserts as usize, WRITERS * ROUNDS + 1);
    assert_eq!(stats.removals as usize, WRITERS * ROUNDS);
}

#[test]
fn test_concurrent_mount_and_resolve_with_map_store() {
    init_tracing();
    let resolver = Arc::new(RecordingResolver::default());
    let cache = Arc::new(ContextCache::new(resolver.clone()));
    hammer(cache);
    assert_eq!(resolver.calls(), 0);
}

#[test]
fn test_concurrent_mount_and_resolve_with_bounded_store() {
    init_tracing();
    let resolver = Arc::new(RecordingResolver::default());
    let cache = Arc::new(
        ContextCache::new(resolver.clone()).with_store(BoundedStore::new(BoundedStoreConfig {
            max_contexts: 64,
            ..Default::default()
        })),
    );
    hammer(cache);
    assert_eq!(resolver.calls(), 0);
}

#[test]
fn test_concurrent_puts_at_same_key_leave_one_winner() {
    init_tracing();
    let resolver = Arc::new(RecordingResolver::default());
    let cache = Arc::new(ContextCache::new(resolver));
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let cache = cache.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let context = mounted(&TestContext::new("file:///shared"));
                barrier.wait();
                cache.put_context(context.clone()).unwrap();
                context
            })
        })
        .collect();
    let contexts: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(cache.size(), 1);
    let winner = cache.find_context(&url("file:///shared/x")).unwrap();
    let matching = contexts
        .iter()
        .filter(|context| std::ptr::addr_eq(Arc::as_ptr(context), Arc::as_ptr(&winner)))
        .count();
    assert_eq!(matching, 1);
}
