//! Deadlines, caller cancellation and sibling cancellation in window reads.

use chrono::{TimeZone, Utc};
use quill_core::config::PaginationConfig;
use quill_core::memory::MemoryStore;
use quill_core::model::Comment;
use quill_core::source::{OrderDirection, RangeQuery, RowSource, SourceError};
use quill_core::{CancelToken, PageError, Paginator, Visibility};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn seed(store: &MemoryStore) {
    store.insert_post(1, "thread", true, Utc.timestamp_opt(0, 0).unwrap());
    for secs in 1..=5 {
        store.add_comment(1, "ann", "x", Utc.timestamp_opt(secs, 0).unwrap());
    }
}

#[test]
fn query_timeout_surfaces_as_cancelled() {
    let store = MemoryStore::with_latency(Duration::from_secs(10));
    seed(&store);
    let config = PaginationConfig {
        query_timeout_ms: 30,
        ..PaginationConfig::default()
    };
    let paginator = Paginator::new(store, config);

    let started = Instant::now();
    let err = paginator
        .page_scoped_forward(1, Visibility::ALL, 2, None, &CancelToken::new())
        .expect_err("deadline should fire");
    assert!(matches!(err, PageError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn caller_cancellation_interrupts_slow_window() {
    let store = MemoryStore::with_latency(Duration::from_secs(10));
    seed(&store);
    let config = PaginationConfig {
        query_timeout_ms: 0,
        ..PaginationConfig::default()
    };
    let paginator = Paginator::new(store, config);
    let cancel = CancelToken::new();

    let started = Instant::now();
    let result = thread::scope(|scope| {
        let handle = scope.spawn(|| {
            paginator.window_around_anchor(1, Visibility::ALL, 3, 1, 1, &cancel)
        });
        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        handle.join().expect("window thread panicked")
    });

    assert!(matches!(result, Err(PageError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

/// Row source whose descending reads fail at once while ascending reads
/// block until cancelled.
struct SplitSource {
    inner: MemoryStore,
    ascending_was_cancelled: AtomicBool,
}

impl RowSource for SplitSource {
    type Row = Comment;

    fn query(&self, query: &RangeQuery, cancel: &CancelToken) -> Result<Vec<Comment>, SourceError> {
        match query.order {
            OrderDirection::Desc => Err(anyhow::anyhow!("disk on fire").into()),
            OrderDirection::Asc => {
                let started = Instant::now();
                while started.elapsed() < Duration::from_secs(10) {
                    if cancel.is_cancelled() {
                        self.ascending_was_cancelled.store(true, Ordering::Release);
                        return Err(SourceError::Cancelled);
                    }
                    thread::sleep(Duration::from_millis(1));
                }
                self.inner.query(query, cancel)
            }
        }
    }

    fn get_by_id(&self, id: i64, cancel: &CancelToken) -> Result<Option<Comment>, SourceError> {
        self.inner.get_by_id(id, cancel)
    }

    fn scope_exists(&self, post_id: i64, cancel: &CancelToken) -> Result<bool, SourceError> {
        self.inner.scope_exists(post_id, cancel)
    }
}

#[test]
fn failing_side_cancels_its_sibling_and_wins() {
    let inner = MemoryStore::new();
    seed(&inner);
    let source = SplitSource {
        inner,
        ascending_was_cancelled: AtomicBool::new(false),
    };
    let config = PaginationConfig {
        query_timeout_ms: 0,
        ..PaginationConfig::default()
    };
    let paginator = Paginator::new(source, config);

    let started = Instant::now();
    let err = paginator
        .window_around_anchor(1, Visibility::ALL, 3, 2, 2, &CancelToken::new())
        .expect_err("before side fails");

    match err {
        PageError::Storage(inner) => assert!(inner.to_string().contains("disk on fire")),
        other => panic!("expected storage error, got {other:?}"),
    }
    assert!(paginator.source().ascending_was_cancelled.load(Ordering::Acquire));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn caller_token_is_untouched_by_sibling_cancellation() {
    let inner = MemoryStore::new();
    seed(&inner);
    let paginator = Paginator::new(
        SplitSource {
            inner,
            ascending_was_cancelled: AtomicBool::new(false),
        },
        PaginationConfig::default(),
    );

    let cancel = CancelToken::new();
    let _ = paginator.window_around_anchor(1, Visibility::ALL, 3, 1, 1, &cancel);
    assert!(!cancel.is_cancelled());
}
