use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread::scope;

use crate::{
    Error, GeneratorConfig, InMemoryStore, LockBlockGenerator, OptimisticStore, RetryPolicy,
    ScopeWindow, StoreError,
};

const SCOPE: &str = "orders";

fn generator<S: OptimisticStore>(store: S, batch_size: u64) -> LockBlockGenerator<S> {
    LockBlockGenerator::with_config(
        store,
        GeneratorConfig::default()
            .with_batch_size(batch_size)
            .with_retry(RetryPolicy::immediate(64)),
    )
    .unwrap()
}

/// Fails reads and/or writes on demand.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl OptimisticStore for FlakyStore {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        self.inner.try_optimistic_write(scope, expected, new_value)
    }
}

/// Lets a rival instance advance the counter by `rival_batch` right before
/// each of our next `rivals` conditional writes, so those writes lose.
struct RacingStore {
    inner: InMemoryStore,
    rivals: AtomicU32,
    rival_batch: u64,
}

impl OptimisticStore for RacingStore {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        self.inner.read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        let rival_turn = self
            .rivals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if rival_turn {
            let current = self.inner.read(scope)?;
            let base = current.as_deref().map_or(0, |v| v.parse::<u64>().unwrap());
            let rival = (base + self.rival_batch).to_string();
            assert!(
                self.inner
                    .try_optimistic_write(scope, current.as_deref(), &rival)
                    .unwrap()
            );
        }
        self.inner.try_optimistic_write(scope, expected, new_value)
    }
}

/// Every conditional write loses.
struct HopelessStore;

impl OptimisticStore for HopelessStore {
    fn read(&self, _scope: &str) -> Result<Option<String>, StoreError> {
        Ok(Some("0".into()))
    }

    fn try_optimistic_write(
        &self,
        _scope: &str,
        _expected: Option<&str>,
        _new_value: &str,
    ) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// Panics on its first read, then behaves.
#[derive(Default)]
struct PanicOnceStore {
    inner: InMemoryStore,
    panicked: AtomicBool,
}

impl OptimisticStore for PanicOnceStore {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        if !self.panicked.swap(true, Ordering::SeqCst) {
            panic!("store client bug");
        }
        self.inner.read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        self.inner.try_optimistic_write(scope, expected, new_value)
    }
}

/// Parks reads of `gated` between two barriers so a test can act while a
/// refill for that scope is in flight.
struct GatedStore {
    inner: InMemoryStore,
    gated: &'static str,
    entered: Barrier,
    release: Barrier,
}

impl GatedStore {
    fn new(gated: &'static str) -> Self {
        Self {
            inner: InMemoryStore::new(),
            gated,
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }
}

impl OptimisticStore for GatedStore {
    fn read(&self, scope: &str) -> Result<Option<String>, StoreError> {
        if scope == self.gated {
            self.entered.wait();
            self.release.wait();
        }
        self.inner.read(scope)
    }

    fn try_optimistic_write(
        &self,
        scope: &str,
        expected: Option<&str>,
        new_value: &str,
    ) -> Result<bool, StoreError> {
        self.inner.try_optimistic_write(scope, expected, new_value)
    }
}

#[test]
fn first_id_in_new_scope_is_zero() {
    let generator = generator(InMemoryStore::new(), 3);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 0);
}

#[test]
fn first_id_honors_configured_initial_value() {
    let generator = LockBlockGenerator::with_config(
        InMemoryStore::new(),
        GeneratorConfig::default()
            .with_batch_size(5)
            .with_initial_value(1),
    )
    .unwrap();

    let ids: Vec<u64> = (0..7).map(|_| generator.try_next_id(SCOPE).unwrap()).collect();
    assert_eq!(ids, [1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(generator.store().get(SCOPE).as_deref(), Some("11"));
}

#[test]
fn store_tracks_batch_boundaries() {
    let generator = generator(InMemoryStore::new(), 3);

    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 0);
    assert_eq!(generator.store().get(SCOPE).as_deref(), Some("3"));

    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 1);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 2);
    assert_eq!(generator.store().get(SCOPE).as_deref(), Some("3"));

    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 3);
    assert_eq!(generator.store().get(SCOPE).as_deref(), Some("6"));
}

#[test]
fn window_capacity_costs_no_round_trips() {
    let generator = generator(InMemoryStore::new(), 10);

    generator.try_next_id(SCOPE).unwrap();
    let after_refill = generator.stats().snapshot();
    assert_eq!(after_refill.round_trips(), 2);

    for _ in 1..10 {
        generator.try_next_id(SCOPE).unwrap();
    }
    let stats = generator.stats().snapshot();
    assert_eq!(stats.round_trips(), 2);
    assert_eq!(stats.batches_acquired, 1);
    assert_eq!(stats.ids_issued, 10);

    generator.try_next_id(SCOPE).unwrap();
    assert_eq!(generator.stats().snapshot().batches_acquired, 2);
}

#[test]
fn skips_batch_claimed_by_another_generator() {
    let store = Arc::new(InMemoryStore::new());
    let g1 = generator(Arc::clone(&store), 3);
    let g2 = generator(Arc::clone(&store), 3);

    assert_eq!(g1.try_next_id(SCOPE).unwrap(), 0);
    assert_eq!(g1.try_next_id(SCOPE).unwrap(), 1);
    assert_eq!(g1.try_next_id(SCOPE).unwrap(), 2);
    assert_eq!(store.get(SCOPE).as_deref(), Some("3"));

    assert_eq!(g2.try_next_id(SCOPE).unwrap(), 3);
    assert_eq!(store.get(SCOPE).as_deref(), Some("6"));

    assert_eq!(g1.try_next_id(SCOPE).unwrap(), 6);
    assert_eq!(store.get(SCOPE).as_deref(), Some("9"));
}

#[test]
fn interleaved_generators_return_disjoint_ids() {
    let store = Arc::new(InMemoryStore::new());
    let g1 = generator(Arc::clone(&store), 3);
    let g2 = generator(Arc::clone(&store), 3);

    let order = [&g1, &g1, &g1, &g2, &g1, &g2, &g2, &g2, &g1, &g1];
    let ids: Vec<u64> = order
        .iter()
        .map(|g| g.try_next_id(SCOPE).unwrap())
        .collect();

    assert_eq!(ids, [0, 1, 2, 3, 6, 4, 5, 9, 7, 8]);
}

#[test]
fn generators_with_different_batch_sizes_share_a_scope() {
    let store = Arc::new(InMemoryStore::new());
    let small = generator(Arc::clone(&store), 5);
    let large = generator(Arc::clone(&store), 50);

    assert_eq!(small.try_next_id(SCOPE).unwrap(), 0);
    assert_eq!(large.try_next_id(SCOPE).unwrap(), 5);
    assert_eq!(small.try_next_id(SCOPE).unwrap(), 1);
    assert_eq!(store.get(SCOPE).as_deref(), Some("55"));
}

#[test]
fn scopes_are_independent() {
    let generator = generator(InMemoryStore::new(), 3);

    assert_eq!(generator.try_next_id("a").unwrap(), 0);
    assert_eq!(generator.try_next_id("b").unwrap(), 0);
    assert_eq!(generator.try_next_id("a").unwrap(), 1);
    assert_eq!(generator.scopes().unwrap(), ["a", "b"]);
    assert_eq!(generator.window("a").unwrap(), Some(ScopeWindow::new(2, 3)));
    assert_eq!(generator.window("c").unwrap(), None);
}

#[test]
fn retries_after_losing_a_race() {
    let store = RacingStore {
        inner: InMemoryStore::new(),
        rivals: AtomicU32::new(2),
        rival_batch: 10,
    };
    let generator = generator(store, 3);

    // Two rivals commit [0, 10) and [10, 20) before our writes land.
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 20);
    assert_eq!(generator.store().inner.get(SCOPE).as_deref(), Some("23"));

    let stats = generator.stats().snapshot();
    assert_eq!(stats.write_conflicts, 2);
    assert_eq!(stats.write_attempts, 3);
    assert_eq!(stats.batches_acquired, 1);
}

#[test]
fn gives_up_after_retry_budget() {
    let generator = LockBlockGenerator::with_config(
        HopelessStore,
        GeneratorConfig::default().with_retry(RetryPolicy::immediate(4)),
    )
    .unwrap();

    let err = generator.try_next_id(SCOPE).unwrap_err();
    assert_eq!(
        err,
        Error::Contention {
            scope: SCOPE.into(),
            attempts: 4
        }
    );
    assert_eq!(generator.stats().snapshot().write_attempts, 4);
    assert_eq!(generator.window(SCOPE).unwrap(), Some(ScopeWindow::default()));
}

#[test]
fn read_fault_leaves_window_unchanged() {
    let generator = generator(FlakyStore::default(), 2);

    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 0);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 1);
    let before = generator.window(SCOPE).unwrap();

    generator.store().fail_reads.store(true, Ordering::SeqCst);
    let err = generator.try_next_id(SCOPE).unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert!(err.is_transient());
    assert_eq!(generator.window(SCOPE).unwrap(), before);

    generator.store().fail_reads.store(false, Ordering::SeqCst);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 2);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 3);
}

#[test]
fn panicking_store_does_not_wedge_the_scope() {
    let generator = generator(PanicOnceStore::default(), 3);

    let unwound = catch_unwind(AssertUnwindSafe(|| generator.try_next_id(SCOPE)));
    assert!(unwound.is_err());
    assert_eq!(generator.window(SCOPE).unwrap(), Some(ScopeWindow::default()));

    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 0);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 1);
    assert_eq!(generator.store().inner.get(SCOPE).as_deref(), Some("3"));
}

#[test]
fn blocked_refill_does_not_stall_other_scopes() {
    let generator = generator(GatedStore::new("a"), 3);

    scope(|s| {
        let refill = s.spawn(|| generator.try_next_id("a"));

        // "a" now holds its guard inside a store read.
        generator.store().entered.wait();
        assert_eq!(generator.try_next_id("b").unwrap(), 0);
        assert_eq!(generator.try_next_id("b").unwrap(), 1);

        generator.store().release.wait();
        assert_eq!(refill.join().unwrap(), Ok(0));
    });
}

#[test]
fn write_fault_is_not_retried() {
    let generator = generator(FlakyStore::default(), 2);
    generator.store().fail_writes.store(true, Ordering::SeqCst);

    let err = generator.try_next_id(SCOPE).unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert_eq!(generator.stats().snapshot().write_attempts, 1);

    generator.store().fail_writes.store(false, Ordering::SeqCst);
    assert_eq!(generator.try_next_id(SCOPE).unwrap(), 0);
}

#[test]
fn corrupted_counter_fails_without_writing() {
    let store = InMemoryStore::new();
    store.seed(SCOPE, "12ab");
    let generator = generator(store, 3);

    let err = generator.try_next_id(SCOPE).unwrap_err();
    assert!(matches!(err, Error::StoreCorrupted { .. }));
    assert!(!err.is_transient());
    assert_eq!(generator.stats().snapshot().write_attempts, 0);
    assert_eq!(generator.store().get(SCOPE).as_deref(), Some("12ab"));
}

#[test]
fn counter_overflow_is_reported() {
    let store = InMemoryStore::new();
    store.seed(SCOPE, (u64::MAX - 2).to_string());
    let generator = generator(store, 3);

    let err = generator.try_next_id(SCOPE).unwrap_err();
    assert!(matches!(err, Error::CounterOverflow { .. }));
    assert_eq!(
        generator.store().get(SCOPE),
        Some((u64::MAX - 2).to_string())
    );
}

#[test]
fn rejects_invalid_arguments() {
    let generator = generator(InMemoryStore::new(), 3);
    assert!(matches!(
        generator.try_next_id(""),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(generator.scopes().unwrap().is_empty());

    assert!(matches!(
        LockBlockGenerator::with_batch_size(InMemoryStore::new(), 0),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn ids_increase_by_one_within_an_instance() {
    let generator = generator(InMemoryStore::new(), 7);
    let ids: Vec<u64> = (0..100).map(|_| generator.try_next_id(SCOPE).unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[1] == w[0] + 1));
}

#[test]
fn threads_sharing_one_generator_never_duplicate() {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 500;

    let generator = generator(InMemoryStore::new(), 16);

    let per_thread: Vec<Vec<u64>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    (0..IDS_PER_THREAD)
                        .map(|_| generator.try_next_id(SCOPE).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for ids in &per_thread {
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
    let unique: HashSet<u64> = per_thread.iter().flatten().copied().collect();
    assert_eq!(unique.len(), THREADS * IDS_PER_THREAD);
}

#[test]
fn many_generators_sharing_a_store_never_duplicate() {
    let instances = num_cpus::get().clamp(2, 8);
    const IDS_PER_INSTANCE: usize = 1_000;

    let store = Arc::new(InMemoryStore::new());
    let generators: Vec<_> = (0..instances)
        .map(|i| generator(Arc::clone(&store), 3 + i as u64))
        .collect();

    let all: Vec<u64> = scope(|s| {
        let handles: Vec<_> = generators
            .iter()
            .map(|g| {
                s.spawn(move || {
                    (0..IDS_PER_INSTANCE)
                        .map(|_| g.try_next_id(SCOPE).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<u64> = all.iter().copied().collect();
    assert_eq!(unique.len(), instances * IDS_PER_INSTANCE);

    // Every batch ever committed is accounted for by some instance.
    let committed: u64 = generators
        .iter()
        .map(|g| g.stats().snapshot().batches_acquired * g.batch_size())
        .sum();
    assert_eq!(store.get(SCOPE), Some(committed.to_string()));
}
