#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use rayon::ThreadPool;
#[cfg(feature = "parallel")]
use std::sync::OnceLock;

/// Crate-local Rayon pool used for index passes and chunk-bucket aggregation.
///
/// Rayon's global pool panics on first use if it cannot be initialized (e.g. under tight thread
/// limits). A crate-local pool lets callers fall back to single-threaded execution instead.
#[cfg(feature = "parallel")]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(feature = "parallel")]
fn desired_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(feature = "parallel")]
fn build_pool() -> Option<ThreadPool> {
    let requested = desired_threads();
    let try_build = |n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("resale-columnar-{i}"))
            .build()
    };

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::warn!("could not start {requested} worker threads ({err}); retrying with 1");
            try_build(1).ok()
        }
        Err(err) => {
            log::warn!("worker pool unavailable ({err}); running sequentially");
            None
        }
    }
}

#[cfg(feature = "parallel")]
fn pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_pool).as_ref()
}

/// Number of worker threads parallel paths will use (1 when running sequentially).
#[cfg(feature = "parallel")]
pub fn worker_threads() -> usize {
    pool().map_or(1, ThreadPool::current_num_threads)
}

#[cfg(not(feature = "parallel"))]
pub fn worker_threads() -> usize {
    1
}

/// Run two independent closures, concurrently when a worker pool is available.
#[cfg(feature = "parallel")]
pub(crate) fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    match pool() {
        Some(pool) => pool.install(|| rayon::join(a, b)),
        None => (a(), b()),
    }
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    (a(), b())
}

/// Map every item and combine the results with an associative `reduce`.
///
/// Items are processed across the worker pool when one is available, otherwise in order.
#[cfg(feature = "parallel")]
pub(crate) fn map_reduce<I, T, M, R>(items: &[I], identity: T, map: M, reduce: R) -> T
where
    I: Sync,
    T: Copy + Send + Sync,
    M: Fn(&I) -> T + Sync + Send,
    R: Fn(T, T) -> T + Sync + Send,
{
    match pool() {
        Some(pool) => pool.install(|| items.par_iter().map(&map).reduce(|| identity, &reduce)),
        None => items.iter().map(map).fold(identity, reduce),
    }
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn map_reduce<I, T, M, R>(items: &[I], identity: T, map: M, reduce: R) -> T
where
    I: Sync,
    T: Copy + Send + Sync,
    M: Fn(&I) -> T + Sync + Send,
    R: Fn(T, T) -> T + Sync + Send,
{
    items.iter().map(map).fold(identity, reduce)
}
