//! Host stack growth for the recursive parser and evaluator.

/// Remaining stack below which a new segment is allocated.
const RED_ZONE: usize = 128 * 1024;
/// Size of each heap-allocated stack segment.
const SEGMENT_SIZE: usize = 2 * 1024 * 1024;

/// Runs `f`, first switching to a fresh stack segment when the current one is
/// nearly exhausted.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}
