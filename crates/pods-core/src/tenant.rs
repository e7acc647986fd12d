//! Multi-tenant context switching.
//!
//! Table info is derived from per-tenant settings (the table prefix) but
//! cached per Pod handle. The host calls [`switch_context`] whenever it
//! moves to another data partition; caches compare the generation they were
//! filled under against [`generation`] and refill on mismatch.

use std::sync::atomic::{AtomicU64, Ordering};

static GENERATION: AtomicU64 = AtomicU64::new(0);

/// Current context generation.
pub fn generation() -> u64 {
    GENERATION.load(Ordering::SeqCst)
}

/// Signal that the host switched to another tenant. Returns the new
/// generation.
pub fn switch_context() -> u64 {
    let next = GENERATION.fetch_add(1, Ordering::SeqCst) + 1;
    tracing::debug!(generation = next, "tenant context switched");
    next
}
