// src/metrics.rs
// Lightweight process-local counters; no exporter, read via snapshot().
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub static SESSIONS_ACTIVE: Lazy<AtomicUsize> = Lazy::new(|| AtomicUsize::new(0));
pub static SESSIONS_TOTAL: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));
pub static BYTES_IN: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));
pub static BYTES_OUT: Lazy<AtomicU64> = Lazy::new(|| AtomicU64::new(0));

/// Returns (active_sessions, total_sessions, bytes_in, bytes_out).
pub fn snapshot() -> (usize, u64, u64, u64) {
    (
        SESSIONS_ACTIVE.load(Ordering::Relaxed),
        SESSIONS_TOTAL.load(Ordering::Relaxed),
        BYTES_IN.load(Ordering::Relaxed),
        BYTES_OUT.load(Ordering::Relaxed),
    )
}
