use std::sync::atomic::{AtomicU64, Ordering};

static STATE: AtomicU64 = AtomicU64::new(0);

/// Issues the next process-wide state.
///
/// States are unique and strictly increasing in issue order, so comparing
/// two of them tells which change happened later.
pub fn next_state() -> u64 {
	STATE.fetch_add(1, Ordering::AcqRel) + 1
}
