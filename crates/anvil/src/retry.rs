//! Caller-side resubmission after a stale witness
//!
//! The transition engine never retries. A caller whose witness went stale
//! must refetch the committed root, its record and a fresh path, then
//! resubmit; this helper drives that loop.

use tracing::warn;

use crate::Result;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Call `op` until it succeeds, fails with anything other than a stale
/// witness, or `max_attempts` calls have been made.
///
/// `op` receives the 1-based attempt number and must rebuild its witness
/// and record from current state on every call.
pub fn submit_with_refresh<T, F>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt) {
            Err(e) if e.is_stale_witness() && attempt < max_attempts => {
                warn!(attempt, max_attempts, "stale witness, refreshing and resubmitting");
                attempt += 1;
            }
            result => return result,
        }
    }
}
