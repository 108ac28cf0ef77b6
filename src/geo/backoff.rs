use crate::types::FailureMeta;

const DAY: i64 = 24 * 3600;

/// Wait before the next attempt, by consecutive failure count. The last entry
/// applies to every higher count.
const RETRY_SCHEDULE: [(u32, i64); 4] = [(1, DAY), (2, 3 * DAY), (3, 7 * DAY), (4, 14 * DAY)];

/// Failures at or above this count are considered permanent until they age out
pub const PERMANENT_FAIL_COUNT: u32 = 4;

/// Permanent failures older than this are evicted by cleanup
pub const EVICTION_AGE_SECS: i64 = 30 * DAY;

pub fn retry_interval_secs(fail_count: u32) -> i64 {
    RETRY_SCHEDULE
        .iter()
        .rev()
        .find(|(min_count, _)| fail_count >= *min_count)
        .map(|(_, interval)| *interval)
        .unwrap_or(RETRY_SCHEDULE[0].1)
}

/// True once enough time has passed since the last failed attempt
pub fn is_retry_due(meta: &FailureMeta, now: i64) -> bool {
    now - meta.last_attempt >= retry_interval_secs(meta.fail_count)
}

/// Failed repeatedly and not retried for a month
pub fn is_evictable(meta: &FailureMeta, now: i64) -> bool {
    meta.fail_count >= PERMANENT_FAIL_COUNT && meta.last_attempt < now - EVICTION_AGE_SECS
}
