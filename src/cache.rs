//! In-memory caching for frequently accessed data.
//! Uses moka for TTL-based caching with LRU eviction.

use moka::sync::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

/// Cache of local user ids keyed by identity provider subject.
/// Every authenticated request resolves the bearer subject to a user row;
/// this keeps the hot path off the database. 60 second TTL.
static USER_ID_BY_SUB: Lazy<Cache<String, i32>> = Lazy::new(|| {
    Cache::builder()
        .time_to_live(Duration::from_secs(60))
        .max_capacity(50_000)
        .build()
});

/// Look up a cached user id for an identity subject.
pub fn get_user_id_for_sub(sub: &str) -> Option<i32> {
    USER_ID_BY_SUB.get(sub)
}

/// Record the user id for an identity subject.
pub fn cache_user_id_for_sub(sub: &str, user_id: i32) {
    USER_ID_BY_SUB.insert(sub.to_owned(), user_id);
}

/// Invalidate the mapping. Call when a user row is deleted or re-keyed.
pub fn invalidate_user_id_for_sub(sub: &str) {
    USER_ID_BY_SUB.invalidate(sub);
}
