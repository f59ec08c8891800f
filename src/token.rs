//! Public identifier issuance.
//!
//! Row ids stay internal; URLs carry opaque tokens. The source is an
//! injected dependency so tests can substitute a deterministic sequence.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Issues collision-resistant public identifiers for notes and circles.
pub trait TokenSource: Send + Sync {
    fn issue(&self) -> String;
}

/// Production source backed by UUIDv4.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokenSource;

impl TokenSource for UuidTokenSource {
    fn issue(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic source yielding `{prefix}-1`, `{prefix}-2`, ...
/// Used by tests and local tooling; never in production.
#[derive(Debug)]
pub struct SequentialTokenSource {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialTokenSource {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            counter: AtomicU64::new(0),
        }
    }
}

impl TokenSource for SequentialTokenSource {
    fn issue(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_tokens_are_unique_and_url_safe() {
        let source = UuidTokenSource;
        let a = source.issue();
        let b = source.issue();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn sequential_tokens_count_up() {
        let source = SequentialTokenSource::new("note");
        assert_eq!(source.issue(), "note-1");
        assert_eq!(source.issue(), "note-2");
        assert_eq!(source.issue(), "note-3");
    }
}
