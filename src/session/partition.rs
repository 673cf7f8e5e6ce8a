//! Partition token generation
//!
//! A partition scopes one profile's cookies, cache and login state, so a
//! collision would merge two users. Tokens combine wall-clock millis with
//! uuid randomness and are re-drawn until unique.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::constants::session::{MAX_PARTITION_ATTEMPTS, PARTITION_PREFIX};

/// Candidate token from the current time and fresh randomness
pub fn random_candidate() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let random = Uuid::new_v4().simple().to_string();
    format!("{PARTITION_PREFIX}{millis}_{}", &random[..8])
}

/// Draw candidates until one is not in `existing`.
///
/// After `MAX_PARTITION_ATTEMPTS` collisions the last candidate gets a numeric
/// suffix, so this always terminates with a unique token.
pub fn unique_partition<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    mut candidate: impl FnMut() -> String,
) -> String {
    let taken: HashSet<&str> = existing.into_iter().collect();

    let mut last = String::new();
    for attempt in 1..=MAX_PARTITION_ATTEMPTS {
        last = candidate();
        if !taken.contains(last.as_str()) {
            debug!(partition = %last, attempt, "Generated partition");
            return last;
        }
        debug!(partition = %last, attempt, "Partition collision, retrying");
    }

    warn!(attempts = MAX_PARTITION_ATTEMPTS, "Partition generation kept colliding, appending counter");
    let mut n = 1usize;
    loop {
        let token = format!("{last}_{n}");
        if !taken.contains(token.as_str()) {
            return token;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_candidate_format() {
        let token = random_candidate();
        assert!(token.starts_with(PARTITION_PREFIX));
        let suffix = token.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn test_collision_is_retried() {
        let existing = ["persist:user_1_aaaaaaaa"];
        let mut draws = vec!["persist:user_1_bbbbbbbb", "persist:user_1_aaaaaaaa"];
        let token = unique_partition(existing, || draws.pop().unwrap().to_string());
        assert_eq!(token, "persist:user_1_bbbbbbbb");
    }

    #[test]
    fn test_exhausted_retries_append_counter() {
        let existing = ["persist:x", "persist:x_1"];
        let token = unique_partition(existing, || "persist:x".to_string());
        assert_eq!(token, "persist:x_2");
    }
}
