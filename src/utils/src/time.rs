// SPDX-License-Identifier: Apache-2.0

//! Monotonic-time helpers used for session/task idle tracking.

use std::time::Instant;

/// Wall-clock-independent timestamp used for idle-timeout and replay-window bookkeeping.
///
/// `Instant` rather than `SystemTime` deliberately: session/task timeouts must never jump
/// backwards or forwards because of NTP adjustments.
pub type Clock = Instant;

/// Returns the current monotonic instant.
pub fn now() -> Clock {
    Instant::now()
}

/// Returns true if `since` is at least `secs` seconds in the past.
pub fn idle_for_at_least(since: Clock, secs: u64) -> bool {
    now().duration_since(since).as_secs() >= secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn idle_detection() {
        let t0 = now();
        assert!(!idle_for_at_least(t0, 60));
        let past = t0.checked_sub(Duration::from_secs(61)).unwrap();
        assert!(idle_for_at_least(past, 60));
    }
}
