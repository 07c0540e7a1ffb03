//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Calculate exponential backoff delay with jitter.
///
/// `attempt` is the 1-based number of the retry about to be made. With the
/// stream proxy defaults (250 ms base, 1 s cap) the schedule is
/// 250 ms, 500 ms, 1 s, each plus up to 10% jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let Some(doublings) = attempt.checked_sub(1) else {
        return Duration::ZERO;
    };

    let delay = base_ms
        .checked_shl(doublings)
        .filter(|d| d >> doublings == base_ms)
        .map_or(max_ms, |d| d.min(max_ms));

    // 0 to 10% of the delay.
    let jitter = match delay / 10 {
        0 => 0,
        spread => rand::thread_rng().gen_range(0..spread),
    };

    Duration::from_millis(delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        let b1 = calculate_backoff(1, 250, 1000);
        assert!(b1.as_millis() >= 250 && b1.as_millis() < 275);

        let b2 = calculate_backoff(2, 250, 1000);
        assert!(b2.as_millis() >= 500 && b2.as_millis() < 550);

        let b3 = calculate_backoff(3, 250, 1000);
        assert!(b3.as_millis() >= 1000 && b3.as_millis() < 1100);

        let capped = calculate_backoff(10, 250, 1000);
        assert!(capped.as_millis() < 1100);
    }

    #[test]
    fn zero_attempt_has_no_delay() {
        assert_eq!(calculate_backoff(0, 250, 1000), Duration::ZERO);
    }
}
