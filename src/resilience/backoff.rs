//! Exponential backoff with jitter for command retries.

use rand::Rng;
use std::time::Duration;

use crate::config::QueueConfig;

/// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`, capped, plus up to 10% jitter.
pub fn backoff_delay(attempt: u32, config: &QueueConfig) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }
    let factor = 1u64.checked_shl(attempt - 1).unwrap_or(u64::MAX);
    let capped = config.base_delay_ms.saturating_mul(factor).min(config.max_delay_ms);
    Duration::from_millis(capped + jitter(capped))
}

fn jitter(delay_ms: u64) -> u64 {
    match delay_ms / 10 {
        0 => 0,
        range => rand::thread_rng().gen_range(0..range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> QueueConfig {
        QueueConfig {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        }
    }

    #[test]
    fn test_grows_then_caps() {
        let c = config();
        let first = backoff_delay(1, &c).as_millis();
        let second = backoff_delay(2, &c).as_millis();
        let capped = backoff_delay(40, &c).as_millis();

        assert!((100..110).contains(&first));
        assert!((200..220).contains(&second));
        assert!((1_000..1_100).contains(&capped));
    }

    #[test]
    fn test_attempt_zero_is_immediate() {
        assert_eq!(backoff_delay(0, &config()), Duration::ZERO);
    }
}
