use std::time::Duration;

use crate::errors::{CustomResult, SchedulerError};

/// Backoff ladder for re-charging a recurring payment after a transient
/// provider failure. Attempt numbers are 1-based.
pub fn retry_delay(attempt: u8) -> Duration {
    match attempt {
        0 | 1 => Duration::from_secs(5 * 60),
        2 => Duration::from_secs(60 * 60),
        3 => Duration::from_secs(12 * 60 * 60),
        _ => Duration::from_secs(24 * 60 * 60),
    }
}

/// Enqueues a delayed re-run of the charge for a host payment. Production
/// implementations back this with the host's job queue; the delay is a
/// minimum, not an exact firing time.
#[async_trait::async_trait]
pub trait RetryScheduler: Send + Sync {
    async fn schedule_start_retry(
        &self,
        payment_id: u64,
        attempt: u8,
        delay: Duration,
    ) -> CustomResult<(), SchedulerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_escalates_and_caps_at_one_day() {
        assert_eq!(retry_delay(1), Duration::from_secs(300));
        assert_eq!(retry_delay(2), Duration::from_secs(3600));
        assert_eq!(retry_delay(3), Duration::from_secs(43200));
        assert_eq!(retry_delay(4), Duration::from_secs(86400));
        assert_eq!(retry_delay(9), Duration::from_secs(86400));
    }
}
