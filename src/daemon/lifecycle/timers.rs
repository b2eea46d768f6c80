use std::time::Duration;

use futures::StreamExt;
use tokio_util::time::{delay_queue, DelayQueue};

use crate::app_api::Pid;

pub type TimerKey = delay_queue::Key;

/// Longest delay that is armed as is. `DelayQueue` rejects delays of about two years and more.
pub const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Single-shot cancellable delays keyed by process id.
///
/// A key stays valid until its timer is either cancelled or returned by [Self::next_expired].
/// Callers must forget a key in both cases, keys of finished timers get reused.
pub struct DelayTimers {
    queue: DelayQueue<Pid>,
}

impl DelayTimers {
    pub fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
        }
    }

    /// Delays above [MAX_DELAY] are shortened to it.
    pub fn arm(&mut self, pid: Pid, delay: Duration) -> TimerKey {
        self.queue.insert(pid, delay.min(MAX_DELAY))
    }

    /// Cancels a pending timer. Returns false when there was nothing to cancel.
    pub fn cancel(&mut self, key: &TimerKey) -> bool {
        self.queue.try_remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Waits for the next timer to expire. Never completes while no timer is pending.
    pub async fn next_expired(&mut self) -> (Pid, TimerKey) {
        if self.queue.is_empty() {
            return std::future::pending().await;
        }
        match self.queue.next().await {
            Some(expired) => {
                let key = expired.key();
                (expired.into_inner(), key)
            }
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::{DelayTimers, MAX_DELAY};

    #[tokio::test(start_paused = true)]
    async fn armed_timer_expires() {
        let mut timers = DelayTimers::new();
        let key = timers.arm(7, Duration::from_secs(30));

        let (pid, expired) = timers.next_expired().await;
        assert_eq!(pid, 7);
        assert_eq!(expired, key);
        assert!(timers.is_empty());
        assert!(!timers.cancel(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_expires() {
        let mut timers = DelayTimers::new();
        let key = timers.arm(7, Duration::from_secs(30));
        assert!(timers.cancel(&key));
        assert!(!timers.cancel(&key));

        assert!(timeout(Duration::from_secs(60), timers.next_expired())
            .await
            .is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn earliest_timer_expires_first() {
        let mut timers = DelayTimers::new();
        timers.arm(1, Duration::from_secs(60));
        timers.arm(2, Duration::from_secs(30));
        assert_eq!(timers.len(), 2);

        assert_eq!(timers.next_expired().await.0, 2);
        assert_eq!(timers.next_expired().await.0, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn long_delays_are_capped() {
        let mut timers = DelayTimers::new();
        let start = tokio::time::Instant::now();
        timers.arm(7, Duration::MAX);

        assert_eq!(timers.next_expired().await.0, 7);
        let elapsed = start.elapsed();
        assert!(elapsed >= MAX_DELAY && elapsed < MAX_DELAY + Duration::from_secs(1));
    }
}
