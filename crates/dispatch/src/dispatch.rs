//! Rate-limited dispatch queue: the engine's single admission point.

use crate::clock::Clock;
use crate::queue::{QueuedSignal, SignalQueue};
use crate::rate_limiter::RateLimiter;
use copytrade_domain::{Priority, RejectReason, TradeSignal};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

struct Inner {
    limiter: RateLimiter,
    queue: SignalQueue,
}

/// Gates normal entries by provider rate limits while letting
/// risk-reducing signals bypass them.
///
/// Entries are discretionary and rate-governed; exits are obligatory and
/// must never be throttled by the admission policy of the venue that
/// originated them. Many producers push concurrently; one consumer pops.
/// Critical sections are short and producers are never blocked
/// indefinitely; a refused push is the only backpressure signal.
pub struct RateLimitedSignalQueue {
    inner: Mutex<Inner>,
    /// Wakes the consumer when work arrives.
    available: Notify,
}

impl RateLimitedSignalQueue {
    /// Creates the admission point.
    ///
    /// `rate_limit` admissions per `window` are allowed per provider key;
    /// the queue holds at most `max_size` pending signals.
    pub fn new(
        rate_limit: usize,
        window: Duration,
        max_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                limiter: RateLimiter::new(rate_limit, window, clock),
                queue: SignalQueue::new(max_size),
            }),
            available: Notify::new(),
        }
    }

    /// Admits a signal against `provider_key`'s quota, then enqueues it at
    /// its default priority. A denied push is not buffered; the caller
    /// retries or drops at its own discretion. A saturated rate limit and
    /// a full queue are independent rejection causes.
    pub fn push(&self, signal: TradeSignal, provider_key: &str) -> Result<(), RejectReason> {
        let priority = signal.default_priority();
        let mut inner = self.inner.lock().expect("dispatch mutex poisoned");

        if !inner.limiter.can_proceed(provider_key) {
            debug!(provider_key, "push refused: rate limited");
            return Err(RejectReason::RateLimited);
        }
        if !inner.queue.push(signal, priority) {
            debug!(provider_key, "push refused: queue full");
            return Err(RejectReason::QueueFull);
        }
        drop(inner);

        self.available.notify_one();
        Ok(())
    }

    /// Inserts directly, skipping the rate limiter. Reserved for
    /// risk-reducing signals: closing a position is never blocked by the
    /// admission policy. A full queue still rejects.
    pub fn push_bypass(&self, signal: TradeSignal, priority: Priority) -> Result<(), RejectReason> {
        let mut inner = self.inner.lock().expect("dispatch mutex poisoned");
        if !inner.queue.push(signal, priority) {
            debug!("bypass push refused: queue full");
            return Err(RejectReason::QueueFull);
        }
        drop(inner);

        self.available.notify_one();
        Ok(())
    }

    /// Removes and returns the head, or `None` when empty. Never blocks.
    pub fn pop(&self) -> Option<QueuedSignal> {
        self.inner.lock().expect("dispatch mutex poisoned").queue.pop()
    }

    /// Waits cooperatively until a signal is available, then pops it.
    /// Only the consumer calls this; it blocks solely while the queue is
    /// empty, never while processing.
    pub async fn pop_wait(&self) -> QueuedSignal {
        loop {
            // Register for notification before the empty-check so a push
            // between the check and the await cannot be missed.
            let notified = self.available.notified();
            if let Some(entry) = self.pop() {
                return entry;
            }
            notified.await;
        }
    }

    /// Backoff hint for producers: time until `provider_key`'s oldest
    /// admission leaves the window. Zero unless saturated.
    pub fn wait_time(&self, provider_key: &str) -> Duration {
        self.inner
            .lock()
            .expect("dispatch mutex poisoned")
            .limiter
            .get_wait_time(provider_key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("dispatch mutex poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use copytrade_domain::{ExitSignal, TokenAmount};

    fn entry_signal() -> TradeSignal {
        TradeSignal::entry("wallet", "mint", "rpc", TokenAmount::from(100u64))
    }

    fn exit_signal() -> TradeSignal {
        TradeSignal::exit("wallet", "mint", "rpc", ExitSignal::market_close())
    }

    fn dispatch_queue(rate_limit: usize, max_size: usize) -> (RateLimitedSignalQueue, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let queue = RateLimitedSignalQueue::new(
            rate_limit,
            Duration::from_secs(1),
            max_size,
            clock.clone(),
        );
        (queue, clock)
    }

    #[test]
    fn test_rate_limit_refuses_with_room_left() {
        let (queue, _clock) = dispatch_queue(2, 16);

        assert!(queue.push(entry_signal(), "rpc").is_ok());
        assert!(queue.push(entry_signal(), "rpc").is_ok());
        // Queue has room; the provider quota is what refuses.
        assert_eq!(
            queue.push(entry_signal(), "rpc"),
            Err(RejectReason::RateLimited)
        );
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_queue_full_is_independent_cause() {
        let (queue, _clock) = dispatch_queue(10, 1);

        assert!(queue.push(entry_signal(), "rpc").is_ok());
        assert_eq!(queue.push(entry_signal(), "rpc"), Err(RejectReason::QueueFull));
    }

    #[test]
    fn test_bypass_skips_rate_limit_and_pops_first() {
        let (queue, _clock) = dispatch_queue(2, 16);

        assert!(queue.push(entry_signal(), "rpc").is_ok());
        assert!(queue.push(entry_signal(), "rpc").is_ok());
        assert_eq!(
            queue.push(entry_signal(), "rpc"),
            Err(RejectReason::RateLimited)
        );

        // The exit is admitted despite the saturated quota...
        assert!(queue.push_bypass(exit_signal(), Priority::EXIT).is_ok());

        // ...and is served before every queued entry.
        let head = queue.pop().unwrap();
        assert_eq!(head.priority, Priority::EXIT);
    }

    #[test]
    fn test_window_elapse_restores_admission() {
        let (queue, clock) = dispatch_queue(1, 16);

        assert!(queue.push(entry_signal(), "rpc").is_ok());
        assert_eq!(
            queue.push(entry_signal(), "rpc"),
            Err(RejectReason::RateLimited)
        );
        assert!(queue.wait_time("rpc") > Duration::ZERO);

        clock.advance(Duration::from_secs(1));
        assert_eq!(queue.wait_time("rpc"), Duration::ZERO);
        assert!(queue.push(entry_signal(), "rpc").is_ok());
    }

    #[tokio::test]
    async fn test_pop_wait_wakes_on_push() {
        let (queue, _clock) = dispatch_queue(4, 16);
        let queue = Arc::new(queue);

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop_wait().await })
        };

        // Give the consumer a chance to park on the notify.
        tokio::task::yield_now().await;
        queue.push_bypass(exit_signal(), Priority::EXIT).unwrap();

        let popped = consumer.await.unwrap();
        assert_eq!(popped.priority, Priority::EXIT);
    }

    #[tokio::test]
    async fn test_concurrent_producers_never_lose_signals() {
        let (queue, _clock) = dispatch_queue(100, 256);
        let queue = Arc::new(queue);

        let mut handles = Vec::new();
        for i in 0..8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                let mut admitted = 0;
                for _ in 0..10 {
                    let key = format!("provider-{i}");
                    if queue.push(entry_signal(), &key).is_ok() {
                        admitted += 1;
                    }
                }
                admitted
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(queue.len(), total);
    }
}
