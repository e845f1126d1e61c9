//! Cancellation token for loop shutdown.
//!
//! The signal handler owns one clone, the control loop another. Triggering is
//! idempotent and wakes the loop out of its inter-tick sleep, so termination
//! latency is bounded by a single tick interval.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

/// Clonable shutdown token.
#[derive(Clone)]
pub struct ShutdownToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Request shutdown. Repeated deliveries have the same effect as one.
    pub fn trigger(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap() = true;
        condvar.notify_all();
    }

    pub fn is_triggered(&self) -> bool {
        *self.inner.0.lock().unwrap()
    }

    /// Sleep for up to `timeout`, waking early on [`trigger`](Self::trigger).
    ///
    /// Returns `true` when shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let mut triggered = flag.lock().unwrap();
        let deadline = std::time::Instant::now() + timeout;
        while !*triggered {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            let (guard, result) = condvar.wait_timeout(triggered, remaining).unwrap();
            triggered = guard;
            if result.timed_out() {
                break;
            }
        }
        *triggered
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_starts_untriggered() {
        let token = ShutdownToken::new();
        assert!(!token.is_triggered());
        assert!(!token.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let token = ShutdownToken::new();
        token.trigger();
        token.trigger();
        assert!(token.is_triggered());
        assert!(token.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_trigger_wakes_waiter_early() {
        let token = ShutdownToken::new();
        let waker = token.clone();
        let start = Instant::now();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waker.trigger();
        });

        assert!(token.wait_timeout(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
