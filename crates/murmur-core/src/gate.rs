//! Session completion signal shared between the device callback and the
//! supervising thread.

use crate::error::{MurmurError, MurmurResult};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// One-way "everything generated has been played" flag.
///
/// Opened by the device callback with a single atomic store followed by a
/// wake-up; it never takes the wait lock, so the callback cannot block on
/// a waiter. Waiters re-check the flag every poll interval, which bounds the
/// cost of a wake-up that races their check.
#[derive(Debug, Default)]
pub struct CompletionGate {
    complete: AtomicBool,
    wait_lock: Mutex<()>,
    signal: Condvar,
}

impl CompletionGate {
    /// Create a closed gate
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session has completed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Open the gate. Returns `true` only for the call that opened it.
    pub fn open(&self) -> bool {
        let opened = !self.complete.swap(true, Ordering::AcqRel);
        if opened {
            self.signal.notify_all();
        }
        opened
    }

    /// Block until the gate opens or `timeout` elapses.
    ///
    /// Returns `true` if the gate is open.
    pub fn wait(&self, poll_interval: Duration, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut guard = self.wait_lock.lock();

        loop {
            if self.is_complete() {
                return true;
            }

            let slice = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return self.is_complete();
                    }
                    poll_interval.min(deadline - now)
                }
                None => poll_interval,
            };

            self.signal.wait_for(&mut guard, slice);
        }
    }

    /// Poll the gate from an async context until it opens.
    ///
    /// # Errors
    ///
    /// Returns [`MurmurError::TimeoutError`] if `timeout` elapses first.
    pub async fn wait_async(
        &self,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> MurmurResult<()> {
        let poll = async {
            while !self.is_complete() {
                tokio::time::sleep(poll_interval).await;
            }
        };

        match timeout {
            Some(limit) => tokio::time::timeout(limit, poll)
                .await
                .map_err(MurmurError::from),
            None => {
                poll.await;
                Ok(())
            }
        }
    }
}
