//! Trailing-edge debounce for async work.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs only the most recently scheduled action, `delay` after it was
/// scheduled.
///
/// Scheduling a new action aborts the previous one, whether it is still
/// waiting or already running. Dropping the debouncer aborts whatever is
/// pending.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            task: Mutex::new(None),
        }
    }

    /// Schedules `action`, replacing any previously scheduled one.
    ///
    /// Must be called from within a `tokio` runtime.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous
            && !previous.is_finished()
        {
            log::debug!("Debounce: superseding pending action");
            previous.abort();
        }
    }

    /// Aborts the pending action, if any. Returns whether one was
    /// aborted.
    pub fn cancel(&self) -> bool {
        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Whether an action is waiting or running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn burst_runs_last_action_once() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(Mutex::new(Vec::new()));

        for i in 0..5 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(async move { runs.lock().unwrap().push(i) });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(runs.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*runs.lock().unwrap(), vec![4]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_each_run() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(400)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending_action() {
        let runs = Arc::new(AtomicUsize::new(0));
        {
            let debouncer = Debouncer::new(Duration::from_millis(300));
            let runs = Arc::clone(&runs);
            debouncer.schedule(async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
            assert!(debouncer.is_pending());
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
