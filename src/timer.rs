use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// A one-shot timer that runs a callback once its delay has elapsed.
/// Cancelling or dropping the handle aborts the callback if it has not run yet.
pub struct HideTimer {
    task: JoinHandle<()>,
}

impl HideTimer {
    /// Schedule `callback` to run after `delay` on the given runtime.
    /// The deadline is fixed now, not when the task is first polled.
    pub fn schedule<F>(runtime: &Handle, delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let task = runtime.spawn(async move {
            sleep_until(deadline).await;
            callback();
        });

        Self { task }
    }

    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for HideTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
