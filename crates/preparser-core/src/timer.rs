//! A single-shot timer armed at acceptance time when a deadline applies.
//! Disarming just aborts the underlying Tokio task, so an already-fired
//! timer can never double-fire.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

pub(crate) struct RequestTimer {
    handle: JoinHandle<()>,
}

impl RequestTimer {
    pub(crate) fn arm<F>(duration: Duration, on_fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            on_fire.await;
        });
        Self { handle }
    }

    pub(crate) fn disarm(self) {
        self.handle.abort();
    }
}
