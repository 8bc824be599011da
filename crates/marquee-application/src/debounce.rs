// SPDX-License-Identifier: GPL-3.0-or-later
use std::future::Future;
use std::time::Duration;

use marquee_config::AcquisitionConfig;
use tokio::task::JoinHandle;
use tracing::trace;

/// Delays an action until input settles. A new call cancels the pending one.
///
/// Pending work is aborted when the debouncer is dropped.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn for_search(config: &AcquisitionConfig) -> Self {
        Self::new(config.search_debounce())
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `action` after the delay, replacing anything still pending.
    pub fn call<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.call_async(async move { action() });
    }

    pub fn call_async<Fut>(&mut self, action: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            if !pending.is_finished() {
                trace!(target: "debounce", "cancelling pending action");
            }
            pending.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
