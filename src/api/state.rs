use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio_util::task::TaskTracker;

use crate::handlers::Dispatcher;
use crate::observability::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub metrics: Arc<Metrics>,
    /// Expected `X-Telegram-Bot-Api-Secret-Token`; `None` disables the check
    pub webhook_secret: Option<Arc<str>>,
    pub max_body_bytes: usize,
    ready: Arc<AtomicBool>,
    /// Dispatches still running after their webhook call returned
    tasks: TaskTracker,
}

impl AppState {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        webhook_secret: Option<String>,
        max_body_bytes: usize,
    ) -> Self {
        let metrics = dispatcher.pipeline().metrics().clone();
        Self {
            dispatcher,
            metrics,
            webhook_secret: webhook_secret.map(Arc::from),
            max_body_bytes,
            ready: Arc::new(AtomicBool::new(false)),
            tasks: TaskTracker::new(),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Runs `task` in the background, tracked until [`AppState::drain`]
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task);
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Waits up to `timeout` for tracked tasks after the server has stopped.
    /// Returns `false` if some were still running when the time ran out.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.ready.store(false, Ordering::Release);
        self.tasks.close();
        tokio::time::timeout(timeout, self.tasks.wait()).await.is_ok()
    }
}
