use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Liveness flag for one session. Every deferred continuation reads it before mutating anything.
#[derive(Debug, Clone)]
pub struct ActiveFlag(Arc<AtomicBool>);

impl ActiveFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn deactivate(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for ActiveFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Owned collection of pending tasks that can be cancelled together.
#[derive(Debug, Default)]
pub struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.prune();
        self.handles.push(tokio::spawn(task));
    }

    /// Drops handles of tasks that already finished.
    pub fn prune(&mut self) {
        self.handles.retain(|handle| !handle.is_finished());
    }

    /// Aborts every tracked task and returns how many were still pending.
    pub fn clear_all(&mut self) -> usize {
        let mut pending = 0;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                pending += 1;
            }
            handle.abort();
        }
        pending
    }

    /// Tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.handles
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.clear_all();
    }
}
