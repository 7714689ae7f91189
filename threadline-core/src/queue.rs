// ABOUTME: Per-thread FIFO of pending work so events in one thread run in arrival order.
// ABOUTME: A thread's drain task runs its jobs one by one and exits once the queue is empty.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

pub type ThreadKey = (String, String);

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A key is present exactly while a drain task owns it
#[derive(Clone, Default)]
pub struct ThreadQueues {
    pending: Arc<Mutex<HashMap<ThreadKey, VecDeque<Job>>>>,
}

impl std::fmt::Debug for ThreadQueues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadQueues")
            .field("active", &self.len())
            .finish()
    }
}

impl ThreadQueues {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ThreadKey, VecDeque<Job>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue `job` behind earlier work for the same thread.
    ///
    /// The slot is taken before this returns, so call order is run order
    /// regardless of how the runtime schedules the tasks.
    pub fn enqueue<F>(&self, key: ThreadKey, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let job: Job = Box::pin(job);
        let mut pending = self.lock();
        if let Some(queue) = pending.get_mut(&key) {
            queue.push_back(job);
            return;
        }
        pending.insert(key.clone(), VecDeque::new());
        drop(pending);

        tokio::spawn(self.clone().drain(key, job));
    }

    async fn drain(self, key: ThreadKey, first: Job) {
        let mut next = Some(first);
        while let Some(job) = next.take() {
            // Own task per job so a panic cannot strand the rest of the queue
            if let Err(e) = tokio::spawn(job).await {
                tracing::error!(channel = %key.0, thread_ts = %key.1, error = %e, "Queued job failed");
            }

            let mut pending = self.lock();
            next = pending.get_mut(&key).and_then(VecDeque::pop_front);
            if next.is_none() {
                pending.remove(&key);
            }
        }
    }

    /// Threads with work running or waiting
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
