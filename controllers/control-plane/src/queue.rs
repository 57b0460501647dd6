//! Deduplicating work queue.
//!
//! Watch events enqueue object keys; workers dequeue them and reconcile.
//! A key is held by at most one worker at a time: adding a key that is being
//! processed only marks it dirty, and `done` puts it back in the queue so the
//! changes that arrived meanwhile get their own pass.

use crate::backoff::FibonacciBackoff;
use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

#[derive(Debug)]
struct QueueState<T> {
    queue: VecDeque<T>,
    /// Keys waiting for a pass (queued, or added again while processing)
    dirty: HashSet<T>,
    /// Keys handed to a worker and not yet marked done
    processing: HashSet<T>,
    /// Per-key retry backoff
    backoffs: HashMap<T, FibonacciBackoff>,
    shutting_down: bool,
}

/// Work queue with per-key exclusivity and rate-limited retries.
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: &'static str,
    state: Mutex<QueueState<T>>,
    notify: Notify,
    backoff_min: Duration,
    backoff_max: Duration,
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Send + std::fmt::Debug + 'static,
{
    pub fn new(name: &'static str, backoff_min: Duration, backoff_max: Duration) -> Self {
        Self {
            name,
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                backoffs: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            backoff_min,
            backoff_max,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue `item` unless it is already waiting.
    pub fn add(&self, item: T) {
        {
            let mut state = self.lock();
            if state.shutting_down || !state.dirty.insert(item.clone()) {
                return;
            }
            if state.processing.contains(&item) {
                trace!("{} queue: {:?} is in flight, deferring", self.name, item);
                return;
            }
            state.queue.push_back(item);
        }
        self.notify.notify_one();
    }

    /// Wait for the next key. `None` once the queue is shut down.
    pub async fn get(&self) -> Option<T> {
        loop {
            // Register interest before checking so a concurrent add or
            // shutdown between the check and the await is not missed.
            let notified = self.notify.notified();
            {
                let mut state = self.lock();
                if state.shutting_down {
                    return None;
                }
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
            }
            notified.await;
        }
    }

    /// Release `item` after a pass; requeue it if it was added meanwhile.
    pub fn done(&self, item: &T) {
        let requeued = {
            let mut state = self.lock();
            state.processing.remove(item);
            if state.dirty.contains(item) && !state.shutting_down {
                state.queue.push_back(item.clone());
                true
            } else {
                false
            }
        };
        if requeued {
            self.notify.notify_one();
        }
    }

    /// Enqueue `item` after `delay`.
    pub fn add_after(self: &Arc<Self>, item: T, delay: Duration) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(item);
        });
    }

    /// Enqueue `item` after its next backoff delay and return that delay.
    pub fn add_rate_limited(self: &Arc<Self>, item: T) -> Duration {
        let delay = {
            let mut state = self.lock();
            let (min, max) = (self.backoff_min, self.backoff_max);
            state
                .backoffs
                .entry(item.clone())
                .or_insert_with(|| FibonacciBackoff::new(min, max))
                .next_backoff()
        };
        self.add_after(item, delay);
        delay
    }

    /// Reset the retry backoff of `item`.
    pub fn forget(&self, item: &T) {
        self.lock().backoffs.remove(item);
    }

    /// Keys waiting to be handed out.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop handing out keys and wake every waiting worker.
    pub fn shutdown(&self) {
        self.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
