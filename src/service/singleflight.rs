//! Single-flight deduplication.
//!
//! At most one concurrent producer runs per key; late arrivals subscribe
//! to the leader's broadcast and receive the same shared outcome. The
//! leader's work is spawned detached, so a caller that hits its deadline
//! and walks away does not cancel the computation other followers (or the
//! cache) are waiting on.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tracing::debug;

/// Keyed single-flight group.
pub struct SingleFlight<T: Clone + Send + 'static> {
    inflight: Arc<Mutex<HashMap<String, broadcast::Sender<T>>>>,
}

impl<T: Clone + Send + 'static> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join a flight already in progress.
    ///
    /// Returns `None` only if the leader task died without reporting
    /// (a panic inside `work`).
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let mut rx = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(tx) = inflight.get(key) {
                debug!(key, "joining in-flight fetch");
                tx.subscribe()
            } else {
                let (tx, rx) = broadcast::channel(1);
                inflight.insert(key.to_string(), tx);
                let map = Arc::clone(&self.inflight);
                let key = key.to_string();
                let fut = work();
                tokio::spawn(async move {
                    let result = fut.await;
                    // Remove the entry before sending: anyone who found it
                    // has already subscribed, anyone later starts fresh.
                    let tx = {
                        let mut inflight = map.lock().unwrap_or_else(|e| e.into_inner());
                        inflight.remove(&key)
                    };
                    if let Some(tx) = tx {
                        let _ = tx.send(result);
                    }
                });
                rx
            }
        };

        rx.recv().await.ok()
    }

    /// Number of flights currently in progress.
    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl<T: Clone + Send + 'static> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
