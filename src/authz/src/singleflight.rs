//! Single-flight: at most one in-flight operation per key
//!
//! Concurrent callers for the same key join the leader's flight and share its
//! result instead of issuing their own work. The leader's future runs in a
//! spawned task, so a caller disconnecting mid-request never cancels a flight
//! other waiters depend on; the flight completes or fails on its own terms.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

/// How a shared flight can fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightError<E> {
    /// The leader's work failed; every waiter sees the same error
    Work(E),
    /// The leader task vanished without publishing a result
    Aborted,
}

/// Keyed single-flight table
///
/// Keys are removed before the result is published, so callers arriving after
/// completion always start a fresh flight and never observe a value staler
/// than the flight they waited on.
pub struct SingleFlight<T, E> {
    inflight: Arc<DashMap<String, broadcast::Sender<Result<T, E>>>>,
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }

    /// Run `work` for `key`, or join the flight already running for it.
    /// Only the leader's `work` future is executed; followers' futures are
    /// dropped unpolled.
    pub async fn run<F>(&self, key: &str, work: F) -> Result<T, FlightError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        let mut rx = match self.inflight.entry(key.to_string()) {
            Entry::Occupied(entry) => entry.get().subscribe(),
            Entry::Vacant(entry) => {
                let (tx, rx) = broadcast::channel(1);
                entry.insert(tx.clone());

                let inflight = Arc::clone(&self.inflight);
                let key = key.to_string();
                tokio::spawn(async move {
                    let result = work.await;
                    // Clear the key first so late arrivals start fresh
                    inflight.remove(&key);
                    let _ = tx.send(result);
                });
                rx
            }
        };

        match rx.recv().await {
            Ok(result) => result.map_err(FlightError::Work),
            Err(_) => Err(FlightError::Aborted),
        }
    }

    /// Number of flights currently in the air
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }
}
