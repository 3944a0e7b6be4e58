//! Bounded concurrent mapper
//!
//! Applies a [`FetchClient`] to every key with at most `width` fetches in
//! flight. Workers pull keys from a shared queue and send outcomes through a
//! channel to a single collector, which owns the result set and drives the
//! progress observer.

use crate::fetch::client::{FetchClient, FetchOutcome};
use crate::fetch::progress::{ProgressEvent, ProgressObserver};
use crate::keys::{normalize_keys, Key};
use crate::HarvestError;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// Default worker-pool width
pub const DEFAULT_WIDTH: usize = 10;

/// Every outcome of one mapper run
///
/// Arrival order follows completion order; use [`ResultSet::into_sorted`]
/// for a deterministic order.
#[derive(Debug, Clone)]
pub struct ResultSet<R> {
    outcomes: Vec<FetchOutcome<R>>,
}

impl<R> ResultSet<R> {
    pub fn new() -> Self {
        Self {
            outcomes: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, outcome: FetchOutcome<R>) {
        self.outcomes.push(outcome);
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    pub fn success_count(&self) -> usize {
        self.len() - self.failure_count()
    }

    pub fn get(&self, key: &str) -> Option<&FetchOutcome<R>> {
        self.outcomes.iter().find(|o| o.key().as_str() == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FetchOutcome<R>> {
        self.outcomes.iter()
    }

    /// Consumes the set, returning outcomes sorted by key
    pub fn into_sorted(mut self) -> Vec<FetchOutcome<R>> {
        self.outcomes.sort_by(|a, b| a.key().cmp(b.key()));
        self.outcomes
    }

    pub fn into_vec(self) -> Vec<FetchOutcome<R>> {
        self.outcomes
    }
}

impl<R> Default for ResultSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> IntoIterator for ResultSet<R> {
    type Item = FetchOutcome<R>;
    type IntoIter = std::vec::IntoIter<FetchOutcome<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a ResultSet<R> {
    type Item = &'a FetchOutcome<R>;
    type IntoIter = std::slice::Iter<'a, FetchOutcome<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

/// Runs a fetch client across many keys with bounded parallelism
///
/// # Guarantees
///
/// - At most `width` fetches are in flight at any time
/// - Every unique input key gets exactly one outcome
/// - A failed key never stops other keys from being fetched
/// - There is no batch deadline; the run ends when every key has an outcome
#[derive(Debug, Clone, Copy)]
pub struct BoundedMapper {
    width: usize,
}

impl Default for BoundedMapper {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

impl BoundedMapper {
    /// Creates a mapper; a width of zero is raised to one
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Fetches every key and collects the outcomes
    ///
    /// Keys are normalized first (trimmed, deduplicated, sorted), so the
    /// result set holds one outcome per unique key. An empty key list returns
    /// an empty result set without dispatching anything.
    ///
    /// # Arguments
    ///
    /// * `client` - The fetch client shared by all workers
    /// * `keys` - Keys to fetch
    /// * `observer` - Receives one event per completed key
    pub async fn run<C: FetchClient>(
        &self,
        client: Arc<C>,
        keys: Vec<Key>,
        observer: &mut dyn ProgressObserver,
    ) -> ResultSet<C::Record> {
        let keys = normalize_keys(&keys);
        let total = keys.len();
        let mut results = ResultSet::with_capacity(total);

        if total == 0 {
            tracing::debug!("No keys to fetch");
            return results;
        }

        let start_time = Instant::now();
        let mut pending: BTreeSet<Key> = keys.iter().cloned().collect();
        let queue = Arc::new(Mutex::new(VecDeque::from(keys)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        observer.on_start(total);

        let worker_count = self.width.min(total);
        tracing::debug!("Spawning {} workers for {} keys", worker_count, total);

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            workers.spawn(run_worker(
                worker_id,
                Arc::clone(&client),
                Arc::clone(&queue),
                tx.clone(),
            ));
        }
        drop(tx);

        let mut failures = 0;
        while let Some(outcome) = rx.recv().await {
            if !pending.remove(outcome.key()) {
                tracing::warn!("Ignoring duplicate outcome for {}", outcome.key());
                continue;
            }

            if outcome.is_failure() {
                failures += 1;
            }

            observer.on_progress(&ProgressEvent {
                completed: results.len() + 1,
                total,
                failures,
                key: outcome.key(),
                error: outcome.error(),
            });
            results.push(outcome);
        }

        // The channel closes once every worker has exited, cleanly or not.
        let mut worker_error = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
                worker_error.get_or_insert_with(|| e.to_string());
            }
        }

        // Keys a failed worker took but never reported, plus any left queued.
        for key in std::mem::take(&mut pending) {
            failures += 1;
            let error = match &worker_error {
                Some(e) => format!("worker task failed: {}", e),
                None => "worker exited without a result".to_string(),
            };
            let outcome = FetchOutcome::failure(key.clone(), client.query_for(&key), error);
            observer.on_progress(&ProgressEvent {
                completed: results.len() + 1,
                total,
                failures,
                key: outcome.key(),
                error: outcome.error(),
            });
            results.push(outcome);
        }

        observer.on_finish(results.len(), failures);
        tracing::info!(
            "Fetched {} keys ({} failed) in {:?}",
            results.len(),
            failures,
            start_time.elapsed()
        );

        results
    }
}

/// Pops the next key; the lock is released before any fetch starts
fn next_key(queue: &Mutex<VecDeque<Key>>) -> Option<Key> {
    let mut queue = queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    queue.pop_front()
}

/// Returns the worker's session, opening it on first use
fn ensure_session<'a, C: FetchClient>(
    client: &C,
    slot: &'a mut Option<C::Session>,
) -> Result<&'a C::Session, HarvestError> {
    let session = match slot.take() {
        Some(session) => session,
        None => client.open_session()?,
    };
    Ok(slot.insert(session))
}

/// Worker loop: fetch keys until the queue is empty
async fn run_worker<C: FetchClient>(
    worker_id: usize,
    client: Arc<C>,
    queue: Arc<Mutex<VecDeque<Key>>>,
    tx: mpsc::UnboundedSender<FetchOutcome<C::Record>>,
) {
    let mut session: Option<C::Session> = None;
    let mut handled = 0usize;

    while let Some(key) = next_key(&queue) {
        let outcome = match ensure_session(client.as_ref(), &mut session) {
            Ok(session) => client.fetch(session, &key).await,
            Err(e) => {
                tracing::warn!("Worker {} could not open a session: {}", worker_id, e);
                FetchOutcome::failure(
                    key.clone(),
                    client.query_for(&key),
                    format!("failed to open session: {}", e),
                )
            }
        };

        handled += 1;
        if tx.send(outcome).is_err() {
            tracing::debug!("Worker {} stopping: collector is gone", worker_id);
            break;
        }
    }

    tracing::trace!("Worker {} finished after {} keys", worker_id, handled);
}
