//! Generation manager: single-flight de-duplication plus a result cache over
//! asynchronous generation calls.
//!
//! For a fixed key the generator runs at most once concurrently and at most
//! once successfully until [`GenerationManager::clear_cache`] or, for scoped
//! parameters, [`GenerationManager::evict_scope`]. Failures are shared with
//! every awaiter and never cached, so a later call retries.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::generation::key::GenerationKey;

type SharedGeneration<V, E> = Shared<BoxFuture<'static, Result<V, Arc<E>>>>;

struct Pending<V, E> {
    ticket: u64,
    future: SharedGeneration<V, E>,
}

struct Table<V, E> {
    cache: HashMap<GenerationKey, V>,
    pending: HashMap<GenerationKey, Pending<V, E>>,
    completed: HashSet<GenerationKey>,
    next_ticket: u64,
}

/// Cache and de-duplication layer keyed by (operation, parameters).
pub struct GenerationManager<V, E> {
    table: Mutex<Table<V, E>>,
}

impl<V, E> Default for GenerationManager<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, E> GenerationManager<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Mutex::new(Table {
                cache: HashMap::new(),
                pending: HashMap::new(),
                completed: HashSet::new(),
                next_ticket: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Table<V, E>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached result for `(kind, params)`, join the in-flight call,
    /// or start `generator`.
    ///
    /// # Errors
    /// Returns the generator's error, shared with every concurrent awaiter.
    pub async fn generate<F, Fut>(&self, kind: &str, params: &Value, generator: F) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = GenerationKey::new(kind, params);

        let (ticket, future) = {
            let mut table = self.lock();

            if let Some(cached) = table.cache.get(&key) {
                debug!("Returning cached result for {key}");
                return Ok(cached.clone());
            }

            if let Some(pending) = table.pending.get(&key) {
                debug!("Joining in-flight generation for {key}");
                (pending.ticket, pending.future.clone())
            } else {
                info!("Starting generation for {key}");
                let ticket = table.next_ticket;
                table.next_ticket += 1;
                let future = async move { generator().await.map_err(Arc::new) }
                    .boxed()
                    .shared();
                table.pending.insert(
                    key.clone(),
                    Pending {
                        ticket,
                        future: future.clone(),
                    },
                );
                (ticket, future)
            }
        };

        let outcome = future.await;
        self.settle(&key, ticket, &outcome);
        outcome
    }

    /// Move a finished call out of the pending table. Runs for every awaiter;
    /// only the first one holding the matching ticket has an effect.
    fn settle(&self, key: &GenerationKey, ticket: u64, outcome: &Result<V, Arc<E>>) {
        let mut table = self.lock();

        if table.pending.get(key).is_none_or(|pending| pending.ticket != ticket) {
            return;
        }
        table.pending.remove(key);

        match outcome {
            Ok(value) => {
                table.cache.insert(key.clone(), value.clone());
                table.completed.insert(key.clone());
                debug!("Cached result for {key}");
            }
            Err(_) => warn!("Generation failed for {key}; not cached"),
        }
    }

    /// Whether a call for `(kind, params)` is in flight.
    #[must_use]
    pub fn is_generating(&self, kind: &str, params: &Value) -> bool {
        self.lock().pending.contains_key(&GenerationKey::new(kind, params))
    }

    /// Whether a call for `(kind, params)` has succeeded since the last clear.
    #[must_use]
    pub fn is_completed(&self, kind: &str, params: &Value) -> bool {
        self.lock().completed.contains(&GenerationKey::new(kind, params))
    }

    /// Drop cached results and completion marks. In-flight calls are kept.
    pub fn clear_cache(&self) {
        let mut table = self.lock();
        table.cache.clear();
        table.completed.clear();
        info!("Generation cache cleared");
    }

    /// Drop every cached result, completion mark and in-flight entry whose
    /// parameters carry `scope`. Callers already awaiting an evicted call still
    /// get its outcome, but it is not cached. Returns the number of cached
    /// results removed.
    pub fn evict_scope(&self, scope: &str) -> usize {
        let mut table = self.lock();
        let before = table.cache.len();
        table.cache.retain(|key, _| key.scope() != Some(scope));
        table.completed.retain(|key| key.scope() != Some(scope));
        table.pending.retain(|key, _| key.scope() != Some(scope));
        let removed = before - table.cache.len();
        debug!("Evicted {removed} cached generations for scope {scope}");
        removed
    }

    /// Number of cached results.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.lock().cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Manager = GenerationManager<String, String>;

    fn counted(
        calls: &Arc<AtomicUsize>,
        result: Result<String, String>,
        delay: Duration,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<String, String>> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(delay).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_cached_result_skips_generator() {
        let manager = Manager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let params = json!({"icp": "a"});

        let first = manager
            .generate("value-prop", &params, counted(&calls, Ok("v1".into()), Duration::ZERO))
            .await;
        let second = manager
            .generate("value-prop", &params, counted(&calls, Ok("v2".into()), Duration::ZERO))
            .await;

        assert_eq!(first.unwrap(), "v1");
        assert_eq!(second.unwrap(), "v1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(manager.is_completed("value-prop", &params));
        assert!(!manager.is_generating("value-prop", &params));
    }

    #[tokio::test]
    async fn test_concurrent_calls_share_one_generation() {
        let manager = Arc::new(Manager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let params = json!({"icp": "a"});

        let a = manager.generate(
            "funnel",
            &params,
            counted(&calls, Ok("shared".into()), Duration::from_millis(30)),
        );
        let b = manager.generate(
            "funnel",
            &params,
            counted(&calls, Ok("other".into()), Duration::from_millis(30)),
        );
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap(), "shared");
        assert_eq!(b.unwrap(), "shared");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_in_flight_call_is_visible() {
        let manager = Arc::new(Manager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let params = json!({"icp": "a"});

        let task = {
            let manager = Arc::clone(&manager);
            let params = params.clone();
            let generator = counted(&calls, Ok("slow".into()), Duration::from_millis(50));
            tokio::spawn(async move { manager.generate("landing", &params, generator).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(manager.is_generating("landing", &params));

        assert_eq!(task.await.unwrap().unwrap(), "slow");
        assert!(!manager.is_generating("landing", &params));
    }

    #[tokio::test]
    async fn test_failures_reach_every_awaiter_and_are_not_cached() {
        let manager = Manager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let params = json!({"icp": "a"});

        let a = manager.generate(
            "email",
            &params,
            counted(&calls, Err("boom".into()), Duration::from_millis(20)),
        );
        let b = manager.generate(
            "email",
            &params,
            counted(&calls, Ok("unused".into()), Duration::ZERO),
        );
        let (a, b) = tokio::join!(a, b);

        assert_eq!(a.unwrap_err().as_str(), "boom");
        assert_eq!(b.unwrap_err().as_str(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!manager.is_completed("email", &params));
        assert!(!manager.is_generating("email", &params));

        // A later call retries.
        let retry = manager
            .generate("email", &params, counted(&calls, Ok("ok".into()), Duration::ZERO))
            .await;
        assert_eq!(retry.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_cache_allows_regeneration() {
        let manager = Manager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let params = json!({"icp": "a"});

        manager
            .generate("linkedin", &params, counted(&calls, Ok("v1".into()), Duration::ZERO))
            .await
            .unwrap();
        manager.clear_cache();
        assert!(!manager.is_completed("linkedin", &params));
        assert_eq!(manager.cached_len(), 0);

        let again = manager
            .generate("linkedin", &params, counted(&calls, Ok("v2".into()), Duration::ZERO))
            .await;
        assert_eq!(again.unwrap(), "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_evict_scope_drops_only_that_owner() {
        let manager = Arc::new(Manager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let first = json!({"icp": "a", "scope": "c1"});
        let second = json!({"icp": "a", "scope": "c2"});

        for params in [&first, &second] {
            manager
                .generate("email", params, counted(&calls, Ok("v".into()), Duration::ZERO))
                .await
                .unwrap();
        }
        let slow = {
            let manager = Arc::clone(&manager);
            let params = first.clone();
            let generator = counted(&calls, Ok("late".into()), Duration::from_millis(40));
            tokio::spawn(async move { manager.generate("landing", &params, generator).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(manager.cached_len(), 2);

        assert_eq!(manager.evict_scope("c1"), 1);
        assert!(!manager.is_completed("email", &first));
        assert!(!manager.is_generating("landing", &first));
        assert!(manager.is_completed("email", &second));

        // The awaiter still gets its value, but nothing is cached for the evicted scope.
        assert_eq!(slow.await.unwrap().unwrap(), "late");
        assert!(!manager.is_completed("landing", &first));
        assert_eq!(manager.cached_len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_first_caller_does_not_strand_the_key() {
        let manager = Arc::new(Manager::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let params = json!({"icp": "a"});

        let first = {
            let manager = Arc::clone(&manager);
            let params = params.clone();
            let generator = counted(&calls, Ok("done".into()), Duration::from_millis(40));
            tokio::spawn(async move { manager.generate("value-prop", &params, generator).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let joiner = manager.generate(
            "value-prop",
            &params,
            counted(&calls, Ok("unused".into()), Duration::ZERO),
        );
        first.abort();

        assert_eq!(joiner.await.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!manager.is_generating("value-prop", &params));
        assert!(manager.is_completed("value-prop", &params));
    }
}
