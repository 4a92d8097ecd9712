//! Retrieval Agent: query envelope to table-store query to result envelope.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use anime_core::config::{AnimeConfig, RetrievalConfig};
use anime_core::store::{BoundQuery, StoreError, TableStore};
use anime_core::types::{QueryEnvelope, ResultEnvelope, Row};

use crate::templates;

/// Executes envelopes against the table store with bounded retries.
pub struct RetrievalAgent {
    store: Arc<dyn TableStore>,
    config: RetrievalConfig,
    timeout: Duration,
}

impl RetrievalAgent {
    pub fn new(store: Arc<dyn TableStore>, config: RetrievalConfig, timeout: Duration) -> Self {
        Self {
            store,
            config,
            timeout,
        }
    }

    pub fn from_config(store: Arc<dyn TableStore>, config: &AnimeConfig) -> Self {
        Self::new(store, config.retrieval.clone(), config.store.timeout())
    }

    /// Run the envelope's template.
    ///
    /// `unknown` returns `empty` without touching the store. Zero rows is
    /// `empty`; a store failure that survives the retry policy is `error`.
    pub async fn retrieve(&self, envelope: &QueryEnvelope) -> ResultEnvelope {
        let Some(query) = templates::plan(envelope, &self.config) else {
            debug!("Unknown intent, skipping store");
            return ResultEnvelope::empty();
        };

        match self.execute_with_retry(&query).await {
            Ok(rows) => ResultEnvelope::from_rows(rows),
            Err((attempts, e)) => ResultEnvelope::error(format!(
                "{} failed after {} attempt(s): {}",
                query.name, attempts, e
            )),
        }
    }

    /// Transient failures are retried up to `max_attempts` total attempts
    /// with doubling backoff. Permanent failures return at once.
    async fn execute_with_retry(&self, query: &BoundQuery) -> Result<Vec<Row>, (u32, StoreError)> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.initial_backoff();
        let mut attempt = 1;

        loop {
            let outcome = match tokio::time::timeout(self.timeout, self.store.query(query)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Transient(format!(
                    "query timed out after {:?}",
                    self.timeout
                ))),
            };

            match outcome {
                Ok(rows) => {
                    debug!(template = query.name, attempt, rows = rows.len(), "Query succeeded");
                    return Ok(rows);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        template = query.name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "Transient store failure, retrying: {}",
                        e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => {
                    warn!(template = query.name, attempt, "Store query failed: {}", e);
                    return Err((attempt, e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use anime_core::types::{Parameters, QueryIntent, ResultStatus, Scalar};

    /// Replays scripted outcomes, then repeats the last one.
    struct ScriptedStore {
        script: Mutex<VecDeque<Result<Vec<Row>, StoreError>>>,
        last: Mutex<Option<Result<Vec<Row>, StoreError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedStore {
        fn new(script: Vec<Result<Vec<Row>, StoreError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TableStore for ScriptedStore {
        async fn query(&self, _query: &BoundQuery) -> Result<Vec<Row>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(next) = next {
                *last = Some(next);
            }
            last.clone().unwrap_or(Ok(Vec::new()))
        }
    }

    fn row(title: &str, score: f64) -> Row {
        let mut r = Row::new();
        r.insert("title".to_string(), Scalar::from(title));
        r.insert("score".to_string(), Scalar::Real(score));
        r
    }

    fn agent(store: Arc<ScriptedStore>) -> RetrievalAgent {
        let config = RetrievalConfig {
            initial_backoff_ms: 1,
            ..RetrievalConfig::default()
        };
        RetrievalAgent::new(store, config, Duration::from_secs(5))
    }

    fn top_rated() -> QueryEnvelope {
        QueryEnvelope::new(QueryIntent::TopRated, Parameters::new(), "top rated")
    }

    fn transient() -> Result<Vec<Row>, StoreError> {
        Err(StoreError::Transient("database is locked".to_string()))
    }

    #[tokio::test]
    async fn test_unknown_makes_no_store_call() {
        let store = ScriptedStore::new(vec![Ok(vec![row("Cowboy Bebop", 8.75)])]);
        let result = agent(store.clone())
            .retrieve(&QueryEnvelope::unknown("asdkjasdj"))
            .await;
        assert_eq!(result.status(), ResultStatus::Empty);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_rows_become_ok() {
        let store = ScriptedStore::new(vec![Ok(vec![row("A", 9.0), row("B", 8.0)])]);
        let result = agent(store.clone()).retrieve(&top_rated()).await;
        assert_eq!(result.status(), ResultStatus::Ok);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.rows()[0]["title"], Scalar::from("A"));
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_rows_is_empty_not_error() {
        let store = ScriptedStore::new(vec![Ok(Vec::new())]);
        let result = agent(store).retrieve(&top_rated()).await;
        assert_eq!(result.status(), ResultStatus::Empty);
        assert!(result.error_detail().is_none());
    }

    #[tokio::test]
    async fn test_transient_twice_then_success() {
        let store = ScriptedStore::new(vec![
            transient(),
            transient(),
            Ok(vec![row("Frieren", 9.3)]),
        ]);
        let result = agent(store.clone()).retrieve(&top_rated()).await;
        assert_eq!(result.status(), ResultStatus::Ok);
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_always_transient_gives_error_after_bound() {
        let store = ScriptedStore::new(vec![transient()]);
        let result = agent(store.clone()).retrieve(&top_rated()).await;
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(store.calls(), 3);
        let detail = result.error_detail().unwrap();
        assert!(detail.contains("after 3 attempt(s)"));
        assert!(detail.contains("database is locked"));
    }

    #[tokio::test]
    async fn test_permanent_is_not_retried() {
        let store = ScriptedStore::new(vec![Err(StoreError::Permanent(
            "no such table: anime".to_string(),
        ))]);
        let result = agent(store.clone()).retrieve(&top_rated()).await;
        assert_eq!(result.status(), ResultStatus::Error);
        assert_eq!(store.calls(), 1);
        assert!(result.error_detail().unwrap().contains("no such table"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_from_initial() {
        let store = ScriptedStore::new(vec![transient()]);
        let agent = RetrievalAgent::new(
            store.clone(),
            RetrievalConfig::default(),
            Duration::from_secs(5),
        );
        let started = tokio::time::Instant::now();
        agent.retrieve(&top_rated()).await;
        // 200ms before attempt 2, 400ms before attempt 3, none after the last.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(600), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(800), "elapsed {:?}", elapsed);
        assert_eq!(store.calls(), 3);
    }

    /// Never answers, to exercise the per-call timeout.
    struct HangingStore {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TableStore for HangingStore {
        async fn query(&self, _query: &BoundQuery) -> Result<Vec<Row>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_transient() {
        let store = Arc::new(HangingStore {
            calls: AtomicUsize::new(0),
        });
        let config = RetrievalConfig {
            initial_backoff_ms: 10,
            ..RetrievalConfig::default()
        };
        let agent = RetrievalAgent::new(store.clone(), config, Duration::from_millis(100));
        let result = agent.retrieve(&top_rated()).await;
        assert_eq!(result.status(), ResultStatus::Error);
        assert!(result.error_detail().unwrap().contains("timed out"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_same_envelope_same_rows() {
        let rows = vec![row("A", 9.0), row("B", 8.0)];
        let store = ScriptedStore::new(vec![Ok(rows.clone())]);
        let agent = agent(store);
        let first = agent.retrieve(&top_rated()).await;
        let second = agent.retrieve(&top_rated()).await;
        assert_eq!(first, second);
    }
}
