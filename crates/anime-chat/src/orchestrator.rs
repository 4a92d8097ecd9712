//! Workflow coordinator: sequences one round trip per user turn.
//!
//! text -> Interpreting Agent -> query envelope -> Retrieval Agent ->
//! result envelope -> Interpreting Agent -> prose, with one transcript
//! entry appended per completed turn.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use anime_core::config::AnimeConfig;
use anime_core::store::TableStore;
use anime_core::types::{QueryEnvelope, ResultEnvelope};

use crate::classifier::IntentClassifier;
use crate::interpreter::InterpretingAgent;
use crate::retrieval::RetrievalAgent;

/// Where the coordinator is within the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Interpreting,
    Retrieving,
    Presenting,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Interpreting => "interpreting",
            TurnPhase::Retrieving => "retrieving",
            TurnPhase::Presenting => "presenting",
        };
        f.write_str(name)
    }
}

/// One completed round trip.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub id: Uuid,
    pub at: DateTime<Utc>,
    pub user_text: String,
    pub query: QueryEnvelope,
    pub result: ResultEnvelope,
    pub prose: String,
}

/// Append-only record of a session's turns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }
}

/// Drives turns strictly one at a time.
///
/// `handle_turn` borrows the coordinator mutably, so a second turn cannot
/// start while one is in flight.
pub struct WorkflowCoordinator {
    interpreter: InterpretingAgent,
    retriever: RetrievalAgent,
    transcript: Transcript,
    phase: TurnPhase,
}

impl WorkflowCoordinator {
    pub fn new(interpreter: InterpretingAgent, retriever: RetrievalAgent) -> Self {
        Self {
            interpreter,
            retriever,
            transcript: Transcript::default(),
            phase: TurnPhase::Idle,
        }
    }

    /// Wire both agents from one configuration value.
    pub fn from_config(
        config: &AnimeConfig,
        classifier: Arc<dyn IntentClassifier>,
        store: Arc<dyn TableStore>,
    ) -> Self {
        Self::new(
            InterpretingAgent::from_config(classifier, config),
            RetrievalAgent::from_config(store, config),
        )
    }

    /// Run one turn and return the prose for the user.
    ///
    /// Never fails: unknown intent yields a clarification, an empty result
    /// a "no matches" answer, and a store failure a generic apology. The
    /// transcript entry is appended after the last await, so a dropped
    /// turn leaves the transcript unchanged and the phase back at `Idle`.
    pub async fn handle_turn(&mut self, user_text: &str) -> String {
        let id = Uuid::new_v4();
        debug!(turn = %id, "Turn started");

        let mut phase = PhaseGuard::new(&mut self.phase, id);
        phase.enter(TurnPhase::Interpreting);
        let query = self.interpreter.interpret(user_text).await;

        let (result, prose) = if query.is_unknown() {
            (ResultEnvelope::empty(), self.interpreter.clarify(user_text))
        } else {
            phase.enter(TurnPhase::Retrieving);
            let result = self.retriever.retrieve(&query).await;
            phase.enter(TurnPhase::Presenting);
            let prose = self.interpreter.present(&result, user_text);
            (result, prose)
        };

        info!(
            turn = %id,
            intent = %query.intent(),
            status = ?result.status(),
            rows = result.row_count(),
            "Turn completed"
        );

        self.transcript.push(Turn {
            id,
            at: Utc::now(),
            user_text: user_text.to_string(),
            query,
            result,
            prose: prose.clone(),
        });
        drop(phase);
        prose
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }
}

/// Tracks the phase of one turn and returns it to `Idle` when the turn
/// completes or its future is dropped.
struct PhaseGuard<'a> {
    phase: &'a mut TurnPhase,
    turn: Uuid,
}

impl<'a> PhaseGuard<'a> {
    fn new(phase: &'a mut TurnPhase, turn: Uuid) -> Self {
        Self { phase, turn }
    }

    fn enter(&mut self, next: TurnPhase) {
        debug!(turn = %self.turn, from = %self.phase, to = %next, "Phase change");
        *self.phase = next;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if *self.phase != TurnPhase::Idle {
            self.enter(TurnPhase::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use anime_core::config::RetrievalConfig;
    use anime_core::store::{BoundQuery, StoreError};
    use anime_core::types::{QueryIntent, ResultStatus, Row, Scalar};

    use crate::parser::RuleClassifier;

    /// Returns fixed rows, or a fixed error, and counts calls.
    struct FixedStore {
        outcome: Result<Vec<Row>, StoreError>,
        calls: AtomicUsize,
    }

    impl FixedStore {
        fn rows(rows: Vec<Row>) -> Arc<Self> {
            Arc::new(Self {
                outcome: Ok(rows),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(err: StoreError) -> Arc<Self> {
            Arc::new(Self {
                outcome: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TableStore for FixedStore {
        async fn query(&self, _query: &BoundQuery) -> Result<Vec<Row>, StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    /// Never answers.
    struct HangingStore;

    #[async_trait]
    impl TableStore for HangingStore {
        async fn query(&self, _query: &BoundQuery) -> Result<Vec<Row>, StoreError> {
            std::future::pending().await
        }
    }

    fn coordinator(store: Arc<dyn TableStore>) -> WorkflowCoordinator {
        let interpreter =
            InterpretingAgent::new(Arc::new(RuleClassifier::new()), Duration::from_secs(1), 2000);
        let config = RetrievalConfig {
            initial_backoff_ms: 1,
            ..RetrievalConfig::default()
        };
        let retriever = RetrievalAgent::new(store, config, Duration::from_secs(1));
        WorkflowCoordinator::new(interpreter, retriever)
    }

    fn bebop() -> Row {
        let mut r = Row::new();
        r.insert("title".to_string(), Scalar::from("Cowboy Bebop"));
        r.insert("score".to_string(), Scalar::Real(8.75));
        r
    }

    #[tokio::test]
    async fn test_answered_turn() {
        let store = FixedStore::rows(vec![bebop()]);
        let mut c = coordinator(store.clone());

        let prose = c.handle_turn("What are the top rated anime?").await;
        assert!(prose.contains("Cowboy Bebop"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(c.phase(), TurnPhase::Idle);

        let turn = c.transcript().last().unwrap();
        assert_eq!(turn.query.intent(), QueryIntent::TopRated);
        assert_eq!(turn.result.status(), ResultStatus::Ok);
        assert_eq!(turn.prose, prose);
    }

    #[tokio::test]
    async fn test_unknown_turn_skips_retrieval() {
        let store = FixedStore::rows(vec![bebop()]);
        let mut c = coordinator(store.clone());

        let prose = c.handle_turn("asdkjasdj").await;
        assert!(prose.contains("I can help with"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);

        let turn = c.transcript().last().unwrap();
        assert!(turn.query.is_unknown());
        assert_eq!(turn.result.status(), ResultStatus::Empty);
    }

    #[tokio::test]
    async fn test_error_turn_hides_detail_but_records_it() {
        let store = FixedStore::failing(StoreError::Permanent("no such column: scor".into()));
        let mut c = coordinator(store.clone());

        let prose = c.handle_turn("top rated anime").await;
        assert!(prose.starts_with("Sorry"));
        assert!(!prose.contains("scor"));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);

        let turn = c.transcript().last().unwrap();
        assert_eq!(turn.result.status(), ResultStatus::Error);
        assert!(turn.result.error_detail().unwrap().contains("no such column"));
    }

    #[tokio::test]
    async fn test_transcript_has_one_entry_per_turn_in_order() {
        let store = FixedStore::rows(Vec::new());
        let mut c = coordinator(store);
        let inputs = ["top rated", "asdkjasdj", "", "Show me action anime", "stats"];

        for text in inputs {
            c.handle_turn(text).await;
        }

        assert_eq!(c.transcript().len(), inputs.len());
        let recorded: Vec<&str> = c
            .transcript()
            .turns()
            .iter()
            .map(|t| t.user_text.as_str())
            .collect();
        assert_eq!(recorded, inputs);
    }

    #[tokio::test]
    async fn test_turns_serialize_for_debugging() {
        let store = FixedStore::failing(StoreError::Transient("busy".into()));
        let mut c = coordinator(store);
        c.handle_turn("top rated").await;

        let json = serde_json::to_value(c.transcript().last().unwrap()).unwrap();
        assert_eq!(json["query"]["intent"], "top-rated");
        assert_eq!(json["result"]["status"], "error");
        assert!(json["result"]["error_detail"]
            .as_str()
            .unwrap()
            .contains("busy"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_turn_resets_phase_and_skips_transcript() {
        let mut c = coordinator(Arc::new(HangingStore));

        let outcome =
            tokio::time::timeout(Duration::from_millis(100), c.handle_turn("top rated")).await;

        assert!(outcome.is_err(), "turn should still be retrieving");
        assert!(c.transcript().is_empty());
        assert_eq!(c.phase(), TurnPhase::Idle);

        c.handle_turn("asdkjasdj").await;
        assert_eq!(c.transcript().len(), 1);
        assert_eq!(c.phase(), TurnPhase::Idle);
    }
}
