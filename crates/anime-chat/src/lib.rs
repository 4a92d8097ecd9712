//! Conversational interface for the anime assistant.
//!
//! Provides intent classification (rule-based and language-model backed),
//! the Interpreting and Retrieval agents, and the workflow coordinator that
//! sequences them and keeps the conversation transcript.

pub mod classifier;
pub mod error;
pub mod interpreter;
pub mod llm;
pub mod orchestrator;
pub mod parser;
pub mod response;
pub mod retrieval;
pub mod templates;

pub use classifier::{Classification, IntentClassifier};
pub use error::{ChatError, ClassifyError};
pub use interpreter::{classifier_from_config, InterpretingAgent};
pub use llm::LlmClassifier;
pub use orchestrator::{Transcript, Turn, TurnPhase, WorkflowCoordinator};
pub use parser::RuleClassifier;
pub use response::ResponseGenerator;
pub use retrieval::RetrievalAgent;
