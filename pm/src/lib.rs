//! pmagent - feedback prioritization and human-approved product plans
//!
//! Collects user feedback from several sources, scores and ranks feature
//! requests, asks a planning oracle for an execution plan, lets a person
//! review and approve it, then publishes the result as a PRD, an issue and a
//! chat notification.
//!
//! # Modules
//!
//! - [`feedback`] - sources, sentiment classification, impact ranking
//! - [`planning`] - oracle client, retry policy, plan normalization
//! - [`review`] - approval state machine and interactive input
//! - [`workflow`] - feature selection, review loop driver, completion dispatch
//! - [`integrations`] - chat, document store and issue tracker adapters
//! - [`llm`] - LLM client trait with Anthropic and OpenAI implementations
//! - [`prompts`] - handlebars prompt templates
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//! - [`testing`] - scripted and recording fakes for the collaborator seams

pub mod cli;
pub mod config;
pub mod feedback;
pub mod integrations;
pub mod llm;
pub mod planning;
pub mod prompts;
pub mod review;
pub mod snapshot;
pub mod testing;
pub mod workflow;

// Re-export commonly used types
pub use config::{Config, ResolvedConfig};
pub use feedback::{
    Aggregator, AnalysisReport, FeedbackAnalysis, FeedbackRecord, RankedCandidate, Sentiment, SentimentClassifier,
    Source,
};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use planning::{Plan, PlanGenerator, PlanOracle, PlanStatus, PlanStep, normalize};
pub use prompts::PromptLoader;
pub use review::{ReviewAction, ReviewError, ReviewSession};
pub use workflow::{CompletionDispatcher, WorkflowController, WorkflowOutcome, WorkflowResults};
