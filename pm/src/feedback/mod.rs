//! Feedback prioritization
//!
//! Gathers feedback from every configured source, classifies sentiment,
//! scores impact and ranks the records that read as feature requests.

mod aggregator;
mod analysis;
mod record;
mod sentiment;
mod sources;

pub use aggregator::{
    AnalysisReport, Aggregator, SentimentDistribution, compute_impact, extract_feature_requests, is_feature_request,
};
pub use analysis::FeedbackAnalysis;
pub use record::{FeedbackRecord, RankedCandidate, Sentiment, Source};
pub use sentiment::{
    Classification, LexiconPolarity, PolarityEngine, SentimentClassifier, SentimentError, keyword_vote,
};
pub use sources::{ChatSource, EmailSource, FeedbackSource, SocialSource, WebSource, configured_sources};
