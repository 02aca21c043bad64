//! Feedback record types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Where a piece of feedback came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[serde(alias = "slack")]
    Chat,
    #[serde(alias = "web_forum", alias = "review_site")]
    Web,
    #[serde(alias = "twitter", alias = "linkedin")]
    Social,
    Email,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Chat => "chat",
            Source::Web => "web",
            Source::Social => "social",
            Source::Email => "email",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sentiment polarity label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Sentiment {
    /// Label for a polarity score: beyond +/-0.1 counts, anything inside is neutral
    pub fn from_polarity(p: f64) -> Self {
        if p > 0.1 {
            Sentiment::Positive
        } else if p < -0.1 {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    /// Priority weight used by the impact score; negative feedback ranks highest
    pub fn weight(&self) -> f64 {
        match self {
            Sentiment::Negative => 0.7,
            Sentiment::Positive => 0.3,
            Sentiment::Neutral => 0.1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single piece of user feedback
///
/// Created by a source adapter; `sentiment`, `sentiment_score` and
/// `impact_score` are filled in later by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub source: Source,
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: String,

    /// Source-specific attributes (ratings, reactions, subject, channel)
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_score: Option<f64>,
}

impl FeedbackRecord {
    pub fn new(source: Source, user: impl Into<String>, text: impl Into<String>, timestamp: impl Into<String>) -> Self {
        let user = user.into();
        debug!(%source, %user, "FeedbackRecord::new: called");
        Self {
            source,
            user,
            text: text.into(),
            timestamp: timestamp.into(),
            extra: Map::new(),
            sentiment: None,
            sentiment_score: None,
            impact_score: None,
        }
    }

    /// Attach a source-specific attribute
    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Whether the record carries any text worth scoring
    pub fn is_scoreable(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// A feedback record that matched feature-request intent
///
/// Serialized exactly like the underlying record, with `impact_score` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankedCandidate(pub FeedbackRecord);

impl RankedCandidate {
    pub fn new(mut record: FeedbackRecord, impact_score: f64) -> Self {
        record.impact_score = Some(impact_score);
        Self(record)
    }

    pub fn impact_score(&self) -> f64 {
        self.0.impact_score.unwrap_or(0.0)
    }

    pub fn record(&self) -> &FeedbackRecord {
        &self.0
    }
}
