//! Sentiment classification
//!
//! Two paths: a statistical polarity engine and a keyword vote. The keyword
//! vote is used when no engine is configured or when the engine fails on a
//! given text. Empty text is always neutral with a score of 0.0.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use super::record::Sentiment;
use crate::config::{SentimentConfig, SentimentEngine};

const POSITIVE_WORDS: &[&str] = &[
    "great",
    "awesome",
    "love",
    "amazing",
    "excellent",
    "good",
    "perfect",
    "wonderful",
    "impressive",
    "fantastic",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "hate",
    "disappointing",
    "poor",
    "crash",
    "bug",
    "issue",
    "problem",
    "frustrating",
    "broken",
];

/// Errors from a polarity engine
#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("text contains no word tokens")]
    NoTokens,

    #[error("polarity engine unavailable: {0}")]
    Unavailable(String),
}

/// Statistical polarity scorer
pub trait PolarityEngine: Send + Sync {
    /// Polarity in [-1, 1]
    fn polarity(&self, text: &str) -> Result<f64, SentimentError>;
}

/// Result of classifying one text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub sentiment: Sentiment,
    pub score: f64,
}

impl Classification {
    pub fn neutral() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            score: 0.0,
        }
    }
}

/// Labels text as positive, negative or neutral
pub struct SentimentClassifier {
    engine: Option<Box<dyn PolarityEngine>>,
}

impl SentimentClassifier {
    /// Classifier with a statistical engine and keyword fallback
    pub fn new(engine: Box<dyn PolarityEngine>) -> Self {
        debug!("SentimentClassifier::new: called");
        Self { engine: Some(engine) }
    }

    /// Classifier that only runs the keyword vote
    pub fn keywords_only() -> Self {
        debug!("SentimentClassifier::keywords_only: called");
        Self { engine: None }
    }

    pub fn from_config(config: &SentimentConfig) -> Self {
        debug!(?config.engine, "SentimentClassifier::from_config: called");
        match config.engine {
            SentimentEngine::Lexicon => Self::new(Box::new(LexiconPolarity::default())),
            SentimentEngine::Keywords => Self::keywords_only(),
        }
    }

    /// Classify a text; never fails
    pub fn classify(&self, text: &str) -> Classification {
        if text.trim().is_empty() {
            debug!("classify: empty text, neutral");
            return Classification::neutral();
        }

        if let Some(engine) = &self.engine {
            match engine.polarity(text) {
                Ok(p) => {
                    let p = p.clamp(-1.0, 1.0);
                    return Classification {
                        sentiment: Sentiment::from_polarity(p),
                        score: p,
                    };
                }
                Err(e) => {
                    warn!(error = %e, "classify: polarity engine failed, using keyword fallback");
                }
            }
        }

        let sentiment = keyword_vote(text);
        let score = match sentiment {
            Sentiment::Positive => 1.0,
            Sentiment::Negative => -1.0,
            Sentiment::Neutral => 0.0,
        };
        Classification { sentiment, score }
    }

    /// Whether the statistical engine is in use
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }
}

/// Majority vote of positive vs negative keyword hits; ties are neutral
pub fn keyword_vote(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    debug!(positive, negative, "keyword_vote: hits");

    if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Lexicon-averaging polarity scorer
///
/// Each lexicon word contributes its polarity. An immediately preceding
/// intensifier scales it; an earlier negator flips and halves it. The result
/// is the mean contribution, clamped to [-1, 1].
pub struct LexiconPolarity {
    lexicon: HashMap<&'static str, f64>,
    intensifiers: HashMap<&'static str, f64>,
    negators: &'static [&'static str],
}

impl Default for LexiconPolarity {
    fn default() -> Self {
        let lexicon = [
            ("good", 0.7),
            ("great", 0.8),
            ("awesome", 1.0),
            ("amazing", 0.6),
            ("excellent", 1.0),
            ("perfect", 1.0),
            ("wonderful", 1.0),
            ("impressive", 1.0),
            ("fantastic", 0.4),
            ("love", 0.5),
            ("like", 0.2),
            ("best", 1.0),
            ("better", 0.5),
            ("nice", 0.6),
            ("helpful", 0.5),
            ("useful", 0.3),
            ("easy", 0.4),
            ("fast", 0.2),
            ("quickly", 0.3),
            ("happy", 0.8),
            ("noteworthy", 0.5),
            ("new", 0.1),
            ("bad", -0.7),
            ("terrible", -1.0),
            ("awful", -1.0),
            ("horrible", -1.0),
            ("worst", -1.0),
            ("hate", -0.8),
            ("disappointing", -0.6),
            ("poor", -0.4),
            ("broken", -0.4),
            ("slow", -0.3),
            ("frustrating", -0.4),
            ("annoying", -0.8),
            ("confusing", -0.3),
            ("useless", -0.5),
            ("difficult", -0.5),
            ("crash", -0.5),
            ("crashes", -0.5),
            ("buggy", -0.5),
        ]
        .into_iter()
        .collect();

        let intensifiers = [
            ("very", 1.3),
            ("really", 1.3),
            ("extremely", 1.5),
            ("incredibly", 1.5),
            ("super", 1.5),
            ("particularly", 1.3),
            ("so", 1.2),
        ]
        .into_iter()
        .collect();

        Self {
            lexicon,
            intensifiers,
            negators: &[
                "not", "never", "no", "nor", "without", "dont", "doesnt", "didnt", "isnt", "wasnt", "arent", "cant",
                "couldnt", "wont", "wouldnt", "shouldnt",
            ],
        }
    }
}

impl LexiconPolarity {
    fn tokens(text: &str) -> Vec<String> {
        text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase().replace('\'', ""))
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn is_negator(&self, token: &str) -> bool {
        self.negators.contains(&token)
    }
}

impl PolarityEngine for LexiconPolarity {
    fn polarity(&self, text: &str) -> Result<f64, SentimentError> {
        let tokens = Self::tokens(text);
        if tokens.is_empty() {
            return Err(SentimentError::NoTokens);
        }

        let mut contributions = Vec::new();
        let mut negate = false;
        let mut intensity = 1.0;

        for token in &tokens {
            if let Some(&value) = self.lexicon.get(token.as_str()) {
                let mut contribution = value * intensity;
                if negate {
                    contribution *= -0.5;
                }
                contributions.push(contribution);
                negate = false;
                intensity = 1.0;
            } else if let Some(&factor) = self.intensifiers.get(token.as_str()) {
                intensity *= factor;
            } else if self.is_negator(token) {
                negate = true;
                intensity = 1.0;
            } else {
                intensity = 1.0;
            }
        }

        if contributions.is_empty() {
            debug!(token_count = tokens.len(), "LexiconPolarity::polarity: no lexicon words");
            return Ok(0.0);
        }

        let mean = contributions.iter().sum::<f64>() / contributions.len() as f64;
        Ok(mean.clamp(-1.0, 1.0))
    }
}
