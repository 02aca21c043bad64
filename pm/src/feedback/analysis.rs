//! The `feedback_analysis.json` snapshot

use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::aggregator::{AnalysisReport, SentimentDistribution, extract_feature_requests};
use super::record::{RankedCandidate, Sentiment};
use crate::snapshot::{self, SnapshotError};

/// Summary plus ranked feature requests, as handed to the selection front-end
///
/// Only `feature_requests` is required when reading.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub total_feedback: usize,
    #[serde(default)]
    pub sentiment_distribution: SentimentDistribution,
    #[serde(default)]
    pub overall_sentiment: Sentiment,
    #[serde(default)]
    pub average_sentiment_score: f64,
    pub feature_requests: Vec<RankedCandidate>,
}

impl FeedbackAnalysis {
    /// Rank the feature requests of an analysis report
    pub fn from_report(report: &AnalysisReport) -> Self {
        debug!(total = report.total_count, "FeedbackAnalysis::from_report: called");
        Self {
            generated_at: Utc::now().to_rfc3339(),
            total_feedback: report.total_count,
            sentiment_distribution: report.sentiment_distribution,
            overall_sentiment: report.overall_sentiment,
            average_sentiment_score: (report.average_sentiment_score * 1000.0).round() / 1000.0,
            feature_requests: extract_feature_requests(&report.enriched_records),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        snapshot::write_json(path, self)?;
        info!("Saved feedback analysis to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let analysis: Self = snapshot::read_json(path)?;
        info!("Loaded {} feature requests from {}", analysis.feature_requests.len(), path.display());
        Ok(analysis)
    }
}
