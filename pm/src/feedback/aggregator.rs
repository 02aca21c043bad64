//! Feedback aggregation, scoring and ranking

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::record::{FeedbackRecord, RankedCandidate, Sentiment};
use super::sentiment::SentimentClassifier;
use super::sources::FeedbackSource;

/// Words that mark a record as a feature request
const FEATURE_KEYWORDS: &[&str] = &[
    "feature",
    "request",
    "add",
    "implement",
    "support",
    "would like",
    "want",
    "need",
];

/// Text length (in characters) at which the length signal saturates
const LENGTH_SATURATION: f64 = 100.0;

/// Count of records per sentiment label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    pub fn record(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    /// The label with the strictly highest count; any tie is neutral
    pub fn overall(&self) -> Sentiment {
        if self.positive > self.negative && self.positive > self.neutral {
            Sentiment::Positive
        } else if self.negative > self.positive && self.negative > self.neutral {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

/// Result of classifying a batch of feedback
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub total_count: usize,
    pub sentiment_distribution: SentimentDistribution,
    pub overall_sentiment: Sentiment,
    /// Mean score over records with non-empty text; 0.0 when there are none
    pub average_sentiment_score: f64,
    pub enriched_records: Vec<FeedbackRecord>,
}

/// Merges sources and runs the classifier over their output
pub struct Aggregator {
    sources: Vec<Box<dyn FeedbackSource>>,
    classifier: SentimentClassifier,
}

impl Aggregator {
    pub fn new(sources: Vec<Box<dyn FeedbackSource>>, classifier: SentimentClassifier) -> Self {
        debug!(source_count = sources.len(), "Aggregator::new: called");
        Self { sources, classifier }
    }

    /// Fetch every source in order and concatenate; duplicates are kept
    pub async fn gather(&self) -> Vec<FeedbackRecord> {
        debug!("Aggregator::gather: called");
        let mut records = Vec::new();
        for source in &self.sources {
            let batch = source.fetch().await;
            debug!(source = source.name(), count = batch.len(), "gather: fetched");
            records.extend(batch);
        }
        info!("Gathered {} feedback items total", records.len());
        records
    }

    /// Classify every record and summarize the distribution
    pub fn analyze(&self, records: Vec<FeedbackRecord>) -> AnalysisReport {
        debug!(count = records.len(), "Aggregator::analyze: called");
        let mut distribution = SentimentDistribution::default();
        let mut score_sum = 0.0;
        let mut scored = 0usize;

        let enriched_records: Vec<FeedbackRecord> = records
            .into_iter()
            .map(|mut record| {
                let classification = self.classifier.classify(&record.text);
                record.sentiment = Some(classification.sentiment);
                record.sentiment_score = Some(classification.score);
                distribution.record(classification.sentiment);
                if record.is_scoreable() {
                    score_sum += classification.score;
                    scored += 1;
                }
                record
            })
            .collect();

        let average_sentiment_score = if scored == 0 { 0.0 } else { score_sum / scored as f64 };
        let overall_sentiment = distribution.overall();
        info!(
            total = enriched_records.len(),
            %overall_sentiment,
            average_sentiment_score,
            "Sentiment analysis complete"
        );

        AnalysisReport {
            total_count: enriched_records.len(),
            sentiment_distribution: distribution,
            overall_sentiment,
            average_sentiment_score,
            enriched_records,
        }
    }
}

/// Impact score in [0, 1]: 0.7 * sentiment weight + 0.3 * length signal
///
/// Records without a sentiment label are weighted as neutral.
pub fn compute_impact(record: &FeedbackRecord) -> f64 {
    let weight = record.sentiment.unwrap_or_default().weight();
    let length = (record.text.chars().count() as f64 / LENGTH_SATURATION).min(1.0);
    0.7 * weight + 0.3 * length
}

/// Whether lower-cased text contains any feature-request keyword
pub fn is_feature_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    FEATURE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Feature-request records with impact scores, highest first
///
/// Equal scores keep their input order.
pub fn extract_feature_requests(records: &[FeedbackRecord]) -> Vec<RankedCandidate> {
    debug!(count = records.len(), "extract_feature_requests: called");
    let mut candidates: Vec<RankedCandidate> = records
        .iter()
        .filter(|r| is_feature_request(&r.text))
        .map(|r| RankedCandidate::new(r.clone(), compute_impact(r)))
        .collect();

    // sort_by is stable
    candidates.sort_by(|a, b| b.impact_score().total_cmp(&a.impact_score()));
    info!("Found {} feature requests", candidates.len());
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::record::Source;
    use crate::feedback::sources::{EmailSource, WebSource};
    use proptest::prelude::*;

    fn record(text: &str) -> FeedbackRecord {
        FeedbackRecord::new(Source::Web, "u", text, "2025-01-01T00:00:00Z")
    }

    fn labelled(text: &str, sentiment: Sentiment) -> FeedbackRecord {
        let mut r = record(text);
        r.sentiment = Some(sentiment);
        r
    }

    #[test]
    fn test_overall_sentiment_ties_are_neutral() {
        assert_eq!(SentimentDistribution::default().overall(), Sentiment::Neutral);

        let d = SentimentDistribution {
            positive: 2,
            negative: 2,
            neutral: 0,
        };
        assert_eq!(d.overall(), Sentiment::Neutral);

        let d = SentimentDistribution {
            positive: 3,
            negative: 1,
            neutral: 1,
        };
        assert_eq!(d.overall(), Sentiment::Positive);

        let d = SentimentDistribution {
            positive: 0,
            negative: 2,
            neutral: 1,
        };
        assert_eq!(d.overall(), Sentiment::Negative);
    }

    #[test]
    fn test_analyze_skips_empty_text_in_average() {
        let aggregator = Aggregator::new(vec![], SentimentClassifier::keywords_only());
        let report = aggregator.analyze(vec![record(""), record("awesome"), record("terrible bug")]);

        assert_eq!(report.total_count, 3);
        assert_eq!(report.sentiment_distribution.neutral, 1);
        assert_eq!(report.sentiment_distribution.positive, 1);
        assert_eq!(report.sentiment_distribution.negative, 1);
        assert_eq!(report.overall_sentiment, Sentiment::Neutral);
        assert_eq!(report.average_sentiment_score, 0.0);
        assert_eq!(report.enriched_records[0].sentiment_score, Some(0.0));
    }

    #[test]
    fn test_analyze_empty_batch() {
        let aggregator = Aggregator::new(vec![], SentimentClassifier::keywords_only());
        let report = aggregator.analyze(vec![]);
        assert_eq!(report.total_count, 0);
        assert_eq!(report.average_sentiment_score, 0.0);
        assert_eq!(report.overall_sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_gather_concatenates_in_order() {
        let aggregator = Aggregator::new(
            vec![Box::new(WebSource), Box::new(EmailSource), Box::new(WebSource)],
            SentimentClassifier::keywords_only(),
        );
        let records = aggregator.gather().await;
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].user, "forum_user_123");
        assert_eq!(records[2].source, Source::Email);
        // no dedup
        assert_eq!(records[4].user, "forum_user_123");
    }

    #[test]
    fn test_compute_impact() {
        let short = labelled("bad", Sentiment::Negative);
        assert!((compute_impact(&short) - (0.49 + 0.009)).abs() < 1e-9);

        let long = labelled(&"x".repeat(250), Sentiment::Positive);
        assert!((compute_impact(&long) - (0.21 + 0.3)).abs() < 1e-9);

        let unlabelled = record("");
        assert!((compute_impact(&unlabelled) - 0.07).abs() < 1e-9);
    }

    #[test]
    fn test_extract_feature_requests_filters_and_sorts() {
        let records = vec![
            labelled("Nice app", Sentiment::Positive),
            labelled("Please add dark mode", Sentiment::Neutral),
            labelled("I need export, the current one is broken", Sentiment::Negative),
            labelled("Would like SSO SUPPORT", Sentiment::Positive),
        ];

        let ranked = extract_feature_requests(&records);
        let texts: Vec<&str> = ranked.iter().map(|c| c.record().text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "I need export, the current one is broken",
                "Would like SSO SUPPORT",
                "Please add dark mode",
            ]
        );
        assert!(ranked.iter().all(|c| c.record().impact_score.is_some()));
    }

    proptest! {
        #[test]
        fn prop_impact_monotonic_in_length(a in 0usize..200, b in 0usize..200, label in 0u8..3) {
            let sentiment = match label {
                0 => Sentiment::Positive,
                1 => Sentiment::Negative,
                _ => Sentiment::Neutral,
            };
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            let s = compute_impact(&labelled(&"y".repeat(short), sentiment));
            let l = compute_impact(&labelled(&"y".repeat(long), sentiment));
            prop_assert!(s <= l);
            prop_assert!((0.0..=1.0).contains(&l));
            if short >= 100 {
                prop_assert_eq!(s, l);
            }
        }

        #[test]
        fn prop_ranking_is_stable(labels in proptest::collection::vec(0u8..3, 0..20)) {
            // same text length per label gives heavy score ties
            let records: Vec<FeedbackRecord> = labels
                .iter()
                .enumerate()
                .map(|(i, l)| {
                    let sentiment = match l {
                        0 => Sentiment::Positive,
                        1 => Sentiment::Negative,
                        _ => Sentiment::Neutral,
                    };
                    let mut r = labelled("feature request", sentiment);
                    r.user = format!("user{i:02}");
                    r
                })
                .collect();

            let ranked = extract_feature_requests(&records);
            prop_assert_eq!(ranked.len(), records.len());
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].impact_score() >= pair[1].impact_score());
                if pair[0].impact_score() == pair[1].impact_score() {
                    prop_assert!(pair[0].record().user < pair[1].record().user);
                }
            }
        }
    }
}
