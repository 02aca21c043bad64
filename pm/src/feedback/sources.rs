//! Feedback source adapters
//!
//! The chat source reads a live channel through a [`ChatAdapter`]. The web,
//! social and email sources are static fixtures stamped with the current time.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use super::record::{FeedbackRecord, Source};
use crate::config::FeedbackConfig;
use crate::integrations::ChatAdapter;

/// A producer of feedback records
#[async_trait]
pub trait FeedbackSource: Send + Sync {
    /// Short name for logging
    fn name(&self) -> &str;

    /// Fetch records; failures yield an empty list
    async fn fetch(&self) -> Vec<FeedbackRecord>;
}

/// Messages from a chat channel
pub struct ChatSource {
    adapter: Arc<dyn ChatAdapter>,
    channel: String,
    limit: u32,
}

impl ChatSource {
    pub fn new(adapter: Arc<dyn ChatAdapter>, channel: impl Into<String>, limit: u32) -> Self {
        let channel = channel.into();
        debug!(%channel, limit, "ChatSource::new: called");
        Self {
            adapter,
            channel,
            limit,
        }
    }
}

#[async_trait]
impl FeedbackSource for ChatSource {
    fn name(&self) -> &str {
        "chat"
    }

    async fn fetch(&self) -> Vec<FeedbackRecord> {
        debug!(channel = %self.channel, "ChatSource::fetch: called");
        let messages = self.adapter.fetch_channel_messages(&self.channel, self.limit).await;
        let records: Vec<FeedbackRecord> = messages
            .into_iter()
            .map(|m| {
                FeedbackRecord::new(Source::Chat, m.user, m.text, m.timestamp)
                    .with_extra("channel", self.channel.clone())
            })
            .collect();
        info!("Found {} feedback messages in #{}", records.len(), self.channel);
        records
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

/// Forum posts and product reviews
pub struct WebSource;

#[async_trait]
impl FeedbackSource for WebSource {
    fn name(&self) -> &str {
        "web"
    }

    async fn fetch(&self) -> Vec<FeedbackRecord> {
        debug!("WebSource::fetch: called");
        vec![
            FeedbackRecord::new(
                Source::Web,
                "forum_user_123",
                "The new analytics dashboard is great but needs more export options",
                now(),
            )
            .with_extra("platform", "web_forum")
            .with_extra("url", "https://example.com/forum/thread/123"),
            FeedbackRecord::new(
                Source::Web,
                "reviewer_456",
                "Love the product! Would be perfect with better mobile support",
                now(),
            )
            .with_extra("platform", "review_site")
            .with_extra("rating", 4.5),
        ]
    }
}

/// Social media posts
pub struct SocialSource;

#[async_trait]
impl FeedbackSource for SocialSource {
    fn name(&self) -> &str {
        "social"
    }

    async fn fetch(&self) -> Vec<FeedbackRecord> {
        debug!("SocialSource::fetch: called");
        vec![
            FeedbackRecord::new(
                Source::Social,
                "@tech_enthusiast",
                "Just tried the new feature - amazing work team! #innovation",
                now(),
            )
            .with_extra("platform", "twitter")
            .with_extra("likes", 23)
            .with_extra("retweets", 5),
            FeedbackRecord::new(
                Source::Social,
                "Industry Professional",
                "Impressive update to the platform. The UI improvements are particularly noteworthy.",
                now(),
            )
            .with_extra("platform", "linkedin")
            .with_extra("reactions", 15),
        ]
    }
}

/// Customer email
pub struct EmailSource;

#[async_trait]
impl FeedbackSource for EmailSource {
    fn name(&self) -> &str {
        "email"
    }

    async fn fetch(&self) -> Vec<FeedbackRecord> {
        debug!("EmailSource::fetch: called");
        vec![
            FeedbackRecord::new(
                Source::Email,
                "customer@example.com",
                "The support team was very helpful in resolving my issue quickly.",
                now(),
            )
            .with_extra("subject", "Great support experience"),
            FeedbackRecord::new(
                Source::Email,
                "user@company.com",
                "We need better integration with our existing CRM system.",
                now(),
            )
            .with_extra("subject", "Feature request: CRM integration"),
        ]
    }
}

/// Build the configured source list, in gather order
pub fn configured_sources(config: &FeedbackConfig, chat: Option<Arc<dyn ChatAdapter>>) -> Vec<Box<dyn FeedbackSource>> {
    debug!(include_fixtures = config.include_fixtures, has_chat = chat.is_some(), "configured_sources: called");
    let mut sources: Vec<Box<dyn FeedbackSource>> = Vec::new();
    if let Some(adapter) = chat {
        sources.push(Box::new(ChatSource::new(adapter, config.channel.clone(), config.limit)));
    }
    if config.include_fixtures {
        sources.push(Box::new(WebSource));
        sources.push(Box::new(SocialSource));
        sources.push(Box::new(EmailSource));
    }
    sources
}
