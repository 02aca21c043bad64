//! Issue tracker adapter (GitHub REST API)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info};

use super::{IntegrationError, check_status, http_client};
use crate::config::ResolvedIssuesConfig;

const SERVICE: &str = "github";

const FRONTEND_WORDS: &[&str] = &["ui", "interface", "design"];
const BACKEND_WORDS: &[&str] = &["api", "integration", "backend"];
const MOBILE_WORDS: &[&str] = &["mobile", "app"];

/// Four-level issue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Case-insensitive; anything unrecognised is `Low`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "critical" => Priority::Critical,
            "high" => Priority::High,
            "medium" => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Capitalised form for select options
    pub fn display_name(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

/// Labels for a feature issue: base pair, one priority label, area labels
pub fn derive_labels(title: &str, priority: &str) -> Vec<String> {
    let mut labels = vec![
        "enhancement".to_string(),
        "feature-request".to_string(),
        format!("priority: {}", Priority::parse(priority).as_str()),
    ];

    let lower = title.to_lowercase();
    let mentions = |keys: &[&str]| keys.iter().any(|k| lower.contains(k));

    if mentions(FRONTEND_WORDS) {
        labels.push("frontend".to_string());
    }
    if mentions(BACKEND_WORDS) {
        labels.push("backend".to_string());
    }
    if mentions(MOBILE_WORDS) {
        labels.push("mobile".to_string());
    }
    labels
}

/// A new issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRequest {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// A created issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub state: String,
    pub created_at: String,
}

/// Issue object as returned by the REST API
#[derive(Debug, Deserialize)]
struct GitHubIssue {
    id: u64,
    number: u64,
    title: String,
    html_url: String,
    state: String,
    created_at: String,
}

impl From<GitHubIssue> for IssueRecord {
    fn from(issue: GitHubIssue) -> Self {
        Self {
            id: issue.id,
            number: issue.number,
            title: issue.title,
            url: issue.html_url,
            state: issue.state,
            created_at: issue.created_at,
        }
    }
}

/// Create issues in a tracker
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, request: IssueRequest) -> Option<IssueRecord>;
}

/// GitHub client bound to one repository
pub struct GitHubClient {
    http: Client,
    token: String,
    owner: String,
    repo: String,
    base_url: String,
}

impl GitHubClient {
    pub fn from_config(config: &ResolvedIssuesConfig) -> Result<Self, IntegrationError> {
        debug!(owner = %config.owner, repo = %config.repo, "GitHubClient::from_config: called");
        Ok(Self {
            http: http_client()?,
            token: config.token.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn create(&self, request: &IssueRequest) -> Result<IssueRecord, IntegrationError> {
        let url = format!("{}/repos/{}/{}/issues", self.base_url, self.owner, self.repo);
        let labels = if request.labels.is_empty() {
            vec!["enhancement".to_string()]
        } else {
            request.labels.clone()
        };
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&json!({
                "title": request.title,
                "body": request.body,
                "labels": labels,
                "assignees": request.assignees,
            }))
            .send()
            .await?;
        let issue: GitHubIssue = check_status(SERVICE, response).await?.json().await?;
        Ok(issue.into())
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn create_issue(&self, request: IssueRequest) -> Option<IssueRecord> {
        debug!(title = %request.title, labels = ?request.labels, "GitHubClient::create_issue: called");
        match self.create(&request).await {
            Ok(issue) => {
                info!(number = issue.number, url = %issue.url, "Created issue");
                Some(issue)
            }
            Err(e) => {
                error!(error = %e, "Failed to create issue");
                None
            }
        }
    }
}
