//! Completion dispatcher
//!
//! Runs once a plan is approved: writes the PRD to the document store, files
//! the feature issue, notifies the team and records the outcome in
//! `workflow_results.json`. Each step fails soft; a missing adapter counts as
//! "not sent".

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::integrations::{ChatAdapter, DocumentStore, IssueRequest, IssueTracker, derive_labels};
use crate::planning::{FALLBACK_OUTPUT, Plan};
use crate::prompts::{PrdContext, PrdStep, PromptLoader};
use crate::snapshot;

const TITLE_KEYWORDS: &[&str] = &["PRD", "Product Requirements", "Feature", "Integration"];
const PROMPT_HEAD_CHARS: usize = 50;
const REQUEST_EXCERPT_CHARS: usize = 200;

/// Phrases of an oracle asking for a PRD instead of writing one
const PRD_REQUEST_PHRASES: &[&str] = &[
    "please provide the prd",
    "need the prd",
    "provide prd",
    "prd required",
    "i need the information from the prd",
];

/// Where dispatch sends things
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub doc_priority: String,
    pub issue_priority: String,
    pub assignees: Vec<String>,
    pub notify_channel: String,
    pub results_path: PathBuf,
}

/// Contents of `workflow_results.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResults {
    pub plan: Plan,
    pub status: String,
    pub prd_sent: bool,
    pub issue_url: Option<String>,
    pub notified: bool,
    pub timestamp: String,
}

/// Materializes an approved plan through the configured adapters
pub struct CompletionDispatcher {
    loader: Arc<PromptLoader>,
    settings: DispatchSettings,
    docs: Option<Arc<dyn DocumentStore>>,
    issues: Option<Arc<dyn IssueTracker>>,
    chat: Option<Arc<dyn ChatAdapter>>,
}

impl CompletionDispatcher {
    pub fn new(loader: Arc<PromptLoader>, settings: DispatchSettings) -> Self {
        debug!(results_path = ?settings.results_path, "CompletionDispatcher::new: called");
        Self {
            loader,
            settings,
            docs: None,
            issues: None,
            chat: None,
        }
    }

    pub fn with_docs(mut self, docs: Arc<dyn DocumentStore>) -> Self {
        self.docs = Some(docs);
        self
    }

    pub fn with_issues(mut self, issues: Arc<dyn IssueTracker>) -> Self {
        self.issues = Some(issues);
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatAdapter>) -> Self {
        self.chat = Some(chat);
        self
    }

    /// Dispatch an approved plan; only a failed results write is an error
    pub async fn dispatch(&self, plan: &Plan) -> Result<WorkflowResults> {
        debug!(approved = plan.is_approved(), "dispatch: called");
        let title = prd_title(&plan.original_prompt);

        info!("Generating PRD draft");
        let prd_sent = match prd_content(&self.loader, plan) {
            Ok(prd) => self.send_prd(&title, &prd).await,
            Err(e) => {
                warn!(error = %e, "dispatch: could not build PRD");
                false
            }
        };

        info!("Creating feature issue");
        let issue_url = self.file_issue(&title, plan).await;

        info!("Notifying stakeholders");
        let text = notification_text(&title, prd_sent, issue_url.as_deref(), plan.steps.len());
        let notified = self.notify(&text).await;

        if prd_sent {
            info!("Workflow completed with PRD sent");
        } else {
            warn!("Workflow completed but PRD not sent");
        }

        let results = WorkflowResults {
            plan: plan.clone(),
            status: "completed".to_string(),
            prd_sent,
            issue_url,
            notified,
            timestamp: Utc::now().to_rfc3339(),
        };
        snapshot::write_json(&self.settings.results_path, &results)
            .context("Failed to save workflow results")?;
        info!("Saved workflow results to {}", self.settings.results_path.display());
        Ok(results)
    }

    async fn send_prd(&self, title: &str, prd: &str) -> bool {
        let Some(docs) = &self.docs else {
            warn!("send_prd: document store not configured, PRD not sent");
            return false;
        };
        let Some(page_id) = docs.create_page(title, &self.settings.doc_priority).await else {
            return false;
        };
        let sent = docs.append_content(&page_id, prd).await;
        if sent {
            info!(%page_id, "PRD sent to document store");
        }
        sent
    }

    async fn file_issue(&self, title: &str, plan: &Plan) -> Option<String> {
        let Some(issues) = &self.issues else {
            warn!("file_issue: issue tracker not configured, no issue created");
            return None;
        };
        let request = IssueRequest {
            title: format!("Feature: {}", title),
            body: issue_body(plan),
            labels: derive_labels(title, &self.settings.issue_priority),
            assignees: self.settings.assignees.clone(),
        };
        issues.create_issue(request).await.map(|issue| issue.url)
    }

    async fn notify(&self, text: &str) -> bool {
        let Some(chat) = &self.chat else {
            warn!("notify: chat not configured, no notification sent");
            return false;
        };
        chat.send_message(&self.settings.notify_channel, text).await
    }
}

fn head(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// `"{keyword} - {first 50 chars of prompt}..."`
pub fn prd_title(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    let keyword = TITLE_KEYWORDS
        .iter()
        .copied()
        .find(|k| lower.contains(&k.to_lowercase()))
        .unwrap_or("PRD");
    format!("{} - {}...", keyword, head(prompt.trim(), PROMPT_HEAD_CHARS))
}

/// True when the oracle asked for a PRD rather than producing one
pub fn asks_for_prd(text: &str) -> bool {
    let lower = text.to_lowercase();
    PRD_REQUEST_PHRASES.iter().any(|p| lower.contains(p))
}

/// PRD text for a plan: the oracle's prose plus a step checklist, or the
/// template PRD when the oracle gave no usable prose
pub fn prd_content(loader: &PromptLoader, plan: &Plan) -> Result<String> {
    let steps: Vec<PrdStep> = plan
        .steps
        .iter()
        .map(|s| PrdStep {
            description: s.description.clone(),
            checked: s.checked,
        })
        .collect();

    let prose = match &plan.plan_output {
        Value::String(s) => s.trim(),
        _ => "",
    };
    if prose.is_empty() || prose == FALLBACK_OUTPUT || asks_for_prd(prose) {
        debug!("prd_content: using template PRD");
        let request = plan.original_prompt.to_lowercase();
        let heading = if request.contains("slack") && request.contains("integration") {
            "Slack Integration PRD"
        } else if request.contains("feature") {
            "Feature Implementation PRD"
        } else {
            "Product Requirements Document"
        };
        return loader.prd(&PrdContext {
            heading: heading.to_string(),
            request_excerpt: head(plan.original_prompt.trim(), REQUEST_EXCERPT_CHARS),
            steps,
        });
    }

    let mut prd = prose.to_string();
    prd.push_str("\n\n## Approved Steps\n");
    for step in &steps {
        prd.push_str(&format!("- [{}] {}\n", if step.checked { "x" } else { " " }, step.description));
    }
    Ok(prd)
}

/// Issue body: the plan as a checklist plus standard acceptance criteria
pub fn issue_body(plan: &Plan) -> String {
    let mut body = String::from("## Feature Description\n");
    body.push_str(plan.original_prompt.trim());
    body.push_str("\n\n## Plan\n");
    for step in &plan.steps {
        body.push_str(&format!("- [{}] {}\n", if step.checked { "x" } else { " " }, step.description));
    }
    body.push_str(
        "\n## Acceptance Criteria\n\
         - [ ] Functionality works as described\n\
         - [ ] Performance meets requirements\n\
         - [ ] UI/UX meets design standards\n\
         - [ ] Documentation is complete\n\
         - [ ] Testing coverage is adequate\n\
         \n## Additional Context\n\
         This issue was generated from an approved product plan.\n",
    );
    body
}

/// Chat summary of what dispatch did
pub fn notification_text(title: &str, prd_sent: bool, issue_url: Option<&str>, step_count: usize) -> String {
    let prd = if prd_sent { "PRD published" } else { "PRD not published" };
    let issue = issue_url.map_or_else(|| "no issue created".to_string(), |url| format!("issue: {}", url));
    format!("Plan approved: {} ({} steps). {}, {}.", title, step_count, prd, issue)
}
