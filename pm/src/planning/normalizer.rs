//! Plan normalization
//!
//! Turns whatever the oracle produced into an ordered, non-empty list of
//! [`PlanStep`]s. The raw output is first parsed into a [`PlanShape`]; every
//! decision after that works on the shape, never on the raw JSON.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::generator::ERROR_SIGNATURES;
use super::plan::PlanStep;

/// Generic failure prefix, checked after [`ERROR_SIGNATURES`]
const ERROR_PREFIX: &str = "Error:";

/// Free-text lines containing one of these words become steps
const STEP_WORDS: &[&str] = &["step", "phase", "task", "action"];

const DEFAULT_STEPS: &[&str] = &[
    "Conduct research and analysis",
    "Generate Product Requirements Document (PRD)",
    "Create GitHub issues for tasks",
    "Notify stakeholders about the project",
];

/// The four-step plan used whenever oracle output is unusable
pub fn default_steps() -> Vec<PlanStep> {
    DEFAULT_STEPS
        .iter()
        .enumerate()
        .map(|(i, d)| PlanStep::new(format!("step_{}", i + 1), *d))
        .collect()
}

/// A step-like entry of a structured plan, before ids are settled
#[derive(Debug, Clone, PartialEq)]
pub struct StepDraft {
    pub id: Option<String>,
    pub description: String,
    pub checked: bool,
    pub editable: bool,
    pub user_modified: bool,
}

impl StepDraft {
    fn from_object(obj: &Map<String, Value>) -> Option<Self> {
        let description = obj.get("description")?.as_str()?.trim();
        if description.is_empty() {
            return None;
        }
        Some(Self {
            id: obj
                .get("id")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
            description: description.to_string(),
            checked: obj.get("checked").and_then(Value::as_bool).unwrap_or(false),
            editable: obj.get("editable").and_then(Value::as_bool).unwrap_or(true),
            user_modified: obj.get("user_modified").and_then(Value::as_bool).unwrap_or(false),
        })
    }
}

/// What the raw oracle output turned out to be
#[derive(Debug, Clone, PartialEq)]
pub enum PlanShape {
    /// Carries a template or error marker
    Rejected { marker: &'static str },
    /// A list of step-like objects (entries without a description dropped)
    Structured(Vec<StepDraft>),
    /// Anything else, as text
    FreeText(String),
}

impl PlanShape {
    pub fn parse(raw: &Value) -> Self {
        let text = match raw {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };

        let rejected = ERROR_SIGNATURES.iter().copied().chain([ERROR_PREFIX]).find(|m| text.contains(m));
        if let Some(marker) = rejected {
            return PlanShape::Rejected { marker };
        }

        match raw {
            Value::Array(items) => PlanShape::Structured(
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(StepDraft::from_object)
                    .collect(),
            ),
            _ => PlanShape::FreeText(text),
        }
    }
}

/// Normalize raw oracle output into plan steps; never returns an empty list
pub fn normalize(raw: &Value) -> Vec<PlanStep> {
    let steps = match PlanShape::parse(raw) {
        PlanShape::Rejected { marker } => {
            warn!(%marker, "normalize: output contains errors or template variables, using default steps");
            return default_steps();
        }
        PlanShape::Structured(drafts) => {
            debug!(count = drafts.len(), "normalize: structured output");
            from_drafts(drafts)
        }
        PlanShape::FreeText(text) => {
            debug!(len = text.len(), "normalize: free text output");
            from_text(&text)
        }
    };

    if steps.is_empty() {
        warn!("normalize: no steps found, using default steps");
        return default_steps();
    }
    steps
}

fn from_drafts(drafts: Vec<StepDraft>) -> Vec<PlanStep> {
    // First occurrence of a supplied id keeps it; later duplicates get a fresh one
    let mut reserved = HashSet::new();
    let keeps_id: Vec<bool> = drafts
        .iter()
        .map(|d| d.id.as_ref().is_some_and(|id| reserved.insert(id.clone())))
        .collect();

    let mut used: HashSet<String> = HashSet::new();
    drafts
        .into_iter()
        .zip(keeps_id)
        .enumerate()
        .map(|(i, (draft, keep))| {
            let id = match draft.id {
                Some(id) if keep => id,
                _ => free_id(i + 1, &reserved, &used),
            };
            used.insert(id.clone());
            PlanStep {
                id,
                description: draft.description,
                checked: draft.checked,
                editable: draft.editable,
                user_modified: draft.user_modified,
            }
        })
        .collect()
}

fn free_id(preferred: usize, reserved: &HashSet<String>, used: &HashSet<String>) -> String {
    (preferred..)
        .map(|n| format!("step_{}", n))
        .find(|id| !reserved.contains(id) && !used.contains(id))
        .unwrap_or_else(|| format!("step_{}", preferred))
}

fn from_text(text: &str) -> Vec<PlanStep> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            !line.is_empty() && STEP_WORDS.iter().any(|w| lower.contains(w))
        })
        .enumerate()
        .map(|(i, line)| PlanStep::new(format!("step_{}", i + 1), line))
        .collect()
}
