//! Plan and step types

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::snapshot::{self, SnapshotError};

/// One actionable step of a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Unique within a plan, `step_<n>`
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default)]
    pub user_modified: bool,
}

fn default_editable() -> bool {
    true
}

impl PlanStep {
    /// A fresh, unchecked, editable step
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            checked: false,
            editable: true,
            user_modified: false,
        }
    }
}

/// Smallest `step_<n>` (n >= 1) not already used by `steps`
pub fn next_step_id(steps: &[PlanStep]) -> String {
    (1..)
        .map(|n| format!("step_{}", n))
        .find(|id| !steps.iter().any(|s| &s.id == id))
        .unwrap_or_else(|| format!("step_{}", steps.len() + 1))
}

/// Plan lifecycle; only ever moves forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Generated,
    Approved,
}

/// A plan under review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub original_prompt: String,
    /// Raw oracle artifact; a JSON array of steps or a string
    pub plan_output: Value,
    pub steps: Vec<PlanStep>,
    status: PlanStatus,
}

impl Plan {
    pub fn new(original_prompt: impl Into<String>, plan_output: Value, steps: Vec<PlanStep>) -> Self {
        let original_prompt = original_prompt.into();
        debug!(step_count = steps.len(), "Plan::new: called");
        Self {
            original_prompt,
            plan_output,
            steps,
            status: PlanStatus::Generated,
        }
    }

    pub fn status(&self) -> PlanStatus {
        self.status
    }

    pub fn is_approved(&self) -> bool {
        self.status == PlanStatus::Approved
    }

    /// Move to `approved`; returns false if the plan already was
    pub fn approve(&mut self) -> bool {
        if self.is_approved() {
            debug!("Plan::approve: already approved");
            return false;
        }
        self.status = PlanStatus::Approved;
        true
    }

    /// The oracle output as display text
    pub fn output_text(&self) -> String {
        match &self.plan_output {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        snapshot::write_json(path, self)?;
        info!("Saved plan ({:?}) to {}", self.status, path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        snapshot::read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> Plan {
        Plan::new(
            "Add CSV export",
            Value::String("text".to_string()),
            vec![PlanStep::new("step_1", "Research"), PlanStep::new("step_2", "Ship")],
        )
    }

    #[test]
    fn test_approve_is_one_way() {
        let mut plan = plan();
        assert_eq!(plan.status(), PlanStatus::Generated);
        assert!(plan.approve());
        assert!(plan.is_approved());
        assert!(!plan.approve());
        assert_eq!(plan.status(), PlanStatus::Approved);
    }

    #[test]
    fn test_next_step_id_fills_gaps() {
        assert_eq!(next_step_id(&[]), "step_1");

        let steps = vec![PlanStep::new("step_1", "a"), PlanStep::new("step_3", "b")];
        assert_eq!(next_step_id(&steps), "step_2");

        let steps = vec![PlanStep::new("intro", "a"), PlanStep::new("step_1", "b")];
        assert_eq!(next_step_id(&steps), "step_2");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut plan = plan();
        plan.steps[0].checked = true;
        plan.steps[1].user_modified = true;
        plan.approve();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("approved_plan.json");
        plan.save(&path).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["status"], "approved");
        assert_eq!(raw["original_prompt"], "Add CSV export");
        assert_eq!(raw["steps"][0]["id"], "step_1");

        let loaded = Plan::load(&path).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn test_step_defaults_when_deserializing() {
        let step: PlanStep = serde_json::from_str(r#"{"id": "step_9", "description": "x"}"#).unwrap();
        assert!(!step.checked);
        assert!(step.editable);
        assert!(!step.user_modified);
    }
}
