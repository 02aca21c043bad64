//! Approval state machine
//!
//! A [`ReviewSession`] owns the plan under review and applies one
//! [`ReviewAction`] at a time. Rejected actions leave the plan untouched.

use thiserror::Error;
use tracing::{debug, info};

use super::action::ReviewAction;
use crate::planning::{Plan, PlanStep, next_step_id};

/// Why an action was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Invalid step number {number} (plan has {len} steps)")]
    OutOfRange { number: usize, len: usize },

    #[error("Step description cannot be empty")]
    EmptyText,

    #[error("Plan is already approved")]
    AlreadyApproved,
}

/// What an accepted action did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Toggled { index: usize, checked: bool },
    Edited { index: usize },
    Added { id: String },
    Skipped,
    Approved,
    Quit,
}

impl Transition {
    /// Approval and quit end the review loop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Transition::Approved | Transition::Quit)
    }
}

/// A plan under human review
#[derive(Debug, Clone)]
pub struct ReviewSession {
    plan: Plan,
}

impl ReviewSession {
    pub fn new(plan: Plan) -> Self {
        debug!(step_count = plan.steps.len(), "ReviewSession::new: called");
        Self { plan }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn into_plan(self) -> Plan {
        self.plan
    }

    /// Apply one action; on error nothing changed
    pub fn apply(&mut self, action: ReviewAction) -> Result<Transition, ReviewError> {
        debug!(?action, "apply: called");
        if self.plan.is_approved() && action != ReviewAction::Quit {
            return Err(ReviewError::AlreadyApproved);
        }

        match action {
            ReviewAction::Toggle(index) => {
                let step = self.step_mut(index)?;
                step.checked = !step.checked;
                let checked = step.checked;
                info!(step = index + 1, checked, "Step toggled");
                Ok(Transition::Toggled { index, checked })
            }
            ReviewAction::Edit { index, text } => {
                let len = self.plan.steps.len();
                let step = self.plan.steps.get(index).ok_or(ReviewError::OutOfRange {
                    number: index + 1,
                    len,
                })?;
                let text = non_empty(&text)?;
                debug!(old = %step.description, "apply: editing step");
                let step = self.step_mut(index)?;
                step.description = text;
                step.user_modified = true;
                info!(step = index + 1, "Step updated");
                Ok(Transition::Edited { index })
            }
            ReviewAction::Add(text) => {
                let text = non_empty(&text)?;
                let id = next_step_id(&self.plan.steps);
                let mut step = PlanStep::new(id.clone(), text);
                step.user_modified = true;
                self.plan.steps.push(step);
                info!(%id, "Step added");
                Ok(Transition::Added { id })
            }
            ReviewAction::Skip => {
                debug!("apply: skip");
                Ok(Transition::Skipped)
            }
            ReviewAction::Approve => {
                if !self.plan.approve() {
                    return Err(ReviewError::AlreadyApproved);
                }
                info!("Plan approved");
                Ok(Transition::Approved)
            }
            ReviewAction::Quit => Ok(Transition::Quit),
        }
    }

    fn step_mut(&mut self, index: usize) -> Result<&mut PlanStep, ReviewError> {
        let len = self.plan.steps.len();
        self.plan
            .steps
            .get_mut(index)
            .ok_or(ReviewError::OutOfRange { number: index + 1, len })
    }
}

fn non_empty(text: &str) -> Result<String, ReviewError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ReviewError::EmptyText);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planning::{PlanStatus, fallback_plan};

    fn session() -> ReviewSession {
        ReviewSession::new(fallback_plan("Add CSV export"))
    }

    #[test]
    fn test_toggle_flips_only_addressed_step() {
        let mut s = session();
        let before = s.plan().steps.clone();

        let t = s.apply(ReviewAction::Toggle(0)).unwrap();
        assert_eq!(t, Transition::Toggled { index: 0, checked: true });
        assert!(s.plan().steps[0].checked);
        assert_eq!(&s.plan().steps[1..], &before[1..]);
        assert_eq!(s.plan().status(), PlanStatus::Generated);

        s.apply(ReviewAction::Toggle(0)).unwrap();
        assert!(!s.plan().steps[0].checked);
    }

    #[test]
    fn test_out_of_range_is_rejected_without_mutation() {
        let mut s = session();
        let before = s.plan().clone();

        assert_eq!(
            s.apply(ReviewAction::Toggle(4)),
            Err(ReviewError::OutOfRange { number: 5, len: 4 })
        );
        assert!(matches!(
            s.apply(ReviewAction::Edit {
                index: 9,
                text: "x".into()
            }),
            Err(ReviewError::OutOfRange { .. })
        ));
        assert_eq!(s.plan(), &before);
    }

    #[test]
    fn test_edit_with_empty_text_changes_nothing() {
        let mut s = session();
        let before = s.plan().clone();

        for text in ["", "   \t"] {
            let result = s.apply(ReviewAction::Edit {
                index: 1,
                text: text.to_string(),
            });
            assert_eq!(result, Err(ReviewError::EmptyText));
        }
        assert!(!s.plan().steps[1].user_modified);
        assert_eq!(s.plan(), &before);
    }

    #[test]
    fn test_edit_sets_description_and_flag() {
        let mut s = session();
        s.apply(ReviewAction::Edit {
            index: 1,
            text: "  Write the PRD with legal  ".to_string(),
        })
        .unwrap();

        let step = &s.plan().steps[1];
        assert_eq!(step.description, "Write the PRD with legal");
        assert!(step.user_modified);
        assert_eq!(step.id, "step_2");
    }

    #[test]
    fn test_add_appends_with_fresh_id() {
        let mut s = session();
        let t = s.apply(ReviewAction::Add("Schedule review meeting".into())).unwrap();
        assert_eq!(t, Transition::Added { id: "step_5".into() });

        let last = s.plan().steps.last().unwrap();
        assert_eq!(last.description, "Schedule review meeting");
        assert!(last.user_modified && last.editable && !last.checked);

        assert_eq!(s.apply(ReviewAction::Add(" ".into())), Err(ReviewError::EmptyText));
        assert_eq!(s.plan().steps.len(), 5);
    }

    #[test]
    fn test_skip_is_a_no_op() {
        let mut s = session();
        let before = s.plan().clone();
        assert_eq!(s.apply(ReviewAction::Skip), Ok(Transition::Skipped));
        assert_eq!(s.plan(), &before);
    }

    #[test]
    fn test_approve_is_terminal() {
        let mut s = session();
        let t = s.apply(ReviewAction::Approve).unwrap();
        assert!(t.is_terminal());
        assert!(s.plan().is_approved());

        assert_eq!(s.apply(ReviewAction::Approve), Err(ReviewError::AlreadyApproved));
        assert_eq!(s.apply(ReviewAction::Toggle(0)), Err(ReviewError::AlreadyApproved));
        assert!(!s.plan().steps[0].checked);
        assert_eq!(s.plan().status(), PlanStatus::Approved);
    }

    #[test]
    fn test_quit_leaves_plan_alone() {
        let mut s = session();
        let t = s.apply(ReviewAction::Quit).unwrap();
        assert!(t.is_terminal());
        assert_eq!(s.plan().status(), PlanStatus::Generated);
    }
}
