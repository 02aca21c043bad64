//! End-to-end workflow: feature selection, plan review, completion

mod controller;
mod dispatcher;
mod selection;

pub use controller::{WorkflowController, WorkflowOutcome};
pub use dispatcher::{
    CompletionDispatcher, DispatchSettings, WorkflowResults, asks_for_prd, issue_body, notification_text, prd_content,
    prd_title,
};
pub use selection::{build_feature_prompt, feature_title, load_analysis, render_candidates, select_candidate};
