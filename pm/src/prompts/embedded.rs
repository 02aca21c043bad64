//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Planning oracle system prompt
pub const PLAN: &str = include_str!("../../prompts/plan.pmt");

/// Planning goal built from a selected feature request
pub const FEATURE: &str = include_str!("../../prompts/feature.pmt");

/// Template PRD used when the plan carries no usable document
pub const PRD: &str = include_str!("../../prompts/prd.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "plan" => Some(PLAN),
        "feature" => Some(FEATURE),
        "prd" => Some(PRD),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
