//! Feature selection front-end
//!
//! Lists the ranked feature requests from a feedback analysis, lets the user
//! pick one and turns it into a planning goal.

use std::path::Path;

use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use crate::feedback::{FeedbackAnalysis, RankedCandidate};
use crate::prompts::{FeaturePromptContext, PromptLoader};
use crate::review::{PromptError, Prompter};

const TITLE_CHARS: usize = 50;
const DEFAULT_TITLE: &str = "New Feature Request";

/// Load `feedback_analysis.json`
pub fn load_analysis(path: &Path) -> Result<FeedbackAnalysis> {
    debug!(?path, "load_analysis: called");
    FeedbackAnalysis::load(path).with_context(|| format!("Failed to load feature requests from {}", path.display()))
}

/// Short display title: the first non-empty line that is not a quote
pub fn feature_title(text: &str) -> String {
    let Some(line) = text
        .lines()
        .find(|l| !l.trim().is_empty() && !l.starts_with('>'))
        .map(str::trim)
    else {
        return DEFAULT_TITLE.to_string();
    };

    if line.chars().count() > TITLE_CHARS {
        let head: String = line.chars().take(TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        line.to_string()
    }
}

/// Numbered candidate list with impact, source and user
pub fn render_candidates(candidates: &[RankedCandidate]) -> String {
    let rule = "=".repeat(60);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        format!("{}", "FEATURE SELECTION".bright_cyan().bold()),
        rule,
    ];
    for (i, candidate) in candidates.iter().enumerate() {
        let record = candidate.record();
        lines.push(format!(
            "{}. {} (Impact Score: {:.2})",
            i + 1,
            feature_title(&record.text),
            candidate.impact_score()
        ));
        lines.push(format!("   Source: {}", record.source));
        lines.push(format!("   User: {}", record.user));
        lines.push(String::new());
    }
    lines.join("\n")
}

/// Ask for a candidate number; `None` when the user quits or gives up
///
/// Bad input re-asks, at most `max_invalid` times in a row.
pub fn select_candidate<'a, P: Prompter + ?Sized>(
    prompter: &mut P,
    candidates: &'a [RankedCandidate],
    max_invalid: u32,
) -> Result<Option<&'a RankedCandidate>, PromptError> {
    debug!(count = candidates.len(), "select_candidate: called");
    if candidates.is_empty() {
        warn!("select_candidate: no feature requests to choose from");
        return Ok(None);
    }

    let prompt = format!(
        "\nSelect a feature number to continue (1-{}), or 'q' to quit: ",
        candidates.len()
    );
    for attempt in 1..=max_invalid.max(1) {
        let line = prompter.read_line(&prompt)?;
        let choice = line.trim();
        if choice.eq_ignore_ascii_case("q") {
            info!("Feature selection cancelled");
            return Ok(None);
        }
        match choice.parse::<usize>() {
            Ok(n) if (1..=candidates.len()).contains(&n) => {
                let selected = &candidates[n - 1];
                info!(number = n, "Feature selected");
                println!("{} Selected: {}", "✓".green(), feature_title(&selected.record().text));
                return Ok(Some(selected));
            }
            Ok(_) => println!("{}", "Invalid selection. Please try again.".red()),
            Err(_) => println!("{}", "Invalid input. Please enter a number.".red()),
        }
        warn!(attempt, input = %choice, "select_candidate: invalid selection");
    }
    println!("{}", "Too many invalid selections.".yellow());
    Ok(None)
}

/// The planning goal for a selected feature request
pub fn build_feature_prompt(loader: &PromptLoader, candidate: &RankedCandidate) -> Result<String> {
    let record = candidate.record();
    debug!(user = %record.user, "build_feature_prompt: called");
    loader.feature_prompt(&FeaturePromptContext {
        title: feature_title(&record.text),
        text: record.text.clone(),
        impact_score: format!("{:.3}", candidate.impact_score()),
        source: record.source.to_string(),
        user: record.user.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::{FeedbackRecord, Source};
    use crate::testing::ScriptedPrompter;

    fn candidates() -> Vec<RankedCandidate> {
        vec![
            RankedCandidate::new(
                FeedbackRecord::new(Source::Email, "sarah@example.com", "We need CRM integration", "t"),
                0.559,
            ),
            RankedCandidate::new(
                FeedbackRecord::new(Source::Social, "@tech_lead", "Would like an API for exports", "t"),
                0.3,
            ),
        ]
    }

    #[test]
    fn test_feature_title() {
        assert_eq!(feature_title("Add dark mode\nmore detail"), "Add dark mode");
        assert_eq!(feature_title("> quoted reply\n\n  Export to PDF  "), "Export to PDF");
        assert_eq!(feature_title(""), DEFAULT_TITLE);
        assert_eq!(feature_title("> only a quote"), DEFAULT_TITLE);

        let long = "a".repeat(60);
        assert_eq!(feature_title(&long), format!("{}...", "a".repeat(50)));
        assert_eq!(feature_title(&"b".repeat(50)), "b".repeat(50));
    }

    #[test]
    fn test_render_candidates() {
        colored::control::set_override(false);
        let out = render_candidates(&candidates());
        assert!(out.contains("1. We need CRM integration (Impact Score: 0.56)"));
        assert!(out.contains("   Source: email"));
        assert!(out.contains("2. Would like an API for exports (Impact Score: 0.30)"));
    }

    #[test]
    fn test_select_candidate() {
        let list = candidates();

        let mut prompter = ScriptedPrompter::new(["x", "7", "2"]);
        let picked = select_candidate(&mut prompter, &list, 5).unwrap().unwrap();
        assert_eq!(picked.record().user, "@tech_lead");

        let mut prompter = ScriptedPrompter::new(["Q"]);
        assert!(select_candidate(&mut prompter, &list, 5).unwrap().is_none());

        let mut prompter = ScriptedPrompter::new(["x", "x", "1"]);
        assert!(select_candidate(&mut prompter, &list, 2).unwrap().is_none());

        let mut prompter = ScriptedPrompter::new(["1"]);
        assert!(select_candidate(&mut prompter, &[], 5).unwrap().is_none());
        assert_eq!(prompter.remaining(), 1);
    }

    #[test]
    fn test_build_feature_prompt() {
        let list = candidates();
        let prompt = build_feature_prompt(&PromptLoader::embedded_only(), &list[0]).unwrap();
        assert!(prompt.contains("implementing: We need CRM integration"));
        assert!(prompt.contains("Impact Score: 0.559"));
        assert!(prompt.contains("Source: email"));
        assert!(prompt.contains("5. Timeline and milestones"));
    }

    #[test]
    fn test_load_analysis_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_analysis(&dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ not json").unwrap();
        assert!(load_analysis(&bad).is_err());

        let minimal = dir.path().join("minimal.json");
        std::fs::write(&minimal, r#"{"feature_requests": []}"#).unwrap();
        assert!(load_analysis(&minimal).unwrap().feature_requests.is_empty());
    }
}
