//! Plan display for the review loop

use colored::Colorize;

use crate::planning::Plan;

const RULE_WIDTH: usize = 80;

const MENU: &[(&str, &str)] = &[
    ("c", "Check/Uncheck step"),
    ("e", "Edit step description"),
    ("a", "Add new step"),
    ("s", "Skip to next step"),
    ("x", "Approve and continue"),
    ("q", "Quit"),
];

/// The plan with its steps and the action menu
pub fn render_plan(plan: &Plan) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        format!("{}", "PLAN GENERATED - PLEASE REVIEW AND MODIFY".bright_cyan().bold()),
        rule,
        format!("Original Prompt: {}", plan.original_prompt),
        String::new(),
        "Plan Steps:".bold().to_string(),
    ];

    for (i, step) in plan.steps.iter().enumerate() {
        let mark = if step.checked { "✅" } else { "◻️" };
        let modified = if step.user_modified {
            format!(" {}", "(Modified)".yellow())
        } else {
            String::new()
        };
        lines.push(format!("{}. {} {}{}", i + 1, mark, step.description, modified));
    }

    lines.push(String::new());
    lines.push("Options:".bold().to_string());
    for (key, label) in MENU {
        lines.push(format!("  [{}] {}", key.yellow(), label));
    }
    lines.join("\n")
}
