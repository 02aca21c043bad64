//! Prompt Loader
//!
//! Loads prompt templates from files or falls back to embedded defaults.

use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded;

/// Context for the planning oracle system prompt
#[derive(Debug, Clone, Serialize)]
pub struct PlanPromptContext {
    pub min_steps: u32,
    pub max_steps: u32,
}

impl Default for PlanPromptContext {
    fn default() -> Self {
        Self {
            min_steps: 4,
            max_steps: 10,
        }
    }
}

/// Context for the planning goal built from a feature request
#[derive(Debug, Clone, Serialize)]
pub struct FeaturePromptContext {
    pub title: String,
    pub text: String,
    pub impact_score: String,
    pub source: String,
    pub user: String,
}

/// One approved step as listed in a PRD
#[derive(Debug, Clone, Serialize)]
pub struct PrdStep {
    pub description: String,
    pub checked: bool,
}

/// Context for the template PRD
#[derive(Debug, Clone, Serialize)]
pub struct PrdContext {
    /// Document heading
    pub heading: String,
    /// First 200 characters of the original request
    pub request_excerpt: String,
    pub steps: Vec<PrdStep>,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.pmagent/prompts/`)
    user_dir: Option<PathBuf>,
    /// Repo default directory (e.g., `prompts/`)
    repo_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a new prompt loader rooted at `base`
    ///
    /// Looks for `.pmagent/prompts/` and `prompts/` under `base`.
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        debug!(?base, "PromptLoader::new: called");
        let user_dir = base.join(".pmagent/prompts");
        let repo_dir = base.join("prompts");

        let user_dir_exists = user_dir.is_dir();
        let repo_dir_exists = repo_dir.is_dir();
        debug!(
            ?user_dir,
            %user_dir_exists,
            ?repo_dir,
            %repo_dir_exists,
            "PromptLoader::new: checking directories"
        );

        Self {
            hbs: Self::engine(),
            user_dir: if user_dir_exists { Some(user_dir) } else { None },
            repo_dir: if repo_dir_exists { Some(repo_dir) } else { None },
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            user_dir: None,
            repo_dir: None,
        }
    }

    // Prompts are plain text, not HTML
    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks in order:
    /// 1. User override: `.pmagent/prompts/{name}.pmt`
    /// 2. Repo default: `prompts/{name}.pmt`
    /// 3. Embedded fallback
    fn load_template(&self, name: &str) -> Result<String> {
        debug!(%name, "PromptLoader::load_template: called");
        for dir in [&self.user_dir, &self.repo_dir].into_iter().flatten() {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found on disk");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt {}: {}", path.display(), e));
            }
            debug!(?path, "PromptLoader::load_template: not found");
        }

        if let Some(content) = embedded::get_embedded(name) {
            debug!(%name, "PromptLoader::load_template: found in embedded");
            return Ok(content.to_string());
        }

        debug!(%name, "PromptLoader::load_template: not found anywhere");
        Err(eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, template_name: &str, context: &T) -> Result<String> {
        debug!(%template_name, "PromptLoader::render: called");
        let template = self.load_template(template_name)?;
        info!("Rendering template '{}'", template_name);

        self.hbs
            .render_template(&template, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template_name, e))
    }

    /// Render the planning oracle system prompt
    pub fn plan_prompt(&self, context: &PlanPromptContext) -> Result<String> {
        debug!("PromptLoader::plan_prompt: called");
        self.render("plan", context)
    }

    /// Render a planning goal for a selected feature request
    pub fn feature_prompt(&self, context: &FeaturePromptContext) -> Result<String> {
        debug!(title = %context.title, "PromptLoader::feature_prompt: called");
        self.render("feature", context)
    }

    /// Render the template PRD
    pub fn prd(&self, context: &PrdContext) -> Result<String> {
        debug!(heading = %context.heading, "PromptLoader::prd: called");
        self.render("prd", context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_prompt_renders_bounds() {
        let loader = PromptLoader::embedded_only();
        let prompt = loader.plan_prompt(&PlanPromptContext::default()).unwrap();
        assert!(prompt.contains("between 4 and 10 steps"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_feature_prompt_does_not_escape() {
        let loader = PromptLoader::embedded_only();
        let ctx = FeaturePromptContext {
            title: "Export to CSV & Excel".to_string(),
            text: "We'd like <b>export</b>".to_string(),
            impact_score: "0.42".to_string(),
            source: "email".to_string(),
            user: "sarah@example.com".to_string(),
        };

        let prompt = loader.feature_prompt(&ctx).unwrap();
        assert!(prompt.contains("implementing: Export to CSV & Excel"));
        assert!(prompt.contains("We'd like <b>export</b>"));
        assert!(prompt.contains("Impact Score: 0.42"));
        assert!(prompt.contains("User: sarah@example.com"));
    }

    #[test]
    fn test_prd_lists_steps() {
        let loader = PromptLoader::embedded_only();
        let ctx = PrdContext {
            heading: "Feature Implementation PRD".to_string(),
            request_excerpt: "Add a dark mode".to_string(),
            steps: vec![
                PrdStep {
                    description: "Research".to_string(),
                    checked: true,
                },
                PrdStep {
                    description: "Ship".to_string(),
                    checked: false,
                },
            ],
        };

        let prd = loader.prd(&ctx).unwrap();
        assert!(prd.starts_with("# Feature Implementation PRD"));
        assert!(prd.contains("Based on the user request: Add a dark mode..."));
        assert!(prd.contains("- [x] Research"));
        assert!(prd.contains("- [ ] Ship"));
    }

    #[test]
    fn test_user_override_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".pmagent/prompts")).unwrap();
        std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
        std::fs::write(dir.path().join(".pmagent/prompts/plan.pmt"), "user {{max_steps}}").unwrap();
        std::fs::write(dir.path().join("prompts/plan.pmt"), "repo").unwrap();
        std::fs::write(dir.path().join("prompts/feature.pmt"), "repo feature {{title}}").unwrap();

        let loader = PromptLoader::new(dir.path());
        assert_eq!(loader.plan_prompt(&PlanPromptContext::default()).unwrap(), "user 10");

        let ctx = FeaturePromptContext {
            title: "X".to_string(),
            text: String::new(),
            impact_score: "0.00".to_string(),
            source: String::new(),
            user: String::new(),
        };
        assert_eq!(loader.feature_prompt(&ctx).unwrap(), "repo feature X");
    }

    #[test]
    fn test_prompt_loader_unknown_template() {
        let loader = PromptLoader::embedded_only();
        assert!(loader.load_template("nonexistent-template").is_err());
    }
}
