//! pmagent configuration types and loading
//!
//! Nothing here reads the process environment directly. Secrets are pulled in
//! by [`Config::resolve`] through an injected lookup so tests stay
//! deterministic.

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main pmagent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Planning oracle (LLM) configuration
    pub oracle: OracleConfig,

    /// Sentiment classifier configuration
    pub sentiment: SentimentConfig,

    /// Feedback gathering configuration
    pub feedback: FeedbackConfig,

    /// Chat platform (Slack) configuration
    pub chat: ChatConfig,

    /// Document store (Notion) configuration
    pub docs: DocsConfig,

    /// Issue tracker (GitHub) configuration
    pub issues: IssuesConfig,

    /// Snapshot file locations
    pub output: OutputConfig,

    /// Review loop configuration
    pub review: ReviewConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// 1. explicit path (errors are fatal)
    /// 2. `./.pmagent.yml`
    /// 3. `~/.config/pmagent/pmagent.yml`
    /// 4. defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".pmagent.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("pmagent").join("pmagent.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolve credentials through `lookup` and produce the runtime configuration
    ///
    /// A missing oracle key is fatal. Missing chat/docs/issues credentials
    /// leave that adapter unconfigured.
    pub fn resolve<F>(&self, lookup: F) -> Result<ResolvedConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        debug!("Config::resolve: called");
        let api_key = lookup(&self.oracle.api_key_env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                eyre!(
                    "Planning oracle API key not found. Set the {} environment variable.",
                    self.oracle.api_key_env
                )
            })?;

        let oracle = ResolvedLlmConfig {
            provider: self.oracle.provider.clone(),
            model: self.oracle.model.clone(),
            api_key,
            base_url: self.oracle.base_url.clone(),
            max_tokens: self.oracle.max_tokens,
            timeout_ms: self.oracle.timeout_ms,
        };

        Ok(ResolvedConfig {
            oracle,
            chat: self.resolve_chat(&lookup),
            docs: self.resolve_docs(&lookup),
            issues: self.resolve_issues(&lookup),
        })
    }

    /// Resolve only the chat credentials (used by `analyze`, which needs no oracle)
    pub fn resolve_chat<F>(&self, lookup: F) -> Option<ResolvedChatConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        match non_empty(lookup(&self.chat.token_env)) {
            Some(token) => Some(ResolvedChatConfig {
                token,
                base_url: self.chat.base_url.clone(),
            }),
            None => {
                debug!(env = %self.chat.token_env, "resolve_chat: no token, chat unconfigured");
                None
            }
        }
    }

    fn resolve_docs<F>(&self, lookup: F) -> Option<ResolvedDocsConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_empty(lookup(&self.docs.token_env));
        let database_id = non_empty(self.docs.database_id.clone());
        match (token, database_id) {
            (Some(token), Some(database_id)) => Some(ResolvedDocsConfig {
                token,
                database_id,
                base_url: self.docs.base_url.clone(),
            }),
            _ => {
                debug!("resolve_docs: token or database id missing, docs unconfigured");
                None
            }
        }
    }

    fn resolve_issues<F>(&self, lookup: F) -> Option<ResolvedIssuesConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = non_empty(lookup(&self.issues.token_env));
        let owner = non_empty(self.issues.owner.clone());
        let repo = non_empty(self.issues.repo.clone());
        match (token, owner, repo) {
            (Some(token), Some(owner), Some(repo)) => Some(ResolvedIssuesConfig {
                token,
                owner,
                repo,
                base_url: self.issues.base_url.clone(),
            }),
            _ => {
                debug!("resolve_issues: token, owner or repo missing, issues unconfigured");
                None
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Planning oracle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Provider name ("anthropic" or "openai")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Attempts before falling back to the default plan
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 4096,
            timeout_ms: 120_000,
            max_attempts: 3,
        }
    }
}

/// Which sentiment path the classifier runs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentEngine {
    /// Lexicon polarity with keyword fallback
    #[default]
    Lexicon,
    /// Keyword vote only
    Keywords,
}

/// Sentiment classifier configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub engine: SentimentEngine,
}

/// Feedback gathering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Chat channel to read feedback from
    pub channel: String,

    /// Maximum chat messages to fetch
    pub limit: u32,

    /// Include the static web/social/email sources
    #[serde(rename = "include-fixtures")]
    pub include_fixtures: bool,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            channel: "feedback-and-issues".to_string(),
            limit: 100,
            include_fixtures: true,
        }
    }
}

/// Chat platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Channel that receives completion notifications
    #[serde(rename = "notify-channel")]
    pub notify_channel: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            token_env: "SLACK_BOT_TOKEN".to_string(),
            base_url: "https://slack.com/api".to_string(),
            notify_channel: "product-updates".to_string(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Environment variable containing the integration token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Database that receives PRD pages
    #[serde(rename = "database-id")]
    pub database_id: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Priority recorded on created pages
    pub priority: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            token_env: "NOTION_API_KEY".to_string(),
            database_id: None,
            base_url: "https://api.notion.com".to_string(),
            priority: "medium".to_string(),
        }
    }
}

/// Issue tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IssuesConfig {
    /// Environment variable containing the access token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Repository owner
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Priority label applied to created issues
    pub priority: String,

    /// Users assigned to created issues
    pub assignees: Vec<String>,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        Self {
            token_env: "GITHUB_TOKEN".to_string(),
            owner: None,
            repo: None,
            base_url: "https://api.github.com".to_string(),
            priority: "medium".to_string(),
            assignees: Vec::new(),
        }
    }
}

/// Snapshot file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding all snapshots
    pub dir: PathBuf,

    #[serde(rename = "analysis-file")]
    pub analysis_file: String,

    #[serde(rename = "plan-file")]
    pub plan_file: String,

    #[serde(rename = "results-file")]
    pub results_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            analysis_file: "feedback_analysis.json".to_string(),
            plan_file: "approved_plan.json".to_string(),
            results_file: "workflow_results.json".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn analysis_path(&self) -> PathBuf {
        self.dir.join(&self.analysis_file)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.dir.join(&self.plan_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(&self.results_file)
    }
}

/// Review loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Consecutive bad action selectors before the reader gives up and skips
    #[serde(rename = "max-invalid-inputs")]
    pub max_invalid_inputs: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self { max_invalid_inputs: 5 }
    }
}

/// Runtime configuration with secrets resolved
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub oracle: ResolvedLlmConfig,
    pub chat: Option<ResolvedChatConfig>,
    pub docs: Option<ResolvedDocsConfig>,
    pub issues: Option<ResolvedIssuesConfig>,
}

/// LLM client settings with the API key in hand
#[derive(Debug, Clone)]
pub struct ResolvedLlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ResolvedChatConfig {
    pub token: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedDocsConfig {
    pub token: String,
    pub database_id: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedIssuesConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub base_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.oracle.provider, "anthropic");
        assert_eq!(config.oracle.max_attempts, 3);
        assert_eq!(config.feedback.channel, "feedback-and-issues");
        assert_eq!(config.feedback.limit, 100);
        assert_eq!(config.review.max_invalid_inputs, 5);
        assert_eq!(config.sentiment.engine, SentimentEngine::Lexicon);
        assert_eq!(config.output.plan_path(), PathBuf::from("./approved_plan.json"));
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
oracle:
  provider: openai
  model: gpt-4o
  api-key-env: MY_KEY
  max-attempts: 5

sentiment:
  engine: keywords

issues:
  owner: acme
  repo: widgets
  assignees: [alice]

output:
  dir: /tmp/pm
  plan-file: plan.json

log-level: DEBUG
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.oracle.provider, "openai");
        assert_eq!(config.oracle.api_key_env, "MY_KEY");
        assert_eq!(config.oracle.max_attempts, 5);
        assert_eq!(config.sentiment.engine, SentimentEngine::Keywords);
        assert_eq!(config.issues.owner.as_deref(), Some("acme"));
        assert_eq!(config.issues.assignees, vec!["alice".to_string()]);
        assert_eq!(config.output.plan_path(), PathBuf::from("/tmp/pm/plan.json"));
        assert_eq!(config.output.results_file, "workflow_results.json");
        assert_eq!(config.log_level.as_deref(), Some("DEBUG"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
oracle:
  model: claude-haiku
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.oracle.model, "claude-haiku");
        assert_eq!(config.oracle.provider, "anthropic");
        assert_eq!(config.oracle.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.chat.notify_channel, "product-updates");
    }

    #[test]
    fn test_resolve_requires_oracle_key() {
        let config = Config::default();
        let err = config.resolve(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));

        let err = config.resolve(lookup_from(&[("ANTHROPIC_API_KEY", "  ")])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_resolve_leaves_missing_adapters_unconfigured() {
        let config = Config::default();
        let resolved = config.resolve(lookup_from(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();

        assert_eq!(resolved.oracle.api_key, "sk-test");
        assert!(resolved.chat.is_none());
        assert!(resolved.docs.is_none());
        assert!(resolved.issues.is_none());
    }

    #[test]
    fn test_resolve_configures_adapters() {
        let mut config = Config::default();
        config.docs.database_id = Some("db-1".to_string());
        config.issues.owner = Some("acme".to_string());
        config.issues.repo = Some("widgets".to_string());

        let resolved = config
            .resolve(lookup_from(&[
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("SLACK_BOT_TOKEN", "xoxb"),
                ("NOTION_API_KEY", "secret"),
                ("GITHUB_TOKEN", "ghp"),
            ]))
            .unwrap();

        assert_eq!(resolved.chat.map(|c| c.token), Some("xoxb".to_string()));
        assert_eq!(resolved.docs.map(|d| d.database_id), Some("db-1".to_string()));
        assert_eq!(resolved.issues.map(|i| i.repo), Some("widgets".to_string()));
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pm.yml");
        fs::write(&path, "review:\n  max-invalid-inputs: 2\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.review.max_invalid_inputs, 2);

        let missing = dir.path().join("missing.yml");
        assert!(Config::load(Some(&missing)).is_err());
    }
}
