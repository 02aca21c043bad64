//! pm - feedback prioritization and plan approval
//!
//! CLI entry point: analyze feedback, select a feature, review and approve a plan.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use pmagent::cli::{Cli, Command, generate_after_help, get_log_path};
use pmagent::config::{Config, ResolvedConfig};
use pmagent::feedback::{Aggregator, FeedbackAnalysis, SentimentClassifier, configured_sources};
use pmagent::integrations::{ChatAdapter, GitHubClient, NotionClient, SlackClient};
use pmagent::llm::create_client;
use pmagent::planning::{LlmPlanOracle, PlanGenerator};
use pmagent::prompts::PromptLoader;
use pmagent::review::{Prompter, ReadlinePrompter};
use pmagent::workflow::{
    CompletionDispatcher, DispatchSettings, WorkflowController, WorkflowOutcome, build_feature_prompt, load_analysis,
    render_candidates, select_candidate,
};

const DEFAULT_GOAL: &str = "Create a comprehensive product development plan for a new AI feature based on user feedback";

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.oracle.provider, model = %config.oracle.model, "pm loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Analyze { output, no_fixtures }) => cmd_analyze(&config, output, no_fixtures).await,
        Some(Command::Select { analysis }) => cmd_select(&config, analysis).await,
        Some(Command::Plan { goal }) => cmd_plan(&config, goal).await,
        None => {
            debug!("main: no command specified, running plan workflow");
            cmd_plan(&config, None).await
        }
    }
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn chat_adapter(config: &Config) -> Option<Arc<dyn ChatAdapter>> {
    let resolved = config.resolve_chat(env_lookup)?;
    match SlackClient::from_config(&resolved) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "chat_adapter: could not create chat client");
            None
        }
    }
}

/// Gather, classify and rank feedback, then write the analysis snapshot
async fn cmd_analyze(config: &Config, output: Option<PathBuf>, no_fixtures: bool) -> Result<()> {
    debug!(?output, no_fixtures, "cmd_analyze: called");
    let mut feedback = config.feedback.clone();
    if no_fixtures {
        feedback.include_fixtures = false;
    }

    let chat = chat_adapter(config);
    if chat.is_none() {
        warn!("cmd_analyze: chat not configured, skipping chat feedback");
    }
    let aggregator = Aggregator::new(
        configured_sources(&feedback, chat),
        SentimentClassifier::from_config(&config.sentiment),
    );

    println!("{} Gathering feedback...", "→".bright_blue());
    let records = aggregator.gather().await;
    let report = aggregator.analyze(records);
    let analysis = FeedbackAnalysis::from_report(&report);

    let dist = &analysis.sentiment_distribution;
    println!();
    println!("{}", "Feedback Summary".bright_cyan().bold());
    println!("  Total feedback:    {}", analysis.total_feedback);
    println!(
        "  Sentiment:         {} positive, {} negative, {} neutral",
        dist.positive.to_string().green(),
        dist.negative.to_string().red(),
        dist.neutral
    );
    println!("  Overall sentiment: {}", analysis.overall_sentiment);
    println!("  Average score:     {:.3}", analysis.average_sentiment_score);
    println!("  Feature requests:  {}", analysis.feature_requests.len());

    if !analysis.feature_requests.is_empty() {
        println!("{}", render_candidates(&analysis.feature_requests[..analysis.feature_requests.len().min(5)]));
    }

    let path = output.unwrap_or_else(|| config.output.analysis_path());
    analysis.save(&path).context("Failed to save feedback analysis")?;
    println!("{} Analysis saved to {}", "✓".green(), path.display());
    Ok(())
}

/// Choose a ranked feature request and run the plan workflow for it
async fn cmd_select(config: &Config, analysis: Option<PathBuf>) -> Result<()> {
    debug!(?analysis, "cmd_select: called");
    let resolved = config.resolve(env_lookup)?;
    let path = analysis.unwrap_or_else(|| config.output.analysis_path());
    let analysis = load_analysis(&path)?;

    let mut prompter = ReadlinePrompter::new().context("Failed to initialize readline")?;
    println!("{}", render_candidates(&analysis.feature_requests));

    let selected = match select_candidate(&mut prompter, &analysis.feature_requests, config.review.max_invalid_inputs) {
        Ok(Some(candidate)) => candidate,
        Ok(None) => {
            println!("No feature selected. Workflow terminated.");
            return Ok(());
        }
        Err(e) if e.is_quit() => {
            println!("\nExiting...");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to read selection"),
    };

    let loader = Arc::new(PromptLoader::new("."));
    let goal = build_feature_prompt(&loader, selected)?;
    run_workflow(config, &resolved, loader, &goal, &mut prompter).await
}

/// Run the plan workflow for a goal, asking for one when not given
async fn cmd_plan(config: &Config, goal: Option<String>) -> Result<()> {
    debug!(?goal, "cmd_plan: called");
    let resolved = config.resolve(env_lookup)?;
    let mut prompter = ReadlinePrompter::new().context("Failed to initialize readline")?;

    let goal = match goal {
        Some(goal) => goal,
        None => match prompter.read_line("Enter your product management prompt: ") {
            Ok(line) => line,
            Err(e) if e.is_quit() => {
                println!("\nExiting...");
                return Ok(());
            }
            Err(e) => return Err(e).context("Failed to read prompt"),
        },
    };
    let goal = match goal.trim() {
        "" => DEFAULT_GOAL.to_string(),
        g => g.to_string(),
    };

    let loader = Arc::new(PromptLoader::new("."));
    run_workflow(config, &resolved, loader, &goal, &mut prompter).await
}

async fn run_workflow(
    config: &Config,
    resolved: &ResolvedConfig,
    loader: Arc<PromptLoader>,
    goal: &str,
    prompter: &mut dyn Prompter,
) -> Result<()> {
    let controller = build_controller(config, resolved, loader)?;
    match controller.run(goal, prompter).await? {
        WorkflowOutcome::Completed(results) => {
            let mark = |ok: bool| if ok { "✓".green() } else { "✗".red() };
            println!();
            println!("{}", "Workflow completed".bright_cyan().bold());
            println!("  {} PRD sent", mark(results.prd_sent));
            match &results.issue_url {
                Some(url) => println!("  {} Issue created: {}", mark(true), url),
                None => println!("  {} Issue created", mark(false)),
            }
            println!("  {} Stakeholders notified", mark(results.notified));
            println!("  Results saved to {}", config.output.results_path().display());
            Ok(())
        }
        WorkflowOutcome::Quit => {
            info!("main: user quit");
            Ok(())
        }
    }
}

fn build_controller(config: &Config, resolved: &ResolvedConfig, loader: Arc<PromptLoader>) -> Result<WorkflowController> {
    debug!(provider = %resolved.oracle.provider, "build_controller: called");
    let client = create_client(&resolved.oracle).context("Failed to create LLM client")?;
    let oracle = LlmPlanOracle::new(client, &loader, config.oracle.max_tokens)?;
    let generator = PlanGenerator::new(Arc::new(oracle), config.oracle.max_attempts);

    let settings = DispatchSettings {
        doc_priority: config.docs.priority.clone(),
        issue_priority: config.issues.priority.clone(),
        assignees: config.issues.assignees.clone(),
        notify_channel: config.chat.notify_channel.clone(),
        results_path: config.output.results_path(),
    };
    let mut dispatcher = CompletionDispatcher::new(loader, settings);

    if let Some(docs) = &resolved.docs {
        match NotionClient::from_config(docs) {
            Ok(client) => dispatcher = dispatcher.with_docs(Arc::new(client)),
            Err(e) => warn!(error = %e, "build_controller: document store unavailable"),
        }
    }
    if let Some(issues) = &resolved.issues {
        match GitHubClient::from_config(issues) {
            Ok(client) => dispatcher = dispatcher.with_issues(Arc::new(client)),
            Err(e) => warn!(error = %e, "build_controller: issue tracker unavailable"),
        }
    }
    if let Some(chat) = &resolved.chat {
        match SlackClient::from_config(chat) {
            Ok(client) => dispatcher = dispatcher.with_chat(Arc::new(client)),
            Err(e) => warn!(error = %e, "build_controller: chat unavailable"),
        }
    }

    Ok(WorkflowController::new(
        generator,
        dispatcher,
        config.output.plan_path(),
        config.review.max_invalid_inputs,
    ))
}
