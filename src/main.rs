use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hyphae::agent::claude::ClaudeClient;
use hyphae::config::AppConfig;
use hyphae::platform::github::GitHubGateway;
use hyphae::shutdown::cancel_on_shutdown;
use hyphae::workflow::events::{log_event, EventSink};
use hyphae::workflow::orchestrator::Orchestrator;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "hyphae", about = "Multi-agent pull request reviewer")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Pull request to review (overrides PR_NUMBER)
    #[arg(long)]
    pr: Option<u64>,

    /// Repository as owner/name (overrides REPOSITORY)
    #[arg(long)]
    repo: Option<String>,

    #[arg(long, value_enum, default_value = "text", env = "HYPHAE_LOG_FORMAT")]
    log_format: LogFormat,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(pr) = cli.pr {
        config.workflow.pr_number = pr;
    }
    if let Some(repo) = cli.repo {
        config.github.repository = repo;
    }
    config.validate()?;

    tracing::info!(
        repository = %config.github.repository,
        pr = config.workflow.pr_number,
        model = %config.claude.model,
        "Starting review"
    );

    let gateway = Arc::new(GitHubGateway::new(&config.github)?);
    let model = Arc::new(ClaudeClient::new(
        &config.claude.api_key,
        &config.claude.model,
        config.claude.max_tokens,
    ));
    let orchestrator = Orchestrator::new(gateway, model, config.workflow.pr_number)
        .with_budget(config.budget())
        .with_max_turns(config.claude.max_turns);

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let (events, mut rx) = EventSink::channel();
    let logger = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            log_event(&event);
        }
    });

    let result = orchestrator.run(&events, &cancel).await;

    // Close the stream so the logger drains and exits
    drop(events);
    let _ = logger.await;
    cancel.cancel();

    let report = result?;
    tracing::info!(
        review_id = report.review.review_id,
        url = report.review.html_url.as_deref().unwrap_or("-"),
        handoffs = report.handoffs.len(),
        elapsed_secs = (report.finished_at - report.started_at).num_seconds(),
        "Review posted"
    );

    Ok(())
}
