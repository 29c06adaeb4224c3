use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use tokio_util::sync::CancellationToken;

use devcrew::config::CrewConfig;
use devcrew::Architect;
use devcrew::Developer;
use devcrew::OpenAiClient;
use devcrew::Orchestrator;
use devcrew::Report;
use devcrew::TaskRegistry;

#[derive(Parser)]
#[command(name = "devcrew")]
#[command(about = "Two-role software delivery workflow orchestrator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding agents.yaml, tasks.yaml, and service.yaml
    #[arg(short, long, global = true, default_value = "config")]
    config_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the workflow and write a run report
    Run {
        /// Directory for the generated report
        #[arg(long, default_value = "reports")]
        report_dir: PathBuf,
    },

    /// Validate configuration documents and the task graph without running
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("devcrew={log_level}"))
        .init();

    match cli.command {
        Commands::Run { report_dir } => run_workflow(&cli.config_dir, &report_dir).await,
        Commands::Check => check(&cli.config_dir).await,
    }
}

async fn run_workflow(config_dir: &Path, report_dir: &Path) -> Result<()> {
    let config = CrewConfig::load(config_dir)
        .await
        .context("failed to load configuration")?;
    let registry =
        TaskRegistry::load(&config.tasks_path()).context("failed to load task document")?;
    tracing::info!(tasks = registry.len(), "task registry loaded");

    let service = OpenAiClient::new(&config.service, config.api_key.clone())
        .context("failed to build completion client")?;
    let architect = Architect::new(config.agents.software_architect.clone());
    let developer = Developer::new(config.agents.developer_agent.clone());

    let cancel = CancellationToken::new();
    let signal_guard = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current task");
            signal_guard.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(
        registry,
        architect,
        developer,
        service,
        config.service.retry.clone(),
    );
    let stats = orchestrator.run(&cancel).await;

    let report = Report::build(orchestrator.registry(), orchestrator.completed());
    let path = report
        .write_to_dir(report_dir)
        .await
        .context("failed to write report")?;
    tracing::info!(
        completed = stats.completed,
        failed = stats.failed,
        remaining = stats.remaining,
        report = %path.display(),
        "workflow finished"
    );

    if stats.remaining > 0 {
        tracing::warn!(
            remaining = stats.remaining,
            "tasks left unprocessed; check for unmet or dangling dependencies"
        );
    }
    Ok(())
}

async fn check(config_dir: &Path) -> Result<()> {
    let config = CrewConfig::load(config_dir)
        .await
        .context("configuration check failed")?;
    let registry =
        TaskRegistry::load(&config.tasks_path()).context("task document check failed")?;

    let issues = config.lint();
    for issue in &issues {
        println!("warning: {issue}");
    }
    println!(
        "ok: {} tasks, architect `{}`, developer `{}`{}",
        registry.len(),
        config.agents.software_architect.role_name,
        config.agents.developer_agent.role_name,
        if issues.is_empty() {
            String::new()
        } else {
            format!(", {} warning(s)", issues.len())
        }
    );
    Ok(())
}
