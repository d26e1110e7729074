use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;

use galaxy_agent::notify::{Notifier, SlackNotifier};
use galaxy_agent::runtime::{boot, run_pass, watch};

/// Report missing consultant C-codes from the Galaxy error log to Slack.
#[derive(Debug, Parser)]
#[command(name = "galaxy-agent", version, about)]
struct Cli {
    /// Config file (defaults to $GALAXY_CONFIG_FILE or /etc/galaxy-agent/agent.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep polling the watch directory instead of running a single pass
    #[arg(short, long, conflicts_with = "test")]
    watch: bool,

    /// Send a test direct message to slack.dm_user and exit
    #[arg(short, long)]
    test: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Phase 1: Basic tracing so we can log during config loading
    let basic_tracing = boot::init_tracing_basic();

    info!("Starting Galaxy Agent v{}", env!("CARGO_PKG_VERSION"));

    let config = boot::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // Phase 2: Re-initialize tracing with config (format, level)
    drop(basic_tracing);
    boot::init_logging(&config.logging);

    let notifier = SlackNotifier::from_env(&config.slack)
        .context("Failed to create Slack client")?;

    if cli.test {
        let destination = config
            .slack
            .test_destination()
            .context("--test needs slack.dm_user (or GALAXY_SLACK_DM_USER)")?;
        let text = format!("Test message from galaxy-agent v{}", env!("CARGO_PKG_VERSION"));
        notifier
            .notify(&destination, &text)
            .await
            .with_context(|| format!("Failed to send test message to {}", destination))?;
        info!("Test message sent to {}", destination);
        return Ok(());
    }

    if cli.watch {
        tokio::select! {
            _ = watch(&config, &notifier) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, stopping");
            }
        }
        return Ok(());
    }

    let report = run_pass(&config, &notifier).await.context("Pass failed")?;
    report.log();
    if !report.is_clean() {
        bail!("{} alert(s) could not be delivered", report.failed.len());
    }
    Ok(())
}
