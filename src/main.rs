use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bumpfix::cli;

#[derive(Parser)]
#[command(name = "bumpfix", version)]
#[command(
    about = "Upgrade a Node.js project's dependencies, rebuild it, and get fix suggestions for build errors",
    long_about = None
)]
struct Cli {
    /// Project directory containing package.json (defaults to current directory)
    #[arg(default_value = ".")]
    path: String,

    /// Path to config file (defaults to ./bumpfix.toml or ~/.config/bumpfix/config.toml)
    #[arg(long)]
    config: Option<String>,

    /// Ask the local model server instead of the remote API
    #[arg(long)]
    local: bool,

    /// Override the provider of the selected backend (gemini, openai, openai-compatible)
    #[arg(long)]
    provider: Option<String>,

    /// Override the model of the selected backend (e.g., "gemini-1.5-pro", "codellama:13b")
    #[arg(long)]
    model: Option<String>,

    /// Package script that builds the project
    #[arg(long)]
    build_script: Option<String>,

    /// Build and diagnose without upgrading dependencies
    #[arg(long)]
    skip_upgrade: bool,

    /// Also write the output of a failed build to this file
    #[arg(long)]
    error_log: Option<String>,

    /// Use a canned suggestion instead of calling a backend
    #[arg(long)]
    dry_run: bool,

    /// Log debug details (commands, HTTP calls)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "bumpfix=debug"
    } else {
        "bumpfix=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let overrides = cli::run::Overrides {
        local: cli.local,
        provider: cli.provider,
        model: cli.model,
        build_script: cli.build_script,
        skip_upgrade: cli.skip_upgrade,
        error_log: cli.error_log,
    };
    cli::run::run(cli.path, cli.config, overrides, cli.dry_run).await?;

    Ok(())
}
