// Door State CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so stdout stays parseable.

mod client;
mod commands;
mod output;
mod sensor;

use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "doorstate")]
#[command(about = "Door state CLI - Report the door sensor and read the door history")]
#[command(version)]
pub struct Cli {
    /// API base URL
    #[arg(
        long,
        env = "DOORSTATE_API_URL",
        default_value = "http://localhost:8888"
    )]
    pub api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "DOORSTATE_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign and submit a door state
    Update(commands::update::UpdateArgs),

    /// Sample the door sensor and submit every change
    Watch(commands::watch::WatchArgs),

    /// Show the current door state
    Status,

    /// List recorded door state changes
    History(commands::history::RangeArgs),

    /// Aggregate the history into statistics
    Stats(commands::stats::StatsArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doorstate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = client::Client::new(&cli.api_url, Duration::from_secs(cli.timeout))?;
    let output_format = output::OutputFormat::from_str(&cli.output);

    match cli.command {
        Commands::Update(args) => {
            commands::update::run(args, &client, output_format, cli.quiet).await
        }
        Commands::Watch(args) => {
            commands::watch::run(args, &client, output_format, cli.quiet).await
        }
        Commands::Status => commands::status::run(&client, output_format).await,
        Commands::History(range) => commands::history::run(range, &client, output_format).await,
        Commands::Stats(args) => commands::stats::run(args, &client, output_format).await,
    }
}
