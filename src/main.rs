use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use testpulse::config::{AppConfig, DEFAULT_DB_PATH, DEFAULT_PORT};

#[derive(Parser)]
#[command(
    name = "testpulse",
    about = "Webhook-driven dashboard for CI test-run results",
    version,
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service (default when no subcommand is given)
    Serve(ServeArgs),

    /// Print per-project summaries from the database
    Summary {
        /// SQLite database file
        #[arg(long, env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
        db_path: PathBuf,

        /// JSON output for machine parsing
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Clone)]
struct ServeArgs {
    /// Listen port
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// SQLite database file
    #[arg(long, env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
    db_path: PathBuf,

    /// Bearer token required on the webhook endpoint
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Mount the app under this path, e.g. /ci
    #[arg(long, env = "PATH_PREFIX")]
    path_prefix: Option<String>,

    /// Footer text shown by the frontend
    #[arg(long, env = "FOOTER_TEXT")]
    footer_text: Option<String>,
}

impl From<ServeArgs> for AppConfig {
    fn from(args: ServeArgs) -> Self {
        AppConfig::new(
            args.api_token,
            args.path_prefix,
            args.footer_text,
            args.port,
            args.db_path,
        )
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        None => run_serve(cli.serve).await?,
        Some(Commands::Serve(args)) => run_serve(args).await?,
        Some(Commands::Summary { db_path, json }) => {
            let pool = testpulse::storage::open_pool(&db_path)?;
            let conn = pool.get()?;
            let summaries = testpulse::storage::runs::project_summaries(&conn)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("No test results recorded.");
            } else {
                println!(
                    "{:<24} | {:<10} | {:>6} | {:>6} | {:>6} | Last run",
                    "Project", "Latest", "Total", "Passed", "Failed"
                );
                println!("{:-<24}-|-{:-<10}-|-{:-<6}-|-{:-<6}-|-{:-<6}-|-{:-<24}", "", "", "", "", "", "");
                for s in &summaries {
                    println!(
                        "{:<24} | {:<10} | {:>6} | {:>6} | {:>6} | {}",
                        s.project, s.latest_status, s.total_runs, s.passed_runs, s.failed_runs, s.last_run
                    );
                }
            }
        }
    }

    Ok(())
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = AppConfig::from(args);
    tracing::info!(port = config.port, "Starting testpulse");
    testpulse::serve(config).await
}
