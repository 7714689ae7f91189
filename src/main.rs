// ABOUTME: Main entry point for the Slack assistant relay.
// ABOUTME: Parses the CLI, loads configuration, initializes logging, and starts the relay.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use threadline::{app, logging, Config};

#[derive(Parser)]
#[command(name = "threadline", version)]
#[command(about = "Relay Slack assistant threads and mentions to a streaming LLM")]
struct Cli {
    /// Path to config file (overrides the standard search)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Slack and serve events (default)
    Start,
    /// Load and validate configuration, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        tracing::error!(panic = %panic_info, "Relay panicked");
        eprintln!("\nPANIC! threadline crashed with the following error:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::load_from(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Start) {
        Commands::CheckConfig => {
            println!("Configuration OK");
            for line in app::describe(&config) {
                println!("  {}", line);
            }
            Ok(())
        }
        Commands::Start => {
            let _log_guard = logging::init_tracing(&config.logging)?;
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting threadline");
            app::run(config).await
        }
    }
}
