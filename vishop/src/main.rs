use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vishop::cli::{run, Cli};

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_tracing(verbose);
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    match run(cli).await {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "CLI exited with error");
            if verbose >= 2 {
                eprintln!("error: {e:?}");
            } else {
                eprintln!("error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
