use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use event_scrape_lib::{config::AppConfig, db::Store, AppState};

/// Scrapes city event listings into the local catalog and serves it.
#[derive(Parser, Debug)]
#[command(name = "event-scrape")]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,

    /// Run the pipeline once and exit instead of serving.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    if std::path::Path::new(&args.dotenv).exists() {
        if let Err(err) = dotenvy::from_path(&args.dotenv) {
            eprintln!("failed to load {}: {err}", args.dotenv);
        }
    }

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    event_scrape_lib::init_tracing(&config.log_filter);

    let db_path = config.database_path();
    let store = match Store::open(&db_path) {
        Ok(store) => store,
        Err(err) => {
            error!(path = ?db_path, error = %err, "failed to open event store");
            return ExitCode::FAILURE;
        }
    };
    info!(path = ?db_path, city = %config.city, "event store ready");

    let state = match AppState::new(config, store) {
        Ok(state) => state,
        Err(err) => {
            error!(error = %format!("{err:#}"), "failed to initialise");
            return ExitCode::FAILURE;
        }
    };

    let result = if args.once {
        event_scrape_lib::run_once(&state).await.map(|report| {
            info!(
                processed = report.processed,
                failed_sources = report.failures.len(),
                "scrape complete"
            );
        })
    } else {
        event_scrape_lib::serve(state).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "event-scrape exited with error");
            ExitCode::FAILURE
        }
    }
}
