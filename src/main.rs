use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zapdash::api::{build_router, AppState};
use zapdash::config::Config;
use zapdash::db::Database;
use zapdash::engine::ZapClient;
use zapdash::errors::ZapdashError;

#[derive(Parser)]
#[command(name = "zapdash", version, about = "Web security dashboard backend")]
struct Cli {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ZapdashError> {
    let config = Config::from_env();

    // A store that cannot be opened disables data endpoints instead of
    // killing the process; the engine may still be probed via /health.
    let db = match &config.db_path {
        Some(path) => match Database::new(path) {
            Ok(db) => {
                info!(path = %path, "Connected to scan store");
                Some(db)
            }
            Err(e) => {
                error!(error = %e, "Scan store connection failed");
                None
            }
        },
        None => None,
    };

    let engine = Arc::new(ZapClient::new(&config.engine_url, &config.engine_api_key));
    let state = AppState { db, engine };
    let app = build_router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| ZapdashError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
