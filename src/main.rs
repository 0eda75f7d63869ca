use std::process::ExitCode;

use audio_janitor::{
    AppState, build_app,
    config::JanitorConfig,
    observability::{self, TracingGuard},
    trigger::Trigger,
};
use chrono::Utc;
use clap::Parser;

/// CLI arguments for the audio janitor
#[derive(Parser, Debug)]
#[command(version, about = "Audio retention janitor", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to configuration from environment variables)
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start the HTTP server (default)
    Serve,
    /// Run a single cleanup pass in-process and print the summary as JSON
    Run,
    /// POST to a running server's cleanup endpoint
    Trigger {
        /// Keep invoking on the configured interval instead of once
        #[arg(long = "loop")]
        r#loop: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Keep the guard alive for the lifetime of the process
    let _tracing_guard = match init_observability(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match args.command {
        Some(Command::Run) => run_once(config).await,
        Some(Command::Trigger { r#loop }) => run_trigger(config, r#loop).await,
        Some(Command::Serve) | None => run_server(config).await,
    }
}

fn load_config(path: Option<&str>) -> Result<JanitorConfig, String> {
    match path {
        Some(path) => JanitorConfig::from_file(path)
            .map_err(|e| format!("Failed to load config from {path}: {e}")),
        None => JanitorConfig::from_env()
            .map_err(|e| format!("Failed to load config from environment: {e}")),
    }
}

fn init_observability(config: &JanitorConfig) -> Result<TracingGuard, String> {
    let guard = observability::init_tracing(&config.observability).map_err(|e| e.to_string())?;

    if let Err(e) = observability::metrics::init_metrics(&config.observability.metrics) {
        tracing::warn!(error = %e, "Failed to initialize metrics: {e}");
    }

    Ok(guard)
}

async fn run_server(config: JanitorConfig) -> ExitCode {
    let addr = config.server.bind_address();

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            return ExitCode::FAILURE;
        }
    };

    let app = build_app(&config, state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        address = %addr,
        age_hours = config.retention.age_hours,
        page_size = config.retention.page_size,
        dry_run = config.retention.dry_run,
        "Audio janitor listening"
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

async fn run_once(config: JanitorConfig) -> ExitCode {
    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize application state");
            return ExitCode::FAILURE;
        }
    };

    let Some(reconciler) = state.reconciler else {
        tracing::error!("Both a record store and an object store must be configured");
        return ExitCode::FAILURE;
    };

    let outcome = match reconciler.run(Utc::now()).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Cleanup failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize cleanup summary");
            return ExitCode::FAILURE;
        }
    }

    if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run_trigger(config: JanitorConfig, repeat: bool) -> ExitCode {
    let trigger = match Trigger::new(config.trigger) {
        Ok(trigger) => trigger,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build trigger client");
            return ExitCode::FAILURE;
        }
    };

    if repeat {
        tokio::select! {
            _ = trigger.run_forever() => {},
            _ = shutdown_signal() => {},
        }
        return ExitCode::SUCCESS;
    }

    match trigger.invoke().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Cleanup trigger failed");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
