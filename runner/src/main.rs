//! Edgeship - Entry Point
//!
//! Deploys a site fixture to a hosted project and waits until it is served.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use colored::Colorize;
use edgeship::app::run::{deploy_fixture, run_with_teardown};
use edgeship::app::state::RunContext;
use edgeship::config::features::FeatureCatalog;
use edgeship::config::fixture::Fixture;
use edgeship::logs::{init_logging, LogOptions};
use edgeship::storage::settings::Settings;
use edgeship::utils::version_info;

use tracing::{error, info, warn};

const DEFAULT_SETTINGS_PATH: &str = "edgeship.json";

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    let Some(fixture_path) = cli_args.get("fixture") else {
        eprintln!("Usage: edgeship --fixture=<path> [--settings=<path>] [--features=<path>] [--log-dir=<path>]");
        return ExitCode::FAILURE;
    };

    // Retrieve the settings file
    let settings_path = cli_args
        .get("settings")
        .map(String::as_str)
        .unwrap_or(DEFAULT_SETTINGS_PATH);
    let settings = match Settings::load(settings_path).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: cli_args.get("log-dir").map(Into::into),
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    info!("Edgeship {} ({})", version.version, version.git_hash);

    let fixture = match Fixture::load(fixture_path).await {
        Ok(fixture) => fixture,
        Err(e) => {
            error!("Unable to read fixture: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let catalog = match cli_args.get("features") {
        Some(path) => match FeatureCatalog::load(path).await {
            Ok(catalog) => catalog,
            Err(e) => {
                error!("Unable to read features: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => FeatureCatalog::default(),
    };

    let context = match RunContext::from_settings(&settings) {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to initialize run: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = run_with_teardown(
        &context.teardown,
        deploy_fixture(&context, &fixture, &catalog),
        await_shutdown_signal(),
    )
    .await;

    match result {
        Ok(site) => {
            println!("{} {}", "Deployed".green().bold(), site.url);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Deployment of \"{}\" failed: {}", fixture.name, e);
            println!("{} {}", "Failed".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                wait_for_ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = wait_for_ctrl_c() => {}
        }
    }

    #[cfg(not(unix))]
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down..."),
        Err(e) => {
            warn!("Unable to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
