// src/main.rs

//! Command-line entry point: connects, logs in and submits the configured queries.

use anyhow::{Result, anyhow};
use ecomet_client::client;
use ecomet_client::config::Config;
use std::env;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const DEFAULT_CONFIG_PATH: &str = "client.toml";

#[tokio::main]
async fn main() -> Result<()> {
    run_app().await
}

async fn run_app() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("ecomet-client version {VERSION}");
        return Ok(());
    }

    // An explicit --config must exist; the default path is optional.
    let explicit_config = flag_value(&args, "--config")?;
    let config_path = explicit_config.unwrap_or(DEFAULT_CONFIG_PATH);
    let mut config = if explicit_config.is_some() || Path::new(config_path).exists() {
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Failed to load configuration from \"{config_path}\": {e:#}");
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    if let Some(url) = flag_value(&args, "--url")? {
        config.url = url.to_string();
    }
    if let Some(login) = flag_value(&args, "--login")? {
        config.login = login.to_string();
    }
    if let Some(password) = flag_value(&args, "--password")? {
        config.password = password.to_string();
    }
    let cli_queries = flag_values(&args, "--query")?;
    if !cli_queries.is_empty() {
        config.queries = cli_queries.into_iter().map(str::to_string).collect();
    }

    // Logging: RUST_LOG wins over the configured level.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true),
        )
        .init();

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e:#}");
        std::process::exit(1);
    }

    let mut handle = client::connect(&config).await?;
    let client = std::sync::Arc::clone(handle.client());

    if !client.wait_for_login_async(config.login_timeout).await {
        println!("Could not authorize!");
        handle.close().await;
        return Err(anyhow!("login failed or timed out ({})", client.login_state()));
    }
    println!("Logged in");

    for query in &config.queries {
        match client.submit_query(query) {
            Ok(id) => info!(id, "Submitted query"),
            Err(e) => warn!("Failed to submit query: {e}"),
        }
    }

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = handle.closed() => false,
    };
    if interrupted {
        info!("Interrupted; closing connection.");
        handle.close().await;
    }

    let stats = client.stats();
    info!(
        sent = stats.requests_sent,
        received = stats.messages_received,
        routed = stats.messages_routed,
        "Session finished"
    );
    Ok(())
}

/// Returns the value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|arg| arg == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|v| Some(v.as_str()))
            .ok_or_else(|| anyhow!("{flag} flag requires a value")),
        None => Ok(None),
    }
}

/// Returns every value of a repeatable flag, in order.
fn flag_values<'a>(args: &'a [String], flag: &str) -> Result<Vec<&'a str>> {
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            let value = iter
                .next()
                .ok_or_else(|| anyhow!("{flag} flag requires a value"))?;
            values.push(value.as_str());
        }
    }
    Ok(values)
}
