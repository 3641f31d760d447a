use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod error;
mod models;
mod selector;
mod sources;
mod storage;
mod sync;

use crate::cli::Cli;
use crate::config::Config;
use crate::error::CollectionError;
use crate::sources::DiscogsClient;
use crate::storage::CacheStore;
use crate::sync::Reconciler;

const LOG_TARGET: &str = "random_discogs_item";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging
    if let Err(e) = init_logging(cli.debug) {
        eprintln!("Failed to initialise logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            let code = e
                .downcast_ref::<CollectionError>()
                .map(CollectionError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}

fn init_logging(debug: bool) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(debug, rust_log.as_deref())?)
        .init();
    Ok(())
}

/// `RUST_LOG` wins when set; `--debug` still raises this crate to debug on top of it.
fn log_filter(debug: bool, rust_log: Option<&str>) -> Result<EnvFilter> {
    let level = if debug { "debug" } else { "info" };
    match rust_log.filter(|value| !value.trim().is_empty()) {
        Some(value) if debug => {
            Ok(EnvFilter::try_new(value)?.add_directive(format!("{}={}", LOG_TARGET, level).parse()?))
        }
        Some(value) => Ok(EnvFilter::try_new(value)?),
        None => Ok(EnvFilter::new(format!("{}={}", LOG_TARGET, level))),
    }
}

async fn run(cli: Cli) -> Result<()> {
    debug!(
        "who: {:?}, singles: {}, not_shared: {}, force_update: {}",
        cli.who, cli.singles, cli.not_shared, cli.force_update
    );

    // Config
    let config = Config::load()?;
    debug!("{}", config.summary());

    // Identity is resolved once and shared
    let client = DiscogsClient::new(&config)?;
    let auth = client.resolve_identity().await?;
    let store = CacheStore::new(config.cache_file());
    debug!("Cache file: {}", store.path().display());

    // Refresh the cache if it is stale
    Reconciler::new(&client, &store, &auth)
        .reconcile(cli.force_update)
        .await
        .context("cache update failed")?;

    // Filter and pick
    let all_records = store.load().await?;
    debug!("Total records in cache: {}", all_records.len());

    let pool = selector::select_group(&all_records, cli.who, cli.singles, cli.not_shared);
    info!("🎲 Picking from {} records", pool.len());
    for record in &pool {
        debug!("{} | {} | {}", record.id, record.basic_information.title, record.folder_name);
    }

    let item = selector::choose_random(&pool, &mut rand::thread_rng())?;
    println!("{}", item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(log_filter(false, None).unwrap().to_string(), "random_discogs_item=info");
        assert_eq!(log_filter(false, Some(" ")).unwrap().to_string(), "random_discogs_item=info");
        assert_eq!(log_filter(true, None).unwrap().to_string(), "random_discogs_item=debug");
    }

    #[test]
    fn test_rust_log_overrides_default() {
        let filter = log_filter(false, Some("random_discogs_item=warn")).unwrap().to_string();
        assert_eq!(filter, "random_discogs_item=warn");

        let filter = log_filter(false, Some("random_discogs_item=trace,reqwest=debug")).unwrap().to_string();
        assert!(filter.contains("random_discogs_item=trace"), "{}", filter);
        assert!(filter.contains("reqwest=debug"), "{}", filter);
    }

    #[test]
    fn test_debug_flag_on_top_of_rust_log() {
        let filter = log_filter(true, Some("reqwest=warn")).unwrap().to_string();
        assert!(filter.contains("reqwest=warn"), "{}", filter);
        assert!(filter.contains("random_discogs_item=debug"), "{}", filter);
    }

    #[test]
    fn test_invalid_rust_log_is_error() {
        assert!(log_filter(false, Some("random_discogs_item=notalevel")).is_err());
    }
}
