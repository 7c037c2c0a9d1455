//! Room Maker command-line host.
//!
//! Prints the word bank for the game UI and drives the offline asset cache
//! through its install / activate / fetch lifecycle against the deployed
//! origin, using on-disk cache buckets.

use std::io;

use anyhow::{bail, Result};
use roommaker_core::offline::{
    CacheStorage, DiskCacheStorage, HttpNetwork, OfflineCacheManager, Request, ResponseSource,
};
use roommaker_core::{CacheLifecycle, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: roommaker <command> [args]

Commands:
  words             List every vocabulary item
  labels            List room categories with their English labels
  install           Pre-cache the manifest into the current cache bucket
  activate          Delete cache buckets from older versions
  fetch <path>...   Fetch paths cache-first, caching matching assets
  buckets           List cache buckets and their entries
  help              Show this message

Environment:
  RUST_LOG                 Log filter (default: warn)
  ROOMMAKER_ORIGIN         Game origin, e.g. https://rooms.example.com
  ROOMMAKER_CACHE_VERSION  Cache version tag, e.g. v2";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes buffered log lines when dropped.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (writer, guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();
    guard
}

type Manager = OfflineCacheManager<DiskCacheStorage, HttpNetwork>;

fn build_manager(config: &Config) -> Result<Manager> {
    let offline = config.offline_config()?;
    let storage = DiskCacheStorage::new(config.cache_dir()?)?;
    let network = HttpNetwork::new(offline.origin.clone())?;
    Ok(OfflineCacheManager::new(offline, storage, network))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load()?;
    info!(command = %command, cache = %config.cache_name(), "roommaker starting");

    match command.as_str() {
        "words" => print_words(&config),
        "labels" => print_labels(&config),
        "install" => install(&config).await,
        "activate" => activate(&config).await,
        "fetch" => fetch(&config, &args[1..]).await,
        "buckets" => list_buckets(&config).await,
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }
}

fn print_words(config: &Config) -> Result<()> {
    let bank = config.word_bank()?;
    for entry in bank.all_items() {
        println!("{}\t{}\t{}", entry.chinese, entry.english, entry.base_name);
    }
    Ok(())
}

fn print_labels(config: &Config) -> Result<()> {
    let bank = config.word_bank()?;
    for category in bank.categories() {
        let label = bank.category_label(&category.key)?;
        println!("{}\t{}\t{} items", category.key, label, category.items.len());
    }
    Ok(())
}

async fn install(config: &Config) -> Result<()> {
    let manager = build_manager(config)?;
    let outcome = manager.on_install().await?;
    println!("Cached {} assets into {}", outcome.cached, outcome.cache_name);
    Ok(())
}

async fn activate(config: &Config) -> Result<()> {
    let manager = build_manager(config)?;
    let outcome = manager.on_activate().await?;
    if outcome.deleted.is_empty() {
        println!("No old caches to delete");
    }
    for name in &outcome.deleted {
        println!("Deleted old cache {}", name);
    }
    Ok(())
}

async fn fetch(config: &Config, paths: &[String]) -> Result<()> {
    if paths.is_empty() {
        bail!("fetch needs at least one path\n\n{}", USAGE);
    }

    let manager = build_manager(config)?;
    for path in paths {
        let request = Request::for_path(&manager.config().origin, path)?;
        let fetched = manager.on_fetch(request).await?;
        let source = match fetched.source {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
        };
        println!(
            "{}\t{}\t{} bytes\t{}",
            fetched.response.status,
            source,
            fetched.response.body.len(),
            path
        );
    }

    manager.settle().await;
    Ok(())
}

async fn list_buckets(config: &Config) -> Result<()> {
    let storage = DiskCacheStorage::new(config.cache_dir()?)?;
    let current = config.cache_name();

    let names = storage.keys().await?;
    if names.is_empty() {
        println!("No cache buckets in {}", storage.root().display());
    }
    for name in names {
        let marker = if name == current { " (current)" } else { "" };
        println!("{}{}", name, marker);
        let urls = match storage.bucket_urls(&name).await {
            Ok(urls) => urls,
            Err(e) => {
                println!("  (unreadable: {})", e);
                continue;
            }
        };
        for url in urls {
            match storage.match_bucket(&name, &url).await {
                Ok(Some(response)) => println!("  {}\t{}", url, response.age_display()),
                Ok(None) => println!("  {}", url),
                Err(e) => println!("  {}\t(unreadable: {})", url, e),
            }
        }
    }
    Ok(())
}
