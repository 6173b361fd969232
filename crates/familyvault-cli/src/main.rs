//! FamilyVault offline cache - command line driver.
//!
//! Runs the proxy's lifecycle events against the on-disk cache so the
//! offline behavior can be inspected and primed outside a browser.

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use familyvault_core::{
    CacheStorage, Config, DiskCacheStorage, HttpNetwork, OfflineCacheProxy, Request,
    WorkerLifecycle,
};

const USAGE: &str = "\
Usage: familyvault <command>

Commands:
  install              Open the current cache version and pre-cache the app shell
  activate             Evict cache versions other than the current one
  fetch <url> [--body] Answer a GET the way the offline proxy would
  status               List cache versions and their entries
  clear                Delete every cache version";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

struct Runtime {
    config: Config,
    storage: Arc<DiskCacheStorage>,
    proxy: OfflineCacheProxy,
}

fn build_runtime() -> Result<Runtime> {
    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    let storage = Arc::new(
        DiskCacheStorage::new(cache_dir.clone())
            .with_context(|| format!("Failed to open cache directory {}", cache_dir.display()))?,
    );
    let network = Arc::new(HttpNetwork::new(&config.scope, config.request_timeout_secs)?);
    let host = Arc::new(WorkerLifecycle::new());
    let proxy = OfflineCacheProxy::new(&config, storage.clone(), network, host)?;
    Ok(Runtime {
        config,
        storage,
        proxy,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };

    let runtime = build_runtime()?;
    info!(command = %command, namespace = %runtime.proxy.namespace(), "FamilyVault starting");

    match command.as_str() {
        "install" => install(&runtime).await,
        "activate" => activate(&runtime).await,
        "fetch" => {
            let url = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("fetch requires a URL\n\n{}", USAGE))?;
            let show_body = args.iter().skip(2).any(|a| a == "--body");
            fetch(&runtime, url, show_body).await
        }
        "status" => status(&runtime).await,
        "clear" => clear(&runtime).await,
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => Err(anyhow::anyhow!("Unknown command '{}'\n\n{}", other, USAGE)),
    }
}

async fn install(runtime: &Runtime) -> Result<()> {
    let report = runtime.proxy.on_install().await?;
    println!("Installed {}", report.namespace);
    for url in &report.precached {
        println!("  cached {}", url);
    }
    if let Some(reason) = report.precache_error {
        println!("  pre-caching skipped: {}", reason);
    }
    Ok(())
}

async fn activate(runtime: &Runtime) -> Result<()> {
    let report = runtime.proxy.on_activate().await?;
    println!("Activated {}", runtime.proxy.namespace());
    for name in &report.deleted {
        println!("  evicted {}", name);
    }
    for name in &report.failed {
        println!("  failed to evict {}", name);
    }
    Ok(())
}

async fn fetch(runtime: &Runtime, url: &str, show_body: bool) -> Result<()> {
    let request = Request::get(url);
    let (state, response) = runtime
        .proxy
        .respond(&request)
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    println!(
        "{} {} ({}, {}, {} bytes)",
        response.status,
        response.status_text,
        state.as_str(),
        response.response_type.as_str(),
        response.body.len()
    );
    if show_body {
        println!("{}", response.body_preview());
    }
    Ok(())
}

async fn status(runtime: &Runtime) -> Result<()> {
    println!("Cache directory: {}", runtime.storage.cache_dir().display());
    println!("Scope: {}", runtime.config.scope);

    let namespaces = runtime.storage.keys().await?;
    if namespaces.is_empty() {
        println!("No cache versions stored");
        return Ok(());
    }
    for name in namespaces {
        let marker = if name == runtime.config.cache_version { " (current)" } else { "" };
        let entries = runtime.storage.entries(&name).await?;
        println!("{}{}: {} entries", name, marker, entries.len());
        for entry in entries {
            println!(
                "  {} {} [{}]",
                entry.response.data.status,
                entry.key,
                entry.response.age_display()
            );
        }
    }
    Ok(())
}

async fn clear(runtime: &Runtime) -> Result<()> {
    for name in runtime.storage.keys().await? {
        if runtime.storage.delete(&name).await? {
            println!("Deleted {}", name);
        }
    }
    Ok(())
}
