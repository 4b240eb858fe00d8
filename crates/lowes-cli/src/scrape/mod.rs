//! The `scrape` command: stores run concurrently, categories within a store
//! run in order on that store's browser session.

mod checkpoint;
mod store;

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use lowes_core::{AppConfig, Catalog};
use lowes_scraper::{ScrapeSettings, SessionConfig};
use serde::Serialize;
use tokio::sync::watch;

use store::StoreSummary;

#[derive(Debug, Clone, Default)]
pub(crate) struct ScrapeArgs {
    pub stores: Vec<String>,
    pub categories: Vec<String>,
    pub dry_run: bool,
    pub resume: bool,
}

/// Shared, read-only state for every store worker.
pub(super) struct RunContext<'a> {
    pub config: &'a AppConfig,
    pub settings: ScrapeSettings,
    pub session: SessionConfig,
    pub output_dir: PathBuf,
    pub resume: bool,
    pub abort: watch::Receiver<bool>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    aborted: bool,
    records: usize,
    stores: Vec<StoreSummary>,
}

/// Loads the catalog, narrows it to the requested stores and categories,
/// and scrapes it.
///
/// # Errors
///
/// Returns an error if the catalog is invalid, the selection is empty, the
/// output directory cannot be created, or every store failed.
pub(crate) async fn run_scrape(config: &AppConfig, args: ScrapeArgs) -> anyhow::Result<()> {
    let catalog = lowes_core::load_catalog(&config.catalog_path)
        .with_context(|| format!("failed to load catalog {}", config.catalog_path.display()))?
        .select(&args.stores, &args.categories);
    if catalog.stores.is_empty() {
        anyhow::bail!("no catalog stores match {:?}", args.stores);
    }
    if catalog.categories.is_empty() {
        anyhow::bail!("no catalog categories match {:?}", args.categories);
    }

    if args.dry_run {
        print_plan(&catalog);
        return Ok(());
    }

    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    let (abort_tx, abort_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing current pages");
            let _ = abort_tx.send(true);
        }
    });

    let ctx = RunContext {
        config,
        settings: ScrapeSettings::from_app_config(config),
        session: SessionConfig::from_app_config(config),
        output_dir: config.output_dir.clone(),
        resume: args.resume,
        abort: abort_rx,
    };

    let started_at = Utc::now();
    let summaries = scrape_stores(&ctx, &catalog).await;
    signal.abort();

    let aborted = *ctx.abort.borrow();
    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        aborted,
        records: summaries.iter().map(|s| s.records).sum(),
        stores: summaries,
    };
    write_summary(&ctx.output_dir, &summary).await?;
    report(&summary);

    let failed = summary.stores.iter().filter(|s| s.error.is_some()).count();
    if failed == summary.stores.len() {
        anyhow::bail!("all {failed} stores failed");
    }
    Ok(())
}

async fn scrape_stores(ctx: &RunContext<'_>, catalog: &Catalog) -> Vec<StoreSummary> {
    let max_concurrent = ctx.config.max_concurrent_stores.max(1);
    stream::iter(&catalog.stores)
        .map(|target| async move {
            match store::run_store(ctx, target, &catalog.categories).await {
                Ok(summary) => summary,
                Err(e) => {
                    tracing::error!(store_id = %target.store_id, error = %format!("{e:#}"), "store failed");
                    StoreSummary::failed(target, &e)
                }
            }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await
}

fn print_plan(catalog: &Catalog) {
    println!(
        "dry-run: would scrape {} categories at {} stores",
        catalog.categories.len(),
        catalog.stores.len()
    );
    for store in &catalog.stores {
        for category in &catalog.categories {
            println!("  {:>6}  {}  {}", store.store_id, category.name, category.url);
        }
    }
}

async fn write_summary(output_dir: &std::path::Path, summary: &RunSummary) -> anyhow::Result<()> {
    let path = output_dir.join("run-summary.json");
    let json = serde_json::to_vec_pretty(summary).context("failed to serialize run summary")?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "run summary written");
    Ok(())
}

fn report(summary: &RunSummary) {
    for store in &summary.stores {
        match &store.error {
            Some(error) => println!("store {}: failed: {error}", store.store_id),
            None => {
                let blocked = store.categories.iter().filter(|c| c.is_blocked()).count();
                println!(
                    "store {}: {} records across {} categories ({} blocked{}{})",
                    store.store_id,
                    store.records,
                    store.categories.len(),
                    blocked,
                    if store.store_context_set { "" } else { ", store context not confirmed" },
                    if store.abandoned { ", abandoned" } else { "" },
                );
            }
        }
    }
    println!(
        "total: {} records from {} stores{}",
        summary.records,
        summary.stores.len(),
        if summary.aborted { " (interrupted)" } else { "" }
    );
}
