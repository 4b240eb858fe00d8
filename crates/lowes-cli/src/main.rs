mod scrape;
mod summarize;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "lowes-cli")]
#[command(about = "Collect store-level \"pickup today\" listings from lowes.com")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Walk every selected category at every selected store
    Scrape {
        /// Only this store ID (repeatable); default is every catalog store
        #[arg(long = "store")]
        stores: Vec<String>,
        /// Only this category name (repeatable, case-insensitive)
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Print the planned store x category matrix without launching a browser
        #[arg(long)]
        dry_run: bool,
        /// Skip categories already completed for a store in a previous run
        #[arg(long)]
        resume: bool,
    },
    /// Load and validate the catalog
    Validate,
    /// Summarize JSON Lines output files
    Summarize {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = lowes_core::load_app_config().context("failed to load configuration")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Scrape {
            stores,
            categories,
            dry_run,
            resume,
        }) => {
            scrape::run_scrape(
                &config,
                scrape::ScrapeArgs {
                    stores,
                    categories,
                    dry_run,
                    resume,
                },
            )
            .await?;
        }
        Some(Commands::Validate) => run_validate(&config)?,
        Some(Commands::Summarize { files }) => summarize::run_summarize(&files).await?,
        None => println!("lowes-cli: try `lowes-cli --help`"),
    }

    Ok(())
}

fn run_validate(config: &lowes_core::AppConfig) -> anyhow::Result<()> {
    let catalog = lowes_core::load_catalog(&config.catalog_path).with_context(|| {
        format!(
            "catalog {} is invalid",
            config.catalog_path.display()
        )
    })?;
    println!(
        "catalog ok: {} stores, {} categories ({})",
        catalog.stores.len(),
        catalog.categories.len(),
        config.catalog_path.display()
    );
    for store in &catalog.stores {
        println!("  store {:>6}  {} ({})", store.store_id, store.name, store.zip);
    }
    for category in &catalog.categories {
        println!("  category  {}", category.name);
    }
    Ok(())
}
