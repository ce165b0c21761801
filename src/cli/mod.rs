//! Command-line interface for telegraph.
//!
//! Provides commands for enriching articles against a fixture catalog or a
//! live HTTP service, and for inspecting the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures_util::future::join_all;

use crate::adapters::{AssetProvider, FixtureProvider, HttpProvider, ReferenceProvider};
use crate::config::{load_settings, EnricherSettings};
use crate::core::Enricher;

/// telegraph - Concurrent article enrichment
#[derive(Parser, Debug)]
#[command(name = "telegraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .telegraph/config.yaml in this or a parent directory)
    #[arg(short, long, global = true, env = "TELEGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enrich one or more articles and print them as JSON
    Enrich {
        /// Article IDs (enriched concurrently)
        #[arg(required = true)]
        article_ids: Vec<String>,

        /// YAML fixture catalog to serve references and assets from
        #[arg(short, long, conflicts_with = "endpoint")]
        fixtures: Option<PathBuf>,

        /// Base URL of the reference/asset HTTP service
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Number of enrichment rounds (later rounds read through the cache)
        #[arg(short, long, default_value = "1")]
        repeat: usize,

        /// Invalidate the asset cache between rounds
        #[arg(long)]
        invalidate_between: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let settings = load_settings(self.config.as_deref())?;

        match self.command {
            Commands::Enrich {
                article_ids,
                fixtures,
                endpoint,
                repeat,
                invalidate_between,
            } => {
                let enricher = build_enricher(&settings, fixtures, endpoint)?;
                enrich_articles(&enricher, &article_ids, repeat, invalidate_between).await
            }
            Commands::Config => show_config(&settings),
        }
    }
}

/// Pick the provider named on the command line
fn build_enricher(
    settings: &EnricherSettings,
    fixtures: Option<PathBuf>,
    endpoint: Option<String>,
) -> Result<Enricher> {
    let (references, assets): (Arc<dyn ReferenceProvider>, Arc<dyn AssetProvider>) =
        match (fixtures, endpoint) {
            (Some(path), _) => shared(FixtureProvider::from_file(&path)?),
            (None, Some(url)) => shared(HttpProvider::new(url)),
            (None, None) => {
                anyhow::bail!("No provider given. Use --fixtures <file> or --endpoint <url>")
            }
        };

    Ok(Enricher::from_settings(references, assets, settings))
}

/// Use one provider for both references and assets
fn shared<P>(provider: P) -> (Arc<dyn ReferenceProvider>, Arc<dyn AssetProvider>)
where
    P: ReferenceProvider + AssetProvider + 'static,
{
    let provider = Arc::new(provider);
    (provider.clone(), provider)
}

/// Enrich every id once per round and print the results
async fn enrich_articles(
    enricher: &Enricher,
    article_ids: &[String],
    repeat: usize,
    invalidate_between: bool,
) -> Result<()> {
    let mut failures = 0usize;

    for round in 1..=repeat.max(1) {
        if round > 1 && invalidate_between {
            enricher.invalidate_cache();
        }

        let results = join_all(article_ids.iter().map(|id| enricher.enrich(id))).await;

        for (id, result) in article_ids.iter().zip(results) {
            match result {
                Ok(article) => {
                    let json = serde_json::to_string_pretty(&article)
                        .context("Failed to serialize article")?;
                    println!("{}", json);
                }
                Err(e) => {
                    failures += 1;
                    eprintln!("[{}] {} failure: {}", id, e.kind(), e);
                }
            }
        }

        if repeat > 1 {
            eprintln!(
                "[round {}/{}: {} cached assets]",
                round,
                repeat,
                enricher.cache().len()
            );
        }
    }

    if failures > 0 {
        eprintln!("\n[{} enrichment(s) failed]", failures);
        std::process::exit(1);
    }

    Ok(())
}

/// Show resolved configuration
fn show_config(settings: &EnricherSettings) -> Result<()> {
    match &settings.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!("Reference timeout: {}ms", settings.reference_timeout_ms);
    println!("Image timeout: {}ms", settings.image_timeout_ms);
    println!("Video timeout: {}ms", settings.video_timeout_ms);
    match settings.max_concurrent_fetches {
        Some(max) => println!("Max concurrent fetches: {}", max),
        None => println!("Max concurrent fetches: unbounded"),
    }

    Ok(())
}
