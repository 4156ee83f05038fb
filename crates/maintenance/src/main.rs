//! Trades CMS operator tooling
//!
//! Page-tree deduplication and inspection, coverage quality reports and
//! schema migrations. Every command prints one JSON object per line on
//! stdout; logs go to stderr.

mod db_store;
mod errors;
mod memory;
mod reconcile;
mod store;
mod tree;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use trades_common::{
    config::{AppConfig, DedupeTarget},
    db::{DbPool, Repository},
    quality::{QualityPolicy, QualityReport},
    telemetry,
};

use db_store::DbPageStore;
use memory::MemoryPageStore;
use reconcile::{reconcile, ReconcileReport};
use store::PageStore;

#[derive(Parser)]
#[command(name = "maintenance", version)]
#[command(about = "Trades CMS operator tooling")]
struct Cli {
    /// Configuration file to load instead of the config/ directory
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collapse duplicate singleton pages into one canonical page
    Dedupe {
        /// Run against an in-memory copy of the tree and write nothing
        #[arg(long)]
        dry_run: bool,

        /// Content type to reconcile (defaults to the configured targets)
        #[arg(long, requires = "title")]
        content_type: Option<String>,

        /// Canonical title for --content-type
        #[arg(long, requires = "content_type")]
        title: Option<String>,
    },

    /// List pages of the given content types
    Inspect {
        #[arg(long = "content-type")]
        content_types: Vec<String>,
    },

    /// Print the quality report of one coverage page
    Gate {
        /// Service page slug
        #[arg(long)]
        service: String,

        /// Geo area slug
        #[arg(long)]
        city: String,
    },

    /// Apply pending schema migrations
    Migrate,
}

#[derive(Serialize)]
struct DedupeOutput<'a> {
    dry_run: bool,
    #[serde(flatten)]
    report: &'a ReconcileReport,
}

#[derive(Serialize)]
struct GateOutput {
    coverage_id: i64,
    service: String,
    city: String,
    status: String,
    #[serde(flatten)]
    report: QualityReport,
    min_words: usize,
    min_modules: usize,
    min_images: usize,
    require_local_testimonial: bool,
    has_local_testimonial: bool,
    outcome: &'static str,
}

fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("Failed to load configuration")?;
    telemetry::init_cli_tracing(&config.observability);

    let db = DbPool::new(&config.database).await?;

    match cli.command {
        Commands::Dedupe {
            dry_run,
            content_type,
            title,
        } => {
            let targets = match (content_type, title) {
                (Some(content_type), Some(title)) => vec![DedupeTarget { content_type, title }],
                _ => config.dedupe.targets.clone(),
            };
            cmd_dedupe(&db, &targets, dry_run).await
        }
        Commands::Inspect { content_types } => {
            let content_types = if content_types.is_empty() {
                config.dedupe.targets.iter().map(|t| t.content_type.clone()).collect()
            } else {
                content_types
            };
            cmd_inspect(&db, &content_types).await
        }
        Commands::Gate { service, city } => {
            cmd_gate(&db, QualityPolicy::from(&config.quality), &service, &city).await
        }
        Commands::Migrate => {
            db.migrate().await?;
            emit(&serde_json::json!({ "migrated": true }))
        }
    }
}

async fn cmd_dedupe(db: &DbPool, targets: &[DedupeTarget], dry_run: bool) -> Result<()> {
    let db_store = DbPageStore::new(db.write().clone());

    let store: Box<dyn PageStore> = if dry_run {
        info!("Dry run: reconciling an in-memory copy of the page tree");
        Box::new(MemoryPageStore::from_snapshot(db_store.snapshot().await?))
    } else {
        Box::new(db_store)
    };

    for target in targets {
        let report = reconcile(store.as_ref(), target)
            .await
            .with_context(|| format!("Failed to reconcile {}", target.content_type))?;
        emit(&DedupeOutput {
            dry_run,
            report: &report,
        })?;
    }

    Ok(())
}

async fn cmd_inspect(db: &DbPool, content_types: &[String]) -> Result<()> {
    let store = DbPageStore::new(db.read().clone());

    for content_type in content_types {
        for page in store.find_by_content_type(content_type).await? {
            emit(&page)?;
        }
    }

    Ok(())
}

async fn cmd_gate(db: &DbPool, policy: QualityPolicy, service: &str, city: &str) -> Result<()> {
    let repo = Repository::new(db.clone());

    let Some(service_page) = repo.find_service_page_by_slug(service).await? else {
        bail!("Unknown service '{}'", service);
    };
    let Some(geo_area) = repo.find_geo_area_by_slug(city).await? else {
        bail!("Unknown area '{}'", city);
    };
    let Some(coverage) = repo.find_coverage_for(service_page.id, geo_area.id).await? else {
        bail!("No coverage for {}/{}", service, city);
    };

    let report = policy.evaluate(&coverage);
    let has_local_testimonial = repo.has_testimonial_for_geoarea(geo_area.id).await?;
    let readiness = policy.readiness(&coverage, report, has_local_testimonial);

    emit(&GateOutput {
        coverage_id: coverage.id,
        service: service_page.slug,
        city: geo_area.slug,
        status: coverage.status,
        report,
        min_words: policy.min_words,
        min_modules: policy.min_modules,
        min_images: policy.min_images,
        require_local_testimonial: policy.require_local_testimonial,
        has_local_testimonial,
        outcome: readiness.label(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_args() {
        let cli = Cli::try_parse_from([
            "maintenance",
            "dedupe",
            "--dry-run",
            "--content-type",
            "portfolioindexpage",
            "--title",
            "Portfolio",
        ])
        .unwrap();

        match cli.command {
            Commands::Dedupe {
                dry_run,
                content_type,
                title,
            } => {
                assert!(dry_run);
                assert_eq!(content_type.as_deref(), Some("portfolioindexpage"));
                assert_eq!(title.as_deref(), Some("Portfolio"));
            }
            _ => panic!("expected dedupe"),
        }
    }

    #[test]
    fn test_content_type_requires_title() {
        assert!(Cli::try_parse_from(["maintenance", "dedupe", "--content-type", "x"]).is_err());
    }

    #[test]
    fn test_inspect_accepts_repeated_types() {
        let cli = Cli::try_parse_from([
            "maintenance",
            "inspect",
            "--content-type",
            "servicesindexpage",
            "--content-type",
            "portfolioindexpage",
        ])
        .unwrap();

        match cli.command {
            Commands::Inspect { content_types } => assert_eq!(content_types.len(), 2),
            _ => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_gate_requires_both_slugs() {
        assert!(Cli::try_parse_from(["maintenance", "gate", "--service", "roofing"]).is_err());
    }

    #[test]
    fn test_dedupe_output_is_flat() {
        let report = ReconcileReport {
            content_type: "servicesindexpage".into(),
            title: "Services".into(),
            canonical_id: 3,
            created: false,
            moved: 4,
            deleted: 2,
            archived: 0,
        };
        let value = serde_json::to_value(DedupeOutput {
            dry_run: true,
            report: &report,
        })
        .unwrap();

        assert_eq!(value["dry_run"], true);
        assert_eq!(value["moved"], 4);
        assert_eq!(value["canonical_id"], 3);
    }
}
