use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tourfind_core::config::{Config, SearchConfig};
use tourfind_core::snapshot::SnapshotTour;
use tourfind_core::sources::{load_business_directory, load_sheet_rows};
use tourfind_core::TourHandle;
use tourfind_query::QueryOutcome;
use tourfind_service::{load_feeds, TourSearch};
use tourfind_trigger::{ElementTrigger, TriggerStatus};

#[derive(Parser)]
#[command(name = "tourfind")]
#[command(about = "Search and trigger elements of a virtual tour scene snapshot")]
struct Cli {
    /// Directory holding tourfind.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Feeds {
    /// Business directory JSON, overrides businessData.businessDataFile
    #[arg(long)]
    business: Option<PathBuf>,
    /// Spreadsheet rows as a JSON array
    #[arg(long)]
    sheets: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index and list its records
    Index {
        snapshot: PathBuf,
        #[command(flatten)]
        feeds: Feeds,
        #[arg(long)]
        json: bool,
    },
    /// Run one query against a freshly built index
    Query {
        snapshot: PathBuf,
        term: String,
        #[command(flatten)]
        feeds: Feeds,
        #[arg(long)]
        json: bool,
    },
    /// Locate and activate an element by id
    Trigger {
        snapshot: PathBuf,
        element_id: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config_dir)
        .and_then(|c| c.search())
        .context("loading configuration")?;

    match cli.command {
        Commands::Index { snapshot, feeds, json } => {
            let search = open(&snapshot, &config, &cli.config_dir, &feeds)?;
            let index = search.index();
            if json {
                println!("{}", serde_json::to_string_pretty(index.as_ref())?);
                return Ok(());
            }
            println!("mode={}  records={}", index.mode(), index.len());
            for (i, record) in index.records().iter().enumerate() {
                let parent = record.parent_label.as_deref().map(|p| format!("  in {p}")).unwrap_or_default();
                println!("  {:>3}. [{}] {}{}", i + 1, record.kind.as_str(), record.label, parent);
            }
        }
        Commands::Query { snapshot, term, feeds, json } => {
            let search = open(&snapshot, &config, &cli.config_dir, &feeds)?;
            let outcome = search.query(&term);
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }
            print_outcome(&term, &outcome);
        }
        Commands::Trigger { snapshot, element_id } => {
            let tour: Arc<dyn TourHandle> = Arc::new(load_tour(&snapshot)?);
            let trigger = ElementTrigger::new(tour, config.element_triggering.clone());
            let cancel = CancellationToken::new();
            let watcher = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    watcher.cancel();
                }
            });
            let outcome = trigger.run(&element_id, &cancel).await;
            match outcome.status {
                TriggerStatus::Success { lookup, method } => {
                    println!("triggered {element_id} via {lookup:?} / {} after {} attempt(s)", method.method_name(), outcome.attempts);
                }
                TriggerStatus::Exhausted => anyhow::bail!("{element_id} not triggered after {} attempt(s)", outcome.attempts),
                TriggerStatus::Cancelled => println!("cancelled"),
            }
        }
    }
    Ok(())
}

fn load_tour(path: &Path) -> anyhow::Result<SnapshotTour> {
    SnapshotTour::load(path).with_context(|| format!("reading snapshot {}", path.display()))
}

fn open(snapshot: &Path, config: &SearchConfig, config_dir: &Path, feeds: &Feeds) -> anyhow::Result<TourSearch> {
    let tour: Arc<dyn TourHandle> = Arc::new(load_tour(snapshot)?);
    let mut external = load_feeds(config, config_dir)?;
    if let Some(path) = &feeds.business {
        external.business = load_business_directory(path)?;
    }
    if let Some(path) = &feeds.sheets {
        external.sheets = load_sheet_rows(path)?;
    }
    let search = TourSearch::new(config.clone(), Some(tour))?;
    let index = search.prepare(&external);
    info!(records = index.len(), "index ready");
    Ok(search)
}

fn print_outcome(term: &str, outcome: &QueryOutcome) {
    match outcome {
        QueryOutcome::Idle => println!("nothing to search"),
        QueryOutcome::NeedsMoreCharacters { min } => println!("type at least {min} characters"),
        QueryOutcome::Error(message) => eprintln!("{message}"),
        QueryOutcome::Results(results) => {
            println!("Found {} results for: \"{}\"", results.len(), term);
            for group in &results.groups {
                println!("\n{} ({})", group.display_label, group.results.len());
                for hit in &group.results {
                    println!("  score={:.4}  {}  -> {:?}", hit.score, hit.record.label, hit.action);
                }
            }
        }
    }
}
