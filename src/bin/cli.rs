use anyhow::Result;
use clap::Parser;
use oddsmerge::persist::{save_events_to_csv, save_snapshot};
use oddsmerge::{run_ingest_cycle, Config, SnapshotStore};
use std::path::PathBuf;

/// Run one ingest pass over the configured sources and print a
/// summary of the merged snapshot.
#[derive(Parser)]
struct Args {
    /// Path to the sources config file
    #[arg(long, default_value = "config/sources.json")]
    config: PathBuf,

    /// Write the merged snapshot as JSON to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the merged events as CSV to this path
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::from_file(&args.config)?;
    let store = SnapshotStore::new();

    println!("Odds Aggregation Pipeline\n");
    println!("Ingesting {} configured sources...\n", config.sources.len());

    let report = run_ingest_cycle(&config, &store).await?;

    println!(
        "Sources: {} parsed, {} absent, {} failed",
        report.sources_parsed, report.sources_absent, report.sources_failed
    );
    println!("Records parsed: {}", report.records);

    let Some(version) = report.version else {
        println!("\nNo source produced data; nothing was published.");
        return Ok(());
    };

    let published = store.read().await?;
    println!(
        "Published snapshot version {} with {} merged events\n",
        version, report.events
    );

    for event in &published.snapshot.events {
        let books: usize = event
            .markets
            .iter()
            .flat_map(|m| m.selections.iter())
            .map(|s| s.sources.len())
            .max()
            .unwrap_or(0);
        println!(
            "{} | {} | {} | {} markets | quoted by up to {} books",
            event.start_time.format("%Y-%m-%d %H:%M"),
            event.league,
            event.participants.join(" vs "),
            event.markets.len(),
            books
        );
    }

    if let Some(path) = &args.out {
        save_snapshot(&published.snapshot, path)?;
        println!("\nSaved snapshot to {}", path.display());
    }

    if let Some(path) = &args.csv {
        save_events_to_csv(&published.snapshot.events, path)?;
        println!("\nSaved merged events to {}", path.display());
    }

    Ok(())
}
