pub mod adapters;
pub mod config;
pub mod merge;
pub mod models;
pub mod odds;
pub mod persist;
pub mod serve;
pub mod store;

pub use config::Config;
pub use models::*;
pub use store::SnapshotStore;

use adapters::{parse_source, AdapterRecord};
use anyhow::Result;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// What one ingest cycle did, for logs and the CLI summary.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Version assigned to the published snapshot, if one went out.
    pub version: Option<u64>,
    pub sources_parsed: usize,
    pub sources_absent: usize,
    pub sources_failed: usize,
    pub records: usize,
    pub events: usize,
}

/// Run one full ingest pass: read every configured source file, parse
/// what is there, merge, and publish a new snapshot.
///
/// Per-source failures are contained: an absent file means "no data
/// this cycle", a malformed or torn payload is logged and that
/// source's contribution is simply missing from this snapshot. Nothing
/// is published only when no source produced data at all, so a stale
/// snapshot is never replaced by an empty one.
pub async fn run_ingest_cycle(config: &Config, store: &SnapshotStore) -> Result<IngestReport> {
    let mut report = IngestReport::default();
    let mut outputs: Vec<Vec<AdapterRecord>> = Vec::new();

    for spec in &config.sources {
        let raw = match tokio::fs::read(&spec.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(source = %spec.id, path = %spec.path.display(), "source file absent, skipping this cycle");
                report.sources_absent += 1;
                continue;
            }
            Err(e) => {
                warn!(source = %spec.id, error = %e, "failed to read source file, skipping this cycle");
                report.sources_failed += 1;
                continue;
            }
        };

        match parse_source(&raw, spec) {
            Ok(records) => {
                report.sources_parsed += 1;
                report.records += records.len();
                outputs.push(records);
            }
            Err(e) => {
                // Covers both genuinely bad payloads and files caught
                // mid-overwrite; either way we retry next cycle.
                warn!(source = %spec.id, error = %e, "malformed source payload, skipping this cycle");
                report.sources_failed += 1;
            }
        }
    }

    if report.sources_parsed == 0 {
        warn!("no source produced data this cycle, keeping previous snapshot");
        return Ok(report);
    }

    let events = merge::merge_records(&config.match_policy(), &outputs);
    report.events = events.len();

    let version = store.publish(events).await;
    report.version = Some(version);
    info!(
        version,
        events = report.events,
        sources = report.sources_parsed,
        "published snapshot"
    );

    if let Some(path) = &config.snapshot_path {
        let published = store.read().await?;
        persist::save_snapshot(&published.snapshot, path)?;
    }

    Ok(report)
}

/// Reload the persisted snapshot, if configured and present, so the
/// API can serve data before the first ingest cycle completes.
pub async fn warm_start(config: &Config, store: &SnapshotStore) -> Result<()> {
    let Some(path) = &config.snapshot_path else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }
    let snapshot = persist::load_snapshot(path)?;
    info!(
        version = snapshot.version,
        events = snapshot.events.len(),
        "restored persisted snapshot"
    );
    store.restore(snapshot).await;
    Ok(())
}

/// Run ingest cycles forever on the configured interval. Each cycle is
/// independent; a failed cycle is logged and the next one runs.
pub fn spawn_ingest_loop(
    config: Arc<Config>,
    store: SnapshotStore,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = run_ingest_cycle(&config, &store).await {
                warn!(error = %e, "ingest cycle failed");
            }
        }
    })
}
