//! Snapshot persistence and export.
//!
//! Snapshots are written to a temp file and renamed into place, so an
//! external reader of the file sees the same fully-before/fully-after
//! guarantee the in-memory store gives.

use crate::models::{Event, Snapshot};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Save a snapshot as JSON via write-to-temp-then-atomic-rename.
pub fn save_snapshot(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move snapshot into {}", path.display()))?;
    Ok(())
}

/// Load a persisted snapshot from JSON.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file {}", path.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&json).context("Failed to deserialize snapshot")?;
    Ok(snapshot)
}

/// Save merged events to CSV, one row per source quote.
pub fn save_events_to_csv(events: &[Event], path: &Path) -> Result<()> {
    let mut file = File::create(path).context("Failed to create CSV file")?;

    writeln!(
        file,
        "Event Key,Sport,League,Start Time,Market,Selection,Parameter,Best Odds,Bookmaker,Bookmaker Odds"
    )?;

    for event in events {
        for market in &event.markets {
            for selection in &market.selections {
                for source in &selection.sources {
                    writeln!(
                        file,
                        "{},{},{},{},{},{},{},{:.2},{},{:.2}",
                        event.event_key,
                        event.sport,
                        event.league,
                        event.start_time.to_rfc3339(),
                        market.market_type,
                        selection.name,
                        selection
                            .parameter
                            .map(|p| format!("{:+.1}", p))
                            .unwrap_or_default(),
                        selection.decimal_odds,
                        source.bookmaker_id,
                        source.decimal_odds
                    )?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("oddsmerge_{}_{}", std::process::id(), name))
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            version: 4,
            generated_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            events: vec![],
        }
    }

    #[test]
    fn test_snapshot_round_trips_through_disk() {
        let path = temp_path("roundtrip.json");
        save_snapshot(&snapshot(), &path).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_save_replaces_existing_file_and_leaves_no_temp() {
        let path = temp_path("replace.json");
        save_snapshot(&snapshot(), &path).unwrap();

        let mut newer = snapshot();
        newer.version = 5;
        save_snapshot(&newer, &path).unwrap();

        assert_eq!(load_snapshot(&path).unwrap().version, 5);
        assert!(!path.with_extension("json.tmp").exists());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        assert!(load_snapshot(&temp_path("does_not_exist.json")).is_err());
    }
}
