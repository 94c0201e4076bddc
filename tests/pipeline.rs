//! End-to-end ingest tests: collector files on disk in, merged
//! snapshot out of the store.

use oddsmerge::adapters::{SourceFormat, SourceSpec};
use oddsmerge::persist::save_snapshot;
use oddsmerge::{run_ingest_cycle, warm_start, Config, SnapshotStore};
use std::path::PathBuf;

const ODDSFEED_PAYLOAD: &str = r#"[
    {
        "id": "abc123",
        "sport_key": "basketball_nba",
        "sport_title": "NBA",
        "commence_time": "2026-01-10T18:30:00Z",
        "home_team": "Lakers",
        "away_team": "Celtics",
        "bookmakers": [
            {
                "key": "pinnacle",
                "markets": [
                    {
                        "key": "h2h",
                        "outcomes": [
                            { "name": "Lakers", "price": 150 },
                            { "name": "Celtics", "price": -170 }
                        ]
                    }
                ]
            }
        ]
    }
]"#;

// Same fixture, a minute of clock skew, decimal odds.
const SHARPLINE_PAYLOAD: &str = "\
sport,league,start_time,home,away,market,selection,line,odds
basketball,NBA,2026-01-10T18:31:00Z,Lakers,Celtics,moneyline,Lakers,,2.60
basketball,NBA,2026-01-10T18:31:00Z,Lakers,Celtics,moneyline,Celtics,,1.55
";

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("oddsmerge_it_{}_{}", std::process::id(), name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_source(dir: &PathBuf, file: &str, contents: &str) -> PathBuf {
    let path = dir.join(file);
    std::fs::write(&path, contents).unwrap();
    path
}

fn config_for(sources: Vec<SourceSpec>) -> Config {
    Config {
        sources,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_two_sources_merge_into_multi_book_event() {
    let dir = scratch_dir("merge");
    let config = config_for(vec![
        SourceSpec {
            id: "oddsfeed".to_string(),
            format: SourceFormat::OddsfeedJson,
            path: write_source(&dir, "oddsfeed.json", ODDSFEED_PAYLOAD),
        },
        SourceSpec {
            id: "sharpline".to_string(),
            format: SourceFormat::SharplineCsv,
            path: write_source(&dir, "sharpline.csv", SHARPLINE_PAYLOAD),
        },
    ]);

    let store = SnapshotStore::new();
    let report = run_ingest_cycle(&config, &store).await.unwrap();
    assert_eq!(report.version, Some(1));
    assert_eq!(report.sources_parsed, 2);
    assert_eq!(report.events, 1);

    let published = store.read().await.unwrap();
    let event = &published.snapshot.events[0];
    assert_eq!(event.participants, vec!["Lakers", "Celtics"]);
    assert_eq!(event.markets.len(), 1);

    for selection in &event.markets[0].selections {
        let books: Vec<&str> = selection
            .sources
            .iter()
            .map(|s| s.bookmaker_id.as_str())
            .collect();
        assert_eq!(books, vec!["pinnacle", "sharpline"]);
    }

    // Best quote across books becomes the canonical odds.
    let lakers = event.markets[0]
        .selections
        .iter()
        .find(|s| s.name == "Lakers")
        .unwrap();
    assert_eq!(lakers.decimal_odds, 2.60);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_malformed_source_does_not_block_the_others() {
    let dir = scratch_dir("isolation");
    let config = config_for(vec![
        SourceSpec {
            id: "broken".to_string(),
            format: SourceFormat::OddsfeedJson,
            path: write_source(&dir, "broken.json", "{ torn mid-overwrite"),
        },
        SourceSpec {
            id: "sharpline".to_string(),
            format: SourceFormat::SharplineCsv,
            path: write_source(&dir, "sharpline.csv", SHARPLINE_PAYLOAD),
        },
    ]);

    let store = SnapshotStore::new();
    let report = run_ingest_cycle(&config, &store).await.unwrap();
    assert_eq!(report.sources_failed, 1);
    assert_eq!(report.sources_parsed, 1);
    assert_eq!(report.version, Some(1));

    let published = store.read().await.unwrap();
    assert_eq!(published.snapshot.events.len(), 1);
    let sources = &published.snapshot.events[0].markets[0].selections[0].sources;
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].bookmaker_id, "sharpline");

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_absent_file_skips_source_without_failing() {
    let dir = scratch_dir("absent");
    let config = config_for(vec![
        SourceSpec {
            id: "missing".to_string(),
            format: SourceFormat::ExchangeJson,
            path: dir.join("never_written.json"),
        },
        SourceSpec {
            id: "sharpline".to_string(),
            format: SourceFormat::SharplineCsv,
            path: write_source(&dir, "sharpline.csv", SHARPLINE_PAYLOAD),
        },
    ]);

    let store = SnapshotStore::new();
    let report = run_ingest_cycle(&config, &store).await.unwrap();
    assert_eq!(report.sources_absent, 1);
    assert_eq!(report.sources_failed, 0);
    assert_eq!(report.version, Some(1));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_nothing_published_when_no_source_has_data() {
    let dir = scratch_dir("empty");
    let config = config_for(vec![SourceSpec {
        id: "missing".to_string(),
        format: SourceFormat::OddsfeedJson,
        path: dir.join("never_written.json"),
    }]);

    let store = SnapshotStore::new();
    let report = run_ingest_cycle(&config, &store).await.unwrap();
    assert_eq!(report.version, None);
    assert!(store.read().await.is_err());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_reingesting_same_files_yields_identical_content() {
    let dir = scratch_dir("idempotent");
    let config = config_for(vec![
        SourceSpec {
            id: "oddsfeed".to_string(),
            format: SourceFormat::OddsfeedJson,
            path: write_source(&dir, "oddsfeed.json", ODDSFEED_PAYLOAD),
        },
        SourceSpec {
            id: "sharpline".to_string(),
            format: SourceFormat::SharplineCsv,
            path: write_source(&dir, "sharpline.csv", SHARPLINE_PAYLOAD),
        },
    ]);

    let store = SnapshotStore::new();
    run_ingest_cycle(&config, &store).await.unwrap();
    let first = store.read().await.unwrap();

    run_ingest_cycle(&config, &store).await.unwrap();
    let second = store.read().await.unwrap();

    assert_eq!(second.snapshot.version, 2);
    assert_eq!(first.content_hash, second.content_hash);
    assert_eq!(first.snapshot.events, second.snapshot.events);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_warm_start_restores_persisted_snapshot() {
    let dir = scratch_dir("warm");
    let snapshot_path = dir.join("snapshot.json");

    let seed_config = Config {
        sources: vec![SourceSpec {
            id: "sharpline".to_string(),
            format: SourceFormat::SharplineCsv,
            path: write_source(&dir, "sharpline.csv", SHARPLINE_PAYLOAD),
        }],
        snapshot_path: Some(snapshot_path.clone()),
        ..Default::default()
    };

    let store = SnapshotStore::new();
    run_ingest_cycle(&seed_config, &store).await.unwrap();
    let seeded = store.read().await.unwrap();
    save_snapshot(&seeded.snapshot, &snapshot_path).unwrap();

    // Fresh process: no sources available, only the persisted file.
    let restart_config = Config {
        sources: vec![],
        snapshot_path: Some(snapshot_path),
        ..Default::default()
    };
    let fresh_store = SnapshotStore::new();
    warm_start(&restart_config, &fresh_store).await.unwrap();

    let restored = fresh_store.read().await.unwrap();
    assert_eq!(restored.snapshot.version, 1);
    assert_eq!(restored.snapshot.events, seeded.snapshot.events);

    std::fs::remove_dir_all(&dir).ok();
}
