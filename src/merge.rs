//! Cross-source event matching and snapshot merging.
//!
//! Merging is a pure fold over the adapters' outputs: feeding the same
//! set of source payloads in any order yields the same event list,
//! because every output collection is sorted by a stable key and all
//! per-slot conflicts are resolved by order-independent rules.

use crate::adapters::AdapterRecord;
use crate::models::{Event, Market, MarketType, Selection, SourceRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Matching tolerances. The start-time bucket absorbs small clock skew
/// between collectors quoting the same fixture; 5 minutes is the
/// default, not a law of nature, so it stays configurable.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    pub bucket_secs: i64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self { bucket_secs: 300 }
    }
}

/// Normalize a participant or sport name for matching: case-folded,
/// punctuation stripped, whitespace collapsed to underscores.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Deterministic identifier for a real-world event: normalized
/// participant names sorted lexicographically plus the start time
/// rounded to the nearest bucket.
pub fn event_key(
    policy: &MatchPolicy,
    sport: &str,
    participants: &[String],
    start_time: DateTime<Utc>,
) -> String {
    let mut names: Vec<String> = participants.iter().map(|p| normalize_name(p)).collect();
    names.sort();

    let bucket = policy.bucket_secs.max(1);
    let ts = start_time.timestamp();
    let rounded = (ts + bucket / 2).div_euclid(bucket) * bucket;

    format!("{}:{}@{}", normalize_name(sport), names.join("|"), rounded)
}

/// Key selections by normalized name plus the line scaled to
/// millis, so 2.5 and 2.5000001 from different sources land in the
/// same slot while 2.5 and 3.5 stay apart.
pub(crate) fn parameter_key(parameter: Option<f64>) -> Option<i64> {
    parameter.map(|p| (p * 1000.0).round() as i64)
}

struct SelectionAcc {
    name: String,
    parameter: Option<f64>,
    display_owner: String,
    sources: BTreeMap<String, SourceRecord>,
}

struct EventAcc {
    sport: String,
    league: String,
    start_time: DateTime<Utc>,
    participants: Vec<String>,
    display_owner: String,
    markets: BTreeMap<MarketType, BTreeMap<(String, Option<i64>), SelectionAcc>>,
}

/// Fold every source's adapter output into one merged event list.
///
/// Events sharing an `event_key` become one multi-source event;
/// events with no match stay single-source, which is valid. Within one
/// source payload, a later record for the same slot replaces the
/// earlier one. When display fields (team spelling, start time,
/// league) differ across sources, the contribution from the
/// lexicographically smallest bookmaker id wins so the result does not
/// depend on arrival order.
pub fn merge_records(policy: &MatchPolicy, sources: &[Vec<AdapterRecord>]) -> Vec<Event> {
    let mut events: BTreeMap<String, EventAcc> = BTreeMap::new();

    for records in sources {
        for record in records {
            let key = event_key(
                policy,
                &record.sport,
                &record.participants,
                record.start_time,
            );

            let event = events.entry(key).or_insert_with(|| EventAcc {
                sport: record.sport.clone(),
                league: record.league.clone(),
                start_time: record.start_time,
                participants: record.participants.clone(),
                display_owner: record.bookmaker_id.clone(),
                markets: BTreeMap::new(),
            });
            if record.bookmaker_id < event.display_owner {
                event.sport = record.sport.clone();
                event.league = record.league.clone();
                event.start_time = record.start_time;
                event.participants = record.participants.clone();
                event.display_owner = record.bookmaker_id.clone();
            }

            let slot_key = (
                normalize_name(&record.selection),
                parameter_key(record.parameter),
            );
            let selection = event
                .markets
                .entry(record.market_type.clone())
                .or_default()
                .entry(slot_key)
                .or_insert_with(|| SelectionAcc {
                    name: record.selection.clone(),
                    parameter: record.parameter,
                    display_owner: record.bookmaker_id.clone(),
                    sources: BTreeMap::new(),
                });
            if record.bookmaker_id < selection.display_owner {
                selection.name = record.selection.clone();
                selection.parameter = record.parameter;
                selection.display_owner = record.bookmaker_id.clone();
            }

            // One record per bookmaker per slot; a duplicate quote from
            // the same bookmaker in the same pass overwrites the
            // earlier one (later-parsed wins, by policy).
            selection.sources.insert(
                record.bookmaker_id.clone(),
                SourceRecord {
                    bookmaker_id: record.bookmaker_id.clone(),
                    decimal_odds: record.decimal_odds,
                    raw_identifiers: record.raw_identifiers.clone(),
                },
            );
        }
    }

    events
        .into_iter()
        .map(|(key, acc)| Event {
            event_key: key,
            sport: acc.sport,
            league: acc.league,
            start_time: acc.start_time,
            participants: acc.participants,
            markets: acc
                .markets
                .into_iter()
                .map(|(market_type, selections)| Market {
                    market_type,
                    selections: selections.into_values().map(finalize_selection).collect(),
                })
                .collect(),
        })
        .collect()
}

fn finalize_selection(acc: SelectionAcc) -> Selection {
    // The canonical quote is the best price on offer across books.
    let decimal_odds = acc
        .sources
        .values()
        .map(|s| s.decimal_odds)
        .fold(f64::MIN, f64::max);

    Selection {
        name: acc.name,
        parameter: acc.parameter,
        decimal_odds,
        sources: acc.sources.into_values().collect(),
    }
}
