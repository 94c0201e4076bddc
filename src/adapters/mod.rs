//! Source adapters: one per collector file format.
//!
//! Each external collector writes a file in its own schema on its own
//! schedule. An adapter is a pure, one-shot translation from those raw
//! bytes into flat [`AdapterRecord`]s in the canonical model. Adding a
//! new source means adding a [`SourceFormat`] variant and a module
//! here; the merger and the store never change.

pub mod exchange;
pub mod oddsfeed;
pub mod sharpline;

use crate::merge::{normalize_name, parameter_key};
use crate::models::MarketType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;

/// The collector file formats we understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    OddsfeedJson,
    SharplineCsv,
    ExchangeJson,
}

/// One configured collector: where its file lands and how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub format: SourceFormat,
    pub path: PathBuf,
}

/// One selection-level row produced by an adapter: the event, market,
/// selection, and source-record fields flattened into a single value
/// the merger folds over.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterRecord {
    pub sport: String,
    pub league: String,
    pub start_time: DateTime<Utc>,
    pub participants: Vec<String>,
    pub market_type: MarketType,
    pub selection: String,
    pub parameter: Option<f64>,
    pub decimal_odds: f64,
    pub bookmaker_id: String,
    pub raw_identifiers: BTreeMap<String, String>,
}

/// A payload from one source that could not be parsed. Isolated to
/// that source: the ingest cycle logs it and merges everyone else.
#[derive(Debug, Clone, Error)]
#[error("malformed payload from source {source_id}: field {field}: {detail}")]
pub struct MalformedSourceError {
    pub source_id: String,
    pub field: String,
    pub detail: String,
}

impl MalformedSourceError {
    pub fn new(source_id: &str, field: &str, detail: impl Into<String>) -> Self {
        Self {
            source_id: source_id.to_string(),
            field: field.to_string(),
            detail: detail.into(),
        }
    }
}

/// Parse one raw collector file into canonical records.
///
/// An empty but well-formed payload yields an empty vec; a malformed
/// payload fails naming the source and the first offending field.
/// Exact (name, parameter) repeats within the same payload are
/// deduplicated, keeping the later occurrence.
pub fn parse_source(
    raw: &[u8],
    spec: &SourceSpec,
) -> Result<Vec<AdapterRecord>, MalformedSourceError> {
    let records = match spec.format {
        SourceFormat::OddsfeedJson => oddsfeed::parse(raw, &spec.id)?,
        SourceFormat::SharplineCsv => sharpline::parse(raw, &spec.id)?,
        SourceFormat::ExchangeJson => exchange::parse(raw, &spec.id)?,
    };
    Ok(dedup_exact_repeats(records))
}

/// Collapse exact repeats of the same selection slot within one
/// payload. Later wins; everything else keeps its position.
fn dedup_exact_repeats(records: Vec<AdapterRecord>) -> Vec<AdapterRecord> {
    let mut out: Vec<AdapterRecord> = Vec::with_capacity(records.len());
    let mut seen: HashMap<(String, i64, String, String, Option<i64>), usize> = HashMap::new();

    for record in records {
        let key = (
            record
                .participants
                .iter()
                .map(|p| normalize_name(p))
                .collect::<Vec<_>>()
                .join("|"),
            record.start_time.timestamp(),
            record.market_type.to_string(),
            format!(
                "{}::{}",
                record.bookmaker_id,
                normalize_name(&record.selection)
            ),
            parameter_key(record.parameter),
        );
        match seen.get(&key) {
            Some(&idx) => out[idx] = record,
            None => {
                seen.insert(key, out.len());
                out.push(record);
            }
        }
    }
    out
}
