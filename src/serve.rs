//! Query answering over the current snapshot.
//!
//! Every endpoint goes through the same bounded-wait read: if the
//! store cannot hand back a snapshot within the configured timeout the
//! request gets a gateway-timeout class answer instead of hanging.
//! Filtering and odds re-formatting happen against the in-memory
//! snapshot, no extra I/O.

use crate::models::{Event, Market, Selection, SourceRecord};
use crate::odds::{self, OddsFormat};
use crate::store::{NoDataYetError, Published, ReadOutcome, SnapshotStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Filters accepted by `GET /events`. Absent fields match everything;
/// a filter matching nothing yields an empty result, not an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    pub sport: Option<String>,
    pub league: Option<String>,
    pub search: Option<String>,
    pub since_version: Option<u64>,
    pub odds_format: Option<OddsFormat>,
}

/// Terminal state of one request; each maps 1:1 to a response class.
#[derive(Debug)]
pub enum QueryOutcome {
    Served(EventsResponse),
    NotModified { etag: String },
    NoDataYet,
    TimedOut,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub version: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub generated_at: DateTime<Utc>,
    #[serde(skip)]
    pub etag: String,
    pub events: Vec<EventView>,
}

#[derive(Debug, Serialize)]
pub struct EventView {
    pub event_key: String,
    pub sport: String,
    pub league: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start_time: DateTime<Utc>,
    pub participants: Vec<String>,
    pub markets: Vec<MarketView>,
}

#[derive(Debug, Serialize)]
pub struct MarketView {
    pub market_type: String,
    pub selections: Vec<SelectionView>,
}

#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub name: String,
    pub parameter: Option<f64>,
    pub odds: OddsView,
    pub sources: Vec<SourceView>,
}

#[derive(Debug, Serialize)]
pub struct SourceView {
    pub bookmaker_id: String,
    pub odds: OddsView,
    pub raw_identifiers: BTreeMap<String, String>,
}

/// Odds rendered in the caller's requested notation. Decimal stays a
/// number; american and fractional are strings ("+171", "5/2").
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OddsView {
    Decimal(f64),
    Text(String),
}

/// Answer one query under a bounded wait against the store.
pub async fn query_events(
    store: &SnapshotStore,
    timeout: Duration,
    query: &EventsQuery,
) -> QueryOutcome {
    let published = match bounded_read(store, timeout, query.since_version).await {
        Ok(ReadOutcome::Changed(published)) => published,
        Ok(ReadOutcome::NotModified {
            version,
            content_hash,
        }) => {
            return QueryOutcome::NotModified {
                etag: etag(version, content_hash),
            }
        }
        Err(outcome) => return outcome,
    };

    let format = query.odds_format.unwrap_or(OddsFormat::Decimal);
    let events = published
        .snapshot
        .events
        .iter()
        .filter(|event| matches_query(event, query))
        .map(|event| event_view(event, format))
        .collect();

    QueryOutcome::Served(EventsResponse {
        version: published.snapshot.version,
        generated_at: published.snapshot.generated_at,
        etag: etag_for(&published),
        events,
    })
}

/// Current snapshot metadata for health reporting.
pub async fn snapshot_status(
    store: &SnapshotStore,
    timeout: Duration,
) -> Result<(u64, DateTime<Utc>), QueryOutcome> {
    match tokio::time::timeout(timeout, store.read()).await {
        Ok(Ok(published)) => Ok((published.snapshot.version, published.snapshot.generated_at)),
        Ok(Err(NoDataYetError)) => Err(QueryOutcome::NoDataYet),
        Err(_) => Err(QueryOutcome::TimedOut),
    }
}

async fn bounded_read(
    store: &SnapshotStore,
    timeout: Duration,
    since_version: Option<u64>,
) -> Result<ReadOutcome, QueryOutcome> {
    let read = async {
        match since_version {
            Some(version) => store.read_since(version).await,
            None => store.read().await.map(ReadOutcome::Changed),
        }
    };
    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(NoDataYetError)) => Err(QueryOutcome::NoDataYet),
        Err(_) => Err(QueryOutcome::TimedOut),
    }
}

/// Cache-validation token derived from the snapshot version and
/// content hash; unchanged data answers without re-serializing.
pub fn etag_for(published: &Published) -> String {
    etag(published.snapshot.version, published.content_hash)
}

fn etag(version: u64, content_hash: u64) -> String {
    format!("\"{}-{:016x}\"", version, content_hash)
}

fn matches_query(event: &Event, query: &EventsQuery) -> bool {
    if let Some(sport) = &query.sport {
        if !event.sport.eq_ignore_ascii_case(sport) {
            return false;
        }
    }
    if let Some(league) = &query.league {
        if !event.league.eq_ignore_ascii_case(league) {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let mut haystacks = event
            .participants
            .iter()
            .chain(std::iter::once(&event.league))
            .chain(std::iter::once(&event.sport));
        if !haystacks.any(|h| h.to_lowercase().contains(&needle)) {
            return false;
        }
    }
    true
}

fn event_view(event: &Event, format: OddsFormat) -> EventView {
    EventView {
        event_key: event.event_key.clone(),
        sport: event.sport.clone(),
        league: event.league.clone(),
        start_time: event.start_time,
        participants: event.participants.clone(),
        markets: event
            .markets
            .iter()
            .map(|market| market_view(market, format))
            .collect(),
    }
}

fn market_view(market: &Market, format: OddsFormat) -> MarketView {
    MarketView {
        market_type: market.market_type.to_string(),
        selections: market
            .selections
            .iter()
            .map(|selection| selection_view(selection, format))
            .collect(),
    }
}

fn selection_view(selection: &Selection, format: OddsFormat) -> SelectionView {
    SelectionView {
        name: selection.name.clone(),
        parameter: selection.parameter,
        odds: odds_view(selection.decimal_odds, format),
        sources: selection
            .sources
            .iter()
            .map(|source| source_view(source, format))
            .collect(),
    }
}

fn source_view(source: &SourceRecord, format: OddsFormat) -> SourceView {
    SourceView {
        bookmaker_id: source.bookmaker_id.clone(),
        odds: odds_view(source.decimal_odds, format),
        raw_identifiers: source.raw_identifiers.clone(),
    }
}

fn odds_view(decimal: f64, format: OddsFormat) -> OddsView {
    match format {
        OddsFormat::Decimal => OddsView::Decimal(decimal),
        // Stored odds are always > 1.0, but fall back to decimal
        // rather than failing a whole response over one quote.
        OddsFormat::American => odds::to_american(decimal)
            .map(OddsView::Text)
            .unwrap_or(OddsView::Decimal(decimal)),
        OddsFormat::Fractional => odds::to_fractional(decimal)
            .map(|(num, den)| OddsView::Text(format!("{}/{}", num, den)))
            .unwrap_or(OddsView::Decimal(decimal)),
    }
}
