use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of market a bookmaker offers on an event.
///
/// The vocabulary is closed at normalization time; types we do not
/// recognize are preserved under `Other` instead of being dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MarketType {
    Moneyline,
    Spread,
    Total,
    OutrightWinner,
    Other(String),
}

impl From<String> for MarketType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "moneyline" => MarketType::Moneyline,
            "spread" => MarketType::Spread,
            "total" => MarketType::Total,
            "outright_winner" => MarketType::OutrightWinner,
            _ => MarketType::Other(s),
        }
    }
}

impl From<MarketType> for String {
    fn from(m: MarketType) -> Self {
        m.to_string()
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Moneyline => write!(f, "moneyline"),
            MarketType::Spread => write!(f, "spread"),
            MarketType::Total => write!(f, "total"),
            MarketType::OutrightWinner => write!(f, "outright_winner"),
            MarketType::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One bookmaker's contribution to a merged selection.
///
/// `raw_identifiers` keeps the adapter-assigned ids from the source
/// payload so re-ingesting the same file is idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub bookmaker_id: String,
    pub decimal_odds: f64,
    pub raw_identifiers: BTreeMap<String, String>,
}

/// A single outcome within a market.
///
/// Decimal odds are the canonical storage form and are always > 1.0;
/// american and fractional renderings are computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    pub parameter: Option<f64>,
    pub decimal_odds: f64,
    pub sources: Vec<SourceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub market_type: MarketType,
    pub selections: Vec<Selection>,
}

/// A merged real-world event with every market we know about.
///
/// `event_key` is the deterministic identifier used to match the same
/// event across independent sources. Outright/futures events carry a
/// single descriptive participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_key: String,
    pub sport: String,
    pub league: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start_time: DateTime<Utc>,
    pub participants: Vec<String>,
    pub markets: Vec<Market>,
}

/// One immutable, versioned, fully-merged view of all known events.
///
/// Snapshots are created by the merger, published atomically to the
/// store, and superseded by the next snapshot; they are never mutated
/// in place, so a reader holding one can keep using it after a newer
/// version is published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub generated_at: DateTime<Utc>,
    pub events: Vec<Event>,
}
