//! Adapter for the "exchange" collector: a JSON document with nested
//! markets and fractional odds strings. The interesting shape here is
//! outright/futures markets carrying anywhere from a handful to 100+
//! runners; the adapter keeps them all.

use super::{AdapterRecord, MalformedSourceError};
use crate::models::MarketType;
use crate::odds::{self, OddsFormat};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct ExchangeDoc {
    events: Vec<ExchangeEvent>,
}

#[derive(Debug, Deserialize)]
struct ExchangeEvent {
    id: String,
    sport: String,
    competition: String,
    start: DateTime<Utc>,
    participants: Vec<String>,
    markets: Vec<ExchangeMarket>,
}

#[derive(Debug, Deserialize)]
struct ExchangeMarket {
    id: String,
    kind: String,
    #[serde(default)]
    line: Option<f64>,
    runners: Vec<ExchangeRunner>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRunner {
    id: String,
    name: String,
    /// Fractional odds string, e.g. "5/2".
    price: String,
}

fn market_type(kind: &str) -> MarketType {
    match kind {
        "match_odds" => MarketType::Moneyline,
        "handicap" => MarketType::Spread,
        "over_under" => MarketType::Total,
        "outright" => MarketType::OutrightWinner,
        other => MarketType::Other(other.to_string()),
    }
}

pub fn parse(raw: &[u8], source_id: &str) -> Result<Vec<AdapterRecord>, MalformedSourceError> {
    let doc: ExchangeDoc = serde_json::from_slice(raw)
        .map_err(|e| MalformedSourceError::new(source_id, "events", e.to_string()))?;

    let mut records = Vec::new();
    for event in &doc.events {
        if event.participants.is_empty() {
            return Err(MalformedSourceError::new(
                source_id,
                "participants",
                format!("event {} has no participants", event.id),
            ));
        }

        for market in &event.markets {
            for runner in &market.runners {
                let decimal_odds = match odds::parse_odds(&runner.price, OddsFormat::Fractional) {
                    Ok(d) => d,
                    Err(e) => {
                        warn!(
                            source = source_id,
                            event = %event.id,
                            runner = %runner.name,
                            error = %e,
                            "dropping runner with invalid odds"
                        );
                        continue;
                    }
                };

                records.push(AdapterRecord {
                    sport: event.sport.clone(),
                    league: event.competition.clone(),
                    start_time: event.start,
                    participants: event.participants.clone(),
                    market_type: market_type(&market.kind),
                    selection: runner.name.clone(),
                    parameter: market.line,
                    decimal_odds,
                    bookmaker_id: source_id.to_string(),
                    raw_identifiers: BTreeMap::from([
                        ("event_id".to_string(), event.id.clone()),
                        ("market_id".to_string(), market.id.clone()),
                        ("runner_id".to_string(), runner.id.clone()),
                    ]),
                });
            }
        }
    }
    Ok(records)
}
