//! Adapter for the "sharpline" collector: one CSV file per cycle with
//! a header row and decimal odds. This collector is a single book, so
//! the source id doubles as the bookmaker id.

use super::{AdapterRecord, MalformedSourceError};
use crate::models::MarketType;
use crate::odds::{self, OddsFormat};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Row schema:
/// sport,league,start_time,home,away,market,selection,line,odds
///
/// For outright markets `home` carries the event name and `away` is
/// empty; `line` is empty when the market has no parameter.
#[derive(Debug, Deserialize)]
struct Row {
    sport: String,
    league: String,
    start_time: DateTime<Utc>,
    home: String,
    away: String,
    market: String,
    selection: String,
    line: Option<f64>,
    odds: String,
}

fn market_type(key: &str) -> MarketType {
    match key {
        "moneyline" => MarketType::Moneyline,
        "spread" => MarketType::Spread,
        "total" => MarketType::Total,
        "outright" => MarketType::OutrightWinner,
        other => MarketType::Other(other.to_string()),
    }
}

pub fn parse(raw: &[u8], source_id: &str) -> Result<Vec<AdapterRecord>, MalformedSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(raw);

    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<Row>().enumerate() {
        let row = row.map_err(|e| {
            MalformedSourceError::new(source_id, &format!("row {}", idx + 1), e.to_string())
        })?;
        if row.sport.is_empty() || row.selection.is_empty() {
            return Err(MalformedSourceError::new(
                source_id,
                &format!("row {}", idx + 1),
                "sport and selection are required",
            ));
        }

        let decimal_odds = match odds::parse_odds(&row.odds, OddsFormat::Decimal) {
            Ok(d) => d,
            Err(e) => {
                warn!(
                    source = source_id,
                    row = idx + 1,
                    selection = %row.selection,
                    error = %e,
                    "dropping selection with invalid odds"
                );
                continue;
            }
        };

        let participants = if row.away.is_empty() {
            vec![row.home.clone()]
        } else {
            vec![row.home.clone(), row.away.clone()]
        };

        records.push(AdapterRecord {
            sport: row.sport,
            league: row.league,
            start_time: row.start_time,
            participants,
            market_type: market_type(&row.market),
            selection: row.selection,
            parameter: row.line,
            decimal_odds,
            bookmaker_id: source_id.to_string(),
            raw_identifiers: BTreeMap::from([("row".to_string(), (idx + 1).to_string())]),
        });
    }
    Ok(records)
}
