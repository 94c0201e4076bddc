//! Adapter for the "oddsfeed" collector: a JSON array of games, each
//! carrying per-bookmaker markets with american prices.

use super::{AdapterRecord, MalformedSourceError};
use crate::models::MarketType;
use crate::odds;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct FeedGame {
    id: String,
    sport_key: String,
    sport_title: String,
    commence_time: DateTime<Utc>,
    home_team: String,
    away_team: String,
    #[serde(default)]
    bookmakers: Vec<FeedBookmaker>,
}

#[derive(Debug, Deserialize)]
struct FeedBookmaker {
    key: String,
    markets: Vec<FeedMarket>,
}

#[derive(Debug, Deserialize)]
struct FeedMarket {
    key: String,
    outcomes: Vec<FeedOutcome>,
}

#[derive(Debug, Deserialize)]
struct FeedOutcome {
    name: String,
    /// American odds as quoted, e.g. -110 or 150.
    price: f64,
    #[serde(default)]
    point: Option<f64>,
}

fn market_type(key: &str) -> MarketType {
    match key {
        "h2h" => MarketType::Moneyline,
        "spreads" => MarketType::Spread,
        "totals" => MarketType::Total,
        "outrights" => MarketType::OutrightWinner,
        other => MarketType::Other(other.to_string()),
    }
}

pub fn parse(raw: &[u8], source_id: &str) -> Result<Vec<AdapterRecord>, MalformedSourceError> {
    let games: Vec<FeedGame> = serde_json::from_slice(raw)
        .map_err(|e| MalformedSourceError::new(source_id, "games", e.to_string()))?;

    let mut records = Vec::new();
    for game in games {
        if game.home_team.trim().is_empty() {
            return Err(MalformedSourceError::new(
                source_id,
                "home_team",
                format!("empty team name in game {}", game.id),
            ));
        }
        // The feed names the sport as "basketball_nba"; the prefix is
        // the sport, the title is the league.
        let sport = game
            .sport_key
            .split('_')
            .next()
            .unwrap_or(game.sport_key.as_str())
            .to_string();

        for bookmaker in &game.bookmakers {
            for market in &bookmaker.markets {
                for outcome in &market.outcomes {
                    let decimal_odds = match odds::american_to_decimal(outcome.price as i64) {
                        Ok(d) => d,
                        Err(e) => {
                            warn!(
                                source = source_id,
                                game = %game.id,
                                selection = %outcome.name,
                                error = %e,
                                "dropping selection with invalid odds"
                            );
                            continue;
                        }
                    };

                    records.push(AdapterRecord {
                        sport: sport.clone(),
                        league: game.sport_title.clone(),
                        start_time: game.commence_time,
                        participants: vec![game.home_team.clone(), game.away_team.clone()],
                        market_type: market_type(&market.key),
                        selection: outcome.name.clone(),
                        parameter: outcome.point,
                        decimal_odds,
                        bookmaker_id: bookmaker.key.clone(),
                        raw_identifiers: BTreeMap::from([
                            ("game_id".to_string(), game.id.clone()),
                            ("market".to_string(), market.key.clone()),
                        ]),
                    });
                }
            }
        }
    }
    Ok(records)
}
