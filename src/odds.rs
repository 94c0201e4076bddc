//! Conversions between decimal, american, and fractional odds.
//!
//! Decimal is the canonical form everywhere in the pipeline; the other
//! two notations exist only at the edges (source payloads on the way
//! in, the `odds_format` query parameter on the way out). Every
//! function here is pure so ingestion and serving produce identical
//! results for the same input.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    Decimal,
    American,
    Fractional,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidOddsError {
    #[error("odds value {0:?} is not numeric")]
    NotNumeric(String),
    #[error("decimal odds {0} must be greater than 1.0")]
    NotAboveOne(f64),
    #[error("american odds of zero are undefined")]
    ZeroAmerican,
}

/// Parse a raw odds string in the given notation into decimal odds.
///
/// Decimal odds at or below 1.0 are a parse error, not a valid
/// zero-probability outcome.
pub fn parse_odds(raw: &str, format: OddsFormat) -> Result<f64, InvalidOddsError> {
    let raw = raw.trim();
    match format {
        OddsFormat::Decimal => {
            let decimal: f64 = raw
                .parse()
                .map_err(|_| InvalidOddsError::NotNumeric(raw.to_string()))?;
            ensure_decimal(decimal)
        }
        OddsFormat::American => {
            let american: i64 = raw
                .strip_prefix('+')
                .unwrap_or(raw)
                .parse()
                .map_err(|_| InvalidOddsError::NotNumeric(raw.to_string()))?;
            american_to_decimal(american)
        }
        OddsFormat::Fractional => {
            let (num, den) = raw
                .split_once('/')
                .ok_or_else(|| InvalidOddsError::NotNumeric(raw.to_string()))?;
            let num: f64 = num
                .trim()
                .parse()
                .map_err(|_| InvalidOddsError::NotNumeric(raw.to_string()))?;
            let den: f64 = den
                .trim()
                .parse()
                .map_err(|_| InvalidOddsError::NotNumeric(raw.to_string()))?;
            if den <= 0.0 {
                return Err(InvalidOddsError::NotNumeric(raw.to_string()));
            }
            ensure_decimal(1.0 + num / den)
        }
    }
}

/// American odds to decimal: +150 pays 1.5x the stake, -150 risks 1.5x
/// to win the stake.
pub fn american_to_decimal(american: i64) -> Result<f64, InvalidOddsError> {
    if american == 0 {
        return Err(InvalidOddsError::ZeroAmerican);
    }
    let decimal = if american > 0 {
        1.0 + american as f64 / 100.0
    } else {
        1.0 + 100.0 / american.unsigned_abs() as f64
    };
    ensure_decimal(decimal)
}

/// Format decimal odds as a signed american odds string, e.g. "+171".
pub fn to_american(decimal: f64) -> Result<String, InvalidOddsError> {
    let decimal = ensure_decimal(decimal)?;
    let american = if decimal >= 2.0 {
        ((decimal - 1.0) * 100.0).round() as i64
    } else {
        (-100.0 / (decimal - 1.0)).round() as i64
    };
    Ok(format!("{:+}", american))
}

/// Best fractional approximation of the payout ratio with a
/// denominator up to 100, e.g. 3.5 -> (5, 2).
pub fn to_fractional(decimal: f64) -> Result<(u32, u32), InvalidOddsError> {
    let decimal = ensure_decimal(decimal)?;
    let ratio = decimal - 1.0;

    let mut best = (1u32, 1u32);
    let mut best_err = f64::MAX;
    for den in 1..=100u32 {
        let num = (ratio * den as f64).round().max(1.0) as u32;
        let err = (num as f64 / den as f64 - ratio).abs();
        if err < best_err {
            best_err = err;
            best = (num, den);
        }
    }
    Ok(best)
}

fn ensure_decimal(decimal: f64) -> Result<f64, InvalidOddsError> {
    if !decimal.is_finite() {
        return Err(InvalidOddsError::NotNumeric(decimal.to_string()));
    }
    if decimal <= 1.0 {
        return Err(InvalidOddsError::NotAboveOne(decimal));
    }
    Ok(decimal)
}
