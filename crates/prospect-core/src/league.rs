// League strength configuration (Config tab).
//
// The Config tab holds a `SeasonLengthNHL` scalar and a two-column
// `League | NHLeFactor` table. Both are found by scanning, so the tab may
// carry other rows around them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::roster::{parse_float_prefix, parse_int_prefix};
use crate::source::Row;

/// NHL regular-season length used when the Config tab does not override it.
pub const DEFAULT_SEASON_LENGTH: u32 = 82;

/// Strength factor for leagues missing from the factor table.
pub const DEFAULT_LEAGUE_FACTOR: f64 = 0.25;

const SEASON_LENGTH_LABEL: &str = "SeasonLengthNHL";
const TABLE_LEAGUE_HEADER: &str = "League";
const TABLE_FACTOR_HEADER: &str = "NHLeFactor";

/// League name to NHL-equivalency factor, plus the NHL season length.
///
/// Parsed once per data refresh and read-only for a computation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueConfig {
    pub season_length: u32,
    pub factors: HashMap<String, f64>,
}

impl Default for LeagueConfig {
    fn default() -> Self {
        Self {
            season_length: DEFAULT_SEASON_LENGTH,
            factors: HashMap::new(),
        }
    }
}

impl LeagueConfig {
    /// Strength factor for `league`, falling back to [`DEFAULT_LEAGUE_FACTOR`].
    pub fn factor_for(&self, league: &str) -> f64 {
        match self.factors.get(league) {
            Some(&factor) => factor,
            None => {
                debug!("league '{}' has no factor, using default {}", league, DEFAULT_LEAGUE_FACTOR);
                DEFAULT_LEAGUE_FACTOR
            }
        }
    }
}

/// Scan Config-tab rows for the season length and the league factor table.
///
/// Every row after the `League | NHLeFactor` header is read as a
/// league/factor pair; rows whose factor is not a number are skipped.
pub fn map_league_config(rows: &[Row]) -> LeagueConfig {
    let mut config = LeagueConfig::default();
    let mut in_table = false;

    for row in rows {
        let Some(label) = row.first().map(|c| c.trim()) else {
            continue;
        };
        if label.is_empty() {
            continue;
        }
        let value = row.get(1).map(String::as_str).unwrap_or("");

        if label == SEASON_LENGTH_LABEL && !value.is_empty() {
            match parse_int_prefix(value).and_then(|v| u32::try_from(v).ok()) {
                Some(len) if len > 0 => config.season_length = len,
                _ => warn!(
                    "ignoring {} value '{}', keeping {}",
                    SEASON_LENGTH_LABEL, value, config.season_length
                ),
            }
        }

        if label == TABLE_LEAGUE_HEADER && value == TABLE_FACTOR_HEADER {
            in_table = true;
            continue;
        }

        if in_table {
            match parse_float_prefix(value) {
                Some(factor) => {
                    config.factors.insert(label.to_string(), factor);
                }
                None => debug!("skipping league row '{}': factor '{}' is not a number", label, value),
            }
        }
    }

    config
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
