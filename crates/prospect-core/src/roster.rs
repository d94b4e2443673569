// Player row mapping.
//
// The Players tab is a fixed column layout (A-S). Numeric cells are parsed
// leniently: a malformed cell degrades to 0 instead of rejecting the row, so
// one typo in the sheet never drops a prospect from the board.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::source::Row;

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

const COL_TIER: usize = 0;
const COL_AVG_RANK: usize = 1;
const COL_IN_TIER_RANK: usize = 2;
const COL_V1_RANK: usize = 3;
const COL_JOHN_RANK: usize = 4;
const COL_NAME: usize = 5;
const COL_COUNTRY: usize = 6;
const COL_LEAGUE: usize = 7;
const COL_GP: usize = 8;
const COL_G: usize = 9;
const COL_A: usize = 10;
const COL_P: usize = 11;
const COL_PPG: usize = 12;
const COL_BIRTHDATE: usize = 13;
const COL_AGE: usize = 14;
const COL_HEIGHT: usize = 15;
const COL_WEIGHT: usize = 16;
const COL_SHOOTS: usize = 17;
const COL_POSITION: usize = 18;

/// A row must reach the Name column to be considered a player.
pub const MIN_PLAYER_ROW_WIDTH: usize = COL_NAME + 1;

const DEFAULT_SHOOTS: &str = "L";
/// Placeholder name the sheet uses for rows with no real player.
const UNKNOWN_NAME: &str = "Unknown";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One prospect's season-to-date facts as sourced from the Players tab.
///
/// `name` is the identity key for annotations and overrides. `avg_rank` of
/// 0 means "unranked".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawPlayerRecord {
    pub tier: u8,
    pub avg_rank: f64,
    pub in_tier_rank: u32,
    #[serde(rename = "V1Rank")]
    pub v1_rank: u32,
    pub john_rank: u32,
    pub name: String,
    pub country: String,
    pub league: String,
    #[serde(rename = "GP")]
    pub gp: u32,
    #[serde(rename = "G")]
    pub g: u32,
    #[serde(rename = "A")]
    pub a: u32,
    #[serde(rename = "P")]
    pub p: u32,
    #[serde(rename = "PPG")]
    pub ppg: f64,
    pub birthdate: String,
    pub age: u32,
    pub height: String,
    pub weight: u32,
    pub shoots: String,
    pub position: String,
}

// ---------------------------------------------------------------------------
// Lenient cell parsing
// ---------------------------------------------------------------------------

/// Length of the leading `[+-]digits` run of `s`, or `None` without digits.
fn integer_prefix_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    (end > digits_start).then_some(end)
}

/// Parse the leading integer of a cell. `"12abc"` is 12 and `"3.7"` is 3.
pub(crate) fn parse_int_prefix(cell: &str) -> Option<i64> {
    let s = cell.trim();
    let end = integer_prefix_len(s)?;
    s[..end].parse::<i64>().ok()
}

/// Parse the leading decimal number of a cell, exponent included.
///
/// Returns `None` when the cell does not start with a number or the number
/// is not finite.
pub(crate) fn parse_float_prefix(cell: &str) -> Option<f64> {
    let s = cell.trim();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
            digits += 1;
        }
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        if let Some(exp_len) = integer_prefix_len(&s[end + 1..]) {
            end += 1 + exp_len;
        }
    }
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

fn count_cell(row: &[String], idx: usize) -> u32 {
    parse_int_prefix(cell(row, idx))
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn float_cell(row: &[String], idx: usize) -> f64 {
    parse_float_prefix(cell(row, idx)).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Map one Players-tab row to a record.
///
/// Returns `None` for "not a player row": a row too short to reach the Name
/// column, or one whose Name cell is empty or the `Unknown` placeholder.
///
/// The sourced PPG cell is kept as-is when GP is positive; with no games
/// played PPG is 0 whatever the cell says.
pub fn map_player_row(row: &[String]) -> Option<RawPlayerRecord> {
    if row.len() < MIN_PLAYER_ROW_WIDTH {
        return None;
    }
    let name = cell(row, COL_NAME);
    if name.is_empty() || name == UNKNOWN_NAME {
        return None;
    }

    let gp = count_cell(row, COL_GP);
    let ppg = if gp == 0 { 0.0 } else { float_cell(row, COL_PPG) };

    let shoots = match cell(row, COL_SHOOTS) {
        "" => DEFAULT_SHOOTS.to_string(),
        s => s.to_string(),
    };

    Some(RawPlayerRecord {
        tier: parse_int_prefix(cell(row, COL_TIER))
            .and_then(|v| u8::try_from(v).ok())
            .unwrap_or(0),
        avg_rank: float_cell(row, COL_AVG_RANK),
        in_tier_rank: count_cell(row, COL_IN_TIER_RANK),
        v1_rank: count_cell(row, COL_V1_RANK),
        john_rank: count_cell(row, COL_JOHN_RANK),
        name: name.to_string(),
        country: cell(row, COL_COUNTRY).to_string(),
        league: cell(row, COL_LEAGUE).to_string(),
        gp,
        g: count_cell(row, COL_G),
        a: count_cell(row, COL_A),
        p: count_cell(row, COL_P),
        ppg,
        birthdate: cell(row, COL_BIRTHDATE).to_string(),
        age: count_cell(row, COL_AGE),
        height: cell(row, COL_HEIGHT).to_string(),
        weight: count_cell(row, COL_WEIGHT),
        shoots,
        position: cell(row, COL_POSITION).to_string(),
    })
}

/// Map every Players-tab row after the header into records, dropping rows
/// that are not players.
pub fn map_players(rows: &[Row]) -> Vec<RawPlayerRecord> {
    let mut seen = HashSet::new();
    let mut players = Vec::with_capacity(rows.len().saturating_sub(1));

    for (idx, row) in rows.iter().enumerate().skip(1) {
        match map_player_row(row) {
            Some(record) => {
                if !seen.insert(record.name.clone()) {
                    warn!(
                        "duplicate player name '{}' at row {}; annotations will be shared",
                        record.name, idx
                    );
                }
                players.push(record);
            }
            None => debug!("skipping row {}: not a player row", idx),
        }
    }

    players
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
