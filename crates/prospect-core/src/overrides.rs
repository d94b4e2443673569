// Live-stat overrides.
//
// A scout (or the intel lookup) can replace a prospect's season counting
// stats when the sheet lags behind. The override replaces GP/G/A/P wholesale
// and PPG is always re-derived from the new counts, never carried over.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::round_to;
use crate::roster::RawPlayerRecord;

/// Corrected season totals. Stored per player and replaced wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveStats {
    #[serde(rename = "GP")]
    pub gp: u32,
    #[serde(rename = "G")]
    pub g: u32,
    #[serde(rename = "A")]
    pub a: u32,
    #[serde(rename = "P")]
    pub p: u32,
}

/// A record after the override step, with the live-corrected flag.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectedRecord {
    pub record: RawPlayerRecord,
    pub has_live_stats: bool,
}

/// Points per game rounded to two decimals; 0 when no games were played.
pub fn points_per_game(points: u32, games: u32) -> f64 {
    if games == 0 {
        return 0.0;
    }
    round_to(points as f64 / games as f64, 2)
}

/// Replace the record's counting stats with `live` when present.
///
/// Only GP, G, A, P and PPG change. Without an override the record passes
/// through untouched, including its sourced PPG.
pub fn apply_override(mut record: RawPlayerRecord, live: Option<&LiveStats>) -> CorrectedRecord {
    let Some(live) = live else {
        return CorrectedRecord {
            record,
            has_live_stats: false,
        };
    };

    debug!(
        "applying live stats to '{}': {}GP {}G {}A {}P (was {}GP {}P)",
        record.name, live.gp, live.g, live.a, live.p, record.gp, record.p
    );
    record.gp = live.gp;
    record.g = live.g;
    record.a = live.a;
    record.p = live.p;
    record.ppg = points_per_game(live.p, live.gp);

    CorrectedRecord {
        record,
        has_live_stats: true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
