// Population aggregation: overrides, population scoring, annotation merge.
//
// Produces the presentation-facing `PlayerEntity` list. Each call is a full
// recomputation over the whole roster; nothing is carried between calls.

use serde::Serialize;
use tracing::info;

use crate::annotations::{Annotation, AnnotationSnapshot, ScoutingReport};
use crate::league::LeagueConfig;
use crate::metrics::{score_population, DerivedMetrics};
use crate::overrides::{apply_override, CorrectedRecord};
use crate::roster::RawPlayerRecord;

/// One prospect as shown on the board: record, metrics and annotations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntity {
    #[serde(flatten)]
    pub record: RawPlayerRecord,
    #[serde(flatten)]
    pub metrics: DerivedMetrics,
    pub tags: Vec<String>,
    pub is_watched: bool,
    pub scouting: ScoutingReport,
    pub has_live_stats: bool,
}

impl PlayerEntity {
    pub fn name(&self) -> &str {
        &self.record.name
    }
}

/// Build the full entity list for `records`.
///
/// 1. Apply each player's live-stat override (from their annotation).
/// 2. Compute population scalars over the corrected roster.
/// 3. Score every player against those scalars.
/// 4. Merge tags, watch flag and scouting report, defaulting when absent.
///
/// Output order matches input order. An empty roster yields an empty list,
/// which callers should treat as "no data" rather than zero-scored players.
pub fn aggregate(
    records: &[RawPlayerRecord],
    config: &LeagueConfig,
    annotations: &AnnotationSnapshot,
) -> Vec<PlayerEntity> {
    let corrected: Vec<CorrectedRecord> = records
        .iter()
        .map(|r| {
            let live = annotations
                .get(&r.name)
                .and_then(|a| a.scouting.live_stats.as_ref());
            apply_override(r.clone(), live)
        })
        .collect();

    let refs: Vec<&RawPlayerRecord> = corrected.iter().map(|c| &c.record).collect();
    let metrics = score_population(&refs, config);

    let entities: Vec<PlayerEntity> = corrected
        .into_iter()
        .zip(metrics)
        .map(|(c, metrics)| {
            let annotation = annotations.get(&c.record.name).cloned().unwrap_or_default();
            let Annotation {
                tags,
                is_watched,
                scouting,
            } = annotation;
            PlayerEntity {
                record: c.record,
                metrics,
                tags,
                is_watched,
                scouting,
                has_live_stats: c.has_live_stats,
            }
        })
        .collect();

    info!(
        "aggregated {} players ({} live-corrected, {} annotated)",
        entities.len(),
        entities.iter().filter(|e| e.has_live_stats).count(),
        annotations.len()
    );
    entities
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
