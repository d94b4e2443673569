// Derived metric computation: NHLe, stats score, rank score, composite.
//
// Scores are population-relative, so computing them is a two-phase protocol:
// first the population scalars (max NHLe, max AvgRank) over the whole
// post-override roster, then per-player scores against those scalars. Every
// output is rounded to one decimal; intermediate values are never rounded.

use serde::{Deserialize, Serialize};

use crate::league::LeagueConfig;
use crate::roster::RawPlayerRecord;

/// Widens the rank denominator so the best-ranked player stays below 100 and
/// the worst-ranked stays above 0.
pub const RANK_HEADROOM: f64 = 1.1;

/// Weight of the stats score in the composite blend.
pub const STATS_WEIGHT: f64 = 0.5;

/// Weight of the rank score in the composite blend.
pub const RANK_WEIGHT: f64 = 0.5;

const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The four derived numbers for one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DerivedMetrics {
    #[serde(rename = "NHLe")]
    pub nhle: f64,
    pub stats_score: f64,
    pub rank_score: f64,
    pub composite_score: f64,
}

/// Population-wide scalars every per-player score depends on.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PopulationScalars {
    pub max_nhle: f64,
    pub max_avg_rank: f64,
}

impl PopulationScalars {
    /// Compute the scalars from `(nhle, avg_rank)` pairs. An empty population
    /// yields zeros, which the score functions treat as "no scale".
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut scalars: Option<Self> = None;
        for (nhle, avg_rank) in pairs {
            scalars = Some(match scalars {
                None => Self {
                    max_nhle: nhle,
                    max_avg_rank: avg_rank,
                },
                Some(s) => Self {
                    max_nhle: s.max_nhle.max(nhle),
                    max_avg_rank: s.max_avg_rank.max(avg_rank),
                },
            });
        }
        scalars.unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Round half away from zero to `places` decimals.
///
/// The value is scaled first, so a binary value just under a half can land
/// on it and round up.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(SCORE_MIN, SCORE_MAX)
}

// ---------------------------------------------------------------------------
// Per-quantity formulas
// ---------------------------------------------------------------------------

/// Projected NHL points over a full season: `PPG * league factor * season length`.
pub fn nhle(ppg: f64, league: &str, config: &LeagueConfig) -> f64 {
    round_to(ppg * config.factor_for(league) * config.season_length as f64, 1)
}

/// Production relative to the population leader, on 0-100.
///
/// Returns 0 for everyone when the population maximum is 0.
pub fn stats_score(nhle: f64, max_nhle: f64) -> f64 {
    if max_nhle == 0.0 {
        return 0.0;
    }
    clamp_score(round_to(nhle / max_nhle * 100.0, 1))
}

/// Inverse consensus rank on 0-100, widened by [`RANK_HEADROOM`].
///
/// An unranked player (AvgRank 0) scores high here; pushing unranked players
/// down is the ordering layer's job. Returns 0 when the population maximum
/// is 0.
pub fn rank_score(avg_rank: f64, max_avg_rank: f64) -> f64 {
    if max_avg_rank == 0.0 {
        return 0.0;
    }
    let score = 100.0 - (avg_rank / (max_avg_rank * RANK_HEADROOM) * 100.0);
    clamp_score(round_to(score, 1))
}

/// Equal-weighted blend of the stats and rank scores.
pub fn composite_score(stats_score: f64, rank_score: f64) -> f64 {
    round_to(stats_score * STATS_WEIGHT + rank_score * RANK_WEIGHT, 1)
}

// ---------------------------------------------------------------------------
// Two-phase population scoring
// ---------------------------------------------------------------------------

/// Score one player whose NHLe is already known against the population scalars.
pub fn score(nhle: f64, avg_rank: f64, scalars: &PopulationScalars) -> DerivedMetrics {
    let stats_score = stats_score(nhle, scalars.max_nhle);
    let rank_score = rank_score(avg_rank, scalars.max_avg_rank);
    DerivedMetrics {
        nhle,
        stats_score,
        rank_score,
        composite_score: composite_score(stats_score, rank_score),
    }
}

/// Compute derived metrics for an entire (post-override) population.
///
/// Output order matches input order. Always a full recomputation: the
/// population maxima can move with any single record.
pub fn score_population(records: &[&RawPlayerRecord], config: &LeagueConfig) -> Vec<DerivedMetrics> {
    // Phase 1: per-player NHLe and the population scalars.
    let nhles: Vec<f64> = records
        .iter()
        .map(|r| nhle(r.ppg, &r.league, config))
        .collect();
    let scalars = PopulationScalars::from_pairs(
        nhles
            .iter()
            .zip(records.iter())
            .map(|(&n, r)| (n, r.avg_rank)),
    );

    // Phase 2: per-player scores against the scalars.
    nhles
        .iter()
        .zip(records.iter())
        .map(|(&n, r)| score(n, r.avg_rank, &scalars))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::DEFAULT_LEAGUE_FACTOR;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn config() -> LeagueConfig {
        let mut config = LeagueConfig::default();
        config.factors.insert("NCAA".into(), 0.41);
        config.factors.insert("OHL".into(), 0.30);
        config
    }

    fn player(name: &str, league: &str, ppg: f64, avg_rank: f64) -> RawPlayerRecord {
        RawPlayerRecord {
            tier: 1,
            avg_rank,
            in_tier_rank: 1,
            v1_rank: 1,
            john_rank: 1,
            name: name.into(),
            country: "CAN".into(),
            league: league.into(),
            gp: 0,
            g: 0,
            a: 0,
            p: 0,
            ppg,
            birthdate: String::new(),
            age: 18,
            height: String::new(),
            weight: 0,
            shoots: "L".into(),
            position: "C".into(),
        }
    }

    // -- NHLe --

    #[test]
    fn nhle_projects_league_rate_over_season() {
        assert_close(nhle(1.68, "NCAA", &config()), 56.5);
        assert_close(nhle(1.45, "OHL", &config()), 35.7);
    }

    #[test]
    fn nhle_unknown_league_uses_default_factor() {
        let expected = round_to(1.0 * DEFAULT_LEAGUE_FACTOR * 82.0, 1);
        assert_close(nhle(1.0, "BCHL", &config()), expected);
        assert_close(expected, 20.5);
    }

    #[test]
    fn nhle_respects_season_length() {
        let mut config = config();
        config.season_length = 41;
        assert_close(nhle(2.0, "OHL", &config), 24.6);
    }

    #[test]
    fn nhle_zero_ppg_is_zero() {
        assert_eq!(nhle(0.0, "NCAA", &config()), 0.0);
    }

    // -- Stats score --

    #[test]
    fn stats_score_relative_to_max() {
        assert_close(stats_score(56.5, 56.5), 100.0);
        assert_close(stats_score(35.7, 56.5), 63.2);
    }

    #[test]
    fn stats_score_zero_max_is_zero() {
        assert_eq!(stats_score(0.0, 0.0), 0.0);
        assert_eq!(stats_score(12.0, 0.0), 0.0);
    }

    #[test]
    fn stats_score_is_clamped() {
        assert_close(stats_score(500.0, 50.0), 100.0);
        assert_close(stats_score(-5.0, 50.0), 0.0);
    }

    // -- Rank score --

    #[test]
    fn rank_score_inverse_with_headroom() {
        assert_close(rank_score(1.0, 7.2), 87.4);
        assert_close(rank_score(7.2, 7.2), 9.1);
    }

    #[test]
    fn rank_score_best_player_below_100_worst_above_0() {
        let best = rank_score(1.0, 30.0);
        let worst = rank_score(30.0, 30.0);
        assert!(best < 100.0);
        assert!(worst > 0.0);
    }

    #[test]
    fn rank_score_unranked_sentinel_scores_high() {
        assert_close(rank_score(0.0, 24.1), 100.0);
    }

    #[test]
    fn rank_score_zero_max_is_zero() {
        assert_eq!(rank_score(3.0, 0.0), 0.0);
    }

    #[test]
    fn rank_score_is_clamped() {
        assert_close(rank_score(50.0, 10.0), 0.0);
        assert_close(rank_score(-10.0, 10.0), 100.0);
    }

    // -- Composite --

    #[test]
    fn composite_is_equal_blend() {
        assert_close(composite_score(80.0, 60.0), 70.0);
        assert_close(composite_score(100.0, 87.4), 93.7);
        assert_close(composite_score(63.2, 9.1), 36.2);
    }

    // -- Population scalars --

    #[test]
    fn population_scalars_take_maxima() {
        let scalars = PopulationScalars::from_pairs(vec![(56.5, 1.0), (35.7, 7.2), (40.0, 3.0)]);
        assert_close(scalars.max_nhle, 56.5);
        assert_close(scalars.max_avg_rank, 7.2);
    }

    #[test]
    fn population_scalars_empty_is_zero() {
        let scalars = PopulationScalars::from_pairs(Vec::<(f64, f64)>::new());
        assert_eq!(scalars, PopulationScalars::default());
    }

    // -- Full population --

    #[test]
    fn two_player_population_end_to_end() {
        let p1 = player("P1", "NCAA", 1.68, 1.0);
        let p2 = player("P2", "OHL", 1.45, 7.2);
        let metrics = score_population(&[&p1, &p2], &config());

        assert_close(metrics[0].nhle, 56.5);
        assert_close(metrics[1].nhle, 35.7);
        assert_close(metrics[0].stats_score, 100.0);
        assert_close(metrics[1].stats_score, 63.2);
        assert_close(metrics[0].rank_score, 87.4);
        assert_close(metrics[1].rank_score, 9.1);
        assert_close(
            metrics[0].composite_score,
            composite_score(metrics[0].stats_score, metrics[0].rank_score),
        );
        assert_close(
            metrics[1].composite_score,
            composite_score(metrics[1].stats_score, metrics[1].rank_score),
        );
        assert_close(metrics[0].composite_score, 93.7);
    }

    #[test]
    fn outlier_keeps_all_scores_in_range() {
        let outlier = player("Outlier", "NCAA", 15.0, 2.0);
        let others: Vec<RawPlayerRecord> = (0..10)
            .map(|i| player(&format!("P{i}"), "OHL", 2.0, 5.0 + i as f64))
            .collect();
        let mut records: Vec<&RawPlayerRecord> = others.iter().collect();
        records.push(&outlier);

        let metrics = score_population(&records, &config());
        assert_close(metrics[10].nhle, round_to(15.0 * 0.41 * 82.0, 1));
        for m in &metrics {
            assert!((0.0..=100.0).contains(&m.stats_score), "stats {m:?}");
            assert!((0.0..=100.0).contains(&m.rank_score), "rank {m:?}");
            assert!((0.0..=100.0).contains(&m.composite_score), "composite {m:?}");
        }
    }

    #[test]
    fn all_zero_population_scores_zero() {
        let p1 = player("P1", "NCAA", 0.0, 0.0);
        let p2 = player("P2", "OHL", 0.0, 0.0);
        let metrics = score_population(&[&p1, &p2], &config());
        for m in metrics {
            assert_eq!(m.stats_score, 0.0);
            assert_eq!(m.rank_score, 0.0);
            assert_eq!(m.composite_score, 0.0);
        }
    }

    #[test]
    fn empty_population_is_empty() {
        assert!(score_population(&[], &config()).is_empty());
    }

    #[test]
    fn round_to_half_away_from_zero() {
        assert_close(round_to(56.4816, 1), 56.5);
        assert_close(round_to(0.25, 1), 0.3);
        assert_close(round_to(1.255, 0), 1.0);
        assert_close(round_to(2.0 / 3.0, 2), 0.67);
    }

    #[test]
    fn round_to_scales_before_rounding() {
        // Both sit just under the half in binary; scaling lands them on it.
        assert_close(round_to(3.0 / 40.0, 2), 0.08);
        assert_close(round_to(0.25 * 0.70 * 82.0, 1), 14.4);
    }

    #[test]
    fn metrics_serialize_with_sheet_column_names() {
        let json = serde_json::to_value(score(56.5, 1.0, &PopulationScalars {
            max_nhle: 56.5,
            max_avg_rank: 7.2,
        }))
        .unwrap();
        assert_eq!(json["NHLe"], 56.5);
        assert_eq!(json["StatsScore"], 100.0);
        assert_eq!(json["RankScore"], 87.4);
        assert_eq!(json["CompositeScore"], 93.7);
    }
}
