// Radar-chart profiles for side-by-side player comparison.

use crate::aggregate::PlayerEntity;
use crate::annotations::Skill;
use crate::ordering::CompareList;

/// Skill axes in chart order.
pub const SKILL_AXES: [Skill; 8] = [
    Skill::Skating,
    Skill::Shooting,
    Skill::Hands,
    Skill::Passing,
    Skill::Iq,
    Skill::Defense,
    Skill::Physicality,
    Skill::Compete,
];

/// Stats axes with their full-scale values. Scores already live on 0-100.
const STATS_AXES: [(&str, f64); 6] = [
    ("NHLe", 100.0),
    ("PPG", 2.0),
    ("CompScore", 100.0),
    ("StatsScore", 100.0),
    ("RankScore", 100.0),
    ("GP", 70.0),
];

/// One player's values along every axis of a profile.
#[derive(Debug, Clone, PartialEq)]
pub struct RadarSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadarProfile {
    pub axes: Vec<&'static str>,
    pub series: Vec<RadarSeries>,
}

impl RadarProfile {
    /// Value of `name` on `axis`, if both exist.
    pub fn value(&self, name: &str, axis: &str) -> Option<f64> {
        let idx = self.axes.iter().position(|a| *a == axis)?;
        self.series
            .iter()
            .find(|s| s.name == name)
            .and_then(|s| s.values.get(idx).copied())
    }
}

/// Production/score profile, each axis normalized to 0-100 and clamped.
pub fn stats_profile(players: &[&PlayerEntity]) -> RadarProfile {
    let series = players
        .iter()
        .map(|p| {
            let raw = [
                p.metrics.nhle,
                p.record.ppg,
                p.metrics.composite_score,
                p.metrics.stats_score,
                p.metrics.rank_score,
                p.record.gp as f64,
            ];
            let values = raw
                .iter()
                .zip(STATS_AXES.iter())
                .map(|(v, (_, full))| (v / full * 100.0).clamp(0.0, 100.0))
                .collect();
            RadarSeries {
                name: p.record.name.clone(),
                values,
            }
        })
        .collect();

    RadarProfile {
        axes: STATS_AXES.iter().map(|(label, _)| *label).collect(),
        series,
    }
}

/// Raw 20-80 skill grades in [`SKILL_AXES`] order.
pub fn skills_profile(players: &[&PlayerEntity]) -> RadarProfile {
    let series = players
        .iter()
        .map(|p| RadarSeries {
            name: p.record.name.clone(),
            values: SKILL_AXES
                .iter()
                .map(|s| p.scouting.skills.get(*s) as f64)
                .collect(),
        })
        .collect();

    RadarProfile {
        axes: SKILL_AXES.iter().map(|s| s.label()).collect(),
        series,
    }
}

/// Entities for the shortlisted names, in shortlist order. Names no longer
/// on the board are skipped.
pub fn resolve<'a>(list: &CompareList, entities: &'a [PlayerEntity]) -> Vec<&'a PlayerEntity> {
    list.names()
        .filter_map(|name| entities.iter().find(|e| e.record.name == name))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::ScoutingReport;
    use crate::metrics::DerivedMetrics;
    use crate::roster::RawPlayerRecord;

    fn entity(name: &str, gp: u32, ppg: f64, nhle: f64) -> PlayerEntity {
        PlayerEntity {
            record: RawPlayerRecord {
                tier: 1,
                avg_rank: 1.0,
                in_tier_rank: 1,
                v1_rank: 1,
                john_rank: 1,
                name: name.into(),
                country: "CAN".into(),
                league: "OHL".into(),
                gp,
                g: 0,
                a: 0,
                p: 0,
                ppg,
                birthdate: String::new(),
                age: 18,
                height: String::new(),
                weight: 180,
                shoots: "L".into(),
                position: "C".into(),
            },
            metrics: DerivedMetrics {
                nhle,
                stats_score: 63.2,
                rank_score: 9.1,
                composite_score: 36.2,
            },
            tags: Vec::new(),
            is_watched: false,
            scouting: ScoutingReport::default(),
            has_live_stats: false,
        }
    }

    #[test]
    fn stats_profile_normalizes_and_clamps() {
        let a = entity("A", 35, 1.5, 56.5);
        let b = entity("B", 90, 2.6, 140.0);
        let profile = stats_profile(&[&a, &b]);

        assert_eq!(profile.axes, vec!["NHLe", "PPG", "CompScore", "StatsScore", "RankScore", "GP"]);
        assert!((profile.value("A", "NHLe").unwrap() - 56.5).abs() < 1e-9);
        assert!((profile.value("A", "PPG").unwrap() - 75.0).abs() < 1e-9);
        assert!((profile.value("A", "GP").unwrap() - 50.0).abs() < 1e-9);
        assert!((profile.value("A", "CompScore").unwrap() - 36.2).abs() < 1e-9);

        assert_eq!(profile.value("B", "NHLe"), Some(100.0));
        assert_eq!(profile.value("B", "PPG"), Some(100.0));
        assert_eq!(profile.value("B", "GP"), Some(100.0));
    }

    #[test]
    fn skills_profile_uses_chart_order() {
        let mut a = entity("A", 10, 1.0, 10.0);
        a.scouting.skills.iq = 75;
        a.scouting.skills.physicality = 35;
        let profile = skills_profile(&[&a]);

        assert_eq!(
            profile.axes,
            vec!["Skating", "Shooting", "Hands", "Passing", "IQ", "Defense", "Physicality", "Compete"]
        );
        assert_eq!(profile.series[0].values[4], 75.0);
        assert_eq!(profile.series[0].values[6], 35.0);
        assert_eq!(profile.value("A", "Skating"), Some(50.0));
    }

    #[test]
    fn resolve_skips_missing_names() {
        let entities = vec![entity("A", 10, 1.0, 10.0), entity("B", 10, 1.0, 10.0)];
        let mut list = CompareList::new();
        list.add("B");
        list.add("Gone");
        list.add("A");
        let resolved = resolve(&list, &entities);
        let names: Vec<&str> = resolved.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
