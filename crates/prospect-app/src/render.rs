// Plain-text rendering of the board, player cards and comparisons.

use std::fmt::Write;

use prospect_core::aggregate::PlayerEntity;
use prospect_core::annotations::Skill;
use prospect_core::compare::RadarProfile;
use prospect_llm::extract::IntelResult;

fn rank_label(avg_rank: f64) -> String {
    if avg_rank == 0.0 {
        "-".to_string()
    } else {
        format!("{avg_rank:.1}")
    }
}

fn flags(e: &PlayerEntity) -> String {
    let mut out = String::new();
    if e.is_watched {
        out.push('*');
    }
    if e.has_live_stats {
        out.push('L');
    }
    out
}

/// One line per player, best first.
pub fn board_table(players: &[&PlayerEntity]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<28} {:>4} {:>6}  {:<12} {:<4} {:>3} {:>4} {:>5} {:>6} {:>6} {:>6} {:>6}  {:<3} {}",
        "#", "Name", "Tier", "Rank", "League", "Pos", "GP", "P", "PPG", "NHLe", "Stats", "RankSc", "Comp", "", "Tags"
    );
    for (i, e) in players.iter().enumerate() {
        let r = &e.record;
        let m = &e.metrics;
        let _ = writeln!(
            out,
            "{:>3}  {:<28} {:>4} {:>6}  {:<12} {:<4} {:>3} {:>4} {:>5.2} {:>6.1} {:>6.1} {:>6.1} {:>6.1}  {:<3} {}",
            i + 1,
            r.name,
            r.tier,
            rank_label(r.avg_rank),
            r.league,
            r.position,
            r.gp,
            r.p,
            r.ppg,
            m.nhle,
            m.stats_score,
            m.rank_score,
            m.composite_score,
            flags(e),
            e.tags.join(", ")
        );
    }
    let _ = write!(out, "{} players", players.len());
    out
}

/// Full card for one player.
pub fn player_card(e: &PlayerEntity) -> String {
    let r = &e.record;
    let m = &e.metrics;
    let mut out = String::new();

    let _ = writeln!(out, "{} ({}, {})", r.name, r.position, r.country);
    let _ = writeln!(
        out,
        "  Born {} (age {}), {} / {} lbs, shoots {}",
        r.birthdate, r.age, r.height, r.weight, r.shoots
    );
    let _ = writeln!(
        out,
        "  Tier {} | AvgRank {} | in-tier {} | V1 {} | John {}",
        r.tier,
        rank_label(r.avg_rank),
        r.in_tier_rank,
        r.v1_rank,
        r.john_rank
    );
    let live = if e.has_live_stats { " (live)" } else { "" };
    let _ = writeln!(
        out,
        "  {}: {} GP, {} G, {} A, {} P, {:.2} PPG{}",
        r.league, r.gp, r.g, r.a, r.p, r.ppg, live
    );
    let _ = writeln!(
        out,
        "  NHLe {:.1} | Stats {:.1} | Rank {:.1} | Composite {:.1}",
        m.nhle, m.stats_score, m.rank_score, m.composite_score
    );
    let _ = writeln!(out, "  Watched: {}", if e.is_watched { "yes" } else { "no" });
    if !e.tags.is_empty() {
        let _ = writeln!(out, "  Tags: {}", e.tags.join(", "));
    }

    let _ = writeln!(out, "  Skills:");
    for skill in Skill::ALL {
        let _ = writeln!(out, "    {:<12} {}", skill.label(), e.scouting.skills.get(skill));
    }

    if e.scouting.notes.is_empty() {
        let _ = write!(out, "  No notes");
    } else {
        let _ = write!(out, "  Notes:");
        for note in &e.scouting.notes {
            let _ = write!(out, "\n    [{}] {} ({})", note.date, note.text, note.id);
        }
    }
    out
}

/// Axis-per-row table with one column per player.
pub fn profile_table(title: &str, profile: &RadarProfile) -> String {
    let mut out = String::new();
    let _ = write!(out, "{title}\n  {:<12}", "");
    for series in &profile.series {
        let _ = write!(out, " {:>24}", truncate(&series.name, 24));
    }
    for (idx, axis) in profile.axes.iter().enumerate() {
        let _ = write!(out, "\n  {axis:<12}");
        for series in &profile.series {
            let value = series.values.get(idx).copied().unwrap_or(0.0);
            let _ = write!(out, " {value:>24.1}");
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max.saturating_sub(1)).chain(std::iter::once('~')).collect()
    }
}

/// Summary, sources and any structured suggestions of an intel lookup.
pub fn intel_report(result: &IntelResult) -> String {
    let mut out = result.text.clone();
    if !result.sources.is_empty() {
        let _ = write!(out, "\n\nSources:");
        for source in &result.sources {
            let _ = write!(out, "\n  {} <{}>", source.title, source.url);
        }
    }
    if let Some(stats) = result.found_stats {
        let _ = write!(
            out,
            "\n\nFound stats: {} GP, {} G, {} A, {} P",
            stats.gp, stats.g, stats.a, stats.p
        );
    }
    if let Some(skills) = result.suggested_skills {
        let grades: Vec<String> = Skill::ALL
            .iter()
            .map(|s| format!("{}={}", s.label(), skills.get(*s)))
            .collect();
        let _ = write!(out, "\n\nSuggested skills: {}", grades.join(" "));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use prospect_core::annotations::ScoutingReport;
    use prospect_core::metrics::DerivedMetrics;
    use prospect_core::overrides::LiveStats;
    use prospect_core::roster::RawPlayerRecord;
    use prospect_llm::extract::IntelSource;

    fn entity() -> PlayerEntity {
        PlayerEntity {
            record: RawPlayerRecord {
                tier: 2,
                avg_rank: 0.0,
                in_tier_rank: 3,
                v1_rank: 5,
                john_rank: 8,
                name: "Zayne Parekh".into(),
                country: "CAN".into(),
                league: "OHL".into(),
                gp: 66,
                g: 33,
                a: 63,
                p: 96,
                ppg: 1.45,
                birthdate: "2006-02-15".into(),
                age: 18,
                height: "6'0".into(),
                weight: 179,
                shoots: "R".into(),
                position: "RD".into(),
            },
            metrics: DerivedMetrics {
                nhle: 35.7,
                stats_score: 63.2,
                rank_score: 9.1,
                composite_score: 36.2,
            },
            tags: vec!["PP QB".into()],
            is_watched: true,
            scouting: ScoutingReport::default(),
            has_live_stats: true,
        }
    }

    #[test]
    fn board_row_shows_unranked_dash_and_flags() {
        let e = entity();
        let table = board_table(&[&e]);
        let row = table.lines().nth(1).unwrap();
        assert!(row.contains("Zayne Parekh"));
        assert!(row.contains(" - "));
        assert!(row.contains("*L"));
        assert!(row.contains("PP QB"));
        assert!(row.contains("36.2"));
        assert!(table.ends_with("1 players"));
    }

    #[test]
    fn card_lists_every_skill() {
        let card = player_card(&entity());
        assert!(card.contains("(live)"));
        for skill in Skill::ALL {
            assert!(card.contains(skill.label()));
        }
        assert!(card.ends_with("No notes"));
    }

    #[test]
    fn intel_report_sections() {
        let result = IntelResult {
            text: "Summary.".into(),
            sources: vec![IntelSource {
                title: "EP".into(),
                url: "https://example.com".into(),
            }],
            suggested_skills: None,
            found_stats: Some(LiveStats { gp: 1, g: 2, a: 3, p: 5 }),
        };
        let report = intel_report(&result);
        assert!(report.starts_with("Summary."));
        assert!(report.contains("EP <https://example.com>"));
        assert!(report.contains("1 GP, 2 G, 3 A, 5 P"));
        assert!(!report.contains("Suggested skills"));
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("Michael Brandsegg-Nygård", 10), "Michael B~");
        assert_eq!(truncate("Short", 10), "Short");
    }
}
