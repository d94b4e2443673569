// Board ordering, filtering and the comparison shortlist.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::aggregate::PlayerEntity;

/// Maximum number of players on the comparison shortlist.
pub const MAX_COMPARE: usize = 4;

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    CompositeScore,
    #[default]
    AvgRank,
    Tier,
    Nhle,
    Ppg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortField {
    /// Lower is better for ranks and tiers, higher for everything else.
    pub fn default_direction(self) -> SortDirection {
        match self {
            SortField::AvgRank | SortField::Tier => SortDirection::Asc,
            SortField::CompositeScore | SortField::Nhle | SortField::Ppg => SortDirection::Desc,
        }
    }

    fn key(self, e: &PlayerEntity) -> f64 {
        match self {
            SortField::CompositeScore => e.metrics.composite_score,
            SortField::AvgRank => e.record.avg_rank,
            SortField::Tier => e.record.tier as f64,
            SortField::Nhle => e.metrics.nhle,
            SortField::Ppg => e.record.ppg,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortField::CompositeScore => "composite",
            SortField::AvgRank => "rank",
            SortField::Tier => "tier",
            SortField::Nhle => "nhle",
            SortField::Ppg => "ppg",
        };
        f.write_str(s)
    }
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "composite" | "compositescore" => Ok(SortField::CompositeScore),
            "rank" | "avgrank" => Ok(SortField::AvgRank),
            "tier" => Ok(SortField::Tier),
            "nhle" => Ok(SortField::Nhle),
            "ppg" => Ok(SortField::Ppg),
            other => Err(format!(
                "unknown sort field '{other}' (expected composite, rank, tier, nhle or ppg)"
            )),
        }
    }
}

/// Compare two entities by `field` in `direction`.
///
/// When sorting by AvgRank, an unranked player (AvgRank 0) sorts after every
/// ranked player in either direction. Ties fall back to name so the order is
/// stable across refreshes.
pub fn compare_entities(
    a: &PlayerEntity,
    b: &PlayerEntity,
    field: SortField,
    direction: SortDirection,
) -> Ordering {
    if field == SortField::AvgRank {
        let a_unranked = a.record.avg_rank == 0.0;
        let b_unranked = b.record.avg_rank == 0.0;
        match (a_unranked, b_unranked) {
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            _ => {}
        }
    }

    let ord = field.key(a).total_cmp(&field.key(b));
    let ord = match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    };
    ord.then_with(|| a.record.name.cmp(&b.record.name))
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Board filters. Empty league/position lists mean "any".
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub min_tier: u8,
    pub max_tier: u8,
    pub leagues: Vec<String>,
    pub positions: Vec<String>,
    pub search_query: String,
    pub min_composite: f64,
    pub watched_only: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            min_tier: 1,
            max_tier: 5,
            leagues: Vec::new(),
            positions: Vec::new(),
            search_query: String::new(),
            min_composite: 0.0,
            watched_only: false,
        }
    }
}

impl FilterState {
    pub fn matches(&self, e: &PlayerEntity) -> bool {
        let query = self.search_query.trim().to_lowercase();
        let matches_search = query.is_empty()
            || e.record.name.to_lowercase().contains(&query)
            || e.record.league.to_lowercase().contains(&query);

        let matches_league = self.leagues.is_empty()
            || self.leagues.iter().any(|l| l.eq_ignore_ascii_case(&e.record.league));
        let matches_position = self.positions.is_empty()
            || self
                .positions
                .iter()
                .any(|p| p.eq_ignore_ascii_case(&e.record.position));

        matches_search
            && (self.min_tier..=self.max_tier).contains(&e.record.tier)
            && matches_league
            && matches_position
            && e.metrics.composite_score >= self.min_composite
            && (!self.watched_only || e.is_watched)
    }
}

/// Filter then sort. Returns references into `entities`.
pub fn filter_and_sort<'a>(
    entities: &'a [PlayerEntity],
    filter: &FilterState,
    field: SortField,
    direction: SortDirection,
) -> Vec<&'a PlayerEntity> {
    let mut out: Vec<&PlayerEntity> = entities.iter().filter(|e| filter.matches(e)).collect();
    out.sort_by(|a, b| compare_entities(a, b, field, direction));
    out
}

// ---------------------------------------------------------------------------
// Comparison shortlist
// ---------------------------------------------------------------------------

/// Up to [`MAX_COMPARE`] player names; adding a fifth evicts the oldest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareList {
    names: VecDeque<String>,
}

impl CompareList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` unless already present. Returns the evicted name, if any.
    pub fn add(&mut self, name: &str) -> Option<String> {
        if self.contains(name) {
            return None;
        }
        let evicted = if self.names.len() >= MAX_COMPARE {
            self.names.pop_front()
        } else {
            None
        };
        self.names.push_back(name.to_string());
        evicted
    }

    /// Add if absent, remove if present.
    pub fn toggle(&mut self, name: &str) {
        if !self.remove(name) {
            self.add(name);
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| n != name);
        self.names.len() != before
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
