// Command-line surface of `prospect-radar`.

use clap::{Args, Parser, Subcommand};

use prospect_core::annotations::{Skill, SkillRatings};
use prospect_core::ordering::{FilterState, SortDirection, SortField};

#[derive(Parser, Debug)]
#[command(author, version, about = "Prospect scouting board with derived NHLe and composite scores")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Print the sorted, filtered board
    Board(BoardArgs),
    /// Show one player's full card
    Show {
        name: String,
        /// Print the entity as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a tag to a player
    Tag { name: String, tag: String },
    /// Remove a tag from a player
    Untag { name: String, tag: String },
    /// Toggle a player on or off the watchlist
    Watch { name: String },
    /// Attach a dated note to a player
    Note { name: String, text: String },
    /// Delete a note by id
    DeleteNote { name: String, id: String },
    /// Set skill grades, e.g. `skills "Ivan Demidov" skating=70 iq=65`
    Skills {
        name: String,
        #[arg(required = true, value_parser = parse_grade)]
        grades: Vec<(Skill, i64)>,
    },
    /// Override season totals with live stats
    Stats {
        name: String,
        gp: u32,
        g: u32,
        a: u32,
        p: u32,
    },
    /// Drop a live-stats override
    ClearStats { name: String },
    /// Compare up to four players side by side
    Compare {
        #[arg(required = true, num_args = 1..)]
        names: Vec<String>,
    },
    /// Look up recent news and scouting intel for a player
    Intel {
        name: String,
        /// Save the season totals found by the lookup as live stats
        #[arg(long)]
        apply_stats: bool,
        /// Save the suggested skill grades
        #[arg(long)]
        apply_skills: bool,
    },
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct BoardArgs {
    /// rank, composite, tier, nhle or ppg
    #[arg(long, default_value_t = SortField::AvgRank)]
    pub sort: SortField,
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,
    #[arg(long)]
    pub desc: bool,
    /// Case-insensitive match on name or league
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub min_tier: u8,
    #[arg(long, default_value_t = 5)]
    pub max_tier: u8,
    #[arg(long, default_value_t = 0.0)]
    pub min_composite: f64,
    /// Repeat to allow several leagues
    #[arg(long = "league")]
    pub leagues: Vec<String>,
    /// Repeat to allow several positions
    #[arg(long = "position")]
    pub positions: Vec<String>,
    /// Only watched players
    #[arg(long)]
    pub watched: bool,
    /// Print entities as JSON
    #[arg(long)]
    pub json: bool,
}

impl BoardArgs {
    pub fn direction(&self) -> SortDirection {
        if self.asc {
            SortDirection::Asc
        } else if self.desc {
            SortDirection::Desc
        } else {
            self.sort.default_direction()
        }
    }

    pub fn filter(&self) -> FilterState {
        FilterState {
            min_tier: self.min_tier,
            max_tier: self.max_tier,
            leagues: self.leagues.clone(),
            positions: self.positions.clone(),
            search_query: self.search.clone().unwrap_or_default(),
            min_composite: self.min_composite,
            watched_only: self.watched,
        }
    }
}

/// Parse `skill=grade`.
fn parse_grade(s: &str) -> Result<(Skill, i64), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SKILL=GRADE, got '{s}'"))?;
    let skill = Skill::from_label(key).ok_or_else(|| {
        let known: Vec<&str> = Skill::ALL.iter().map(|s| s.label()).collect();
        format!("unknown skill '{key}' (expected one of {})", known.join(", "))
    })?;
    let grade = value
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("grade for {} must be a whole number, got '{value}'", skill.label()))?;
    Ok((skill, grade))
}

/// Apply `grades` on top of `current`. Grades are clamped into 20-80.
pub fn merge_grades(current: SkillRatings, grades: &[(Skill, i64)]) -> SkillRatings {
    let mut skills = current;
    for (skill, grade) in grades {
        skills.set(*skill, *grade);
    }
    skills
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
