// Scout-maintained annotations: tags, watchlist, skill grades, notes and
// live-stat overrides, keyed by player name.
//
// The store is external to the scoring pipeline. The pipeline reads one
// snapshot per pass; edits go through `AnnotationCommand`s that write back
// to the store, after which the board is recomputed from scratch.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::overrides::LiveStats;

pub const SKILL_MIN: u8 = 20;
pub const SKILL_MAX: u8 = 80;
/// "Average" on the 20-80 scouting scale.
pub const SKILL_DEFAULT: u8 = 50;

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// The eight graded scouting categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Skill {
    Skating,
    Shooting,
    Hands,
    Passing,
    Physicality,
    Iq,
    Defense,
    Compete,
}

impl Skill {
    pub const ALL: [Skill; 8] = [
        Skill::Skating,
        Skill::Shooting,
        Skill::Hands,
        Skill::Passing,
        Skill::Physicality,
        Skill::Iq,
        Skill::Defense,
        Skill::Compete,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Skill::Skating => "Skating",
            Skill::Shooting => "Shooting",
            Skill::Hands => "Hands",
            Skill::Passing => "Passing",
            Skill::Physicality => "Physicality",
            Skill::Iq => "IQ",
            Skill::Defense => "Defense",
            Skill::Compete => "Compete",
        }
    }

    /// Case-insensitive lookup by label.
    pub fn from_label(label: &str) -> Option<Skill> {
        Skill::ALL
            .into_iter()
            .find(|s| s.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Clamp an arbitrary grade into the 20-80 scale.
pub fn clamp_grade(grade: i64) -> u8 {
    grade.clamp(SKILL_MIN as i64, SKILL_MAX as i64) as u8
}

/// Manual skill grades on the 20-80 scale. Missing fields read as 50.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillRatings {
    #[serde(rename = "Skating")]
    pub skating: u8,
    #[serde(rename = "Shooting")]
    pub shooting: u8,
    #[serde(rename = "Hands")]
    pub hands: u8,
    #[serde(rename = "Passing")]
    pub passing: u8,
    #[serde(rename = "Physicality")]
    pub physicality: u8,
    #[serde(rename = "IQ")]
    pub iq: u8,
    #[serde(rename = "Defense")]
    pub defense: u8,
    #[serde(rename = "Compete")]
    pub compete: u8,
}

impl Default for SkillRatings {
    fn default() -> Self {
        Self {
            skating: SKILL_DEFAULT,
            shooting: SKILL_DEFAULT,
            hands: SKILL_DEFAULT,
            passing: SKILL_DEFAULT,
            physicality: SKILL_DEFAULT,
            iq: SKILL_DEFAULT,
            defense: SKILL_DEFAULT,
            compete: SKILL_DEFAULT,
        }
    }
}

impl SkillRatings {
    pub fn get(&self, skill: Skill) -> u8 {
        match skill {
            Skill::Skating => self.skating,
            Skill::Shooting => self.shooting,
            Skill::Hands => self.hands,
            Skill::Passing => self.passing,
            Skill::Physicality => self.physicality,
            Skill::Iq => self.iq,
            Skill::Defense => self.defense,
            Skill::Compete => self.compete,
        }
    }

    /// Set one grade, clamped into the 20-80 scale.
    pub fn set(&mut self, skill: Skill, grade: i64) {
        let grade = clamp_grade(grade);
        match skill {
            Skill::Skating => self.skating = grade,
            Skill::Shooting => self.shooting = grade,
            Skill::Hands => self.hands = grade,
            Skill::Passing => self.passing = grade,
            Skill::Physicality => self.physicality = grade,
            Skill::Iq => self.iq = grade,
            Skill::Defense => self.defense = grade,
            Skill::Compete => self.compete = grade,
        }
    }

    /// Copy with every grade forced into the 20-80 scale.
    pub fn clamped(self) -> Self {
        let mut out = self;
        for skill in Skill::ALL {
            out.set(skill, self.get(skill) as i64);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Notes, reports, annotations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerNote {
    pub id: String,
    pub text: String,
    pub date: String,
}

/// Manual scouting data for one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScoutingReport {
    pub skills: SkillRatings,
    /// Newest first.
    pub notes: Vec<PlayerNote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_stats: Option<LiveStats>,
}

/// Everything the scout has attached to one player.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Annotation {
    pub tags: Vec<String>,
    pub is_watched: bool,
    pub scouting: ScoutingReport,
}

/// All annotations at one point in time, keyed by player name.
pub type AnnotationSnapshot = HashMap<String, Annotation>;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// A single scout edit.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationCommand {
    AddTag(String),
    RemoveTag(String),
    ToggleWatch,
    SaveSkills(SkillRatings),
    SaveStats(LiveStats),
    ClearStats,
    AddNote(String),
    DeleteNote(String),
}

impl Annotation {
    /// Apply `command` in place. Returns whether anything changed.
    pub fn apply(&mut self, command: &AnnotationCommand, now: DateTime<Utc>) -> bool {
        match command {
            AnnotationCommand::AddTag(tag) => {
                let tag = tag.trim();
                if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
                    return false;
                }
                self.tags.push(tag.to_string());
                true
            }
            AnnotationCommand::RemoveTag(tag) => {
                let before = self.tags.len();
                self.tags.retain(|t| t != tag.trim());
                self.tags.len() != before
            }
            AnnotationCommand::ToggleWatch => {
                self.is_watched = !self.is_watched;
                true
            }
            AnnotationCommand::SaveSkills(skills) => {
                let skills = skills.clamped();
                let changed = self.scouting.skills != skills;
                self.scouting.skills = skills;
                changed
            }
            AnnotationCommand::SaveStats(stats) => {
                let changed = self.scouting.live_stats != Some(*stats);
                self.scouting.live_stats = Some(*stats);
                changed
            }
            AnnotationCommand::ClearStats => self.scouting.live_stats.take().is_some(),
            AnnotationCommand::AddNote(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return false;
                }
                let note = PlayerNote {
                    id: self.next_note_id(now),
                    text: text.to_string(),
                    date: now.format("%Y-%m-%d").to_string(),
                };
                self.scouting.notes.insert(0, note);
                true
            }
            AnnotationCommand::DeleteNote(id) => {
                let before = self.scouting.notes.len();
                self.scouting.notes.retain(|n| &n.id != id);
                self.scouting.notes.len() != before
            }
        }
    }

    /// Millisecond timestamp id, suffixed if a note already uses it.
    fn next_note_id(&self, now: DateTime<Utc>) -> String {
        let base = now.timestamp_millis().to_string();
        let taken = |id: &str| self.scouting.notes.iter().any(|n| n.id == id);
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|id| !taken(id))
            .unwrap_or(base)
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Key-value storage for annotations, keyed by player name.
pub trait AnnotationStore {
    /// Every stored annotation.
    fn snapshot(&self) -> Result<AnnotationSnapshot>;

    /// The annotation for one player, if any.
    fn load(&self, name: &str) -> Result<Option<Annotation>>;

    /// Replace the annotation for one player.
    fn store(&self, name: &str, annotation: &Annotation) -> Result<()>;
}

/// Read-modify-write one player's annotation. Missing annotations start
/// from the defaults (no tags, not watched, all grades 50).
pub fn apply_command<S: AnnotationStore + ?Sized>(
    store: &S,
    name: &str,
    command: &AnnotationCommand,
    now: DateTime<Utc>,
) -> Result<Annotation> {
    let mut annotation = store.load(name)?.unwrap_or_default();
    if annotation.apply(command, now) {
        store.store(name, &annotation)?;
        info!("annotation for '{}' updated: {:?}", name, command);
    }
    Ok(annotation)
}

/// In-process store, used for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<AnnotationSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: AnnotationSnapshot) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl AnnotationStore for MemoryStore {
    fn snapshot(&self) -> Result<AnnotationSnapshot> {
        Ok(self.entries.lock().expect("memory store mutex poisoned").clone())
    }

    fn load(&self, name: &str) -> Result<Option<Annotation>> {
        Ok(self
            .entries
            .lock()
            .expect("memory store mutex poisoned")
            .get(name)
            .cloned())
    }

    fn store(&self, name: &str, annotation: &Annotation) -> Result<()> {
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .insert(name.to_string(), annotation.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
