// Structured payload extraction from a free-text intel response.
//
// The response text is always usable on its own. The trailing fenced JSON
// block is optional: when it is missing or malformed the typed fields are
// simply absent.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use prospect_core::annotations::{AnnotationCommand, Skill, SkillRatings};
use prospect_core::overrides::LiveStats;

/// Display text used when the model returned nothing but the JSON block.
pub const NO_INFO_TEXT: &str = "No recent information found.";

/// A web page the model consulted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntelSource {
    pub title: String,
    pub url: String,
}

/// Result of one intel lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntelResult {
    /// Summary with the JSON block removed.
    pub text: String,
    pub sources: Vec<IntelSource>,
    /// Skill estimates merged onto the defaults and clamped to 20-80.
    pub suggested_skills: Option<SkillRatings>,
    /// Season totals, only when all four counters were present and valid.
    pub found_stats: Option<LiveStats>,
}

/// Location of a fenced block: byte range of the whole fence and its body.
struct FencedBlock<'a> {
    start: usize,
    end: usize,
    body: &'a str,
}

/// Find the first ```` ```json ```` block, falling back to a bare ```` ``` ```` block.
fn find_fenced_block(text: &str) -> Option<FencedBlock<'_>> {
    find_fence(text, "```json").or_else(|| find_fence(text, "```"))
}

fn find_fence<'a>(text: &'a str, opener: &str) -> Option<FencedBlock<'a>> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(opener) {
        let start = search_from + rel;
        let after_opener = start + opener.len();
        // The opener must end its line.
        let rest = &text[after_opener..];
        let Some(line_end) = rest.find('\n') else {
            break;
        };
        if !rest[..line_end].trim().is_empty() {
            search_from = after_opener;
            continue;
        }
        let body_start = after_opener + line_end + 1;
        let Some(close_rel) = text[body_start..].find("```") else {
            break;
        };
        let body_end = body_start + close_rel;
        return Some(FencedBlock {
            start,
            end: body_end + 3,
            body: &text[body_start..body_end],
        });
    }
    None
}

fn number_field(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key)?.as_f64().filter(|v| v.is_finite())
}

/// Merge a `skills` object onto the defaults. Unknown keys and non-numeric
/// grades are ignored; known grades are rounded and clamped.
fn parse_skills(value: &Value) -> Option<SkillRatings> {
    let obj = value.as_object()?;
    let mut skills = SkillRatings::default();
    for (key, grade) in obj {
        let Some(skill) = Skill::from_label(key) else {
            debug!("ignoring unknown skill '{}' in intel payload", key);
            continue;
        };
        match grade.as_f64().filter(|g| g.is_finite()) {
            Some(g) => skills.set(skill, g.round() as i64),
            None => debug!("ignoring non-numeric grade for {}", key),
        }
    }
    Some(skills)
}

/// `{GP, G, A, P}` when all four are non-negative numbers.
fn parse_stats(value: &Value) -> Option<LiveStats> {
    let count = |key: &str| {
        number_field(value, key)
            .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v.round() as u32)
    };
    Some(LiveStats {
        gp: count("GP")?,
        g: count("G")?,
        a: count("A")?,
        p: count("P")?,
    })
}

/// Split a model response into display text and the optional typed payload.
pub fn extract_intel(full_text: &str, sources: Vec<IntelSource>) -> IntelResult {
    let mut suggested_skills = None;
    let mut found_stats = None;
    let mut text = full_text.to_string();

    if let Some(block) = find_fenced_block(full_text) {
        match serde_json::from_str::<Value>(block.body) {
            Ok(data) => {
                suggested_skills = data.get("skills").and_then(parse_skills);
                found_stats = data.get("stats").and_then(parse_stats);
                if data.get("stats").is_some() && found_stats.is_none() {
                    warn!("intel stats block incomplete or negative, ignoring it");
                }
            }
            Err(e) => warn!("failed to parse intel JSON block: {e}"),
        }
        text = format!("{}{}", &full_text[..block.start], &full_text[block.end..]);
    }

    let text = text.trim();
    IntelResult {
        text: if text.is_empty() {
            NO_INFO_TEXT.to_string()
        } else {
            text.to_string()
        },
        sources,
        suggested_skills,
        found_stats,
    }
}

impl IntelResult {
    /// Annotation commands that adopt the suggested stats and/or skills.
    /// Nothing is applied implicitly; the caller opts in per payload.
    pub fn commands(&self, apply_stats: bool, apply_skills: bool) -> Vec<AnnotationCommand> {
        let mut commands = Vec::new();
        if apply_stats {
            if let Some(stats) = self.found_stats {
                commands.push(AnnotationCommand::SaveStats(stats));
            }
        }
        if apply_skills {
            if let Some(skills) = self.suggested_skills {
                commands.push(AnnotationCommand::SaveSkills(skills));
            }
        }
        commands
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
