// Prompt construction for prospect intel lookups.
//
// The model is asked for a short scouting summary followed by one fenced
// JSON block with current season totals and 20-80 skill estimates. The
// block format is what `extract::extract_intel` parses back out.

use prospect_core::aggregate::PlayerEntity;

/// Who to look up. Name plus enough context to disambiguate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntelSubject {
    pub name: String,
    pub league: String,
    pub country: String,
}

impl IntelSubject {
    pub fn new(name: impl Into<String>, league: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            league: league.into(),
            country: country.into(),
        }
    }

    pub fn from_entity(entity: &PlayerEntity) -> Self {
        Self::new(
            entity.record.name.clone(),
            entity.record.league.clone(),
            entity.record.country.clone(),
        )
    }
}

/// System prompt shared by every intel request.
pub fn system_prompt() -> String {
    "You are an amateur ice hockey scout preparing notes for an NHL draft board.\n\
     Use web search to find the most recent scouting reports, game logs and news.\n\
     Be factual and concise. If you cannot find current information, say so plainly \
     rather than guessing."
        .to_string()
}

/// User message asking for a summary and the structured stats/skills block.
pub fn build_intel_prompt(subject: &IntelSubject) -> String {
    format!(
        "Search for the latest scouting reports, recent game performance stats, and news \
         for ice hockey player \"{name}\" playing in the {league} ({country}).\n\
         \n\
         1. First, write a summary of at most 300 words covering:\n\
         \x20  - Recent performance trends (last 5-10 games).\n\
         \x20  - Notable strengths and weaknesses.\n\
         \x20  - Draft stock movement.\n\
         \n\
         2. Then, at the very end of your response, output exactly one JSON code block \
         wrapped in ```json ... ``` containing:\n\
         \x20  - \"stats\": the player's current season totals GP, G, A, P (only if found).\n\
         \x20  - \"skills\": estimated scouting grades on the 20-80 scale for {skills}. \
         50 is average, 80 is elite. Be realistic.\n\
         \n\
         The JSON block must look like this:\n\
         ```json\n\
         {{\n\
         \x20 \"stats\": {{ \"GP\": 0, \"G\": 0, \"A\": 0, \"P\": 0 }},\n\
         \x20 \"skills\": {{ {skill_template} }}\n\
         }}\n\
         ```",
        name = subject.name,
        league = subject.league,
        country = subject.country,
        skills = skill_list(),
        skill_template = skill_template(),
    )
}

fn skill_list() -> String {
    prospect_core::annotations::Skill::ALL
        .iter()
        .map(|s| s.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn skill_template() -> String {
    prospect_core::annotations::Skill::ALL
        .iter()
        .map(|s| format!("\"{}\": 50", s.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
