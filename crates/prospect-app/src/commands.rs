// Command dispatch: each CLI command against a scouting board.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use prospect_core::annotations::{AnnotationCommand, AnnotationStore};
use prospect_core::board::ScoutingBoard;
use prospect_core::compare::{resolve, skills_profile, stats_profile};
use prospect_core::ordering::{filter_and_sort, CompareList};
use prospect_core::overrides::LiveStats;
use prospect_llm::client::{IntelEvent, IntelOracle};
use prospect_llm::prompt::IntelSubject;

use crate::cli::{merge_grades, Command};
use crate::render;

const NO_DATA: &str = "No data available: the players source has no player rows.";

/// Run one command and return the text to print.
///
/// `events` receives streamed intel output for live display; it is only used
/// by the `intel` command.
pub async fn run<S, O>(
    command: Command,
    board: &mut ScoutingBoard<S>,
    oracle: &O,
    events: Option<mpsc::Sender<IntelEvent>>,
    now: DateTime<Utc>,
) -> Result<String>
where
    S: AnnotationStore,
    O: IntelOracle + ?Sized,
{
    if board.is_empty() {
        return Ok(NO_DATA.to_string());
    }

    match command {
        Command::Board(args) => {
            let players = board.players()?;
            let sorted = filter_and_sort(players, &args.filter(), args.sort, args.direction());
            if args.json {
                return serde_json::to_string_pretty(&sorted).context("failed to serialize board");
            }
            Ok(render::board_table(&sorted))
        }
        Command::Show { name, json } => {
            let Some(entity) = board.player(&name)? else {
                bail!("no player named '{name}' on the board");
            };
            if json {
                return serde_json::to_string_pretty(entity).context("failed to serialize player");
            }
            Ok(render::player_card(entity))
        }
        Command::Tag { name, tag } => {
            let a = board.execute(&name, &AnnotationCommand::AddTag(tag), now)?;
            Ok(format!("{name}: tags [{}]", a.tags.join(", ")))
        }
        Command::Untag { name, tag } => {
            let a = board.execute(&name, &AnnotationCommand::RemoveTag(tag), now)?;
            Ok(format!("{name}: tags [{}]", a.tags.join(", ")))
        }
        Command::Watch { name } => {
            let a = board.execute(&name, &AnnotationCommand::ToggleWatch, now)?;
            let state = if a.is_watched { "on" } else { "off" };
            Ok(format!("{name}: watchlist {state}"))
        }
        Command::Note { name, text } => {
            let a = board.execute(&name, &AnnotationCommand::AddNote(text), now)?;
            match a.scouting.notes.first() {
                Some(note) => Ok(format!("{name}: note {} added", note.id)),
                None => Ok(format!("{name}: empty note ignored")),
            }
        }
        Command::DeleteNote { name, id } => {
            let before = board
                .player(&name)?
                .map(|e| e.scouting.notes.len())
                .unwrap_or(0);
            let a = board.execute(&name, &AnnotationCommand::DeleteNote(id.clone()), now)?;
            if a.scouting.notes.len() == before {
                bail!("{name} has no note with id {id}");
            }
            Ok(format!("{name}: note {id} deleted"))
        }
        Command::Skills { name, grades } => {
            let Some(current) = board.player(&name)?.map(|e| e.scouting.skills) else {
                bail!("no player named '{name}' on the board");
            };
            let skills = merge_grades(current, &grades);
            board.execute(&name, &AnnotationCommand::SaveSkills(skills), now)?;
            let entity = board.player(&name)?.context("player vanished after update")?;
            Ok(render::player_card(entity))
        }
        Command::Stats { name, gp, g, a, p } => {
            if g + a != p {
                warn!("{name}: live stats G+A ({}) differ from P ({p})", g + a);
            }
            let stats = LiveStats { gp, g, a, p };
            board.execute(&name, &AnnotationCommand::SaveStats(stats), now)?;
            let entity = board.player(&name)?.context("player vanished after update")?;
            Ok(render::player_card(entity))
        }
        Command::ClearStats { name } => {
            board.execute(&name, &AnnotationCommand::ClearStats, now)?;
            Ok(format!("{name}: live stats cleared"))
        }
        Command::Compare { names } => {
            let mut list = CompareList::new();
            for name in &names {
                if let Some(evicted) = list.add(name) {
                    warn!("compare list full, dropped {evicted}");
                }
            }
            let players = board.players()?;
            let entities = resolve(&list, players);
            if entities.len() < list.len() {
                let missing: Vec<&str> = list
                    .names()
                    .filter(|n| !entities.iter().any(|e| e.name() == *n))
                    .collect();
                bail!("not on the board: {}", missing.join(", "));
            }
            Ok(format!(
                "{}\n\n{}",
                render::profile_table("Stats profile (0-100)", &stats_profile(&entities)),
                render::profile_table("Skills profile (20-80)", &skills_profile(&entities)),
            ))
        }
        Command::Intel {
            name,
            apply_stats,
            apply_skills,
        } => {
            let Some(entity) = board.player(&name)? else {
                bail!("no player named '{name}' on the board");
            };
            let subject = IntelSubject::from_entity(entity);
            let result = match oracle.fetch_intel(&subject, events).await {
                Ok(result) => result,
                Err(e) if e.is_retryable() => {
                    bail!("intel lookup failed (temporary, try again later): {e}")
                }
                Err(e) => bail!("intel lookup failed: {e}"),
            };

            let commands = result.commands(apply_stats, apply_skills);
            for command in &commands {
                board.execute(&name, command, now)?;
            }
            if !commands.is_empty() {
                info!("applied {} intel updates to {}", commands.len(), name);
            }

            let mut out = render::intel_report(&result);
            if apply_stats && result.found_stats.is_none() {
                out.push_str("\n\nNo stats found to apply.");
            }
            if apply_skills && result.suggested_skills.is_none() {
                out.push_str("\n\nNo skill grades found to apply.");
            }
            if !commands.is_empty() {
                let entity = board.player(&name)?.context("player vanished after update")?;
                out.push_str("\n\n");
                out.push_str(&render::player_card(entity));
            }
            Ok(out)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
